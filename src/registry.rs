//! Collections and databases: the labeled containers policies are attached to.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::label::SecurityLabel;
use crate::policy::CollectionPolicy;
use crate::runtime::{DelegationToken, LabelContext, LabelError, Labeled};

/// A named collection with its label, clearance and policy.
#[derive(Debug, Clone)]
pub struct Collection {
    name: String,
    label: SecurityLabel,
    clearance: SecurityLabel,
    policy: Arc<CollectionPolicy>,
}

impl Collection {
    /// Create a collection. Both `label` and `clearance` must pass the
    /// allocation guard of `ctx`.
    pub fn create(
        ctx: &LabelContext,
        token: &DelegationToken,
        name: impl Into<String>,
        label: SecurityLabel,
        clearance: SecurityLabel,
        policy: CollectionPolicy,
    ) -> Result<Self, LabelError> {
        ctx.guard_alloc(token, &label)?;
        ctx.guard_alloc(token, &clearance)?;
        let name = name.into();
        debug!(collection = %name, "collection created");
        Ok(Self {
            name,
            label,
            clearance,
            policy: Arc::new(policy),
        })
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Collection label.
    pub fn label(&self) -> &SecurityLabel {
        &self.label
    }

    /// Ceiling for every label attached under this collection.
    pub fn clearance(&self) -> &SecurityLabel {
        &self.clearance
    }

    /// Collection policy.
    pub fn policy(&self) -> &CollectionPolicy {
        &self.policy
    }
}

/// Database configuration supplied by its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Database name.
    pub name: String,
}

/// A database: a label and a labeled set of collections.
#[derive(Debug, Clone)]
pub struct Database {
    name: String,
    label: SecurityLabel,
    collections: Labeled<BTreeMap<String, Collection>>,
}

impl Database {
    /// Create an empty database labeled `db_label`, whose collection set is
    /// labeled `collection_set_label`.
    pub fn create(
        ctx: &LabelContext,
        token: &DelegationToken,
        config: DatabaseConfig,
        db_label: SecurityLabel,
        collection_set_label: SecurityLabel,
    ) -> Result<Self, LabelError> {
        ctx.guard_alloc(token, &db_label)?;
        let collections = ctx.attach_label(token, collection_set_label, BTreeMap::new())?;
        info!(database = %config.name, "database created");
        Ok(Self {
            name: config.name,
            label: db_label,
            collections,
        })
    }

    /// Add `collection`, replacing any collection of the same name.
    ///
    /// Writing the collection set requires the current label to match the
    /// set's label.
    pub fn associate(
        self,
        ctx: &LabelContext,
        token: &DelegationToken,
        collection: Collection,
    ) -> Result<Self, LabelError> {
        ctx.guard_write(token, self.collections.label())?;
        let (set_label, mut set) = self.collections.into_parts();
        if set.contains_key(collection.name()) {
            debug!(database = %self.name, collection = %collection.name(), "replacing collection");
        }
        set.insert(collection.name().to_owned(), collection);
        let collections = ctx.attach_label(token, set_label, set)?;
        Ok(Self {
            name: self.name,
            label: self.label,
            collections,
        })
    }

    /// Database name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Database label.
    pub fn label(&self) -> &SecurityLabel {
        &self.label
    }

    /// Label protecting the collection set.
    pub fn collection_set_label(&self) -> &SecurityLabel {
        self.collections.label()
    }

    /// Look up a collection by name.
    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.value().get(name)
    }

    /// Names of associated collections, sorted.
    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.value().keys().map(String::as_str)
    }
}
