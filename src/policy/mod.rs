//! Collection policies: which fields are protected and how their labels,
//! and the label of the document as a whole, are derived.
//!
//! Enforcement happens in two strictly ordered phases: [`schema::check`]
//! validates the document's shape, then [`apply::apply`] derives, attaches
//! and verifies labels. Derivation functions may assume a type-correct
//! document.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::document::Document;
use crate::label::SecurityLabel;
use crate::runtime::LabelError;

pub mod apply;
pub mod schema;

/// Reserved identity field, implicitly searchable in every collection.
pub const ID_FIELD: &str = "_id";

/// Pure label-derivation function over a whole document.
pub type LabelFn = Arc<dyn Fn(&Document) -> SecurityLabel + Send + Sync>;

static IMPLICIT_ID: FieldPolicy = FieldPolicy::Searchable;

/// Errors from applying a collection policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The document's shape does not match the policy.
    #[error("type error: {0}")]
    Type(String),

    /// A field label could not be attached or did not match its derived
    /// label. Carries no detail.
    #[error("policy violation")]
    Violation,

    /// The runtime refused a label bound outside field labeling.
    #[error(transparent)]
    Label(#[from] LabelError),
}

/// Policy for a single field.
#[derive(Clone)]
pub enum FieldPolicy {
    /// Must be plain.
    Searchable,
    /// Must be protected; the function yields the label it must carry.
    Protected(LabelFn),
}

impl FieldPolicy {
    /// Wrap a derivation closure.
    pub fn protected<F>(derive: F) -> Self
    where
        F: Fn(&Document) -> SecurityLabel + Send + Sync + 'static,
    {
        Self::Protected(Arc::new(derive))
    }

    /// True for [`FieldPolicy::Searchable`].
    pub fn is_searchable(&self) -> bool {
        matches!(self, Self::Searchable)
    }
}

impl fmt::Debug for FieldPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Searchable => f.write_str("Searchable"),
            Self::Protected(_) => f.write_str("Protected(<fn>)"),
        }
    }
}

/// Field policies plus the document-level label derivation.
#[derive(Clone)]
pub struct CollectionPolicy {
    fields: BTreeMap<String, FieldPolicy>,
    document_label: LabelFn,
}

impl CollectionPolicy {
    /// Policy with no declared fields.
    pub fn new<F>(document_label: F) -> Self
    where
        F: Fn(&Document) -> SecurityLabel + Send + Sync + 'static,
    {
        Self::from_parts(BTreeMap::new(), Arc::new(document_label))
    }

    /// Policy from an explicit field map and document derivation.
    pub fn from_parts(fields: BTreeMap<String, FieldPolicy>, document_label: LabelFn) -> Self {
        Self {
            fields,
            document_label,
        }
    }

    /// Declare a searchable field.
    #[must_use]
    pub fn searchable(mut self, name: impl Into<String>) -> Self {
        self.fields.insert(name.into(), FieldPolicy::Searchable);
        self
    }

    /// Declare a protected field.
    #[must_use]
    pub fn protected<F>(mut self, name: impl Into<String>, derive: F) -> Self
    where
        F: Fn(&Document) -> SecurityLabel + Send + Sync + 'static,
    {
        self.fields
            .insert(name.into(), FieldPolicy::protected(derive));
        self
    }

    /// Declared field policies.
    pub fn fields(&self) -> &BTreeMap<String, FieldPolicy> {
        &self.fields
    }

    /// Declared policy for `name`. `_id` is searchable unless declared.
    pub fn field(&self, name: &str) -> Option<&FieldPolicy> {
        match self.fields.get(name) {
            Some(p) => Some(p),
            None if name == ID_FIELD => Some(&IMPLICIT_ID),
            None => None,
        }
    }

    /// Derive the document-level label.
    pub fn document_label(&self, doc: &Document) -> SecurityLabel {
        (self.document_label)(doc)
    }
}

impl fmt::Debug for CollectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionPolicy")
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}
