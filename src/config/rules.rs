//! Declarative collection policies.
//!
//! A [`LabelRule`] is a label-derivation function written as data: a fixed
//! level and compartments, plus compartments taken from the values of plain
//! fields of the document being labeled.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::document::Document;
use crate::label::{Level, SecurityLabel};
use crate::policy::{CollectionPolicy, FieldPolicy, ID_FIELD};
use crate::registry::Collection;
use crate::runtime::{DelegationToken, LabelContext, LabelError};

/// Errors building a collection from its declaration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A rule reads compartments from a field that is not guaranteed plain.
    #[error("rule for {rule} reads compartments from {from_field}, which is not declared searchable")]
    UndeclaredSource {
        /// Field whose rule is invalid, or `document`.
        rule: String,
        /// Offending source field.
        from_field: String,
    },

    /// The runtime refused the collection's label or clearance.
    #[error(transparent)]
    Label(#[from] LabelError),
}

/// Declarative label derivation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LabelRule {
    /// Level of the derived label.
    pub level: Level,
    /// Compartments always present.
    pub compartments: Vec<String>,
    /// Plain fields whose values become compartments.
    pub compartments_from: Vec<String>,
}

impl LabelRule {
    /// Derive the label for `doc`.
    ///
    /// A string value contributes itself, an array contributes each element,
    /// any other value contributes its compact JSON text. Absent fields
    /// contribute nothing.
    pub fn derive(&self, doc: &Document) -> SecurityLabel {
        let mut label = SecurityLabel::new(self.level, self.compartments.iter().cloned());
        for name in &self.compartments_from {
            match doc.get_plain(name) {
                Some(Value::Array(items)) => {
                    label.compartments.extend(items.iter().map(compartment_of));
                }
                Some(v) => {
                    label.compartments.insert(compartment_of(v));
                }
                None => {}
            }
        }
        label
    }
}

fn compartment_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Declared policy of one field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldRule {
    /// `"searchable"`.
    Searchable,
    /// `{ protected = { level = ..., ... } }`.
    Protected(LabelRule),
}

/// Declared policy of a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PolicySpec {
    /// Field rules by name.
    pub fields: BTreeMap<String, FieldRule>,
    /// Document-level rule.
    pub document: LabelRule,
}

impl PolicySpec {
    /// Compile into a [`CollectionPolicy`].
    ///
    /// Every `compartments_from` source must be a searchable field (or
    /// `_id`), so the schema check has established it is plain before any
    /// rule runs.
    pub fn build(&self) -> Result<CollectionPolicy, ConfigError> {
        for (name, rule) in &self.fields {
            if let FieldRule::Protected(label_rule) = rule {
                self.validate_sources(name, label_rule)?;
            }
        }
        self.validate_sources("document", &self.document)?;

        let fields = self
            .fields
            .iter()
            .map(|(name, rule)| {
                let policy = match rule {
                    FieldRule::Searchable => FieldPolicy::Searchable,
                    FieldRule::Protected(label_rule) => {
                        let label_rule = label_rule.clone();
                        FieldPolicy::protected(move |doc| label_rule.derive(doc))
                    }
                };
                (name.clone(), policy)
            })
            .collect();
        let document = self.document.clone();
        Ok(CollectionPolicy::from_parts(
            fields,
            Arc::new(move |doc: &Document| document.derive(doc)),
        ))
    }

    fn validate_sources(&self, rule: &str, label_rule: &LabelRule) -> Result<(), ConfigError> {
        for source in &label_rule.compartments_from {
            let plain = source == ID_FIELD
                || matches!(self.fields.get(source), Some(FieldRule::Searchable));
            if !plain {
                return Err(ConfigError::UndeclaredSource {
                    rule: rule.to_owned(),
                    from_field: source.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Declared collection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CollectionSpec {
    /// Collection name.
    pub name: String,
    /// Collection label.
    #[serde(default)]
    pub label: SecurityLabel,
    /// Collection clearance.
    pub clearance: SecurityLabel,
    /// Collection policy.
    #[serde(default)]
    pub policy: PolicySpec,
}

impl CollectionSpec {
    /// Build the policy and create the collection under `ctx`.
    pub fn create(
        &self,
        ctx: &LabelContext,
        token: &DelegationToken,
    ) -> Result<Collection, ConfigError> {
        let policy = self.policy.build()?;
        Ok(Collection::create(
            ctx,
            token,
            self.name.clone(),
            self.label.clone(),
            self.clearance.clone(),
            policy,
        )?)
    }
}
