//! Schema check run before any label is derived.

use crate::document::{Document, FieldValue};
use crate::policy::{CollectionPolicy, FieldPolicy, PolicyError, ID_FIELD};

/// Check that `doc` has exactly the shape `policy` declares.
///
/// Every declared field must be present, searchable fields must be plain and
/// protected fields must be protected. Fields the policy does not name are
/// treated as searchable; `_id` is always searchable.
///
/// `doc` need not be deduplicated. Lookups see the first occurrence of a
/// name, and a stray protected name is reported once however often it
/// repeats.
pub fn check(policy: &CollectionPolicy, doc: &Document) -> Result<(), PolicyError> {
    for (name, field_policy) in policy.fields() {
        let value = doc
            .get(name)
            .ok_or_else(|| PolicyError::Type(format!("missing field {name}")))?;
        match (field_policy, value) {
            (FieldPolicy::Searchable, FieldValue::Plain(_))
            | (FieldPolicy::Protected(_), FieldValue::Protected(_)) => {}
            (FieldPolicy::Searchable, FieldValue::Protected(_)) => {
                return Err(PolicyError::Type(format!(
                    "{name} should NOT be policy labeled"
                )));
            }
            (FieldPolicy::Protected(_), FieldValue::Plain(_)) => {
                return Err(PolicyError::Type(format!("{name} should be policy labeled")));
            }
        }
    }

    let mut stray: Vec<&str> = doc
        .fields()
        .iter()
        .filter(|f| !policy.fields().contains_key(&f.name))
        .filter(|f| f.value.is_protected())
        .map(|f| f.name.as_str())
        .collect();
    if stray.is_empty() {
        return Ok(());
    }
    stray.sort_unstable();
    stray.dedup();
    if stray == [ID_FIELD] {
        return Err(PolicyError::Type(format!(
            "{ID_FIELD} should NOT be policy labeled"
        )));
    }
    Err(PolicyError::Type(format!(
        "fields [{}] should NOT be policy labeled",
        stray.join(", ")
    )))
}
