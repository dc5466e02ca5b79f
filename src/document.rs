//! Untrusted document model.
//!
//! A document is an ordered list of named fields. Plain fields carry a bare
//! JSON value; protected fields are either waiting for a label or already
//! carry one.

use serde_json::Value;

use crate::runtime::Labeled;

/// State of a policy-protected value.
#[derive(Debug, Clone, PartialEq)]
pub enum Protected {
    /// Not yet labeled; the collection policy derives and attaches a label.
    Pending(Value),
    /// Already labeled; the collection policy verifies the label.
    Labeled(Labeled<Value>),
}

/// Value held by a document field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Searchable, never labeled.
    Plain(Value),
    /// Subject to a label-derivation function.
    Protected(Protected),
}

impl FieldValue {
    /// True for [`FieldValue::Plain`].
    pub fn is_plain(&self) -> bool {
        matches!(self, Self::Plain(_))
    }

    /// True for either protected state.
    pub fn is_protected(&self) -> bool {
        matches!(self, Self::Protected(_))
    }
}

/// A named field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Field name; compared by exact match.
    pub name: String,
    /// Field value.
    pub value: FieldValue,
}

impl Field {
    /// Create a field.
    pub fn new(name: impl Into<String>, value: FieldValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Ordered sequence of fields. Duplicate names are allowed until
/// [`Document::dedup`] runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    fields: Vec<Field>,
}

impl Document {
    /// Empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: append a plain field.
    #[must_use]
    pub fn with_plain(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(Field::new(name, FieldValue::Plain(value.into())));
        self
    }

    /// Builder: append a protected field awaiting its label.
    #[must_use]
    pub fn with_pending(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(Field::new(
            name,
            FieldValue::Protected(Protected::Pending(value.into())),
        ));
        self
    }

    /// Builder: append a protected field that already carries a label.
    #[must_use]
    pub fn with_labeled(mut self, name: impl Into<String>, value: Labeled<Value>) -> Self {
        self.push(Field::new(
            name,
            FieldValue::Protected(Protected::Labeled(value)),
        ));
        self
    }

    /// Builder: append an arbitrary field.
    #[must_use]
    pub fn with_field(mut self, field: Field) -> Self {
        self.push(field);
        self
    }

    /// Append a field, keeping any earlier field with the same name.
    pub fn push(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// First field named `name`.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.value)
    }

    /// Value of the first field named `name` if it is plain.
    pub fn get_plain(&self, name: &str) -> Option<&Value> {
        match self.get(name) {
            Some(FieldValue::Plain(v)) => Some(v),
            _ => None,
        }
    }

    /// Whether any field is named `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// Fields in document order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Field names in document order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Number of fields, duplicates included.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Keep only the first field for each name. Top level only; nested
    /// JSON objects are left untouched.
    #[must_use]
    pub fn dedup(self) -> Self {
        let mut fields: Vec<Field> = Vec::with_capacity(self.fields.len());
        for field in self.fields {
            if fields.iter().any(|kept| kept.name == field.name) {
                tracing::debug!(field = %field.name, "dropping duplicate field");
                continue;
            }
            fields.push(field);
        }
        Self { fields }
    }

    /// Consume the document, returning its fields.
    pub fn into_fields(self) -> Vec<Field> {
        self.fields
    }
}

impl FromIterator<Field> for Document {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
