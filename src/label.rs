//! Security label lattice.
//!
//! A label is a confidentiality [`Level`] paired with a set of compartments.
//! Data may flow from `a` to `b` only if `b` is at least as high and names
//! every compartment `a` names.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Confidentiality levels ordered lowest to highest.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Anyone may read.
    #[default]
    Public,
    /// Readable inside the deployment.
    Internal,
    /// Private correspondence, account data.
    Sensitive,
    /// Medical, financial and other regulated records.
    Regulated,
    /// Credentials and keys.
    Secret,
}

impl Level {
    /// Lowercase name as used in configuration files.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Internal => "internal",
            Self::Sensitive => "sensitive",
            Self::Regulated => "regulated",
            Self::Secret => "secret",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point in the label lattice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecurityLabel {
    /// Confidentiality level.
    pub level: Level,
    /// Need-to-know compartments.
    #[serde(default)]
    pub compartments: BTreeSet<String>,
}

impl SecurityLabel {
    /// Build a label from a level and any number of compartments.
    pub fn new<I, S>(level: Level, compartments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            level,
            compartments: compartments.into_iter().map(Into::into).collect(),
        }
    }

    /// The least restrictive label: `Public` with no compartments.
    pub fn bottom() -> Self {
        Self::default()
    }

    /// A label at `level` with no compartments.
    pub fn at(level: Level) -> Self {
        Self {
            level,
            compartments: BTreeSet::new(),
        }
    }

    /// Return this label with one more compartment.
    #[must_use]
    pub fn with_compartment(mut self, compartment: impl Into<String>) -> Self {
        self.compartments.insert(compartment.into());
        self
    }

    /// Can data labeled `self` flow to a holder of `other`?
    pub fn can_flow_to(&self, other: &Self) -> bool {
        self.level <= other.level && self.compartments.is_subset(&other.compartments)
    }

    /// Least upper bound.
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        Self {
            level: self.level.max(other.level),
            compartments: self.compartments.union(&other.compartments).cloned().collect(),
        }
    }

    /// Greatest lower bound.
    #[must_use]
    pub fn meet(&self, other: &Self) -> Self {
        Self {
            level: self.level.min(other.level),
            compartments: self
                .compartments
                .intersection(&other.compartments)
                .cloned()
                .collect(),
        }
    }
}

impl From<Level> for SecurityLabel {
    fn from(level: Level) -> Self {
        Self::at(level)
    }
}

impl fmt::Display for SecurityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.level)?;
        for (i, c) in self.compartments.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(c)?;
        }
        f.write_str("}")
    }
}


// =============================================================================
// Proptest lattice law invariants
// =============================================================================
