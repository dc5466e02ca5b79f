//! Label enforcement runtime.
//!
//! Tracks the caller's current label and clearance, and is the only place a
//! [`Labeled`] value can be created. Every guarded operation takes an explicit
//! [`DelegationToken`]; a token with bottom authority grants nothing beyond
//! the caller's own bounds.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::label::SecurityLabel;

/// Label-bound violation raised by the runtime guards.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
    /// The target label is not at or above the current label.
    #[error("label {label} is below the current label {current}")]
    BelowCurrent {
        /// Requested label.
        label: SecurityLabel,
        /// Current label of the caller.
        current: SecurityLabel,
    },
    /// The target label is above the clearance.
    #[error("label {label} exceeds clearance {clearance}")]
    AboveClearance {
        /// Requested label.
        label: SecurityLabel,
        /// Active clearance.
        clearance: SecurityLabel,
    },
    /// A write target does not match the current label.
    #[error("write target {target} does not match current label {current}")]
    WriteMismatch {
        /// Label of the object being written.
        target: SecurityLabel,
        /// Current label of the caller.
        current: SecurityLabel,
    },
    /// The requested clearance cannot be adopted.
    #[error("clearance {requested} cannot be adopted under current label {current} and clearance {clearance}")]
    ClearanceNotPermitted {
        /// Requested clearance.
        requested: SecurityLabel,
        /// Current label of the caller.
        current: SecurityLabel,
        /// Clearance in force when the request was made.
        clearance: SecurityLabel,
    },
}

/// Capability delegating label authority to an operation.
///
/// Authority relaxes flow checks: `a` may flow to `b` under the token when
/// `a` flows to `b ⊔ authority`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationToken {
    id: Uuid,
    principal: String,
    authority: SecurityLabel,
    issued_at: DateTime<Utc>,
}

impl DelegationToken {
    /// Issue a token for `principal` carrying `authority`.
    pub fn new(principal: impl Into<String>, authority: SecurityLabel) -> Self {
        Self {
            id: Uuid::new_v4(),
            principal: principal.into(),
            authority,
            issued_at: Utc::now(),
        }
    }

    /// Issue a token that carries no authority.
    pub fn none(principal: impl Into<String>) -> Self {
        Self::new(principal, SecurityLabel::bottom())
    }

    /// Unique token identifier, safe to log.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Principal the authority was delegated by.
    pub fn principal(&self) -> &str {
        &self.principal
    }

    /// Label authority carried by the token.
    pub fn authority(&self) -> &SecurityLabel {
        &self.authority
    }

    /// Issue time.
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Flow check relaxed by this token's authority.
    pub fn can_flow_to(&self, from: &SecurityLabel, to: &SecurityLabel) -> bool {
        from.can_flow_to(&to.join(&self.authority))
    }
}

/// A value together with the label it was allocated at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labeled<T> {
    label: SecurityLabel,
    value: T,
}

impl<T> Labeled<T> {
    /// Label attached to the value.
    pub fn label(&self) -> &SecurityLabel {
        &self.label
    }

    /// The protected value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Split into label and value.
    pub fn into_parts(self) -> (SecurityLabel, T) {
        (self.label, self.value)
    }
}

/// Current label and clearance of an executing caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelContext {
    current: SecurityLabel,
    clearance: SecurityLabel,
}

impl LabelContext {
    /// Create a context. The current label must flow to the clearance.
    pub fn new(current: SecurityLabel, clearance: SecurityLabel) -> Result<Self, LabelError> {
        if !current.can_flow_to(&clearance) {
            return Err(LabelError::AboveClearance {
                label: current,
                clearance,
            });
        }
        Ok(Self { current, clearance })
    }

    /// Current label.
    pub fn current_label(&self) -> &SecurityLabel {
        &self.current
    }

    /// Active clearance.
    pub fn clearance(&self) -> &SecurityLabel {
        &self.clearance
    }

    /// Allocation guard: `current ⊑ label ⊑ clearance`, the first step
    /// relaxed by the token's authority.
    pub fn guard_alloc(
        &self,
        token: &DelegationToken,
        label: &SecurityLabel,
    ) -> Result<(), LabelError> {
        if !token.can_flow_to(&self.current, label) {
            return Err(LabelError::BelowCurrent {
                label: label.clone(),
                current: self.current.clone(),
            });
        }
        if !label.can_flow_to(&self.clearance) {
            return Err(LabelError::AboveClearance {
                label: label.clone(),
                clearance: self.clearance.clone(),
            });
        }
        Ok(())
    }

    /// Write guard: the target label must equal the current label modulo
    /// the token's authority, and lie within the clearance.
    pub fn guard_write(
        &self,
        token: &DelegationToken,
        label: &SecurityLabel,
    ) -> Result<(), LabelError> {
        if !(token.can_flow_to(&self.current, label) && token.can_flow_to(label, &self.current)) {
            return Err(LabelError::WriteMismatch {
                target: label.clone(),
                current: self.current.clone(),
            });
        }
        if !label.can_flow_to(&self.clearance) {
            return Err(LabelError::AboveClearance {
                label: label.clone(),
                clearance: self.clearance.clone(),
            });
        }
        Ok(())
    }

    /// Attach `label` to `value` after the allocation guard passes.
    pub fn attach_label<T>(
        &self,
        token: &DelegationToken,
        label: SecurityLabel,
        value: T,
    ) -> Result<Labeled<T>, LabelError> {
        self.guard_alloc(token, &label)?;
        Ok(Labeled { label, value })
    }

    /// Label of a labeled value.
    pub fn label_of<'a, T>(&self, labeled: &'a Labeled<T>) -> &'a SecurityLabel {
        labeled.label()
    }

    /// Label equality.
    pub fn labels_equal(&self, a: &SecurityLabel, b: &SecurityLabel) -> bool {
        a == b
    }

    /// Run `body` with the clearance set to `clearance`, restoring the
    /// previous clearance afterwards whether `body` returns or unwinds.
    ///
    /// The current label must flow to the new clearance, and the new
    /// clearance may exceed the old one only by the token's authority.
    pub fn with_clearance<T, E, F>(
        &mut self,
        token: &DelegationToken,
        clearance: &SecurityLabel,
        body: F,
    ) -> Result<T, E>
    where
        E: From<LabelError>,
        F: FnOnce(&mut Self) -> Result<T, E>,
    {
        if !self.current.can_flow_to(clearance) || !token.can_flow_to(clearance, &self.clearance) {
            return Err(LabelError::ClearanceNotPermitted {
                requested: clearance.clone(),
                current: self.current.clone(),
                clearance: self.clearance.clone(),
            }
            .into());
        }
        let saved = std::mem::replace(&mut self.clearance, clearance.clone());
        debug!(
            token = %token.id(),
            principal = %token.principal(),
            issued_at = %token.issued_at(),
            clearance = %clearance,
            "clearance scoped"
        );
        let scope = ClearanceScope { ctx: self, saved };
        body(&mut *scope.ctx)
    }
}

/// Puts the saved clearance back when dropped, including during unwinding.
struct ClearanceScope<'a> {
    ctx: &'a mut LabelContext,
    saved: SecurityLabel,
}

impl Drop for ClearanceScope<'_> {
    fn drop(&mut self) {
        self.ctx.clearance = std::mem::take(&mut self.saved);
    }
}
