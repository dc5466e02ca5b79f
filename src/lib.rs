//! Labelgate — document-policy enforcement.
//!
//! Takes an untrusted document and the policy of the collection it is
//! destined for, checks the document's shape, and attaches (or verifies)
//! the security label each protected field and the document as a whole
//! must carry. Anything that does not conform is rejected.
//!
//! See `DESIGN.md` for the architecture.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod document;
pub mod label;
pub mod logging;
pub mod policy;
pub mod registry;
pub mod runtime;

pub use document::{Document, Field, FieldValue, Protected};
pub use label::{Level, SecurityLabel};
pub use policy::apply::apply;
pub use policy::{CollectionPolicy, FieldPolicy, PolicyError, ID_FIELD};
pub use registry::{Collection, Database, DatabaseConfig};
pub use runtime::{DelegationToken, LabelContext, LabelError, Labeled};
