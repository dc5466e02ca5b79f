//! Policy application: turns an untrusted document into a labeled one.

use tracing::{debug, warn};

use crate::document::{Document, Field, FieldValue, Protected};
use crate::policy::{schema, FieldPolicy, PolicyError};
use crate::registry::Collection;
use crate::runtime::{DelegationToken, LabelContext, Labeled};

/// Apply `col`'s policy to `doc0`.
///
/// Steps, each aborting the whole call on failure:
///
/// 1. drop later fields whose name was already seen;
/// 2. schema-check the deduplicated document;
/// 3. under the collection's clearance, attach derived labels to pending
///    fields and verify the labels of already-labeled fields;
/// 4. derive the document label and attach it.
///
/// Field labels are always derived from the deduplicated input, never from
/// partially labeled output, so field order does not affect the result.
/// Failures while labeling a field are reported as
/// [`PolicyError::Violation`] without their cause. A failure attaching the
/// document label is reported as the runtime's [`PolicyError::Label`].
pub fn apply(
    ctx: &mut LabelContext,
    token: &DelegationToken,
    col: &Collection,
    doc0: Document,
) -> Result<Labeled<Document>, PolicyError> {
    debug!(
        collection = %col.name(),
        fields = doc0.len(),
        token = %token.id(),
        principal = %token.principal(),
        "applying collection policy"
    );

    let doc1 = doc0.dedup();
    if let Err(e) = schema::check(col.policy(), &doc1) {
        warn!(collection = %col.name(), error = %e, "document rejected");
        return Err(e);
    }

    let result: Result<Labeled<Document>, PolicyError> =
        ctx.with_clearance(token, col.clearance(), |ctx| {
            let doc2 = label_fields(ctx, token, col, &doc1)?;
            let label = col.policy().document_label(&doc2);
            Ok(ctx.attach_label(token, label, doc2)?)
        });

    match &result {
        Ok(_) => debug!(collection = %col.name(), "document labeled"),
        Err(PolicyError::Violation) => {
            warn!(collection = %col.name(), "document rejected: policy violation");
        }
        Err(e) => warn!(collection = %col.name(), error = %e, "document rejected"),
    }
    result
}

/// Label or verify every protected field of the type-checked `doc1`.
fn label_fields(
    ctx: &LabelContext,
    token: &DelegationToken,
    col: &Collection,
    doc1: &Document,
) -> Result<Document, PolicyError> {
    doc1.fields()
        .iter()
        .map(|field| {
            let value = match &field.value {
                FieldValue::Plain(_) => field.value.clone(),
                FieldValue::Protected(state) => {
                    let Some(FieldPolicy::Protected(derive)) = col.policy().field(&field.name)
                    else {
                        return Err(PolicyError::Violation);
                    };
                    let label = derive(doc1);
                    match state {
                        Protected::Pending(raw) => {
                            let labeled = ctx
                                .attach_label(token, label, raw.clone())
                                .map_err(|_| PolicyError::Violation)?;
                            FieldValue::Protected(Protected::Labeled(labeled))
                        }
                        Protected::Labeled(labeled) => {
                            if !ctx.labels_equal(ctx.label_of(labeled), &label) {
                                return Err(PolicyError::Violation);
                            }
                            field.value.clone()
                        }
                    }
                }
            };
            Ok(Field::new(field.name.clone(), value))
        })
        .collect()
}
