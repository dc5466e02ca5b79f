//! Collection and database creation and association.

use labelgate::{
    Collection, CollectionPolicy, Database, DatabaseConfig, DelegationToken, LabelContext,
    LabelError, Level, SecurityLabel,
};

fn ctx_at(current: SecurityLabel) -> LabelContext {
    LabelContext::new(current, SecurityLabel::new(Level::Secret, ["ops"]))
        .expect("current flows to clearance")
}

fn policy() -> CollectionPolicy {
    CollectionPolicy::new(|_| SecurityLabel::bottom()).searchable("name")
}

fn config() -> DatabaseConfig {
    DatabaseConfig {
        name: "clinic".to_owned(),
    }
}

#[test]
fn collection_within_caller_bounds() {
    let ctx = ctx_at(SecurityLabel::bottom());
    let col = Collection::create(
        &ctx,
        &DelegationToken::none("clinic"),
        "patients",
        SecurityLabel::at(Level::Internal),
        SecurityLabel::at(Level::Regulated),
        policy(),
    )
    .expect("within bounds");
    assert_eq!(col.name(), "patients");
    assert_eq!(col.label(), &SecurityLabel::at(Level::Internal));
    assert_eq!(col.clearance(), &SecurityLabel::at(Level::Regulated));
    assert!(col.policy().field("name").is_some());
}

#[test]
fn collection_clearance_above_caller_is_rejected() {
    let ctx = ctx_at(SecurityLabel::bottom());
    let result = Collection::create(
        &ctx,
        &DelegationToken::none("clinic"),
        "patients",
        SecurityLabel::bottom(),
        SecurityLabel::new(Level::Regulated, ["hr"]),
        policy(),
    );
    assert!(matches!(result, Err(LabelError::AboveClearance { .. })));
}

#[test]
fn collection_label_below_current_is_rejected() {
    let ctx = ctx_at(SecurityLabel::at(Level::Sensitive));
    let result = Collection::create(
        &ctx,
        &DelegationToken::none("clinic"),
        "patients",
        SecurityLabel::bottom(),
        SecurityLabel::at(Level::Sensitive),
        policy(),
    );
    assert!(matches!(result, Err(LabelError::BelowCurrent { .. })));
}

#[test]
fn database_starts_empty() {
    let ctx = ctx_at(SecurityLabel::bottom());
    let db = Database::create(
        &ctx,
        &DelegationToken::none("clinic"),
        config(),
        SecurityLabel::bottom(),
        SecurityLabel::at(Level::Internal),
    )
    .expect("within bounds");
    assert_eq!(db.name(), "clinic");
    assert_eq!(db.collection_set_label(), &SecurityLabel::at(Level::Internal));
    assert_eq!(db.collection_names().count(), 0);
}

#[test]
fn associate_requires_matching_current_label() {
    let token = DelegationToken::none("clinic");
    let set_label = SecurityLabel::at(Level::Internal);
    let creator = ctx_at(SecurityLabel::bottom());
    let db = Database::create(
        &creator,
        &token,
        config(),
        SecurityLabel::bottom(),
        set_label.clone(),
    )
    .expect("within bounds");
    let col = Collection::create(
        &creator,
        &token,
        "patients",
        SecurityLabel::bottom(),
        SecurityLabel::at(Level::Regulated),
        policy(),
    )
    .expect("within bounds");

    // Bottom merely flows to the set label; a write needs an exact match.
    let mismatch = db.clone().associate(&creator, &token, col.clone());
    assert!(matches!(mismatch, Err(LabelError::WriteMismatch { .. })));

    let writer = ctx_at(set_label);
    let db = db.associate(&writer, &token, col).expect("labels match");
    assert_eq!(db.collection_names().collect::<Vec<_>>(), vec!["patients"]);
    assert!(db.collection("patients").is_some());
}

#[test]
fn associate_with_authority_relaxes_match() {
    let creator = ctx_at(SecurityLabel::bottom());
    let plain = DelegationToken::none("clinic");
    let db = Database::create(
        &creator,
        &plain,
        config(),
        SecurityLabel::bottom(),
        SecurityLabel::at(Level::Internal),
    )
    .expect("within bounds");
    let col = Collection::create(
        &creator,
        &plain,
        "staff",
        SecurityLabel::bottom(),
        SecurityLabel::at(Level::Internal),
        policy(),
    )
    .expect("within bounds");

    let owner = DelegationToken::new("clinic", SecurityLabel::at(Level::Internal));
    let db = db.associate(&creator, &owner, col).expect("authority covers set label");
    assert!(db.collection("staff").is_some());
}

#[test]
fn associate_replaces_same_name() {
    let token = DelegationToken::none("clinic");
    let ctx = ctx_at(SecurityLabel::bottom());
    let db = Database::create(
        &ctx,
        &token,
        config(),
        SecurityLabel::bottom(),
        SecurityLabel::bottom(),
    )
    .expect("within bounds");
    let first = Collection::create(
        &ctx,
        &token,
        "patients",
        SecurityLabel::bottom(),
        SecurityLabel::at(Level::Internal),
        policy(),
    )
    .expect("within bounds");
    let second = Collection::create(
        &ctx,
        &token,
        "patients",
        SecurityLabel::bottom(),
        SecurityLabel::at(Level::Regulated),
        policy(),
    )
    .expect("within bounds");

    let db = db
        .associate(&ctx, &token, first)
        .and_then(|db| db.associate(&ctx, &token, second))
        .expect("labels match");
    assert_eq!(db.collection_names().count(), 1);
    assert_eq!(
        db.collection("patients").map(Collection::clearance),
        Some(&SecurityLabel::at(Level::Regulated))
    );
}
