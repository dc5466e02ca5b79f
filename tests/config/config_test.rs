//! Coverage for config parsing and declarative collections.

use std::collections::HashMap;

use labelgate::config::{Config, ConfigError, FieldRule, LabelRule};
use labelgate::{
    apply, DelegationToken, Document, FieldValue, LabelContext, Level, PolicyError, Protected,
    SecurityLabel,
};

const CLINIC_TOML: &str = r#"
[logging]
level = "debug"

[[collections]]
name = "patients"
clearance = { level = "regulated", compartments = ["alice", "bob"] }

[collections.policy.fields]
owner = "searchable"
ssn = { protected = { level = "regulated", compartments_from = ["owner"] } }

[collections.policy.document]
level = "internal"
compartments_from = ["owner"]
"#;

fn parse_clinic() -> Config {
    match Config::from_toml(CLINIC_TOML) {
        Ok(config) => config,
        Err(err) => panic!("clinic config should parse: {err:#}"),
    }
}

fn caller() -> LabelContext {
    LabelContext::new(
        SecurityLabel::bottom(),
        SecurityLabel::new(Level::Secret, ["alice", "bob"]),
    )
    .expect("bottom flows to any clearance")
}

#[test]
fn parse_collection_declaration() {
    let config = parse_clinic();
    assert_eq!(config.logging.level, "debug");
    assert!(!config.logging.json);

    let spec = config.collection("patients").expect("declared");
    assert_eq!(spec.label, SecurityLabel::bottom());
    assert_eq!(
        spec.clearance,
        SecurityLabel::new(Level::Regulated, ["alice", "bob"])
    );
    assert_eq!(spec.policy.fields.get("owner"), Some(&FieldRule::Searchable));
    assert_eq!(
        spec.policy.fields.get("ssn"),
        Some(&FieldRule::Protected(LabelRule {
            level: Level::Regulated,
            compartments: vec![],
            compartments_from: vec!["owner".to_owned()],
        }))
    );
}

#[test]
fn declared_collection_labels_documents() {
    let config = parse_clinic();
    let mut ctx = caller();
    let token = DelegationToken::none("clinic");
    let col = config
        .collection("patients")
        .expect("declared")
        .create(&ctx, &token)
        .expect("valid collection");

    let doc = Document::new()
        .with_plain("_id", 10)
        .with_plain("owner", "bob")
        .with_pending("ssn", "987-65-4321");
    let labeled = apply(&mut ctx, &token, &col, doc).expect("conforming");

    assert_eq!(labeled.label(), &SecurityLabel::new(Level::Internal, ["bob"]));
    match labeled.value().get("ssn") {
        Some(FieldValue::Protected(Protected::Labeled(l))) => {
            assert_eq!(l.label(), &SecurityLabel::new(Level::Regulated, ["bob"]));
        }
        other => panic!("ssn should be labeled, got {other:?}"),
    }
}

#[test]
fn declared_collection_rejects_owner_outside_clearance() {
    let config = parse_clinic();
    let mut ctx = caller();
    let token = DelegationToken::none("clinic");
    let col = config
        .collection("patients")
        .expect("declared")
        .create(&ctx, &token)
        .expect("valid collection");

    let doc = Document::new()
        .with_plain("owner", "mallory")
        .with_pending("ssn", "000-00-0000");
    assert!(matches!(
        apply(&mut ctx, &token, &col, doc),
        Err(PolicyError::Violation)
    ));
}

#[test]
fn rule_reading_undeclared_field_is_rejected() {
    let toml_str = r#"
[[collections]]
name = "notes"
clearance = { level = "sensitive" }

[collections.policy.fields]
body = { protected = { level = "sensitive", compartments_from = ["author"] } }
"#;
    let config = Config::from_toml(toml_str).expect("valid toml");
    let spec = config.collection("notes").expect("declared");
    match spec.create(&caller(), &DelegationToken::none("notes")) {
        Err(ConfigError::UndeclaredSource { rule, from_field }) => {
            assert_eq!(rule, "body");
            assert_eq!(from_field, "author");
        }
        other => panic!("expected undeclared source, got {other:?}"),
    }
}

#[test]
fn collection_outside_caller_clearance_is_rejected() {
    let config = parse_clinic();
    let narrow = LabelContext::new(SecurityLabel::bottom(), SecurityLabel::at(Level::Internal))
        .expect("valid bounds");
    let result = config
        .collection("patients")
        .expect("declared")
        .create(&narrow, &DelegationToken::none("clinic"));
    assert!(matches!(result, Err(ConfigError::Label(_))));
}

#[test]
fn unknown_level_fails_to_parse() {
    let toml_str = r#"
[[collections]]
name = "x"
clearance = { level = "cosmic" }
"#;
    assert!(Config::from_toml(toml_str).is_err());
}

#[test]
fn load_from_file() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("labelgate.toml");
    std::fs::write(&path, CLINIC_TOML).expect("should write config");

    let config = Config::load_from_path(&path).expect("should load");
    assert_eq!(config.collections.len(), 1);
}

#[test]
fn missing_file_yields_defaults() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let config = Config::load_from_path(&tmp.path().join("absent.toml")).expect("defaults");
    assert_eq!(config.logging.level, "info");
    assert!(config.collections.is_empty());
}

#[test]
fn load_with_env_path_and_overrides() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("custom.toml");
    std::fs::write(&path, CLINIC_TOML).expect("should write config");

    let mut env = HashMap::new();
    env.insert("LABELGATE_CONFIG_PATH", path.display().to_string());
    env.insert("LABELGATE_LOG_LEVEL", "trace".to_owned());

    let config = Config::load_with(|key| env.get(key).cloned()).expect("should load");
    assert_eq!(config.logging.level, "trace");
    assert!(config.collection("patients").is_some());
}
