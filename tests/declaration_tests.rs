//! End-to-end tests: declaration files on disk, compiled and checked
//! against JSON instances.

use std::path::Path;

use serde_json::json;
use shapecheck::{
    CheckResult, CustomTypes, DeclarationParser, ErrorKind, FsSource, Instance, Marker, MemorySource, ReturnMode,
    Schema, ShapeError, Value,
};

fn fixtures_path() -> &'static Path {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").leak()
}

fn fixtures() -> FsSource {
    FsSource::new().with_root(fixtures_path())
}

fn instance(name: &str) -> serde_json::Value {
    let path = fixtures_path().join("instances").join(name);
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

fn load(path: &str, mode: ReturnMode) -> Schema {
    let mut schema = DeclarationParser::new().load_schema(&fixtures(), path).unwrap();
    schema.set_return_mode(mode);
    schema
}

// =============================================================================
// Loading
// =============================================================================

#[test]
fn test_extension_is_optional() {
    let parser = DeclarationParser::new();
    let bare = parser.parse_source(&fixtures(), "user").unwrap();
    let full = parser.parse_source(&fixtures(), "user.decl").unwrap();
    assert_eq!(bare, full);
    assert_eq!(bare.fields.len(), 4);
}

#[test]
fn test_missing_declaration_is_a_source_error() {
    let err = DeclarationParser::new().parse_source(&fixtures(), "nope").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Source);
}

#[test]
fn test_bad_default_reports_statement() {
    match DeclarationParser::new().parse_source(&fixtures(), "broken") {
        Err(ShapeError::DeclarationSyntax { index, statement, .. }) => {
            assert_eq!(index, 1);
            assert_eq!(statement, "age = Optional<number:forty>");
        }
        other => panic!("Expected DeclarationSyntax, got {:?}", other),
    }
}

#[test]
fn test_memory_source_matches_fs_source() {
    let text = std::fs::read_to_string(fixtures_path().join("user.decl")).unwrap();
    let memory = MemorySource::new().with("user", text);
    let parser = DeclarationParser::new();
    assert_eq!(
        parser.parse_source(&memory, "user").unwrap(),
        parser.parse_source(&fixtures(), "user").unwrap()
    );
}

// =============================================================================
// Checking
// =============================================================================

#[test]
fn test_complete_instance_passes_in_every_mode() {
    let data = instance("complete.json");

    assert_eq!(load("user", ReturnMode::Boolean).check_json(&data).unwrap(), CheckResult::Boolean(true));

    let all = load("user", ReturnMode::All).check_json(&data).unwrap();
    assert_eq!(all.is_valid(), Some(true));
    assert_eq!(all.to_json()["values"], data);
}

#[test]
fn test_sparse_instance_falls_back_to_defaults() {
    let data = instance("sparse.json");

    // Missing optional fields still fail the boolean verdict
    let boolean = load("user", ReturnMode::Boolean).check_json(&data).unwrap();
    assert_eq!(boolean.is_valid(), Some(false));

    let value = load("user", ReturnMode::Value).check_json(&data).unwrap();
    assert_eq!(value.to_json(), json!({"name": "anon", "age": 7, "tags": []}));
}

#[test]
fn test_wrong_instance_is_filtered() {
    let data = instance("wrong.json");

    let result = load("user", ReturnMode::All).check_json(&data).unwrap();
    assert_eq!(result.is_valid(), Some(false));
    assert_eq!(result.to_json()["values"], json!({"name": "anon", "tags": ["a"]}));
}

#[test]
fn test_throw_setting_applies_to_earlier_fields() {
    let schema = load("strict", ReturnMode::Value);

    let err = schema.check_json(&json!({"id": "one"})).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailure);

    let result = schema.check_json(&json!({"id": 1})).unwrap();
    assert_eq!(result.to_json(), json!({"id": 1, "labels": []}));
}

#[test]
fn test_non_object_instance_is_rejected() {
    let schema = load("user", ReturnMode::Boolean);
    for bad in [json!(null), json!(3), json!("user"), json!(["a"])] {
        let err = schema.check_json(&bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput, "input {}", bad);
    }
}

#[test]
fn test_custom_types_resolve_to_classes() {
    let custom: CustomTypes = [("Owner", Marker::new("Account"))].into_iter().collect();
    let schema = DeclarationParser::new()
        .with_custom_types(custom)
        .parse("owner = Owner; backups = Optional<Array<Owner>>;")
        .unwrap()
        .build_schema()
        .unwrap();

    let account = Value::from(Instance::new(Marker::new("Account")).with_field("id", 1));
    let admin = Value::from(
        Instance::new(Marker::new("Admin"))
            .extends(Marker::new("Account"))
            .with_field("id", 2),
    );

    let mut fields = shapecheck::Map::new();
    fields.insert("owner".to_string(), admin.clone());
    fields.insert("backups".to_string(), Value::Array(vec![account, Value::from("nobody")]));
    let data = Value::Object(fields);

    assert_eq!(schema.check(&data).unwrap(), CheckResult::Boolean(false));

    let mut all = schema.clone();
    all.set_return_mode(ReturnMode::Value);
    let values = all.check(&data).unwrap();
    let values = values.values().unwrap();
    assert_eq!(values["owner"], admin);
    assert_eq!(values["backups"].as_array().map(|items| items.len()), Some(1));
}

#[test]
fn test_schema_from_json_structure() {
    let schema = Schema::from_json(&json!({
        "id": "number",
        "tags": ["string"],
        "note": {"type": "string", "required": false, "default": "-"},
    }))
    .unwrap();

    let mut schema = schema;
    schema.set_return_mode_str("all");
    let result = schema.check_json(&json!({"id": 4, "tags": ["x"], "note": 9})).unwrap();
    assert_eq!(result.is_valid(), Some(false));
    assert_eq!(result.to_json()["values"], json!({"id": 4, "tags": ["x"], "note": "-"}));
}
