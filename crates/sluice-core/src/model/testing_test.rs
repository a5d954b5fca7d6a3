use super::*;

fn parse_yaml(yaml: &str) -> Vec<TestDefinition> {
    serde_yaml::from_str(yaml).unwrap()
}

#[test]
fn test_parse_simple_tests() {
    let defs = parse_yaml("- unique\n- not_null\n");
    assert_eq!(parse_test_definition(&defs[0]), Some(TestType::Unique));
    assert_eq!(parse_test_definition(&defs[1]), Some(TestType::NotNull));
}

#[test]
fn test_parse_unknown_simple_test() {
    let defs = parse_yaml("- positive\n");
    assert_eq!(parse_test_definition(&defs[0]), None);
}

#[test]
fn test_parse_accepted_values() {
    let defs = parse_yaml(
        r#"
- accepted_values:
    values: [true, false]
"#,
    );
    assert_eq!(
        parse_test_definition(&defs[0]),
        Some(TestType::AcceptedValues {
            values: vec!["true".to_string(), "false".to_string()],
            quote: true,
        })
    );
}

#[test]
fn test_accepted_values_quote_opt_out() {
    let defs = parse_yaml(
        r#"
- accepted_values:
    values: ["001", "002"]
- accepted_values:
    values: [1, 2]
    quote: false
"#,
    );
    assert_eq!(
        parse_test_definition(&defs[0]),
        Some(TestType::AcceptedValues {
            values: vec!["001".to_string(), "002".to_string()],
            quote: true,
        })
    );
    assert_eq!(
        parse_test_definition(&defs[1]),
        Some(TestType::AcceptedValues {
            values: vec!["1".to_string(), "2".to_string()],
            quote: false,
        })
    );
}

#[test]
fn test_parse_accepted_values_requires_values() {
    let defs = parse_yaml("- accepted_values:\n    quote: true\n");
    assert_eq!(parse_test_definition(&defs[0]), None);
}

#[test]
fn test_parse_relationship() {
    let defs = parse_yaml(
        r#"
- relationships:
    to: ref('dim_channel')
    field: channel_key
"#,
    );
    assert_eq!(
        parse_test_definition(&defs[0]),
        Some(TestType::Relationship {
            to: "ref('dim_channel')".to_string(),
            field: Some("channel_key".to_string()),
        })
    );
}

#[test]
fn test_parse_expression_and_severity() {
    let defs = parse_yaml(
        r#"
- expression_is_true:
    expression: "views >= 0"
    severity: warn
"#,
    );
    assert_eq!(
        parse_test_definition(&defs[0]),
        Some(TestType::Expression {
            expression: "views >= 0".to_string()
        })
    );
    assert_eq!(test_severity(&defs[0]), TestSeverity::Warn);
}

#[test]
fn test_parameterized_not_null_with_severity() {
    let defs = parse_yaml("- not_null:\n    severity: warn\n");
    assert_eq!(parse_test_definition(&defs[0]), Some(TestType::NotNull));
    assert_eq!(test_severity(&defs[0]), TestSeverity::Warn);
    assert_eq!(defs[0].declared_name(), "not_null");
}

#[test]
fn test_schema_test_name() {
    let test = SchemaTest {
        model: ModelName::new("stg_messages"),
        column: Some("message_id".to_string()),
        test_type: TestType::NotNull,
        severity: TestSeverity::Error,
    };
    assert_eq!(test.name(), "not_null_stg_messages_message_id");

    let model_level = SchemaTest {
        column: None,
        test_type: TestType::Expression {
            expression: "1 = 1".to_string(),
        },
        ..test
    };
    assert_eq!(model_level.name(), "expression_stg_messages");
}

#[test]
fn test_singular_from_file_rejects_empty() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("assert_nothing.sql");
    std::fs::write(&path, "   \n").unwrap();
    let err = SingularTest::from_file(path).unwrap_err();
    assert!(matches!(err, CoreError::TestValidationError { .. }));
}

#[test]
fn test_singular_from_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("assert_no_future_messages.sql");
    std::fs::write(&path, "SELECT * FROM {{ ref('fct_message') }} WHERE 1 = 0").unwrap();
    let test = SingularTest::from_file(path.clone()).unwrap();
    assert_eq!(test.name, "assert_no_future_messages");
    assert_eq!(test.path, Some(path));
}
