use super::*;
use minijinja::Environment;

fn env_with_helpers() -> Environment<'static> {
    let mut env = Environment::new();
    env.add_function("surrogate_key", surrogate_key);
    env.add_function("date_spine", date_spine);
    env
}

#[test]
fn test_json_to_minijinja_value() {
    let json = serde_json::json!({
        "string": "hello",
        "number": 42,
        "array": [1, 2, 3]
    });

    let value = json_to_minijinja_value(&json);
    assert_eq!(value.get_attr("number").unwrap(), Value::from(42));
    assert_eq!(value.get_attr("array").unwrap().len(), Some(3));
}

#[test]
fn test_yaml_to_json() {
    let yaml: serde_yaml::Value = serde_yaml::from_str("key: value\nn: 1.5").unwrap();
    let json = yaml_to_json(&yaml);
    assert_eq!(json["key"], "value");
    assert_eq!(json["n"], 1.5);
}

#[test]
fn test_ref_fn_lookup() {
    let f = make_ref_fn(|name: &str| (name == "a").then(|| "\"main\".\"a\"".to_string()));
    assert_eq!(f("a").unwrap(), "\"main\".\"a\"");
    let err = f("b").unwrap_err();
    assert!(err.to_string().contains("ref('b')"));
}

#[test]
fn test_source_fn_lookup() {
    let f = make_source_fn(|g: &str, t: &str| Some(format!("{g}.{t}")));
    assert_eq!(f("raw", "telegram_messages").unwrap(), "raw.telegram_messages");
}

#[test]
fn test_surrogate_key_list_and_variadic_agree() {
    let env = env_with_helpers();
    let from_list = env
        .render_str("{{ surrogate_key(['channel', 'date_day']) }}", ())
        .unwrap();
    let variadic = env
        .render_str("{{ surrogate_key('channel', 'date_day') }}", ())
        .unwrap();
    assert_eq!(from_list, variadic);
    assert_eq!(from_list, surrogate_key_sql(&["channel", "date_day"]));
}

#[test]
fn test_surrogate_key_requires_columns() {
    let env = env_with_helpers();
    assert!(env.render_str("{{ surrogate_key([]) }}", ()).is_err());
    assert!(env.render_str("{{ surrogate_key([1]) }}", ()).is_err());
}

#[test]
fn test_date_spine() {
    let sql = date_spine("2024-01-01", "2024-01-31").unwrap();
    assert!(sql.contains("generate_series(DATE '2024-01-01', DATE '2024-01-31'"));
    assert!(sql.contains("AS date_day"));
}

#[test]
fn test_date_spine_rejects_bad_dates() {
    let err = date_spine("01/01/2024", "2024-01-31").unwrap_err();
    assert!(err.to_string().contains("start_date"));
    assert!(date_spine("2024-01-01", "2024-01-31'; DROP TABLE x; --").is_err());
}

#[test]
fn test_config_value_to_string() {
    assert_eq!(
        config_value_to_string("materialized", &Value::from("table")).unwrap(),
        "table"
    );
    assert_eq!(
        config_value_to_string("tags", &Value::from(vec!["daily", "telegram"])).unwrap(),
        "daily,telegram"
    );
    assert_eq!(config_value_to_string("x", &Value::from(true)).unwrap(), "true");

    let map = json_to_minijinja_value(&serde_json::json!({"a": 1}));
    assert!(config_value_to_string("schema", &map).is_err());
}
