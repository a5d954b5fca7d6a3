use super::*;

#[test]
fn test_try_new_rejects_empty() {
    assert!(ModelName::try_new("").is_none());
    assert_eq!(ModelName::try_new("dim_channel").unwrap(), "dim_channel");
}

#[test]
#[should_panic(expected = "must not be empty")]
fn test_new_panics_on_empty() {
    let _ = ModelName::new("");
}

#[test]
fn test_deserialize_rejects_empty() {
    let err = serde_json::from_str::<ModelName>(r#""""#).unwrap_err();
    assert!(err.to_string().contains("must not be empty"));
}

#[test]
fn test_serialize_is_transparent() {
    let json = serde_json::to_string(&ModelName::new("stg_messages")).unwrap();
    assert_eq!(json, r#""stg_messages""#);
}

#[test]
fn test_borrow_lookup() {
    let mut set = std::collections::HashSet::new();
    set.insert(ModelName::new("fct_message"));
    assert!(set.contains("fct_message"));
}

#[test]
fn test_ordering_is_lexical() {
    let mut names = vec![ModelName::new("stg_b"), ModelName::new("dim_a")];
    names.sort();
    assert_eq!(names[0], "dim_a");
}
