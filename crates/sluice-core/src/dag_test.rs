use super::*;
use crate::model::ModelDefinition;
use crate::resolver::resolve_all;

fn decls(items: &[(&str, &[&str])]) -> Vec<(String, Vec<String>)> {
    items
        .iter()
        .map(|(name, deps)| {
            (
                name.to_string(),
                deps.iter().map(|d| d.to_string()).collect(),
            )
        })
        .collect()
}

fn names(order: &[ModelName]) -> Vec<&str> {
    order.iter().map(|n| n.as_str()).collect()
}

#[test]
fn test_dependencies_come_first() {
    let dag = ModelDag::from_declarations(&decls(&[
        ("fct_message", &["stg_messages", "dim_channel"]),
        ("dim_channel", &["stg_messages"]),
        ("stg_messages", &["raw.telegram_messages"]),
    ]))
    .unwrap();
    assert_eq!(
        names(dag.topological_order()),
        vec!["stg_messages", "dim_channel", "fct_message"]
    );
}

#[test]
fn test_ties_broken_by_declaration_order() {
    let dag = ModelDag::from_declarations(&decls(&[
        ("stg_b", &[]),
        ("stg_a", &[]),
        ("dim_x", &["stg_a"]),
        ("stg_c", &[]),
    ]))
    .unwrap();
    assert_eq!(
        names(dag.topological_order()),
        vec!["stg_b", "stg_a", "dim_x", "stg_c"]
    );
}

#[test]
fn test_order_is_deterministic() {
    let input = decls(&[
        ("d", &["b", "c"]),
        ("c", &["a"]),
        ("b", &["a"]),
        ("a", &[]),
        ("e", &[]),
    ]);
    let first = ModelDag::from_declarations(&input).unwrap();
    for _ in 0..10 {
        let again = ModelDag::from_declarations(&input).unwrap();
        assert_eq!(first.topological_order(), again.topological_order());
    }
    assert_eq!(names(first.topological_order()), vec!["a", "c", "b", "d", "e"]);
}

#[test]
fn test_every_edge_respected() {
    let input = decls(&[
        ("m5", &["m3", "m4"]),
        ("m4", &["m1"]),
        ("m3", &["m2", "m1"]),
        ("m2", &["m1"]),
        ("m1", &[]),
    ]);
    let dag = ModelDag::from_declarations(&input).unwrap();
    let order = dag.topological_order();
    let pos = |n: &str| order.iter().position(|m| m == n).unwrap();
    for (model, deps) in &input {
        for dep in deps {
            assert!(pos(dep.as_str()) < pos(model.as_str()), "{dep} must precede {model}");
        }
    }
}

#[test]
fn test_two_node_cycle_reported_in_full() {
    let err = ModelDag::from_declarations(&decls(&[("a", &["b"]), ("b", &["a"])])).unwrap_err();
    match err {
        CoreError::CyclicDependency { cycle } => assert_eq!(cycle, vec!["a", "b", "a"]),
        other => panic!("expected CyclicDependency, got {other:?}"),
    }
}

#[test]
fn test_cycle_behind_acyclic_prefix() {
    let err = ModelDag::from_declarations(&decls(&[
        ("stg", &[]),
        ("report", &["y"]),
        ("x", &["stg", "z"]),
        ("y", &["x"]),
        ("z", &["y"]),
    ]))
    .unwrap_err();
    match err {
        CoreError::CyclicDependency { cycle } => assert_eq!(cycle, vec!["x", "z", "y", "x"]),
        other => panic!("expected CyclicDependency, got {other:?}"),
    }
}

#[test]
fn test_self_reference_is_cycle() {
    let err = ModelDag::from_declarations(&decls(&[("a", &["a"])])).unwrap_err();
    assert_eq!(
        err.to_string(),
        "[E007] Cyclic dependency detected: a -> a"
    );
}

#[test]
fn test_duplicate_declaration() {
    let err = ModelDag::from_declarations(&decls(&[("a", &[]), ("a", &[])])).unwrap_err();
    assert!(matches!(err, CoreError::DuplicateModelName { .. }));
}

#[test]
fn test_build_from_registry() {
    let registry = Registry::load(
        vec![
            ModelDefinition::new("fct_message", "SELECT * FROM {{ ref('dim_channel') }}"),
            ModelDefinition::new("dim_channel", "SELECT * FROM {{ ref('stg_messages') }}"),
            ModelDefinition::new("stg_messages", "SELECT 1"),
        ],
        vec![],
    )
    .unwrap();
    let resolved = resolve_all(&registry).unwrap();
    let dag = ModelDag::build(&registry, &resolved).unwrap();
    assert_eq!(
        names(dag.topological_order()),
        vec!["stg_messages", "dim_channel", "fct_message"]
    );
    assert!(dag.contains("stg_messages"));
    assert_eq!(dag.dependencies("fct_message"), vec![ModelName::new("dim_channel")]);
}

#[test]
fn test_neighbors_and_reachability() {
    let dag = ModelDag::from_declarations(&decls(&[
        ("stg_messages", &[]),
        ("dim_channel", &["stg_messages"]),
        ("dim_dates", &[]),
        ("fct_message", &["stg_messages", "dim_channel", "dim_dates"]),
    ]))
    .unwrap();

    assert_eq!(
        names(&dag.dependencies("fct_message")),
        vec!["stg_messages", "dim_channel", "dim_dates"]
    );
    assert_eq!(
        names(&dag.dependents("stg_messages")),
        vec!["dim_channel", "fct_message"]
    );
    assert_eq!(
        names(&dag.descendants("stg_messages")),
        vec!["dim_channel", "fct_message"]
    );
    assert_eq!(
        names(&dag.ancestors("fct_message")),
        vec!["stg_messages", "dim_channel", "dim_dates"]
    );
    assert!(dag.descendants("unknown").is_empty());
}

#[test]
fn test_selectors() {
    let dag = ModelDag::from_declarations(&decls(&[
        ("stg", &[]),
        ("dim", &["stg"]),
        ("fct", &["dim"]),
        ("other", &[]),
    ]))
    .unwrap();

    assert_eq!(names(&dag.select("dim").unwrap()), vec!["dim"]);
    assert_eq!(names(&dag.select("+dim").unwrap()), vec!["stg", "dim"]);
    assert_eq!(names(&dag.select("dim+").unwrap()), vec!["dim", "fct"]);
    assert_eq!(
        names(&dag.select_many(&["other", "stg+"]).unwrap()),
        vec!["stg", "dim", "fct", "other"]
    );
    assert!(matches!(
        dag.select("missing"),
        Err(CoreError::ModelNotFound { .. })
    ));
    assert!(matches!(
        dag.select("+"),
        Err(CoreError::InvalidSelector { .. })
    ));
}
