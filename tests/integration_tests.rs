//! Integration tests across the workspace crates
//!
//! - fact instance → catalog → SQL pipeline
//! - SQL DDL → catalog fixture → evaluator
//! - boolean certainty and SQL certainty agree on the same data
//!
//! Run with: cargo test --test integration_tests

use cqa_dsl::{is_certain, parse_instance};
use cqa_repair::{
    Catalog, CertaintyDetail, Evaluator, EvaluatorConfig, IdentityQuery, RelationStore,
    StatementKind, Tuple,
};
use cqa_sql::{parse_sql_ddl, SqlEngine, Workbench};

// ============================================================================
// Instance → SQL
// ============================================================================

const INSTANCE: &str = "
@database
Emp(Ann ; Sales)
Emp(Ann ; Ops)
Emp(Bob ; Ops)
Dept(Sales)
Dept(Ops)

@query
Emp(Bob ; d)
Dept(d)
";

#[test]
fn instance_catalog_feeds_the_sql_pipeline() {
    let instance = parse_instance(INSTANCE).unwrap();
    let catalog = instance.to_catalog().unwrap();
    let mut bench = Workbench::new(SqlEngine::with_catalog(catalog), EvaluatorConfig::default());

    let ids = bench
        .run("SELECT a1 FROM Emp WHERE k1 = 'Ann'; SELECT a1 FROM Emp WHERE k1 = 'Bob'")
        .unwrap();
    let ann = bench.session().get(ids[0]).unwrap();
    let bob = bench.session().get(ids[1]).unwrap();

    assert_eq!(ann.key_column.as_deref(), Some("k1"));
    assert!(!ann.certainty.certain);
    assert!(bob.certainty.certain);
    assert_eq!(bob.certainty.detail.repairs().len(), 2);
    for outcome in bob.certainty.detail.repairs() {
        assert_eq!(outcome.answer, vec![Tuple::new().with("a1", "Ops")]);
    }
}

#[test]
fn boolean_and_sql_certainty_agree() {
    let instance = parse_instance(INSTANCE).unwrap();
    assert!(is_certain(&instance, &EvaluatorConfig::default()).unwrap());

    let uncertain = parse_instance(&INSTANCE.replace("Emp(Bob ; d)", "Emp(Ann ; Sales)"))
        .unwrap();
    assert!(!is_certain(&uncertain, &EvaluatorConfig::default()).unwrap());
}

// ============================================================================
// DDL → catalog → evaluator
// ============================================================================

#[test]
fn ddl_declarations_build_a_fixture() {
    let decls = parse_sql_ddl(
        "CREATE TABLE P (id INT PRIMARY KEY, v TEXT);
         CREATE TABLE R (a INT, b INT, PRIMARY KEY (a, b));",
    )
    .unwrap();

    let mut catalog = Catalog::new();
    for decl in decls {
        catalog
            .create_table(&decl.name, decl.columns, decl.primary_key)
            .unwrap();
    }
    catalog
        .insert("P", Tuple::new().with("id", 1).with("v", "A"))
        .unwrap();
    catalog
        .insert("P", Tuple::new().with("id", 1).with("v", "B"))
        .unwrap();

    let reloaded = Catalog::from_json(&catalog.to_json().unwrap()).unwrap();
    let meta = reloaded.key_metadata("P").unwrap();
    assert_eq!(meta.single_column(), Some("id"));
    assert!(meta.violated);
    assert_eq!(reloaded.key_metadata("R").unwrap().columns, vec!["a", "b"]);

    let plan = Evaluator::default().plan(&reloaded, "P", &meta.columns).unwrap();
    assert_eq!(plan.count(), Some(2));
}

#[test]
fn composite_key_select_is_not_enumerated() {
    let mut bench = Workbench::default();
    bench
        .run(
            "CREATE TABLE R (a INT, b INT, c TEXT, PRIMARY KEY (a, b));
             INSERT INTO R VALUES (1, 1, 'x'), (1, 1, 'y');
             SELECT c FROM R",
        )
        .unwrap();
    let record = bench.session().records().last().unwrap();
    assert_eq!(record.kind, StatementKind::Select);
    assert!(record.key_violation);
    assert_eq!(record.key_column, None);
    assert_eq!(record.certainty.detail, CertaintyDetail::NoError);
}

#[test]
fn identity_query_compares_whole_repairs() {
    use cqa_repair::{is_first_order, CertaintyRequest};

    let catalog = parse_instance(INSTANCE).unwrap().to_catalog().unwrap();
    let snapshot = catalog.read_relation("Emp").unwrap();
    let text = "SELECT * FROM Emp";
    let kind = StatementKind::classify(text);
    let request = CertaintyRequest {
        query: text,
        kind,
        target_relation: "Emp",
        result: &snapshot.tuples,
        has_key_violation: true,
        first_order: is_first_order(text, kind),
        key_column: Some("k1"),
    };

    let certainty = Evaluator::default()
        .evaluate(&catalog, &IdentityQuery, &request)
        .unwrap();
    assert!(!certainty.certain);
    let repairs = certainty.detail.repairs();
    assert_eq!(repairs.len(), 2);
    for outcome in repairs {
        assert_eq!(outcome.repair, outcome.answer);
        assert_eq!(outcome.repair.len(), 2);
    }
}
