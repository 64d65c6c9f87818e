use std::collections::BTreeMap;

use cqa_dsl::{is_certain, parse_instance, Instance};
use cqa_repair::EvaluatorConfig;
use proptest::prelude::*;

/// A generated fact: predicate, key arguments, remaining arguments.
type GenFact = (String, Vec<String>, Vec<String>);

fn constant() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-C][0-9]?").unwrap()
}

fn fact() -> impl Strategy<Value = GenFact> {
    (
        prop_oneof![Just("R".to_string()), Just("S".to_string())],
        proptest::collection::vec(constant(), 1..=2),
        proptest::collection::vec(constant(), 0..=2),
    )
}

fn render(pred: &str, key: &[String], rest: &[String]) -> String {
    if rest.is_empty() {
        format!("{pred}({})", key.join(", "))
    } else {
        format!("{pred}({} ; {})", key.join(" "), rest.join(", "))
    }
}

fn instance(facts: &[GenFact], query: &str) -> Instance {
    let mut text = String::from("@database\n");
    for (pred, key, rest) in facts {
        text.push_str(&render(pred, key, rest));
        text.push('\n');
    }
    text.push_str("@query\n");
    text.push_str(query);
    parse_instance(&text).unwrap()
}

// ============================================================================
// Reference model
// ============================================================================

/// The queries under test, each with a hand-written evaluator over plain
/// `(pred, args)` pairs.
#[derive(Debug, Clone, Copy)]
enum Shape {
    AnyPair,
    PairWithoutS,
    PairKeyedA,
    PairJoinedS,
}

impl Shape {
    fn text(self) -> &'static str {
        match self {
            Shape::AnyPair => "R(x ; y)",
            Shape::PairWithoutS => "R(x ; y)\nnot S(y)",
            Shape::PairKeyedA => "R(A ; y)",
            Shape::PairJoinedS => "R(x ; y)\nS(y)",
        }
    }

    fn holds(self, db: &[(&str, Vec<&str>)]) -> bool {
        let pairs = || {
            db.iter()
                .filter(|(p, args)| *p == "R" && args.len() == 2)
                .map(|(_, args)| args)
        };
        let has_s = |y: &str| {
            db.iter()
                .any(|(p, args)| *p == "S" && args.len() == 1 && args[0] == y)
        };
        match self {
            Shape::AnyPair => pairs().next().is_some(),
            Shape::PairWithoutS => pairs().any(|a| !has_s(a[1])),
            Shape::PairKeyedA => pairs().any(|a| a[0] == "A"),
            Shape::PairJoinedS => pairs().any(|a| has_s(a[1])),
        }
    }
}

fn kept(mask: u32, i: usize) -> bool {
    mask & (1u32 << i) != 0
}

/// Every sub-database that keeps exactly one fact per (predicate, key).
fn brute_force_repairs(facts: &[GenFact]) -> Vec<Vec<(&str, Vec<&str>)>> {
    let mut groups: BTreeMap<(&str, &[String]), Vec<usize>> = BTreeMap::new();
    for (i, (pred, key, _)) in facts.iter().enumerate() {
        groups.entry((pred.as_str(), key.as_slice())).or_default().push(i);
    }

    (0u32..1u32 << facts.len())
        .filter(|mask| {
            groups
                .values()
                .all(|members| members.iter().filter(|&&i| kept(*mask, i)).count() == 1)
        })
        .map(|mask| {
            facts
                .iter()
                .enumerate()
                .filter(|(i, _)| kept(mask, *i))
                .map(|(_, (pred, key, rest))| {
                    let args = key.iter().chain(rest).map(String::as_str).collect();
                    (pred.as_str(), args)
                })
                .collect()
        })
        .collect()
}

fn shape() -> impl Strategy<Value = Shape> {
    prop_oneof![
        Just(Shape::AnyPair),
        Just(Shape::PairWithoutS),
        Just(Shape::PairKeyedA),
        Just(Shape::PairJoinedS),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn parsed_facts_keep_key_split(facts in proptest::collection::vec(fact(), 1..8)) {
        let inst = instance(&facts, "R(x)");
        prop_assert_eq!(inst.database.len(), facts.len());
        for (parsed, (pred, key, rest)) in inst.database.iter().zip(&facts) {
            prop_assert_eq!(&parsed.pred, pred);
            prop_assert_eq!(parsed.key(), key.as_slice());
            prop_assert_eq!(&parsed.args[key.len()..], rest.as_slice());
        }
    }

    #[test]
    fn certain_agrees_with_brute_force(
        facts in proptest::collection::vec(fact(), 1..7),
        shape in shape(),
    ) {
        let inst = instance(&facts, shape.text());
        let certain = is_certain(&inst, &EvaluatorConfig::default()).unwrap();

        let repairs = brute_force_repairs(&facts);
        prop_assert!(!repairs.is_empty());
        let expected = repairs.iter().all(|db| shape.holds(db));
        prop_assert_eq!(certain, expected);
    }
}

// ============================================================================
// Worked cases
// ============================================================================

fn certain(text: &str) -> bool {
    is_certain(&parse_instance(text).unwrap(), &EvaluatorConfig::default()).unwrap()
}

#[test]
fn all_key_atoms_with_negation() {
    assert!(certain(
        "@database
         Likes(John, Paris;)
         Dislikes(John, London;)
         Hates(John, Berlin;)
         @query
         Likes(p, t;)
         not Dislikes(p, t)
         not Hates(t, p)"
    ));
}

#[test]
fn negated_student_blocks_the_only_match() {
    let db = "@database
              Parent(John, Mary;)
              Parent(Mary, Alice;)
              Teacher(Mary;)
              STUDENT
              @query
              Parent(x, y;)
              Teacher(x;)
              not Student(y;)";
    assert!(!certain(&db.replace("STUDENT", "Student(Alice;)")));
    assert!(certain(&db.replace("STUDENT", "Student(Bob;)")));
}

#[test]
fn three_way_join_with_absent_negation() {
    assert!(certain(
        "@database
         P(a, b;)
         Q(a, c;)
         R(c, b;)
         @query
         P(x, y;)
         Q(x, z;)
         R(z, y;)
         not S(x, y, z)"
    ));
}

#[test]
fn cycle_closed_by_negated_fact() {
    assert!(!certain(
        "@database
         P(a; b)
         Q(b; c)
         R(c; a)
         D(a, b, c;)
         @query
         P(x; y)
         Q(y; z)
         R(z; x)
         not D(x, y, z)"
    ));
}
