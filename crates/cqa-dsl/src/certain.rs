//! Boolean certainty of a conjunctive query with negated atoms.
//!
//! The query holds in a database when some assignment of its variables
//! matches every positive atom to a fact and no negated atom matches any
//! fact under that assignment. It is certain when it holds in every repair.

use std::collections::HashMap;

use cqa_repair::{Evaluator, EvaluatorConfig, RepairPlan};

use crate::instance::{Atom, Fact, Instance};

type Bindings<'a> = HashMap<&'a str, &'a str>;

/// Terms starting with a lowercase letter are variables; everything else is
/// a constant.
pub fn is_variable(term: &str) -> bool {
    term.chars().next().is_some_and(char::is_lowercase)
}

/// Extend `env` so that `pattern` matches `args`, or `None` if it cannot.
fn unify<'a>(
    pattern: &'a [String],
    args: &'a [String],
    env: &Bindings<'a>,
) -> Option<Bindings<'a>> {
    if pattern.len() != args.len() {
        return None;
    }
    let mut next = env.clone();
    for (p, a) in pattern.iter().zip(args) {
        if is_variable(p) {
            match next.get(p.as_str()) {
                Some(bound) if *bound != a.as_str() => return None,
                Some(_) => {}
                None => {
                    next.insert(p, a);
                }
            }
        } else if p != a {
            return None;
        }
    }
    Some(next)
}

fn matching<'a, 'f>(
    facts: &'f [&'a Fact],
    atom: &'a Atom,
) -> impl Iterator<Item = &'a Fact> + 'f {
    let pred = atom.pred.as_str();
    facts.iter().copied().filter(move |f| f.pred == pred)
}

/// Evaluate `query` on `facts`. Positive atoms are joined first, in query
/// order; negated atoms then filter the surviving assignments.
pub fn holds<'a>(facts: &[&'a Fact], query: &'a [Atom]) -> bool {
    let ordered = query
        .iter()
        .filter(|a| !a.negated)
        .chain(query.iter().filter(|a| a.negated));

    let mut envs: Vec<Bindings<'a>> = vec![Bindings::new()];
    for atom in ordered {
        envs = if atom.negated {
            envs.into_iter()
                .filter(|env| {
                    matching(facts, atom).all(|f| unify(&atom.args, &f.args, env).is_none())
                })
                .collect()
        } else {
            envs.iter()
                .flat_map(|env| {
                    matching(facts, atom).filter_map(move |f| unify(&atom.args, &f.args, env))
                })
                .collect()
        };
        if envs.is_empty() {
            return false;
        }
    }
    true
}

/// Whether the instance's query holds in every repair of its database.
///
/// Facts conflict when they share a predicate and key arguments. Enumeration
/// stops at the first repair where the query fails.
pub fn is_certain(instance: &Instance, config: &EvaluatorConfig) -> cqa_repair::Result<bool> {
    let facts: Vec<&Fact> = instance.database.iter().collect();
    let plan = RepairPlan::prepare(facts, |f: &&Fact| f.key_token());
    Evaluator::new(config.clone()).check_budget("@database", &plan)?;

    tracing::debug!(
        facts = plan.items().len(),
        groups = plan.groups().len(),
        repairs = ?plan.count(),
        "checking boolean certainty"
    );

    for (index, repair) in plan.repairs().enumerate() {
        if !holds(&repair, &instance.query) {
            tracing::debug!(repair = index, "query fails in repair");
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::parse_instance;

    fn certain(text: &str) -> bool {
        let inst = parse_instance(text).unwrap();
        is_certain(&inst, &EvaluatorConfig::default()).unwrap()
    }

    #[test]
    fn variables_are_lowercase_initial() {
        assert!(is_variable("x"));
        assert!(is_variable("xs1"));
        assert!(!is_variable("X"));
        assert!(!is_variable("1"));
        assert!(!is_variable(""));
    }

    #[test]
    fn join_on_shared_variable() {
        let inst = parse_instance(
            "@database\nR(A ; B)\nS(B ; C)\n@query\nR(x ; y)\nS(y ; z)",
        )
        .unwrap();
        let facts: Vec<&Fact> = inst.database.iter().collect();
        assert!(holds(&facts, &inst.query));

        let broken = parse_instance("@database\nR(A ; B)\nS(D ; C)\n@query\nR(x ; y)\nS(y ; z)")
            .unwrap();
        let facts: Vec<&Fact> = broken.database.iter().collect();
        assert!(!holds(&facts, &broken.query));
    }

    #[test]
    fn negation_filters_assignments() {
        let inst =
            parse_instance("@database\nR(A ; B)\nR(C ; D)\nS(B)\n@query\nR(x ; y)\nnot S(y)")
                .unwrap();
        let facts: Vec<&Fact> = inst.database.iter().collect();
        // R(C ; D) survives because S(D) is absent.
        assert!(holds(&facts, &inst.query));
    }

    #[test]
    fn only_negated_atoms() {
        let inst = parse_instance("@database\nR(A)\n@query\nnot S(x)").unwrap();
        let facts: Vec<&Fact> = inst.database.iter().collect();
        assert!(holds(&facts, &inst.query));
    }

    #[test]
    fn atoms_match_only_facts_of_equal_arity() {
        let inst = parse_instance("@database\nR(A ; B, C)\n@query\nR(x ; y)").unwrap();
        let facts: Vec<&Fact> = inst.database.iter().collect();
        assert!(!holds(&facts, &inst.query));

        // S(B) is too short to block `not S(y, z)`.
        let inst = parse_instance("@database\nR(A ; B)\nS(B)\n@query\nR(x ; y)\nnot S(y, z)")
            .unwrap();
        let facts: Vec<&Fact> = inst.database.iter().collect();
        assert!(holds(&facts, &inst.query));
    }

    #[test]
    fn consistent_database_is_its_only_repair() {
        assert!(certain("@database\nR(A ; B)\n@query\nR(A ; y)"));
        assert!(!certain("@database\nR(A ; B)\n@query\nR(C ; y)"));
    }

    #[test]
    fn conflict_makes_query_uncertain() {
        // The repair keeping R(A ; B) fails `not S(y)`.
        assert!(!certain(
            "@database\nR(A ; B)\nR(A ; C)\nS(B)\n@query\nR(x ; y)\nnot S(y)"
        ));
    }

    #[test]
    fn conflict_irrelevant_to_query_is_certain() {
        assert!(certain("@database\nR(A ; B)\nR(A ; C)\n@query\nR(A ; y)"));
    }

    #[test]
    fn budget_applies() {
        let inst = parse_instance(
            "@database\nR(A ; B)\nR(A ; C)\nR(D ; B)\nR(D ; C)\n@query\nR(x ; y)",
        )
        .unwrap();
        let config = EvaluatorConfig::default().with_max_repairs(Some(3));
        assert!(matches!(
            is_certain(&inst, &config),
            Err(cqa_repair::CqaError::RepairBudgetExceeded { count: Some(4), limit: 3 })
        ));
    }
}
