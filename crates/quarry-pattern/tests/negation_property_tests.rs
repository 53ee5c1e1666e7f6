//! Property-based tests for disjunctive normalization.
//!
//! Random pattern trees are drawn from a small pool of statements so that
//! duplicates and overlapping variables are common.

use proptest::prelude::*;
use quarry_pattern::*;

fn statement_pool() -> Vec<Statement> {
    let mut gen = VarGen::new();
    let x = Variable::named("x");
    let y = Variable::named("y");
    vec![
        Statement::new(x.clone()).isa_label(&mut gen, "person"),
        Statement::new(x.clone()).has(&mut gen, "name", "Alice"),
        Statement::new(y.clone())
            .isa_label(&mut gen, "company")
            .has(&mut gen, "name", "Acme"),
        Statement::new(gen.fresh())
            .rel([RolePlayer::of("employee", x.clone()), RolePlayer::of("employer", y.clone())])
            .isa_label(&mut gen, "employment"),
        Statement::new(y.clone()).has_predicate(
            &mut gen,
            "founded",
            ValuePredicate::compare(Comparator::Gt, 1990i64),
        ),
        Statement::new(x).neq(y),
    ]
}

fn leaf_strategy() -> impl Strategy<Value = Pattern> {
    let pool_size = statement_pool().len();
    (0..pool_size, any::<bool>()).prop_map(|(idx, negative)| {
        let statement = statement_pool().swap_remove(idx);
        let statement = if negative { statement.negated() } else { statement };
        Pattern::Statement(statement)
    })
}

fn pattern_strategy() -> impl Strategy<Value = Pattern> {
    leaf_strategy().prop_recursive(4, 24, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..3).prop_map(Pattern::Conjunction),
            prop::collection::vec(inner.clone(), 1..3).prop_map(Pattern::Disjunction),
            inner.prop_map(|p| Pattern::not(p)),
        ]
    })
}

proptest! {
    #[test]
    fn test_double_negation_is_identity(pattern in pattern_strategy()) {
        let twice = Pattern::not(Pattern::not(pattern.clone()));
        prop_assert_eq!(twice.disjunctive_normal_form(), pattern.disjunctive_normal_form());
    }

    #[test]
    fn test_normal_form_only_negates_single_units(pattern in pattern_strategy()) {
        let dnf = pattern.disjunctive_normal_form();
        for conjunction in &dnf {
            for statement in conjunction.negative() {
                prop_assert_eq!(statement.units().len(), 1, "{}", statement);
            }
        }
        prop_assert!(NormalizedPattern::new_checked(dnf).is_ok());
    }

    #[test]
    fn test_bound_is_an_upper_bound(pattern in pattern_strategy()) {
        prop_assert!(pattern.disjunctive_normal_form().len() <= pattern.disjunct_bound());
    }

    #[test]
    fn test_negated_disjunction_matches_conjunction_of_negations(
        a in pattern_strategy(),
        b in pattern_strategy(),
    ) {
        let lhs = Pattern::not(Pattern::or([a.clone(), b.clone()]));
        let rhs = Pattern::and([Pattern::not(a), Pattern::not(b)]);
        prop_assert_eq!(lhs.disjunctive_normal_form(), rhs.disjunctive_normal_form());
    }

    #[test]
    fn test_normalization_is_deterministic(pattern in pattern_strategy()) {
        let render = |dnf: &Dnf| dnf.iter().map(|c| c.to_string()).collect::<Vec<_>>();
        prop_assert_eq!(
            render(&pattern.disjunctive_normal_form()),
            render(&pattern.disjunctive_normal_form())
        );
    }
}
