mod strategies;

use chainfire::{Engine, Facts, RuleSet, Value};
use proptest::prelude::*;
use strategies::{arb_ruleset, GenRuleSet};

fn engine_for(gen: &GenRuleSet, workers: usize) -> Engine {
    let engine = Engine::with_workers(workers);
    engine.set_facts(gen.facts());
    engine.set_rules(gen.ruleset());
    engine
}

// ---------------------------------------------------------------------------
// Invariant 1: Fixpoint termination
//
// An acyclic rule set reaches its fixpoint in at most one round per rule.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn terminates_within_rule_count_rounds(gen in arb_ruleset()) {
        let engine = engine_for(&gen, 2);
        let last = GenRuleSet::output(gen.rules.len() - 1);
        let report = engine.run_detailed(&last, 0);
        prop_assert!(report.rounds().len() <= gen.rules.len());
        prop_assert!(report.outcome().is_clean());
    }

    #[test]
    fn rounds_match_dependency_depth(gen in arb_ruleset()) {
        let engine = engine_for(&gen, 2);
        let report = engine.run_detailed("unused", 0);
        for (i, expected) in gen.expected_rounds().into_iter().enumerate() {
            prop_assert_eq!(report.round_of(i), expected, "rule {}", i);
        }
    }
}

// ---------------------------------------------------------------------------
// Invariant 2: Determinism across worker counts
//
// Every output matches the sequential reference no matter how many workers
// evaluate each round.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn outputs_match_reference(gen in arb_ruleset()) {
        let expected = gen.expected_values();
        for workers in [1, 3] {
            let engine = engine_for(&gen, workers);
            for (i, value) in expected.iter().enumerate() {
                let outcome = engine.run(&GenRuleSet::output(i), 0);
                prop_assert_eq!(
                    outcome.value().cloned(),
                    value.map(Value::Int),
                    "rule {} with {} workers", i, workers
                );
                prop_assert!(outcome.is_clean());
            }
        }
    }

    #[test]
    fn repeated_runs_agree(gen in arb_ruleset()) {
        let engine = engine_for(&gen, 2);
        let last = GenRuleSet::output(gen.rules.len() - 1);
        let first = engine.run_detailed(&last, 0);
        for _ in 0..3 {
            let again = engine.run_detailed(&last, 0);
            prop_assert_eq!(again.outcome().value(), first.outcome().value());
            prop_assert_eq!(again.rounds(), first.rounds());
        }
    }
}

// ---------------------------------------------------------------------------
// Invariant 3: Round isolation
//
// Rule A and rule B are ready in the same round and A writes B's input. B
// must evaluate against the value present at the start of the round and
// must not fire again after A's write.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn same_round_writes_are_invisible(a in -1000_i64..1000, b in -1000_i64..1000, workers in 1_usize..4) {
        let engine = Engine::with_workers(workers);
        engine.set_facts(Facts::new().set("a", a).set("b", b));
        engine.set_rules(
            RuleSet::builder()
                .rule(["a"], "b", "a + 1")
                .rule(["b"], "result_end", "b")
                .build(),
        );

        let report = engine.run_detailed("result_end", 0);
        prop_assert_eq!(report.outcome().value(), Some(&Value::Int(b)));
        prop_assert_eq!(report.rounds(), &[vec![0, 1]][..]);
    }
}
