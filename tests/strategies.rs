use std::collections::HashMap;

use chainfire::{Facts, Rule, RuleSet};
use proptest::prelude::*;

// --- Fixed fact schema ---
// s0..s3 : i64 (0..=100), seeded
// absent : never seeded, so any rule reading it stays unsatisfied

pub const SEEDS: &[&str] = &["s0", "s1", "s2", "s3"];
pub const ABSENT: &str = "absent";

/// A generated rule: sum its inputs and add a constant.
#[derive(Debug, Clone)]
pub struct GenRule {
    pub inputs: Vec<String>,
    pub constant: i64,
}

/// Rules `r0..rN`; rule `i` writes fact `ri` and reads only seeds, `absent`,
/// or outputs of rules declared before it, so the set is acyclic.
#[derive(Debug, Clone)]
pub struct GenRuleSet {
    pub seeds: Vec<i64>,
    pub rules: Vec<GenRule>,
}

impl GenRuleSet {
    pub fn output(index: usize) -> String {
        format!("r{index}")
    }

    pub fn facts(&self) -> Facts {
        SEEDS
            .iter()
            .zip(&self.seeds)
            .map(|(name, value)| (*name, *value))
            .collect()
    }

    pub fn ruleset(&self) -> RuleSet {
        self.rules
            .iter()
            .enumerate()
            .map(|(i, rule)| {
                let mut expression = rule.inputs.join(" + ");
                expression.push_str(&format!(" + {}", rule.constant));
                Rule::new(rule.inputs.clone(), Self::output(i), expression)
            })
            .collect()
    }

    /// Sequential reference: the value each rule produces, if it fires.
    pub fn expected_values(&self) -> Vec<Option<i64>> {
        let mut known: HashMap<String, i64> = SEEDS
            .iter()
            .zip(&self.seeds)
            .map(|(name, value)| ((*name).to_owned(), *value))
            .collect();
        let mut values = Vec::with_capacity(self.rules.len());
        for (i, rule) in self.rules.iter().enumerate() {
            let inputs: Option<Vec<i64>> = rule
                .inputs
                .iter()
                .map(|name| known.get(name).copied())
                .collect();
            let value = inputs.map(|v| v.iter().sum::<i64>() + rule.constant);
            if let Some(value) = value {
                known.insert(Self::output(i), value);
            }
            values.push(value);
        }
        values
    }

    /// Round in which each satisfiable rule fires: one more than the latest
    /// round among the rules it reads from; seeds count as round zero.
    pub fn expected_rounds(&self) -> Vec<Option<usize>> {
        let mut rounds: Vec<Option<usize>> = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            let mut latest = Some(0);
            for name in &rule.inputs {
                let round = if SEEDS.contains(&name.as_str()) {
                    Some(0)
                } else if name == ABSENT {
                    None
                } else {
                    name[1..].parse::<usize>().ok().and_then(|j| rounds[j])
                };
                latest = match (latest, round) {
                    (Some(a), Some(b)) => Some(a.max(b)),
                    _ => None,
                };
            }
            rounds.push(latest.map(|r| r + 1));
        }
        rounds
    }
}

/// Input names available to rule `index`.
fn input_pool(index: usize) -> Vec<String> {
    let mut pool: Vec<String> = SEEDS.iter().map(|s| (*s).to_owned()).collect();
    pool.push(ABSENT.to_owned());
    pool.extend((0..index).map(GenRuleSet::output));
    pool
}

fn arb_rule(index: usize) -> impl Strategy<Value = GenRule> {
    let pool = input_pool(index);
    (
        prop::sample::subsequence(pool.clone(), 1..=3.min(pool.len())),
        -10_i64..=10,
    )
        .prop_map(|(inputs, constant)| GenRule { inputs, constant })
}

/// An acyclic rule set of 1..=12 rules over the fixed schema.
pub fn arb_ruleset() -> impl Strategy<Value = GenRuleSet> {
    (prop::collection::vec(0_i64..=100, SEEDS.len()), 1_usize..=12).prop_flat_map(
        |(seeds, len)| {
            let rules: Vec<_> = (0..len).map(arb_rule).collect();
            (Just(seeds), rules).prop_map(|(seeds, rules)| GenRuleSet { seeds, rules })
        },
    )
}
