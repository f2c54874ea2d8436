//! Readiness computation.
//!
//! A rule is ready once a fact is stored under the exact name of each of its
//! inputs and it has not fired yet. Inputs are fact names, never paths: a
//! dotted input such as `account.region` is satisfied only by a fact written
//! under that key, not by a map stored under `account`. Only the rules indexed under a newly written fact
//! are re-checked, and a rule is marked fired the moment it is scheduled.

use std::collections::HashSet;

use crate::config::ZeroInputPolicy;
use crate::{Facts, RuleSet};

/// Append to `ready` every unfired dependent of `fact` whose inputs are all
/// present in `facts`, marking each one fired.
pub(crate) fn schedule_dependents(
    rules: &RuleSet,
    fact: &str,
    facts: &Facts,
    fired: &mut HashSet<usize>,
    ready: &mut Vec<usize>,
) {
    for &index in rules.dependents_of(fact) {
        if fired.contains(&index) {
            continue;
        }
        let Some(rule) = rules.get(index) else {
            continue;
        };
        if rule.input.iter().all(|name| facts.contains_key(name)) {
            fired.insert(index);
            ready.push(index);
        }
    }
}

/// Initial agenda: dependents of every seeded fact, plus zero-input rules
/// when `policy` asks for them. Sorted by declaration order.
pub(crate) fn seed(
    rules: &RuleSet,
    facts: &Facts,
    fired: &mut HashSet<usize>,
    policy: ZeroInputPolicy,
) -> Vec<usize> {
    let mut ready = Vec::new();
    if policy == ZeroInputPolicy::FireOnSeed {
        for &index in rules.unconditional() {
            if fired.insert(index) {
                ready.push(index);
            }
        }
    }
    for name in facts.names() {
        schedule_dependents(rules, name, facts, fired, &mut ready);
    }
    ready.sort_unstable();
    ready
}
