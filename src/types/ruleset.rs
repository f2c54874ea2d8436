use std::collections::HashMap;
use std::fmt;

use super::rule::Rule;

/// Builder for constructing a [`RuleSet`].
///
/// # Example
///
/// ```
/// use chainfire::RuleSetBuilder;
///
/// let rules = RuleSetBuilder::new()
///     .rule(
///         ["account_partner", "account_region"],
///         "isEligible",
///         r#"account_partner == "hello" && account_region == "ID""#,
///     )
///     .rule(["isEligible"], "result_end", "isEligible")
///     .build();
///
/// assert_eq!(rules.len(), 2);
/// assert_eq!(rules.dependents_of("isEligible"), &[1]);
/// ```
#[derive(Debug, Default)]
pub struct RuleSetBuilder {
    rules: Vec<Rule>,
}

impl RuleSetBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule. Declaration order is significant: it orders jobs within
    /// a round and breaks ties between rules writing the same output.
    #[must_use]
    pub fn rule<I, S>(mut self, input: I, output: &str, expression: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules.push(Rule::new(input, output, expression));
        self
    }

    /// Append an already constructed rule.
    #[must_use]
    pub fn push(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Build the rule set and its dependency index.
    #[must_use]
    pub fn build(self) -> RuleSet {
        RuleSet::new(self.rules)
    }
}

/// An ordered rule list plus the dependency index derived from it.
///
/// The index maps each fact name to the rules that list it as an input, so
/// the dispatcher only re-checks rules affected by a newly written fact.
/// Immutable once built; every run reads it under the engine's read lock.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
    dependents: HashMap<String, Vec<usize>>,
    unconditional: Vec<usize>,
}

impl RuleSet {
    #[must_use]
    pub fn new(rules: Vec<Rule>) -> Self {
        let index = crate::compile::build_index(&rules);
        Self {
            rules,
            dependents: index.dependents,
            unconditional: index.unconditional,
        }
    }

    #[must_use]
    pub fn builder() -> RuleSetBuilder {
        RuleSetBuilder::new()
    }

    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Rule> {
        self.rules.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Indices of the rules that declare `fact` as an input, in declaration order.
    #[must_use]
    pub fn dependents_of(&self, fact: &str) -> &[usize] {
        self.dependents.get(fact).map_or(&[], Vec::as_slice)
    }

    /// Indices of rules with no inputs.
    #[must_use]
    pub fn unconditional(&self) -> &[usize] {
        &self.unconditional
    }

    /// Number of distinct fact names that some rule waits on.
    #[must_use]
    pub fn indexed_facts(&self) -> usize {
        self.dependents.len()
    }
}

impl From<Vec<Rule>> for RuleSet {
    fn from(rules: Vec<Rule>) -> Self {
        Self::new(rules)
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RuleSet({} rules, {} indexed facts, {} unconditional)",
            self.rules.len(),
            self.dependents.len(),
            self.unconditional.len(),
        )
    }
}
