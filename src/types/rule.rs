/// A rule: once every `input` fact is present, evaluate `expression` and
/// store the result under `output`.
///
/// Rules are content-addressed by their expression text: two rules with the
/// same text share one compiled expression in the engine's cache.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rule {
    pub input: Vec<String>,
    pub output: String,
    pub expression: String,
}

impl Rule {
    pub fn new<I, S>(input: I, output: impl Into<String>, expression: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input: input.into_iter().map(Into::into).collect(),
            output: output.into(),
            expression: expression.into(),
        }
    }

    /// True when the rule has no inputs and is therefore never scheduled
    /// through the dependency index.
    #[must_use]
    pub fn is_unconditional(&self) -> bool {
        self.input.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_collects_inputs() {
        let rule = Rule::new(["a", "b"], "out", "a && b");
        assert_eq!(rule.input, vec!["a".to_owned(), "b".to_owned()]);
        assert_eq!(rule.output, "out");
        assert_eq!(rule.expression, "a && b");
        assert!(!rule.is_unconditional());
    }

    #[test]
    fn empty_input_is_unconditional() {
        let rule = Rule::new(Vec::<String>::new(), "seed", "1");
        assert!(rule.is_unconditional());
    }
}
