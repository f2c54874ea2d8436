use std::collections::HashMap;

use crate::parse::ParseError;
use crate::types::CompiledExpr;
use crate::{Expr, Functions, Rule};

/// Bind every function call in `expr` to its implementation in `functions`.
pub(crate) fn resolve(expr: &Expr, functions: &Functions) -> Result<CompiledExpr, ParseError> {
    Ok(match expr {
        Expr::Literal(value) => CompiledExpr::Literal(value.clone()),
        Expr::Fact(name) => CompiledExpr::Fact(name.clone()),
        Expr::Unary { op, operand } => CompiledExpr::Unary {
            op: *op,
            operand: Box::new(resolve(operand, functions)?),
        },
        Expr::Binary { op, left, right } => CompiledExpr::Binary {
            op: *op,
            left: Box::new(resolve(left, functions)?),
            right: Box::new(resolve(right, functions)?),
        },
        Expr::Call { name, args } => {
            let function = functions
                .get(name)
                .ok_or_else(|| ParseError::UndefinedFunction { name: name.clone() })?;
            let args = args
                .iter()
                .map(|arg| resolve(arg, functions))
                .collect::<Result<Vec<_>, _>>()?;
            CompiledExpr::Call {
                name: name.clone(),
                function: function.clone(),
                args,
            }
        }
    })
}

pub(crate) struct DependencyIndex {
    pub(crate) dependents: HashMap<String, Vec<usize>>,
    pub(crate) unconditional: Vec<usize>,
}

/// Single pass over `rules`: each rule is listed once under every distinct
/// input name. Rules without inputs are collected separately.
pub(crate) fn build_index(rules: &[Rule]) -> DependencyIndex {
    let mut dependents: HashMap<String, Vec<usize>> = HashMap::new();
    let mut unconditional = Vec::new();

    for (i, rule) in rules.iter().enumerate() {
        if rule.input.is_empty() {
            unconditional.push(i);
            continue;
        }
        for name in &rule.input {
            let entry = dependents.entry(name.clone()).or_default();
            // Indices are pushed in ascending order, so a repeat of this rule
            // can only be the last element.
            if entry.last() != Some(&i) {
                entry.push(i);
            }
        }
    }

    DependencyIndex {
        dependents,
        unconditional,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Value, parse::parse};

    #[test]
    fn resolve_binds_known_function() {
        let functions = Functions::new().with("set", |args: &[Value]| Ok(args[0].clone()));
        let ast = parse("set(x)").unwrap();
        let compiled = resolve(&ast, &functions).unwrap();
        assert!(matches!(compiled, CompiledExpr::Call { ref name, .. } if name == "set"));
    }

    #[test]
    fn resolve_rejects_unknown_function() {
        let ast = parse("x && lookup(y)").unwrap();
        let err = resolve(&ast, &Functions::new()).unwrap_err();
        assert_eq!(
            err,
            ParseError::UndefinedFunction {
                name: "lookup".into()
            }
        );
    }

    #[test]
    fn index_lists_each_rule_once_per_input() {
        let rules = vec![
            Rule::new(["a", "a", "b"], "x", "a && b"),
            Rule::new(["b"], "y", "b"),
            Rule::new(Vec::<String>::new(), "z", "1"),
        ];
        let index = build_index(&rules);
        assert_eq!(index.dependents["a"], vec![0]);
        assert_eq!(index.dependents["b"], vec![0, 1]);
        assert_eq!(index.unconditional, vec![2]);
        assert_eq!(index.dependents.len(), 2);
    }
}
