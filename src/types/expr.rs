use std::fmt;

use super::error::EvalError;
use super::facts::Facts;
use super::function::{Function, Functions};
use super::Value;
use crate::parse::ParseError;

/// Comparison operators supported in rule expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// Binary operators, in the order of their precedence groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Compare(CompareOp),
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

/// Parsed expression AST. Function calls are still referenced by name.
/// Resolved into a [`CompiledExpr`] against a [`Functions`] table.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Fact(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

/// Expression tree with every function call bound to its implementation.
#[derive(Clone)]
pub(crate) enum CompiledExpr {
    Literal(Value),
    Fact(String),
    Unary {
        op: UnaryOp,
        operand: Box<CompiledExpr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<CompiledExpr>,
        right: Box<CompiledExpr>,
    },
    Call {
        name: String,
        function: Function,
        args: Vec<CompiledExpr>,
    },
}

impl fmt::Debug for CompiledExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompiledExpr::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            CompiledExpr::Fact(name) => f.debug_tuple("Fact").field(name).finish(),
            CompiledExpr::Unary { op, operand } => f
                .debug_struct("Unary")
                .field("op", op)
                .field("operand", operand)
                .finish(),
            CompiledExpr::Binary { op, left, right } => f
                .debug_struct("Binary")
                .field("op", op)
                .field("left", left)
                .field("right", right)
                .finish(),
            CompiledExpr::Call { name, args, .. } => f
                .debug_struct("Call")
                .field("name", name)
                .field("args", args)
                .finish_non_exhaustive(),
        }
    }
}

/// A parsed, function-resolved expression ready for evaluation.
///
/// Produced by [`Expression::compile`] and usually obtained through the
/// engine's [`ExpressionCache`](crate::ExpressionCache), which shares one
/// instance per distinct source text across every session and worker.
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    root: CompiledExpr,
}

impl Expression {
    /// Parse `source` and bind its function calls against `functions`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] on invalid syntax or a call to an unregistered
    /// function.
    pub fn compile(source: &str, functions: &Functions) -> Result<Self, ParseError> {
        let ast = crate::parse::parse(source)?;
        let root = crate::compile::resolve(&ast, functions)?;
        Ok(Self {
            source: source.to_owned(),
            root,
        })
    }

    /// Evaluate against a working-memory snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError`] on missing facts, type mismatches, arithmetic
    /// faults, or a failing extension function.
    pub fn evaluate(&self, facts: &Facts) -> Result<Value, EvalError> {
        crate::evaluate::evaluate(&self.root, facts)
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "=="),
            CompareOp::Neq => write!(f, "!="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Gte => write!(f, ">="),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Lte => write!(f, "<="),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOp::Or => write!(f, "||"),
            BinaryOp::And => write!(f, "&&"),
            BinaryOp::Compare(op) => write!(f, "{op}"),
            BinaryOp::Add => write!(f, "+"),
            BinaryOp::Sub => write!(f, "-"),
            BinaryOp::Mul => write!(f, "*"),
            BinaryOp::Div => write!(f, "/"),
            BinaryOp::Rem => write!(f, "%"),
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Not => write!(f, "!"),
            UnaryOp::Neg => write!(f, "-"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(v) => write!(f, "{v}"),
            Expr::Fact(name) => write!(f, "{name}"),
            Expr::Unary { op, operand } => write!(f, "({op}{operand})"),
            Expr::Binary { op, left, right } => write!(f, "({left} {op} {right})"),
            Expr::Call { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl Expr {
    /// Fact names referenced anywhere in this expression, in first-use order.
    #[must_use]
    pub fn facts(&self) -> Vec<&str> {
        let mut out = Vec::new();
        collect_facts(self, &mut out);
        out
    }
}

fn collect_facts<'a>(expr: &'a Expr, out: &mut Vec<&'a str>) {
    match expr {
        Expr::Literal(_) => {}
        Expr::Fact(name) => {
            if !out.contains(&name.as_str()) {
                out.push(name);
            }
        }
        Expr::Unary { operand, .. } => collect_facts(operand, out),
        Expr::Binary { left, right, .. } => {
            collect_facts(left, out);
            collect_facts(right, out);
        }
        Expr::Call { args, .. } => {
            for arg in args {
                collect_facts(arg, out);
            }
        }
    }
}
