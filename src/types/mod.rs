mod error;
mod expr;
mod facts;
mod function;
mod report;
mod rule;
mod ruleset;
mod value;

pub use error::EvalError;
pub(crate) use expr::CompiledExpr;
pub use expr::{BinaryOp, CompareOp, Expr, Expression, UnaryOp};
pub use facts::Facts;
pub use function::{Function, FunctionError, Functions};
pub use report::{Outcome, RunReport};
pub use rule::Rule;
pub use ruleset::{RuleSet, RuleSetBuilder};
pub use value::Value;
