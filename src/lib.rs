mod agenda;
mod cache;
mod compile;
mod config;
mod dispatch;
mod engine;
mod error;
mod evaluate;
pub mod parse;
mod pool;
mod session;
mod types;

pub use cache::{CacheKey, CacheStats, ExpressionCache};
pub use config::{
    CompileFailurePolicy, EngineConfig, ZeroInputPolicy, DEFAULT_TARGET, MAX_WORKERS,
};
pub use engine::Engine;
pub use error::EngineError;
pub use parse::ParseError;
pub use pool::{Lease, PoolError, PoolStats, Recycle, RefCountedPool};
pub use types::{
    BinaryOp, CompareOp, EvalError, Expr, Expression, Facts, Function, FunctionError, Functions,
    Outcome, Rule, RuleSet, RuleSetBuilder, RunReport, UnaryOp, Value,
};
