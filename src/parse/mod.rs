mod error;
mod grammar;

pub use error::ParseError;

use crate::Expr;

/// Parse expression text into an [`Expr`] tree.
///
/// Function names are not checked here; that happens when the tree is
/// resolved against a [`Functions`](crate::Functions) table.
///
/// # Errors
///
/// Returns [`ParseError::Syntax`] if the input is not a single valid expression.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    use winnow::Parser;
    grammar::expression
        .parse(input)
        .map_err(|e| ParseError::syntax(e.to_string()))
}
