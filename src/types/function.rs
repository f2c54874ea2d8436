use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::Value;

/// Error returned by an extension function. The message is surfaced verbatim
/// inside [`EvalError::Function`](super::EvalError::Function).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FunctionError {
    message: String,
}

impl FunctionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for FunctionError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for FunctionError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// A caller-supplied extension function callable from expressions by name.
pub type Function = Arc<dyn Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync>;

/// Table of extension functions visible to expressions at compile time.
///
/// ```
/// use chainfire::{Functions, Value};
///
/// let functions = Functions::new().with("set", |args: &[Value]| match args {
///     [value] => Ok(value.clone()),
///     _ => Err("set takes exactly one argument".into()),
/// });
/// assert!(functions.contains("set"));
/// ```
#[derive(Clone, Default)]
pub struct Functions {
    table: HashMap<String, Function>,
}

impl Functions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function, consuming and returning the table.
    #[must_use]
    pub fn with<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync + 'static,
    {
        self.register(name, f);
        self
    }

    /// Register a function, replacing any previous one with the same name.
    pub fn register<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync + 'static,
    {
        self.table.insert(name.to_owned(), Arc::new(f));
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Function> {
        self.table.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.table.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Functions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}
