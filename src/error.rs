use std::{io, path::PathBuf};
use thiserror::Error;


/// Boxed error returned by route handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;


/// Failure while evaluating an expression.
///
/// The renderer never lets these escape: a failing value renders as empty
/// text and a failing condition counts as false. They are reported through
/// [Rendered](crate::Rendered) so callers can still observe them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("syntax error at {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("name '{0}' is not defined")]
    UnknownName(String),

    #[error("type error: {0}")]
    Type(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("integer overflow")]
    Overflow,

    #[error("result exceeds {limit} elements")]
    TooLarge { limit: usize },

    #[error("{0} is not permitted in expressions")]
    Forbidden(&'static str),
}

impl EvalError {
    pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Self {
        EvalError::Syntax { offset, message: message.into() }
    }

    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        EvalError::Type(message.into())
    }
}


#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("template syntax error at {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("template '{0}' not found")]
    NotFound(String),

    #[error("failed to read template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl TemplateError {
    pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Self {
        TemplateError::Syntax { offset, message: message.into() }
    }
}


#[derive(Error, Debug)]
pub enum ContextError {
    #[error("context must be built from an object, got {0}")]
    NotAnObject(&'static str),

    #[error("unsupported value for '{name}': {kind}")]
    Unsupported { name: String, kind: &'static str },

    #[error("failed to serialize context: {0}")]
    Serialize(#[from] serde_json::Error),
}


#[derive(Error, Debug)]
pub enum ParamError {
    #[error("missing path parameter '{0}'")]
    Missing(String),

    #[error("invalid path parameter '{name}' = '{value}': {reason}")]
    Invalid { name: String, value: String, reason: String },
}


#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("handler for {method} {pattern} failed: {source}")]
    Handler {
        method: &'static str,
        pattern: String,
        #[source]
        source: HandlerError,
    },
}


#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
}
