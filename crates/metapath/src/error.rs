use metapath_model::ModelError;
use thiserror::Error;

/// Errors raised while compiling or evaluating a Metapath expression.
///
/// Every variant carries a stable code through [`MetapathError::code`] so
/// that consumers can classify failures without matching on message text.
#[derive(Error, Debug, Clone)]
pub enum MetapathError {
    #[error("Syntax error in '{expression}': {message}")]
    Syntax { expression: String, message: String },

    #[error("Static error: {0}")]
    Static(String),

    #[error("Unknown type name: {0}")]
    UnknownTypeName(String),

    #[error("Unknown namespace prefix: {0}")]
    UnknownPrefix(String),

    #[error("Unknown function: {name}#{arity}")]
    UnknownFunction { name: String, arity: usize },

    #[error("Variable '${0}' not found")]
    UnknownVariable(String),

    #[error("Context item is required but absent")]
    NoContextItem,

    #[error("Type error: {0}")]
    Type(String),

    #[error("Cardinality error: expected {expected}, got {actual} items")]
    Cardinality { expected: String, actual: usize },

    #[error("Cannot cast {from_type} to {to_type}: '{value}'")]
    InvalidCast {
        from_type: String,
        to_type: String,
        value: String,
    },

    #[error("Unsupported operation: {operator}({left}, {right})")]
    UnsupportedOperation {
        operator: String,
        left: String,
        right: String,
    },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Array index {index} out of bounds (size: {size})")]
    ArrayIndexOutOfBounds { index: i64, size: usize },

    #[error("Negative array length: {0}")]
    NegativeArrayLength(i64),

    #[error("Function '{function}' error: {message}")]
    Function { function: String, message: String },

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl MetapathError {
    pub fn syntax(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Syntax {
            expression: expression.into(),
            message: message.into(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type(message.into())
    }

    pub fn function(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Function {
            function: function.into(),
            message: message.into(),
        }
    }

    /// The stable error code for this failure.
    pub fn code(&self) -> &'static str {
        match self {
            MetapathError::Syntax { .. } => "XPST0003",
            MetapathError::Static(_) => "XPST0001",
            MetapathError::UnknownTypeName(_) => "XPST0051",
            MetapathError::UnknownPrefix(_) => "XPST0081",
            MetapathError::UnknownFunction { .. } => "XPST0017",
            MetapathError::UnknownVariable(_) => "XPST0008",
            MetapathError::NoContextItem => "XPDY0002",
            MetapathError::Type(_) | MetapathError::Cardinality { .. } => "XPTY0004",
            MetapathError::InvalidCast { .. } => "FOCA0002",
            MetapathError::UnsupportedOperation { .. } => "FORG0006",
            MetapathError::DivisionByZero => "FOAR0001",
            MetapathError::ArrayIndexOutOfBounds { .. } => "FOAY0001",
            MetapathError::NegativeArrayLength(_) => "FOAY0002",
            MetapathError::Function { .. } => "FOER0000",
            MetapathError::Model(_) => "FORG0001",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(MetapathError::NoContextItem.code(), "XPDY0002");
        assert_eq!(MetapathError::DivisionByZero.code(), "FOAR0001");
        assert_eq!(
            MetapathError::UnknownFunction {
                name: "nope".into(),
                arity: 2
            }
            .code(),
            "XPST0017"
        );
        assert_eq!(
            MetapathError::UnsupportedOperation {
                operator: "+".into(),
                left: "year-month-duration".into(),
                right: "day-time-duration".into()
            }
            .code(),
            "FORG0006"
        );
    }
}
