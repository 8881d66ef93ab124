use thiserror::Error;

/// Client-side failures while parsing query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("unknown operator '{0}'")]
    InvalidOperator(String),

    #[error("unknown property '{0}'")]
    InvalidProperty(String),

    #[error("invalid value for property '{property}': {message}")]
    InvalidFilterValue { property: String, message: String },

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("value out of range: {0}")]
    OutOfRange(String),
}

impl QueryError {
    pub fn invalid_value(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFilterValue {
            property: property.into(),
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedInput(message.into())
    }

    /// Machine-readable error type reported to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidOperator(_) => "value_error.invalid_operator",
            Self::InvalidProperty(_) => "value_error.invalid_property",
            Self::InvalidFilterValue { .. } => "value_error.invalid_value",
            Self::MalformedInput(_) => "value_error.malformed",
            Self::OutOfRange(_) => "value_error.out_of_range",
        }
    }

    /// Tag this error with the query parameter it came from.
    pub fn for_param(self, param: &'static str) -> ParamError {
        ParamError {
            param,
            source: self,
        }
    }
}

/// A [`QueryError`] attributed to one query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid '{param}' query parameter: {source}")]
pub struct ParamError {
    pub param: &'static str,
    #[source]
    pub source: QueryError,
}

impl ParamError {
    /// Location of the failure as reported to clients.
    pub fn location(&self) -> [&'static str; 2] {
        ["query", self.param]
    }
}
