use thiserror::Error;

/// Domain validation errors for account data.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid account type: {0}")]
    InvalidAccountType(String),

    #[error("Invalid currency numeric code: {0}")]
    InvalidCurrencyCode(String),

    #[error("Invalid bank account number: {0}")]
    InvalidAccountNumber(String),

    #[error("Invalid datetime: {0}")]
    InvalidDateTime(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CoreError {
    pub fn invalid_account_type(value: impl Into<String>) -> Self {
        Self::InvalidAccountType(value.into())
    }

    pub fn invalid_currency_code(value: impl Into<String>) -> Self {
        Self::InvalidCurrencyCode(value.into())
    }

    pub fn invalid_account_number(value: impl Into<String>) -> Self {
        Self::InvalidAccountNumber(value.into())
    }

    pub fn invalid_date_time(value: impl Into<String>) -> Self {
        Self::InvalidDateTime(value.into())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CoreError::invalid_account_type("gold").to_string(),
            "Invalid account type: gold"
        );
        assert_eq!(
            CoreError::invalid_currency_code("USD").to_string(),
            "Invalid currency numeric code: USD"
        );
    }

    #[test]
    fn test_json_error_conversion() {
        let err: CoreError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, CoreError::JsonError(_)));
    }
}
