//! Decoding of JSON-valued query parameters.

use crate::error::QueryError;
use serde_json::Value;

/// Parse a `filter`/`sort` parameter value as JSON.
///
/// The HTTP layer has already percent-decoded the query string once. Clients
/// that encode the JSON a second time are accepted too: when the value is
/// not valid JSON as-is it is percent-decoded again before parsing.
pub fn decode_json_param(raw: &str) -> Result<Value, QueryError> {
    match serde_json::from_str(raw) {
        Ok(value) => Ok(value),
        Err(first_err) => {
            let decoded = urlencoding::decode(raw)
                .map_err(|e| QueryError::malformed(format!("invalid percent-encoding: {e}")))?;
            if decoded == raw {
                return Err(QueryError::malformed(first_err.to_string()));
            }
            serde_json::from_str(&decoded).map_err(|e| QueryError::malformed(e.to_string()))
        }
    }
}
