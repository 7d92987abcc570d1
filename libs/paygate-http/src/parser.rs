//! Success-body parsers.
//!
//! The executor hands every 200/201/202 response to a [`ResponseParser`].
//! Non-success statuses never reach the parser.

use crate::error::HttpError;
use serde_json::Value;

/// Turns a success response body into the string delivered to the caller.
pub trait ResponseParser: Send + Sync {
    /// # Errors
    ///
    /// Returns an error when the body is not acceptable for this parser;
    /// it is delivered to the caller like any other request failure.
    fn parse(&self, status: u16, body: String) -> Result<String, HttpError>;
}

/// Returns the body unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawBodyParser;

impl ResponseParser for RawBodyParser {
    fn parse(&self, _status: u16, body: String) -> Result<String, HttpError> {
        Ok(body)
    }
}

/// Extracts the value at a JSON pointer (RFC 6901) from the body.
///
/// String values are returned without quotes; any other JSON value is
/// returned serialized.
#[derive(Debug, Clone)]
pub struct JsonPointerParser {
    pointer: String,
}

impl JsonPointerParser {
    #[must_use]
    pub fn new(pointer: impl Into<String>) -> Self {
        Self {
            pointer: pointer.into(),
        }
    }
}

impl ResponseParser for JsonPointerParser {
    fn parse(&self, status: u16, body: String) -> Result<String, HttpError> {
        let json: Value = serde_json::from_str(&body).map_err(|e| HttpError::Unexpected {
            status,
            message: format!("response body is not JSON: {e}"),
        })?;
        match json.pointer(&self.pointer) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Ok(other.to_string()),
            None => Err(HttpError::Unexpected {
                status,
                message: format!("response body has no value at '{}'", self.pointer),
            }),
        }
    }
}

impl<F> ResponseParser for F
where
    F: Fn(u16, String) -> Result<String, HttpError> + Send + Sync,
{
    fn parse(&self, status: u16, body: String) -> Result<String, HttpError> {
        self(status, body)
    }
}
