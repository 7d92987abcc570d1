//! Maps non-success responses onto the error taxonomy.
//!
//! The status code alone selects the kind. The body only contributes the
//! human-readable message and, for 422, the field error tree.

use crate::error::HttpError;
use crate::security::body_preview;
use crate::validation::ValidationError;
use serde_json::Value;

/// Fixed message for 429 responses.
pub const RATE_LIMIT_MESSAGE: &str =
    "You are being rate-limited. Please try again in a few minutes.";

/// Status codes the executor treats as success.
pub const SUCCESS_STATUSES: [u16; 3] = [200, 201, 202];

#[must_use]
pub fn is_success(status: u16) -> bool {
    SUCCESS_STATUSES.contains(&status)
}

/// Classify a non-success response.
///
/// Malformed bodies never escalate into a parse error; they only degrade the
/// message.
#[must_use]
pub fn classify(status: u16, body: &str) -> HttpError {
    match status {
        401 => HttpError::Authentication {
            message: error_message(status, body),
        },
        403 => HttpError::Authorization {
            message: error_message(status, body),
        },
        422 => HttpError::Validation(ValidationError::from_response(status, body)),
        426 => HttpError::UpgradeRequired {
            message: error_message(status, body),
        },
        429 => HttpError::RateLimit {
            message: RATE_LIMIT_MESSAGE.to_owned(),
        },
        500 => HttpError::Server {
            message: error_message(status, body),
        },
        503 => HttpError::ServiceUnavailable {
            message: error_message(status, body),
        },
        _ => HttpError::Unexpected {
            status,
            message: error_message(status, body),
        },
    }
}

/// Best available message: `error.message`, then top-level `message`, then
/// the body itself, then the canonical reason phrase.
fn error_message(status: u16, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        let structured = json
            .pointer("/error/message")
            .or_else(|| json.get("message"))
            .and_then(Value::as_str);
        if let Some(message) = structured {
            return message.to_owned();
        }
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return body_preview(trimmed).to_owned();
    }

    http::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map_or_else(|| format!("HTTP {status}"), ToOwned::to_owned)
}
