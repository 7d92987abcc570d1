//! HTTP security utilities.

/// Maximum body preview size for error messages (8KB).
///
/// When a request returns a non-success status without a structured error
/// message, a prefix of the body becomes the error message. This limits how
/// much of a large error page ends up in memory and in logs.
pub const ERROR_BODY_PREVIEW_LIMIT: usize = 8 * 1024;

/// Longest prefix of `body` within [`ERROR_BODY_PREVIEW_LIMIT`], cut on a
/// character boundary.
#[must_use]
pub fn body_preview(body: &str) -> &str {
    if body.len() <= ERROR_BODY_PREVIEW_LIMIT {
        return body;
    }
    let mut end = ERROR_BODY_PREVIEW_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
