//! Structured 422 responses.
//!
//! The gateway reports validation failures in one of two body shapes:
//!
//! REST:
//! ```json
//! {"error": {"message": "Credit card is invalid"},
//!  "fieldErrors": [{"field": "creditCard",
//!                   "fieldErrors": [{"field": "number", "code": "81716",
//!                                    "message": "Credit card number must be 12-19 digits"}]}]}
//! ```
//!
//! GraphQL:
//! ```json
//! {"errors": [{"message": "Expiration month is invalid",
//!              "extensions": {"errorType": "user_error", "legacyCode": "81712",
//!                             "inputPath": ["input", "creditCard", "expirationMonth"]}}]}
//! ```
//!
//! A body matching neither shape degrades to [`PARSING_FAILED_MESSAGE`]
//! with no field errors.

use serde_json::Value;
use thiserror::Error;

/// Message used when a 422 body cannot be interpreted.
pub const PARSING_FAILED_MESSAGE: &str = "Parsing error response failed";

/// Message used for GraphQL bodies that carry field errors.
const GRAPHQL_INPUT_INVALID_MESSAGE: &str = "Input is invalid.";

/// One node in the field error tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    field: String,
    message: Option<String>,
    code: Option<String>,
    field_errors: Vec<FieldError>,
}

impl FieldError {
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Gateway error code, when one was reported.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    #[must_use]
    pub fn field_errors(&self) -> &[FieldError] {
        &self.field_errors
    }

    /// Nested error for `field`, searched depth-first.
    #[must_use]
    pub fn error_for(&self, field: &str) -> Option<&FieldError> {
        find(&self.field_errors, field)
    }

    fn leaf(field: &str) -> Self {
        Self {
            field: field.to_owned(),
            message: None,
            code: None,
            field_errors: Vec::new(),
        }
    }
}

/// A 422 response with its field error tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Validation failed: {message}")]
pub struct ValidationError {
    status_code: u16,
    message: String,
    field_errors: Vec<FieldError>,
    original_response: String,
}

impl ValidationError {
    /// Interpret a 422 body. Never fails: unreadable bodies yield
    /// [`PARSING_FAILED_MESSAGE`] and an empty tree.
    #[must_use]
    pub fn from_response(status_code: u16, body: &str) -> Self {
        let (message, field_errors) = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|json| parse_graphql(&json).or_else(|| parse_rest(&json)))
            .unwrap_or_else(|| (PARSING_FAILED_MESSAGE.to_owned(), Vec::new()));

        Self {
            status_code,
            message,
            field_errors,
            original_response: body.to_owned(),
        }
    }

    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Top-level field errors (categories such as `creditCard`).
    #[must_use]
    pub fn field_errors(&self) -> &[FieldError] {
        &self.field_errors
    }

    /// The raw response body.
    #[must_use]
    pub fn original_response(&self) -> &str {
        &self.original_response
    }

    /// Error for `field` anywhere in the tree, searched depth-first.
    #[must_use]
    pub fn error_for(&self, field: &str) -> Option<&FieldError> {
        find(&self.field_errors, field)
    }
}

fn find<'a>(errors: &'a [FieldError], field: &str) -> Option<&'a FieldError> {
    errors.iter().find_map(|e| {
        if e.field == field {
            Some(e)
        } else {
            e.error_for(field)
        }
    })
}

fn parse_rest(json: &Value) -> Option<(String, Vec<FieldError>)> {
    let message = json.pointer("/error/message")?.as_str()?.to_owned();
    let field_errors = json
        .get("fieldErrors")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(parse_rest_field).collect())
        .unwrap_or_default();
    Some((message, field_errors))
}

fn parse_rest_field(value: &Value) -> Option<FieldError> {
    let field = value.get("field")?.as_str()?.to_owned();
    let nested = value
        .get("fieldErrors")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(parse_rest_field).collect())
        .unwrap_or_default();
    Some(FieldError {
        field,
        message: value
            .get("message")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned),
        code: value.get("code").and_then(code_string),
        field_errors: nested,
    })
}

fn parse_graphql(json: &Value) -> Option<(String, Vec<FieldError>)> {
    let errors = json.get("errors")?.as_array()?;

    let mut tree: Vec<FieldError> = Vec::new();
    for error in errors {
        let Some(extensions) = error.get("extensions") else {
            continue;
        };
        if extensions.get("errorType").and_then(Value::as_str) != Some("user_error") {
            continue;
        }
        let path: Vec<&str> = extensions
            .get("inputPath")
            .and_then(Value::as_array)
            .map(|p| p.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        // The first segment is always the mutation's `input` argument.
        let Some((_, path)) = path.split_first() else {
            continue;
        };
        if path.is_empty() {
            continue;
        }
        insert_path(
            &mut tree,
            path,
            error.get("message").and_then(Value::as_str),
            extensions.get("legacyCode").and_then(code_string),
        );
    }

    let message = if tree.is_empty() {
        errors
            .first()
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)?
            .to_owned()
    } else {
        GRAPHQL_INPUT_INVALID_MESSAGE.to_owned()
    };
    Some((message, tree))
}

fn insert_path(tree: &mut Vec<FieldError>, path: &[&str], message: Option<&str>, code: Option<String>) {
    let Some((head, rest)) = path.split_first() else {
        return;
    };
    let idx = if let Some(i) = tree.iter().position(|e| e.field == *head) {
        i
    } else {
        tree.push(FieldError::leaf(head));
        tree.len() - 1
    };
    let node = &mut tree[idx];
    if rest.is_empty() {
        node.message = message.map(ToOwned::to_owned);
        node.code = code;
    } else {
        insert_path(&mut node.field_errors, rest, message, code);
    }
}

fn code_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn rest_body_with_single_nested_error() {
        let body = r#"{
            "error": {"message": "Credit card is invalid"},
            "fieldErrors": [{
                "field": "creditCard",
                "fieldErrors": [{
                    "field": "number",
                    "code": "81716",
                    "message": "Credit card number must be 12-19 digits"
                }]
            }]
        }"#;
        let err = ValidationError::from_response(422, body);

        assert_eq!(err.status_code(), 422);
        assert_eq!(err.message(), "Credit card is invalid");
        assert_eq!(err.original_response(), body);
        assert_eq!(err.field_errors().len(), 1);

        let card = &err.field_errors()[0];
        assert_eq!(card.field(), "creditCard");
        assert_eq!(card.field_errors().len(), 1);

        let number = &card.field_errors()[0];
        assert_eq!(number.field(), "number");
        assert_eq!(number.code(), Some("81716"));
        assert_eq!(
            number.message(),
            Some("Credit card number must be 12-19 digits")
        );
        assert!(number.field_errors().is_empty());
        assert_eq!(err.error_for("number"), Some(number));
    }

    #[test]
    fn rest_body_without_field_errors() {
        let err = ValidationError::from_response(422, r#"{"error":{"message":"Nope"}}"#);
        assert_eq!(err.message(), "Nope");
        assert!(err.field_errors().is_empty());
    }

    #[test]
    fn numeric_codes_are_stringified() {
        let body = r#"{"error":{"message":"bad"},"fieldErrors":[{"field":"cvv","code":81736,"message":"CVV is required"}]}"#;
        let err = ValidationError::from_response(422, body);
        assert_eq!(err.error_for("cvv").unwrap().code(), Some("81736"));
    }

    #[test]
    fn malformed_json_degrades() {
        let err = ValidationError::from_response(422, "{not json");
        assert_eq!(err.message(), PARSING_FAILED_MESSAGE);
        assert!(err.field_errors().is_empty());
        assert_eq!(err.original_response(), "{not json");
    }

    #[test]
    fn json_without_known_shape_degrades() {
        let err = ValidationError::from_response(422, r#"{"unexpected": true}"#);
        assert_eq!(err.message(), PARSING_FAILED_MESSAGE);
        assert!(err.field_errors().is_empty());
    }

    #[test]
    fn graphql_body_builds_nested_tree() {
        let body = r#"{"errors":[
            {"message":"Expiration month is invalid",
             "extensions":{"errorType":"user_error","legacyCode":"81712",
                           "inputPath":["input","creditCard","expirationMonth"]}},
            {"message":"Expiration year is invalid",
             "extensions":{"errorType":"user_error","legacyCode":"81713",
                           "inputPath":["input","creditCard","expirationYear"]}},
            {"message":"Postal code is invalid",
             "extensions":{"errorType":"user_error","legacyCode":"81813",
                           "inputPath":["input","creditCard","billingAddress","postalCode"]}}
        ]}"#;
        let err = ValidationError::from_response(422, body);

        assert_eq!(err.message(), "Input is invalid.");
        assert_eq!(err.field_errors().len(), 1);
        let card = err.error_for("creditCard").unwrap();
        assert_eq!(card.field_errors().len(), 3);
        assert_eq!(
            card.error_for("expirationMonth").unwrap().code(),
            Some("81712")
        );
        let postal = err.error_for("postalCode").unwrap();
        assert_eq!(postal.message(), Some("Postal code is invalid"));
        assert!(card.error_for("billingAddress").is_some());
    }

    #[test]
    fn graphql_without_user_errors_uses_first_message() {
        let body = r#"{"errors":[{"message":"Internal failure","extensions":{"errorType":"developer_error"}}]}"#;
        let err = ValidationError::from_response(422, body);
        assert_eq!(err.message(), "Internal failure");
        assert!(err.field_errors().is_empty());
    }
}
