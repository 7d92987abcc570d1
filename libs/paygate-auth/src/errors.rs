use paygate_http::HttpError;
use thiserror::Error;

/// Why an authorization string could not be resolved.
///
/// Messages never include the authorization string itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CredentialError {
    #[error("authorization is empty")]
    Empty,

    #[error("authorization does not match any known credential format")]
    Unrecognized,

    #[error("credential is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("unknown environment '{0}'")]
    UnknownEnvironment(String),

    #[error("unknown token issuer '{0}'")]
    UnknownIssuer(String),

    #[error("malformed credential payload: {0}")]
    MalformedPayload(String),
}

impl From<CredentialError> for HttpError {
    fn from(err: CredentialError) -> Self {
        HttpError::InvalidCredential(err.to_string())
    }
}
