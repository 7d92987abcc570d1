//! Credential resolution.
//!
//! An authorization string is resolved in a fixed order:
//!
//! 1. base64 (or JWT-shaped base64url) JSON with `authorizationFingerprint`
//!    is a [`ClientToken`];
//! 2. decoded JSON with `iss` is a [`UniversalAccessToken`];
//! 3. a string matching `<environment>_<random>_<merchantId>` is a
//!    [`TokenizationKey`];
//! 4. anything else is rejected.
//!
//! Resolution is pure: no I/O, no shared state.

use crate::client_token::{ClientToken, FINGERPRINT_KEY};
use crate::errors::CredentialError;
use crate::tokenization_key::TokenizationKey;
use crate::universal_access_token::{ISSUER_KEY, UniversalAccessToken};
use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Suffix shared by every configuration URL; stripping it yields the
/// client API root.
const CONFIGURATION_SUFFIX: &str = "v1/configuration";

/// A resolved, immutable credential.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    TokenizationKey(TokenizationKey),
    ClientToken(ClientToken),
    UniversalAccessToken(UniversalAccessToken),
}

impl Credential {
    /// Resolve an authorization string.
    ///
    /// Leading and trailing whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when the input is empty, matches no known
    /// shape, or matches a shape but is missing required fields.
    pub fn resolve(raw: &str) -> Result<Self, CredentialError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(CredentialError::Empty);
        }

        let credential = if let Some(payload) = decode_json_payload(raw) {
            if payload.get(FINGERPRINT_KEY).is_some() {
                Credential::ClientToken(ClientToken::from_payload(raw, payload)?)
            } else if payload.get(ISSUER_KEY).is_some() {
                Credential::UniversalAccessToken(UniversalAccessToken::from_payload(raw, payload)?)
            } else {
                return Err(CredentialError::Unrecognized);
            }
        } else if TokenizationKey::matches_grammar(raw) {
            Credential::TokenizationKey(TokenizationKey::parse(raw)?)
        } else {
            return Err(CredentialError::Unrecognized);
        };

        tracing::debug!(kind = credential.kind_name(), "authorization resolved");
        Ok(credential)
    }

    /// Value presented to the gateway: the key for a tokenization key, the
    /// authorization fingerprint for a client token, the whole token for a
    /// universal access token.
    #[must_use]
    pub fn bearer_token(&self) -> &str {
        match self {
            Credential::TokenizationKey(key) => key.expose(),
            Credential::ClientToken(token) => token.authorization_fingerprint(),
            Credential::UniversalAccessToken(token) => token.expose(),
        }
    }

    #[must_use]
    pub fn configuration_url(&self) -> &str {
        match self {
            Credential::TokenizationKey(key) => key.configuration_url(),
            Credential::ClientToken(token) => token.configuration_url(),
            Credential::UniversalAccessToken(token) => token.configuration_url(),
        }
    }

    /// Root that relative client API paths resolve against, ending in `/`.
    ///
    /// The configuration URL without its query, fragment and
    /// `v1/configuration` path suffix, or its origin when the path has no
    /// such suffix.
    #[must_use]
    pub fn client_api_url(&self) -> String {
        let config_url = self.configuration_url();
        let without_query = config_url.split(['?', '#']).next().unwrap_or(config_url);
        if let Some(root) = without_query.strip_suffix(CONFIGURATION_SUFFIX) {
            return root.to_owned();
        }
        match url::Url::parse(config_url) {
            Ok(parsed) => format!("{}/", parsed.origin().ascii_serialization()),
            Err(_) => config_url.to_owned(),
        }
    }

    /// The authorization string this credential was resolved from.
    ///
    /// Re-resolving it yields an equal credential.
    #[must_use]
    pub fn expose_raw(&self) -> &str {
        match self {
            Credential::TokenizationKey(key) => key.expose(),
            Credential::ClientToken(token) => token.expose(),
            Credential::UniversalAccessToken(token) => token.expose(),
        }
    }

    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Credential::TokenizationKey(_) => "tokenization_key",
            Credential::ClientToken(_) => "client_token",
            Credential::UniversalAccessToken(_) => "universal_access_token",
        }
    }

    #[must_use]
    pub fn as_tokenization_key(&self) -> Option<&TokenizationKey> {
        match self {
            Credential::TokenizationKey(key) => Some(key),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_client_token(&self) -> Option<&ClientToken> {
        match self {
            Credential::ClientToken(token) => Some(token),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_universal_access_token(&self) -> Option<&UniversalAccessToken> {
        match self {
            Credential::UniversalAccessToken(token) => Some(token),
            _ => None,
        }
    }
}

impl FromStr for Credential {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Credential::resolve(s)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::TokenizationKey(key) => key.fmt(f),
            Credential::ClientToken(token) => token.fmt(f),
            Credential::UniversalAccessToken(token) => token.fmt(f),
        }
    }
}

/// Display form safe for logs: variant and non-secret fields only.
impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::TokenizationKey(key) => write!(
                f,
                "TokenizationKey({}, merchant {})",
                key.environment(),
                key.merchant_id()
            ),
            Credential::ClientToken(token) => {
                write!(f, "ClientToken({})", token.configuration_url())
            }
            Credential::UniversalAccessToken(token) => write!(
                f,
                "UniversalAccessToken({}, merchant {})",
                token.environment(),
                token.merchant_id()
            ),
        }
    }
}

/// Decode a base64 JSON object, or the payload segment of a JWT-shaped
/// `header.payload.signature` string.
fn decode_json_payload(raw: &str) -> Option<Value> {
    let bytes = STANDARD.decode(raw).ok().or_else(|| {
        let mut segments = raw.split('.');
        match (segments.next(), segments.next(), segments.next(), segments.next()) {
            (Some(_), Some(payload), Some(_), None) => {
                URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()
            }
            _ => None,
        }
    })?;
    serde_json::from_slice::<Value>(&bytes)
        .ok()
        .filter(Value::is_object)
}
