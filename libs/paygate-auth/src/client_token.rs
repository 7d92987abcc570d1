use crate::errors::CredentialError;
use paygate_utils::SecretString;
use serde::Deserialize;

/// Payload key that identifies a client token.
pub(crate) const FINGERPRINT_KEY: &str = "authorizationFingerprint";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Payload {
    config_url: Option<String>,
    authorization_fingerprint: Option<String>,
}

/// Short-lived, customer-scoped credential: base64 JSON carrying an
/// authorization fingerprint and the merchant configuration URL.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientToken {
    raw: SecretString,
    configuration_url: String,
    authorization_fingerprint: SecretString,
    customer_id: Option<String>,
}

impl ClientToken {
    /// Build from the raw token and its decoded JSON payload.
    ///
    /// # Errors
    ///
    /// [`CredentialError::MissingField`] if `configUrl` or a non-empty
    /// `authorizationFingerprint` is absent.
    pub(crate) fn from_payload(raw: &str, payload: serde_json::Value) -> Result<Self, CredentialError> {
        let payload: Payload = serde_json::from_value(payload)
            .map_err(|e| CredentialError::MalformedPayload(e.to_string()))?;

        let fingerprint = payload
            .authorization_fingerprint
            .filter(|f| !f.is_empty())
            .ok_or(CredentialError::MissingField(FINGERPRINT_KEY))?;
        let configuration_url = payload
            .config_url
            .filter(|u| !u.is_empty())
            .ok_or(CredentialError::MissingField("configUrl"))?;

        Ok(Self {
            raw: SecretString::new(raw),
            configuration_url,
            customer_id: customer_id_from_fingerprint(&fingerprint),
            authorization_fingerprint: SecretString::new(fingerprint),
        })
    }

    #[must_use]
    pub fn configuration_url(&self) -> &str {
        &self.configuration_url
    }

    /// Bearer value sent on every request made with this token.
    #[must_use]
    pub fn authorization_fingerprint(&self) -> &str {
        self.authorization_fingerprint.expose()
    }

    #[must_use]
    pub fn customer_id(&self) -> Option<&str> {
        self.customer_id.as_deref()
    }

    /// The encoded token as originally supplied.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.raw.expose()
    }
}

impl std::fmt::Debug for ClientToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientToken")
            .field("raw", &self.raw)
            .field("configuration_url", &self.configuration_url)
            .field("authorization_fingerprint", &self.authorization_fingerprint)
            .field("customer_id", &self.customer_id)
            .finish()
    }
}

/// The fingerprint is `<signature>|<query string>`; the customer id is the
/// `customer_id` entry of the query string.
fn customer_id_from_fingerprint(fingerprint: &str) -> Option<String> {
    let query = fingerprint
        .split_once('|')
        .map_or(fingerprint, |(_, query)| query);
    serde_urlencoded::from_str::<Vec<(String, String)>>(query)
        .ok()?
        .into_iter()
        .find(|(key, value)| key == "customer_id" && !value.is_empty())
        .map(|(_, value)| value)
}
