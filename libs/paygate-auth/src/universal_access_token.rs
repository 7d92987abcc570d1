use crate::environment::Environment;
use crate::errors::CredentialError;
use paygate_utils::SecretString;
use serde::Deserialize;

/// Payload key that identifies a universal access token.
pub(crate) const ISSUER_KEY: &str = "iss";

const EXTERNAL_ID_PREFIX: &str = "Braintree:";

/// Issuer to (environment, external service URL).
const ISSUERS: [(&str, Environment, &str); 2] = [
    (
        "https://api.paypal.com",
        Environment::Production,
        "https://api.paypal.com/",
    ),
    (
        "https://api.sandbox.paypal.com",
        Environment::Sandbox,
        "https://api.sandbox.paypal.com/",
    ),
];

#[derive(Deserialize)]
struct Payload {
    iss: Option<String>,
    external_id: Option<Vec<String>>,
}

/// Bearer token issued by the partner identity provider.
///
/// The whole token is the bearer value; the payload only supplies the
/// issuer (which selects the environment) and the merchant id.
#[derive(Clone, PartialEq, Eq)]
pub struct UniversalAccessToken {
    raw: SecretString,
    environment: Environment,
    merchant_id: String,
    configuration_url: String,
    external_service_url: &'static str,
}

impl UniversalAccessToken {
    /// Build from the raw token and its decoded JSON payload.
    ///
    /// # Errors
    ///
    /// [`CredentialError::UnknownIssuer`] for an issuer outside the fixed
    /// table, [`CredentialError::MissingField`] when `iss` or a
    /// `Braintree:<merchantId>` entry in `external_id` is absent.
    pub(crate) fn from_payload(raw: &str, payload: serde_json::Value) -> Result<Self, CredentialError> {
        let payload: Payload = serde_json::from_value(payload)
            .map_err(|e| CredentialError::MalformedPayload(e.to_string()))?;

        let issuer = payload
            .iss
            .filter(|iss| !iss.is_empty())
            .ok_or(CredentialError::MissingField(ISSUER_KEY))?;
        let normalized = issuer.trim_end_matches('/');
        let &(_, environment, external_service_url) = ISSUERS
            .iter()
            .find(|(iss, _, _)| *iss == normalized)
            .ok_or_else(|| CredentialError::UnknownIssuer(issuer.clone()))?;

        let merchant_id = payload
            .external_id
            .unwrap_or_default()
            .into_iter()
            .find_map(|id| {
                id.strip_prefix(EXTERNAL_ID_PREFIX)
                    .filter(|mid| !mid.is_empty())
                    .map(ToOwned::to_owned)
            })
            .ok_or(CredentialError::MissingField("external_id"))?;

        Ok(Self {
            raw: SecretString::new(raw),
            environment,
            configuration_url: environment.configuration_url(&merchant_id),
            merchant_id,
            external_service_url,
        })
    }

    #[must_use]
    pub fn environment(&self) -> Environment {
        self.environment
    }

    #[must_use]
    pub fn merchant_id(&self) -> &str {
        &self.merchant_id
    }

    #[must_use]
    pub fn configuration_url(&self) -> &str {
        &self.configuration_url
    }

    /// API host of the issuing identity provider.
    #[must_use]
    pub fn external_service_url(&self) -> &'static str {
        self.external_service_url
    }

    /// The token as supplied; also the bearer value.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.raw.expose()
    }
}

impl std::fmt::Debug for UniversalAccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniversalAccessToken")
            .field("raw", &self.raw)
            .field("environment", &self.environment)
            .field("merchant_id", &self.merchant_id)
            .field("configuration_url", &self.configuration_url)
            .field("external_service_url", &self.external_service_url)
            .finish()
    }
}
