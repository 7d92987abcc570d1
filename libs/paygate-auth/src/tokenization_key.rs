use crate::environment::Environment;
use crate::errors::CredentialError;
use paygate_utils::SecretString;
use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::expect_used)] // good regex, it doesn't panic
static GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]+_[A-Za-z0-9]+_[A-Za-z0-9_]+$").expect("static regex should not panic")
});

/// Long-lived, low-privilege key of the form
/// `<environment>_<random>_<merchantId>`.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenizationKey {
    raw: SecretString,
    environment: Environment,
    merchant_id: String,
    configuration_url: String,
}

impl TokenizationKey {
    /// Whether `raw` has the shape of a tokenization key, regardless of
    /// whether its environment is known.
    #[must_use]
    pub fn matches_grammar(raw: &str) -> bool {
        GRAMMAR.is_match(raw)
    }

    /// Parse a tokenization key.
    ///
    /// # Errors
    ///
    /// [`CredentialError::Unrecognized`] if `raw` does not have the key
    /// shape, [`CredentialError::UnknownEnvironment`] if the first segment is
    /// not a known environment.
    pub fn parse(raw: &str) -> Result<Self, CredentialError> {
        if !Self::matches_grammar(raw) {
            return Err(CredentialError::Unrecognized);
        }
        let mut parts = raw.splitn(3, '_');
        let (Some(env), Some(_random), Some(merchant_id)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(CredentialError::Unrecognized);
        };
        let environment: Environment = env.parse()?;

        Ok(Self {
            raw: SecretString::new(raw),
            environment,
            merchant_id: merchant_id.to_owned(),
            configuration_url: environment.configuration_url(merchant_id),
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
    pub fn base_url(&self) -> &'static str {
        self.environment.base_url()
    }

    #[must_use]
    pub fn configuration_url(&self) -> &str {
        &self.configuration_url
    }

    /// The key itself; it is also the value of the `Client-Key` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.raw.expose()
    }
}

impl std::fmt::Debug for TokenizationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenizationKey")
            .field("raw", &self.raw)
            .field("environment", &self.environment)
            .field("merchant_id", &self.merchant_id)
            .field("configuration_url", &self.configuration_url)
            .finish()
    }
}
