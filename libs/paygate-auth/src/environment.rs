use crate::errors::CredentialError;
use std::fmt;
use std::str::FromStr;

/// Gateway environment a credential belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    Development,
    Sandbox,
    Production,
}

impl Environment {
    pub const ALL: [Environment; 3] = [
        Environment::Development,
        Environment::Sandbox,
        Environment::Production,
    ];

    /// Name as it appears in a tokenization key.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Sandbox => "sandbox",
            Environment::Production => "production",
        }
    }

    /// Gateway base URL, always ending in `/`.
    #[must_use]
    pub fn base_url(self) -> &'static str {
        match self {
            Environment::Development => "http://localhost:3000/",
            Environment::Sandbox => "https://api.sandbox.braintreegateway.com/",
            Environment::Production => "https://api.braintreegateway.com/",
        }
    }

    /// Merchant configuration endpoint in this environment.
    #[must_use]
    pub fn configuration_url(self, merchant_id: &str) -> String {
        format!(
            "{}merchants/{merchant_id}/client_api/v1/configuration",
            self.base_url()
        )
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Environment {
    type Err = CredentialError;

    /// Exact, case-sensitive match. Anything else is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Environment::ALL
            .into_iter()
            .find(|env| env.name() == s)
            .ok_or_else(|| CredentialError::UnknownEnvironment(s.to_owned()))
    }
}
