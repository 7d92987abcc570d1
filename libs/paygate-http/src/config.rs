use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default User-Agent string for HTTP requests
pub const DEFAULT_USER_AGENT: &str = concat!("paygate-http/", env!("CARGO_PKG_VERSION"));

/// Config section read by [`HttpClientConfig::from_figment`].
pub const CONFIG_SECTION: &str = "http";

/// Environment variable prefix used by [`HttpClientConfig::load_layered`].
///
/// Nested keys are separated by `__`, e.g. `PAYGATE_HTTP__READ_TIMEOUT=5s`.
pub const ENV_PREFIX: &str = "PAYGATE_";

/// Number of attempts (initial + retries) for [`RetryPolicy::bounded`].
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Retry policy fixed when a request is constructed.
///
/// Retries are immediate: no backoff, no jitter, and every error kind is
/// retried the same way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Single attempt; the attempt's own error is delivered.
    #[default]
    None,
    /// Up to `max_attempts` attempts in total. When all fail the caller
    /// receives `RetryLimitExceeded`.
    Bounded { max_attempts: u32 },
}

impl RetryPolicy {
    /// The standard bound of three attempts in total.
    #[must_use]
    pub fn bounded() -> Self {
        Self::Bounded {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Total attempts allowed, never less than one.
    #[must_use]
    pub fn max_attempts(self) -> u32 {
        match self {
            RetryPolicy::None => 1,
            RetryPolicy::Bounded { max_attempts } => max_attempts.max(1),
        }
    }
}

/// The single TLS protocol version every connection is restricted to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsVersion {
    #[default]
    Tls12,
    Tls13,
}

impl TlsVersion {
    pub(crate) fn as_rustls(self) -> &'static rustls::SupportedProtocolVersion {
        match self {
            TlsVersion::Tls12 => &rustls::version::TLS12,
            TlsVersion::Tls13 => &rustls::version::TLS13,
        }
    }
}

/// TLS root certificate configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum TlsRootConfig {
    /// Use Mozilla's root certificates (webpki-roots, no OS dependency)
    #[default]
    WebPki,
    /// Use OS native root certificate store
    Native,
}

/// Transport security configuration
///
/// Controls whether the client enforces TLS or allows insecure HTTP.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum TransportSecurity {
    /// Require TLS for all connections (HTTPS only) - default and recommended
    #[default]
    TlsOnly,
    /// Allow insecure HTTP connections (for testing with mock servers only)
    ///
    /// **WARNING**: Never use in production; traffic is not encrypted.
    AllowInsecureHttp,
}

/// Overall HTTP client configuration.
///
/// Every field has a default, so a partial config section is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpClientConfig {
    /// Connection establishment timeout (default: 30s)
    #[serde(with = "paygate_utils::humantime_serde")]
    pub connect_timeout: Duration,

    /// Per-read socket timeout (default: 30s)
    #[serde(with = "paygate_utils::humantime_serde")]
    pub read_timeout: Duration,

    /// Per-write socket timeout (default: 30s)
    #[serde(with = "paygate_utils::humantime_serde")]
    pub write_timeout: Duration,

    /// User-Agent header value
    pub user_agent: String,

    /// The only TLS version connections may negotiate (default: `tls12`)
    pub tls_version: TlsVersion,

    /// TLS root certificate strategy (default: `webpki`)
    pub tls_roots: TlsRootConfig,

    /// Transport security mode (default: `tls_only`)
    pub transport: TransportSecurity,

    /// Upper bound on concurrently running background requests (default: 64)
    pub max_background_threads: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            tls_version: TlsVersion::default(),
            tls_roots: TlsRootConfig::default(),
            transport: TransportSecurity::TlsOnly,
            max_background_threads: 64,
        }
    }
}

impl HttpClientConfig {
    /// Create configuration for testing with mock servers (allows insecure HTTP)
    ///
    /// **WARNING**: This configuration allows plain HTTP connections.
    /// Use only for local testing with mock servers, never in production.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(10),
            transport: TransportSecurity::AllowInsecureHttp,
            max_background_threads: 8,
            ..Self::default()
        }
    }

    /// Read the [`CONFIG_SECTION`] section of `figment`.
    ///
    /// A missing section yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the section exists but cannot be
    /// deserialized.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        if !figment.contains(CONFIG_SECTION) {
            return Ok(Self::default());
        }
        figment
            .extract_inner(CONFIG_SECTION)
            .map_err(|e| ConfigError::Invalid(Box::new(e)))
    }

    /// Layered load: defaults, then an optional YAML file, then
    /// `PAYGATE_`-prefixed environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingFile`] if `path` is given but does not
    /// exist, or [`ConfigError::Invalid`] if the merged result is invalid.
    pub fn load_layered(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::default(
            CONFIG_SECTION,
            Self::default(),
        ));
        if let Some(path) = path {
            if !path.is_file() {
                return Err(ConfigError::MissingFile(path.display().to_string()));
            }
            figment = figment.merge(Yaml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(&figment)
    }
}

/// Configuration loading error
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("config file '{0}' not found")]
    MissingFile(String),
    #[error("invalid http config: {0}")]
    Invalid(#[source] Box<figment::Error>),
}
