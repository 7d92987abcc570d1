use crate::client::AsyncHttpClient;
use crate::config::{HttpClientConfig, TlsRootConfig, TlsVersion, TransportSecurity};
use crate::error::HttpError;
use crate::executor::{RequestExecutor, SyncRequestExecutor};
use crate::parser::{RawBodyParser, ResponseParser};
use crate::scheduler::{Scheduler, ThreadPoolScheduler};
use crate::tls::SecureTransportFactory;
use std::sync::Arc;
use std::time::Duration;

/// Builder for [`AsyncHttpClient`].
///
/// Unless overridden, the client gets a [`SyncRequestExecutor`] over a
/// [`SecureTransportFactory`] handle built from the config, and a
/// [`ThreadPoolScheduler`] sized by `max_background_threads`.
pub struct HttpClientBuilder {
    config: HttpClientConfig,
    base_url: Option<String>,
    factory: Option<SecureTransportFactory>,
    executor: Option<Arc<dyn RequestExecutor>>,
    scheduler: Option<Arc<dyn Scheduler>>,
    parser: Arc<dyn ResponseParser>,
}

impl HttpClientBuilder {
    /// Create a new builder with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a builder with a specific configuration
    #[must_use]
    pub fn with_config(config: HttpClientConfig) -> Self {
        Self {
            config,
            base_url: None,
            factory: None,
            executor: None,
            scheduler: None,
            parser: Arc::new(RawBodyParser),
        }
    }

    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set both the read and the write socket timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self.config.write_timeout = timeout;
        self
    }

    /// Set the user agent string
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn tls_version(mut self, version: TlsVersion) -> Self {
        self.config.tls_version = version;
        self
    }

    #[must_use]
    pub fn tls_roots(mut self, roots: TlsRootConfig) -> Self {
        self.config.tls_roots = roots;
        self
    }

    /// Use a pre-configured factory (pinned trust anchor, custom crypto
    /// provider). Overrides `tls_version` and `tls_roots`.
    #[must_use]
    pub fn transport_factory(mut self, factory: SecureTransportFactory) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Set transport security mode
    ///
    /// Use `TransportSecurity::AllowInsecureHttp` only for testing with mock servers.
    #[must_use]
    pub fn transport(mut self, transport: TransportSecurity) -> Self {
        self.config.transport = transport;
        self
    }

    /// Allow insecure HTTP connections (for testing only)
    ///
    /// Only available in debug builds or with the `allow-insecure-http`
    /// feature.
    #[must_use]
    #[cfg(any(debug_assertions, feature = "allow-insecure-http"))]
    pub fn allow_insecure_http(mut self) -> Self {
        tracing::warn!(
            target: "paygate_http::security",
            "allow_insecure_http() called - HTTP traffic will NOT be encrypted"
        );
        self.config.transport = TransportSecurity::AllowInsecureHttp;
        self
    }

    #[must_use]
    pub fn max_background_threads(mut self, threads: usize) -> Self {
        self.config.max_background_threads = threads;
        self
    }

    /// Parser for success bodies of the default executor.
    #[must_use]
    pub fn parser(mut self, parser: Arc<dyn ResponseParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Replace the default executor. The TLS settings and parser are then
    /// ignored.
    #[must_use]
    pub fn executor(mut self, executor: Arc<dyn RequestExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Replace the default thread-pool scheduler.
    #[must_use]
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::TransportInitialization`] if the TLS handle or
    /// the background pool cannot be created.
    pub fn build(self) -> Result<AsyncHttpClient, HttpError> {
        if self.config.transport == TransportSecurity::AllowInsecureHttp {
            tracing::warn!(
                target: "paygate_http::security",
                "client built with insecure HTTP allowed"
            );
        }

        let executor = match self.executor {
            Some(executor) => executor,
            None => {
                let factory = self.factory.unwrap_or_else(|| {
                    SecureTransportFactory::new(self.config.tls_version)
                        .with_roots(self.config.tls_roots)
                });
                let tls = factory.create()?;
                Arc::new(SyncRequestExecutor::with_parser(
                    &self.config,
                    &tls,
                    self.parser,
                ))
            }
        };

        let scheduler = match self.scheduler {
            Some(scheduler) => scheduler,
            None => Arc::new(
                ThreadPoolScheduler::new(self.config.max_background_threads)
                    .map_err(|e| HttpError::TransportInitialization(Box::new(e)))?,
            ),
        };

        let client = AsyncHttpClient::new(executor, scheduler);
        Ok(match self.base_url {
            Some(base_url) => client.with_base_url(base_url),
            None => client,
        })
    }
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
