use crate::classify::{classify, is_success};
use crate::config::{HttpClientConfig, TransportSecurity};
use crate::error::HttpError;
use crate::parser::{RawBodyParser, ResponseParser};
use crate::request::{HttpRequest, RequestBody, validate_url};
use crate::tls::TlsHandle;
use std::sync::Arc;

/// Performs one HTTP exchange on the calling thread.
///
/// Implementations must be safe to call concurrently from several
/// background units.
pub trait RequestExecutor: Send + Sync {
    /// Execute `request` once and return the parsed success body.
    ///
    /// # Errors
    ///
    /// Returns the classified error for a non-success status,
    /// [`HttpError::Transport`] for I/O failures, or whatever the response
    /// parser rejects.
    fn execute(&self, request: &HttpRequest) -> Result<String, HttpError>;
}

impl<T: RequestExecutor + ?Sized> RequestExecutor for Arc<T> {
    fn execute(&self, request: &HttpRequest) -> Result<String, HttpError> {
        (**self).execute(request)
    }
}

/// Blocking executor backed by a `ureq` agent whose TLS configuration comes
/// from a [`TlsHandle`].
///
/// Redirects are not followed: a 3xx is reported like any other
/// non-success status.
pub struct SyncRequestExecutor {
    agent: ureq::Agent,
    parser: Arc<dyn ResponseParser>,
    transport_security: TransportSecurity,
}

impl SyncRequestExecutor {
    /// Executor returning success bodies unchanged.
    #[must_use]
    pub fn new(config: &HttpClientConfig, tls: &TlsHandle) -> Self {
        Self::with_parser(config, tls, Arc::new(RawBodyParser))
    }

    #[must_use]
    pub fn with_parser(
        config: &HttpClientConfig,
        tls: &TlsHandle,
        parser: Arc<dyn ResponseParser>,
    ) -> Self {
        let agent = ureq::AgentBuilder::new()
            .tls_config(tls.client_config())
            .timeout_connect(config.connect_timeout)
            .timeout_read(config.read_timeout)
            .timeout_write(config.write_timeout)
            .user_agent(&config.user_agent)
            .redirects(0)
            .https_only(config.transport == TransportSecurity::TlsOnly)
            .build();

        Self {
            agent,
            parser,
            transport_security: config.transport,
        }
    }

    fn read_success(&self, status: u16, response: ureq::Response) -> Result<String, HttpError> {
        let body = response
            .into_string()
            .map_err(|e| HttpError::Transport(Box::new(e)))?;
        self.parser.parse(status, body)
    }
}

impl std::fmt::Debug for SyncRequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncRequestExecutor")
            .field("transport_security", &self.transport_security)
            .finish_non_exhaustive()
    }
}

impl RequestExecutor for SyncRequestExecutor {
    fn execute(&self, request: &HttpRequest) -> Result<String, HttpError> {
        let url = request.url();
        let parsed = validate_url(&url, self.transport_security)?;

        let mut call = self.agent.request_url(request.method().as_str(), &parsed);
        for (name, value) in request.headers() {
            call = call.set(name.as_str(), &String::from_utf8_lossy(value.as_bytes()));
        }
        if request.header("accept").is_none() {
            call = call.set("Accept", "application/json");
        }
        if request.body().is_some() && request.header("content-type").is_none() {
            call = call.set("Content-Type", "application/json");
        }

        tracing::debug!(method = %request.method(), url = %parsed.path(), "sending request");

        let result = match request.body() {
            Some(RequestBody::Text(text)) => call.send_string(text),
            Some(RequestBody::Bytes(bytes)) => call.send_bytes(bytes),
            None => call.call(),
        };

        match result {
            Ok(response) => {
                let status = response.status();
                tracing::debug!(status, "response received");
                if is_success(status) {
                    self.read_success(status, response)
                } else {
                    let body = response.into_string().unwrap_or_default();
                    Err(classify(status, &body))
                }
            }
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                tracing::debug!(status, "error response received");
                Err(classify(status, &body))
            }
            Err(ureq::Error::Transport(transport)) => Err(map_transport_error(&url, transport)),
        }
    }
}

fn map_transport_error(url: &str, transport: ureq::Transport) -> HttpError {
    match transport.kind() {
        ureq::ErrorKind::InvalidUrl => HttpError::InvalidUri {
            url: url.to_owned(),
            kind: crate::error::InvalidUriKind::ParseError,
            reason: transport.to_string(),
        },
        ureq::ErrorKind::UnknownScheme | ureq::ErrorKind::InsecureRequestHttpsOnly => {
            HttpError::InvalidScheme {
                scheme: url.split(':').next().unwrap_or_default().to_owned(),
                reason: transport.to_string(),
            }
        }
        _ => {
            tracing::debug!(error = %transport, "transport failure");
            HttpError::Transport(Box::new(transport))
        }
    }
}
