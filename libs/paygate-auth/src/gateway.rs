use crate::credential::Credential;
use paygate_http::{
    AsyncHttpClient, HttpCallback, HttpError, HttpOutcome, HttpRequest, RequestBuilder,
    RetryPolicy,
};

/// Header carrying a tokenization key.
pub const CLIENT_KEY_HEADER: &str = "Client-Key";

/// Configuration schema version requested from the gateway.
pub const CONFIG_VERSION: &str = "3";

/// Authenticated access to the merchant gateway.
///
/// Stamps every request with the credential's header and resolves relative
/// paths against the credential's client API root.
#[derive(Clone, Debug)]
pub struct GatewayClient {
    credential: Credential,
    http: AsyncHttpClient,
    client_api_url: String,
}

impl GatewayClient {
    #[must_use]
    pub fn new(credential: Credential, http: AsyncHttpClient) -> Self {
        let client_api_url = credential.client_api_url();
        Self {
            credential,
            http,
            client_api_url,
        }
    }

    /// Resolve `authorization` and build a client.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::InvalidCredential`] if the authorization string
    /// cannot be resolved. No request is made in that case.
    pub fn from_authorization(authorization: &str, http: AsyncHttpClient) -> Result<Self, HttpError> {
        let credential = Credential::resolve(authorization)?;
        Ok(Self::new(credential, http))
    }

    #[must_use]
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Root that relative paths resolve against.
    #[must_use]
    pub fn client_api_url(&self) -> &str {
        &self.client_api_url
    }

    /// Authenticated GET builder for `path`.
    pub fn get(&self, path: &str) -> RequestBuilder {
        self.authenticate(HttpRequest::get(path))
    }

    /// Authenticated POST builder for `path` with a JSON body.
    pub fn post(&self, path: &str, body: impl Into<String>) -> RequestBuilder {
        self.authenticate(HttpRequest::post(path)).body(body)
    }

    /// Authenticated PUT builder for `path` with a JSON body.
    pub fn put(&self, path: &str, body: impl Into<String>) -> RequestBuilder {
        self.authenticate(HttpRequest::put(path)).body(body)
    }

    /// Send an authenticated request built with [`get`](Self::get),
    /// [`post`](Self::post) or [`put`](Self::put).
    pub fn send(&self, request: RequestBuilder, callback: Option<HttpCallback>) {
        match request.build() {
            Ok(request) => self.http.send_request(request, callback),
            Err(err) => {
                tracing::debug!(error = %err, "gateway request rejected before sending");
                self.http.deliver_failure(err, callback);
            }
        }
    }

    /// Synchronous twin of [`send`](Self::send).
    ///
    /// # Errors
    ///
    /// Returns the request's classified error.
    pub fn execute(&self, request: RequestBuilder) -> HttpOutcome {
        self.http.execute(request.build()?)
    }

    /// Fetch the merchant configuration with the bounded retry policy.
    pub fn fetch_configuration(&self, callback: Option<HttpCallback>) {
        self.send(self.configuration_request(), callback);
    }

    /// Synchronous twin of [`fetch_configuration`](Self::fetch_configuration).
    ///
    /// # Errors
    ///
    /// Returns the classified error, or `RetryLimitExceeded` once all
    /// attempts have failed.
    pub fn fetch_configuration_sync(&self) -> HttpOutcome {
        self.execute(self.configuration_request())
    }

    fn configuration_request(&self) -> RequestBuilder {
        let url = match url::Url::parse_with_params(
            self.credential.configuration_url(),
            &[("configVersion", CONFIG_VERSION)],
        ) {
            Ok(url) => url.to_string(),
            Err(_) => self.credential.configuration_url().to_owned(),
        };
        self.get(&url).retry_policy(RetryPolicy::bounded())
    }

    fn authenticate(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.base_url(self.client_api_url.as_str());
        match &self.credential {
            Credential::TokenizationKey(key) => builder.header(CLIENT_KEY_HEADER, key.expose()),
            Credential::ClientToken(_) | Credential::UniversalAccessToken(_) => builder.header(
                http::header::AUTHORIZATION.as_str(),
                &format!("Bearer {}", self.credential.bearer_token()),
            ),
        }
    }
}
