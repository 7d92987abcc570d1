use crate::config::{RetryPolicy, TransportSecurity};
use crate::error::{HttpError, InvalidUriKind};
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use serde::Serialize;

/// HTTP methods the gateway API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

impl HttpMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Text(String),
    Bytes(Bytes),
}

impl RequestBody {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            RequestBody::Text(s) => s.as_bytes(),
            RequestBody::Bytes(b) => b,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

/// An immutable description of one HTTP call.
///
/// Built with [`HttpRequest::get`], [`HttpRequest::post`] or
/// [`HttpRequest::put`]; the same value is reused for every attempt the
/// retry policy allows.
///
/// Two requests are equal when method, resolved URL and body match.
/// Headers and retry policy do not take part in the comparison.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: HttpMethod,
    base_url: Option<String>,
    path: String,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Option<RequestBody>,
    retry_policy: RetryPolicy,
}

impl HttpRequest {
    pub fn get(path: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(HttpMethod::Get, path.into())
    }

    pub fn post(path: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(HttpMethod::Post, path.into())
    }

    pub fn put(path: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(HttpMethod::Put, path.into())
    }

    #[must_use]
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Effective URL.
    ///
    /// An absolute `path` is used as-is. Otherwise `path` is appended to the
    /// base URL with exactly one `/` between them.
    #[must_use]
    pub fn url(&self) -> String {
        match &self.base_url {
            Some(base) if !is_absolute(&self.path) => {
                let base = base.trim_end_matches('/');
                let path = self.path.trim_start_matches('/');
                if path.is_empty() {
                    format!("{base}/")
                } else {
                    format!("{base}/{path}")
                }
            }
            _ => self.path.clone(),
        }
    }

    #[must_use]
    pub fn headers(&self) -> &[(HeaderName, HeaderValue)] {
        &self.headers
    }

    /// Value of the header `name`, if set.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers
            .iter()
            .find(|(n, _)| n.as_str().eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    #[must_use]
    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    /// Copy of this request with `base_url` filled in when it has none.
    #[must_use]
    pub fn with_default_base_url(mut self, base_url: &str) -> Self {
        if self.base_url.is_none() {
            self.base_url = Some(base_url.to_owned());
        }
        self
    }

    /// Copy of this request with `name` set unless already present.
    #[must_use]
    pub fn with_default_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        if !self.headers.iter().any(|(n, _)| *n == name) {
            self.headers.push((name, value));
        }
        self
    }
}

impl PartialEq for HttpRequest {
    fn eq(&self, other: &Self) -> bool {
        self.method == other.method && self.url() == other.url() && self.body == other.body
    }
}

impl Eq for HttpRequest {}

fn is_absolute(path: &str) -> bool {
    ["https://", "http://"].iter().any(|scheme| {
        path.get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

/// Builder for [`HttpRequest`].
///
/// Header errors are captured and reported by [`build`](Self::build).
#[must_use = "RequestBuilder does nothing until .build() is called"]
#[derive(Debug)]
pub struct RequestBuilder {
    method: HttpMethod,
    base_url: Option<String>,
    path: String,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Option<RequestBody>,
    retry_policy: RetryPolicy,
    error: Option<HttpError>,
}

impl RequestBuilder {
    fn new(method: HttpMethod, path: String) -> Self {
        Self {
            method,
            base_url: None,
            path,
            headers: Vec::new(),
            body: None,
            retry_policy: RetryPolicy::default(),
            error: None,
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set a header. Setting the same name again replaces the earlier value
    /// in place.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if self.error.is_some() {
            return self;
        }

        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                if let Some(slot) = self.headers.iter_mut().find(|(n, _)| *n == name) {
                    slot.1 = value;
                } else {
                    self.headers.push((name, value));
                }
            }
            (Err(e), _) => self.error = Some(HttpError::InvalidHeaderName(e)),
            (_, Err(e)) => self.error = Some(HttpError::InvalidHeaderValue(e)),
        }
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Text(body.into()));
        self
    }

    pub fn body_bytes(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(RequestBody::Bytes(body.into()));
        self
    }

    /// Serialize `value` as the JSON body and set `Content-Type` unless one
    /// was already given.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => {
                self.body = Some(RequestBody::Text(body));
                if !self
                    .headers
                    .iter()
                    .any(|(n, _)| *n == http::header::CONTENT_TYPE)
                {
                    self = self.header("content-type", "application/json");
                }
            }
            Err(e) => {
                if self.error.is_none() {
                    self.error = Some(HttpError::Json(e));
                }
            }
        }
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Shorthand for [`RetryPolicy::bounded`].
    pub fn with_retries(self) -> Self {
        self.retry_policy(RetryPolicy::bounded())
    }

    /// Finish the request.
    ///
    /// # Errors
    ///
    /// Returns the first invalid header name or value, or a body
    /// serialization failure.
    pub fn build(self) -> Result<HttpRequest, HttpError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(HttpRequest {
            method: self.method,
            base_url: self.base_url,
            path: self.path,
            headers: self.headers,
            body: self.body,
            retry_policy: self.retry_policy,
        })
    }
}

/// Check `url` is absolute and its scheme is allowed by `security`.
pub(crate) fn validate_url(url: &str, security: TransportSecurity) -> Result<url::Url, HttpError> {
    let parsed = url::Url::parse(url).map_err(|e| HttpError::InvalidUri {
        url: url.to_owned(),
        kind: InvalidUriKind::ParseError,
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "https" => {}
        "http" => {
            if security == TransportSecurity::TlsOnly {
                return Err(HttpError::InvalidScheme {
                    scheme: "http".to_owned(),
                    reason: "HTTPS required (transport security is TlsOnly)".to_owned(),
                });
            }
        }
        scheme => {
            return Err(HttpError::InvalidScheme {
                scheme: scheme.to_owned(),
                reason: "only http:// and https:// schemes are supported".to_owned(),
            });
        }
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(HttpError::InvalidUri {
            url: url.to_owned(),
            kind: InvalidUriKind::MissingAuthority,
            reason: "missing host/authority".to_owned(),
        });
    }

    Ok(parsed)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn url_joins_with_single_slash() {
        for (base, path) in [
            ("https://api.example.com/", "/v1/configuration"),
            ("https://api.example.com", "v1/configuration"),
            ("https://api.example.com/", "v1/configuration"),
            ("https://api.example.com", "/v1/configuration"),
        ] {
            let req = HttpRequest::get(path).base_url(base).build().unwrap();
            assert_eq!(req.url(), "https://api.example.com/v1/configuration");
        }
    }

    #[test]
    fn absolute_path_ignores_base() {
        let req = HttpRequest::get("https://other.example.com/x")
            .base_url("https://api.example.com/")
            .build()
            .unwrap();
        assert_eq!(req.url(), "https://other.example.com/x");
    }

    #[test]
    fn absolute_path_scheme_is_case_insensitive() {
        for path in ["HTTPS://other.example.com/x", "Http://other.example.com/x"] {
            let req = HttpRequest::get(path)
                .base_url("https://api.example.com/")
                .build()
                .unwrap();
            assert_eq!(req.url(), path);
        }
        let req = HttpRequest::get("httpsfoo")
            .base_url("https://api.example.com/")
            .build()
            .unwrap();
        assert_eq!(req.url(), "https://api.example.com/httpsfoo");
    }

    #[test]
    fn path_without_base_is_used_verbatim() {
        let req = HttpRequest::get("v1/ping").build().unwrap();
        assert_eq!(req.url(), "v1/ping");
    }

    #[test]
    fn header_replaces_earlier_value() {
        let req = HttpRequest::get("https://api.example.com/")
            .header("x-request-id", "1")
            .header("accept", "text/plain")
            .header("X-Request-Id", "2")
            .build()
            .unwrap();
        assert_eq!(req.headers().len(), 2);
        assert_eq!(req.headers()[0].0, "x-request-id");
        assert_eq!(req.header("x-request-id").unwrap(), "2");
    }

    #[test]
    fn invalid_header_is_deferred_to_build() {
        let err = HttpRequest::get("https://api.example.com/")
            .header("bad header", "v")
            .header("x-ok", "v")
            .build()
            .unwrap_err();
        assert!(matches!(err, HttpError::InvalidHeaderName(_)));

        let err = HttpRequest::get("https://api.example.com/")
            .header("x-bad", "line\nbreak")
            .build()
            .unwrap_err();
        assert!(matches!(err, HttpError::InvalidHeaderValue(_)));
    }

    #[test]
    fn json_sets_content_type_once() {
        let req = HttpRequest::post("https://api.example.com/tokens")
            .json(&serde_json::json!({"number": "4111111111111111"}))
            .build()
            .unwrap();
        assert_eq!(req.header("content-type").unwrap(), "application/json");
        assert_eq!(
            req.body(),
            Some(&RequestBody::Text(r#"{"number":"4111111111111111"}"#.to_owned()))
        );

        let req = HttpRequest::post("https://api.example.com/tokens")
            .header("content-type", "application/vnd.api+json")
            .json(&serde_json::json!({}))
            .build()
            .unwrap();
        assert_eq!(
            req.header("content-type").unwrap(),
            "application/vnd.api+json"
        );
    }

    #[test]
    fn equality_ignores_headers_and_policy() {
        let a = HttpRequest::post("v1/payment_methods")
            .base_url("https://api.example.com")
            .header("authorization", "Bearer a")
            .body("{}")
            .build()
            .unwrap();
        let b = HttpRequest::post("https://api.example.com/v1/payment_methods")
            .with_retries()
            .body("{}")
            .build()
            .unwrap();
        assert_eq!(a, b);

        let c = HttpRequest::put("https://api.example.com/v1/payment_methods")
            .body("{}")
            .build()
            .unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn defaults_do_not_override() {
        let req = HttpRequest::get("ping")
            .base_url("https://a.example.com")
            .header("user-agent", "custom")
            .build()
            .unwrap()
            .with_default_base_url("https://b.example.com")
            .with_default_header(
                http::header::USER_AGENT,
                HeaderValue::from_static("default"),
            );
        assert_eq!(req.url(), "https://a.example.com/ping");
        assert_eq!(req.header("user-agent").unwrap(), "custom");
    }

    #[test]
    fn validate_url_rules() {
        assert!(validate_url("https://api.example.com/x", TransportSecurity::TlsOnly).is_ok());
        assert!(matches!(
            validate_url("http://api.example.com/x", TransportSecurity::TlsOnly),
            Err(HttpError::InvalidScheme { .. })
        ));
        assert!(validate_url("http://127.0.0.1:8080/", TransportSecurity::AllowInsecureHttp).is_ok());
        assert!(matches!(
            validate_url("ftp://example.com/", TransportSecurity::AllowInsecureHttp),
            Err(HttpError::InvalidScheme { .. })
        ));
        assert!(matches!(
            validate_url("v1/configuration", TransportSecurity::TlsOnly),
            Err(HttpError::InvalidUri {
                kind: InvalidUriKind::ParseError,
                ..
            })
        ));
    }

    #[test]
    fn body_helpers() {
        let body = RequestBody::Bytes(Bytes::from_static(b"abc"));
        assert_eq!(body.len(), 3);
        assert!(!body.is_empty());
        assert!(RequestBody::Text(String::new()).is_empty());
    }
}
