//! Secure transport factory.
//!
//! Produces a shareable [`TlsHandle`] whose rustls configuration accepts
//! exactly one protocol version, whatever the crypto provider would enable
//! by default. If the provider cannot speak that version the factory fails
//! with [`HttpError::TransportInitialization`], which callers surface as
//! "this device cannot transact securely" rather than as a network error.

use crate::config::{TlsRootConfig, TlsVersion};
use crate::error::HttpError;
use rustls_pki_types::CertificateDer;
use rustls_pki_types::pem::PemObject;
use std::io::Read;
use std::sync::{Arc, OnceLock};

/// Cached native root certificates.
/// Always stores Ok; empty vec means no certs found (warned, not errored).
static NATIVE_ROOTS_CACHE: OnceLock<Vec<CertificateDer<'static>>> = OnceLock::new();

fn load_native_certs_inner() -> Vec<CertificateDer<'static>> {
    let result = rustls_native_certs::load_native_certs();

    for err in &result.errors {
        tracing::warn!(error = %err, "error loading native root certificate");
    }

    if result.certs.is_empty() {
        tracing::warn!("no native root CA certificates found");
    } else {
        tracing::debug!(count = result.certs.len(), "loaded native root certificates");
    }

    result.certs
}

/// Native root certificates, loaded from the OS store once per process.
#[must_use]
pub fn native_root_certs() -> &'static [CertificateDer<'static>] {
    NATIVE_ROOTS_CACHE
        .get_or_init(load_native_certs_inner)
        .as_slice()
}

/// Crypto provider for TLS connections.
///
/// Uses the process-wide default when the host application installed one,
/// otherwise a fresh aws-lc-rs provider (never installed globally).
#[must_use]
pub fn default_crypto_provider() -> Arc<rustls::crypto::CryptoProvider> {
    rustls::crypto::CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
}

fn init_error(message: impl Into<String>) -> HttpError {
    HttpError::TransportInitialization(message.into().into())
}

/// Where trust anchors come from.
#[derive(Clone, Debug)]
enum TrustSource {
    Roots(TlsRootConfig),
    Pinned(Vec<CertificateDer<'static>>),
}

/// Builds [`TlsHandle`]s restricted to a single TLS version.
#[derive(Clone, Debug)]
pub struct SecureTransportFactory {
    version: TlsVersion,
    trust: TrustSource,
    provider: Option<Arc<rustls::crypto::CryptoProvider>>,
}

impl SecureTransportFactory {
    #[must_use]
    pub fn new(version: TlsVersion) -> Self {
        Self {
            version,
            trust: TrustSource::Roots(TlsRootConfig::default()),
            provider: None,
        }
    }

    /// Trust the bundled or OS root store.
    #[must_use]
    pub fn with_roots(mut self, roots: TlsRootConfig) -> Self {
        self.trust = TrustSource::Roots(roots);
        self
    }

    /// Trust only the certificates in a PEM stream.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::TransportInitialization`] if the stream cannot be
    /// read or contains no certificate.
    pub fn with_trust_anchor(mut self, pem: impl Read) -> Result<Self, HttpError> {
        let certs = CertificateDer::pem_reader_iter(pem)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| HttpError::TransportInitialization(Box::new(e)))?;
        if certs.is_empty() {
            return Err(init_error("trust anchor stream contains no certificates"));
        }
        self.trust = TrustSource::Pinned(certs);
        Ok(self)
    }

    /// Use a specific crypto provider instead of [`default_crypto_provider`].
    #[must_use]
    pub fn with_crypto_provider(mut self, provider: Arc<rustls::crypto::CryptoProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Build a handle.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::TransportInitialization`] if the crypto provider
    /// does not support the configured version, or if no usable trust anchor
    /// is available.
    pub fn create(&self) -> Result<TlsHandle, HttpError> {
        let provider = self.provider.clone().unwrap_or_else(default_crypto_provider);

        let builder = rustls::ClientConfig::builder_with_provider(provider)
            .with_protocol_versions(&[self.version.as_rustls()])
            .map_err(|e| {
                tracing::error!(version = ?self.version, error = %e, "required TLS version unsupported");
                HttpError::TransportInitialization(Box::new(e))
            })?;

        let roots = self.root_store()?;
        let config = builder.with_root_certificates(roots).with_no_client_auth();

        tracing::debug!(version = ?self.version, "secure transport ready");
        Ok(TlsHandle {
            config: Arc::new(config),
            version: self.version,
        })
    }

    fn root_store(&self) -> Result<rustls::RootCertStore, HttpError> {
        let mut store = rustls::RootCertStore::empty();
        match &self.trust {
            TrustSource::Roots(TlsRootConfig::WebPki) => {
                store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            }
            TrustSource::Roots(TlsRootConfig::Native) => {
                let certs = native_root_certs();
                if certs.is_empty() {
                    return Err(init_error(
                        "no native root CA certificates found in OS certificate store",
                    ));
                }
                add_parsable(&mut store, certs, "native root")?;
            }
            TrustSource::Pinned(certs) => {
                add_parsable(&mut store, certs, "pinned trust anchor")?;
            }
        }
        Ok(store)
    }
}

impl Default for SecureTransportFactory {
    fn default() -> Self {
        Self::new(TlsVersion::default())
    }
}

fn add_parsable(
    store: &mut rustls::RootCertStore,
    certs: &[CertificateDer<'static>],
    what: &str,
) -> Result<(), HttpError> {
    let (added, ignored) = store.add_parsable_certificates(certs.iter().cloned());
    if ignored > 0 {
        tracing::warn!(added, ignored, "some {what} certificates could not be parsed");
    }
    if added == 0 {
        return Err(init_error(format!(
            "no valid {what} certificates (found {}, all failed to parse)",
            certs.len()
        )));
    }
    Ok(())
}

/// Immutable TLS configuration shared by every connection of a client.
#[derive(Clone, Debug)]
pub struct TlsHandle {
    config: Arc<rustls::ClientConfig>,
    version: TlsVersion,
}

impl TlsHandle {
    /// The only protocol version this handle negotiates.
    #[must_use]
    pub fn protocol_version(&self) -> TlsVersion {
        self.version
    }

    #[must_use]
    pub fn client_config(&self) -> Arc<rustls::ClientConfig> {
        Arc::clone(&self.config)
    }
}
