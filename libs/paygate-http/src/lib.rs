#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! HTTP execution layer for the paygate SDK
//!
//! This crate provides:
//! - A secure transport factory pinning every connection to one TLS version
//! - A blocking request executor with pluggable success-body parsers
//! - Status-code classification into a closed error taxonomy, including
//!   structured 422 field errors
//! - A callback-based client with bounded, immediate retry on top of an
//!   injectable two-context scheduler
//!
//! # Example
//!
//! ```ignore
//! use paygate_http::{AsyncHttpClient, HttpRequest, RetryPolicy};
//!
//! let client = AsyncHttpClient::builder()
//!     .base_url("https://api.sandbox.braintreegateway.com/")
//!     .build()?;
//!
//! let request = HttpRequest::get("merchants/abc/client_api/v1/configuration")
//!     .header("authorization", "Bearer ...")
//!     .retry_policy(RetryPolicy::bounded())
//!     .build()?;
//!
//! client.send_request(request, Some(Box::new(|outcome| match outcome {
//!     Ok(body) => println!("{body}"),
//!     Err(err) => eprintln!("{:?}: {err}", err.kind()),
//! })));
//! ```

mod builder;
mod classify;
mod client;
mod config;
mod error;
mod executor;
mod parser;
mod request;
pub mod scheduler;
pub mod security;
mod tls;
mod validation;

pub use builder::HttpClientBuilder;
pub use classify::{RATE_LIMIT_MESSAGE, SUCCESS_STATUSES, classify, is_success};
pub use client::{AsyncHttpClient, HttpCallback, HttpOutcome};
pub use config::{
    CONFIG_SECTION, ConfigError, DEFAULT_MAX_ATTEMPTS, DEFAULT_USER_AGENT, ENV_PREFIX,
    HttpClientConfig, RetryPolicy, TlsRootConfig, TlsVersion, TransportSecurity,
};
pub use error::{ErrorKind, HttpError, InvalidUriKind};
pub use executor::{RequestExecutor, SyncRequestExecutor};
pub use parser::{JsonPointerParser, RawBodyParser, ResponseParser};
pub use request::{HttpMethod, HttpRequest, RequestBody, RequestBuilder};
pub use scheduler::{ExecutionContext, ManualScheduler, Scheduler, Task, ThreadPoolScheduler};
pub use tls::{SecureTransportFactory, TlsHandle, default_crypto_provider, native_root_certs};
pub use validation::{FieldError, PARSING_FAILED_MESSAGE, ValidationError};
