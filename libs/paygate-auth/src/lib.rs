#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Credentials and authenticated gateway access for the paygate SDK
//!
//! An authorization string is resolved once into a [`Credential`]: a
//! tokenization key, a client token or a universal access token. The
//! resolved credential knows its configuration URL and the value to present
//! to the gateway; [`GatewayClient`] stamps it onto every request sent
//! through a [`paygate_http::AsyncHttpClient`].

// Credential kinds
mod client_token;
mod environment;
mod tokenization_key;
mod universal_access_token;

mod credential;
mod errors;
mod gateway;

pub use client_token::ClientToken;
pub use credential::Credential;
pub use environment::Environment;
pub use errors::CredentialError;
pub use gateway::{CLIENT_KEY_HEADER, CONFIG_VERSION, GatewayClient};
pub use tokenization_key::TokenizationKey;
pub use universal_access_token::UniversalAccessToken;
