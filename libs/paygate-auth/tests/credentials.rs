#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Resolution properties that hold across every credential kind.

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use paygate_auth::{Credential, CredentialError, Environment, TokenizationKey};
use serde_json::json;

fn client_token() -> String {
    STANDARD.encode(
        json!({
            "version": 2,
            "configUrl": "https://api.sandbox.braintreegateway.com:443/merchants/integration_merchant_id/client_api/v1/configuration",
            "authorizationFingerprint": "a1b2c3|created_at=2024-05-01T00:00:00Z&customer_id=42&merchant_id=integration_merchant_id"
        })
        .to_string(),
    )
}

fn universal_access_token() -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"ES256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        json!({
            "iss": "https://api.sandbox.paypal.com",
            "sub": "PayPal:partner",
            "external_id": ["PayPal:partner", "Braintree:integration_merchant_id"]
        })
        .to_string(),
    );
    format!("{header}.{payload}.c2lnbmF0dXJl")
}

#[test]
fn tokenization_key_configuration_url_per_environment() {
    for env in Environment::ALL {
        let raw = format!("{}_x7k2_merchant9", env.name());
        let key = TokenizationKey::parse(&raw).unwrap();
        assert_eq!(key.environment(), env);
        assert_eq!(
            key.configuration_url(),
            format!(
                "{}merchants/merchant9/client_api/v1/configuration",
                env.base_url()
            )
        );
    }
}

#[test]
fn merchant_id_may_contain_underscores() {
    let key = TokenizationKey::parse("sandbox_abc_merchant_with_parts").unwrap();
    assert_eq!(key.merchant_id(), "merchant_with_parts");
}

#[test]
fn strings_outside_every_grammar_are_rejected() {
    for raw in [
        "sandbox",
        "sandbox_onlytwo",
        "sandbox__merchant",
        "sandbox_abc_",
        "sand box_abc_merchant",
        "not-a-key",
        "e30=",
    ] {
        assert!(
            Credential::resolve(raw).is_err(),
            "{raw:?} should not resolve"
        );
    }
}

#[test]
fn unknown_environment_is_rejected() {
    assert_eq!(
        Credential::resolve("staging_abc_merchant").unwrap_err(),
        CredentialError::UnknownEnvironment("staging".to_owned())
    );
}

#[test]
fn empty_authorization_is_rejected() {
    assert_eq!(Credential::resolve("").unwrap_err(), CredentialError::Empty);
}

#[test]
fn resolving_the_exposed_string_yields_an_equal_credential() {
    for raw in [
        "production_s3cr3t_merchant".to_owned(),
        client_token(),
        universal_access_token(),
    ] {
        let first = Credential::resolve(&raw).unwrap();
        assert_eq!(first.expose_raw(), raw);
        let second = Credential::resolve(first.expose_raw()).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn resolution_is_idempotent() {
    let raw = client_token();
    let a: Credential = raw.parse().unwrap();
    let b: Credential = raw.parse().unwrap();
    assert_eq!(a, b);
    assert_eq!(a.kind_name(), "client_token");
    assert_eq!(a.as_client_token().unwrap().customer_id(), Some("42"));
}

#[test]
fn every_kind_points_at_the_same_merchant_configuration() {
    let tk = Credential::resolve("sandbox_abc_integration_merchant_id").unwrap();
    let uat = Credential::resolve(&universal_access_token()).unwrap();
    assert_eq!(tk.configuration_url(), uat.configuration_url());
    assert_eq!(tk.client_api_url(), uat.client_api_url());
    assert_eq!(
        tk.client_api_url(),
        "https://api.sandbox.braintreegateway.com/merchants/integration_merchant_id/client_api/"
    );
}

#[test]
fn client_token_missing_fingerprint_value_is_rejected() {
    let raw = STANDARD.encode(
        json!({"configUrl": "https://x.example/v1/configuration", "authorizationFingerprint": ""})
            .to_string(),
    );
    assert_eq!(
        Credential::resolve(&raw).unwrap_err(),
        CredentialError::MissingField("authorizationFingerprint")
    );
}
