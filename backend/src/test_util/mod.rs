//! Fixtures shared by unit and integration tests.

pub mod mock_gemini;

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

use crate::config::{
    Config, CorsConfig, DatabaseConfig, GeminiConfig, IdentityConfig, LoggingConfig, ServerConfig,
};

/// Key id of the embedded signing key.
pub const TEST_KID: &str = "test-key";

const TEST_KEY_PEM: &str = include_str!("test_key.pem");

/// RSA public components of `test_key.pem`, base64url encoded.
pub const TEST_KEY_MODULUS: &str = "3rK2At4JsNHWddJk6m1jK6mptsd5jakT0HZzuW-_8O32hGqOPoyR3fY--QnY1qqOLZE9DDmW6W77ydeNs4D9Y-xUq42_BvylM4EFs6NIscm_L9C8ia9oDRNOcmb9C6fGx6dxlWGdbQs2eeC9NHEDIoaykjPNwHHwKD-gPAWDLgK7lWh-mRs-po8CKIOpa7IpAGTC1eZbTSU539NGEvBImDhKRvtFCsK0iNu-s-P1vOf7gRUZy-ho4fOIaSfUf5oUsE4qVliXvGC7CnyBDD3MKV6U8EAoO0gF6GVn5i652xSKSfrCTTcXfIn_gxlWaewivf1oNNOJrlvDrAPD17ISNQ";
pub const TEST_KEY_EXPONENT: &str = "AQAB";

/// Configuration pointing every upstream at `mock_uri`.
///
/// The identity issuer doubles as the OIDC discovery host, so a single mock
/// server can answer discovery, JWKS, identity and generation calls.
pub fn test_config(mock_uri: &str) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
        },
        gemini: GeminiConfig {
            base_url: mock_uri.to_string(),
            model: "test-model".to_string(),
            api_key: "test-gemini-key".to_string(),
            timeout_secs: 5,
        },
        identity: IdentityConfig {
            issuer: mock_uri.to_string(),
            audience: None,
            jwks_url: None,
            base_url: mock_uri.to_string(),
            api_key: Some("test-identity-key".to_string()),
        },
        database: DatabaseConfig {
            url: ":memory:".to_string(),
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
        cors: CorsConfig {
            origins: "*".to_string(),
        },
    }
}

/// Body for `/.well-known/openid-configuration`.
pub fn discovery_json(mock_uri: &str) -> Value {
    json!({
        "issuer": mock_uri,
        "jwks_uri": format!("{}/.well-known/jwks.json", mock_uri),
    })
}

/// Body for the JWKS endpoint, publishing the embedded test key.
pub fn jwks_json() -> Value {
    json!({
        "keys": [{
            "kid": TEST_KID,
            "kty": "RSA",
            "alg": "RS256",
            "use": "sig",
            "n": TEST_KEY_MODULUS,
            "e": TEST_KEY_EXPONENT
        }]
    })
}

#[derive(serde::Serialize)]
struct TestClaims {
    sub: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    iss: String,
    aud: String,
    exp: i64,
    iat: i64,
}

fn sign(claims: &TestClaims, kid: &str) -> String {
    let key = EncodingKey::from_rsa_pem(TEST_KEY_PEM.as_bytes()).expect("Invalid test key");
    let header = Header {
        alg: Algorithm::RS256,
        kid: Some(kid.to_string()),
        ..Default::default()
    };

    encode(&header, claims, &key).expect("Failed to encode JWT")
}

pub fn generate_test_jwt(uid: &str, email: Option<&str>, issuer: &str) -> String {
    let now = Utc::now();
    let claims = TestClaims {
        sub: uid.to_string(),
        email: email.map(String::from),
        iss: issuer.to_string(),
        aud: "test-project".to_string(),
        exp: (now + Duration::hours(1)).timestamp(),
        iat: now.timestamp(),
    };

    sign(&claims, TEST_KID)
}

pub fn generate_expired_jwt(uid: &str, issuer: &str) -> String {
    let now = Utc::now();
    let claims = TestClaims {
        sub: uid.to_string(),
        email: None,
        iss: issuer.to_string(),
        aud: "test-project".to_string(),
        exp: (now - Duration::hours(1)).timestamp(),
        iat: (now - Duration::hours(2)).timestamp(),
    };

    sign(&claims, TEST_KID)
}

/// A correctly signed token whose key id the provider does not publish.
pub fn generate_unknown_kid_jwt(uid: &str, issuer: &str) -> String {
    let now = Utc::now();
    let claims = TestClaims {
        sub: uid.to_string(),
        email: None,
        iss: issuer.to_string(),
        aud: "test-project".to_string(),
        exp: (now + Duration::hours(1)).timestamp(),
        iat: now.timestamp(),
    };

    sign(&claims, "rotated-away")
}
