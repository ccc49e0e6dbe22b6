//! Shared fixtures for unit tests: RSA key material and signed tokens.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey, LineEnding};
use rsa::rand_core::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde_json::{json, Value};

pub struct KeyMaterial {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub modulus: String,
    pub exponent: String,
}

pub fn generate_key_material() -> KeyMaterial {
    let mut rng = OsRng;
    let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("key generation");
    let public_key = private_key.to_public_key();

    let private_pem = private_key
        .to_pkcs1_pem(LineEnding::LF)
        .expect("private pem");
    let public_pem = public_key.to_pkcs1_pem(LineEnding::LF).expect("public pem");

    let encoding = EncodingKey::from_rsa_pem(private_pem.as_bytes()).expect("encoding key");
    let decoding = DecodingKey::from_rsa_pem(public_pem.as_bytes()).expect("decoding key");
    let modulus = URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be());
    let exponent = URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be());

    KeyMaterial {
        encoding,
        decoding,
        modulus,
        exponent,
    }
}

pub fn sign_token(encoding: &EncodingKey, kid: &str, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    encode(&header, claims, encoding).expect("sign token")
}

/// Payload valid for ten minutes against the given issuer/audience.
pub fn base_claims(issuer: &str, audience: &str, permissions: Option<&[&str]>) -> Value {
    let now = Utc::now().timestamp();
    let mut claims = json!({
        "sub": "auth0|tester",
        "iss": issuer,
        "aud": audience,
        "iat": now,
        "exp": now + 600,
    });
    if let Some(perms) = permissions {
        claims["permissions"] = json!(perms);
    }
    claims
}
