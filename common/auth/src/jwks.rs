use std::time::Duration;

use jsonwebtoken::DecodingKey;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{AuthError, AuthResult};

/// Bound on the key-set fetch so a provider outage cannot hang requests
/// waiting on a rotation-triggered refresh.
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Fetches the provider's JWKS document and converts its RSA entries into
/// decoding keys. Every failure here is a system fault, not a credential
/// fault, and maps to `KeySetUnavailable`.
#[derive(Clone)]
pub struct JwksFetcher {
    client: Client,
    url: String,
}

impl JwksFetcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch(&self) -> AuthResult<Vec<(String, DecodingKey)>> {
        let response = self
            .client
            .get(&self.url)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .map_err(|err| AuthError::KeySetUnavailable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::KeySetUnavailable(format!(
                "HTTP {} from {}",
                response.status(),
                self.url
            )));
        }

        let body: JwksResponse = response
            .json()
            .await
            .map_err(|err| AuthError::KeySetUnavailable(err.to_string()))?;

        let mut keys = Vec::new();
        for key in body.keys.into_iter() {
            let kid = key
                .kid
                .ok_or_else(|| AuthError::KeySetUnavailable("JWKS entry missing kid".into()))?;
            let kty = key.kty.unwrap_or_else(|| "RSA".to_string());
            if kty != "RSA" {
                return Err(AuthError::KeySetUnavailable(format!(
                    "JWKS key '{kid}' uses unsupported key type '{kty}'"
                )));
            }

            if let Some(alg) = key.alg {
                if alg != "RS256" {
                    return Err(AuthError::KeySetUnavailable(format!(
                        "JWKS key '{kid}' uses unsupported alg '{alg}'"
                    )));
                }
            }

            let modulus = key.n.ok_or_else(|| {
                AuthError::KeySetUnavailable(format!("JWKS key '{kid}' missing RSA modulus"))
            })?;
            let exponent = key.e.ok_or_else(|| {
                AuthError::KeySetUnavailable(format!("JWKS key '{kid}' missing RSA exponent"))
            })?;

            let decoding_key = DecodingKey::from_rsa_components(&modulus, &exponent)
                .map_err(|err| {
                    AuthError::KeySetUnavailable(format!("JWKS key '{kid}' unparseable: {err}"))
                })?;
            keys.push((kid, decoding_key));
        }

        Ok(keys)
    }
}

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<JwkEntry>,
}

#[derive(Debug, Deserialize)]
struct JwkEntry {
    kid: Option<String>,
    kty: Option<String>,
    alg: Option<String>,
    n: Option<String>,
    e: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::generate_key_material;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn fetch_parses_rsa_entries() {
        let material = generate_key_material();
        let server = MockServer::start();
        let body = serde_json::json!({
            "keys": [
                {
                    "kid": "rotation-1",
                    "kty": "RSA",
                    "alg": "RS256",
                    "n": material.modulus,
                    "e": material.exponent
                }
            ]
        });
        server.mock(|when, then| {
            when.method(GET).path("/.well-known/jwks.json");
            then.status(200)
                .header("content-type", "application/json")
                .body(body.to_string());
        });

        let fetcher = JwksFetcher::new(format!("{}/.well-known/jwks.json", server.base_url()));
        let keys = fetcher.fetch().await.expect("fetch succeeds");
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].0, "rotation-1");
    }

    #[tokio::test]
    async fn fetch_failure_is_key_set_unavailable() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/.well-known/jwks.json");
            then.status(503);
        });

        let fetcher = JwksFetcher::new(format!("{}/.well-known/jwks.json", server.base_url()));
        let err = fetcher.fetch().await.err().expect("fetch fails");
        assert!(matches!(err, AuthError::KeySetUnavailable(_)));
    }

    #[tokio::test]
    async fn entry_without_kid_is_rejected() {
        let server = MockServer::start();
        let body = serde_json::json!({
            "keys": [{"kty": "RSA", "n": "AQAB", "e": "AQAB"}]
        });
        server.mock(|when, then| {
            when.method(GET).path("/.well-known/jwks.json");
            then.status(200)
                .header("content-type", "application/json")
                .body(body.to_string());
        });

        let fetcher = JwksFetcher::new(format!("{}/.well-known/jwks.json", server.base_url()));
        let err = fetcher.fetch().await.err().expect("missing kid");
        assert!(matches!(err, AuthError::KeySetUnavailable(_)));
    }
}
