use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde_json::Value;
use tracing::{debug, info};

use crate::claims::Claims;
use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::jwks::JwksFetcher;

/// Process-wide signing key cache. Readers take an immutable snapshot of the
/// map; the refresh path builds a replacement and swaps it in whole, so a
/// concurrent verification never observes a partially updated key set.
#[derive(Clone, Default)]
pub struct KeyStore {
    inner: Arc<RwLock<Arc<HashMap<String, DecodingKey>>>>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<HashMap<String, DecodingKey>> {
        let guard = self.inner.read().expect("rwlock poisoned");
        Arc::clone(&guard)
    }

    pub fn get(&self, kid: &str) -> Option<DecodingKey> {
        self.snapshot().get(kid).cloned()
    }

    pub fn contains(&self, kid: &str) -> bool {
        self.snapshot().contains_key(kid)
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    pub fn insert_key(&self, kid: impl Into<String>, key: DecodingKey) {
        let mut guard = self.inner.write().expect("rwlock poisoned");
        let mut next = (**guard).clone();
        next.insert(kid.into(), key);
        *guard = Arc::new(next);
    }

    pub fn insert_rsa_pem(&self, kid: impl Into<String>, pem: &[u8]) -> AuthResult<()> {
        let kid = kid.into();
        let key = DecodingKey::from_rsa_pem(pem).map_err(|err| {
            AuthError::KeySetUnavailable(format!("invalid PEM for kid '{kid}': {err}"))
        })?;
        self.insert_key(kid, key);
        Ok(())
    }

    pub fn replace_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (String, DecodingKey)>,
    {
        let next: HashMap<String, DecodingKey> = entries.into_iter().collect();
        let mut guard = self.inner.write().expect("rwlock poisoned");
        *guard = Arc::new(next);
    }
}

/// Verifies bearer tokens against the cached key set and the configured
/// issuer/audience. The verifier owns the key cache; tests install fixed
/// keys through [`KeyStore`] and never touch the network.
#[derive(Clone)]
pub struct TokenVerifier {
    config: AuthConfig,
    store: KeyStore,
    jwks: Option<JwksFetcher>,
}

impl TokenVerifier {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            store: KeyStore::new(),
            jwks: None,
        }
    }

    pub fn with_store(config: AuthConfig, store: KeyStore) -> Self {
        Self {
            config,
            store,
            jwks: None,
        }
    }

    pub fn builder(config: AuthConfig) -> TokenVerifierBuilder {
        TokenVerifierBuilder::new(config)
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn store(&self) -> &KeyStore {
        &self.store
    }

    pub fn jwks_fetcher(&self) -> Option<&JwksFetcher> {
        self.jwks.as_ref()
    }

    /// Run signature and claim validation on a raw token.
    ///
    /// An unknown `kid` triggers at most one key-set refresh before the
    /// failure becomes terminal, so freshly rotated provider keys are
    /// picked up without restarting. No lock is held across the fetch.
    pub async fn verify(&self, token: &str) -> AuthResult<Claims> {
        if token.split('.').count() != 3 {
            return Err(AuthError::MalformedToken(
                "expected three dot-separated segments".into(),
            ));
        }

        let header = decode_header(token)
            .map_err(|err| AuthError::MalformedToken(err.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::MalformedToken(format!(
                "unsupported algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| AuthError::MalformedToken("token header missing kid".into()))?;

        let key = match self.store.get(&kid) {
            Some(key) => key,
            None => {
                if self.jwks.is_some() {
                    info!(kid, "signing key not cached, refreshing key set");
                    self.refresh_keys().await?;
                }
                self.store
                    .get(&kid)
                    .ok_or_else(|| AuthError::UnknownSigningKey(kid.clone()))?
            }
        };

        // exp/iss/aud are checked manually below so each violation maps to
        // its own error instead of the library's coarser kinds.
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let token_data =
            decode::<Value>(token, &key, &validation).map_err(map_decode_error)?;
        let claims = Claims::try_from(token_data.claims)?;
        self.validate_claims(&claims)?;

        debug!(kid, "token verified");
        Ok(claims)
    }

    fn validate_claims(&self, claims: &Claims) -> AuthResult<()> {
        // An expiry equal to now is already expired.
        if claims.expires_at <= Utc::now() {
            return Err(AuthError::TokenExpired);
        }
        if claims.issuer != self.config.issuer {
            return Err(AuthError::InvalidIssuer(claims.issuer.clone()));
        }
        if !claims.audience.iter().any(|aud| aud == &self.config.audience) {
            return Err(AuthError::InvalidAudience);
        }
        Ok(())
    }

    /// Swap the cached key set for a freshly fetched one. Returns the number
    /// of keys installed; a verifier without a fetcher is a no-op.
    pub async fn refresh_keys(&self) -> AuthResult<usize> {
        let Some(fetcher) = &self.jwks else {
            return Ok(0);
        };

        let keys = fetcher.fetch().await?;
        let count = keys.len();
        self.store.replace_all(keys);
        info!(count, "signing key set refreshed");
        Ok(count)
    }
}

fn map_decode_error(err: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;
    match err.kind() {
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        _ => AuthError::MalformedToken(err.to_string()),
    }
}

pub struct TokenVerifierBuilder {
    config: AuthConfig,
    store: KeyStore,
    jwks: Option<JwksFetcher>,
}

impl TokenVerifierBuilder {
    fn new(config: AuthConfig) -> Self {
        Self {
            config,
            store: KeyStore::new(),
            jwks: None,
        }
    }

    pub fn with_store(mut self, store: KeyStore) -> Self {
        self.store = store;
        self
    }

    pub fn with_decoding_key(self, kid: impl Into<String>, key: DecodingKey) -> Self {
        self.store.insert_key(kid, key);
        self
    }

    pub fn with_rsa_pem(self, kid: impl Into<String>, pem: &[u8]) -> AuthResult<Self> {
        self.store.insert_rsa_pem(kid, pem)?;
        Ok(self)
    }

    pub fn with_jwks_url(mut self, url: impl Into<String>) -> Self {
        self.jwks = Some(JwksFetcher::new(url));
        self
    }

    pub fn with_jwks_fetcher(mut self, fetcher: JwksFetcher) -> Self {
        self.jwks = Some(fetcher);
        self
    }

    /// Eagerly loads the key set when a fetcher is configured, so startup
    /// fails loudly if the provider is unreachable.
    pub async fn build(self) -> AuthResult<TokenVerifier> {
        let verifier = TokenVerifier {
            config: self.config,
            store: self.store,
            jwks: self.jwks,
        };

        if verifier.jwks.is_some() {
            verifier.refresh_keys().await?;
        }

        Ok(verifier)
    }
}
