use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::error::{AuthError, AuthResult};

/// Claims decoded from a token whose signature has already been verified.
/// Produced only by the verifier; never built from unverified input.
#[derive(Debug, Clone)]
pub struct Claims {
    pub subject: Option<String>,
    pub issuer: String,
    pub audience: Vec<String>,
    pub expires_at: DateTime<Utc>,
    pub issued_at: Option<DateTime<Utc>>,
    /// Permission scopes granted to the caller. `None` means the issuer did
    /// not embed a permissions claim at all, which is distinct from an
    /// empty grant.
    pub permissions: Option<Vec<String>>,
    pub raw: serde_json::Value,
}

impl Claims {
    /// Exact string-set membership; no wildcard or prefix matching.
    pub fn has_permission(&self, scope: &str) -> bool {
        self.permissions
            .as_ref()
            .is_some_and(|perms| perms.iter().any(|p| p == scope))
    }
}

#[derive(Debug, Deserialize)]
struct ClaimsRepr {
    #[serde(default)]
    sub: Option<String>,
    iss: String,
    #[serde(default)]
    aud: Option<AudienceRepr>,
    exp: i64,
    #[serde(default)]
    iat: Option<i64>,
    #[serde(default)]
    permissions: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AudienceRepr {
    Single(String),
    Many(Vec<String>),
}

impl TryFrom<ClaimsRepr> for Claims {
    type Error = AuthError;

    fn try_from(value: ClaimsRepr) -> AuthResult<Self> {
        let expires_at = Utc
            .timestamp_opt(value.exp, 0)
            .single()
            .ok_or_else(|| AuthError::MalformedToken(format!("exp out of range: {}", value.exp)))?;

        let issued_at = match value.iat {
            Some(iat) => Some(
                Utc.timestamp_opt(iat, 0)
                    .single()
                    .ok_or_else(|| AuthError::MalformedToken(format!("iat out of range: {iat}")))?,
            ),
            None => None,
        };

        let audience = match value.aud {
            Some(AudienceRepr::Single(item)) => vec![item],
            Some(AudienceRepr::Many(items)) => items,
            None => Vec::new(),
        };

        Ok(Self {
            subject: value.sub,
            issuer: value.iss,
            audience,
            expires_at,
            issued_at,
            permissions: value.permissions,
            raw: serde_json::Value::Null,
        })
    }
}

impl TryFrom<serde_json::Value> for Claims {
    type Error = AuthError;

    fn try_from(value: serde_json::Value) -> AuthResult<Self> {
        let repr: ClaimsRepr = serde_json::from_value(value.clone())
            .map_err(|err| AuthError::MalformedToken(err.to_string()))?;
        let mut claims = Claims::try_from(repr)?;
        claims.raw = value;
        Ok(claims)
    }
}
