/// Runtime configuration for token verification.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Expected issuer claim (iss), compared for exact equality.
    pub issuer: String,
    /// API identifier the audience claim (aud) must contain.
    pub audience: String,
}

impl AuthConfig {
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }

    /// Derive the expected issuer from an identity-provider domain. The
    /// provider issues tokens with a trailing slash on the issuer URL.
    pub fn for_domain(domain: &str, audience: impl Into<String>) -> Self {
        Self {
            issuer: format!("https://{domain}/"),
            audience: audience.into(),
        }
    }
}

/// Well-known JWKS endpoint under an identity-provider domain.
pub fn well_known_jwks_url(domain: &str) -> String {
    format!("https://{domain}/.well-known/jwks.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_domain_builds_issuer_with_trailing_slash() {
        let config = AuthConfig::for_domain("tenant.example.auth0.com", "drinks-api");
        assert_eq!(config.issuer, "https://tenant.example.auth0.com/");
        assert_eq!(config.audience, "drinks-api");
    }

    #[test]
    fn well_known_url_points_at_jwks_document() {
        assert_eq!(
            well_known_jwks_url("tenant.example.auth0.com"),
            "https://tenant.example.auth0.com/.well-known/jwks.json"
        );
    }
}
