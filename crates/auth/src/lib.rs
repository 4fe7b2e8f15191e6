use std::sync::Arc;
use std::time::{Duration, Instant};

use http::HeaderMap;
use http::header;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

/// The claim set of a successfully verified identity token.
///
/// Verification (signature, issuer, audience, expiry) happens before a value
/// of this type exists; consumers only ever read claim values. Immutable and
/// request-scoped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerifiedIdentity {
    claims: Map<String, Value>,
}

impl VerifiedIdentity {
    pub fn from_claims(claims: Map<String, Value>) -> Self {
        Self { claims }
    }

    /// Raw claim value, with JSON `null` treated as absent.
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name).filter(|v| !v.is_null())
    }

    /// Claim rendered as a string: JSON strings as-is, any other non-null
    /// value through its JSON form.
    pub fn claim_string(&self, name: &str) -> Option<String> {
        match self.claim(name)? {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// The token's subject identifier, if any.
    pub fn subject(&self) -> Option<String> {
        self.claim_string("sub")
    }
}

#[derive(Debug, Clone)]
pub struct OidcConfig {
    pub issuer: String,
    pub audience: Option<String>,
    pub jwks_url: Option<String>,
    pub jwks_json: Option<String>,
    pub jwks_timeout: Duration,
    pub jwks_refresh_ttl: Duration,
    pub clock_skew: Duration,
}

#[derive(Debug, Clone)]
pub struct AuthError {
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for AuthError {}

#[derive(Clone)]
pub struct OidcAuthenticator {
    config: OidcConfig,
    http: reqwest::Client,
    jwks: Arc<RwLock<JwksCache>>,
}

#[derive(Debug)]
struct JwksCache {
    jwks: Option<JwkSet>,
    fetched_at: Option<Instant>,
}

impl OidcAuthenticator {
    pub async fn new(config: OidcConfig) -> Result<Self, AuthError> {
        if config.issuer.trim().is_empty() {
            return Err(AuthError {
                code: "ERR_INVALID_CONFIG",
                message: "oidc issuer must be non-empty".to_string(),
            });
        }

        if config.jwks_json.is_none() && config.jwks_url.is_none() {
            return Err(AuthError {
                code: "ERR_INVALID_CONFIG",
                message: "oidc requires jwks_url or jwks_json".to_string(),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(config.jwks_timeout)
            .build()
            .map_err(|_| AuthError {
                code: "ERR_INTERNAL",
                message: "failed to initialize oidc http client".to_string(),
            })?;

        let mut cache = JwksCache {
            jwks: None,
            fetched_at: None,
        };
        cache.refresh(&http, &config).await?;

        Ok(Self {
            config,
            http,
            jwks: Arc::new(RwLock::new(cache)),
        })
    }

    /// Verifies the bearer token in `headers` and returns its claim set.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<VerifiedIdentity, AuthError> {
        let token = bearer_token(headers)?;

        let header = decode_header(&token).map_err(|_| AuthError {
            code: "ERR_AUTH_INVALID",
            message: "invalid JWT header".to_string(),
        })?;

        if header.alg != Algorithm::RS256 {
            return Err(AuthError {
                code: "ERR_AUTH_INVALID",
                message: "unsupported JWT alg (expected RS256)".to_string(),
            });
        }

        let kid = header.kid.ok_or_else(|| AuthError {
            code: "ERR_AUTH_INVALID",
            message: "JWT header missing kid".to_string(),
        })?;

        let decoding_key = self.decoding_key_for_kid(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(std::slice::from_ref(&self.config.issuer));
        if let Some(audience) = self.config.audience.as_ref() {
            validation.set_audience(std::slice::from_ref(audience));
        }
        validation.leeway = self.config.clock_skew.as_secs();

        let decoded =
            decode::<Value>(&token, &decoding_key, &validation).map_err(|_| AuthError {
                code: "ERR_AUTH_INVALID",
                message: "JWT validation failed".to_string(),
            })?;

        let Value::Object(claims) = decoded.claims else {
            return Err(AuthError {
                code: "ERR_AUTH_INVALID",
                message: "JWT claims are not a JSON object".to_string(),
            });
        };

        Ok(VerifiedIdentity::from_claims(claims))
    }

    async fn decoding_key_for_kid(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        {
            let cache = self.jwks.read().await;
            if let Some(jwk) = cache.jwk_for_kid(kid) {
                return DecodingKey::from_jwk(jwk).map_err(|_| AuthError {
                    code: "ERR_AUTH_INVALID",
                    message: "failed to parse JWK decoding key".to_string(),
                });
            }
        }

        // Unknown kid: refresh at most once per TTL, then retry the lookup.
        {
            let mut cache = self.jwks.write().await;
            let refresh_needed = cache
                .fetched_at
                .map(|t| t.elapsed() > self.config.jwks_refresh_ttl)
                .unwrap_or(true);
            if refresh_needed {
                cache.refresh(&self.http, &self.config).await?;
            }

            if let Some(jwk) = cache.jwk_for_kid(kid) {
                return DecodingKey::from_jwk(jwk).map_err(|_| AuthError {
                    code: "ERR_AUTH_INVALID",
                    message: "failed to parse JWK decoding key".to_string(),
                });
            }
        }

        Err(AuthError {
            code: "ERR_AUTH_INVALID",
            message: "JWT kid not found in JWKS".to_string(),
        })
    }
}

impl JwksCache {
    fn jwk_for_kid(&self, kid: &str) -> Option<&jsonwebtoken::jwk::Jwk> {
        self.jwks.as_ref()?.find(kid)
    }

    async fn refresh(
        &mut self,
        http: &reqwest::Client,
        config: &OidcConfig,
    ) -> Result<(), AuthError> {
        let jwks = if let Some(jwks_json) = config.jwks_json.as_ref() {
            serde_json::from_str::<JwkSet>(jwks_json).map_err(|_| AuthError {
                code: "ERR_INVALID_CONFIG",
                message: "GUARD_OIDC_JWKS_JSON is not valid JWKS JSON".to_string(),
            })?
        } else if let Some(url) = config.jwks_url.as_ref() {
            tracing::debug!(url = %url, "refreshing JWKS");
            http.get(url)
                .send()
                .await
                .map_err(|_| AuthError {
                    code: "ERR_AUTH_UNAVAILABLE",
                    message: "failed to fetch JWKS".to_string(),
                })?
                .error_for_status()
                .map_err(|_| AuthError {
                    code: "ERR_AUTH_UNAVAILABLE",
                    message: "JWKS endpoint returned non-success status".to_string(),
                })?
                .json::<JwkSet>()
                .await
                .map_err(|_| AuthError {
                    code: "ERR_AUTH_UNAVAILABLE",
                    message: "failed to parse JWKS JSON".to_string(),
                })?
        } else {
            return Err(AuthError {
                code: "ERR_INVALID_CONFIG",
                message: "oidc requires jwks_url or jwks_json".to_string(),
            });
        };

        self.jwks = Some(jwks);
        self.fetched_at = Some(Instant::now());
        Ok(())
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<String, AuthError> {
    let authz = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AuthError {
            code: "ERR_AUTH_REQUIRED",
            message: "missing Authorization header".to_string(),
        })?;

    let token = authz
        .strip_prefix("Bearer ")
        .or_else(|| authz.strip_prefix("bearer "))
        .ok_or_else(|| AuthError {
            code: "ERR_AUTH_INVALID",
            message: "Authorization must be a Bearer token".to_string(),
        })?;

    if token.trim().is_empty() {
        return Err(AuthError {
            code: "ERR_AUTH_INVALID",
            message: "Bearer token is empty".to_string(),
        });
    }

    Ok(token.to_string())
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;

    use super::*;

    fn identity(json: Value) -> VerifiedIdentity {
        let Value::Object(claims) = json else {
            panic!("test claims must be a JSON object");
        };
        VerifiedIdentity::from_claims(claims)
    }

    #[test]
    fn bearer_token_rejects_missing_header() {
        let headers = HeaderMap::new();
        let err = bearer_token(&headers).unwrap_err();
        assert_eq!(err.code, "ERR_AUTH_REQUIRED");
    }

    #[test]
    fn bearer_token_rejects_non_bearer_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );
        let err = bearer_token(&headers).unwrap_err();
        assert_eq!(err.code, "ERR_AUTH_INVALID");
    }

    #[test]
    fn claim_string_renders_scalars() {
        let id = identity(serde_json::json!({
            "vendorId": "vendor-a",
            "numericVendor": 42,
            "flag": true,
            "nothing": null,
        }));

        assert_eq!(id.claim_string("vendorId").as_deref(), Some("vendor-a"));
        assert_eq!(id.claim_string("numericVendor").as_deref(), Some("42"));
        assert_eq!(id.claim_string("flag").as_deref(), Some("true"));
        assert_eq!(id.claim_string("nothing"), None);
        assert_eq!(id.claim_string("absent"), None);
    }

    #[test]
    fn subject_reads_sub_claim() {
        let id = identity(serde_json::json!({"sub": "auth0|123"}));
        assert_eq!(id.subject().as_deref(), Some("auth0|123"));
        assert_eq!(VerifiedIdentity::default().subject(), None);
    }
}
