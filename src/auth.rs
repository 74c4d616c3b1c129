// src/auth.rs
use crate::core::config_manager::AuthSettings;
use crate::core::database::UserRepository;
use crate::core::Database;
use crate::utils::non_empty;
use anyhow::Result;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use rocket::request::{FromRequest, Outcome};
use rocket::{Request, State};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

/// Identity resolved from a verified session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    pub exp: usize,
    #[serde(default)]
    pub iat: Option<usize>,
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: non_empty(claims.email.as_deref()).map(str::to_string),
            name: non_empty(claims.name.as_deref()).map(str::to_string),
            image_url: non_empty(claims.picture.as_deref()).map(str::to_string),
        }
    }
}

#[derive(Default)]
pub struct AuthConfig {
    hs256_secret: Option<String>,
    signing_keys: HashMap<String, String>, // kid -> public key
    issuer: Option<String>,
    audience: Option<String>,
}

impl AuthConfig {
    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self {
            hs256_secret: settings.hs256_secret.clone(),
            signing_keys: HashMap::new(),
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
        }
    }

    pub fn with_hs256_secret(secret: impl Into<String>) -> Self {
        Self {
            hs256_secret: Some(secret.into()),
            ..Self::default()
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Fetch the provider's RS256 public keys (`{kid: pem}`)
    pub async fn update_signing_keys(&mut self, url: &str) -> Result<()> {
        let response = reqwest::get(url).await?.error_for_status()?;
        let keys: HashMap<String, String> = response.json().await?;

        info!("Updated {} signing keys from {}", keys.len(), url);
        self.signing_keys = keys;
        Ok(())
    }

    /// Verify a session token and resolve the identity it carries
    pub fn verify(&self, token: &str) -> Result<CurrentUser> {
        let header = decode_header(token)?;

        let decoding_key = match header.alg {
            Algorithm::HS256 => {
                let secret = self
                    .hs256_secret
                    .as_ref()
                    .ok_or_else(|| anyhow::anyhow!("HS256 tokens are not accepted"))?;
                DecodingKey::from_secret(secret.as_bytes())
            }
            Algorithm::RS256 => {
                let kid = header
                    .kid
                    .ok_or_else(|| anyhow::anyhow!("Missing kid in token header"))?;
                let public_key = self
                    .signing_keys
                    .get(&kid)
                    .ok_or_else(|| anyhow::anyhow!("Unknown key ID: {}", kid))?;
                DecodingKey::from_rsa_pem(public_key.as_bytes())?
            }
            other => anyhow::bail!("Unsupported token algorithm: {:?}", other),
        };

        let mut validation = Validation::new(header.alg);
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        let token_data = decode::<Claims>(token, &decoding_key, &validation)?;
        if token_data.claims.sub.is_empty() {
            anyhow::bail!("Token has an empty subject");
        }

        Ok(token_data.claims.into())
    }
}

fn bearer_token(header: Option<&str>) -> Option<&str> {
    non_empty(header?.strip_prefix("Bearer ").map(str::trim))
}

/// Identity guard that never fails the request.
///
/// `user` is `None` for anonymous callers; job info operations reject those
/// with the same permission failure as a foreign record.
pub struct OptionalAuth {
    pub user: Option<CurrentUser>,
}

impl OptionalAuth {
    pub fn user(&self) -> Option<&CurrentUser> {
        self.user.as_ref()
    }
}

fn anonymous() -> Outcome<OptionalAuth, ()> {
    Outcome::Success(OptionalAuth { user: None })
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for OptionalAuth {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let auth_config = match req.guard::<&State<AuthConfig>>().await {
            Outcome::Success(config) => config,
            _ => {
                error!("AuthConfig is not managed by the server");
                return anonymous();
            }
        };

        let db = match req.guard::<&State<Database>>().await {
            Outcome::Success(db) => db,
            _ => {
                error!("Database is not managed by the server");
                return anonymous();
            }
        };

        let token = match bearer_token(req.headers().get_one("Authorization")) {
            Some(token) => token,
            None => {
                debug!("Request without bearer token");
                return anonymous();
            }
        };

        let user = match auth_config.verify(token) {
            Ok(user) => user,
            Err(e) => {
                warn!("Token verification failed: {}", e);
                return anonymous();
            }
        };

        let users = UserRepository::new(db.pool());
        if let Err(e) = users
            .upsert(
                &user.id,
                user.email.as_deref(),
                user.name.as_deref(),
                user.image_url.as_deref(),
            )
            .await
        {
            error!("Failed to sync user {}: {:#}", user.id, e);
            return anonymous();
        }

        debug!("User {} authenticated", user.id);
        Outcome::Success(OptionalAuth { user: Some(user) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn claims(sub: &str, exp_offset: i64) -> Claims {
        let now = chrono::Utc::now().timestamp();
        Claims {
            sub: sub.to_string(),
            email: Some("dev@example.com".to_string()),
            name: Some(String::new()),
            picture: None,
            exp: (now + exp_offset) as usize,
            iat: Some(now as usize),
        }
    }

    fn sign(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_verify_hs256_token() {
        let config = AuthConfig::with_hs256_secret(SECRET);
        let user = config.verify(&sign(&claims("user_1", 3600), SECRET)).unwrap();
        assert_eq!(user.id, "user_1");
        assert_eq!(user.email.as_deref(), Some("dev@example.com"));
        assert_eq!(user.name, None);
    }

    #[test]
    fn test_reject_wrong_secret_and_expired_tokens() {
        let config = AuthConfig::with_hs256_secret(SECRET);
        assert!(config.verify(&sign(&claims("user_1", 3600), "other")).is_err());
        assert!(config.verify(&sign(&claims("user_1", -3600), SECRET)).is_err());
        assert!(config.verify("not-a-token").is_err());
    }

    #[test]
    fn test_hs256_disabled_without_secret() {
        let config = AuthConfig::default();
        assert!(config.verify(&sign(&claims("user_1", 3600), SECRET)).is_err());
    }

    #[test]
    fn test_issuer_is_checked_when_configured() {
        let config = AuthConfig::with_hs256_secret(SECRET).with_issuer("https://issuer.example");
        assert!(config.verify(&sign(&claims("user_1", 3600), SECRET)).is_err());
    }

    #[test]
    fn test_empty_subject_rejected() {
        let config = AuthConfig::with_hs256_secret(SECRET);
        assert!(config.verify(&sign(&claims("", 3600), SECRET)).is_err());
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(Some("Bearer ")), None);
        assert_eq!(bearer_token(Some("Basic abc")), None);
        assert_eq!(bearer_token(None), None);
    }
}
