use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::jwks::JwksCache;

/// Supabase JWT claims.
///
/// The `sub` field is the user's UUID in `auth.users`; `user_metadata`
/// carries profile info from the OAuth provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The auth user UUID.
    pub sub: String,
    /// Token expiration (Unix timestamp).
    pub exp: usize,
    /// Token issued-at (Unix timestamp).
    pub iat: Option<usize>,
    pub iss: Option<String>,
    pub email: Option<String>,
    /// Auth-provider role (e.g. "authenticated"), not the marketplace role.
    pub role: Option<String>,
    pub user_metadata: Option<UserMetadata>,
}

/// Metadata populated by the OAuth provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserMetadata {
    pub full_name: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Claims {
    /// Extract the user UUID from the `sub` claim.
    pub fn user_id(&self) -> Result<Uuid, String> {
        Uuid::parse_str(&self.sub).map_err(|e| format!("Invalid UUID in sub claim: {e}"))
    }

    /// Best-effort display name from metadata.
    pub fn display_name(&self) -> Option<String> {
        self.user_metadata
            .as_ref()
            .and_then(|m| m.full_name.clone().or_else(|| m.name.clone()))
    }

    /// Best-effort email: prefer top-level, fall back to metadata.
    pub fn user_email(&self) -> Option<String> {
        self.email
            .clone()
            .or_else(|| self.user_metadata.as_ref().and_then(|m| m.email.clone()))
    }

    /// Expiry of the token as a UTC timestamp.
    pub fn expires_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp(self.exp as i64, 0)
    }
}

/// How bearer tokens are verified.
#[derive(Clone)]
pub enum TokenVerifier {
    /// HS256 with the project's shared JWT secret.
    Secret(String),
    /// Asymmetric keys published at the project's JWKS endpoint.
    Jwks(std::sync::Arc<JwksCache>),
}

impl TokenVerifier {
    pub async fn verify(&self, token: &str) -> Result<Claims, String> {
        match self {
            Self::Secret(secret) => validate_token_with_secret(token, secret),
            Self::Jwks(cache) => validate_token(token, cache).await,
        }
    }
}

/// Validate a JWT signed with the shared HS256 secret.
pub fn validate_token_with_secret(token: &str, secret: &str) -> Result<Claims, String> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|td| td.claims)
        .map_err(|e| format!("{:?}", e.kind()))
}

/// Validate a JWT against the cached JWKS and return the decoded claims.
pub async fn validate_token(token: &str, jwks_cache: &JwksCache) -> Result<Claims, String> {
    jwks_cache.validate_token(token).await.map_err(|e| e.to_string())
}
