use jsonwebtoken::jwk::{AlgorithmParameters, JwkSet};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use moka::future::Cache;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use super::jwt::Claims;

#[derive(Debug, Error)]
pub enum JwksError {
    #[error("could not load signing keys: {0}")]
    Fetch(String),

    #[error("token header has no key id")]
    MissingKid,

    #[error("no signing key with kid={0}")]
    UnknownKey(String),

    #[error("{0:?} is not accepted for this key")]
    AlgorithmMismatch(Algorithm),

    #[error("invalid token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

/// Verifies asymmetric tokens against a project's published key set.
///
/// The whole set is cached under its URL. A token naming a key the cached set
/// does not know triggers one refetch, which picks up rotated keys.
pub struct JwksCache {
    sets: Cache<String, Arc<JwkSet>>,
    jwks_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl JwksCache {
    pub fn new(jwks_url: impl Into<String>, api_key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            sets: Cache::builder().time_to_live(ttl).max_capacity(1).build(),
            jwks_url: jwks_url.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Key set of a Supabase project, given its URL (`https://<ref>.supabase.co`).
    pub fn for_supabase(project_url: &str, anon_key: &str, ttl: Duration) -> Option<Self> {
        let jwks_url = supabase_jwks_url(project_url)?;
        Some(Self::new(jwks_url, anon_key, ttl))
    }

    async fn fetch(&self) -> Result<JwkSet, JwksError> {
        debug!(url = %self.jwks_url, "fetching JWKS");

        let response = self
            .client
            .get(&self.jwks_url)
            .header("apikey", &self.api_key)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| JwksError::Fetch(e.to_string()))?;

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| JwksError::Fetch(e.to_string()))
    }

    async fn current_set(&self) -> Result<Arc<JwkSet>, JwksError> {
        self.sets
            .try_get_with(self.jwks_url.clone(), async { self.fetch().await.map(Arc::new) })
            .await
            .map_err(|e| JwksError::Fetch(e.to_string()))
    }

    async fn key_for(&self, kid: &str, alg: Algorithm) -> Result<DecodingKey, JwksError> {
        let set = self.current_set().await?;
        if let Some(key) = decoding_key(&set, kid, alg)? {
            return Ok(key);
        }

        warn!(%kid, "signing key not in cached JWKS, refetching");
        self.sets.invalidate(&self.jwks_url).await;
        let set = self.current_set().await?;
        decoding_key(&set, kid, alg)?.ok_or_else(|| JwksError::UnknownKey(kid.to_string()))
    }

    pub async fn validate_token(&self, token: &str) -> Result<Claims, JwksError> {
        let header = decode_header(token)?;
        let kid = header.kid.ok_or(JwksError::MissingKid)?;
        let key = self.key_for(&kid, header.alg).await?;

        let mut validation = Validation::new(header.alg);
        validation.validate_aud = false;

        Ok(decode::<Claims>(token, &key, &validation)?.claims)
    }
}

fn supabase_jwks_url(project_url: &str) -> Option<String> {
    let project_ref = project_url
        .trim_end_matches('/')
        .strip_prefix("https://")?
        .strip_suffix(".supabase.co")?;
    if project_ref.is_empty() || project_ref.contains('/') {
        return None;
    }
    Some(format!(
        "https://{project_ref}.supabase.co/auth/v1/.well-known/jwks.json"
    ))
}

/// Decoding key for `kid`, if the set has it and it may sign with `alg`.
///
/// Symmetric keys are never taken from a published set.
fn decoding_key(
    set: &JwkSet,
    kid: &str,
    alg: Algorithm,
) -> Result<Option<DecodingKey>, JwksError> {
    let Some(jwk) = set.find(kid) else {
        return Ok(None);
    };

    let family_ok = match &jwk.algorithm {
        AlgorithmParameters::EllipticCurve(_) => {
            matches!(alg, Algorithm::ES256 | Algorithm::ES384)
        }
        AlgorithmParameters::RSA(_) => matches!(
            alg,
            Algorithm::RS256
                | Algorithm::RS384
                | Algorithm::RS512
                | Algorithm::PS256
                | Algorithm::PS384
                | Algorithm::PS512
        ),
        AlgorithmParameters::OctetKeyPair(_) => alg == Algorithm::EdDSA,
        AlgorithmParameters::OctetKey(_) => false,
    };
    let declared_ok = jwk
        .common
        .key_algorithm
        .map(|declared| Algorithm::from_str(&declared.to_string()).ok() == Some(alg))
        .unwrap_or(true);

    if !family_ok || !declared_ok {
        return Err(JwksError::AlgorithmMismatch(alg));
    }

    Ok(Some(DecodingKey::from_jwk(jwk)?))
}
