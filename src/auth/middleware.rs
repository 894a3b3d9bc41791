use actix_web::FromRequest;
use actix_web::{Error, HttpRequest, dev::Payload, web};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use moka::future::Cache;
use sea_orm::DatabaseConnection;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::auth::caller::Caller;
use crate::auth::jwt::TokenVerifier;
use crate::db::users::find_or_create_from_auth;
use crate::error::EngineError;
use crate::models::users::{CreateUserFromAuth, Role};

/// Resolves bearer tokens to `Caller` capabilities.
///
/// Roles are looked up in the `users` table and cached for `role_ttl`; the
/// resulting capability expires no later than the cache entry it was built
/// from, so a role change is picked up at the next refresh boundary.
#[derive(Clone)]
pub struct IdentityGate {
    verifier: TokenVerifier,
    roles: Cache<uuid::Uuid, Role>,
    role_ttl: Duration,
}

impl IdentityGate {
    pub fn new(verifier: TokenVerifier, role_ttl: Duration) -> Self {
        let roles = Cache::builder()
            .time_to_live(role_ttl)
            .max_capacity(10_000)
            .build();

        Self {
            verifier,
            roles,
            role_ttl,
        }
    }

    pub async fn resolve(&self, db: &DatabaseConnection, token: &str) -> Result<Caller, EngineError> {
        let claims = self
            .verifier
            .verify(token)
            .await
            .map_err(|e| EngineError::Unauthenticated(format!("Invalid token: {e}")))?;

        let user_id = claims.user_id().map_err(EngineError::Unauthenticated)?;

        let role = match self.roles.get(&user_id).await {
            Some(role) => role,
            None => {
                let email = claims.user_email().ok_or_else(|| {
                    EngineError::Unauthenticated("No email in token claims".to_string())
                })?;

                let user = find_or_create_from_auth(
                    db,
                    CreateUserFromAuth {
                        id: user_id,
                        email,
                        display_name: claims.display_name(),
                        role: Role::Customer, // default role for new users
                    },
                )
                .await?;

                self.roles.insert(user_id, user.role).await;
                user.role
            }
        };

        let ttl = chrono::Duration::from_std(self.role_ttl)
            .map_err(|e| EngineError::Internal(format!("Invalid role TTL: {e}")))?;
        let mut caller = Caller::new(user_id, role, ttl);
        if let Some(token_expiry) = claims.expires_at() {
            caller.expires_at = caller.expires_at.min(token_expiry);
        }

        Ok(caller)
    }

    /// Drop the cached role of a user (after a profile change).
    pub async fn forget(&self, user_id: uuid::Uuid) {
        self.roles.invalidate(&user_id).await;
    }
}

/// Extractor for the authenticated caller of a request.
pub struct AuthenticatedUser(pub Caller);

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            // 1. Extract the Bearer token from the Authorization header.
            let bearer = BearerAuth::extract(&req).await.map_err(|_| {
                actix_web::error::ErrorUnauthorized("Authorization header must be: Bearer <token>")
            })?;

            // 2. Get the identity gate and database from app data.
            let gate = req.app_data::<web::Data<IdentityGate>>().ok_or_else(|| {
                actix_web::error::ErrorInternalServerError("Identity gate not configured")
            })?;
            let db = req
                .app_data::<web::Data<DatabaseConnection>>()
                .ok_or_else(|| {
                    actix_web::error::ErrorInternalServerError("Database not configured")
                })?;

            // 3. Resolve the caller capability.
            let caller = gate.resolve(db.get_ref(), bearer.token()).await?;

            Ok(AuthenticatedUser(caller))
        })
    }
}
