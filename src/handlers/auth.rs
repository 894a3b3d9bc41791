use actix_web::{HttpResponse, web};
use sea_orm::DatabaseConnection;
use tracing::info;

use crate::auth::middleware::{AuthenticatedUser, IdentityGate};
use crate::db::users;
use crate::error::EngineError;
use crate::models::users::{CompleteProfile, Role, UserResponse};

/// `GET /api/auth/me`: the authenticated user's profile.
pub async fn me(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, EngineError> {
    let caller = user.0;
    let profile = users::get_user_by_id(db.get_ref(), caller.user_id)
        .await?
        .ok_or_else(|| EngineError::not_found(format!("User {}", caller.user_id)))?;

    Ok(HttpResponse::Ok().json(UserResponse::from(profile)))
}

/// `POST /api/auth/complete-profile`: choose customer/provider and a display
/// name after first login.
///
/// The cached role is dropped so the next request sees the new one.
pub async fn complete_profile(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    gate: web::Data<IdentityGate>,
    body: web::Json<CompleteProfile>,
) -> Result<HttpResponse, EngineError> {
    let caller = user.0;
    caller.ensure_active()?;

    let input = body.into_inner();
    if input.role == Some(Role::Admin) && !caller.is_admin() {
        return Err(EngineError::forbidden("You cannot make yourself an admin"));
    }

    let updated = users::complete_profile(db.get_ref(), caller.user_id, input).await?;
    gate.forget(caller.user_id).await;

    info!(user_id = %caller.user_id, role = ?updated.role, "profile completed");
    Ok(HttpResponse::Ok().json(UserResponse::from(updated)))
}
