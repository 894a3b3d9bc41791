use sea_orm::*;
use uuid::Uuid;

use crate::error::is_unique_violation;
use crate::models::users::{self, CompleteProfile, CreateUserFromAuth};

/// Find a user by auth id, creating the mirror row on first sight.
pub async fn find_or_create_from_auth(
    db: &DatabaseConnection,
    input: CreateUserFromAuth,
) -> Result<users::Model, DbErr> {
    if let Some(existing) = users::Entity::find_by_id(input.id).one(db).await? {
        return Ok(existing);
    }

    let input_id = input.id;
    let new_user = users::ActiveModel {
        id: Set(input.id),
        email: Set(input.email),
        display_name: Set(input.display_name),
        role: Set(input.role),
        created_at: Set(chrono::Utc::now()),
        updated_at: Set(None),
    };

    match new_user.insert(db).await {
        Ok(user) => Ok(user),
        // A concurrent first request from the same user inserted the row.
        Err(e) if is_unique_violation(&e) => users::Entity::find_by_id(input_id)
            .one(db)
            .await?
            .ok_or(e),
        Err(e) => Err(e),
    }
}

/// Fetch a single user by ID.
pub async fn get_user_by_id(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<users::Model>, DbErr> {
    users::Entity::find_by_id(id).one(db).await
}

/// Complete a user's profile (role and display name after first login).
pub async fn complete_profile(
    db: &DatabaseConnection,
    id: Uuid,
    input: CompleteProfile,
) -> Result<users::Model, DbErr> {
    let user = users::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;

    let mut active: users::ActiveModel = user.into();

    if let Some(role) = input.role {
        active.role = Set(role);
    }
    if let Some(display_name) = input.display_name {
        active.display_name = Set(Some(display_name));
    }
    active.updated_at = Set(Some(chrono::Utc::now()));

    active.update(db).await
}
