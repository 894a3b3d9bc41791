use sea_orm::prelude::Expr;
use sea_orm::*;
use uuid::Uuid;

use crate::models::providers;

/// Fetch a provider's rating aggregate.
pub async fn get_profile<C: ConnectionTrait>(
    conn: &C,
    provider_id: Uuid,
) -> Result<Option<providers::Model>, DbErr> {
    providers::Entity::find_by_id(provider_id).one(conn).await
}

/// Create an empty aggregate (no reviews yet).
pub async fn insert_profile<C: ConnectionTrait>(
    conn: &C,
    provider_id: Uuid,
) -> Result<providers::Model, DbErr> {
    let profile = providers::ActiveModel {
        provider_id: Set(provider_id),
        rating: Set(0.0),
        total_reviews: Set(0),
        version: Set(0),
        updated_at: Set(chrono::Utc::now()),
    };

    profile.insert(conn).await
}

/// Write a new rating/count pair if the row is still at `expected_version`.
pub async fn update_profile_if_version<C: ConnectionTrait>(
    conn: &C,
    provider_id: Uuid,
    expected_version: i64,
    rating: f64,
    total_reviews: i32,
) -> Result<u64, DbErr> {
    let result = providers::Entity::update_many()
        .col_expr(providers::Column::Rating, Expr::value(rating))
        .col_expr(providers::Column::TotalReviews, Expr::value(total_reviews))
        .col_expr(providers::Column::Version, Expr::value(expected_version + 1))
        .col_expr(providers::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
        .filter(providers::Column::ProviderId.eq(provider_id))
        .filter(providers::Column::Version.eq(expected_version))
        .exec(conn)
        .await?;

    Ok(result.rows_affected)
}
