use sea_orm::prelude::Expr;
use sea_orm::*;
use uuid::Uuid;

use crate::models::orders;
use crate::models::reviews;

/// Insert the customer's review of an order. Fails with a unique-constraint
/// violation if the order was already reviewed.
pub async fn insert_review(
    db: &DatabaseConnection,
    order: &orders::Model,
    rating: i32,
    comment: String,
) -> Result<reviews::Model, DbErr> {
    let new_review = reviews::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        customer_id: Set(order.customer_id),
        provider_id: Set(order.provider_id),
        rating: Set(rating),
        comment: Set(comment),
        rating_applied: Set(false),
        created_at: Set(chrono::Utc::now()),
    };

    new_review.insert(db).await
}

/// Fetch the review of an order, if any.
pub async fn get_review_by_order_id(
    db: &DatabaseConnection,
    order_id: Uuid,
) -> Result<Option<reviews::Model>, DbErr> {
    reviews::Entity::find()
        .filter(reviews::Column::OrderId.eq(order_id))
        .one(db)
        .await
}

/// Fetch all reviews of a provider, newest first.
pub async fn get_reviews_by_provider(
    db: &DatabaseConnection,
    provider_id: Uuid,
) -> Result<Vec<reviews::Model>, DbErr> {
    reviews::Entity::find()
        .filter(reviews::Column::ProviderId.eq(provider_id))
        .order_by_desc(reviews::Column::CreatedAt)
        .all(db)
        .await
}

/// Flag a review as folded into the provider rating. Returns 0 if it already was.
pub async fn mark_rating_applied<C: ConnectionTrait>(
    conn: &C,
    review_id: Uuid,
) -> Result<u64, DbErr> {
    let result = reviews::Entity::update_many()
        .col_expr(reviews::Column::RatingApplied, Expr::value(true))
        .filter(reviews::Column::Id.eq(review_id))
        .filter(reviews::Column::RatingApplied.eq(false))
        .exec(conn)
        .await?;

    Ok(result.rows_affected)
}
