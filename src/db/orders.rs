use sea_orm::prelude::Expr;
use sea_orm::*;
use uuid::Uuid;

use crate::models::chats;
use crate::models::messages::{Offer, OfferRef};
use crate::models::orders::{self, OrderStatus, PaymentStatus};

/// Insert the order for an accepted offer.
///
/// The offer terms are copied into the row. Fails with a unique-constraint
/// violation if the conversation already has an order.
pub async fn insert_order<C: ConnectionTrait>(
    conn: &C,
    chat: &chats::Model,
    offer_ref: OfferRef,
    offer: &Offer,
) -> Result<orders::Model, DbErr> {
    let now = chrono::Utc::now();
    let new_order = orders::ActiveModel {
        id: Set(Uuid::new_v4()),
        customer_id: Set(chat.customer_id),
        provider_id: Set(chat.provider_id),
        service_id: Set(chat.service_id),
        quote_id: Set(chat.quote_id),
        chat_id: Set(chat.id),
        offer_sender_id: Set(offer_ref.sender_id),
        offer_seq: Set(offer_ref.seq),
        offer_amount: Set(offer.amount),
        offer_description: Set(offer.description.clone()),
        offer_expiry_date: Set(offer.expiry_date),
        status: Set(OrderStatus::PendingAcceptance),
        payment_status: Set(PaymentStatus::Pending),
        proof_of_completion_url: Set(None),
        customer_review_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        completed_at: Set(None),
    };

    new_order.insert(conn).await
}

/// Fetch a single order by ID.
pub async fn get_order_by_id(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<orders::Model>, DbErr> {
    orders::Entity::find_by_id(id).one(db).await
}

/// Fetch the order created from a conversation, if any.
pub async fn get_order_by_chat_id(
    db: &DatabaseConnection,
    chat_id: Uuid,
) -> Result<Option<orders::Model>, DbErr> {
    orders::Entity::find()
        .filter(orders::Column::ChatId.eq(chat_id))
        .one(db)
        .await
}

/// Fetch the order that references a quote, if any.
pub async fn get_order_by_quote_id(
    db: &DatabaseConnection,
    quote_id: Uuid,
) -> Result<Option<orders::Model>, DbErr> {
    orders::Entity::find()
        .filter(orders::Column::QuoteId.eq(quote_id))
        .order_by_asc(orders::Column::CreatedAt)
        .one(db)
        .await
}

/// Fetch all orders of a customer, newest first.
pub async fn get_orders_by_customer(
    db: &DatabaseConnection,
    customer_id: Uuid,
) -> Result<Vec<orders::Model>, DbErr> {
    orders::Entity::find()
        .filter(orders::Column::CustomerId.eq(customer_id))
        .order_by_desc(orders::Column::CreatedAt)
        .all(db)
        .await
}

/// Fetch all orders of a provider, newest first.
pub async fn get_orders_by_provider(
    db: &DatabaseConnection,
    provider_id: Uuid,
) -> Result<Vec<orders::Model>, DbErr> {
    orders::Entity::find()
        .filter(orders::Column::ProviderId.eq(provider_id))
        .order_by_desc(orders::Column::CreatedAt)
        .all(db)
        .await
}

/// Move an order from `expected` to `next`, optionally stamping
/// `completed_at` and the payment status in the same write.
pub async fn transition_status_if(
    db: &DatabaseConnection,
    id: Uuid,
    expected: OrderStatus,
    next: OrderStatus,
    completed_at: Option<chrono::DateTime<chrono::Utc>>,
    payment_status: Option<PaymentStatus>,
) -> Result<u64, DbErr> {
    let mut update = orders::Entity::update_many()
        .col_expr(orders::Column::Status, Expr::value(next))
        .col_expr(orders::Column::UpdatedAt, Expr::value(chrono::Utc::now()));

    if let Some(completed_at) = completed_at {
        update = update.col_expr(orders::Column::CompletedAt, Expr::value(completed_at));
    }
    if let Some(payment_status) = payment_status {
        update = update.col_expr(orders::Column::PaymentStatus, Expr::value(payment_status));
    }

    let result = update
        .filter(orders::Column::Id.eq(id))
        .filter(orders::Column::Status.eq(expected))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

/// Set only the payment status of an order.
pub async fn set_payment_status(
    db: &DatabaseConnection,
    id: Uuid,
    payment_status: PaymentStatus,
) -> Result<u64, DbErr> {
    let result = orders::Entity::update_many()
        .col_expr(orders::Column::PaymentStatus, Expr::value(payment_status))
        .col_expr(orders::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
        .filter(orders::Column::Id.eq(id))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

/// Record the proof-of-completion URL while the order is in progress.
pub async fn set_proof_if_in_progress(
    db: &DatabaseConnection,
    id: Uuid,
    url: String,
) -> Result<u64, DbErr> {
    let result = orders::Entity::update_many()
        .col_expr(orders::Column::ProofOfCompletionUrl, Expr::value(url))
        .col_expr(orders::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
        .filter(orders::Column::Id.eq(id))
        .filter(orders::Column::Status.eq(OrderStatus::InProgress))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

/// Link the customer's review to the order, only if none is linked yet.
pub async fn set_review_id_if_unset(
    db: &DatabaseConnection,
    id: Uuid,
    review_id: Uuid,
) -> Result<u64, DbErr> {
    let result = orders::Entity::update_many()
        .col_expr(orders::Column::CustomerReviewId, Expr::value(review_id))
        .col_expr(orders::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
        .filter(orders::Column::Id.eq(id))
        .filter(orders::Column::CustomerReviewId.is_null())
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}
