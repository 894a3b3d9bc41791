use sea_orm::prelude::Expr;
use sea_orm::*;
use uuid::Uuid;

use crate::models::chats::{self, canonical_pair};

/// Insert a new, empty conversation between a customer and a provider.
pub async fn insert_chat(
    db: &DatabaseConnection,
    customer_id: Uuid,
    provider_id: Uuid,
    quote_id: Option<Uuid>,
    service_id: Option<Uuid>,
) -> Result<chats::Model, DbErr> {
    let now = chrono::Utc::now();
    let (low, high) = canonical_pair(customer_id, provider_id);

    let new_chat = chats::ActiveModel {
        id: Set(Uuid::new_v4()),
        customer_id: Set(customer_id),
        provider_id: Set(provider_id),
        participant_low: Set(low),
        participant_high: Set(high),
        quote_id: Set(quote_id),
        quote_scope: Set(quote_id.unwrap_or(Uuid::nil())),
        service_id: Set(service_id),
        order_id: Set(None),
        message_count: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        last_message_at: Set(now),
    };

    new_chat.insert(db).await
}

/// Fetch a single conversation by ID.
pub async fn get_chat_by_id(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<chats::Model>, DbErr> {
    chats::Entity::find_by_id(id).one(db).await
}

/// Look up the conversation for a participant pair.
///
/// With a quote id the lookup is scoped to that quote; without one it returns
/// the pair's most recently active conversation.
pub async fn find_chat_for_pair(
    db: &DatabaseConnection,
    a: Uuid,
    b: Uuid,
    quote_id: Option<Uuid>,
) -> Result<Option<chats::Model>, DbErr> {
    let (low, high) = canonical_pair(a, b);
    let mut query = chats::Entity::find()
        .filter(chats::Column::ParticipantLow.eq(low))
        .filter(chats::Column::ParticipantHigh.eq(high));

    if let Some(quote_id) = quote_id {
        query = query.filter(chats::Column::QuoteScope.eq(quote_id));
    }

    query
        .order_by_desc(chats::Column::LastMessageAt)
        .one(db)
        .await
}

/// Fetch the conversation opened against a quote, if any.
pub async fn find_chat_by_quote(
    db: &DatabaseConnection,
    quote_id: Uuid,
) -> Result<Option<chats::Model>, DbErr> {
    chats::Entity::find()
        .filter(chats::Column::QuoteId.eq(quote_id))
        .one(db)
        .await
}

/// Fetch all conversations a user takes part in, most recent activity first.
pub async fn get_chats_for_user(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> Result<Vec<chats::Model>, DbErr> {
    chats::Entity::find()
        .filter(
            Condition::any()
                .add(chats::Column::ParticipantLow.eq(user_id))
                .add(chats::Column::ParticipantHigh.eq(user_id)),
        )
        .order_by_desc(chats::Column::LastMessageAt)
        .all(db)
        .await
}

/// Reserve the next message sequence number of a conversation.
///
/// The counter is bumped in a single statement and the updated row read back,
/// so its `message_count` is the caller's slot. `last_message_at` moves to
/// `at` unless a later write already put it past that, which keeps slot order
/// and timestamp order in agreement. Returns `None` if the chat is gone.
pub async fn claim_message_slot<C: ConnectionTrait>(
    conn: &C,
    chat_id: Uuid,
    at: chrono::DateTime<chrono::Utc>,
) -> Result<Option<chats::Model>, DbErr> {
    let last_message_at = Expr::case(
        Expr::col(chats::Column::LastMessageAt).gt(Expr::value(at)),
        Expr::col(chats::Column::LastMessageAt),
    )
    .finally(Expr::value(at));

    let mut updated = chats::Entity::update_many()
        .col_expr(
            chats::Column::MessageCount,
            Expr::col(chats::Column::MessageCount).add(1),
        )
        .col_expr(chats::Column::LastMessageAt, last_message_at.into())
        .col_expr(chats::Column::UpdatedAt, Expr::value(at))
        .filter(chats::Column::Id.eq(chat_id))
        .exec_with_returning(conn)
        .await?;

    Ok(updated.pop())
}

/// Set `order_id` only if it is still null. Returns the number of rows changed.
pub async fn set_order_id_if_unset(
    db: &DatabaseConnection,
    chat_id: Uuid,
    order_id: Uuid,
) -> Result<u64, DbErr> {
    let result = chats::Entity::update_many()
        .col_expr(chats::Column::OrderId, Expr::value(order_id))
        .col_expr(chats::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
        .filter(chats::Column::Id.eq(chat_id))
        .filter(chats::Column::OrderId.is_null())
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

/// Bump the activity timestamps of a conversation without moving them back.
pub async fn touch_chat<C: ConnectionTrait>(
    conn: &C,
    chat_id: Uuid,
    at: chrono::DateTime<chrono::Utc>,
) -> Result<u64, DbErr> {
    let result = chats::Entity::update_many()
        .col_expr(chats::Column::LastMessageAt, Expr::value(at))
        .col_expr(chats::Column::UpdatedAt, Expr::value(at))
        .filter(chats::Column::Id.eq(chat_id))
        .filter(chats::Column::LastMessageAt.lte(at))
        .exec(conn)
        .await?;

    Ok(result.rows_affected)
}
