use sea_orm::prelude::Expr;
use sea_orm::*;
use uuid::Uuid;

use crate::models::messages::{self, MessageKind, NewMessage, OfferRef, OfferStatus};

/// Insert a message at an already-claimed sequence position.
pub async fn insert_message<C: ConnectionTrait>(
    conn: &C,
    chat_id: Uuid,
    seq: i64,
    sender_id: Uuid,
    content: NewMessage,
    created_at: chrono::DateTime<chrono::Utc>,
) -> Result<messages::Model, DbErr> {
    let mut new_message = messages::ActiveModel {
        id: Set(Uuid::new_v4()),
        chat_id: Set(chat_id),
        seq: Set(seq),
        sender_id: Set(sender_id),
        kind: Set(MessageKind::Text),
        body: Set(None),
        amount: Set(None),
        description: Set(None),
        expiry_date: Set(None),
        offer_status: Set(None),
        created_at: Set(created_at),
        updated_at: Set(created_at),
    };

    match content {
        NewMessage::Text { body } => {
            new_message.body = Set(Some(body));
        }
        NewMessage::Offer {
            amount,
            description,
            expiry_date,
        } => {
            new_message.kind = Set(MessageKind::Offer);
            new_message.amount = Set(Some(amount));
            new_message.description = Set(Some(description));
            new_message.expiry_date = Set(expiry_date);
            new_message.offer_status = Set(Some(OfferStatus::Pending));
        }
    }

    new_message.insert(conn).await
}

/// Fetch the full timeline of a conversation in sequence order.
pub async fn get_messages_by_chat(
    db: &DatabaseConnection,
    chat_id: Uuid,
) -> Result<Vec<messages::Model>, DbErr> {
    messages::Entity::find()
        .filter(messages::Column::ChatId.eq(chat_id))
        .order_by_asc(messages::Column::Seq)
        .all(db)
        .await
}

/// Locate the offer message addressed by `offer` inside a conversation.
pub async fn find_offer(
    db: &DatabaseConnection,
    chat_id: Uuid,
    offer: OfferRef,
) -> Result<Option<messages::Model>, DbErr> {
    messages::Entity::find()
        .filter(messages::Column::ChatId.eq(chat_id))
        .filter(messages::Column::Seq.eq(offer.seq))
        .filter(messages::Column::SenderId.eq(offer.sender_id))
        .filter(messages::Column::Kind.eq(MessageKind::Offer))
        .one(db)
        .await
}

/// Move an offer out of `pending`. Returns 0 if it already left `pending`.
pub async fn set_offer_status_if_pending<C: ConnectionTrait>(
    conn: &C,
    message_id: Uuid,
    next: OfferStatus,
    at: chrono::DateTime<chrono::Utc>,
) -> Result<u64, DbErr> {
    let result = messages::Entity::update_many()
        .col_expr(messages::Column::OfferStatus, Expr::value(next))
        .col_expr(messages::Column::UpdatedAt, Expr::value(at))
        .filter(messages::Column::Id.eq(message_id))
        .filter(messages::Column::Kind.eq(MessageKind::Offer))
        .filter(messages::Column::OfferStatus.eq(OfferStatus::Pending))
        .exec(conn)
        .await?;

    Ok(result.rows_affected)
}

/// Expire every pending offer of a conversation whose expiry date has passed.
pub async fn expire_overdue_offers(
    db: &DatabaseConnection,
    chat_id: Uuid,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<u64, DbErr> {
    let result = messages::Entity::update_many()
        .col_expr(messages::Column::OfferStatus, Expr::value(OfferStatus::Expired))
        .col_expr(messages::Column::UpdatedAt, Expr::value(now))
        .filter(messages::Column::ChatId.eq(chat_id))
        .filter(messages::Column::Kind.eq(MessageKind::Offer))
        .filter(messages::Column::OfferStatus.eq(OfferStatus::Pending))
        .filter(messages::Column::ExpiryDate.is_not_null())
        .filter(messages::Column::ExpiryDate.lte(now))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}
