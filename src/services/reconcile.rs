//! Read-path repairs.
//!
//! Multi-record operations write one row at a time, and only the first write
//! of each is load-bearing. If a process dies in between, the later links are
//! missing until the next read of an affected record fills them in here.
//! Every repair only moves state forward, so running one twice, or racing a
//! live writer, is harmless.

use sea_orm::DatabaseConnection;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::db::{
    chats as chat_db, messages as message_db, orders as order_db, quotes as quote_db,
    reviews as review_db,
};
use crate::error::{EngineError, EngineResult};
use crate::models::messages::{OfferRef, OfferStatus};
use crate::models::orders::OrderStatus;
use crate::models::quotes::QuoteStatus;
use crate::models::{chats, orders, quotes};
use crate::services::{
    conversations as conversation_svc, quotes as quote_svc, reviews as review_svc,
};

/// Bring a quote's status up to what its conversation and order imply.
pub async fn reconcile_quote(
    db: &DatabaseConnection,
    quote: quotes::Model,
) -> EngineResult<quotes::Model> {
    if quote.status == QuoteStatus::Accepted {
        return Ok(quote);
    }

    let mut repaired = false;

    if quote.status == QuoteStatus::Pending {
        if let Some(chat) = chat_db::find_chat_by_quote(db, quote.id).await? {
            let link = quote.chat_id.is_none().then_some(chat.id);
            let rows = quote_db::set_status_if(
                db,
                quote.id,
                QuoteStatus::Pending,
                QuoteStatus::Responded,
                link,
            )
            .await?;
            if rows > 0 {
                info!(quote_id = %quote.id, chat_id = %chat.id, "repaired quote left pending after chat creation");
            }
            repaired = true;
        }
    }

    if let Some(order) = order_db::get_order_by_quote_id(db, quote.id).await? {
        let current = quote_svc::load_quote(db, quote.id).await?;
        if current.status != QuoteStatus::Accepted {
            let link = current.chat_id.is_none().then_some(order.chat_id);
            let rows = quote_db::set_status_if(
                db,
                current.id,
                current.status,
                QuoteStatus::Accepted,
                link,
            )
            .await?;
            if rows > 0 {
                info!(quote_id = %quote.id, order_id = %order.id, "repaired quote left unaccepted after order creation");
            }
        }
        repaired = true;
    }

    if repaired {
        quote_svc::load_quote(db, quote.id).await
    } else {
        Ok(quote)
    }
}

/// Link a conversation to the order created from it, if the link is missing.
pub async fn reconcile_chat(
    db: &DatabaseConnection,
    chat: chats::Model,
) -> EngineResult<chats::Model> {
    if chat.order_id.is_some() {
        return Ok(chat);
    }
    let Some(order) = order_db::get_order_by_chat_id(db, chat.id).await? else {
        return Ok(chat);
    };

    info!(chat_id = %chat.id, order_id = %order.id, "repairing links of an accepted offer");
    complete_acceptance(db, &chat, &order).await?;

    chat_db::get_chat_by_id(db, chat.id)
        .await?
        .ok_or_else(|| EngineError::not_found(format!("Chat {}", chat.id)))
}

/// Link an order to its review and make sure the review's rating has been
/// folded into the provider aggregate.
pub async fn reconcile_order(
    db: &DatabaseConnection,
    config: &EngineConfig,
    order: orders::Model,
) -> EngineResult<orders::Model> {
    if order.status != OrderStatus::Completed {
        return Ok(order);
    }
    let Some(review) = review_db::get_review_by_order_id(db, order.id).await? else {
        return Ok(order);
    };

    if !review.rating_applied {
        info!(review_id = %review.id, "applying rating left pending by an earlier review");
        review_svc::apply_rating(db, &review, config.write_retry_attempts).await?;
    }

    if order.customer_review_id.is_some() {
        return Ok(order);
    }
    if order_db::set_review_id_if_unset(db, order.id, review.id).await? > 0 {
        info!(order_id = %order.id, review_id = %review.id, "repaired missing review link");
    }

    order_db::get_order_by_id(db, order.id)
        .await?
        .ok_or_else(|| EngineError::not_found(format!("Order {}", order.id)))
}

/// The follow-up writes of an offer acceptance, after the order row exists:
/// mark the offer accepted, link the chat to the order, accept the quote.
pub async fn complete_acceptance(
    db: &DatabaseConnection,
    chat: &chats::Model,
    order: &orders::Model,
) -> EngineResult<()> {
    let offer_ref = OfferRef {
        sender_id: order.offer_sender_id,
        seq: order.offer_seq,
    };
    if let Some(offer) = message_db::find_offer(db, chat.id, offer_ref).await? {
        let now = chrono::Utc::now();
        let rows =
            message_db::set_offer_status_if_pending(db, offer.id, OfferStatus::Accepted, now)
                .await?;
        if rows > 0 {
            chat_db::touch_chat(db, chat.id, now).await?;
        } else if offer.offer_status != Some(OfferStatus::Accepted) {
            warn!(
                chat_id = %chat.id,
                seq = offer_ref.seq,
                status = ?offer.offer_status,
                "offer of an existing order is not marked accepted"
            );
        }
    }

    conversation_svc::link_order(db, chat.id, order.id).await?;

    if let Some(quote_id) = chat.quote_id {
        quote_svc::update_quote_status(db, quote_id, QuoteStatus::Accepted, Some(chat.id))
            .await?;
    }

    Ok(())
}
