use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::Caller;
use crate::config::EngineConfig;
use crate::db::{chats as chat_db, messages as message_db};
use crate::error::{EngineError, EngineResult, is_unique_violation};
use crate::models::chats::{
    self, ConversationSummary, ConversationView, OpenConversation, OpenedConversation,
};
use crate::models::messages::{Message, MessageBody, NewMessage, OfferRef, OfferStatus};
use crate::models::quotes::QuoteStatus;
use crate::services::{quotes as quote_svc, reconcile};

/// Fetch a conversation without any access check or repair.
pub async fn load_chat(db: &DatabaseConnection, id: Uuid) -> EngineResult<chats::Model> {
    chat_db::get_chat_by_id(db, id)
        .await?
        .ok_or_else(|| EngineError::not_found(format!("Chat {id}")))
}

/// Return the conversation of a customer/provider pair, creating it (with the
/// provider's greeting as first message) if there is none.
///
/// With a quote id the conversation is scoped to that quote and the quote
/// moves to `responded`.
pub async fn find_or_create_conversation(
    db: &DatabaseConnection,
    config: &EngineConfig,
    caller: &Caller,
    request: OpenConversation,
) -> EngineResult<OpenedConversation> {
    caller.ensure_active()?;

    let OpenConversation {
        customer_id,
        provider_id,
        quote_id,
        mut service_id,
    } = request;

    if customer_id == provider_id {
        return Err(EngineError::validation(
            "A conversation needs two different participants",
        ));
    }
    if !caller.acts_for(provider_id) {
        return Err(EngineError::forbidden(
            "Only the provider can open a conversation",
        ));
    }

    let mut pending_quote = None;
    if let Some(quote_id) = quote_id {
        let quote = quote_svc::load_quote(db, quote_id).await?;
        if quote.customer_id != customer_id || quote.provider_id != provider_id {
            return Err(EngineError::validation(
                "Quote belongs to a different customer and provider",
            ));
        }
        service_id = Some(quote.service_id);
        if quote.status == QuoteStatus::Pending {
            pending_quote = Some(quote.id);
        }
    }

    if let Some(existing) = chat_db::find_chat_for_pair(db, customer_id, provider_id, quote_id).await? {
        debug!(chat_id = %existing.id, "conversation already exists");
        if let Some(quote_id) = pending_quote {
            mark_quote_responded(db, quote_id, existing.id).await;
        }
        return Ok(OpenedConversation {
            chat: existing,
            created: false,
        });
    }

    let chat = match chat_db::insert_chat(db, customer_id, provider_id, quote_id, service_id).await {
        Ok(chat) => chat,
        Err(e) if is_unique_violation(&e) => {
            // Lost the race to a concurrent opener; theirs is the conversation.
            let winner = chat_db::find_chat_for_pair(db, customer_id, provider_id, quote_id)
                .await?
                .ok_or_else(|| {
                    EngineError::Internal("Conversation vanished after insert conflict".to_string())
                })?;
            debug!(chat_id = %winner.id, "conversation created concurrently");
            return Ok(OpenedConversation {
                chat: winner,
                created: false,
            });
        }
        Err(e) => return Err(e.into()),
    };

    info!(chat_id = %chat.id, %customer_id, %provider_id, quote_id = ?quote_id, "conversation created");

    let greeting = NewMessage::Text {
        body: config.initial_chat_message.clone(),
    };
    if let Err(e) = append_unchecked(db, chat.id, provider_id, greeting).await {
        warn!(chat_id = %chat.id, error = %e, "failed to post initial message");
    }

    if let Some(quote_id) = pending_quote {
        mark_quote_responded(db, quote_id, chat.id).await;
    }

    Ok(OpenedConversation {
        chat: load_chat(db, chat.id).await?,
        created: true,
    })
}

async fn mark_quote_responded(db: &DatabaseConnection, quote_id: Uuid, chat_id: Uuid) {
    if let Err(e) =
        quote_svc::update_quote_status(db, quote_id, QuoteStatus::Responded, Some(chat_id)).await
    {
        warn!(%quote_id, %chat_id, error = %e, "failed to mark quote responded");
    }
}

/// Read a conversation with its full timeline.
///
/// Overdue offers are expired and a missing order link is repaired before
/// the timeline is returned.
pub async fn get_conversation(
    db: &DatabaseConnection,
    caller: &Caller,
    chat_id: Uuid,
) -> EngineResult<ConversationView> {
    caller.ensure_active()?;

    let chat = load_chat(db, chat_id).await?;
    if !caller.is_admin() && !chat.is_participant(caller.user_id) {
        return Err(EngineError::forbidden(
            "You are not a participant in this conversation",
        ));
    }

    let chat = reconcile::reconcile_chat(db, chat).await?;

    let expired = message_db::expire_overdue_offers(db, chat.id, chrono::Utc::now()).await?;
    if expired > 0 {
        info!(chat_id = %chat.id, expired, "expired overdue offers");
    }

    let messages = message_db::get_messages_by_chat(db, chat.id)
        .await?
        .into_iter()
        .map(Message::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ConversationView { chat, messages })
}

/// All conversations of the caller, most recent activity first.
pub async fn list_conversations_for_user(
    db: &DatabaseConnection,
    caller: &Caller,
) -> EngineResult<Vec<ConversationSummary>> {
    caller.ensure_active()?;

    let chats = chat_db::get_chats_for_user(db, caller.user_id).await?;
    Ok(chats
        .iter()
        .filter_map(|chat| ConversationSummary::for_user(chat, caller.user_id))
        .collect())
}

/// Append a message from the caller to a conversation.
pub async fn append_message(
    db: &DatabaseConnection,
    caller: &Caller,
    chat_id: Uuid,
    content: NewMessage,
) -> EngineResult<Message> {
    caller.ensure_active()?;

    let chat = load_chat(db, chat_id).await?;
    if !chat.is_participant(caller.user_id) {
        return Err(EngineError::forbidden(
            "You are not a participant in this conversation",
        ));
    }

    let content = validate_message(&chat, caller.user_id, content, chrono::Utc::now())?;
    let message = append_unchecked(db, chat.id, caller.user_id, content).await?;

    debug!(chat_id = %chat.id, seq = message.seq, "message appended");
    Ok(message)
}

fn validate_message(
    chat: &chats::Model,
    sender_id: Uuid,
    content: NewMessage,
    now: chrono::DateTime<chrono::Utc>,
) -> EngineResult<NewMessage> {
    match content {
        NewMessage::Text { body } => {
            if body.trim().is_empty() {
                return Err(EngineError::validation("Message body must not be empty"));
            }
            Ok(NewMessage::Text { body })
        }
        NewMessage::Offer {
            amount,
            description,
            expiry_date,
        } => {
            if sender_id != chat.provider_id {
                return Err(EngineError::forbidden("Only the provider can send offers"));
            }
            if !amount.is_finite() || amount <= 0.0 {
                return Err(EngineError::validation("Offer amount must be greater than 0"));
            }
            let description = description.trim().to_string();
            if description.is_empty() {
                return Err(EngineError::validation("Offer description must not be empty"));
            }
            if expiry_date.is_some_and(|expiry| expiry <= now) {
                return Err(EngineError::validation("Offer expiry date must be in the future"));
            }
            Ok(NewMessage::Offer {
                amount,
                description,
                expiry_date,
            })
        }
    }
}

/// Claim the next sequence slot and write the message into it.
///
/// Both writes share one transaction, so a failed insert gives its slot back
/// and the timeline stays gap-free. `created_at` never goes below the
/// conversation's last activity, so the timeline order by `seq` and by time
/// agree.
async fn append_unchecked(
    db: &DatabaseConnection,
    chat_id: Uuid,
    sender_id: Uuid,
    content: NewMessage,
) -> EngineResult<Message> {
    let txn = db.begin().await?;

    let Some(chat) = chat_db::claim_message_slot(&txn, chat_id, chrono::Utc::now()).await? else {
        txn.rollback().await?;
        return Err(EngineError::not_found(format!("Chat {chat_id}")));
    };

    let row = message_db::insert_message(
        &txn,
        chat_id,
        chat.message_count,
        sender_id,
        content,
        chat.last_message_at,
    )
    .await?;
    txn.commit().await?;

    Ok(Message::try_from(row)?)
}

/// Find an offer that can still be answered.
///
/// An offer past its expiry date is expired on the spot and reported as a
/// conflict, as is any offer that already left `pending`.
pub async fn locate_pending_offer(
    db: &DatabaseConnection,
    chat_id: Uuid,
    offer_ref: OfferRef,
    now: chrono::DateTime<chrono::Utc>,
) -> EngineResult<Message> {
    let row = message_db::find_offer(db, chat_id, offer_ref)
        .await?
        .ok_or_else(|| {
            EngineError::not_found(format!(
                "Offer {} from {} in chat {chat_id}",
                offer_ref.seq, offer_ref.sender_id
            ))
        })?;
    let message = Message::try_from(row)?;
    let offer = message
        .as_offer()
        .ok_or_else(|| EngineError::Internal(format!("Message {} is not an offer", message.id)))?;

    if offer.status == OfferStatus::Pending && offer.is_overdue(now) {
        message_db::set_offer_status_if_pending(db, message.id, OfferStatus::Expired, now).await?;
        return Err(EngineError::conflict("Offer has expired"));
    }
    if offer.status.is_terminal() {
        return Err(EngineError::conflict(format!(
            "Offer is already {:?}",
            offer.status
        )));
    }

    Ok(message)
}

/// Move an offer out of `pending`. Each offer changes status at most once.
///
/// The conversation is repaired first, so the offer behind an order whose
/// follow-up writes were lost reads as accepted and cannot be answered again.
pub async fn set_offer_status(
    db: &DatabaseConnection,
    chat_id: Uuid,
    offer_ref: OfferRef,
    next: OfferStatus,
) -> EngineResult<Message> {
    if next == OfferStatus::Pending {
        return Err(EngineError::validation("An offer cannot be moved back to pending"));
    }

    let chat = load_chat(db, chat_id).await?;
    let chat = reconcile::reconcile_chat(db, chat).await?;
    let now = chrono::Utc::now();
    let mut message = locate_pending_offer(db, chat.id, offer_ref, now).await?;

    if message_db::set_offer_status_if_pending(db, message.id, next, now).await? == 0 {
        return Err(EngineError::conflict("Offer was answered concurrently"));
    }
    chat_db::touch_chat(db, chat.id, now).await?;

    if let MessageBody::Offer(offer) = &mut message.body {
        offer.status = next;
    }
    info!(%chat_id, seq = offer_ref.seq, status = ?next, "offer status updated");
    Ok(message)
}

/// Decline an offer on behalf of its recipient.
pub async fn decline_offer(
    db: &DatabaseConnection,
    caller: &Caller,
    chat_id: Uuid,
    offer_ref: OfferRef,
) -> EngineResult<Message> {
    caller.ensure_active()?;

    let chat = load_chat(db, chat_id).await?;
    if !chat.is_participant(caller.user_id) || caller.user_id == offer_ref.sender_id {
        return Err(EngineError::forbidden(
            "Only the recipient of an offer can decline it",
        ));
    }

    set_offer_status(db, chat.id, offer_ref, OfferStatus::Declined).await
}

/// Record the order created from a conversation. A conversation holds at
/// most one order.
pub async fn link_order(db: &DatabaseConnection, chat_id: Uuid, order_id: Uuid) -> EngineResult<()> {
    if chat_db::set_order_id_if_unset(db, chat_id, order_id).await? == 1 {
        return Ok(());
    }

    let chat = load_chat(db, chat_id).await?;
    if chat.order_id == Some(order_id) {
        return Ok(());
    }
    Err(EngineError::conflict(format!(
        "Chat {chat_id} already has an order"
    )))
}
