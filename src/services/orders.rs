use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::Caller;
use crate::config::EngineConfig;
use crate::db::{chats as chat_db, messages as message_db, orders as order_db};
use crate::error::{EngineError, EngineResult, is_unique_violation};
use crate::models::messages::{OfferRef, OfferStatus};
use crate::models::orders::{self, OrderStatus, PaymentStatus, UpdateOrderStatus};
use crate::models::users::Role;
use crate::services::{conversations as conversation_svc, reconcile};

/// Four states, so the status can only be moved under us a bounded number
/// of times.
const STATUS_WRITE_ATTEMPTS: usize = 4;

/// Fetch an order without any access check or repair.
pub async fn load_order(db: &DatabaseConnection, id: Uuid) -> EngineResult<orders::Model> {
    order_db::get_order_by_id(db, id)
        .await?
        .ok_or_else(|| EngineError::not_found(format!("Order {id}")))
}

/// Accept a pending offer and create the conversation's order from it.
///
/// The order row and the offer's move to `accepted` are the commit point: the
/// unique index on `orders.chat_id` lets exactly one acceptance per
/// conversation through. Any later caller, including a client retrying a
/// request that did succeed, gets `DuplicateOrder` carrying the existing
/// order. Linking the chat and accepting the quote follow as best-effort
/// writes.
pub async fn accept_offer_and_create_order(
    db: &DatabaseConnection,
    caller: &Caller,
    chat_id: Uuid,
    offer_ref: OfferRef,
) -> EngineResult<orders::Model> {
    caller.ensure_active()?;

    let chat = conversation_svc::load_chat(db, chat_id).await?;
    let chat = reconcile::reconcile_chat(db, chat).await?;

    if let Some(order_id) = chat.order_id {
        let existing = load_order(db, order_id).await?;
        debug!(%chat_id, %order_id, "offer acceptance repeated, order exists");
        return Err(EngineError::DuplicateOrder(Box::new(existing)));
    }

    if !chat.is_participant(caller.user_id) || caller.user_id == offer_ref.sender_id {
        return Err(EngineError::forbidden(
            "Only the recipient of an offer can accept it",
        ));
    }

    let message =
        match conversation_svc::locate_pending_offer(db, chat.id, offer_ref, chrono::Utc::now())
            .await
        {
            Ok(message) => message,
            // The offer may have been accepted by a concurrent call that has
            // not linked its order to the chat yet.
            Err(e) if e.is_conflict() => {
                if let Some(existing) = order_db::get_order_by_chat_id(db, chat.id).await? {
                    return Err(EngineError::DuplicateOrder(Box::new(existing)));
                }
                return Err(e);
            }
            Err(e) => return Err(e),
        };
    let offer = message
        .as_offer()
        .ok_or_else(|| EngineError::Internal(format!("Message {} is not an offer", message.id)))?;

    // The order and the offer's move to `accepted` commit together, so a
    // decline can never slip in between them.
    let txn = db.begin().await?;
    let order = match order_db::insert_order(&txn, &chat, offer_ref, offer).await {
        Ok(order) => order,
        Err(e) if is_unique_violation(&e) => {
            txn.rollback().await?;
            let existing = order_db::get_order_by_chat_id(db, chat.id)
                .await?
                .ok_or_else(|| {
                    EngineError::Internal("Order vanished after insert conflict".to_string())
                })?;
            info!(%chat_id, order_id = %existing.id, "concurrent acceptance lost to existing order");
            if let Err(e) = reconcile::complete_acceptance(db, &chat, &existing).await {
                warn!(%chat_id, error = %e, "could not finish links of the existing order");
            }
            return Err(EngineError::DuplicateOrder(Box::new(existing)));
        }
        Err(e) => return Err(e.into()),
    };

    let now = chrono::Utc::now();
    if message_db::set_offer_status_if_pending(&txn, message.id, OfferStatus::Accepted, now).await?
        == 0
    {
        txn.rollback().await?;
        if let Some(existing) = order_db::get_order_by_chat_id(db, chat.id).await? {
            return Err(EngineError::DuplicateOrder(Box::new(existing)));
        }
        return Err(EngineError::conflict("Offer was answered concurrently"));
    }
    chat_db::touch_chat(&txn, chat.id, now).await?;
    txn.commit().await?;

    info!(
        order_id = %order.id,
        %chat_id,
        amount = order.offer_amount,
        "order created from accepted offer"
    );

    if let Err(e) = reconcile::complete_acceptance(db, &chat, &order).await {
        warn!(order_id = %order.id, error = %e, "order created, links left for repair on read");
    }

    Ok(order)
}

/// Read an order. Only its parties and admins may see it.
pub async fn get_order(
    db: &DatabaseConnection,
    config: &EngineConfig,
    caller: &Caller,
    id: Uuid,
) -> EngineResult<orders::Model> {
    caller.ensure_active()?;

    let order = load_order(db, id).await?;
    if !caller.is_admin() && !order.is_party(caller.user_id) {
        return Err(EngineError::forbidden(
            "You can only view orders you are involved in",
        ));
    }

    reconcile::reconcile_order(db, config, order).await
}

/// Orders where the user is the customer or the provider, newest first.
pub async fn list_orders_for_user(
    db: &DatabaseConnection,
    caller: &Caller,
    user_id: Uuid,
    role: Role,
) -> EngineResult<Vec<orders::Model>> {
    caller.ensure_active()?;
    if !caller.acts_for(user_id) {
        return Err(EngineError::forbidden("You can only list your own orders"));
    }

    match role {
        Role::Customer => Ok(order_db::get_orders_by_customer(db, user_id).await?),
        Role::Provider => Ok(order_db::get_orders_by_provider(db, user_id).await?),
        Role::Admin => Err(EngineError::InvalidArgument(
            "role must be customer or provider".to_string(),
        )),
    }
}

fn authorize_transition(
    caller: &Caller,
    order: &orders::Model,
    next: OrderStatus,
) -> EngineResult<()> {
    if caller.is_admin() {
        return Ok(());
    }
    let allowed = match next {
        OrderStatus::InProgress => caller.user_id == order.provider_id,
        OrderStatus::Completed => caller.user_id == order.customer_id,
        OrderStatus::Cancelled => order.is_party(caller.user_id),
        OrderStatus::PendingAcceptance => false,
    };
    if allowed {
        Ok(())
    } else {
        Err(EngineError::forbidden(format!(
            "You cannot move this order to {next:?}"
        )))
    }
}

/// Move an order along its lifecycle.
///
/// Completing an order stamps `completed_at` and releases payment to the
/// provider. Only admins may set the payment status explicitly.
pub async fn update_order_status(
    db: &DatabaseConnection,
    caller: &Caller,
    id: Uuid,
    update: UpdateOrderStatus,
) -> EngineResult<orders::Model> {
    caller.ensure_active()?;

    let UpdateOrderStatus {
        status: next,
        payment_status,
    } = update;

    for _ in 0..STATUS_WRITE_ATTEMPTS {
        let order = load_order(db, id).await?;
        if !caller.is_admin() && !order.is_party(caller.user_id) {
            return Err(EngineError::forbidden(
                "You can only update orders you are involved in",
            ));
        }
        if payment_status.is_some() && !caller.is_admin() {
            return Err(EngineError::forbidden(
                "Only admins can set the payment status",
            ));
        }

        if order.status == next {
            if let Some(payment_status) = payment_status {
                order_db::set_payment_status(db, id, payment_status).await?;
                return load_order(db, id).await;
            }
            debug!(order_id = %id, status = ?next, "order already in requested status");
            return Ok(order);
        }
        if !order.status.can_transition_to(next) {
            return Err(EngineError::conflict(format!(
                "Order cannot move from {:?} to {:?}",
                order.status, next
            )));
        }
        authorize_transition(caller, &order, next)?;

        let (completed_at, payment_status) = if next == OrderStatus::Completed {
            (
                Some(chrono::Utc::now()),
                Some(payment_status.unwrap_or(PaymentStatus::ReleasedToProvider)),
            )
        } else {
            (None, payment_status)
        };

        let rows =
            order_db::transition_status_if(db, id, order.status, next, completed_at, payment_status)
                .await?;
        if rows == 1 {
            info!(order_id = %id, from = ?order.status, to = ?next, "order status updated");
            return load_order(db, id).await;
        }
        debug!(order_id = %id, "order changed concurrently, re-reading");
    }

    Err(EngineError::conflict(format!(
        "Order {id} changed concurrently, retry"
    )))
}

/// Attach the provider's proof-of-completion link to an in-progress order.
pub async fn attach_proof_of_completion(
    db: &DatabaseConnection,
    caller: &Caller,
    id: Uuid,
    url: &str,
) -> EngineResult<orders::Model> {
    caller.ensure_active()?;

    let order = load_order(db, id).await?;
    if caller.user_id != order.provider_id {
        return Err(EngineError::forbidden(
            "Only the provider can attach proof of completion",
        ));
    }

    let url = url.trim();
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(EngineError::validation(
            "Proof of completion must be an http(s) URL",
        ));
    }
    if order.status != OrderStatus::InProgress {
        return Err(EngineError::conflict(
            "Proof can only be attached while the order is in progress",
        ));
    }

    if order_db::set_proof_if_in_progress(db, id, url.to_string()).await? == 0 {
        return Err(EngineError::conflict("Order is no longer in progress"));
    }

    info!(order_id = %id, "proof of completion attached");
    load_order(db, id).await
}
