//! Offer acceptance workflow and order lifecycle.
//!
//! Run with: `cargo test --test order_test`
mod common;

use chrono::{Duration, Utc};
use sea_orm::prelude::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use solar_marketplace_backend::db::{chats as chat_db, orders as order_db};
use solar_marketplace_backend::error::EngineError;
use solar_marketplace_backend::models::messages::{self, OfferStatus};
use solar_marketplace_backend::models::orders::{OrderStatus, PaymentStatus, UpdateOrderStatus};
use solar_marketplace_backend::models::quotes::QuoteStatus;
use solar_marketplace_backend::models::users::Role;
use solar_marketplace_backend::services::{
    conversations, orders as order_svc, quotes as quote_svc,
};

use common::*;

#[tokio::test]
async fn test_accepting_offer_creates_linked_order() {
    let db = setup_db().await;
    let customer = customer();
    let provider = provider();
    let quote = request_quote(&db, &customer, provider.user_id).await;
    let chat = open_chat(&db, &provider, customer.user_id, Some(quote.id)).await;
    let offer = send_offer(&db, &provider, chat.id, 500.0, "Install 5kW system").await;

    let order = order_svc::accept_offer_and_create_order(
        &db,
        &customer,
        chat.id,
        offer.offer_ref().unwrap(),
    )
    .await
    .unwrap();

    assert_eq!(order.status, OrderStatus::PendingAcceptance);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.customer_id, customer.user_id);
    assert_eq!(order.provider_id, provider.user_id);
    assert_eq!(order.quote_id, Some(quote.id));
    assert_eq!(order.service_id, Some(quote.service_id));
    assert_eq!(order.chat_id, chat.id);
    assert_eq!(order.offer_amount, 500.0);
    assert_eq!(order.offer_description, "Install 5kW system");
    assert_eq!(order.offer_seq, offer.seq);

    let view = conversations::get_conversation(&db, &customer, chat.id).await.unwrap();
    assert_eq!(view.chat.order_id, Some(order.id));
    let accepted = view.messages.iter().find(|m| m.id == offer.id).unwrap();
    assert_eq!(accepted.as_offer().unwrap().status, OfferStatus::Accepted);

    let quote = quote_svc::get_quote(&db, &customer, quote.id).await.unwrap();
    assert_eq!(quote.status, QuoteStatus::Accepted);
}

#[tokio::test]
async fn test_only_recipient_accepts() {
    let db = setup_db().await;
    let customer = customer();
    let provider = provider();
    let chat = open_chat(&db, &provider, customer.user_id, None).await;
    let offer = send_offer(&db, &provider, chat.id, 500.0, "Install 5kW system").await;
    let offer_ref = offer.offer_ref().unwrap();

    let err = order_svc::accept_offer_and_create_order(&db, &provider, chat.id, offer_ref)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let stranger = common::customer();
    let err = order_svc::accept_offer_and_create_order(&db, &stranger, chat.id, offer_ref)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = order_svc::accept_offer_and_create_order(&db, &customer, Uuid::new_v4(), offer_ref)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn test_repeated_acceptance_returns_existing_order() {
    let db = setup_db().await;
    let customer = customer();
    let provider = provider();
    let chat = open_chat(&db, &provider, customer.user_id, None).await;
    let offer = send_offer(&db, &provider, chat.id, 500.0, "Install 5kW system").await;
    let offer_ref = offer.offer_ref().unwrap();

    let order = order_svc::accept_offer_and_create_order(&db, &customer, chat.id, offer_ref)
        .await
        .unwrap();

    let err = order_svc::accept_offer_and_create_order(&db, &customer, chat.id, offer_ref)
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    match err {
        EngineError::DuplicateOrder(existing) => assert_eq!(existing.id, order.id),
        other => panic!("expected DuplicateOrder, got {other:?}"),
    }
}

#[tokio::test]
async fn test_concurrent_acceptance_creates_one_order() {
    let db = setup_db().await;
    let customer = customer();
    let provider = provider();
    let chat = open_chat(&db, &provider, customer.user_id, None).await;
    let offer = send_offer(&db, &provider, chat.id, 500.0, "Install 5kW system").await;
    let offer_ref = offer.offer_ref().unwrap();

    let (a, b) = tokio::join!(
        order_svc::accept_offer_and_create_order(&db, &customer, chat.id, offer_ref),
        order_svc::accept_offer_and_create_order(&db, &customer, chat.id, offer_ref),
    );

    let (winner, loser) = match (a, b) {
        (Ok(order), Err(err)) | (Err(err), Ok(order)) => (order, err),
        (a, b) => panic!("expected exactly one success, got {a:?} and {b:?}"),
    };
    match loser {
        EngineError::DuplicateOrder(existing) => assert_eq!(existing.id, winner.id),
        other => panic!("expected DuplicateOrder, got {other:?}"),
    }

    let orders = order_svc::list_orders_for_user(&db, &customer, customer.user_id, Role::Customer)
        .await
        .unwrap();
    assert_eq!(orders.len(), 1);
}

#[tokio::test]
async fn test_declined_or_expired_offers_cannot_be_accepted() {
    let db = setup_db().await;
    let customer = customer();
    let provider = provider();
    let chat = open_chat(&db, &provider, customer.user_id, None).await;

    let declined = send_offer(&db, &provider, chat.id, 500.0, "Install 5kW system").await;
    conversations::decline_offer(&db, &customer, chat.id, declined.offer_ref().unwrap())
        .await
        .unwrap();
    let err = order_svc::accept_offer_and_create_order(
        &db,
        &customer,
        chat.id,
        declined.offer_ref().unwrap(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    let stale = send_offer(&db, &provider, chat.id, 450.0, "Install 4kW system").await;
    messages::Entity::update_many()
        .col_expr(
            messages::Column::ExpiryDate,
            Expr::value(Utc::now() - Duration::minutes(1)),
        )
        .filter(messages::Column::Id.eq(stale.id))
        .exec(&db)
        .await
        .unwrap();
    let err = order_svc::accept_offer_and_create_order(
        &db,
        &customer,
        chat.id,
        stale.offer_ref().unwrap(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    let view = conversations::get_conversation(&db, &customer, chat.id).await.unwrap();
    assert!(view.chat.order_id.is_none());
    let stale = view.messages.iter().find(|m| m.id == stale.id).unwrap();
    assert_eq!(stale.as_offer().unwrap().status, OfferStatus::Expired);
}

#[tokio::test]
async fn test_order_without_links_is_repaired_on_read() {
    let db = setup_db().await;
    let customer = customer();
    let provider = provider();
    let quote = request_quote(&db, &customer, provider.user_id).await;
    let chat = open_chat(&db, &provider, customer.user_id, Some(quote.id)).await;
    let offer = send_offer(&db, &provider, chat.id, 500.0, "Install 5kW system").await;

    // Only the order row made it; every follow-up write was lost.
    let chat = chat_db::get_chat_by_id(&db, chat.id).await.unwrap().unwrap();
    let order = order_db::insert_order(
        &db,
        &chat,
        offer.offer_ref().unwrap(),
        offer.as_offer().unwrap(),
    )
    .await
    .unwrap();

    let quote_read = quote_svc::get_quote(&db, &customer, quote.id).await.unwrap();
    assert_eq!(quote_read.status, QuoteStatus::Accepted);

    let view = conversations::get_conversation(&db, &provider, chat.id).await.unwrap();
    assert_eq!(view.chat.order_id, Some(order.id));
    let offer = view.messages.iter().find(|m| m.id == offer.id).unwrap();
    assert_eq!(offer.as_offer().unwrap().status, OfferStatus::Accepted);

    // Acceptance after the crash answers with the order that exists.
    let err = order_svc::accept_offer_and_create_order(
        &db,
        &customer,
        chat.id,
        offer.offer_ref().unwrap(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EngineError::DuplicateOrder(ref o) if o.id == order.id));
}

#[tokio::test]
async fn test_offer_of_unlinked_order_cannot_be_declined() {
    let db = setup_db().await;
    let customer = customer();
    let provider = provider();
    let chat = open_chat(&db, &provider, customer.user_id, None).await;
    let offer = send_offer(&db, &provider, chat.id, 500.0, "Install 5kW system").await;
    let offer_ref = offer.offer_ref().unwrap();

    // The order row exists but the offer was never marked and the chat never linked.
    let chat = chat_db::get_chat_by_id(&db, chat.id).await.unwrap().unwrap();
    let order = order_db::insert_order(&db, &chat, offer_ref, offer.as_offer().unwrap())
        .await
        .unwrap();

    let err = conversations::decline_offer(&db, &customer, chat.id, offer_ref)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    let view = conversations::get_conversation(&db, &customer, chat.id).await.unwrap();
    assert_eq!(view.chat.order_id, Some(order.id));
    let stored = view.messages.iter().find(|m| m.id == offer.id).unwrap();
    assert_eq!(stored.as_offer().unwrap().status, OfferStatus::Accepted);
}

#[tokio::test]
async fn test_overdue_offer_of_unlinked_order_reads_accepted() {
    let db = setup_db().await;
    let customer = customer();
    let provider = provider();
    let chat = open_chat(&db, &provider, customer.user_id, None).await;
    let offer = send_offer(&db, &provider, chat.id, 500.0, "Install 5kW system").await;
    let offer_ref = offer.offer_ref().unwrap();

    let chat = chat_db::get_chat_by_id(&db, chat.id).await.unwrap().unwrap();
    let order = order_db::insert_order(&db, &chat, offer_ref, offer.as_offer().unwrap())
        .await
        .unwrap();
    messages::Entity::update_many()
        .col_expr(
            messages::Column::ExpiryDate,
            Expr::value(Utc::now() - Duration::minutes(1)),
        )
        .filter(messages::Column::Id.eq(offer.id))
        .exec(&db)
        .await
        .unwrap();

    let view = conversations::get_conversation(&db, &provider, chat.id).await.unwrap();
    assert_eq!(view.chat.order_id, Some(order.id));
    let stored = view.messages.iter().find(|m| m.id == offer.id).unwrap();
    assert_eq!(stored.as_offer().unwrap().status, OfferStatus::Accepted);
}

#[tokio::test]
async fn test_decline_racing_accept_leaves_one_outcome() {
    let db = setup_db().await;
    let customer = customer();
    let provider = provider();
    let chat = open_chat(&db, &provider, customer.user_id, None).await;
    let offer = send_offer(&db, &provider, chat.id, 500.0, "Install 5kW system").await;
    let offer_ref = offer.offer_ref().unwrap();

    let (accepted, declined) = tokio::join!(
        order_svc::accept_offer_and_create_order(&db, &customer, chat.id, offer_ref),
        conversations::decline_offer(&db, &customer, chat.id, offer_ref),
    );
    assert!(
        accepted.is_ok() != declined.is_ok(),
        "expected exactly one winner, got {accepted:?} and {declined:?}"
    );

    let view = conversations::get_conversation(&db, &customer, chat.id).await.unwrap();
    let stored = view.messages.iter().find(|m| m.id == offer.id).unwrap();
    let status = stored.as_offer().unwrap().status;
    let order = order_db::get_order_by_chat_id(&db, chat.id).await.unwrap();

    match accepted {
        Ok(order_created) => {
            assert_eq!(status, OfferStatus::Accepted);
            assert_eq!(order.map(|o| o.id), Some(order_created.id));
            assert_eq!(view.chat.order_id, Some(order_created.id));
        }
        Err(err) => {
            assert!(matches!(err, EngineError::Conflict(_)), "got {err:?}");
            assert_eq!(status, OfferStatus::Declined);
            assert!(order.is_none());
            assert!(view.chat.order_id.is_none());
        }
    }
}

#[tokio::test]
async fn test_order_lifecycle_roles() {
    let db = setup_db().await;
    let customer = customer();
    let provider = provider();
    let order = accepted_order(&db, &customer, &provider).await;

    let update = |status: OrderStatus| UpdateOrderStatus {
        status,
        payment_status: None,
    };

    let err = order_svc::update_order_status(&db, &customer, order.id, update(OrderStatus::InProgress))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = order_svc::update_order_status(&db, &customer, order.id, update(OrderStatus::Completed))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    let started = set_order_status(&db, &provider, order.id, OrderStatus::InProgress).await;
    assert_eq!(started.status, OrderStatus::InProgress);

    // Repeating the current status changes nothing.
    let same = set_order_status(&db, &provider, order.id, OrderStatus::InProgress).await;
    assert_eq!(same.updated_at, started.updated_at);

    let err = order_svc::update_order_status(&db, &provider, order.id, update(OrderStatus::Completed))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let completed = set_order_status(&db, &customer, order.id, OrderStatus::Completed).await;
    assert_eq!(completed.status, OrderStatus::Completed);
    assert!(completed.completed_at.is_some());
    assert_eq!(completed.payment_status, PaymentStatus::ReleasedToProvider);

    for next in [OrderStatus::Cancelled, OrderStatus::InProgress, OrderStatus::PendingAcceptance] {
        let err = order_svc::update_order_status(&db, &admin(), order.id, update(next))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)), "{next:?}");
    }
}

#[tokio::test]
async fn test_either_party_cancels_and_cancel_is_final() {
    let db = setup_db().await;
    let customer = customer();
    let provider = provider();
    let order = accepted_order(&db, &customer, &provider).await;

    let cancelled = set_order_status(&db, &customer, order.id, OrderStatus::Cancelled).await;
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert!(cancelled.completed_at.is_none());

    let err = order_svc::update_order_status(
        &db,
        &provider,
        order.id,
        UpdateOrderStatus {
            status: OrderStatus::InProgress,
            payment_status: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    let stranger = common::provider();
    let err = order_svc::update_order_status(
        &db,
        &stranger,
        order.id,
        UpdateOrderStatus {
            status: OrderStatus::Cancelled,
            payment_status: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn test_only_admin_sets_payment_status() {
    let db = setup_db().await;
    let customer = customer();
    let provider = provider();
    let order = accepted_order(&db, &customer, &provider).await;
    let release = UpdateOrderStatus {
        status: OrderStatus::PendingAcceptance,
        payment_status: Some(PaymentStatus::ReleasedToProvider),
    };

    let err = order_svc::update_order_status(&db, &provider, order.id, release.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let updated = order_svc::update_order_status(&db, &admin(), order.id, release)
        .await
        .unwrap();
    assert_eq!(updated.status, OrderStatus::PendingAcceptance);
    assert_eq!(updated.payment_status, PaymentStatus::ReleasedToProvider);
}

#[tokio::test]
async fn test_proof_of_completion_rules() {
    let db = setup_db().await;
    let customer = customer();
    let provider = provider();
    let order = accepted_order(&db, &customer, &provider).await;
    let url = "https://photos.example.com/install-42.jpg";

    let err = order_svc::attach_proof_of_completion(&db, &provider, order.id, url)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    set_order_status(&db, &provider, order.id, OrderStatus::InProgress).await;

    let err = order_svc::attach_proof_of_completion(&db, &customer, order.id, url)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = order_svc::attach_proof_of_completion(&db, &provider, order.id, "ftp://nope")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let with_proof = order_svc::attach_proof_of_completion(&db, &provider, order.id, url)
        .await
        .unwrap();
    assert_eq!(with_proof.proof_of_completion_url.as_deref(), Some(url));
    assert_eq!(with_proof.status, OrderStatus::InProgress);
}

#[tokio::test]
async fn test_order_visibility_and_listing() {
    let db = setup_db().await;
    let customer = customer();
    let provider = provider();
    let order = accepted_order(&db, &customer, &provider).await;
    let config = config();

    assert!(order_svc::get_order(&db, &config, &customer, order.id).await.is_ok());
    assert!(order_svc::get_order(&db, &config, &provider, order.id).await.is_ok());
    assert!(order_svc::get_order(&db, &config, &admin(), order.id).await.is_ok());

    let stranger = common::customer();
    let err = order_svc::get_order(&db, &config, &stranger, order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let as_provider = order_svc::list_orders_for_user(&db, &provider, provider.user_id, Role::Provider)
        .await
        .unwrap();
    assert_eq!(as_provider.len(), 1);
    let as_customer = order_svc::list_orders_for_user(&db, &provider, provider.user_id, Role::Customer)
        .await
        .unwrap();
    assert!(as_customer.is_empty());

    let err = order_svc::list_orders_for_user(&db, &customer, customer.user_id, Role::Admin)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidArgument(_)));
}
