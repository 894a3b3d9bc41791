#![allow(dead_code)]

use chrono::Duration;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use uuid::Uuid;

use solar_marketplace_backend::auth::Caller;
use solar_marketplace_backend::config::EngineConfig;
use solar_marketplace_backend::models::chats::{self, OpenConversation};
use solar_marketplace_backend::models::messages::{Message, NewMessage};
use solar_marketplace_backend::models::orders::{self, OrderStatus, UpdateOrderStatus};
use solar_marketplace_backend::models::quotes::{self, CreateQuote, QuoteIntake};
use solar_marketplace_backend::models::users::Role;
use solar_marketplace_backend::services::{conversations, orders as order_svc, quotes as quote_svc};

/// Fresh in-memory SQLite database with the full schema.
///
/// A single connection keeps every query on the same in-memory database.
pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options)
        .await
        .expect("Failed to open SQLite database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

pub fn config() -> EngineConfig {
    EngineConfig::default()
}

pub fn caller(role: Role) -> Caller {
    Caller::new(Uuid::new_v4(), role, Duration::minutes(5))
}

pub fn customer() -> Caller {
    caller(Role::Customer)
}

pub fn provider() -> Caller {
    caller(Role::Provider)
}

pub fn admin() -> Caller {
    caller(Role::Admin)
}

pub async fn request_quote(
    db: &DatabaseConnection,
    customer: &Caller,
    provider_id: Uuid,
) -> quotes::Model {
    let input = CreateQuote {
        customer_id: Some(customer.user_id),
        provider_id: Some(provider_id),
        service_id: Some(Uuid::new_v4()),
        intake: QuoteIntake {
            name: Some("Casey Rooftop".to_string()),
            email: Some("casey@example.com".to_string()),
            address: Some("12 Sunny Lane".to_string()),
            roof_type: Some("tile".to_string()),
            ..Default::default()
        },
    };

    quote_svc::create_quote(db, customer, input)
        .await
        .expect("Failed to create quote")
}

pub async fn open_chat(
    db: &DatabaseConnection,
    provider: &Caller,
    customer_id: Uuid,
    quote_id: Option<Uuid>,
) -> chats::Model {
    let request = OpenConversation {
        customer_id,
        provider_id: provider.user_id,
        quote_id,
        service_id: None,
    };

    conversations::find_or_create_conversation(db, &config(), provider, request)
        .await
        .expect("Failed to open conversation")
        .chat
}

pub async fn send_text(
    db: &DatabaseConnection,
    sender: &Caller,
    chat_id: Uuid,
    body: &str,
) -> Message {
    let content = NewMessage::Text {
        body: body.to_string(),
    };
    conversations::append_message(db, sender, chat_id, content)
        .await
        .expect("Failed to send message")
}

pub async fn send_offer(
    db: &DatabaseConnection,
    provider: &Caller,
    chat_id: Uuid,
    amount: f64,
    description: &str,
) -> Message {
    let content = NewMessage::Offer {
        amount,
        description: description.to_string(),
        expiry_date: Some(chrono::Utc::now() + Duration::days(7)),
    };
    conversations::append_message(db, provider, chat_id, content)
        .await
        .expect("Failed to send offer")
}

/// Quote → chat → offer → accepted order, returning the order.
pub async fn accepted_order(
    db: &DatabaseConnection,
    customer: &Caller,
    provider: &Caller,
) -> orders::Model {
    let quote = request_quote(db, customer, provider.user_id).await;
    let chat = open_chat(db, provider, customer.user_id, Some(quote.id)).await;
    let offer = send_offer(db, provider, chat.id, 500.0, "Install 5kW system").await;

    order_svc::accept_offer_and_create_order(
        db,
        customer,
        chat.id,
        offer.offer_ref().expect("offer has a ref"),
    )
    .await
    .expect("Failed to accept offer")
}

pub async fn set_order_status(
    db: &DatabaseConnection,
    caller: &Caller,
    order_id: Uuid,
    status: OrderStatus,
) -> orders::Model {
    order_svc::update_order_status(
        db,
        caller,
        order_id,
        UpdateOrderStatus {
            status,
            payment_status: None,
        },
    )
    .await
    .expect("Failed to update order status")
}

/// An accepted order driven through in_progress to completed.
pub async fn completed_order(
    db: &DatabaseConnection,
    customer: &Caller,
    provider: &Caller,
) -> orders::Model {
    let order = accepted_order(db, customer, provider).await;
    set_order_status(db, provider, order.id, OrderStatus::InProgress).await;
    set_order_status(db, customer, order.id, OrderStatus::Completed).await
}
