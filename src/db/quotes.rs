use sea_orm::prelude::Expr;
use sea_orm::*;
use uuid::Uuid;

use crate::models::quotes::{self, NewQuote, QuoteStatus};

/// Insert a new quote (always pending, no chat yet).
pub async fn insert_quote(db: &DatabaseConnection, input: NewQuote) -> Result<quotes::Model, DbErr> {
    let now = chrono::Utc::now();
    let new_quote = quotes::ActiveModel {
        id: Set(Uuid::new_v4()),
        customer_id: Set(input.customer_id),
        provider_id: Set(input.provider_id),
        service_id: Set(input.service_id),
        name: Set(input.name),
        email: Set(input.intake.email),
        phone: Set(input.intake.phone),
        address: Set(input.intake.address),
        property_type: Set(input.intake.property_type),
        roof_type: Set(input.intake.roof_type),
        message: Set(input.intake.message),
        status: Set(QuoteStatus::Pending),
        chat_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };

    new_quote.insert(db).await
}

/// Fetch a single quote by ID.
pub async fn get_quote_by_id(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<quotes::Model>, DbErr> {
    quotes::Entity::find_by_id(id).one(db).await
}

/// Fetch all quotes requested by a customer, newest first.
pub async fn get_quotes_by_customer(
    db: &DatabaseConnection,
    customer_id: Uuid,
) -> Result<Vec<quotes::Model>, DbErr> {
    quotes::Entity::find()
        .filter(quotes::Column::CustomerId.eq(customer_id))
        .order_by_desc(quotes::Column::CreatedAt)
        .all(db)
        .await
}

/// Fetch all quotes addressed to a provider, newest first.
pub async fn get_quotes_by_provider(
    db: &DatabaseConnection,
    provider_id: Uuid,
) -> Result<Vec<quotes::Model>, DbErr> {
    quotes::Entity::find()
        .filter(quotes::Column::ProviderId.eq(provider_id))
        .order_by_desc(quotes::Column::CreatedAt)
        .all(db)
        .await
}

/// Move a quote from `expected` to `next`, touching only status, chat_id and
/// updated_at. Returns the number of rows changed (0 when the quote is no
/// longer in `expected`).
pub async fn set_status_if(
    db: &DatabaseConnection,
    id: Uuid,
    expected: QuoteStatus,
    next: QuoteStatus,
    chat_id: Option<Uuid>,
) -> Result<u64, DbErr> {
    let mut update = quotes::Entity::update_many()
        .col_expr(quotes::Column::Status, Expr::value(next))
        .col_expr(quotes::Column::UpdatedAt, Expr::value(chrono::Utc::now()));

    if let Some(chat_id) = chat_id {
        update = update.col_expr(quotes::Column::ChatId, Expr::value(chat_id));
    }

    let result = update
        .filter(quotes::Column::Id.eq(id))
        .filter(quotes::Column::Status.eq(expected))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}
