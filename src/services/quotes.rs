use sea_orm::DatabaseConnection;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::Caller;
use crate::db::quotes as quote_db;
use crate::error::{EngineError, EngineResult};
use crate::models::quotes::{self, CreateQuote, NewQuote, QuoteStatus};
use crate::models::users::Role;
use crate::services::reconcile;

/// A quote has three states, so at most two competing writers can move it
/// between our read and our write.
const STATUS_WRITE_ATTEMPTS: usize = 3;

/// Record a customer's quote request to a provider.
pub async fn create_quote(
    db: &DatabaseConnection,
    caller: &Caller,
    input: CreateQuote,
) -> EngineResult<quotes::Model> {
    caller.ensure_active()?;

    let customer_id = input
        .customer_id
        .ok_or_else(|| EngineError::validation("customer_id is required"))?;
    let provider_id = input
        .provider_id
        .ok_or_else(|| EngineError::validation("provider_id is required"))?;
    let service_id = input
        .service_id
        .ok_or_else(|| EngineError::validation("service_id is required"))?;
    let name = input
        .intake
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| EngineError::validation("name is required"))?
        .to_string();

    if customer_id == provider_id {
        return Err(EngineError::validation(
            "A quote cannot be requested from yourself",
        ));
    }
    if !caller.acts_for(customer_id) {
        return Err(EngineError::forbidden(
            "You can only request quotes for yourself",
        ));
    }

    let quote = quote_db::insert_quote(
        db,
        NewQuote {
            customer_id,
            provider_id,
            service_id,
            name,
            intake: input.intake,
        },
    )
    .await?;

    info!(quote_id = %quote.id, %customer_id, %provider_id, "quote created");
    Ok(quote)
}

/// Fetch a quote without any access check or repair.
pub async fn load_quote(db: &DatabaseConnection, id: Uuid) -> EngineResult<quotes::Model> {
    quote_db::get_quote_by_id(db, id)
        .await?
        .ok_or_else(|| EngineError::not_found(format!("Quote {id}")))
}

/// Read a quote, repairing its status first if it lags behind the
/// conversation or order that reference it.
pub async fn get_quote(
    db: &DatabaseConnection,
    caller: &Caller,
    id: Uuid,
) -> EngineResult<quotes::Model> {
    caller.ensure_active()?;

    let quote = load_quote(db, id).await?;
    if !caller.is_admin() && caller.user_id != quote.customer_id && caller.user_id != quote.provider_id
    {
        return Err(EngineError::forbidden(
            "You can only view quotes you are involved in",
        ));
    }

    reconcile::reconcile_quote(db, quote).await
}

/// Move a quote forward, writing only status, chat_id and updated_at.
///
/// Repeating the current status is a no-op; going backwards is a conflict.
pub async fn update_quote_status(
    db: &DatabaseConnection,
    id: Uuid,
    next: QuoteStatus,
    chat_id: Option<Uuid>,
) -> EngineResult<quotes::Model> {
    for _ in 0..STATUS_WRITE_ATTEMPTS {
        let quote = load_quote(db, id).await?;

        if let (Some(current), Some(requested)) = (quote.chat_id, chat_id) {
            if current != requested {
                return Err(EngineError::conflict(format!(
                    "Quote {id} is already linked to conversation {current}"
                )));
            }
        }
        if quote.status == next {
            debug!(quote_id = %id, status = ?next, "quote already in requested status");
            return Ok(quote);
        }
        if quote.status.regresses_to(next) {
            return Err(EngineError::conflict(format!(
                "Quote {id} is already {:?} and cannot move back to {:?}",
                quote.status, next
            )));
        }
        if quote.chat_id.is_none() && chat_id.is_none() {
            return Err(EngineError::validation(
                "A conversation id is required once a quote leaves pending",
            ));
        }

        let link = if quote.chat_id.is_none() { chat_id } else { None };
        if quote_db::set_status_if(db, id, quote.status, next, link).await? == 1 {
            info!(quote_id = %id, from = ?quote.status, to = ?next, "quote status updated");
            return load_quote(db, id).await;
        }
        debug!(quote_id = %id, "quote changed concurrently, re-reading");
    }

    Err(EngineError::conflict(format!(
        "Quote {id} changed concurrently, retry"
    )))
}

/// List the quotes a user requested (customer) or received (provider),
/// newest first.
pub async fn list_quotes_for_user(
    db: &DatabaseConnection,
    caller: &Caller,
    user_id: Uuid,
    role: Role,
) -> EngineResult<Vec<quotes::Model>> {
    caller.ensure_active()?;
    if !caller.acts_for(user_id) {
        return Err(EngineError::forbidden("You can only list your own quotes"));
    }

    let rows = match role {
        Role::Customer => quote_db::get_quotes_by_customer(db, user_id).await?,
        Role::Provider => quote_db::get_quotes_by_provider(db, user_id).await?,
        Role::Admin => {
            return Err(EngineError::InvalidArgument(
                "role must be customer or provider".to_string(),
            ));
        }
    };

    let mut quotes = Vec::with_capacity(rows.len());
    for quote in rows {
        quotes.push(reconcile::reconcile_quote(db, quote).await?);
    }
    Ok(quotes)
}
