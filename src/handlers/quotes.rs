use actix_web::{HttpResponse, web};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedUser;
use crate::error::EngineError;
use crate::models::quotes::{CreateQuote, QuoteListQuery};
use crate::services::quotes as quote_svc;

/// `POST /api/quotes`: a customer requests a quote from a provider.
///
/// `customer_id` defaults to the caller.
pub async fn create_quote(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    body: web::Json<CreateQuote>,
) -> Result<HttpResponse, EngineError> {
    let caller = user.0;
    let mut input = body.into_inner();
    input.customer_id.get_or_insert(caller.user_id);

    let quote = quote_svc::create_quote(db.get_ref(), &caller, input).await?;
    Ok(HttpResponse::Created().json(quote))
}

/// `GET /api/quotes?role=customer|provider`: the caller's quotes, newest
/// first. The role defaults to the caller's own.
pub async fn list_quotes(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    query: web::Query<QuoteListQuery>,
) -> Result<HttpResponse, EngineError> {
    let caller = user.0;
    let role = query.role.unwrap_or(caller.role);

    let quotes = quote_svc::list_quotes_for_user(db.get_ref(), &caller, caller.user_id, role).await?;
    Ok(HttpResponse::Ok().json(quotes))
}

/// `GET /api/quotes/{id}`
pub async fn get_quote(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, EngineError> {
    let quote = quote_svc::get_quote(db.get_ref(), &user.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(quote))
}
