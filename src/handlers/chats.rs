use actix_web::{HttpResponse, web};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedUser;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::models::chats::OpenConversation;
use crate::models::messages::{NewMessage, OfferAction};
use crate::services::{conversations as conversation_svc, orders as order_svc};

/// `POST /api/chats`: the provider opens (or reopens) the conversation with a
/// customer, optionally scoped to a quote.
///
/// Responds 201 when the conversation was created by this call, 200 when it
/// already existed.
pub async fn open_chat(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    config: web::Data<EngineConfig>,
    body: web::Json<OpenConversation>,
) -> Result<HttpResponse, EngineError> {
    let opened = conversation_svc::find_or_create_conversation(
        db.get_ref(),
        config.get_ref(),
        &user.0,
        body.into_inner(),
    )
    .await?;

    if opened.created {
        Ok(HttpResponse::Created().json(opened))
    } else {
        Ok(HttpResponse::Ok().json(opened))
    }
}

/// `GET /api/chats`
pub async fn list_chats(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, EngineError> {
    let chats = conversation_svc::list_conversations_for_user(db.get_ref(), &user.0).await?;
    Ok(HttpResponse::Ok().json(chats))
}

/// `GET /api/chats/{id}`: the conversation with its full message timeline.
pub async fn get_chat(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, EngineError> {
    let view = conversation_svc::get_conversation(db.get_ref(), &user.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// `POST /api/chats/{id}/messages`: body is `{"type": "text", "body": ...}`
/// or `{"type": "offer", "amount": ..., "description": ..., "expiry_date": ...}`.
pub async fn send_message(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
    body: web::Json<NewMessage>,
) -> Result<HttpResponse, EngineError> {
    let message = conversation_svc::append_message(
        db.get_ref(),
        &user.0,
        path.into_inner(),
        body.into_inner(),
    )
    .await?;

    Ok(HttpResponse::Created().json(message))
}

/// `POST /api/chats/{id}/offers/accept`: the recipient accepts an offer,
/// which creates the conversation's order.
///
/// A repeated acceptance answers 409 with the existing order in the body.
pub async fn accept_offer(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
    body: web::Json<OfferAction>,
) -> Result<HttpResponse, EngineError> {
    let order = order_svc::accept_offer_and_create_order(
        db.get_ref(),
        &user.0,
        path.into_inner(),
        body.into_inner().into(),
    )
    .await?;

    Ok(HttpResponse::Created().json(order))
}

/// `POST /api/chats/{id}/offers/decline`
pub async fn decline_offer(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
    body: web::Json<OfferAction>,
) -> Result<HttpResponse, EngineError> {
    let message = conversation_svc::decline_offer(
        db.get_ref(),
        &user.0,
        path.into_inner(),
        body.into_inner().into(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(message))
}
