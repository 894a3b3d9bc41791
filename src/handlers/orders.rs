use actix_web::{HttpResponse, web};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedUser;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::models::orders::{AttachProof, OrderListQuery, UpdateOrderStatus};
use crate::models::reviews::SubmitReview;
use crate::services::{orders as order_svc, reviews as review_svc};

/// `GET /api/orders?role=customer|provider`
pub async fn list_orders(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    query: web::Query<OrderListQuery>,
) -> Result<HttpResponse, EngineError> {
    let caller = user.0;
    let role = query.role.unwrap_or(caller.role);

    let orders = order_svc::list_orders_for_user(db.get_ref(), &caller, caller.user_id, role).await?;
    Ok(HttpResponse::Ok().json(orders))
}

/// `GET /api/orders/{id}`
pub async fn get_order(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    config: web::Data<EngineConfig>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, EngineError> {
    let order =
        order_svc::get_order(db.get_ref(), config.get_ref(), &user.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(order))
}

/// `PUT /api/orders/{id}/status`
///
/// The provider starts the work, the customer confirms completion, either
/// may cancel.
pub async fn update_status(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateOrderStatus>,
) -> Result<HttpResponse, EngineError> {
    let order = order_svc::update_order_status(
        db.get_ref(),
        &user.0,
        path.into_inner(),
        body.into_inner(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(order))
}

/// `PUT /api/orders/{id}/proof`
pub async fn attach_proof(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
    body: web::Json<AttachProof>,
) -> Result<HttpResponse, EngineError> {
    let order =
        order_svc::attach_proof_of_completion(db.get_ref(), &user.0, path.into_inner(), &body.url)
            .await?;
    Ok(HttpResponse::Ok().json(order))
}

/// `POST /api/orders/{id}/review`: the customer rates a completed order.
pub async fn submit_review(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    config: web::Data<EngineConfig>,
    path: web::Path<Uuid>,
    body: web::Json<SubmitReview>,
) -> Result<HttpResponse, EngineError> {
    let review = review_svc::submit_review(
        db.get_ref(),
        config.get_ref(),
        &user.0,
        path.into_inner(),
        body.into_inner(),
    )
    .await?;

    Ok(HttpResponse::Created().json(review))
}
