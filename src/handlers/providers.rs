use actix_web::{HttpResponse, web};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedUser;
use crate::error::EngineError;
use crate::services::reviews as review_svc;

/// `GET /api/providers/{id}/rating`
pub async fn get_rating(
    _user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, EngineError> {
    let rating = review_svc::get_provider_rating(db.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(rating))
}

/// `GET /api/providers/{id}/reviews`: newest first.
pub async fn get_reviews(
    _user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, EngineError> {
    let reviews = review_svc::list_reviews_for_provider(db.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(reviews))
}
