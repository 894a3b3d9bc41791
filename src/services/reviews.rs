use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::Caller;
use crate::config::EngineConfig;
use crate::db::{orders as order_db, providers as provider_db, reviews as review_db};
use crate::error::{EngineError, EngineResult, is_unique_violation};
use crate::models::orders::OrderStatus;
use crate::models::providers::{ProviderRating, next_rating};
use crate::models::reviews::{self, SubmitReview};
use crate::services::{orders as order_svc, reconcile};

/// Record the customer's review of a completed order and fold its rating
/// into the provider's aggregate.
///
/// The review row is the commit point. Applying the rating and linking the
/// review to the order are retried by the next read of the order if they
/// fail here.
pub async fn submit_review(
    db: &DatabaseConnection,
    config: &EngineConfig,
    caller: &Caller,
    order_id: Uuid,
    input: SubmitReview,
) -> EngineResult<reviews::Model> {
    caller.ensure_active()?;

    let order = order_svc::load_order(db, order_id).await?;
    let order = reconcile::reconcile_order(db, config, order).await?;

    if order.customer_review_id.is_some() {
        return Err(EngineError::conflict("This order has already been reviewed"));
    }
    if caller.user_id != order.customer_id {
        return Err(EngineError::forbidden(
            "Only the order's customer can review it",
        ));
    }
    if order.status != OrderStatus::Completed {
        return Err(EngineError::forbidden(
            "Only completed orders can be reviewed",
        ));
    }
    if !(1..=5).contains(&input.rating) {
        return Err(EngineError::validation("Rating must be between 1 and 5"));
    }

    let comment = input.comment.trim().to_string();
    let review = match review_db::insert_review(db, &order, input.rating, comment).await {
        Ok(review) => review,
        Err(e) if is_unique_violation(&e) => {
            return Err(EngineError::conflict("This order has already been reviewed"));
        }
        Err(e) => return Err(e.into()),
    };

    info!(
        review_id = %review.id,
        %order_id,
        provider_id = %review.provider_id,
        rating = review.rating,
        "review submitted"
    );

    if let Err(e) = apply_rating(db, &review, config.write_retry_attempts).await {
        warn!(review_id = %review.id, error = %e, "rating not applied, left for repair on read");
    }
    if let Err(e) = order_db::set_review_id_if_unset(db, order_id, review.id).await {
        warn!(%order_id, error = %e, "review not linked to order, left for repair on read");
    }

    Ok(review)
}

/// Fold one review into the provider aggregate, exactly once.
///
/// Flipping `rating_applied` and writing the new average happen in one
/// transaction; the aggregate write is guarded by the profile version and
/// retried when another review got there first.
pub async fn apply_rating(
    db: &DatabaseConnection,
    review: &reviews::Model,
    attempts: u32,
) -> EngineResult<()> {
    for attempt in 0..attempts.max(1) {
        let txn = db.begin().await?;

        if review_db::mark_rating_applied(&txn, review.id).await? == 0 {
            txn.rollback().await?;
            debug!(review_id = %review.id, "rating already applied");
            return Ok(());
        }

        let profile = match provider_db::get_profile(&txn, review.provider_id).await? {
            Some(profile) => profile,
            None => match provider_db::insert_profile(&txn, review.provider_id).await {
                Ok(profile) => profile,
                Err(e) if is_unique_violation(&e) => {
                    txn.rollback().await?;
                    debug!(provider_id = %review.provider_id, attempt, "profile created concurrently, retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            },
        };

        let rating = next_rating(profile.rating, profile.total_reviews, review.rating);
        let total_reviews = profile.total_reviews + 1;
        let rows = provider_db::update_profile_if_version(
            &txn,
            review.provider_id,
            profile.version,
            rating,
            total_reviews,
        )
        .await?;

        if rows == 0 {
            txn.rollback().await?;
            debug!(provider_id = %review.provider_id, attempt, "provider rating contended, retrying");
            tokio::task::yield_now().await;
            continue;
        }

        txn.commit().await?;
        info!(provider_id = %review.provider_id, rating, total_reviews, "provider rating updated");
        return Ok(());
    }

    Err(EngineError::conflict(
        "Provider rating is being updated concurrently, retry",
    ))
}

/// Current rating of a provider; 0 over 0 reviews if never rated.
pub async fn get_provider_rating(
    db: &DatabaseConnection,
    provider_id: Uuid,
) -> EngineResult<ProviderRating> {
    Ok(provider_db::get_profile(db, provider_id)
        .await?
        .map(ProviderRating::from)
        .unwrap_or_else(|| ProviderRating::unrated(provider_id)))
}

pub async fn list_reviews_for_provider(
    db: &DatabaseConnection,
    provider_id: Uuid,
) -> EngineResult<Vec<reviews::Model>> {
    Ok(review_db::get_reviews_by_provider(db, provider_id).await?)
}
