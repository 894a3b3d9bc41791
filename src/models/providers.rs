use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// SeaORM entity for the `provider_profiles` table: the rolling rating
/// aggregate of a provider.
///
/// `version` is bumped on every write and guards updates (optimistic
/// concurrency), since several reviews for one provider may land at once.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "provider_profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub provider_id: Uuid,
    #[sea_orm(column_type = "Double")]
    pub rating: f64,
    pub total_reviews: i32,
    #[serde(skip_serializing)]
    pub version: i64,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Public rating of a provider. A provider without reviews reads as 0 over 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderRating {
    pub provider_id: Uuid,
    pub rating: f64,
    pub total_reviews: i32,
}

impl ProviderRating {
    pub fn unrated(provider_id: Uuid) -> Self {
        Self {
            provider_id,
            rating: 0.0,
            total_reviews: 0,
        }
    }
}

impl From<Model> for ProviderRating {
    fn from(m: Model) -> Self {
        Self {
            provider_id: m.provider_id,
            rating: m.rating,
            total_reviews: m.total_reviews,
        }
    }
}

/// Running average with one more rating, rounded to one decimal place.
pub fn next_rating(old_rating: f64, old_count: i32, rating: i32) -> f64 {
    let count = f64::from(old_count);
    let raw = (old_rating * count + f64::from(rating)) / (count + 1.0);
    round_one_decimal(raw)
}

pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_rating_is_the_rating_itself() {
        assert_eq!(next_rating(0.0, 0, 4), 4.0);
    }

    #[test]
    fn test_running_average_rounds_to_one_decimal() {
        // (4.5 * 10 + 4) / 11 = 4.4545...
        assert_eq!(next_rating(4.5, 10, 4), 4.5);
        // (4.0 * 2 + 5) / 3 = 4.333...
        assert_eq!(next_rating(4.0, 2, 5), 4.3);
    }
}
