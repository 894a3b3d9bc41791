use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Quote status stored as a lowercase string in the database.
///
/// The lifecycle only moves forward: pending → responded → accepted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "responded")]
    Responded,
    #[sea_orm(string_value = "accepted")]
    Accepted,
}

impl QuoteStatus {
    /// Position in the forward-only lifecycle.
    pub fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Responded => 1,
            Self::Accepted => 2,
        }
    }

    /// Whether moving from `self` to `next` would go backwards.
    pub fn regresses_to(self, next: QuoteStatus) -> bool {
        next.rank() < self.rank()
    }
}

/// SeaORM entity for the `quotes` table.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quotes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub customer_id: Uuid,
    pub provider_id: Uuid,
    pub service_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub property_type: Option<String>,
    pub roof_type: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub message: Option<String>,
    pub status: QuoteStatus,
    pub chat_id: Option<Uuid>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::chats::Entity")]
    Chats,
}

impl Related<super::chats::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Chats.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// ── DTOs ──

/// Customer-supplied intake fields captured with the quote request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuoteIntake {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub property_type: Option<String>,
    pub roof_type: Option<String>,
    pub message: Option<String>,
}

/// Request body for `POST /api/quotes`.
///
/// Ids are optional at the type level so that a missing field surfaces as a
/// validation error rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateQuote {
    pub customer_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    #[serde(flatten)]
    pub intake: QuoteIntake,
}

/// Query parameters for `GET /api/quotes`.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteListQuery {
    pub role: Option<super::users::Role>,
}

/// Validated input for inserting a quote (built by the quote ledger).
#[derive(Debug, Clone)]
pub struct NewQuote {
    pub customer_id: Uuid,
    pub provider_id: Uuid,
    pub service_id: Uuid,
    pub name: String,
    pub intake: QuoteIntake,
}
