use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Order status stored as a lowercase string in the database.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending_acceptance")]
    PendingAcceptance,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Transition table: pending_acceptance → in_progress → completed, with
    /// `cancelled` reachable from any non-terminal state.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (_, Cancelled) => true,
            (PendingAcceptance, InProgress) => true,
            (InProgress, Completed) => true,
            _ => false,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "released_to_provider")]
    ReleasedToProvider,
}

/// SeaORM entity for the `orders` table.
///
/// The `offer_*` columns are a copy of the accepted offer taken at acceptance
/// time; later edits to the message never reach the order.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub customer_id: Uuid,
    pub provider_id: Uuid,
    pub service_id: Option<Uuid>,
    pub quote_id: Option<Uuid>,
    #[sea_orm(unique)]
    pub chat_id: Uuid,
    pub offer_sender_id: Uuid,
    pub offer_seq: i64,
    #[sea_orm(column_type = "Double")]
    pub offer_amount: f64,
    #[sea_orm(column_type = "Text")]
    pub offer_description: String,
    pub offer_expiry_date: Option<DateTimeUtc>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub proof_of_completion_url: Option<String>,
    pub customer_review_id: Option<Uuid>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub completed_at: Option<DateTimeUtc>,
}

impl Model {
    pub fn is_party(&self, user_id: Uuid) -> bool {
        self.customer_id == user_id || self.provider_id == user_id
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::chats::Entity",
        from = "Column::ChatId",
        to = "super::chats::Column::Id"
    )]
    Chat,
    #[sea_orm(
        belongs_to = "super::quotes::Entity",
        from = "Column::QuoteId",
        to = "super::quotes::Column::Id"
    )]
    Quote,
    #[sea_orm(has_one = "super::reviews::Entity")]
    Review,
}

impl Related<super::chats::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Chat.def()
    }
}

impl Related<super::quotes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Quote.def()
    }
}

impl Related<super::reviews::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Review.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// ── DTOs ──

/// Request body for `PUT /api/orders/{id}/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateOrderStatus {
    pub status: OrderStatus,
    /// Only admins may set this directly; completion releases payment on its own.
    pub payment_status: Option<PaymentStatus>,
}

/// Request body for `PUT /api/orders/{id}/proof`.
#[derive(Debug, Clone, Deserialize)]
pub struct AttachProof {
    pub url: String,
}

/// Query parameters for `GET /api/orders`.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderListQuery {
    pub role: Option<super::users::Role>,
}
