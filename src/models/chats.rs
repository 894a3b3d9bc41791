use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::messages::Message;

/// SeaORM entity for the `chats` table.
///
/// `participant_low`/`participant_high` hold the customer and provider ids in
/// sorted order so a pair maps to the same row regardless of argument order.
/// `quote_scope` is the quote id, or the nil UUID for an unscoped chat.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chats")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub customer_id: Uuid,
    pub provider_id: Uuid,
    pub participant_low: Uuid,
    pub participant_high: Uuid,
    pub quote_id: Option<Uuid>,
    #[serde(skip)]
    pub quote_scope: Uuid,
    pub service_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub message_count: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub last_message_at: DateTimeUtc,
}

impl Model {
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.participant_low == user_id || self.participant_high == user_id
    }

    /// The participant on the other side of `user_id`, if `user_id` is one.
    pub fn counterpart_of(&self, user_id: Uuid) -> Option<Uuid> {
        if self.participant_low == user_id {
            Some(self.participant_high)
        } else if self.participant_high == user_id {
            Some(self.participant_low)
        } else {
            None
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::quotes::Entity",
        from = "Column::QuoteId",
        to = "super::quotes::Column::Id"
    )]
    Quote,
    #[sea_orm(has_many = "super::messages::Entity")]
    Messages,
}

impl Related<super::quotes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Quote.def()
    }
}

impl Related<super::messages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Canonical (sorted) form of a participant pair.
pub fn canonical_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b { (a, b) } else { (b, a) }
}

// ── DTOs ──

/// Request body for `POST /api/chats`.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenConversation {
    pub customer_id: Uuid,
    pub provider_id: Uuid,
    pub quote_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
}

/// Result of find-or-create: the conversation and whether it was created now.
#[derive(Debug, Clone, Serialize)]
pub struct OpenedConversation {
    pub chat: Model,
    pub created: bool,
}

/// A conversation together with its ordered message timeline.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationView {
    pub chat: Model,
    pub messages: Vec<Message>,
}

/// Row of the conversations list.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub chat_id: Uuid,
    pub other_user_id: Uuid,
    pub quote_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub message_count: i64,
    pub last_message_at: DateTimeUtc,
}

impl ConversationSummary {
    pub fn for_user(chat: &Model, user_id: Uuid) -> Option<Self> {
        Some(Self {
            chat_id: chat.id,
            other_user_id: chat.counterpart_of(user_id)?,
            quote_id: chat.quote_id,
            order_id: chat.order_id,
            message_count: chat.message_count,
            last_message_at: chat.last_message_at,
        })
    }
}
