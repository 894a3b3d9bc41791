use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Which variant a `messages` row stores.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    #[sea_orm(string_value = "text")]
    Text,
    #[sea_orm(string_value = "offer")]
    Offer,
}

/// Offer lifecycle: `pending` moves exactly once to one of the terminal states.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "accepted")]
    Accepted,
    #[sea_orm(string_value = "declined")]
    Declined,
    #[sea_orm(string_value = "expired")]
    Expired,
}

impl OfferStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// SeaORM entity for the `messages` table.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "messages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub chat_id: Uuid,
    pub seq: i64,
    pub sender_id: Uuid,
    pub kind: MessageKind,
    #[sea_orm(column_type = "Text", nullable)]
    pub body: Option<String>,
    #[sea_orm(column_type = "Double", nullable)]
    pub amount: Option<f64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub expiry_date: Option<DateTimeUtc>,
    pub offer_status: Option<OfferStatus>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::chats::Entity",
        from = "Column::ChatId",
        to = "super::chats::Column::Id"
    )]
    Chat,
}

impl Related<super::chats::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Chat.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// ── Domain view ──

/// Address of an offer inside a conversation: who sent it and at which
/// position of the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferRef {
    pub sender_id: Uuid,
    pub seq: i64,
}

/// Offer payload as proposed by the sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub amount: f64,
    pub description: String,
    pub expiry_date: Option<DateTimeUtc>,
    pub status: OfferStatus,
}

impl Offer {
    pub fn is_overdue(&self, now: DateTimeUtc) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry <= now)
    }
}

/// Message payload, one variant per message type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageBody {
    Text { body: String },
    Offer(Offer),
}

/// A message of a conversation timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub seq: i64,
    pub sender_id: Uuid,
    pub created_at: DateTimeUtc,
    #[serde(flatten)]
    pub body: MessageBody,
}

impl Message {
    pub fn offer_ref(&self) -> Option<OfferRef> {
        match self.body {
            MessageBody::Offer(_) => Some(OfferRef {
                sender_id: self.sender_id,
                seq: self.seq,
            }),
            MessageBody::Text { .. } => None,
        }
    }

    pub fn as_offer(&self) -> Option<&Offer> {
        match &self.body {
            MessageBody::Offer(offer) => Some(offer),
            MessageBody::Text { .. } => None,
        }
    }
}

impl TryFrom<Model> for Message {
    type Error = DbErr;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        let body = match m.kind {
            MessageKind::Text => MessageBody::Text {
                body: m.body.unwrap_or_default(),
            },
            MessageKind::Offer => {
                let (Some(amount), Some(description), Some(status)) =
                    (m.amount, m.description, m.offer_status)
                else {
                    return Err(DbErr::Custom(format!(
                        "Offer message {} is missing offer columns",
                        m.id
                    )));
                };
                MessageBody::Offer(Offer {
                    amount,
                    description,
                    expiry_date: m.expiry_date,
                    status,
                })
            }
        };

        Ok(Self {
            id: m.id,
            chat_id: m.chat_id,
            seq: m.seq,
            sender_id: m.sender_id,
            created_at: m.created_at,
            body,
        })
    }
}

// ── DTOs ──

/// Request body for `POST /api/chats/{id}/messages`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NewMessage {
    Text {
        body: String,
    },
    Offer {
        amount: f64,
        description: String,
        expiry_date: Option<chrono::DateTime<chrono::Utc>>,
    },
}

/// Request body for the offer accept/decline endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct OfferAction {
    pub sender_id: Uuid,
    pub seq: i64,
}

impl From<OfferAction> for OfferRef {
    fn from(a: OfferAction) -> Self {
        Self {
            sender_id: a.sender_id,
            seq: a.seq,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer_row(status: Option<OfferStatus>) -> Model {
        let now = chrono::Utc::now();
        Model {
            id: Uuid::new_v4(),
            chat_id: Uuid::new_v4(),
            seq: 3,
            sender_id: Uuid::new_v4(),
            kind: MessageKind::Offer,
            body: None,
            amount: Some(500.0),
            description: Some("Install 5kW system".to_string()),
            expiry_date: None,
            offer_status: status,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_offer_row_converts_to_offer_variant() {
        let row = offer_row(Some(OfferStatus::Pending));
        let sender = row.sender_id;
        let msg = Message::try_from(row).unwrap();

        assert_eq!(msg.offer_ref(), Some(OfferRef { sender_id: sender, seq: 3 }));
        let offer = msg.as_offer().unwrap();
        assert_eq!(offer.amount, 500.0);
        assert_eq!(offer.status, OfferStatus::Pending);
    }

    #[test]
    fn test_offer_row_without_status_is_rejected() {
        assert!(Message::try_from(offer_row(None)).is_err());
    }

    #[test]
    fn test_message_serializes_with_type_tag() {
        let now = chrono::Utc::now();
        let msg = Message {
            id: Uuid::new_v4(),
            chat_id: Uuid::new_v4(),
            seq: 1,
            sender_id: Uuid::new_v4(),
            created_at: now,
            body: MessageBody::Text {
                body: "hello".to_string(),
            },
        };

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["body"], "hello");
        assert!(msg.offer_ref().is_none());
    }

    #[test]
    fn test_offer_overdue_only_after_expiry() {
        let now = chrono::Utc::now();
        let offer = Offer {
            amount: 10.0,
            description: "panel cleaning".to_string(),
            expiry_date: Some(now + chrono::Duration::hours(1)),
            status: OfferStatus::Pending,
        };
        assert!(!offer.is_overdue(now));
        assert!(offer.is_overdue(now + chrono::Duration::hours(2)));
    }
}
