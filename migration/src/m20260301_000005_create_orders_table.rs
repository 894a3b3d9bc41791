use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Identifiers for the `orders` table and its columns.
#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    CustomerId,
    ProviderId,
    ServiceId,
    QuoteId,
    ChatId,
    OfferSenderId,
    OfferSeq,
    OfferAmount,
    OfferDescription,
    OfferExpiryDate,
    Status,
    PaymentStatus,
    ProofOfCompletionUrl,
    CustomerReviewId,
    CreatedAt,
    UpdatedAt,
    CompletedAt,
}

/// Re-declare parent table identifiers for foreign-key references.
#[derive(DeriveIden)]
enum Chats {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Quotes {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Orders::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Orders::CustomerId).uuid().not_null())
                    .col(ColumnDef::new(Orders::ProviderId).uuid().not_null())
                    .col(ColumnDef::new(Orders::ServiceId).uuid().null())
                    .col(ColumnDef::new(Orders::QuoteId).uuid().null())
                    .col(ColumnDef::new(Orders::ChatId).uuid().not_null())
                    .col(ColumnDef::new(Orders::OfferSenderId).uuid().not_null())
                    .col(ColumnDef::new(Orders::OfferSeq).big_integer().not_null())
                    .col(ColumnDef::new(Orders::OfferAmount).double().not_null())
                    .col(ColumnDef::new(Orders::OfferDescription).text().not_null())
                    .col(
                        ColumnDef::new(Orders::OfferExpiryDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Orders::Status).string().not_null())
                    .col(ColumnDef::new(Orders::PaymentStatus).string().not_null())
                    .col(ColumnDef::new(Orders::ProofOfCompletionUrl).string().null())
                    .col(ColumnDef::new(Orders::CustomerReviewId).uuid().null())
                    .col(
                        ColumnDef::new(Orders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Orders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Orders::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_chat_id")
                            .from(Orders::Table, Orders::ChatId)
                            .to(Chats::Table, Chats::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_quote_id")
                            .from(Orders::Table, Orders::QuoteId)
                            .to(Quotes::Table, Quotes::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // At most one order per conversation. Two concurrent acceptances race
        // on this index and the loser reads back the winner.
        manager
            .create_index(
                Index::create()
                    .name("idx_orders_chat_id_unique")
                    .table(Orders::Table)
                    .col(Orders::ChatId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await
    }
}
