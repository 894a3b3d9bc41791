use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Identifiers for the `chats` table and its columns.
#[derive(DeriveIden)]
enum Chats {
    Table,
    Id,
    CustomerId,
    ProviderId,
    ParticipantLow,
    ParticipantHigh,
    QuoteId,
    QuoteScope,
    ServiceId,
    OrderId,
    MessageCount,
    CreatedAt,
    UpdatedAt,
    LastMessageAt,
}

/// Re-declare parent table identifiers for foreign-key references.
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
                    .table(Chats::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Chats::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Chats::CustomerId).uuid().not_null())
                    .col(ColumnDef::new(Chats::ProviderId).uuid().not_null())
                    .col(ColumnDef::new(Chats::ParticipantLow).uuid().not_null())
                    .col(ColumnDef::new(Chats::ParticipantHigh).uuid().not_null())
                    .col(ColumnDef::new(Chats::QuoteId).uuid().null())
                    .col(ColumnDef::new(Chats::QuoteScope).uuid().not_null())
                    .col(ColumnDef::new(Chats::ServiceId).uuid().null())
                    .col(ColumnDef::new(Chats::OrderId).uuid().null())
                    .col(
                        ColumnDef::new(Chats::MessageCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Chats::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Chats::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Chats::LastMessageAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chats_quote_id")
                            .from(Chats::Table, Chats::QuoteId)
                            .to(Quotes::Table, Quotes::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One conversation per canonical pair and quote scope; concurrent
        // find-or-create calls collide here and re-read the winner.
        manager
            .create_index(
                Index::create()
                    .name("idx_chats_pair_scope_unique")
                    .table(Chats::Table)
                    .col(Chats::ParticipantLow)
                    .col(Chats::ParticipantHigh)
                    .col(Chats::QuoteScope)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Chats::Table).to_owned())
            .await
    }
}
