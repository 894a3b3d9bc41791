use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Identifiers for the `quotes` table and its columns.
///
/// `customer_id` and `provider_id` reference identities owned by the external
/// auth provider, so they carry no foreign key.
#[derive(DeriveIden)]
enum Quotes {
    Table,
    Id,
    CustomerId,
    ProviderId,
    ServiceId,
    Name,
    Email,
    Phone,
    Address,
    PropertyType,
    RoofType,
    Message,
    Status,
    ChatId,
    CreatedAt,
    UpdatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Quotes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Quotes::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Quotes::CustomerId).uuid().not_null())
                    .col(ColumnDef::new(Quotes::ProviderId).uuid().not_null())
                    .col(ColumnDef::new(Quotes::ServiceId).uuid().not_null())
                    .col(ColumnDef::new(Quotes::Name).string().not_null())
                    .col(ColumnDef::new(Quotes::Email).string().null())
                    .col(ColumnDef::new(Quotes::Phone).string().null())
                    .col(ColumnDef::new(Quotes::Address).string().null())
                    .col(ColumnDef::new(Quotes::PropertyType).string().null())
                    .col(ColumnDef::new(Quotes::RoofType).string().null())
                    .col(ColumnDef::new(Quotes::Message).text().null())
                    .col(
                        ColumnDef::new(Quotes::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Quotes::ChatId).uuid().null())
                    .col(
                        ColumnDef::new(Quotes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Quotes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Quotes::Table).to_owned())
            .await
    }
}
