use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Quotes {
    Table,
    CustomerId,
    ProviderId,
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    CustomerId,
    ProviderId,
    QuoteId,
}

#[derive(DeriveIden)]
enum Reviews {
    Table,
    ProviderId,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Quote listings by role
        manager
            .create_index(
                Index::create()
                    .name("idx_quotes_customer_id")
                    .table(Quotes::Table)
                    .col(Quotes::CustomerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_quotes_provider_id")
                    .table(Quotes::Table)
                    .col(Quotes::ProviderId)
                    .to_owned(),
            )
            .await?;

        // Order listings by role, plus the quote reconciliation lookup
        manager
            .create_index(
                Index::create()
                    .name("idx_orders_customer_id")
                    .table(Orders::Table)
                    .col(Orders::CustomerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_orders_provider_id")
                    .table(Orders::Table)
                    .col(Orders::ProviderId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_orders_quote_id")
                    .table(Orders::Table)
                    .col(Orders::QuoteId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reviews_provider_id")
                    .table(Reviews::Table)
                    .col(Reviews::ProviderId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_quotes_customer_id").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_quotes_provider_id").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_orders_customer_id").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_orders_provider_id").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_orders_quote_id").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_reviews_provider_id").to_owned())
            .await?;

        Ok(())
    }
}
