use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Standing consents, keyed by the salted subject hash
        manager
            .create_table(
                Table::create()
                    .table(Consents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Consents::SubjectKey)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Consents::Attributes).string())
                    .col(
                        ColumnDef::new(Consents::MonthsValid)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Consents::CreatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        // Pending consent requests, keyed by the salted ticket hash
        manager
            .create_table(
                Table::create()
                    .table(Tickets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Tickets::TicketKey)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Tickets::Data).string().not_null())
                    .col(ColumnDef::new(Tickets::IssuedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        // Index for the issuance-time sweeps
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tickets_issued_at")
                    .table(Tickets::Table)
                    .col(Tickets::IssuedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Tickets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Consents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Consents {
    Table,
    SubjectKey,
    Attributes,
    MonthsValid,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Tickets {
    Table,
    TicketKey,
    Data,
    IssuedAt,
}
