use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BetaFeedback::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BetaFeedback::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BetaFeedback::Message).string().not_null())
                    .col(ColumnDef::new(BetaFeedback::CreatedAt).string().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BetaFeedback::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum BetaFeedback {
    Table,
    Id,
    Message,
    CreatedAt,
}
