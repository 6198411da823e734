use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(
                        ColumnDef::new(Users::Role)
                            .string()
                            .not_null()
                            .default("user"),
                    )
                    .col(ColumnDef::new(Users::ReferralCodeUsed).string().null())
                    .col(ColumnDef::new(Users::CreatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        // Usage counts are derived by counting users per code
        manager
            .create_index(
                Index::create()
                    .name("idx_users_referral_code_used")
                    .table(Users::Table)
                    .col(Users::ReferralCodeUsed)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ReferralCodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReferralCodes::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ReferralCodes::Code)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(ReferralCodes::Description).string().null())
                    .col(ColumnDef::new(ReferralCodes::UsageLimit).big_integer().null())
                    .col(
                        ColumnDef::new(ReferralCodes::ExpirationDate)
                            .string()
                            .null(),
                    )
                    .col(ColumnDef::new(ReferralCodes::CreatedBy).string().not_null())
                    .col(ColumnDef::new(ReferralCodes::CreatedAt).string().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReferralCodes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Username,
    PasswordHash,
    Role,
    ReferralCodeUsed,
    CreatedAt,
}

#[derive(Iden)]
enum ReferralCodes {
    Table,
    Id,
    Code,
    Description,
    UsageLimit,
    ExpirationDate,
    CreatedBy,
    CreatedAt,
}
