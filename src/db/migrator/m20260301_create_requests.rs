use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Requests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Requests::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Requests::AccessKey)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Requests::OwnerId).integer().null())
                    .col(ColumnDef::new(Requests::OperatorName).string().not_null())
                    .col(ColumnDef::new(Requests::CharacterName).string().not_null())
                    .col(ColumnDef::new(Requests::SeriesSource).string().not_null())
                    .col(
                        ColumnDef::new(Requests::SourcingVibe)
                            .string()
                            .not_null()
                            .default("[]"),
                    )
                    .col(ColumnDef::new(Requests::ContactMethod).string().not_null())
                    .col(ColumnDef::new(Requests::ContactHandle).string().not_null())
                    .col(ColumnDef::new(Requests::Notes).string().null())
                    .col(
                        ColumnDef::new(Requests::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Requests::RejectionReason).string().null())
                    .col(
                        ColumnDef::new(Requests::Version)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Requests::CreatedAt).string().not_null())
                    .col(ColumnDef::new(Requests::UpdatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_requests_owner_id")
                    .table(Requests::Table)
                    .col(Requests::OwnerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RequestStatusEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RequestStatusEvents::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RequestStatusEvents::RequestId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RequestStatusEvents::FromStatus)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RequestStatusEvents::ToStatus)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RequestStatusEvents::Reason).string().null())
                    .col(
                        ColumnDef::new(RequestStatusEvents::ActorUsername)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RequestStatusEvents::CreatedAt)
                            .string()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_request_status_events_request")
                            .from(RequestStatusEvents::Table, RequestStatusEvents::RequestId)
                            .to(Requests::Table, Requests::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_request_status_events_request_id")
                    .table(RequestStatusEvents::Table)
                    .col(RequestStatusEvents::RequestId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RequestStatusEvents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Requests::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Requests {
    Table,
    Id,
    AccessKey,
    OwnerId,
    OperatorName,
    CharacterName,
    SeriesSource,
    SourcingVibe,
    ContactMethod,
    ContactHandle,
    Notes,
    Status,
    RejectionReason,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum RequestStatusEvents {
    Table,
    Id,
    RequestId,
    FromStatus,
    ToStatus,
    Reason,
    ActorUsername,
    CreatedAt,
}
