//! Migration: Create the user directory tables.
//!
//! Users and their enrolled embeddings are owned by the directory service;
//! the tables live here so a standalone deployment has something to read.

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
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Users::EmployeeId)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::Name).string().not_null())
                    .col(
                        ColumnDef::new(Users::Role)
                            .string()
                            .not_null()
                            .default("employee"),
                    )
                    .col(
                        ColumnDef::new(Users::DepartedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FaceEmbeddings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FaceEmbeddings::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FaceEmbeddings::UserId).uuid().not_null())
                    .col(ColumnDef::new(FaceEmbeddings::Vector).text().not_null())
                    .col(
                        ColumnDef::new(FaceEmbeddings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_face_embeddings_user")
                            .from(FaceEmbeddings::Table, FaceEmbeddings::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_face_embeddings_user_id")
                    .table(FaceEmbeddings::Table)
                    .col(FaceEmbeddings::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FaceEmbeddings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub(super) enum Users {
    Table,
    Id,
    EmployeeId,
    Name,
    Role,
    DepartedAt,
    CreatedAt,
}

#[derive(Iden)]
enum FaceEmbeddings {
    Table,
    Id,
    UserId,
    Vector,
    CreatedAt,
}
