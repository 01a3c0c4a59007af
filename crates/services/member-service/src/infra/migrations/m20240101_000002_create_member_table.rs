//! Migration: Create member table with a team foreign key.

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_team_table::Team;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Member::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Member::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Member::Username).string().not_null())
                    .col(ColumnDef::new(Member::Age).integer().not_null().default(0))
                    .col(ColumnDef::new(Member::TeamId).big_integer().null())
                    .col(
                        ColumnDef::new(Member::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Member::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    // No cascade: deleting a referenced team is left to the database
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_member_team")
                            .from(Member::Table, Member::TeamId)
                            .to(Team::Table, Team::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_member_username")
                    .table(Member::Table)
                    .col(Member::Username)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_member_username")
                    .table(Member::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Member::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Member {
    Table,
    Id,
    Username,
    Age,
    TeamId,
    CreatedAt,
    UpdatedAt,
}
