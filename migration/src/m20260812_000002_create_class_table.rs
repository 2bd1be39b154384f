use sea_orm_migration::prelude::*;

/// Creates the `class` table, each class owned by one teacher.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Class {
    Table,
    Id,
    ClassName,
    TeacherId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum User {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Class::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Class::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Class::ClassName)
                            .string_len(200)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Class::TeacherId).uuid().not_null())
                    .col(
                        ColumnDef::new(Class::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_class_teacher_id")
                            .from(Class::Table, Class::TeacherId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Class::Table).to_owned())
            .await
    }
}
