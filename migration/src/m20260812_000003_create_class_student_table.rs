use sea_orm_migration::prelude::*;

/// Creates the `class_student` join table: the roster of each class.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum ClassStudent {
    Table,
    ClassId,
    StudentId,
    EnrolledAt,
}

#[derive(DeriveIden)]
enum Class {
    Table,
    Id,
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
                    .table(ClassStudent::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ClassStudent::ClassId).uuid().not_null())
                    .col(ColumnDef::new(ClassStudent::StudentId).uuid().not_null())
                    .col(
                        ColumnDef::new(ClassStudent::EnrolledAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(ClassStudent::ClassId)
                            .col(ClassStudent::StudentId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_class_student_class_id")
                            .from(ClassStudent::Table, ClassStudent::ClassId)
                            .to(Class::Table, Class::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_class_student_student_id")
                            .from(ClassStudent::Table, ClassStudent::StudentId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ClassStudent::Table).to_owned())
            .await
    }
}
