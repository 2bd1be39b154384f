pub use sea_orm_migration::prelude::*;

mod m20260812_000001_create_user_table;
mod m20260812_000002_create_class_table;
mod m20260812_000003_create_class_student_table;
mod m20260812_000004_create_attendance_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260812_000001_create_user_table::Migration),
            Box::new(m20260812_000002_create_class_table::Migration),
            Box::new(m20260812_000003_create_class_student_table::Migration),
            Box::new(m20260812_000004_create_attendance_table::Migration),
        ]
    }
}
