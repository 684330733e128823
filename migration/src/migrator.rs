use sea_orm_migration::prelude::*;

use crate::migrations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(migrations::m202510170001_create_class_members::Migration),
            Box::new(migrations::m202510170002_create_attendance_sessions::Migration),
            Box::new(migrations::m202510170003_create_attendance_records::Migration),
        ]
    }
}
