pub use sea_orm_migration::prelude::*;

mod m20250315_000001_create_users;
mod m20250315_000002_create_flights;
mod m20250315_000003_create_flight_cabins;
mod m20250315_000004_create_bookings;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250315_000001_create_users::Migration),
            Box::new(m20250315_000002_create_flights::Migration),
            Box::new(m20250315_000003_create_flight_cabins::Migration),
            Box::new(m20250315_000004_create_bookings::Migration),
        ]
    }
}
