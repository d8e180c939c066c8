use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Flight::Table)
                    .if_not_exists()
                    .col(uuid(Flight::Id).primary_key())
                    .col(string_len(Flight::FlightNumber, 20).not_null().unique_key())
                    .col(string_len(Flight::Airline, 100).not_null())
                    .col(string_len(Flight::DepartureAirport, 255).not_null())
                    .col(string_len(Flight::ArrivalAirport, 255).not_null())
                    .col(timestamp_with_time_zone(Flight::DepartureTime).not_null())
                    .col(timestamp_with_time_zone(Flight::ArrivalTime).not_null())
                    .col(
                        timestamp_with_time_zone(Flight::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Route + departure time is the search access path
        manager
            .create_index(
                Index::create()
                    .name("idx_flight_route_departure")
                    .table(Flight::Table)
                    .col(Flight::DepartureAirport)
                    .col(Flight::ArrivalAirport)
                    .col(Flight::DepartureTime)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Flight::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Flight {
    Table,
    Id,
    FlightNumber,
    Airline,
    DepartureAirport,
    ArrivalAirport,
    DepartureTime,
    ArrivalTime,
    CreatedAt,
}
