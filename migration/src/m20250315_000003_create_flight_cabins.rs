use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

use super::m20250315_000002_create_flights::Flight;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create cabin class enum
        manager
            .create_type(
                Type::create()
                    .as_enum(CabinClass::Enum)
                    .values([
                        CabinClass::Economy,
                        CabinClass::PremiumEconomy,
                        CabinClass::Business,
                        CabinClass::FirstClass,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FlightCabin::Table)
                    .if_not_exists()
                    .col(uuid(FlightCabin::Id).primary_key())
                    .col(uuid(FlightCabin::FlightId).not_null())
                    .col(
                        ColumnDef::new(FlightCabin::CabinClass)
                            .custom(CabinClass::Enum)
                            .not_null(),
                    )
                    .col(double(FlightCabin::Price).not_null())
                    .col(integer(FlightCabin::SeatsTotal).not_null())
                    .col(integer(FlightCabin::SeatsAvailable).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_flight_cabin_flight")
                            .from(FlightCabin::Table, FlightCabin::FlightId)
                            .to(Flight::Table, Flight::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One inventory row per flight and cabin class
        manager
            .create_index(
                Index::create()
                    .name("ux_flight_cabin_class")
                    .table(FlightCabin::Table)
                    .col(FlightCabin::FlightId)
                    .col(FlightCabin::CabinClass)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FlightCabin::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(CabinClass::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum FlightCabin {
    Table,
    Id,
    FlightId,
    CabinClass,
    Price,
    SeatsTotal,
    SeatsAvailable,
}

#[derive(DeriveIden)]
pub enum CabinClass {
    #[sea_orm(iden = "cabin_class")]
    Enum,
    #[sea_orm(iden = "economy")]
    Economy,
    #[sea_orm(iden = "premium_economy")]
    PremiumEconomy,
    #[sea_orm(iden = "business")]
    Business,
    #[sea_orm(iden = "first_class")]
    FirstClass,
}
