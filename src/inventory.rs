//! Seat inventory coordination.
//!
//! Reservation and release are single conditional UPDATE statements against
//! the `flight_cabin` row, so two concurrent reservations for the same
//! flight and cabin class can never both succeed when only one has enough
//! seats. The check and the decrement must never be split into a read
//! followed by a write.

use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::entities::cabin::{self, CabinClass};
use crate::error::{AppError, AppResult};

/// Atomically take `seats` from the flight's cabin class if enough remain.
///
/// Fails with `InsufficientInventory` (no mutation) when fewer than `seats`
/// remain, and with `NotFound` when the flight does not offer the class.
pub async fn reserve(
    db: &DatabaseConnection,
    flight_id: Uuid,
    cabin_class: CabinClass,
    seats: i32,
) -> AppResult<()> {
    let result = cabin::Entity::update_many()
        .col_expr(
            cabin::Column::SeatsAvailable,
            Expr::col(cabin::Column::SeatsAvailable).sub(seats),
        )
        .filter(cabin::Column::FlightId.eq(flight_id))
        .filter(cabin::Column::CabinClass.eq(cabin_class))
        .filter(cabin::Column::SeatsAvailable.gte(seats))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        // Distinguish a missing inventory row from a short one
        let existing = cabin::Entity::find()
            .filter(cabin::Column::FlightId.eq(flight_id))
            .filter(cabin::Column::CabinClass.eq(cabin_class))
            .one(db)
            .await?;

        return Err(match existing {
            Some(row) => AppError::InsufficientInventory(format!(
                "Only {} {} seats available",
                row.seats_available,
                cabin_class.label()
            )),
            None => AppError::NotFound("Flight or cabin class not found".to_string()),
        });
    }

    tracing::debug!(%flight_id, ?cabin_class, seats, "Reserved seats");
    Ok(())
}

/// Atomically return `seats` to the flight's cabin class.
///
/// Does not re-validate against the original allotment; capacity stays in
/// bounds because the booking state machine pairs every release with exactly
/// one earlier reserve.
pub async fn release(
    db: &DatabaseConnection,
    flight_id: Uuid,
    cabin_class: CabinClass,
    seats: i32,
) -> AppResult<()> {
    let result = cabin::Entity::update_many()
        .col_expr(
            cabin::Column::SeatsAvailable,
            Expr::col(cabin::Column::SeatsAvailable).add(seats),
        )
        .filter(cabin::Column::FlightId.eq(flight_id))
        .filter(cabin::Column::CabinClass.eq(cabin_class))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound(
            "Flight or cabin class not found".to_string(),
        ));
    }

    tracing::debug!(%flight_id, ?cabin_class, seats, "Released seats");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn cabin_row(seats_available: i32) -> cabin::Model {
        cabin::Model {
            id: Uuid::new_v4(),
            flight_id: Uuid::new_v4(),
            cabin_class: CabinClass::Business,
            price: 800.0,
            seats_total: 30,
            seats_available,
        }
    }

    #[tokio::test]
    async fn reserve_issues_a_single_conditional_update() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        reserve(&db, Uuid::new_v4(), CabinClass::Business, 2)
            .await
            .unwrap();

        let log = db.into_transaction_log();
        assert_eq!(log.len(), 1, "check and decrement must be one statement");
    }

    #[tokio::test]
    async fn reserve_fails_with_insufficient_inventory_when_seats_are_short() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([vec![cabin_row(1)]])
            .into_connection();

        let err = reserve(&db, Uuid::new_v4(), CabinClass::Business, 2)
            .await
            .unwrap_err();

        match err {
            AppError::InsufficientInventory(message) => {
                assert!(message.contains("Only 1"));
            }
            other => panic!("expected InsufficientInventory, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn reserve_fails_with_not_found_for_a_missing_cabin() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([Vec::<cabin::Model>::new()])
            .into_connection();

        let err = reserve(&db, Uuid::new_v4(), CabinClass::Economy, 1)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn release_fails_with_not_found_for_a_missing_cabin() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let err = release(&db, Uuid::new_v4(), CabinClass::Economy, 1)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }
}
