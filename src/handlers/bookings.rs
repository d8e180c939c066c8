use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::entities::cabin::{self, CabinClass};
use crate::entities::flight;
use crate::error::{AppError, AppResult};
use crate::inventory;
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Passengers {
    pub adults: i32,
    #[serde(default)]
    pub children: i32,
}

impl Passengers {
    /// Validate the party and return the number of seats it occupies
    pub fn validate(self) -> AppResult<i32> {
        if self.adults < 1 {
            return Err(AppError::BadRequest(
                "At least one adult passenger is required".to_string(),
            ));
        }
        if self.children < 0 {
            return Err(AppError::BadRequest(
                "children must not be negative".to_string(),
            ));
        }
        // Checked: a wrapped-negative total would pass the reservation's
        // seats_available >= n guard and inflate capacity on decrement.
        self.adults
            .checked_add(self.children)
            .ok_or_else(|| AppError::BadRequest("Party size is too large".to_string()))
    }
}

/// Total price is fixed at booking time: unit price for the cabin class
/// times the whole party
pub fn compute_total_price(unit_price: f64, seats: i32) -> f64 {
    unit_price * f64::from(seats)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub flight: Uuid,
    pub passengers: Passengers,
    pub cabin_class: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub id: Uuid,
    pub flight: FlightSummary,
    pub passengers: Passengers,
    pub cabin_class: CabinClass,
    pub total_price: f64,
    pub status: BookingStatus,
    pub booking_date: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightSummary {
    pub id: Uuid,
    pub flight_number: String,
    pub airline: String,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
}

impl BookingResponse {
    fn from_parts(b: booking::Model, f: &flight::Model) -> Self {
        Self {
            id: b.id,
            flight: FlightSummary {
                id: f.id,
                flight_number: f.flight_number.clone(),
                airline: f.airline.clone(),
                departure_airport: f.departure_airport.clone(),
                arrival_airport: f.arrival_airport.clone(),
                departure_time: f.departure_time.with_timezone(&Utc),
                arrival_time: f.arrival_time.with_timezone(&Utc),
            },
            passengers: Passengers {
                adults: b.adults,
                children: b.children,
            },
            cabin_class: b.cabin_class,
            total_price: b.total_price,
            status: b.status,
            booking_date: b.booking_date.with_timezone(&Utc),
        }
    }
}

/// Create a booking. Seats are reserved atomically before the booking row
/// is persisted; if the reservation fails no booking is created.
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateBookingRequest>,
) -> AppResult<(StatusCode, Json<BookingResponse>)> {
    let cabin_class = CabinClass::from_label(&payload.cabin_class)?;
    let seats = payload.passengers.validate()?;

    let flight = flight::Entity::find_by_id(payload.flight)
        .one(state.db.as_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("Flight not found".to_string()))?;

    let cabin_row = cabin::Entity::find()
        .filter(cabin::Column::FlightId.eq(flight.id))
        .filter(cabin::Column::CabinClass.eq(cabin_class))
        .one(state.db.as_ref())
        .await?
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "Flight {} does not offer {}",
                flight.flight_number,
                cabin_class.label()
            ))
        })?;

    let total_price = compute_total_price(cabin_row.price, seats);

    inventory::reserve(state.db.as_ref(), flight.id, cabin_class, seats).await?;

    let new_booking = booking::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(claims.sub),
        flight_id: Set(flight.id),
        cabin_class: Set(cabin_class),
        adults: Set(payload.passengers.adults),
        children: Set(payload.passengers.children),
        total_price: Set(total_price),
        status: Set(BookingStatus::Confirmed),
        ..Default::default()
    };

    let booking = match new_booking.insert(state.db.as_ref()).await {
        Ok(b) => b,
        Err(err) => {
            // The reservation must not outlive a booking that never landed
            if let Err(release_err) =
                inventory::release(state.db.as_ref(), flight.id, cabin_class, seats).await
            {
                tracing::error!(
                    error = %release_err,
                    flight_id = %flight.id,
                    "Failed to release seats after booking insert failure"
                );
            }
            return Err(err.into());
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(BookingResponse::from_parts(booking, &flight)),
    ))
}

/// List the caller's bookings, newest first
pub async fn my_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<BookingResponse>>> {
    let bookings = booking::Entity::find()
        .filter(booking::Column::UserId.eq(claims.sub))
        .order_by_desc(booking::Column::BookingDate)
        .all(state.db.as_ref())
        .await?;

    let flight_ids: Vec<Uuid> = bookings.iter().map(|b| b.flight_id).collect();
    let flights = flight::Entity::find()
        .filter(flight::Column::Id.is_in(flight_ids))
        .all(state.db.as_ref())
        .await?;

    let responses: Vec<BookingResponse> = bookings
        .into_iter()
        .filter_map(|b| {
            let flight = flights.iter().find(|f| f.id == b.flight_id)?;
            Some(BookingResponse::from_parts(b, flight))
        })
        .collect();

    Ok(Json(responses))
}

/// Cancel a booking (owner only)
pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<BookingResponse>> {
    let booking = booking::Entity::find_by_id(booking_id)
        .filter(booking::Column::UserId.eq(claims.sub))
        .one(state.db.as_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    if !booking.status.can_cancel() {
        return Err(match booking.status {
            BookingStatus::Cancelled => {
                AppError::Conflict("Booking is already cancelled".to_string())
            }
            _ => AppError::Conflict("Cannot cancel a completed booking".to_string()),
        });
    }

    let flight = flight::Entity::find_by_id(booking.flight_id)
        .one(state.db.as_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("Flight not found".to_string()))?;

    // Guarded transition: of several concurrent cancel attempts only one
    // flips the status, so the release below runs exactly once.
    let result = booking::Entity::update_many()
        .col_expr(
            booking::Column::Status,
            BookingStatus::Cancelled.as_enum(),
        )
        .filter(booking::Column::Id.eq(booking.id))
        .filter(booking::Column::Status.eq(BookingStatus::Confirmed))
        .exec(state.db.as_ref())
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::Conflict(
            "Booking is already cancelled".to_string(),
        ));
    }

    inventory::release(
        state.db.as_ref(),
        booking.flight_id,
        booking.cabin_class,
        booking.seat_count(),
    )
    .await?;

    let cancelled = booking::Model {
        status: BookingStatus::Cancelled,
        ..booking
    };

    Ok(Json(BookingResponse::from_parts(cancelled, &flight)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;
    use chrono::DateTime;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn test_state(db: sea_orm::DatabaseConnection) -> AppState {
        AppState {
            db: std::sync::Arc::new(db),
            config: Config {
                database_url: String::new(),
                jwt_secret: "secret".to_string(),
                jwt_expiration_hours: 24,
                server_host: "127.0.0.1".to_string(),
                server_port: 0,
            },
        }
    }

    fn test_claims(user_id: Uuid) -> Claims {
        Claims {
            sub: user_id,
            email: "traveller@example.com".to_string(),
            role: crate::entities::user::UserRole::Traveller,
            exp: 0,
            iat: 0,
        }
    }

    fn test_flight() -> flight::Model {
        flight::Model {
            id: Uuid::new_v4(),
            flight_number: "JG101".to_string(),
            airline: "JetSetGo Airways".to_string(),
            departure_airport: "JFK".to_string(),
            arrival_airport: "LAX".to_string(),
            departure_time: DateTime::parse_from_rfc3339("2025-07-05T10:00:00Z").unwrap(),
            arrival_time: DateTime::parse_from_rfc3339("2025-07-05T13:30:00Z").unwrap(),
            created_at: DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z").unwrap(),
        }
    }

    fn test_booking(user_id: Uuid, status: BookingStatus) -> booking::Model {
        booking::Model {
            id: Uuid::new_v4(),
            user_id,
            flight_id: Uuid::new_v4(),
            cabin_class: CabinClass::Business,
            adults: 1,
            children: 0,
            total_price: 800.0,
            status,
            booking_date: DateTime::parse_from_rfc3339("2025-07-01T00:00:00Z").unwrap(),
        }
    }

    #[test]
    fn party_must_have_at_least_one_adult() {
        assert!(Passengers {
            adults: 0,
            children: 2
        }
        .validate()
        .is_err());
        assert!(Passengers {
            adults: 1,
            children: -1
        }
        .validate()
        .is_err());
        assert_eq!(
            Passengers {
                adults: 2,
                children: 1
            }
            .validate()
            .unwrap(),
            3
        );
    }

    #[test]
    fn party_size_overflow_is_rejected_not_wrapped() {
        let err = Passengers {
            adults: i32::MAX,
            children: 1,
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        assert_eq!(
            Passengers {
                adults: i32::MAX,
                children: 0
            }
            .validate()
            .unwrap(),
            i32::MAX
        );
    }

    #[test]
    fn total_price_is_unit_price_times_party_size() {
        assert_eq!(compute_total_price(800.0, 1), 800.0);
        assert_eq!(compute_total_price(300.0, 3), 900.0);
    }

    #[tokio::test]
    async fn booking_fails_when_inventory_is_short_and_nothing_is_persisted() {
        let flight = test_flight();
        let cabin_row = cabin::Model {
            id: Uuid::new_v4(),
            flight_id: flight.id,
            cabin_class: CabinClass::Business,
            price: 800.0,
            seats_total: 2,
            seats_available: 1,
        };

        // Flight lookup, cabin lookup, failed conditional decrement, then
        // the coordinator's re-read of the short row. No insert happens.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![flight.clone()]])
            .append_query_results([vec![cabin_row.clone()], vec![cabin_row]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let state = test_state(db);
        let payload = CreateBookingRequest {
            flight: flight.id,
            passengers: Passengers {
                adults: 2,
                children: 0,
            },
            cabin_class: "Business".to_string(),
        };

        let err = create_booking(
            State(state),
            Extension(test_claims(Uuid::new_v4())),
            Json(payload),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::InsufficientInventory(_)));
    }

    #[tokio::test]
    async fn booking_a_class_the_flight_does_not_offer_is_rejected() {
        let flight = test_flight();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![flight.clone()]])
            .append_query_results([Vec::<cabin::Model>::new()])
            .into_connection();

        let state = test_state(db);
        let payload = CreateBookingRequest {
            flight: flight.id,
            passengers: Passengers {
                adults: 1,
                children: 0,
            },
            cabin_class: "First Class".to_string(),
        };

        let err = create_booking(
            State(state),
            Extension(test_claims(Uuid::new_v4())),
            Json(payload),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn cancelling_a_cancelled_booking_conflicts_without_touching_inventory() {
        let user_id = Uuid::new_v4();
        let booking = test_booking(user_id, BookingStatus::Cancelled);

        // Only the booking lookup is answered; any inventory statement
        // would fail the mock and surface as an Internal error.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![booking.clone()]])
            .into_connection();

        let state = test_state(db);
        let err = cancel_booking(State(state), Extension(test_claims(user_id)), Path(booking.id))
            .await
            .unwrap_err();

        match err {
            AppError::Conflict(message) => assert!(message.contains("already cancelled")),
            other => panic!("expected Conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn completed_bookings_cannot_be_cancelled() {
        let user_id = Uuid::new_v4();
        let booking = test_booking(user_id, BookingStatus::Completed);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![booking.clone()]])
            .into_connection();

        let state = test_state(db);
        let err = cancel_booking(State(state), Extension(test_claims(user_id)), Path(booking.id))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn cancelling_someone_elses_booking_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<booking::Model>::new()])
            .into_connection();

        let state = test_state(db);
        let err = cancel_booking(
            State(state),
            Extension(test_claims(Uuid::new_v4())),
            Path(Uuid::new_v4()),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }
}
