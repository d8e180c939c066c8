use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::cabin::{self, CabinClass};
use crate::entities::flight;
use crate::error::{AppError, AppResult};
use crate::handlers::flights::FlightResponse;
use crate::AppState;

// ============ Flight Catalog Management ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFlightRequest {
    pub flight_number: String,
    pub airline: String,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub price: BTreeMap<CabinClass, f64>,
    pub seats_available: BTreeMap<CabinClass, i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFlightRequest {
    pub flight_number: Option<String>,
    pub airline: Option<String>,
    pub departure_airport: Option<String>,
    pub arrival_airport: Option<String>,
    pub departure_time: Option<DateTime<Utc>>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub price: Option<BTreeMap<CabinClass, f64>>,
}

/// A flight's price and seat tables must cover the same cabin classes and
/// hold no negative values.
pub fn validate_cabin_tables(
    price: &BTreeMap<CabinClass, f64>,
    seats: &BTreeMap<CabinClass, i32>,
) -> AppResult<()> {
    if price.is_empty() {
        return Err(AppError::BadRequest(
            "At least one cabin class is required".to_string(),
        ));
    }
    if !price.keys().eq(seats.keys()) {
        return Err(AppError::BadRequest(
            "price and seatsAvailable must cover the same cabin classes".to_string(),
        ));
    }
    if price.values().any(|p| *p < 0.0) {
        return Err(AppError::BadRequest(
            "Prices must not be negative".to_string(),
        ));
    }
    if seats.values().any(|s| *s < 0) {
        return Err(AppError::BadRequest(
            "Seat counts must not be negative".to_string(),
        ));
    }
    Ok(())
}

fn validate_schedule(departure: DateTime<Utc>, arrival: DateTime<Utc>) -> AppResult<()> {
    if arrival <= departure {
        return Err(AppError::BadRequest(
            "arrivalTime must be after departureTime".to_string(),
        ));
    }
    Ok(())
}

/// Create a flight with its per-cabin-class inventory (admin)
pub async fn create_flight(
    State(state): State<AppState>,
    Json(payload): Json<CreateFlightRequest>,
) -> AppResult<(StatusCode, Json<FlightResponse>)> {
    if payload.flight_number.is_empty() {
        return Err(AppError::BadRequest(
            "flightNumber is required".to_string(),
        ));
    }
    if payload.airline.is_empty()
        || payload.departure_airport.is_empty()
        || payload.arrival_airport.is_empty()
    {
        return Err(AppError::BadRequest(
            "airline, departureAirport and arrivalAirport are required".to_string(),
        ));
    }
    validate_schedule(payload.departure_time, payload.arrival_time)?;
    validate_cabin_tables(&payload.price, &payload.seats_available)?;

    // Friendly pre-check; the unique constraint on flight_number is the
    // actual guarantee.
    let existing = flight::Entity::find()
        .filter(flight::Column::FlightNumber.eq(&payload.flight_number))
        .one(state.db.as_ref())
        .await?;

    if existing.is_some() {
        return Err(AppError::Conflict(format!(
            "Flight {} already exists",
            payload.flight_number
        )));
    }

    let txn = state.db.begin().await?;

    let new_flight = flight::ActiveModel {
        id: Set(Uuid::new_v4()),
        flight_number: Set(payload.flight_number),
        airline: Set(payload.airline),
        departure_airport: Set(payload.departure_airport),
        arrival_airport: Set(payload.arrival_airport),
        departure_time: Set(payload.departure_time.into()),
        arrival_time: Set(payload.arrival_time.into()),
        ..Default::default()
    };
    let created = new_flight.insert(&txn).await?;

    let mut cabins = Vec::new();
    for (cabin_class, unit_price) in &payload.price {
        let seats = payload.seats_available[cabin_class];
        let row = cabin::ActiveModel {
            id: Set(Uuid::new_v4()),
            flight_id: Set(created.id),
            cabin_class: Set(*cabin_class),
            price: Set(*unit_price),
            seats_total: Set(seats),
            seats_available: Set(seats),
        };
        cabins.push(row.insert(&txn).await?);
    }

    txn.commit().await?;

    tracing::info!(flight_number = %created.flight_number, "Flight created");

    Ok((
        StatusCode::CREATED,
        Json(FlightResponse::from_model(created, &cabins)),
    ))
}

/// Update a flight's schedule, route or prices (admin).
/// Unspecified fields are left untouched; seat counts are only ever mutated
/// through reservations.
pub async fn update_flight(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateFlightRequest>,
) -> AppResult<Json<FlightResponse>> {
    let existing = flight::Entity::find_by_id(id)
        .one(state.db.as_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("Flight not found".to_string()))?;

    if let Some(number) = &payload.flight_number {
        let collision = flight::Entity::find()
            .filter(flight::Column::FlightNumber.eq(number))
            .filter(flight::Column::Id.ne(id))
            .one(state.db.as_ref())
            .await?;
        if collision.is_some() {
            return Err(AppError::Conflict(format!(
                "Flight {} already exists",
                number
            )));
        }
    }

    let departure = payload
        .departure_time
        .unwrap_or_else(|| existing.departure_time.with_timezone(&Utc));
    let arrival = payload
        .arrival_time
        .unwrap_or_else(|| existing.arrival_time.with_timezone(&Utc));
    validate_schedule(departure, arrival)?;

    let cabins = cabin::Entity::find()
        .filter(cabin::Column::FlightId.eq(id))
        .all(state.db.as_ref())
        .await?;

    if let Some(price) = &payload.price {
        for (cabin_class, unit_price) in price {
            if *unit_price < 0.0 {
                return Err(AppError::BadRequest(
                    "Prices must not be negative".to_string(),
                ));
            }
            if !cabins.iter().any(|c| c.cabin_class == *cabin_class) {
                return Err(AppError::BadRequest(format!(
                    "Flight {} does not offer {}",
                    existing.flight_number,
                    cabin_class.label()
                )));
            }
        }
    }

    let txn = state.db.begin().await?;

    let mut active: flight::ActiveModel = existing.into();
    if let Some(number) = payload.flight_number {
        active.flight_number = Set(number);
    }
    if let Some(airline) = payload.airline {
        active.airline = Set(airline);
    }
    if let Some(airport) = payload.departure_airport {
        active.departure_airport = Set(airport);
    }
    if let Some(airport) = payload.arrival_airport {
        active.arrival_airport = Set(airport);
    }
    if payload.departure_time.is_some() {
        active.departure_time = Set(departure.into());
    }
    if payload.arrival_time.is_some() {
        active.arrival_time = Set(arrival.into());
    }
    let updated = active.update(&txn).await?;

    let mut updated_cabins = Vec::new();
    for row in cabins {
        let new_price = payload
            .price
            .as_ref()
            .and_then(|p| p.get(&row.cabin_class).copied());
        match new_price {
            Some(unit_price) => {
                let mut active: cabin::ActiveModel = row.into();
                active.price = Set(unit_price);
                updated_cabins.push(active.update(&txn).await?);
            }
            None => updated_cabins.push(row),
        }
    }

    txn.commit().await?;

    Ok(Json(FlightResponse::from_model(updated, &updated_cabins)))
}

/// Delete a flight (admin). Inventory rows go with it; bookings that
/// reference it are left alone.
pub async fn delete_flight(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = flight::Entity::delete_by_id(id).exec(state.db.as_ref()).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Flight not found".to_string()));
    }

    Ok(Json(serde_json::json!({ "message": "Flight deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price_table(entries: &[(CabinClass, f64)]) -> BTreeMap<CabinClass, f64> {
        entries.iter().copied().collect()
    }

    fn seat_table(entries: &[(CabinClass, i32)]) -> BTreeMap<CabinClass, i32> {
        entries.iter().copied().collect()
    }

    #[test]
    fn cabin_tables_must_cover_the_same_classes() {
        let price = price_table(&[(CabinClass::Economy, 300.0), (CabinClass::Business, 800.0)]);
        let seats = seat_table(&[(CabinClass::Economy, 150)]);
        assert!(validate_cabin_tables(&price, &seats).is_err());

        let seats = seat_table(&[(CabinClass::Economy, 150), (CabinClass::Business, 30)]);
        assert!(validate_cabin_tables(&price, &seats).is_ok());
    }

    #[test]
    fn empty_and_negative_tables_are_rejected() {
        assert!(validate_cabin_tables(&BTreeMap::new(), &BTreeMap::new()).is_err());

        let price = price_table(&[(CabinClass::Economy, -1.0)]);
        let seats = seat_table(&[(CabinClass::Economy, 10)]);
        assert!(validate_cabin_tables(&price, &seats).is_err());

        let price = price_table(&[(CabinClass::Economy, 300.0)]);
        let seats = seat_table(&[(CabinClass::Economy, -10)]);
        assert!(validate_cabin_tables(&price, &seats).is_err());
    }

    #[test]
    fn arrival_must_follow_departure() {
        let departure: DateTime<Utc> = "2025-07-05T10:00:00Z".parse().unwrap();
        let arrival: DateTime<Utc> = "2025-07-05T13:30:00Z".parse().unwrap();
        assert!(validate_schedule(departure, arrival).is_ok());
        assert!(validate_schedule(arrival, departure).is_err());
        assert!(validate_schedule(departure, departure).is_err());
    }
}
