use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::cabin::{self, CabinClass};
use crate::entities::flight;
use crate::error::{AppError, AppResult};
use crate::utils::time::departure_day_window;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightResponse {
    pub id: Uuid,
    pub flight_number: String,
    pub airline: String,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub price: BTreeMap<CabinClass, f64>,
    pub seats_available: BTreeMap<CabinClass, i32>,
}

impl FlightResponse {
    pub fn from_model(flight: flight::Model, cabins: &[cabin::Model]) -> Self {
        let mut price = BTreeMap::new();
        let mut seats_available = BTreeMap::new();
        for c in cabins.iter().filter(|c| c.flight_id == flight.id) {
            price.insert(c.cabin_class, c.price);
            seats_available.insert(c.cabin_class, c.seats_available);
        }

        Self {
            id: flight.id,
            flight_number: flight.flight_number,
            airline: flight.airline,
            departure_airport: flight.departure_airport,
            arrival_airport: flight.arrival_airport,
            departure_time: flight.departure_time.with_timezone(&Utc),
            arrival_time: flight.arrival_time.with_timezone(&Utc),
            price,
            seats_available,
        }
    }
}

// ============ Search ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub departure_airport: Option<String>,
    pub arrival_airport: Option<String>,
    pub departure_date: Option<String>,
    pub cabin_class: Option<String>,
    pub passengers: Option<i32>,
}

/// Validated search criteria with the cabin label resolved to its key
#[derive(Debug, PartialEq)]
pub struct SearchCriteria {
    pub departure_airport: String,
    pub arrival_airport: String,
    pub departure_date: NaiveDate,
    pub cabin_class: CabinClass,
    pub passengers: i32,
}

impl SearchQuery {
    pub fn validate(self) -> AppResult<SearchCriteria> {
        let departure_airport = self
            .departure_airport
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::BadRequest("departureAirport is required".to_string()))?;

        let arrival_airport = self
            .arrival_airport
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::BadRequest("arrivalAirport is required".to_string()))?;

        let departure_date = self
            .departure_date
            .ok_or_else(|| AppError::BadRequest("departureDate is required".to_string()))?
            .parse::<NaiveDate>()
            .map_err(|_| {
                AppError::BadRequest("departureDate must be a YYYY-MM-DD date".to_string())
            })?;

        let cabin_class = self
            .cabin_class
            .ok_or_else(|| AppError::BadRequest("cabinClass is required".to_string()))
            .and_then(|label| CabinClass::from_label(&label))?;

        let passengers = self.passengers.unwrap_or(1);
        if passengers < 1 {
            return Err(AppError::BadRequest(
                "passengers must be a positive integer".to_string(),
            ));
        }

        Ok(SearchCriteria {
            departure_airport,
            arrival_airport,
            departure_date,
            cabin_class,
            passengers,
        })
    }
}

/// Search scheduled flights by route, date and cabin class.
///
/// Pure read: results are a snapshot, and capacity is re-validated
/// atomically when a booking is placed.
pub async fn search_flights(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<FlightResponse>>> {
    let criteria = params.validate()?;
    let (day_start, day_end) = departure_day_window(criteria.departure_date);

    let flights = flight::Entity::find()
        .filter(flight::Column::DepartureAirport.eq(&criteria.departure_airport))
        .filter(flight::Column::ArrivalAirport.eq(&criteria.arrival_airport))
        .filter(flight::Column::DepartureTime.between(day_start, day_end))
        .order_by_asc(flight::Column::DepartureTime)
        .all(state.db.as_ref())
        .await?;

    let flight_ids: Vec<Uuid> = flights.iter().map(|f| f.id).collect();
    let cabins = cabin::Entity::find()
        .filter(cabin::Column::FlightId.is_in(flight_ids))
        .all(state.db.as_ref())
        .await?;

    let responses: Vec<FlightResponse> = flights
        .into_iter()
        .filter(|f| {
            cabins.iter().any(|c| {
                c.flight_id == f.id
                    && c.cabin_class == criteria.cabin_class
                    && c.seats_available >= criteria.passengers
            })
        })
        .map(|f| FlightResponse::from_model(f, &cabins))
        .collect();

    Ok(Json(responses))
}

// ============ Catalog reads ============

/// List all flights
pub async fn list_flights(State(state): State<AppState>) -> AppResult<Json<Vec<FlightResponse>>> {
    let flights = flight::Entity::find()
        .order_by_asc(flight::Column::DepartureTime)
        .all(state.db.as_ref())
        .await?;
    let cabins = cabin::Entity::find().all(state.db.as_ref()).await?;

    let responses = flights
        .into_iter()
        .map(|f| FlightResponse::from_model(f, &cabins))
        .collect();

    Ok(Json(responses))
}

/// Get flight details
pub async fn get_flight(
    State(state): State<AppState>,
    Path(flight_id): Path<Uuid>,
) -> AppResult<Json<FlightResponse>> {
    let flight = flight::Entity::find_by_id(flight_id)
        .one(state.db.as_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("Flight not found".to_string()))?;

    let cabins = cabin::Entity::find()
        .filter(cabin::Column::FlightId.eq(flight.id))
        .all(state.db.as_ref())
        .await?;

    Ok(Json(FlightResponse::from_model(flight, &cabins)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_query() -> SearchQuery {
        SearchQuery {
            departure_airport: Some("JFK".to_string()),
            arrival_airport: Some("LAX".to_string()),
            departure_date: Some("2025-07-05".to_string()),
            cabin_class: Some("Business".to_string()),
            passengers: Some(2),
        }
    }

    #[test]
    fn valid_query_resolves_label_and_date() {
        let criteria = full_query().validate().unwrap();
        assert_eq!(criteria.cabin_class, CabinClass::Business);
        assert_eq!(criteria.departure_date, "2025-07-05".parse().unwrap());
        assert_eq!(criteria.passengers, 2);
    }

    #[test]
    fn missing_route_or_date_is_a_validation_error() {
        let mut q = full_query();
        q.departure_airport = None;
        assert!(matches!(q.validate(), Err(AppError::BadRequest(_))));

        let mut q = full_query();
        q.arrival_airport = Some(String::new());
        assert!(matches!(q.validate(), Err(AppError::BadRequest(_))));

        let mut q = full_query();
        q.departure_date = None;
        assert!(matches!(q.validate(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn malformed_date_is_rejected() {
        let mut q = full_query();
        q.departure_date = Some("05/07/2025".to_string());
        assert!(matches!(q.validate(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn unknown_cabin_label_is_rejected_naming_the_valid_set() {
        let mut q = full_query();
        q.cabin_class = Some("Luxury".to_string());
        let err = q.validate().unwrap_err();
        assert!(err.to_string().contains("First Class"));
    }

    #[test]
    fn passengers_default_to_one_and_must_be_positive() {
        let mut q = full_query();
        q.passengers = None;
        assert_eq!(q.validate().unwrap().passengers, 1);

        let mut q = full_query();
        q.passengers = Some(0);
        assert!(matches!(q.validate(), Err(AppError::BadRequest(_))));
    }
}
