use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::handlers::{admin, auth, bookings, flights};
use crate::middleware::auth::{auth_middleware, require_admin};
use crate::middleware::rate_limit::create_public_governor;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // IP-based governor for unauthenticated routes
    let public_governor = create_public_governor();

    // Public routes
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(public_governor.clone());

    // Public flight search and catalog reads
    let flight_routes = Router::new()
        .route("/search", get(flights::search_flights))
        .route("/", get(flights::list_flights))
        .route("/{id}", get(flights::get_flight))
        .layer(public_governor);

    // Catalog administration (requires auth + admin role)
    let flight_admin_routes = Router::new()
        .route("/", post(admin::create_flight))
        .route("/{id}", put(admin::update_flight))
        .route("/{id}", delete(admin::delete_flight))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Booking routes (any authenticated user, owner-scoped)
    let booking_routes = Router::new()
        .route("/", post(bookings::create_booking))
        .route("/", get(bookings::my_bookings))
        .route("/{id}/cancel", put(bookings::cancel_booking))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Combine all routes
    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/flights", flight_routes.merge(flight_admin_routes))
        .nest("/api/bookings", booking_routes)
        .with_state(state)
}
