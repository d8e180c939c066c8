use std::net::SocketAddr;
use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use chrono::DateTime;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use sea_orm_migration::MigratorTrait;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use flight_booking_backend::{
    config::Config,
    db,
    entities::cabin::{self, CabinClass},
    entities::flight,
    entities::user::{self, UserRole},
    middleware::rate_limit::{create_global_governor, log_request},
    routes, AppState,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flight_booking_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    tracing::info!("Starting server at {}", config.server_addr());

    // Connect to database
    let db = db::connect(&config)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Connected to database");

    // Run migrations
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    tracing::info!("Migrations complete");

    // Seed admin account and sample catalog if not present
    seed_admin(&db).await;
    seed_sample_flights(&db).await;

    // Create app state
    let state = AppState {
        db: Arc::new(db),
        config: config.clone(),
    };

    // Create router with middleware
    let app = routes::create_router(state)
        .layer(axum::middleware::from_fn(log_request))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(create_global_governor());

    // Start server with socket address for rate limiting
    let addr: SocketAddr = config.server_addr().parse().expect("Invalid address");
    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}

/// Seed the admin account if it doesn't exist
async fn seed_admin(db: &sea_orm::DatabaseConnection) {
    let admin_email = "admin@jetsetgo.com";

    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(admin_email))
        .one(db)
        .await
        .expect("Failed to check for admin");

    if existing.is_none() {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let password_hash = argon2
            .hash_password(b"admin123", &salt)
            .expect("Failed to hash admin password")
            .to_string();

        let admin = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(admin_email.to_string()),
            password_hash: Set(password_hash),
            name: Set("Admin".to_string()),
            role: Set(UserRole::Admin),
            ..Default::default()
        };

        admin.insert(db).await.expect("Failed to create admin");
        tracing::info!("Admin account created: {}", admin_email);
    }
}

/// Seed a pair of sample flights if the catalog is empty
async fn seed_sample_flights(db: &sea_orm::DatabaseConnection) {
    let count = flight::Entity::find()
        .count(db)
        .await
        .expect("Failed to count flights");
    if count > 0 {
        return;
    }

    let samples = [
        (
            "JG101",
            "John F. Kennedy International Airport (JFK)",
            "Los Angeles International Airport (LAX)",
            "2025-04-24T10:00:00Z",
            "2025-04-24T13:30:00Z",
            [
                (CabinClass::Economy, 300.0, 150),
                (CabinClass::PremiumEconomy, 450.0, 50),
                (CabinClass::Business, 800.0, 30),
                (CabinClass::FirstClass, 1200.0, 10),
            ],
        ),
        (
            "JG102",
            "Los Angeles International Airport (LAX)",
            "John F. Kennedy International Airport (JFK)",
            "2025-04-24T15:00:00Z",
            "2025-04-24T23:30:00Z",
            [
                (CabinClass::Economy, 320.0, 150),
                (CabinClass::PremiumEconomy, 470.0, 50),
                (CabinClass::Business, 850.0, 30),
                (CabinClass::FirstClass, 1300.0, 10),
            ],
        ),
    ];

    for (number, from, to, departs, arrives, cabins) in samples {
        let flight_id = Uuid::new_v4();
        let record = flight::ActiveModel {
            id: Set(flight_id),
            flight_number: Set(number.to_string()),
            airline: Set("JetSetGo Airways".to_string()),
            departure_airport: Set(from.to_string()),
            arrival_airport: Set(to.to_string()),
            departure_time: Set(DateTime::parse_from_rfc3339(departs)
                .expect("valid sample departure time")),
            arrival_time: Set(DateTime::parse_from_rfc3339(arrives)
                .expect("valid sample arrival time")),
            ..Default::default()
        };
        record.insert(db).await.expect("Failed to seed flight");

        for (cabin_class, price, seats) in cabins {
            let row = cabin::ActiveModel {
                id: Set(Uuid::new_v4()),
                flight_id: Set(flight_id),
                cabin_class: Set(cabin_class),
                price: Set(price),
                seats_total: Set(seats),
                seats_available: Set(seats),
            };
            row.insert(db).await.expect("Failed to seed flight cabin");
        }
    }

    tracing::info!("Sample flights seeded");
}
