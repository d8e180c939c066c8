pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod handlers;
pub mod inventory;
pub mod middleware;
pub mod routes;
pub mod utils;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

pub use config::Config;
pub use error::{AppError, AppResult};

/// Shared application state. The connection sits behind an `Arc` because
/// sea-orm's `DatabaseConnection` is not `Clone` when the `mock` feature is
/// enabled, and axum needs the state to be cheaply cloneable either way.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Config,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[test]
    fn app_state_clones_with_a_mock_connection() {
        let state = AppState {
            db: Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection()),
            config: Config {
                database_url: String::new(),
                jwt_secret: "secret".to_string(),
                jwt_expiration_hours: 24,
                server_host: "127.0.0.1".to_string(),
                server_port: 3000,
            },
        };

        let cloned = state.clone();
        assert_eq!(cloned.config.server_port, state.config.server_port);
        assert!(Arc::ptr_eq(&cloned.db, &state.db));
    }
}
