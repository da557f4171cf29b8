use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::info;

use crate::app_config::MarketplaceRules;
use crate::reservation_repo::PgReservationStore;
use crate::ride_repo::PgRideRepository;
use crate::route_repo::PgRouteRepository;

/// Connection entry point; hands out the Postgres-backed repositories.
#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    pub fn ride_repository(&self) -> PgRideRepository {
        PgRideRepository::new(self.pool.clone())
    }

    pub fn route_repository(&self, rules: MarketplaceRules) -> PgRouteRepository {
        PgRouteRepository::new(self.pool.clone(), rules)
    }

    pub fn reservation_store(&self) -> PgReservationStore {
        PgReservationStore::new(self.pool.clone())
    }
}
