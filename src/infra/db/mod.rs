//! Postgres-backed repository implementations.

mod content;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::DatabaseSettings;
use crate::infra::error::InfraError;

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    /// Connect using the configured URL, which is required here.
    pub async fn from_settings(settings: &DatabaseSettings) -> Result<Self, InfraError> {
        let url = settings.url.as_deref().ok_or_else(|| {
            InfraError::configuration(
                "database.url is required (set ALMANAC__DATABASE__URL or pass --database-url)",
            )
        })?;
        let pool = Self::connect(url, settings.max_connections.get())
            .await
            .map_err(|err| InfraError::database(err.to_string()))?;
        Ok(Self::new(pool))
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }
}
