//! Postgres storage, one `impl Database` block per table group

mod birthday;
mod migrations;
mod pets;
mod player;
mod schedule;
mod settings;

pub use birthday::{BirthdayChannelConfig, BirthdayRow};
pub use player::Player;
pub use settings::GuildSettings;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing::info;

const MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Cheap to clone, every clone shares the same pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect and bring the schema up to date
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(database_url)
            .await?;

        let db = Database { pool };
        db.run_migrations().await?;

        info!("Connected to Postgres with up to {} connections", MAX_CONNECTIONS);
        Ok(db)
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_options() {
        let options = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT);
        assert_eq!(options.get_max_connections(), 5);
        assert_eq!(options.get_acquire_timeout(), Duration::from_secs(10));
    }
}
