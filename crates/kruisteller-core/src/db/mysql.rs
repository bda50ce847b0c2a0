//! MySQL gateway backed by an sqlx connection pool.

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{Gateway, IntersectionRecord, Result};
use crate::config::MysqlConfig;
use crate::protocol::Direction;

/// Upper bound on open connections
const MAX_CONNECTIONS: u32 = 10;

/// Connections are recycled after this long
const CONNECTION_MAX_LIFETIME: Duration = Duration::from_secs(3 * 60);

const LOOKUP_INTERSECTION_SQL: &str = "SELECT plaats, weg, bedrijfsnaam FROM Kruising \
     JOIN Opdrachtgever ON Kruising.bedrijfscode = Opdrachtgever.bedrijfscode \
     WHERE kruisingscode = ?";

const MARK_STARTED_SQL: &str =
    "UPDATE Kruising SET laatst_opgestart = NOW() WHERE kruisingscode = ?";

const RECORD_VEHICLE_SQL: &str =
    "INSERT INTO Auto (datumtijd, richting, kruisingscode) VALUES (NOW(), ?, ?)";

/// Gateway for the intersection counting schema on MySQL.
#[derive(Clone)]
pub struct MySqlGateway {
    pool: MySqlPool,
}

impl MySqlGateway {
    /// Build a lazily connecting pool.
    ///
    /// No connection is made until the first query, so an unreachable server surfaces as an
    /// error from the intersection lookup. Must be called inside a tokio runtime.
    pub fn connect_lazy(config: &MysqlConfig) -> Self {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.pass)
            .database(&config.db);

        let pool = MySqlPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .min_connections(0)
            .max_lifetime(CONNECTION_MAX_LIFETIME)
            .connect_lazy_with(options);

        info!(host = %config.host, port = config.port, db = %config.db, "MySQL pool configured");

        Self { pool }
    }

    /// Close all pooled connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Gateway for MySqlGateway {
    async fn lookup_intersection(&self, code: i64) -> Result<Option<IntersectionRecord>> {
        let rows: Vec<IntersectionRecord> = sqlx::query_as(LOOKUP_INTERSECTION_SQL)
            .bind(code)
            .fetch_all(&self.pool)
            .await?;

        for row in &rows {
            debug!(
                code,
                plaats = %row.plaats,
                weg = %row.weg,
                bedrijfsnaam = %row.bedrijfsnaam,
                "Intersection row"
            );
        }
        if rows.len() > 1 {
            warn!(
                code,
                rows = rows.len(),
                "Intersection code matches more than one row, using the first"
            );
        }

        Ok(rows.into_iter().next())
    }

    async fn mark_started(&self, code: i64) -> Result<u64> {
        let result = sqlx::query(MARK_STARTED_SQL)
            .bind(code)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn record_vehicle(&self, direction: Direction, code: i64) -> Result<u64> {
        let result = sqlx::query(RECORD_VEHICLE_SQL)
            .bind(direction.as_str())
            .bind(code)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
