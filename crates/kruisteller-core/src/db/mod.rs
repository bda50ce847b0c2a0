//! Database Gateway
//!
//! One lookup at startup, then one independent write per recognized event. Writes are
//! best-effort: no transactions and no retries. Callers compare the returned affected-row
//! count against one.

mod error;
mod mysql;

pub use error::{DbError, Result};
pub use mysql::MySqlGateway;

use async_trait::async_trait;

use crate::protocol::Direction;

/// Intersection metadata joined with its client
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct IntersectionRecord {
    /// Town or city
    pub plaats: String,
    /// Road name
    pub weg: String,
    /// Client company name
    pub bedrijfsnaam: String,
}

/// Operations the bridge needs from the database
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Look up an intersection by code. `None` when no row matches.
    async fn lookup_intersection(&self, code: i64) -> Result<Option<IntersectionRecord>>;

    /// Set the intersection's last-started timestamp to now. Returns affected rows.
    async fn mark_started(&self, code: i64) -> Result<u64>;

    /// Insert a vehicle event timestamped now. Returns affected rows.
    async fn record_vehicle(&self, direction: Direction, code: i64) -> Result<u64>;
}

#[async_trait]
impl<G: Gateway + ?Sized> Gateway for std::sync::Arc<G> {
    async fn lookup_intersection(&self, code: i64) -> Result<Option<IntersectionRecord>> {
        (**self).lookup_intersection(code).await
    }

    async fn mark_started(&self, code: i64) -> Result<u64> {
        (**self).mark_started(code).await
    }

    async fn record_vehicle(&self, direction: Direction, code: i64) -> Result<u64> {
        (**self).record_vehicle(direction, code).await
    }
}
