//! Token Dispatcher
//!
//! Maps each completed line to database writes. Nothing here aborts the stream: malformed
//! lines, failed writes and unexpected row counts are logged and the event is dropped.

use tracing::{debug, warn};

use crate::db::Gateway;
use crate::protocol::{classify, parse_event_field, EventKind};

/// What happened while dispatching one line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Events recognized on the line, in dispatch order
    pub events: Vec<EventKind>,
    /// The line had no event field
    pub malformed: bool,
    /// Writes that returned an error
    pub failed_writes: usize,
    /// Writes that affected a row count other than one
    pub unexpected_counts: usize,
}

impl DispatchReport {
    /// Every recognized event was written as exactly one row
    pub fn is_clean(&self) -> bool {
        !self.malformed && self.failed_writes == 0 && self.unexpected_counts == 0
    }
}

/// Turns completed lines into gateway calls for one intersection
pub struct Dispatcher<G> {
    gateway: G,
    code: i64,
}

impl<G: Gateway> Dispatcher<G> {
    /// Create a dispatcher writing events for intersection `code`
    pub fn new(gateway: G, code: i64) -> Self {
        Self { gateway, code }
    }

    /// Dispatch one completed line. Writes run sequentially in classification order.
    pub async fn dispatch_line(&self, line: &str) -> DispatchReport {
        let mut report = DispatchReport::default();

        let field = match parse_event_field(line) {
            Ok(field) => field,
            Err(e) => {
                warn!("{}", e);
                report.malformed = true;
                return report;
            }
        };

        report.events = classify(field);
        if report.events.is_empty() {
            debug!(line = line.trim_end(), "Unrecognized token");
        }

        for event in report.events.iter().copied() {
            let result = match event {
                EventKind::Start => self.gateway.mark_started(self.code).await,
                EventKind::Vehicle(direction) => {
                    self.gateway.record_vehicle(direction, self.code).await
                }
            };

            match result {
                Ok(1) => debug!(%event, code = self.code, "Event written"),
                Ok(affected) => {
                    warn!(%event, "{} rows were affected instead of 1", affected);
                    report.unexpected_counts += 1;
                }
                Err(e) => {
                    warn!("failed to write {} event to database: {}", event, e);
                    report.failed_writes += 1;
                }
            }
        }

        report
    }
}
