//! Event token parsing
//!
//! Recognition is by substring containment, so firmware may append counters or checksums to a
//! token. The checks are independent: a token containing both `west` and `oost` yields both
//! events.

use super::{ProtocolError, FIELD_DELIMITER};

/// Travel direction of a detected vehicle, as stored in the `richting` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// South
    Zuid,
    /// West
    West,
    /// East
    Oost,
}

impl Direction {
    /// All directions in dispatch order
    pub const ALL: [Direction; 3] = [Direction::Zuid, Direction::West, Direction::Oost];

    /// Literal used both in the token and in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Zuid => "zuid",
            Direction::West => "west",
            Direction::Oost => "oost",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recognized event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Controller (re)started
    Start,
    /// Vehicle detected
    Vehicle(Direction),
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Start => f.write_str("start"),
            EventKind::Vehicle(direction) => direction.fmt(f),
        }
    }
}

/// Return the event field (the second `_`-separated field) of a line
pub fn parse_event_field(line: &str) -> Result<&str, ProtocolError> {
    line.split(FIELD_DELIMITER)
        .nth(1)
        .ok_or_else(|| ProtocolError::MalformedLine {
            line: line.trim_end_matches(['\r', '\n']).to_string(),
            delimiter: FIELD_DELIMITER,
        })
}

/// Classify an event field. The result may be empty or hold several events, always in the
/// order start, zuid, west, oost.
pub fn classify(field: &str) -> Vec<EventKind> {
    let mut events = Vec::new();
    if field.contains("start") {
        events.push(EventKind::Start);
    }
    for direction in Direction::ALL {
        if field.contains(direction.as_str()) {
            events.push(EventKind::Vehicle(direction));
        }
    }
    events
}
