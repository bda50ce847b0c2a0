//! Counter Controller Protocol
//!
//! The controller writes one newline-terminated line per event, with fields separated by
//! underscores. The second field carries the event token (`start`, `zuid`, `west`, `oost`).

mod error;
pub mod frame;
pub mod serial;
pub mod token;

pub use error::ProtocolError;
pub use frame::FrameAssembler;
pub use serial::{list_ports, open_port, PortInfo};
pub use token::{classify, parse_event_field, Direction, EventKind};

/// Default baud rate of the counting controller
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Bytes requested per serial read
pub const READ_CHUNK_SIZE: usize = 100;

/// Field separator within a line
pub const FIELD_DELIMITER: char = '_';

/// Line terminator
pub const LINE_TERMINATOR: u8 = b'\n';
