//! Protocol errors

use thiserror::Error;

/// Errors that can occur on the serial side of the bridge
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Serial port error: {0}")]
    SerialError(String),

    #[error("Malformed line {line:?}: no '{delimiter}' delimiter")]
    MalformedLine { line: String, delimiter: char },
}
