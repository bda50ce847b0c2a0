//! Startup sequencer and event stream
//!
//! Drives the bridge through its states:
//!
//! ```text
//! LoadingConfig -> EnumeratingPorts -> ValidatingIntersection -> StreamingEvents -> Terminated
//! ```
//!
//! Transitions only move forward. Any failure goes straight to `Terminated` and is returned to
//! the caller; nothing is retried.

use std::io::Write;
use std::path::Path;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info};

use crate::config::{BridgeConfig, ConfigError};
use crate::db::{DbError, Gateway};
use crate::dispatch::Dispatcher;
use crate::protocol::{self, FrameAssembler, PortInfo, ProtocolError, READ_CHUNK_SIZE};

/// Boxed byte stream from the controller
pub type SerialReader = Box<dyn AsyncRead + Unpin + Send>;

/// Bridge lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Reading the config file
    LoadingConfig,
    /// Listing serial devices
    EnumeratingPorts,
    /// Looking up the configured intersection
    ValidatingIntersection,
    /// Reading lines and writing events
    StreamingEvents,
    /// Done, cleanly or not
    Terminated,
}

/// Errors that end a bridge run
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to get ports list: {0}")]
    PortEnumeration(#[source] ProtocolError),

    #[error("No serial ports found!")]
    NoPorts,

    #[error("Failed to query intersection: {0}")]
    Database(#[from] DbError),

    #[error("Failed to find kruising with code {0}, shutting down")]
    IntersectionNotFound(i64),

    #[error("Failed to open port {port}: {source}")]
    OpenPort {
        port: String,
        #[source]
        source: ProtocolError,
    },

    #[error("Serial read failed: {0}")]
    StreamRead(#[source] std::io::Error),
}

impl BridgeError {
    /// Whether the error happened after streaming began. These end the process abruptly;
    /// all others are startup failures.
    pub fn is_fatal_in_stream(&self) -> bool {
        matches!(self, BridgeError::StreamRead(_))
    }
}

/// Totals for a stream that reached end-of-stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSummary {
    /// Completed lines dispatched
    pub lines: usize,
    /// Recognized events (one write attempt each)
    pub events: usize,
    /// Lines without an event field
    pub malformed: usize,
    /// Writes that errored or touched a row count other than one
    pub write_warnings: usize,
}

/// Where the bridge gets its serial devices from
pub trait SerialSource {
    /// Enumerate candidate devices, best first
    fn list_ports(&self) -> Result<Vec<PortInfo>, ProtocolError>;

    /// Open a device as a byte stream
    fn open(&self, port: &PortInfo, baud_rate: u32) -> Result<SerialReader, ProtocolError>;
}

/// Real serial ports via `serialport` / `tokio-serial`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSerial;

impl SerialSource for SystemSerial {
    fn list_ports(&self) -> Result<Vec<PortInfo>, ProtocolError> {
        protocol::list_ports()
    }

    fn open(&self, port: &PortInfo, baud_rate: u32) -> Result<SerialReader, ProtocolError> {
        Ok(Box::new(protocol::open_port(&port.name, baud_rate)?))
    }
}

/// The bridge: one controller, one intersection, one database
pub struct Bridge<S, W> {
    serial: S,
    echo: W,
    state: BridgeState,
    port_override: Option<String>,
}

impl<S: SerialSource, W: Write> Bridge<S, W> {
    /// Create a bridge echoing raw serial data to `echo`
    pub fn new(serial: S, echo: W) -> Self {
        Self {
            serial,
            echo,
            state: BridgeState::LoadingConfig,
            port_override: None,
        }
    }

    /// Open this device instead of the configured or first enumerated one
    pub fn with_port_override(mut self, port: Option<String>) -> Self {
        self.port_override = port;
        self
    }

    /// Current lifecycle state
    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// The echo sink
    pub fn echo(&self) -> &W {
        &self.echo
    }

    fn transition(&mut self, next: BridgeState) {
        debug!(from = ?self.state, to = ?next, "Bridge state change");
        self.state = next;
    }

    /// Load the config file, build the gateway from it and run until end-of-stream.
    pub async fn run<G, F>(
        &mut self,
        config_path: impl AsRef<Path>,
        make_gateway: F,
    ) -> Result<StreamSummary, BridgeError>
    where
        G: Gateway,
        F: FnOnce(&BridgeConfig) -> G,
    {
        let config = match BridgeConfig::from_file(config_path) {
            Ok(config) => config,
            Err(e) => {
                self.transition(BridgeState::Terminated);
                return Err(e.into());
            }
        };
        debug!(code = config.kruisingscode, mysql = ?config.mysql, "Config loaded");
        let gateway = make_gateway(&config);
        self.run_with_config(&config, gateway).await
    }

    /// Run with an already loaded config until end-of-stream.
    pub async fn run_with_config<G: Gateway>(
        &mut self,
        config: &BridgeConfig,
        gateway: G,
    ) -> Result<StreamSummary, BridgeError> {
        let result = self.run_states(config, gateway).await;
        self.transition(BridgeState::Terminated);
        result
    }

    async fn run_states<G: Gateway>(
        &mut self,
        config: &BridgeConfig,
        gateway: G,
    ) -> Result<StreamSummary, BridgeError> {
        self.transition(BridgeState::EnumeratingPorts);
        let port = self.select_port(config)?;

        self.transition(BridgeState::ValidatingIntersection);
        let code = config.kruisingscode;
        let record = gateway
            .lookup_intersection(code)
            .await?
            .ok_or(BridgeError::IntersectionNotFound(code))?;
        info!(
            "Starting kruising {} in {} for opdrachtgever {}",
            record.weg, record.plaats, record.bedrijfsnaam
        );

        let mut reader = self
            .serial
            .open(&port, config.serial.baud_rate)
            .map_err(|source| BridgeError::OpenPort {
                port: port.name.clone(),
                source,
            })?;
        info!(port = %port.name, baud = config.serial.baud_rate, "Serial port opened");

        self.transition(BridgeState::StreamingEvents);
        let dispatcher = Dispatcher::new(gateway, code);
        stream_events(&mut reader, &mut self.echo, &dispatcher).await
    }

    fn select_port(&self, config: &BridgeConfig) -> Result<PortInfo, BridgeError> {
        let ports = self
            .serial
            .list_ports()
            .map_err(BridgeError::PortEnumeration)?;
        if ports.is_empty() {
            return Err(BridgeError::NoPorts);
        }
        for port in &ports {
            info!("Found serial port: {}", port);
        }

        // An override only chooses among present devices; names missing from the list are
        // still tried, since some adapters (ptys, udev lag) never enumerate.
        let requested = self
            .port_override
            .as_deref()
            .or(config.serial.port.as_deref());
        if let Some(name) = requested {
            return Ok(ports
                .into_iter()
                .find(|p| p.name == name)
                .unwrap_or_else(|| PortInfo::named(name)));
        }

        ports.into_iter().next().ok_or(BridgeError::NoPorts)
    }
}

/// Read the controller stream until end-of-stream, dispatching every completed line before
/// issuing the next read.
///
/// Each chunk is echoed to `echo` as it arrives. A zero-length read ends the stream cleanly; a
/// read error is returned as [`BridgeError::StreamRead`].
pub async fn stream_events<R, W, G>(
    reader: &mut R,
    echo: &mut W,
    dispatcher: &Dispatcher<G>,
) -> Result<StreamSummary, BridgeError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: Write + ?Sized,
    G: Gateway,
{
    let mut assembler = FrameAssembler::new();
    let mut summary = StreamSummary::default();
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    loop {
        let n = reader
            .read(&mut chunk)
            .await
            .map_err(BridgeError::StreamRead)?;

        if n == 0 {
            echo_bytes(echo, b"\nEOF\n");
            info!(lines = summary.lines, events = summary.events, "EOF");
            return Ok(summary);
        }

        echo_bytes(echo, &chunk[..n]);

        for line in assembler.push(&chunk[..n]) {
            let report = dispatcher.dispatch_line(&line).await;
            summary.lines += 1;
            summary.events += report.events.len();
            summary.write_warnings += report.failed_writes + report.unexpected_counts;
            if report.malformed {
                summary.malformed += 1;
            }
        }
    }
}

fn echo_bytes<W: Write + ?Sized>(echo: &mut W, bytes: &[u8]) {
    if let Err(e) = echo.write_all(bytes).and_then(|_| echo.flush()) {
        debug!("echo write failed: {}", e);
    }
}
