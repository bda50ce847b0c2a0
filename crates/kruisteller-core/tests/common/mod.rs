#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_trait::async_trait;
use kruisteller_core::bridge::{SerialReader, SerialSource};
use kruisteller_core::config::BridgeConfig;
use kruisteller_core::db::{self, DbError, Gateway, IntersectionRecord};
use kruisteller_core::protocol::{Direction, PortInfo, ProtocolError};
use tokio::io::{AsyncRead, ReadBuf};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn config(code: i64) -> BridgeConfig {
    BridgeConfig::from_yaml_str(&format!(
        "mysql:\n  host: localhost\n  user: teller\n  pass: geheim\n  db: verkeer\n\
         kruisingscode: {}\n",
        code
    ))
    .unwrap()
}

pub fn utrecht() -> IntersectionRecord {
    IntersectionRecord {
        plaats: "Utrecht".into(),
        weg: "Ringweg".into(),
        bedrijfsnaam: "ACME".into(),
    }
}

/// A gateway call as observed by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Lookup(i64),
    MarkStarted(i64),
    RecordVehicle(Direction, i64),
}

/// Scripted outcome of a write
#[derive(Debug, Clone, Copy)]
pub enum WriteOutcome {
    Affected(u64),
    Fail,
}

/// Records calls; writes affect one row unless scripted otherwise
#[derive(Default)]
pub struct MockGateway {
    record: Option<IntersectionRecord>,
    calls: Mutex<Vec<Call>>,
    outcomes: Mutex<VecDeque<WriteOutcome>>,
}

impl MockGateway {
    pub fn with_record(record: IntersectionRecord) -> Arc<Self> {
        Arc::new(Self {
            record: Some(record),
            ..Default::default()
        })
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, outcomes: impl IntoIterator<Item = WriteOutcome>) {
        self.outcomes.lock().unwrap().extend(outcomes);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn write(&self, call: Call) -> db::Result<u64> {
        self.calls.lock().unwrap().push(call);
        match self.outcomes.lock().unwrap().pop_front() {
            None => Ok(1),
            Some(WriteOutcome::Affected(n)) => Ok(n),
            Some(WriteOutcome::Fail) => Err(DbError::Sqlx(sqlx::Error::PoolTimedOut)),
        }
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn lookup_intersection(&self, code: i64) -> db::Result<Option<IntersectionRecord>> {
        self.calls.lock().unwrap().push(Call::Lookup(code));
        Ok(self.record.clone())
    }

    async fn mark_started(&self, code: i64) -> db::Result<u64> {
        self.write(Call::MarkStarted(code))
    }

    async fn record_vehicle(&self, direction: Direction, code: i64) -> db::Result<u64> {
        self.write(Call::RecordVehicle(direction, code))
    }
}

/// Serves one scripted chunk per read; an exhausted script reads as end-of-stream
pub struct ChunkedReader {
    chunks: VecDeque<io::Result<Vec<u8>>>,
}

impl ChunkedReader {
    pub fn new<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        Self {
            chunks: chunks.into_iter().map(|c| Ok(c.as_ref().to_vec())).collect(),
        }
    }

    pub fn then_fail(mut self) -> Self {
        self.chunks
            .push_back(Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged")));
        self
    }
}

impl AsyncRead for ChunkedReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.chunks.pop_front() {
            Some(Ok(bytes)) => {
                buf.put_slice(&bytes);
                Poll::Ready(Ok(()))
            }
            Some(Err(e)) => Poll::Ready(Err(e)),
            None => Poll::Ready(Ok(())),
        }
    }
}

/// Serial source with fixed ports and a single scripted stream
pub struct MockSerial {
    ports: Result<Vec<PortInfo>, String>,
    reader: Mutex<Option<ChunkedReader>>,
    open_fails: bool,
    pub opened: Arc<Mutex<Vec<String>>>,
}

impl MockSerial {
    pub fn new(ports: &[&str], reader: ChunkedReader) -> Self {
        Self {
            ports: Ok(ports.iter().map(|p| PortInfo::named(*p)).collect()),
            reader: Mutex::new(Some(reader)),
            open_fails: false,
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing_enumeration() -> Self {
        let mut serial = Self::new(&[], ChunkedReader::new(Vec::<Vec<u8>>::new()));
        serial.ports = Err("permission denied".into());
        serial
    }

    pub fn failing_open(mut self) -> Self {
        self.open_fails = true;
        self
    }
}

impl SerialSource for MockSerial {
    fn list_ports(&self) -> Result<Vec<PortInfo>, ProtocolError> {
        self.ports.clone().map_err(ProtocolError::SerialError)
    }

    fn open(&self, port: &PortInfo, _baud_rate: u32) -> Result<SerialReader, ProtocolError> {
        self.opened.lock().unwrap().push(port.name.clone());
        if self.open_fails {
            return Err(ProtocolError::SerialError("device busy".into()));
        }
        let reader = self
            .reader
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| ProtocolError::SerialError("already open".into()))?;
        Ok(Box::new(reader))
    }
}

pub fn open_count(opened: &Arc<Mutex<Vec<String>>>) -> usize {
    opened.lock().unwrap().len()
}

pub fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

pub fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

pub fn count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}
