//! Chain Emitter
//!
//! Accepts a single consumer, then stamps, hashes and writes one reading per
//! tick until the source runs dry, the consumer hangs up, or a stop is
//! requested.

use crate::error::EmitterError;
use crate::source::ReadingSource;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;
use weather_record::{ChainStamper, GENESIS_HASH};

/// Emitter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterConfig {
    /// Address to listen on for the consumer
    pub bind_addr: String,
    /// Pause between records in milliseconds (default: 500)
    pub interval_ms: u64,
}

impl EmitterConfig {
    /// Pause between records
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9999".to_string(),
            interval_ms: 500,
        }
    }
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Source had no more readings
    Exhausted,
    /// Consumer closed the connection
    PeerDisconnected,
    /// Stop requested through the cancellation token
    Cancelled,
}

/// Emitter lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitterState {
    /// Listening, no consumer yet
    AwaitingClient,
    /// One record per tick
    Streaming,
    /// Session over
    Stopped(StopReason),
    /// Session aborted by a source, encoding or I/O error
    Failed,
}

/// Summary of a finished session
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub records_sent: u64,
    /// Hash of the last record written (0 if none)
    pub last_hash: i64,
    pub stop_reason: StopReason,
}

/// Hash-chained record emitter
pub struct ChainEmitter {
    config: EmitterConfig,
    state: EmitterState,
    cancel: CancellationToken,
}

impl ChainEmitter {
    /// Create an emitter; cancelling the token stops it at the next record
    /// boundary
    pub fn new(config: EmitterConfig, cancel: CancellationToken) -> Self {
        info!(
            "Creating chain emitter: bind={}, interval={}ms",
            config.bind_addr, config.interval_ms
        );
        Self {
            config,
            state: EmitterState::AwaitingClient,
            cancel,
        }
    }

    /// Current state
    pub fn state(&self) -> EmitterState {
        self.state
    }

    /// Bind the configured address and serve one session
    pub async fn serve<S: ReadingSource>(
        &mut self,
        source: &mut S,
    ) -> Result<SessionReport, EmitterError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve_on(listener, source).await
    }

    /// Wait for one consumer on an existing listener, then stream to it.
    /// The connection is closed when the session ends.
    pub async fn serve_on<S: ReadingSource>(
        &mut self,
        listener: TcpListener,
        source: &mut S,
    ) -> Result<SessionReport, EmitterError> {
        self.state = EmitterState::AwaitingClient;
        info!("Waiting for a consumer on {}", listener.local_addr()?);

        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => accepted?,
            _ = self.cancel.cancelled() => {
                info!("Stop requested before a consumer connected");
                self.state = EmitterState::Stopped(StopReason::Cancelled);
                return Ok(SessionReport {
                    session_id: Uuid::new_v4(),
                    records_sent: 0,
                    last_hash: GENESIS_HASH,
                    stop_reason: StopReason::Cancelled,
                });
            }
        };

        info!("Consumer connected from {}", peer);
        stream.set_nodelay(true)?;
        self.stream(stream, source).await
    }

    /// Stream the source to an already connected writer
    pub async fn stream<W, S>(
        &mut self,
        mut writer: W,
        source: &mut S,
    ) -> Result<SessionReport, EmitterError>
    where
        W: AsyncWrite + Unpin,
        S: ReadingSource,
    {
        self.state = EmitterState::Streaming;
        let session_id = Uuid::new_v4();
        let mut stamper = ChainStamper::new();
        let mut records_sent = 0u64;

        info!("Session {} streaming", session_id);

        let stop_reason = match self
            .pump(&mut writer, source, &mut stamper, &mut records_sent)
            .await
        {
            Ok(reason) => reason,
            Err(e) => {
                warn!(
                    "Session {} failed after {} records: {}",
                    session_id, records_sent, e
                );
                self.state = EmitterState::Failed;
                if let Err(e) = writer.shutdown().await {
                    debug!("Shutdown after failure failed: {}", e);
                }
                return Err(e);
            }
        };

        if stop_reason != StopReason::PeerDisconnected {
            if let Err(e) = writer.shutdown().await {
                debug!("Shutdown after session failed: {}", e);
            }
        }

        self.state = EmitterState::Stopped(stop_reason);
        info!(
            "Session {} stopped ({:?}) after {} records",
            session_id, stop_reason, records_sent
        );

        Ok(SessionReport {
            session_id,
            records_sent,
            last_hash: if records_sent == 0 {
                GENESIS_HASH
            } else {
                stamper.last_hash()
            },
            stop_reason,
        })
    }

    async fn pump<W, S>(
        &self,
        writer: &mut W,
        source: &mut S,
        stamper: &mut ChainStamper,
        records_sent: &mut u64,
    ) -> Result<StopReason, EmitterError>
    where
        W: AsyncWrite + Unpin,
        S: ReadingSource,
    {
        let interval = self.config.interval();

        loop {
            if self.cancel.is_cancelled() {
                return Ok(StopReason::Cancelled);
            }

            let Some(reading) = source.next_reading()? else {
                return Ok(StopReason::Exhausted);
            };

            let record = stamper.stamp(reading, now_epoch_secs())?;
            let line = record.to_wire_line()?;

            if let Err(e) = write_line(writer, line.as_bytes()).await {
                if is_disconnect(&e) {
                    warn!("Consumer broke the connection: {}", e);
                    return Ok(StopReason::PeerDisconnected);
                }
                return Err(e.into());
            }

            *records_sent += 1;
            metrics::counter!("weather_records_emitted_total").increment(1);
            debug!(
                "Sent record {} (last_hash={}, hash={})",
                records_sent,
                record.last_hash,
                stamper.last_hash()
            );

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = self.cancel.cancelled() => return Ok(StopReason::Cancelled),
            }
        }
    }
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &[u8]) -> std::io::Result<()> {
    writer.write_all(line).await?;
    writer.flush().await
}

fn is_disconnect(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::UnexpectedEof
            | ErrorKind::WriteZero
    )
}

/// Wall-clock time as fractional seconds since the Unix epoch
fn now_epoch_secs() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
