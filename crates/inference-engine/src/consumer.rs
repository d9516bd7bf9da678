//! Stream Consumer
//!
//! Reads newline-delimited chained records, checks the chain, predicts and
//! writes each enriched record as one JSON line. A bad record is dropped and
//! the loop moves on.

use crate::adapter::{PredictedRecord, PredictorAdapter};
use crate::InferenceError;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use weather_record::{ChainLink, ChainVerifier, ChainedRecord, RecordError};

/// Counters for one consumer session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    /// Non-blank lines read
    pub received: u64,
    pub predicted: u64,
    pub rejected: u64,
    pub chain_breaks: u64,
}

/// Sequential consumer in front of a [`PredictorAdapter`]
pub struct StreamConsumer {
    adapter: PredictorAdapter,
    verifier: ChainVerifier,
    cancel: CancellationToken,
    stats: ConsumerStats,
}

impl StreamConsumer {
    pub fn new(adapter: PredictorAdapter, cancel: CancellationToken) -> Self {
        info!("Creating stream consumer with {} model", adapter.model_name());
        Self {
            adapter,
            verifier: ChainVerifier::new(),
            cancel,
            stats: ConsumerStats::default(),
        }
    }

    /// Counters so far
    pub fn stats(&self) -> ConsumerStats {
        self.stats
    }

    /// Connect to an emitter and consume until it closes the stream
    pub async fn connect_and_run<W: AsyncWrite + Unpin>(
        &mut self,
        addr: &str,
        output: W,
    ) -> Result<ConsumerStats, InferenceError> {
        info!("Connecting to emitter at {}", addr);
        let stream = TcpStream::connect(addr).await?;
        self.run(stream, output).await
    }

    /// Consume lines until end of input or cancellation
    pub async fn run<R, W>(&mut self, input: R, mut output: W) -> Result<ConsumerStats, InferenceError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut reader = BufReader::new(input);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let read = tokio::select! {
                read = reader.read_until(b'\n', &mut buf) => read?,
                _ = self.cancel.cancelled() => {
                    info!("Stop requested, consumer exiting");
                    break;
                }
            };
            if read == 0 {
                debug!("Input closed");
                break;
            }
            if buf.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            self.stats.received += 1;
            let decoded: Result<&str, InferenceError> = std::str::from_utf8(&buf)
                .map_err(|e| RecordError::Malformed(format!("invalid UTF-8: {e}")).into());
            match decoded.and_then(|line| self.process_line(line)) {
                Ok(predicted) => {
                    output.write_all(predicted.to_json_line()?.as_bytes()).await?;
                    output.flush().await?;
                    self.stats.predicted += 1;
                    metrics::counter!("weather_records_predicted_total").increment(1);
                }
                Err(e) => {
                    warn!("Rejected record {}: {}", self.stats.received, e);
                    self.stats.rejected += 1;
                    metrics::counter!("weather_records_rejected_total").increment(1);
                }
            }
        }

        output.flush().await?;
        info!(
            "Consumer finished: received={}, predicted={}, rejected={}, chain_breaks={}",
            self.stats.received, self.stats.predicted, self.stats.rejected, self.stats.chain_breaks
        );
        Ok(self.stats)
    }

    /// Decode, verify and predict one wire line
    pub fn process_line(&mut self, line: &str) -> Result<PredictedRecord, InferenceError> {
        let record = ChainedRecord::from_wire_line(line)?;

        match self.verifier.observe(&record)? {
            ChainLink::Genesis => debug!("Chain started"),
            ChainLink::Linked => {}
            ChainLink::Broken { expected, found } => {
                warn!(
                    "Chain break: expected last_hash {}, found {}; resynchronising",
                    expected, found
                );
                self.stats.chain_breaks += 1;
                metrics::counter!("weather_chain_breaks_total").increment(1);
            }
        }

        self.adapter.predict(&record)
    }
}
