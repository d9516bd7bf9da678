//! Hash-Chained Record Emitter
//!
//! Replays raw weather readings to a single TCP consumer at a fixed cadence,
//! stamping each with its feed time and the chain hash of the record before.

mod emitter;
mod error;
mod source;

pub use emitter::{ChainEmitter, EmitterConfig, EmitterState, SessionReport, StopReason};
pub use error::{EmitterError, SourceError};
pub use source::{CsvReadingSource, ReadingSource, VecReadingSource, TARGET_COLUMN};
