//! Emitter Error Types

use thiserror::Error;
use weather_record::RecordError;

/// Errors while reading the raw reading source
#[derive(Debug, Error)]
pub enum SourceError {
    /// Underlying reader failed
    #[error("I/O error reading source: {0}")]
    Io(#[from] std::io::Error),

    /// No header row
    #[error("Source is empty, expected a header row")]
    EmptyInput,

    /// Header lacks a reading field
    #[error("Source header lacks column {0}")]
    MissingColumn(&'static str),

    /// Row width differs from the header
    #[error("Line {line}: expected {expected} columns, found {found}")]
    ColumnCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// Cell is neither empty nor a number
    #[error("Line {line}: invalid number {value:?} in column {column}")]
    InvalidNumber {
        line: usize,
        column: &'static str,
        value: String,
    },
}

/// Errors that abort an emitter session
#[derive(Debug, Error)]
pub enum EmitterError {
    /// Listener or connection failure other than the peer going away
    #[error("Transport error: {0}")]
    Io(#[from] std::io::Error),

    /// Source could not produce the next reading
    #[error("Reading source failed: {0}")]
    Source(#[from] SourceError),

    /// Record could not be hashed or encoded
    #[error("Record encoding failed: {0}")]
    Record(#[from] RecordError),
}
