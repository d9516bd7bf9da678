//! Weather Record Model
//!
//! Raw sensor readings, chain-stamped wire records and the order-independent
//! chain hash that links successive records of a feed session.

mod chain;
mod chained;
mod error;
mod reading;

pub use chain::{chain_hash, CanonicalValue, ChainLink, ChainStamper, ChainVerifier, FieldSet, GENESIS_HASH};
pub use chained::{ChainedRecord, FEED_TIMESTAMP, LAST_HASH};
pub use error::RecordError;
pub use reading::{RawReading, ReadingField};
