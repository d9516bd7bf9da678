//! Chain Hash and Session Linking
//!
//! A record's chain hash is computed over the unordered set of its
//! (field, value) pairs. Pairs are sorted by field name, encoded with postcard
//! and fingerprinted with 64-bit FNV-1a, so the hash does not depend on the
//! order in which a serializer happened to emit the keys.

use crate::chained::{ChainedRecord, FEED_TIMESTAMP, LAST_HASH};
use crate::error::RecordError;
use crate::reading::RawReading;
use serde::Serialize;
use std::collections::BTreeMap;

/// `last_hash` of the first record in a session
pub const GENESIS_HASH: i64 = 0;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Value of a field as it enters the hash
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum CanonicalValue {
    Null,
    Float(f64),
    Integer(i64),
}

impl CanonicalValue {
    /// Canonical float; `-0.0` and `0.0` hash the same, and non-finite
    /// values hash as `Null` because the wire format writes them as `null`
    pub fn float(value: f64) -> Self {
        if !value.is_finite() {
            CanonicalValue::Null
        } else if value == 0.0 {
            CanonicalValue::Float(0.0)
        } else {
            CanonicalValue::Float(value)
        }
    }

    fn optional(value: Option<f64>) -> Self {
        value.map_or(CanonicalValue::Null, Self::float)
    }
}

/// Unordered set of (field, value) pairs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet {
    pairs: BTreeMap<String, CanonicalValue>,
}

impl FieldSet {
    /// Create an empty field set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a pair
    pub fn insert(&mut self, field: impl Into<String>, value: CanonicalValue) {
        self.pairs.insert(field.into(), value);
    }

    /// Field set of a reading alone
    pub fn from_reading(reading: &RawReading) -> Self {
        let mut set = Self::new();
        for (field, value) in reading.fields() {
            set.insert(field.name(), CanonicalValue::optional(value));
        }
        set
    }

    /// Full field set of a chained record, stamps included
    pub fn from_record(record: &ChainedRecord) -> Self {
        let mut set = Self::from_reading(&record.reading);
        set.insert(FEED_TIMESTAMP, CanonicalValue::float(record.feed_timestamp));
        set.insert(LAST_HASH, CanonicalValue::Integer(record.last_hash));
        set
    }

    /// Fingerprint of the sorted pair sequence
    pub fn chain_hash(&self) -> Result<i64, RecordError> {
        let bytes =
            postcard::to_allocvec(&self.pairs).map_err(|e| RecordError::Encode(e.to_string()))?;
        Ok(fnv1a_64(&bytes) as i64)
    }
}

/// Chain hash of a stamped record
pub fn chain_hash(record: &ChainedRecord) -> Result<i64, RecordError> {
    FieldSet::from_record(record).chain_hash()
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Emitter-side chain state: stamps readings and threads the previous hash
#[derive(Debug, Clone)]
pub struct ChainStamper {
    last_hash: i64,
    stamped: u64,
}

impl ChainStamper {
    /// Start a new session
    pub fn new() -> Self {
        Self {
            last_hash: GENESIS_HASH,
            stamped: 0,
        }
    }

    /// Stamp the next reading and remember its hash for the one after
    pub fn stamp(
        &mut self,
        reading: RawReading,
        feed_timestamp: f64,
    ) -> Result<ChainedRecord, RecordError> {
        let record = ChainedRecord {
            reading,
            feed_timestamp,
            last_hash: self.last_hash,
        };
        self.last_hash = chain_hash(&record)?;
        self.stamped += 1;
        Ok(record)
    }

    /// Hash of the most recently stamped record
    pub fn last_hash(&self) -> i64 {
        self.last_hash
    }

    /// Number of records stamped this session
    pub fn stamped(&self) -> u64 {
        self.stamped
    }
}

impl Default for ChainStamper {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of checking one received record against the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainLink {
    /// First record of the session, carrying the sentinel
    Genesis,
    /// `last_hash` matches the previous record
    Linked,
    /// Loss, reordering or tampering between the previous record and this one
    Broken { expected: i64, found: i64 },
}

/// Consumer-side chain check
#[derive(Debug, Clone, Default)]
pub struct ChainVerifier {
    previous: Option<i64>,
}

impl ChainVerifier {
    /// Create a verifier for a fresh session
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a record and advance to it; a broken link resynchronises on it
    pub fn observe(&mut self, record: &ChainedRecord) -> Result<ChainLink, RecordError> {
        let expected = self.previous.unwrap_or(GENESIS_HASH);
        let link = if record.last_hash != expected {
            ChainLink::Broken {
                expected,
                found: record.last_hash,
            }
        } else if self.previous.is_none() {
            ChainLink::Genesis
        } else {
            ChainLink::Linked
        };

        self.previous = Some(chain_hash(record)?);
        Ok(link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::ReadingField;
    use proptest::prelude::*;

    fn reading(row: f64) -> RawReading {
        RawReading {
            air_pressure: Some(919.06),
            air_temperature: Some(23.79),
            avg_wind_direction: Some(281.1),
            avg_wind_speed: Some(3.0803542),
            max_wind_direction: Some(275.4),
            max_wind_speed: Some(3.8632832),
            rain_accumulation: Some(0.89),
            rain_duration: Some(4.0),
            relative_humidity: None,
            row_number: Some(row),
        }
    }

    #[test]
    fn test_fnv_reference_vectors() {
        assert_eq!(fnv1a_64(b""), 0xcbf29ce484222325);
        assert_eq!(fnv1a_64(b"a"), 0xaf63dc4c8601ec8c);
    }

    #[test]
    fn test_hash_is_deterministic_and_value_sensitive() {
        let record = ChainedRecord {
            reading: reading(0.0),
            feed_timestamp: 1559859360.0775285,
            last_hash: 0,
        };
        assert_eq!(chain_hash(&record).unwrap(), chain_hash(&record).unwrap());

        let mut other = record;
        other.feed_timestamp += 1.0;
        assert_ne!(chain_hash(&record).unwrap(), chain_hash(&other).unwrap());

        let mut other = record;
        other.last_hash = 1;
        assert_ne!(chain_hash(&record).unwrap(), chain_hash(&other).unwrap());
    }

    #[test]
    fn test_null_differs_from_zero() {
        let mut a = FieldSet::new();
        a.insert("rain_duration", CanonicalValue::Null);
        let mut b = FieldSet::new();
        b.insert("rain_duration", CanonicalValue::float(0.0));
        assert_ne!(a.chain_hash().unwrap(), b.chain_hash().unwrap());
    }

    #[test]
    fn test_negative_zero_is_canonical() {
        assert_eq!(CanonicalValue::float(-0.0), CanonicalValue::float(0.0));
    }

    #[test]
    fn test_non_finite_hashes_as_written_on_the_wire() {
        assert_eq!(CanonicalValue::float(f64::NAN), CanonicalValue::Null);
        assert_eq!(CanonicalValue::float(f64::INFINITY), CanonicalValue::Null);

        let mut record = ChainedRecord {
            reading: reading(1.0),
            feed_timestamp: 1559859361.5,
            last_hash: 0,
        };
        record.reading.air_pressure = Some(f64::NAN);
        let line = record.to_wire_line().unwrap();
        assert!(line.contains("\"air_pressure\":null"));

        let decoded = ChainedRecord::from_wire_line(&line).unwrap();
        assert_eq!(decoded.reading.air_pressure, None);
        assert_eq!(chain_hash(&decoded).unwrap(), chain_hash(&record).unwrap());
    }

    #[test]
    fn test_hash_survives_key_reordering_serializer() {
        let record = ChainedRecord {
            reading: reading(3.0),
            feed_timestamp: 1559859363.081159,
            last_hash: 5637290165899419028,
        };
        let value = serde_json::to_value(record).unwrap();
        let map = value.as_object().unwrap();
        let body: Vec<String> = map
            .iter()
            .rev()
            .map(|(key, value)| format!("{}:{}", serde_json::to_string(key).unwrap(), value))
            .collect();
        let reordered = format!("{{{}}}", body.join(","));
        assert_ne!(reordered, record.to_wire_line().unwrap().trim_end());

        let decoded = ChainedRecord::from_wire_line(&reordered).unwrap();
        assert_eq!(chain_hash(&decoded).unwrap(), chain_hash(&record).unwrap());
    }

    #[test]
    fn test_stamper_threads_previous_hash() {
        let mut stamper = ChainStamper::new();
        let first = stamper.stamp(reading(0.0), 10.0).unwrap();
        let second = stamper.stamp(reading(1.0), 11.0).unwrap();
        let third = stamper.stamp(reading(2.0), 12.0).unwrap();

        assert_eq!(first.last_hash, GENESIS_HASH);
        assert_eq!(second.last_hash, chain_hash(&first).unwrap());
        assert_eq!(third.last_hash, chain_hash(&second).unwrap());
        assert_eq!(stamper.last_hash(), chain_hash(&third).unwrap());
        assert_eq!(stamper.stamped(), 3);
    }

    #[test]
    fn test_verifier_detects_loss() {
        let mut stamper = ChainStamper::new();
        let records: Vec<_> = (0..4)
            .map(|i| stamper.stamp(reading(i as f64), 100.0 + i as f64).unwrap())
            .collect();

        let mut verifier = ChainVerifier::new();
        assert_eq!(verifier.observe(&records[0]).unwrap(), ChainLink::Genesis);
        assert_eq!(verifier.observe(&records[1]).unwrap(), ChainLink::Linked);
        // records[2] lost in transit
        let link = verifier.observe(&records[3]).unwrap();
        assert_eq!(
            link,
            ChainLink::Broken {
                expected: chain_hash(&records[1]).unwrap(),
                found: records[3].last_hash,
            }
        );
    }

    #[test]
    fn test_verifier_resynchronises_after_break() {
        let mut stamper = ChainStamper::new();
        let records: Vec<_> = (0..4)
            .map(|i| stamper.stamp(reading(i as f64), 100.0 + i as f64).unwrap())
            .collect();

        let mut verifier = ChainVerifier::new();
        assert!(matches!(
            verifier.observe(&records[1]).unwrap(),
            ChainLink::Broken { expected: GENESIS_HASH, .. }
        ));
        assert_eq!(verifier.observe(&records[2]).unwrap(), ChainLink::Linked);
        assert_eq!(verifier.observe(&records[3]).unwrap(), ChainLink::Linked);
    }

    fn arb_value() -> impl Strategy<Value = CanonicalValue> {
        prop_oneof![
            Just(CanonicalValue::Null),
            (-1.0e6f64..1.0e6).prop_map(CanonicalValue::float),
            any::<i64>().prop_map(CanonicalValue::Integer),
        ]
    }

    proptest! {
        #[test]
        fn prop_hash_is_order_independent(
            (pairs, shuffled) in prop::collection::vec(arb_value(), 12)
                .prop_map(|values| {
                    let names = ReadingField::ALL
                        .iter()
                        .map(|f| f.name().to_string())
                        .chain([FEED_TIMESTAMP.to_string(), LAST_HASH.to_string()]);
                    names.zip(values).collect::<Vec<_>>()
                })
                .prop_flat_map(|pairs| (Just(pairs.clone()), Just(pairs).prop_shuffle()))
        ) {
            let mut forward = FieldSet::new();
            for (name, value) in &pairs {
                forward.insert(name.clone(), *value);
            }
            let mut permuted = FieldSet::new();
            for (name, value) in &shuffled {
                permuted.insert(name.clone(), *value);
            }
            prop_assert_eq!(forward.chain_hash().unwrap(), permuted.chain_hash().unwrap());
        }
    }
}
