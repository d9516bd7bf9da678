//! Chain-Stamped Wire Record
//!
//! One record per line: a JSON object holding every reading field (explicit
//! `null` for missing values) followed by `feed_timestamp` and `last_hash`.

use crate::error::RecordError;
use crate::reading::{RawReading, ReadingField};
use serde::Serialize;
use serde_json::{Map, Value};

/// Wire key of the stamping time
pub const FEED_TIMESTAMP: &str = "feed_timestamp";

/// Wire key of the previous record's chain hash
pub const LAST_HASH: &str = "last_hash";

/// Reading stamped with its feed time and the hash of its predecessor
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChainedRecord {
    #[serde(flatten)]
    pub reading: RawReading,
    /// Wall-clock stamping time, seconds since the Unix epoch
    pub feed_timestamp: f64,
    /// Chain hash of the previously emitted record (0 for the first)
    pub last_hash: i64,
}

impl ChainedRecord {
    /// Encode as a newline-terminated wire line
    pub fn to_wire_line(&self) -> Result<String, RecordError> {
        let mut line =
            serde_json::to_string(self).map_err(|e| RecordError::Encode(e.to_string()))?;
        line.push('\n');
        Ok(line)
    }

    /// Decode one wire line (trailing newline optional)
    pub fn from_wire_line(line: &str) -> Result<Self, RecordError> {
        let value: Value = serde_json::from_str(line.trim_end())
            .map_err(|e| RecordError::Malformed(e.to_string()))?;

        match value {
            Value::Object(map) => Self::from_map(&map),
            other => Err(RecordError::Malformed(format!(
                "expected a JSON object, got {}",
                kind_of(&other)
            ))),
        }
    }

    /// Decode from an already parsed JSON object
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, RecordError> {
        if let Some(unknown) = map.keys().find(|key| !is_known_key(key)) {
            return Err(RecordError::UnexpectedField(unknown.clone()));
        }

        let mut reading = RawReading::default();
        for field in ReadingField::ALL {
            let value = map
                .get(field.name())
                .ok_or(RecordError::MissingField(field.name()))?;
            reading.set(field, optional_number(field.name(), value)?);
        }

        let feed_timestamp = map
            .get(FEED_TIMESTAMP)
            .ok_or(RecordError::MissingField(FEED_TIMESTAMP))?
            .as_f64()
            .ok_or(RecordError::InvalidValue {
                field: FEED_TIMESTAMP,
                reason: "expected a number",
            })?;

        let last_hash = map
            .get(LAST_HASH)
            .ok_or(RecordError::MissingField(LAST_HASH))?
            .as_i64()
            .ok_or(RecordError::InvalidValue {
                field: LAST_HASH,
                reason: "expected a signed 64-bit integer",
            })?;

        Ok(Self {
            reading,
            feed_timestamp,
            last_hash,
        })
    }
}

fn is_known_key(key: &str) -> bool {
    key == FEED_TIMESTAMP || key == LAST_HASH || ReadingField::from_name(key).is_some()
}

fn optional_number(field: &'static str, value: &Value) -> Result<Option<f64>, RecordError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n.as_f64().map(Some).ok_or(RecordError::InvalidValue {
            field,
            reason: "number out of range",
        }),
        _ => Err(RecordError::InvalidValue {
            field,
            reason: "expected a number or null",
        }),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{"air_pressure": 919.06, "air_temperature": 23.79, "avg_wind_direction": 281.1, "avg_wind_speed": 3.08, "max_wind_direction": 275.4, "max_wind_speed": 3.86, "rain_accumulation": 0.89, "rain_duration": 4.0, "relative_humidity": 43.42, "row_number": 0.0, "feed_timestamp": 1559859360.07, "last_hash": 0}"#;

    #[test]
    fn test_decode_sample_line() {
        let record = ChainedRecord::from_wire_line(&format!("{SAMPLE}\n")).unwrap();
        assert_eq!(record.reading.air_pressure, Some(919.06));
        assert_eq!(record.reading.rain_duration, Some(4.0));
        assert_eq!(record.reading.row_number, Some(0.0));
        assert_eq!(record.feed_timestamp, 1559859360.07);
        assert_eq!(record.last_hash, 0);
    }

    #[test]
    fn test_encode_writes_explicit_nulls_in_order() {
        let record = ChainedRecord {
            reading: RawReading {
                air_pressure: Some(919.06),
                ..Default::default()
            },
            feed_timestamp: 1.5,
            last_hash: -822556792205670904,
        };
        let line = record.to_wire_line().unwrap();

        assert!(line.ends_with('\n'));
        assert!(line.starts_with(r#"{"air_pressure":919.06,"air_temperature":null"#));
        assert!(line.contains(r#""row_number":null,"feed_timestamp":1.5,"last_hash":-822556792205670904}"#));

        let decoded = ChainedRecord::from_wire_line(&line).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_missing_key_is_rejected() {
        let line = SAMPLE.replace(r#""rain_duration": 4.0, "#, "");
        let err = ChainedRecord::from_wire_line(&line).unwrap_err();
        assert!(matches!(err, RecordError::MissingField("rain_duration")));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let line = SAMPLE.replace(
            r#""last_hash": 0"#,
            r#""last_hash": 0, "relative_humidity_pm": 35.0"#,
        );
        let err = ChainedRecord::from_wire_line(&line).unwrap_err();
        assert!(matches!(err, RecordError::UnexpectedField(ref k) if k == "relative_humidity_pm"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let line = SAMPLE.replace(r#""air_pressure": 919.06"#, r#""air_pressure": "high""#);
        assert!(matches!(
            ChainedRecord::from_wire_line(&line),
            Err(RecordError::InvalidValue { field: "air_pressure", .. })
        ));

        let line = SAMPLE.replace(r#""last_hash": 0"#, r#""last_hash": null"#);
        assert!(matches!(
            ChainedRecord::from_wire_line(&line),
            Err(RecordError::InvalidValue { field: LAST_HASH, .. })
        ));

        let line = SAMPLE.replace(r#""last_hash": 0"#, r#""last_hash": 0.5"#);
        assert!(ChainedRecord::from_wire_line(&line).is_err());
    }

    #[test]
    fn test_non_object_is_malformed() {
        assert!(matches!(
            ChainedRecord::from_wire_line("[1, 2, 3]"),
            Err(RecordError::Malformed(_))
        ));
        assert!(matches!(
            ChainedRecord::from_wire_line("{\"air_pressure\": "),
            Err(RecordError::Malformed(_))
        ));
    }
}
