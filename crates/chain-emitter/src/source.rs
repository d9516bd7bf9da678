//! Raw Reading Sources

use crate::error::SourceError;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use tracing::{debug, info};
use weather_record::{RawReading, ReadingField};

/// Prediction target column; never fed downstream
pub const TARGET_COLUMN: &str = "relative_humidity_pm";

/// Produces raw readings one at a time, in canonical order
pub trait ReadingSource {
    /// Next reading, or `None` when the source is exhausted
    fn next_reading(&mut self) -> Result<Option<RawReading>, SourceError>;
}

/// In-memory source
#[derive(Debug, Clone, Default)]
pub struct VecReadingSource {
    readings: VecDeque<RawReading>,
}

impl VecReadingSource {
    /// Create a source yielding the given readings in order
    pub fn new(readings: Vec<RawReading>) -> Self {
        Self {
            readings: readings.into(),
        }
    }

    /// Readings not yet pulled
    pub fn remaining(&self) -> usize {
        self.readings.len()
    }
}

impl ReadingSource for VecReadingSource {
    fn next_reading(&mut self) -> Result<Option<RawReading>, SourceError> {
        Ok(self.readings.pop_front())
    }
}

/// Comma-separated source with a header row.
///
/// Empty cells become missing values. The target column and any column
/// outside the reading schema are skipped. Cells may be wrapped in double
/// quotes but may not contain commas. Non-finite numbers are rejected.
pub struct CsvReadingSource<R> {
    lines: Lines<R>,
    columns: Vec<Option<ReadingField>>,
    line: usize,
}

impl CsvReadingSource<BufReader<File>> {
    /// Open a CSV file
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        info!("Opening reading source {}", path.display());
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: BufRead> CsvReadingSource<R> {
    /// Read the header and prepare to stream rows
    pub fn from_reader(reader: R) -> Result<Self, SourceError> {
        let mut lines = reader.lines();
        let header = lines.next().ok_or(SourceError::EmptyInput)??;

        let columns: Vec<Option<ReadingField>> = header
            .split(',')
            .map(|name| {
                let name = unquote(name);
                let field = ReadingField::from_name(name);
                if name == TARGET_COLUMN {
                    debug!("Dropping target column {}", name);
                } else if field.is_none() {
                    debug!("Ignoring unknown column {:?}", name);
                }
                field
            })
            .collect();

        if let Some(missing) = ReadingField::ALL
            .into_iter()
            .find(|field| !columns.contains(&Some(*field)))
        {
            return Err(SourceError::MissingColumn(missing.name()));
        }

        Ok(Self {
            lines,
            columns,
            line: 1,
        })
    }

    fn parse_row(&self, row: &str) -> Result<RawReading, SourceError> {
        let cells: Vec<&str> = row.split(',').collect();
        if cells.len() != self.columns.len() {
            return Err(SourceError::ColumnCount {
                line: self.line,
                expected: self.columns.len(),
                found: cells.len(),
            });
        }

        let mut reading = RawReading::default();
        for (cell, column) in cells.iter().zip(&self.columns) {
            let Some(field) = column else { continue };
            let cell = unquote(cell);
            let value = if cell.is_empty() {
                None
            } else {
                let parsed = cell
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| SourceError::InvalidNumber {
                        line: self.line,
                        column: field.name(),
                        value: cell.to_string(),
                    })?;
                Some(parsed)
            };
            reading.set(*field, value);
        }
        Ok(reading)
    }
}

impl<R: BufRead> ReadingSource for CsvReadingSource<R> {
    fn next_reading(&mut self) -> Result<Option<RawReading>, SourceError> {
        loop {
            let Some(row) = self.lines.next() else {
                return Ok(None);
            };
            let row = row?;
            self.line += 1;
            if row.trim().is_empty() {
                continue;
            }
            return self.parse_row(&row).map(Some);
        }
    }
}

fn unquote(cell: &str) -> &str {
    let cell = cell.trim();
    cell.strip_prefix('"')
        .and_then(|c| c.strip_suffix('"'))
        .map_or(cell, str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HEADER: &str = "row_number,air_pressure,air_temperature,avg_wind_direction,avg_wind_speed,max_wind_direction,max_wind_speed,rain_accumulation,rain_duration,relative_humidity,relative_humidity_pm";

    fn source(body: &str) -> CsvReadingSource<Cursor<String>> {
        CsvReadingSource::from_reader(Cursor::new(format!("{HEADER}\n{body}"))).unwrap()
    }

    #[test]
    fn test_vec_source_preserves_order() {
        let readings: Vec<_> = (0..3)
            .map(|i| RawReading {
                row_number: Some(i as f64),
                ..Default::default()
            })
            .collect();
        let mut source = VecReadingSource::new(readings);
        for i in 0..3 {
            let reading = source.next_reading().unwrap().unwrap();
            assert_eq!(reading.row_number, Some(i as f64));
        }
        assert!(source.next_reading().unwrap().is_none());
        assert_eq!(source.remaining(), 0);
    }

    #[test]
    fn test_csv_rows_and_target_drop() {
        let mut source = source(
            "0,919.06,23.79,281.1,3.0803542,275.4,3.8632832,0.89,4.0,43.42,36.16\n\
             1,917.3476881,21.89102368,101.9351794,2.443009216,140.4715485,3.533323602,0.0,0.0,24.32869729,19.42\n",
        );

        let first = source.next_reading().unwrap().unwrap();
        assert_eq!(first.row_number, Some(0.0));
        assert_eq!(first.air_pressure, Some(919.06));
        assert_eq!(first.relative_humidity, Some(43.42));

        let second = source.next_reading().unwrap().unwrap();
        assert_eq!(second.row_number, Some(1.0));
        assert_eq!(second.rain_duration, Some(0.0));

        assert!(source.next_reading().unwrap().is_none());
    }

    #[test]
    fn test_csv_empty_cells_are_missing() {
        let mut source = source("2,923.04,,51.0,17.0678522,63.7,22.1009672,,20.0,8.9,\n");
        let reading = source.next_reading().unwrap().unwrap();
        assert_eq!(reading.air_temperature, None);
        assert_eq!(reading.rain_accumulation, None);
        assert_eq!(reading.rain_duration, Some(20.0));
    }

    #[test]
    fn test_csv_skips_blank_lines() {
        let mut source = source("\n3,920.5,21.1,198.8,4.3,211.2,5.1,0.0,0.0,12.1,10.0\n\n");
        assert!(source.next_reading().unwrap().is_some());
        assert!(source.next_reading().unwrap().is_none());
    }

    #[test]
    fn test_csv_invalid_number() {
        let mut source = source("4,abc,6.83,277.8,1.85,136.5,2.86,8.9,14730.0,92.41,90.0\n");
        match source.next_reading() {
            Err(SourceError::InvalidNumber { line, column, value }) => {
                assert_eq!(line, 2);
                assert_eq!(column, "air_pressure");
                assert_eq!(value, "abc");
            }
            other => panic!("expected invalid number, got {other:?}"),
        }
    }

    #[test]
    fn test_csv_rejects_non_finite_numbers() {
        for bad in ["NaN", "inf", "-infinity"] {
            let mut source = source(&format!(
                "4,{bad},6.83,277.8,1.85,136.5,2.86,8.9,14730.0,92.41,90.0\n"
            ));
            match source.next_reading() {
                Err(SourceError::InvalidNumber { column, value, .. }) => {
                    assert_eq!(column, "air_pressure");
                    assert_eq!(value, bad);
                }
                other => panic!("expected invalid number for {bad}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_csv_quoted_cells() {
        let quoted_header = HEADER
            .split(',')
            .map(|name| format!("\"{name}\""))
            .collect::<Vec<_>>()
            .join(",");
        let body = "\"0\",\"919.06\",23.79,281.1,3.0803542,275.4,3.8632832,0.89,4.0,\"\",36.16\n";
        let mut source =
            CsvReadingSource::from_reader(Cursor::new(format!("{quoted_header}\n{body}"))).unwrap();

        let reading = source.next_reading().unwrap().unwrap();
        assert_eq!(reading.row_number, Some(0.0));
        assert_eq!(reading.air_pressure, Some(919.06));
        assert_eq!(reading.relative_humidity, None);
    }

    #[test]
    fn test_csv_column_count_mismatch() {
        let mut source = source("5,915.3,25.78\n");
        assert!(matches!(
            source.next_reading(),
            Err(SourceError::ColumnCount {
                expected: 11,
                found: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_csv_header_must_cover_schema() {
        let result = CsvReadingSource::from_reader(Cursor::new("air_pressure,air_temperature\n"));
        assert!(matches!(result, Err(SourceError::MissingColumn(_))));

        let result = CsvReadingSource::from_reader(Cursor::new(String::new()));
        assert!(matches!(result, Err(SourceError::EmptyInput)));
    }
}
