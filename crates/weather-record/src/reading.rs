//! Raw Sensor Reading

use serde::Serialize;

/// Field of a raw weather reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReadingField {
    /// Air pressure (hPa)
    AirPressure,
    /// Air temperature (°C)
    AirTemperature,
    /// Average wind bearing (degrees, 0 = North, clockwise)
    AvgWindDirection,
    /// Average wind speed
    AvgWindSpeed,
    /// Bearing of the strongest gust
    MaxWindDirection,
    /// Speed of the strongest gust
    MaxWindSpeed,
    /// Rain accumulated in the sample period
    RainAccumulation,
    /// Seconds of rain in the sample period
    RainDuration,
    /// Relative humidity (%)
    RelativeHumidity,
    /// Source row index (administrative)
    RowNumber,
}

impl ReadingField {
    /// All fields in wire order
    pub const ALL: [ReadingField; 10] = [
        ReadingField::AirPressure,
        ReadingField::AirTemperature,
        ReadingField::AvgWindDirection,
        ReadingField::AvgWindSpeed,
        ReadingField::MaxWindDirection,
        ReadingField::MaxWindSpeed,
        ReadingField::RainAccumulation,
        ReadingField::RainDuration,
        ReadingField::RelativeHumidity,
        ReadingField::RowNumber,
    ];

    /// Wire name of the field
    pub fn name(&self) -> &'static str {
        match self {
            ReadingField::AirPressure => "air_pressure",
            ReadingField::AirTemperature => "air_temperature",
            ReadingField::AvgWindDirection => "avg_wind_direction",
            ReadingField::AvgWindSpeed => "avg_wind_speed",
            ReadingField::MaxWindDirection => "max_wind_direction",
            ReadingField::MaxWindSpeed => "max_wind_speed",
            ReadingField::RainAccumulation => "rain_accumulation",
            ReadingField::RainDuration => "rain_duration",
            ReadingField::RelativeHumidity => "relative_humidity",
            ReadingField::RowNumber => "row_number",
        }
    }

    /// Look up a field by its wire name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }

    /// Whether the field carries bookkeeping rather than a measurement
    pub fn is_administrative(&self) -> bool {
        matches!(self, ReadingField::RowNumber)
    }
}

/// One per-second weather sample; any measurement may be missing
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RawReading {
    pub air_pressure: Option<f64>,
    pub air_temperature: Option<f64>,
    pub avg_wind_direction: Option<f64>,
    pub avg_wind_speed: Option<f64>,
    pub max_wind_direction: Option<f64>,
    pub max_wind_speed: Option<f64>,
    pub rain_accumulation: Option<f64>,
    pub rain_duration: Option<f64>,
    pub relative_humidity: Option<f64>,
    pub row_number: Option<f64>,
}

impl RawReading {
    /// Get the value of a field
    pub fn get(&self, field: ReadingField) -> Option<f64> {
        match field {
            ReadingField::AirPressure => self.air_pressure,
            ReadingField::AirTemperature => self.air_temperature,
            ReadingField::AvgWindDirection => self.avg_wind_direction,
            ReadingField::AvgWindSpeed => self.avg_wind_speed,
            ReadingField::MaxWindDirection => self.max_wind_direction,
            ReadingField::MaxWindSpeed => self.max_wind_speed,
            ReadingField::RainAccumulation => self.rain_accumulation,
            ReadingField::RainDuration => self.rain_duration,
            ReadingField::RelativeHumidity => self.relative_humidity,
            ReadingField::RowNumber => self.row_number,
        }
    }

    /// Set the value of a field
    pub fn set(&mut self, field: ReadingField, value: Option<f64>) {
        let slot = match field {
            ReadingField::AirPressure => &mut self.air_pressure,
            ReadingField::AirTemperature => &mut self.air_temperature,
            ReadingField::AvgWindDirection => &mut self.avg_wind_direction,
            ReadingField::AvgWindSpeed => &mut self.avg_wind_speed,
            ReadingField::MaxWindDirection => &mut self.max_wind_direction,
            ReadingField::MaxWindSpeed => &mut self.max_wind_speed,
            ReadingField::RainAccumulation => &mut self.rain_accumulation,
            ReadingField::RainDuration => &mut self.rain_duration,
            ReadingField::RelativeHumidity => &mut self.relative_humidity,
            ReadingField::RowNumber => &mut self.row_number,
        };
        *slot = value;
    }

    /// Iterate over (field, value) pairs in wire order
    pub fn fields(&self) -> impl Iterator<Item = (ReadingField, Option<f64>)> + '_ {
        ReadingField::ALL.into_iter().map(|field| (field, self.get(field)))
    }

    /// Copy of the reading with administrative fields cleared
    pub fn without_administrative(&self) -> Self {
        let mut stripped = *self;
        for field in ReadingField::ALL {
            if field.is_administrative() {
                stripped.set(field, None);
            }
        }
        stripped
    }
}
