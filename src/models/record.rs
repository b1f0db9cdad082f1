use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One day's observation for one station, in raw file units.
///
/// Temperatures are tenths of a degree and precipitation is hundredths of a
/// unit. The measurement columns are nullable in the store, but the parser only
/// ever produces fully populated records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Record {
    pub date: NaiveDate,
    pub station_id: i64,
    pub max_temperature: Option<i32>,
    pub min_temperature: Option<i32>,
    pub precipitation: Option<i32>,
}

impl Record {
    pub fn new(
        date: NaiveDate,
        station_id: i64,
        max_temperature: i32,
        min_temperature: i32,
        precipitation: i32,
    ) -> Self {
        Self {
            date,
            station_id,
            max_temperature: Some(max_temperature),
            min_temperature: Some(min_temperature),
            precipitation: Some(precipitation),
        }
    }

    /// All three measurements present
    pub fn is_complete(&self) -> bool {
        self.max_temperature.is_some() && self.min_temperature.is_some() && self.precipitation.is_some()
    }

    /// The measurements as a triple when complete.
    pub fn measurements(&self) -> Option<(i32, i32, i32)> {
        Some((
            self.max_temperature?,
            self.min_temperature?,
            self.precipitation?,
        ))
    }
}
