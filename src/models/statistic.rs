use serde::{Deserialize, Serialize};

use crate::models::Record;
use crate::utils::constants::{HUNDREDTHS_PER_UNIT, TENTHS_PER_DEGREE};

/// Yearly aggregate for one station, in whole units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Statistic {
    pub station_id: i64,
    pub year: i32,
    pub avg_max_temperature: f64,
    pub avg_min_temperature: f64,
    pub total_precipitation: f64,
}

/// Running sums for one (station, year) group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YearlyAccumulator {
    pub count: u64,
    pub max_temperature_sum: i64,
    pub min_temperature_sum: i64,
    pub precipitation_sum: i64,
}

impl YearlyAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record; incomplete records are ignored. Returns whether it counted.
    pub fn add(&mut self, record: &Record) -> bool {
        match record.measurements() {
            Some((max, min, precipitation)) => {
                self.count += 1;
                self.max_temperature_sum += i64::from(max);
                self.min_temperature_sum += i64::from(min);
                self.precipitation_sum += i64::from(precipitation);
                true
            }
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn finish(&self, station_id: i64, year: i32) -> Option<Statistic> {
        if self.is_empty() {
            return None;
        }

        let count = self.count as f64;
        Some(Statistic {
            station_id,
            year,
            avg_max_temperature: self.max_temperature_sum as f64 / count / TENTHS_PER_DEGREE,
            avg_min_temperature: self.min_temperature_sum as f64 / count / TENTHS_PER_DEGREE,
            total_precipitation: self.precipitation_sum as f64 / HUNDREDTHS_PER_UNIT,
        })
    }
}
