// Telemetry readings produced by the agent
//
// Readings are plain values: a reading is never mutated after creation, and
// restamping produces a new value. Per-reading timestamps stay local to the
// agent and are not part of the published payloads.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Three-axis accelerometer sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AccelerometerReading {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    #[serde(skip)]
    pub time: DateTime<Utc>,
}

/// GPS fix
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GpsReading {
    pub longitude: f64,
    pub latitude: f64,
    #[serde(skip)]
    pub time: DateTime<Utc>,
}

/// Parking sensor sample: free slots near a position
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParkingReading {
    pub empty_count: i32,
    pub gps: GpsReading,
    #[serde(skip)]
    pub time: DateTime<Utc>,
}

/// One reading of each kind taken from the same source position
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AggregatedRecord {
    pub accelerometer: AccelerometerReading,
    pub gps: GpsReading,
    pub parking: ParkingReading,
    /// Capture time, assigned when the record is materialized
    pub time: DateTime<Utc>,
}

impl AccelerometerReading {
    /// Build from `x, y, z` cells
    pub fn from_cells(cells: &[f64], time: DateTime<Utc>) -> Result<Self, String> {
        expect_cells(cells, 3)?;
        Ok(Self {
            x: integral(cells[0], "x")?,
            y: integral(cells[1], "y")?,
            z: integral(cells[2], "z")?,
            time,
        })
    }

    pub fn at(self, time: DateTime<Utc>) -> Self {
        Self { time, ..self }
    }
}

impl GpsReading {
    /// Build from `longitude, latitude` cells
    pub fn from_cells(cells: &[f64], time: DateTime<Utc>) -> Result<Self, String> {
        expect_cells(cells, 2)?;
        Ok(Self {
            longitude: cells[0],
            latitude: cells[1],
            time,
        })
    }

    pub fn at(self, time: DateTime<Utc>) -> Self {
        Self { time, ..self }
    }
}

impl ParkingReading {
    /// Build from `empty_count, longitude, latitude` cells
    pub fn from_cells(cells: &[f64], time: DateTime<Utc>) -> Result<Self, String> {
        expect_cells(cells, 3)?;
        Ok(Self {
            empty_count: integral(cells[0], "empty_count")?,
            gps: GpsReading::from_cells(&cells[1..], time)?,
            time,
        })
    }

    pub fn at(self, time: DateTime<Utc>) -> Self {
        Self {
            gps: self.gps.at(time),
            time,
            ..self
        }
    }
}

/// Readings loaded from one aligned position of the three sources
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignedRow {
    pub accelerometer: AccelerometerReading,
    pub gps: GpsReading,
    pub parking: ParkingReading,
}

impl AlignedRow {
    /// Stamp every reading with `time` and wrap them in a record
    pub fn materialize(&self, time: DateTime<Utc>) -> AggregatedRecord {
        AggregatedRecord {
            accelerometer: self.accelerometer.at(time),
            gps: self.gps.at(time),
            parking: self.parking.at(time),
            time,
        }
    }
}

fn expect_cells(cells: &[f64], expected: usize) -> Result<(), String> {
    if cells.len() != expected {
        return Err(format!(
            "expected {} values, found {}",
            expected,
            cells.len()
        ));
    }
    Ok(())
}

fn integral(value: f64, field: &str) -> Result<i32, String> {
    if value.fract() != 0.0 || value < i32::MIN as f64 || value > i32::MAX as f64 {
        return Err(format!("{} must be an integer, found {}", field, value));
    }
    Ok(value as i32)
}
