// Cyclic batch reader over the recorded telemetry dataset
//
// Three CSV sources (accelerometer, gps, parking) are loaded once and merged
// into aligned rows. Batches of random size are then read from a cursor that
// loops back to the first row, emulating a live sensor feed.

use crate::error::{AgentError, AgentResult};
use crate::types::{AccelerometerReading, AggregatedRecord, AlignedRow, GpsReading, ParkingReading};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

/// One of the three recorded sources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Accelerometer,
    Gps,
    Parking,
}

impl SourceKind {
    pub fn name(self) -> &'static str {
        match self {
            SourceKind::Accelerometer => "accelerometer",
            SourceKind::Gps => "gps",
            SourceKind::Parking => "parking",
        }
    }
}

/// Locations of the three CSV sources
#[derive(Debug, Clone)]
pub struct SourcePaths {
    pub accelerometer: PathBuf,
    pub gps: PathBuf,
    pub parking: PathBuf,
}

impl SourcePaths {
    pub fn new(
        accelerometer: impl Into<PathBuf>,
        gps: impl Into<PathBuf>,
        parking: impl Into<PathBuf>,
    ) -> Self {
        Self {
            accelerometer: accelerometer.into(),
            gps: gps.into(),
            parking: parking.into(),
        }
    }
}

/// Inclusive range batch sizes are drawn from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSizeRange {
    range: RangeInclusive<usize>,
}

impl BatchSizeRange {
    pub fn new(min: usize, max: usize) -> AgentResult<Self> {
        if min == 0 {
            return Err(AgentError::InvalidConfig(
                "batch size minimum must be at least 1".to_string(),
            ));
        }
        if min > max {
            return Err(AgentError::InvalidConfig(format!(
                "batch size minimum {} exceeds maximum {}",
                min, max
            )));
        }
        Ok(Self { range: min..=max })
    }

    pub fn min(&self) -> usize {
        *self.range.start()
    }

    pub fn max(&self) -> usize {
        *self.range.end()
    }

    pub fn draw<R: Rng>(&self, rng: &mut R) -> usize {
        rng.random_range(self.range.clone())
    }
}

impl Default for BatchSizeRange {
    fn default() -> Self {
        Self { range: 5..=25 }
    }
}

pub struct CyclicBatchReader {
    paths: SourcePaths,
    batch_size: BatchSizeRange,
    rows: Vec<AlignedRow>,
    position: usize,
    rng: StdRng,
}

impl CyclicBatchReader {
    pub fn new(paths: SourcePaths, batch_size: BatchSizeRange) -> Self {
        Self::with_rng(paths, batch_size, StdRng::from_os_rng())
    }

    /// Reader with a deterministic batch size sequence
    pub fn with_seed(paths: SourcePaths, batch_size: BatchSizeRange, seed: u64) -> Self {
        Self::with_rng(paths, batch_size, StdRng::seed_from_u64(seed))
    }

    fn with_rng(paths: SourcePaths, batch_size: BatchSizeRange, rng: StdRng) -> Self {
        Self {
            paths,
            batch_size,
            rows: Vec::new(),
            position: 0,
            rng,
        }
    }

    /// Read all three sources, replacing anything loaded before.
    ///
    /// On error the reader is left unloaded.
    pub fn load(&mut self) -> AgentResult<()> {
        self.unload();

        let loaded_at = Utc::now();
        let accelerometer = read_source(
            &self.paths.accelerometer,
            SourceKind::Accelerometer,
            3,
            loaded_at,
            AccelerometerReading::from_cells,
        )?;
        let gps = read_source(
            &self.paths.gps,
            SourceKind::Gps,
            2,
            loaded_at,
            GpsReading::from_cells,
        )?;
        let parking = read_source(
            &self.paths.parking,
            SourceKind::Parking,
            3,
            loaded_at,
            ParkingReading::from_cells,
        )?;

        self.load_readings(accelerometer, gps, parking)?;

        tracing::info!(
            "Loaded {} telemetry rows (batch size {}..={})",
            self.rows.len(),
            self.batch_size.min(),
            self.batch_size.max()
        );
        Ok(())
    }

    /// Install already parsed readings. The three sequences must have equal length.
    pub fn load_readings(
        &mut self,
        accelerometer: Vec<AccelerometerReading>,
        gps: Vec<GpsReading>,
        parking: Vec<ParkingReading>,
    ) -> AgentResult<()> {
        if accelerometer.len() != gps.len() || gps.len() != parking.len() {
            return Err(AgentError::DataMismatch {
                accelerometer: accelerometer.len(),
                gps: gps.len(),
                parking: parking.len(),
            });
        }

        self.rows = accelerometer
            .into_iter()
            .zip(gps)
            .zip(parking)
            .map(|((accelerometer, gps), parking)| AlignedRow {
                accelerometer,
                gps,
                parking,
            })
            .collect();
        self.position = 0;
        Ok(())
    }

    pub fn unload(&mut self) {
        self.rows.clear();
        self.position = 0;
    }

    /// Produce the next batch, wrapping to the first row when the end is reached.
    ///
    /// The batch length always equals one draw from the batch size range.
    pub fn next_batch(&mut self) -> AgentResult<Vec<AggregatedRecord>> {
        let len = self.rows.len();
        if len == 0 {
            return Err(AgentError::NoDataLoaded);
        }

        let target = self.batch_size.draw(&mut self.rng);
        let mut batch = Vec::with_capacity(target);

        while batch.len() < target {
            let take = (target - batch.len()).min(len - self.position);
            let segment = &self.rows[self.position..self.position + take];
            batch.extend(segment.iter().map(|row| row.materialize(Utc::now())));
            self.position = (self.position + take) % len;
        }

        tracing::debug!(
            "Read batch of {} records, next position {}",
            batch.len(),
            self.position
        );
        Ok(batch)
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_loaded(&self) -> bool {
        !self.rows.is_empty()
    }
}

fn read_source<T>(
    path: &Path,
    kind: SourceKind,
    expected_cells: usize,
    time: DateTime<Utc>,
    build: fn(&[f64], DateTime<Utc>) -> Result<T, String>,
) -> AgentResult<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| AgentError::SourceUnavailable {
            source_name: kind.name().to_string(),
            reason: format!("{}: {}", path.display(), e),
        })?;

    let mut readings = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| AgentError::Validation {
            source_name: kind.name().to_string(),
            line: e.position().map(|p| p.line()).unwrap_or(0),
            reason: e.to_string(),
        })?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let invalid = |reason: String| AgentError::Validation {
            source_name: kind.name().to_string(),
            line,
            reason,
        };

        if record.len() != expected_cells {
            return Err(invalid(format!(
                "expected {} values, found {}",
                expected_cells,
                record.len()
            )));
        }

        let cells = record
            .iter()
            .map(|cell| {
                cell.parse::<f64>()
                    .map_err(|_| format!("'{}' is not a number", cell))
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid)?;

        readings.push(build(&cells, time).map_err(invalid)?);
    }

    Ok(readings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn fixture(accelerometer: &str, gps: &str, parking: &str) -> (TempDir, SourcePaths) {
        let dir = TempDir::new().unwrap();
        let paths = SourcePaths::new(
            write_csv(&dir, "accelerometer.csv", accelerometer),
            write_csv(&dir, "gps.csv", gps),
            write_csv(&dir, "parking.csv", parking),
        );
        (dir, paths)
    }

    fn numbered_fixture(rows: usize) -> (TempDir, SourcePaths) {
        let mut accelerometer = String::from("x,y,z\n");
        let mut gps = String::from("longitude,latitude\n");
        let mut parking = String::from("empty_count,longitude,latitude\n");
        for i in 0..rows {
            accelerometer.push_str(&format!("{},0,0\n", i));
            gps.push_str(&format!("{}.0,0.0\n", i));
            parking.push_str(&format!("{},{}.0,0.0\n", i, i));
        }
        fixture(&accelerometer, &gps, &parking)
    }

    #[test]
    fn test_single_row_batch() {
        let (_dir, paths) = fixture(
            "x,y,z\n1,2,3\n",
            "longitude,latitude\n10,20\n",
            "empty_count,longitude,latitude\n5,10,20\n",
        );
        let mut reader =
            CyclicBatchReader::with_seed(paths, BatchSizeRange::new(1, 1).unwrap(), 7);
        reader.load().unwrap();

        let before = Utc::now();
        let batch = reader.next_batch().unwrap();

        assert_eq!(batch.len(), 1);
        let record = &batch[0];
        assert_eq!(
            (record.accelerometer.x, record.accelerometer.y, record.accelerometer.z),
            (1, 2, 3)
        );
        assert_eq!((record.gps.longitude, record.gps.latitude), (10.0, 20.0));
        assert_eq!(record.parking.empty_count, 5);
        assert_eq!(
            (record.parking.gps.longitude, record.parking.gps.latitude),
            (10.0, 20.0)
        );
        assert!(record.time >= before);
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_rows_stay_aligned_across_batches() {
        let (_dir, paths) = numbered_fixture(7);
        let mut reader =
            CyclicBatchReader::with_seed(paths, BatchSizeRange::new(2, 5).unwrap(), 42);
        reader.load().unwrap();

        for _ in 0..20 {
            for record in reader.next_batch().unwrap() {
                let index = record.accelerometer.x;
                assert_eq!(record.gps.longitude, index as f64);
                assert_eq!(record.parking.empty_count, index);
            }
        }
    }

    #[test]
    fn test_batches_cycle_through_dataset() {
        let (_dir, paths) = numbered_fixture(4);
        let mut reader =
            CyclicBatchReader::with_seed(paths, BatchSizeRange::new(3, 3).unwrap(), 1);
        reader.load().unwrap();

        let first: Vec<i32> = reader
            .next_batch()
            .unwrap()
            .iter()
            .map(|r| r.accelerometer.x)
            .collect();
        assert_eq!(first, vec![0, 1, 2]);
        assert_eq!(reader.position(), 3);

        let second: Vec<i32> = reader
            .next_batch()
            .unwrap()
            .iter()
            .map(|r| r.accelerometer.x)
            .collect();
        assert_eq!(second, vec![3, 0, 1]);
        assert_eq!(reader.position(), 2);
    }

    #[test]
    fn test_batch_larger_than_dataset_wraps_repeatedly() {
        let (_dir, paths) = numbered_fixture(2);
        let mut reader =
            CyclicBatchReader::with_seed(paths, BatchSizeRange::new(5, 5).unwrap(), 3);
        reader.load().unwrap();

        let indices: Vec<i32> = reader
            .next_batch()
            .unwrap()
            .iter()
            .map(|r| r.accelerometer.x)
            .collect();
        assert_eq!(indices, vec![0, 1, 0, 1, 0]);
        assert_eq!(reader.position(), 1);
    }

    #[test]
    fn test_batch_sizes_stay_in_range() {
        let (_dir, paths) = numbered_fixture(10);
        let mut reader = CyclicBatchReader::with_seed(paths, BatchSizeRange::default(), 9);
        reader.load().unwrap();

        for _ in 0..50 {
            let size = reader.next_batch().unwrap().len();
            assert!((5..=25).contains(&size));
            assert!(reader.position() < reader.len());
        }
    }

    #[test]
    fn test_next_batch_requires_data() {
        let (_dir, paths) = numbered_fixture(3);
        let mut reader = CyclicBatchReader::new(paths, BatchSizeRange::default());

        assert!(matches!(reader.next_batch(), Err(AgentError::NoDataLoaded)));

        reader.load().unwrap();
        assert!(reader.next_batch().is_ok());

        reader.unload();
        reader.unload();
        assert!(!reader.is_loaded());
        assert_eq!(reader.position(), 0);
        assert!(matches!(reader.next_batch(), Err(AgentError::NoDataLoaded)));
    }

    #[test]
    fn test_length_mismatch_is_reported() {
        let (_dir, paths) = fixture(
            "x,y,z\n1,2,3\n4,5,6\n",
            "longitude,latitude\n10,20\n",
            "empty_count,longitude,latitude\n5,10,20\n1,2,3\n",
        );
        let mut reader = CyclicBatchReader::new(paths, BatchSizeRange::default());

        match reader.load() {
            Err(AgentError::DataMismatch {
                accelerometer,
                gps,
                parking,
            }) => assert_eq!((accelerometer, gps, parking), (2, 1, 2)),
            other => panic!("expected DataMismatch, got {:?}", other),
        }
        assert!(!reader.is_loaded());
    }

    #[test]
    fn test_missing_source() {
        let (dir, mut paths) = numbered_fixture(2);
        paths.gps = dir.path().join("missing.csv");
        let mut reader = CyclicBatchReader::new(paths, BatchSizeRange::default());

        match reader.load() {
            Err(AgentError::SourceUnavailable { source_name, .. }) => {
                assert_eq!(source_name, "gps")
            }
            other => panic!("expected SourceUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_cells() {
        let (_dir, paths) = fixture(
            "x,y,z\n1,2,3\n4,abc,6\n",
            "longitude,latitude\n10,20\n11,21\n",
            "empty_count,longitude,latitude\n5,10,20\n6,11,21\n",
        );
        let mut reader = CyclicBatchReader::new(paths, BatchSizeRange::default());

        match reader.load() {
            Err(AgentError::Validation {
                source_name, line, ..
            }) => {
                assert_eq!(source_name, "accelerometer");
                assert_eq!(line, 3);
            }
            other => panic!("expected Validation, got {:?}", other),
        }

        let (_dir, paths) = fixture(
            "x,y,z\n1.5,2,3\n",
            "longitude,latitude\n10,20\n",
            "empty_count,longitude,latitude\n5,10,20\n",
        );
        let mut reader = CyclicBatchReader::new(paths, BatchSizeRange::default());
        assert!(matches!(reader.load(), Err(AgentError::Validation { .. })));

        let (_dir, paths) = fixture(
            "x,y,z\n1,2,3\n",
            "longitude,latitude\n10\n",
            "empty_count,longitude,latitude\n5,10,20\n",
        );
        let mut reader = CyclicBatchReader::new(paths, BatchSizeRange::default());
        assert!(matches!(reader.load(), Err(AgentError::Validation { .. })));
    }

    #[test]
    fn test_batch_size_range_validation() {
        assert!(BatchSizeRange::new(0, 5).is_err());
        assert!(BatchSizeRange::new(6, 5).is_err());

        let range = BatchSizeRange::new(3, 3).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(range.draw(&mut rng), 3);
    }
}
