//! Calibration store backed by a JSON file
//!
//! The file holds a JSON array of `CalibrationRecord`s; every save appends one
//! record. A missing file reads as an empty history.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::calibration::{CalibrationMetadata, CalibrationRecord};
use crate::error::{log_transport_error, TransportError};
use crate::ports::{CalibrationStore, SaveReceipt};

pub struct JsonFileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles on the file
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records saved so far, oldest first
    pub async fn load_all(&self) -> Result<Vec<CalibrationRecord>, TransportError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    /// Read-modify-write of the record file under the write lock
    async fn append(&self, record: CalibrationRecord) -> Result<usize, TransportError> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.load_all().await?;
        records.push(record);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&records)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(records.len())
    }

    /// Most recent record for `sensor_id`
    pub async fn latest_for(
        &self,
        sensor_id: &str,
    ) -> Result<Option<CalibrationRecord>, TransportError> {
        let records = self.load_all().await?;
        Ok(records.into_iter().rev().find(|r| r.sensor_id == sensor_id))
    }
}

#[async_trait]
impl CalibrationStore for JsonFileStore {
    async fn save(
        &self,
        sensor_id: &str,
        calibration_constant: f64,
        metadata: CalibrationMetadata,
    ) -> Result<SaveReceipt, TransportError> {
        let record = CalibrationRecord::new(sensor_id, calibration_constant, &metadata);
        let count = self
            .append(record)
            .await
            .inspect_err(|err| log_transport_error(err, "json_store_save"))?;

        log::info!(
            "[JsonFileStore] Saved constant {} for {} to {:?} ({} records)",
            calibration_constant,
            sensor_id,
            self.path,
            count
        );
        Ok(SaveReceipt::saved(sensor_id, calibration_constant))
    }
}
