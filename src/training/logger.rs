use std::path::{Path, PathBuf};

use crate::error::TrainingError;

use super::metrics::MetricKind;

/// One epoch of aggregated results, in column order.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub epoch: usize,
    pub train_loss: f64,
    pub test_loss: f64,
    pub train_metrics: Vec<f64>,
    pub test_metrics: Vec<f64>,
}

/// Append-only CSV epoch log: header once at run start, one row per epoch.
pub struct EpochLogger {
    path: PathBuf,
}

impl EpochLogger {
    /// Create the log file and write its header.
    ///
    /// Columns: `Epoch`, `Train Loss`, `Test Loss`, then one
    /// `Train_<metric>` and one `Test_<metric>` column per configured metric.
    pub fn create(path: &Path, metrics: &[MetricKind]) -> Result<Self, TrainingError> {
        let mut header = vec![
            "Epoch".to_string(),
            "Train Loss".to_string(),
            "Test Loss".to_string(),
        ];
        header.extend(metrics.iter().map(|m| format!("Train_{}", m.name())));
        header.extend(metrics.iter().map(|m| format!("Test_{}", m.name())));

        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&header)?;
        writer.flush().map_err(csv::Error::from)?;

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Append one epoch row.
    pub fn append(&self, record: &LogRecord) -> Result<(), TrainingError> {
        let file = std::fs::OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(csv::Error::from)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        let mut row = vec![
            record.epoch.to_string(),
            record.train_loss.to_string(),
            record.test_loss.to_string(),
        ];
        row.extend(record.train_metrics.iter().map(|v| v.to_string()));
        row.extend(record.test_metrics.iter().map(|v| v.to_string()));

        writer.write_record(&row)?;
        writer.flush().map_err(csv::Error::from)?;

        Ok(())
    }
}
