// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
//
// Metrics recorded per epoch:
//   - epoch:              the epoch number (1, 2, 3, ...)
//   - train_loss:         average combined loss on the training set
//   - val_loss:           average combined loss on the validation set
//   - sentiment_acc:      share of polarities predicted correctly
//   - shared_domain_acc:  domain accuracy from the shared representation
//   - private_domain_acc: domain accuracy from the private summary
//   - mask_percentage:    mean share of eligible tokens masked
//
// Output file: checkpoints/metrics.csv
//
// Example CSV output:
//   epoch,train_loss,val_loss,sentiment_acc,shared_domain_acc,private_domain_acc,mask_percentage
//   1,3.412000,3.298100,0.561000,0.502000,0.611000,0.184000
//   2,3.105400,3.120300,0.642000,0.488000,0.702000,0.201000
//   ...
//
// How to read the metrics:
//   - sentiment_acc should rise every epoch
//   - shared_domain_acc near chance (1 / number of domains) means the
//     adversary can no longer tell the domains apart
//   - private_domain_acc should stay high
//   - mask_percentage stuck at 0 or 1 means the gate has collapsed

use anyhow::Result;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};
use serde::{Deserialize, Serialize};

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Average combined loss over all training batches
    pub train_loss: f64,

    /// Average combined loss on the validation set
    pub val_loss: f64,

    /// Fraction of polarities predicted correctly, [0.0, 1.0]
    pub sentiment_acc: f64,

    /// Fraction of domains recovered from the shared representation
    pub shared_domain_acc: f64,

    /// Fraction of domains recovered from the private summary
    pub private_domain_acc: f64,

    /// Mean share of eligible tokens replaced by [MASK]
    pub mask_percentage: f64,
}

impl EpochMetrics {
    /// Returns true if this epoch improved over the previous best val_loss
    pub fn is_improvement(&self, best_val_loss: f64) -> bool {
        self.val_loss < best_val_loss
    }
}

const CSV_HEADER: &str =
    "epoch,train_loss,val_loss,sentiment_acc,shared_domain_acc,private_domain_acc,mask_percentage";

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    /// Full path to the CSV file
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a new MetricsLogger.
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl Into<String>) -> Result<Self> {
        let dir = PathBuf::from(dir.into());

        // Create directory if it doesn't exist
        fs::create_dir_all(&dir)?;

        let csv_path = dir.join("metrics.csv");

        // Write CSV header only if file is new
        // This allows appending to an existing log across runs
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            // Write the header row
            writeln!(f, "{CSV_HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    ///
    /// Uses OpenOptions with append=true so we add to the file
    /// without overwriting previous epochs.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        // Open in append mode — adds to end of file
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        // Write one CSV row with 6 decimal places for each metric
        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6}",
            m.epoch,
            m.train_loss,
            m.val_loss,
            m.sentiment_acc,
            m.shared_domain_acc,
            m.private_domain_acc,
            m.mask_percentage,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );

        Ok(())
    }

    /// Return the path to the metrics CSV file
    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(epoch: usize, val_loss: f64) -> EpochMetrics {
        EpochMetrics {
            epoch,
            train_loss: 2.5,
            val_loss,
            sentiment_acc: 0.6,
            shared_domain_acc: 0.5,
            private_domain_acc: 0.9,
            mask_percentage: 0.25,
        }
    }

    #[test]
    fn test_is_improvement() {
        let m = metrics(2, 2.3);
        // 2.3 < 3.0 → this is an improvement
        assert!(m.is_improvement(3.0));
        // 2.3 is NOT less than 2.0 → not an improvement
        assert!(!m.is_improvement(2.0));
    }

    #[test]
    fn test_rows_are_appended_under_one_header() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_string_lossy().to_string();

        let logger = MetricsLogger::new(dir.clone()).unwrap();
        logger.log(&metrics(1, 3.0)).unwrap();
        // reopening keeps the existing file
        let logger = MetricsLogger::new(dir).unwrap();
        logger.log(&metrics(2, 2.0)).unwrap();

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines[2], "2,2.500000,2.000000,0.600000,0.500000,0.900000,0.250000");
    }
}
