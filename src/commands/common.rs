//! Option groups shared across commands, composed with `#[command(flatten)]`.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use famcall_lib::metrics::{Metric, write_metrics_auto};
use famcall_lib::parallel::DEFAULT_BATCH_SIZE;
use famcall_lib::validation::{validate_file_exists, validate_output_parent, validate_positive};

/// Input and output paths.
#[derive(Debug, Clone, Args)]
pub struct IoOptions {
    /// Input file
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Output file
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
}

impl IoOptions {
    /// Checks that the input exists and the output can be created.
    pub fn validate(&self, input_type: &str) -> Result<()> {
        validate_file_exists(&self.input, input_type)?;
        validate_output_parent(&self.output, "output")?;
        Ok(())
    }
}

/// Worker pool sizing.
#[derive(Debug, Clone, Args)]
pub struct ThreadingOptions {
    /// Number of worker threads; 1 processes everything on the main thread
    #[arg(short = 't', long = "threads", default_value_t = 1)]
    pub threads: usize,

    /// Number of families or templates handed to a worker at a time
    #[arg(long = "batch-size", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,
}

impl Default for ThreadingOptions {
    fn default() -> Self {
        Self { threads: 1, batch_size: DEFAULT_BATCH_SIZE }
    }
}

impl ThreadingOptions {
    pub fn validate(&self) -> Result<()> {
        validate_positive(self.threads, "threads")?;
        validate_positive(self.batch_size, "batch-size")?;
        Ok(())
    }
}

/// Optional metrics output.
#[derive(Debug, Clone, Default, Args)]
pub struct MetricsOptions {
    /// Write summary metrics to this TSV file
    #[arg(short = 'm', long = "metrics")]
    pub metrics: Option<PathBuf>,
}

impl MetricsOptions {
    pub fn validate(&self) -> Result<()> {
        if let Some(path) = &self.metrics {
            validate_output_parent(path, "metrics")?;
        }
        Ok(())
    }

    /// Writes `metrics` as a single-row TSV when a path was given.
    pub fn write<T: Metric>(&self, metrics: &T) -> Result<()> {
        match &self.metrics {
            Some(path) => write_metrics_auto(path, std::slice::from_ref(metrics)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use famcall_lib::metrics::RescueMetrics;
    use tempfile::TempDir;

    #[test]
    fn test_threading_validation() {
        ThreadingOptions::default().validate().unwrap();
        assert!(ThreadingOptions { threads: 0, batch_size: 10 }.validate().is_err());
        assert!(ThreadingOptions { threads: 2, batch_size: 0 }.validate().is_err());
    }

    #[test]
    fn test_io_validation() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.fq");
        std::fs::write(&input, "").unwrap();
        let io = IoOptions { input: input.clone(), output: dir.path().join("out.fq") };
        io.validate("FASTQ").unwrap();

        let missing = IoOptions { input: dir.path().join("nope.fq"), output: io.output.clone() };
        assert!(missing.validate("FASTQ").is_err());

        let bad_output = IoOptions { input, output: dir.path().join("no/such/dir/out.fq") };
        assert!(bad_output.validate("FASTQ").is_err());
    }

    #[test]
    fn test_metrics_written_only_when_requested() {
        MetricsOptions::default().write(&RescueMetrics::new()).unwrap();

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rescue.tsv");
        let options = MetricsOptions { metrics: Some(path.clone()) };
        options.validate().unwrap();
        options.write(&RescueMetrics { total_reads: 4, ..RescueMetrics::default() }).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.starts_with("index_reads\t"));
        assert_eq!(text.lines().count(), 2);
    }
}
