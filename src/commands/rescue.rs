//! Rewrite near-miss barcodes onto well-supported families.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use famcall_lib::fastq::{FastqReads, FastqWriter};
use famcall_lib::logging::{OperationTimer, log_rescue_summary};
use famcall_lib::progress::ProgressTracker;
use famcall_lib::rescue::{build_index, histogram_from_index_reads, rescue_read};
use famcall_lib::umi::RescueOptions;
use famcall_lib::umi::rescue::{
    DEFAULT_MAX_MISMATCHES, DEFAULT_MIN_FAMILY_SIZE, MAX_SUPPORTED_MISMATCHES,
};
use famcall_lib::validation::{validate_at_most, validate_file_exists, validate_positive};
use log::info;

use crate::commands::command::Command;
use crate::commands::common::{IoOptions, MetricsOptions};

/// Rescue reads whose barcode is a few mismatches away from a true family.
#[derive(Debug, Parser)]
#[command(
    name = "rescue",
    about = "\x1b[38;5;173m[GROUPING]\x1b[0m      \x1b[36mRescue reads with near-miss barcodes\x1b[0m",
    long_about = r#"
Reassign reads whose barcode contains sequencing errors to the family they came from.

The index FASTQ holds one barcode read per template. Barcodes seen in at least
--min-family-size index reads are true barcodes; every sequence within --max-mismatches of
exactly one true barcode is rescued onto it. Sequences equally close to two true barcodes are
ambiguous and left alone.

Reads in --input carry their barcode in the BS tag. A rescued read has BS replaced with the
true barcode and its RC (rescue count) tag incremented. Reads whose barcode is near no true
family keep it and are marked as low-confidence singletons with RC=0 (an existing RC is kept).
All other reads are written unchanged.

EXAMPLE:

  famcall rescue --index index.fq -i tagged.fq -o rescued.fq --min-family-size 10
"#
)]
pub struct Rescue {
    /// FASTQ of index reads used to count barcodes
    #[arg(long = "index")]
    pub index: PathBuf,

    #[command(flatten)]
    pub io: IoOptions,

    /// Index reads a barcode needs to count as a true family
    #[arg(long = "min-family-size", default_value_t = DEFAULT_MIN_FAMILY_SIZE)]
    pub min_family_size: u64,

    /// Mismatches allowed between a barcode and its true family
    #[arg(long = "max-mismatches", default_value_t = DEFAULT_MAX_MISMATCHES)]
    pub max_mismatches: usize,

    #[command(flatten)]
    pub metrics: MetricsOptions,
}

impl Rescue {
    fn validate(&self) -> Result<()> {
        validate_file_exists(&self.index, "Index FASTQ")?;
        self.io.validate("FASTQ")?;
        self.metrics.validate()?;
        validate_positive(self.min_family_size, "min-family-size")?;
        validate_at_most(self.max_mismatches, MAX_SUPPORTED_MISMATCHES, "max-mismatches")?;
        Ok(())
    }
}

impl Command for Rescue {
    fn execute(&self, command_line: &str) -> Result<()> {
        self.validate()?;
        info!("Command: {command_line}");

        let options = RescueOptions {
            min_family_size: self.min_family_size,
            max_mismatches: self.max_mismatches,
        };
        let histogram = histogram_from_index_reads(FastqReads::from_path(&self.index)?)?;
        let (index, mut metrics) = build_index(&histogram, options)?;

        let timer = OperationTimer::new("Rescuing barcodes");
        let mut writer = FastqWriter::create(&self.io.output)?;
        let progress = ProgressTracker::new("reads");
        for read in FastqReads::from_path(&self.io.input)? {
            let mut read = read?;
            rescue_read(&index, &mut read, &mut metrics);
            writer.write(&read)?;
            progress.record(1);
        }
        progress.finish();
        let written = writer.finish()?;

        metrics.finalize();
        self.metrics.write(&metrics)?;
        log_rescue_summary(&metrics);
        timer.log_completion(written);
        Ok(())
    }
}
