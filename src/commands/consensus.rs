//! Call one consensus read per barcode family.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use famcall_lib::consensus::caller::{
    DEFAULT_MAX_AGREEMENT_FRACTION, DEFAULT_MIN_AGREEMENT_FRACTION,
};
use famcall_lib::consensus::phred::DEFAULT_UNDERFLOW_QUALITY;
use famcall_lib::consensus::{ConsensusAlgorithm, ConsensusOptions};
use famcall_lib::family::{FamilyBatch, call_families};
use famcall_lib::fastq::{FastqReads, FastqWriter};
use famcall_lib::grouper::barcode_families;
use famcall_lib::logging::{OperationTimer, log_family_summary};
use famcall_lib::metrics::{FamilyMetrics, FamilySizeCounter, write_metrics_auto};
use famcall_lib::parallel::{Batched, process_ordered};
use famcall_lib::progress::ProgressTracker;
use famcall_lib::validation::{validate_fraction, validate_ordered, validate_output_parent};
use log::info;

use crate::commands::command::Command;
use crate::commands::common::{IoOptions, MetricsOptions, ThreadingOptions};

/// Base-calling model.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AlgorithmArg {
    /// Fisher combination of per-read error probabilities
    Fisher,
    /// Quality-sum voting; families that disagree too much are masked
    Fast,
}

impl From<AlgorithmArg> for ConsensusAlgorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Fisher => ConsensusAlgorithm::Fisher,
            AlgorithmArg::Fast => ConsensusAlgorithm::Fast,
        }
    }
}

/// Call consensus reads from barcode families.
#[derive(Debug, Parser)]
#[command(
    name = "consensus",
    about = "\x1b[38;5;180m[CONSENSUS]\x1b[0m     \x1b[36mCall one consensus read per barcode family\x1b[0m",
    long_about = r#"
Collapse every barcode family of a FASTQ into a single consensus read.

The input must be grouped by barcode: reads of one family must be adjacent. The barcode is
taken from the BS tag in the read description, e.g.

  @read1 1:N:0:1 |BS=ACGTACGT

Each output read carries FM (family size), ND (disagreeing observations), FA (reads agreeing
with the call per base) and PV (uncapped consensus qualities). A family of one read is written
unchanged apart from those tags.

ALGORITHMS:

  fisher   Combine the error probabilities of the reads with Fisher's method.
  fast     Call the base with the highest quality sum. A family whose agreement fraction at
           any base falls below --min-agreement-fraction, or never reaches
           --max-agreement-fraction, is masked to quality 0.

EXAMPLE:

  famcall consensus -i grouped.fq -o consensus.fq --metrics consensus.tsv --threads 4
"#
)]
pub struct Consensus {
    #[command(flatten)]
    pub io: IoOptions,

    /// Consensus algorithm
    #[arg(short = 'a', long = "algorithm", value_enum, default_value = "fisher")]
    pub algorithm: AlgorithmArg,

    /// Fast compare masks families whose lowest per-base agreement fraction is below this
    #[arg(long = "min-agreement-fraction", default_value_t = DEFAULT_MIN_AGREEMENT_FRACTION)]
    pub min_agreement_fraction: f64,

    /// Fast compare masks families whose highest per-base agreement fraction is below this
    #[arg(long = "max-agreement-fraction", default_value_t = DEFAULT_MAX_AGREEMENT_FRACTION)]
    pub max_agreement_fraction: f64,

    /// Quality reported when the Fisher p-value underflows
    #[arg(long = "underflow-quality", default_value_t = DEFAULT_UNDERFLOW_QUALITY)]
    pub underflow_quality: u32,

    /// Write the family size histogram to this TSV file
    #[arg(long = "family-sizes")]
    pub family_sizes: Option<PathBuf>,

    #[command(flatten)]
    pub threading: ThreadingOptions,

    #[command(flatten)]
    pub metrics: MetricsOptions,
}

impl Consensus {
    fn validate(&self) -> Result<()> {
        self.io.validate("FASTQ")?;
        self.threading.validate()?;
        self.metrics.validate()?;
        validate_fraction(self.min_agreement_fraction, "min-agreement-fraction")?;
        validate_fraction(self.max_agreement_fraction, "max-agreement-fraction")?;
        validate_ordered(
            self.min_agreement_fraction,
            self.max_agreement_fraction,
            "min-agreement-fraction",
            "max-agreement-fraction",
        )?;
        if let Some(path) = &self.family_sizes {
            validate_output_parent(path, "family-sizes")?;
        }
        Ok(())
    }

    fn options(&self) -> ConsensusOptions {
        ConsensusOptions {
            underflow_quality: self.underflow_quality,
            min_agreement_fraction: self.min_agreement_fraction,
            max_agreement_fraction: self.max_agreement_fraction,
        }
    }
}

impl Command for Consensus {
    fn execute(&self, command_line: &str) -> Result<()> {
        self.validate()?;
        info!("Command: {command_line}");

        let algorithm = ConsensusAlgorithm::from(self.algorithm);
        let caller = algorithm.build(self.options());
        info!(
            "Calling consensus with the {} algorithm on {} thread(s)",
            caller.name(),
            self.threading.threads
        );

        let timer = OperationTimer::new("Calling consensus reads");
        let reads = FastqReads::from_path(&self.io.input)?;
        let families = Batched::new(barcode_families(reads), self.threading.batch_size);
        let mut writer = FastqWriter::create(&self.io.output)?;
        let progress = ProgressTracker::new("families");
        let mut metrics = FamilyMetrics::new();
        let mut sizes = FamilySizeCounter::new();

        process_ordered(
            families,
            self.threading.threads,
            |batch| call_families(caller.as_ref(), batch),
            |batch: FamilyBatch| {
                for read in &batch.reads {
                    writer.write(read)?;
                }
                batch.merge_metrics_into(&mut metrics, &mut sizes);
                progress.record(batch.reads.len() as u64);
                Ok(())
            },
        )?;
        progress.finish();
        let written = writer.finish()?;

        metrics.finalize();
        self.metrics.write(&metrics)?;
        if let Some(path) = &self.family_sizes {
            write_metrics_auto(path, &sizes.to_metrics())?;
        }
        log_family_summary(&metrics);
        timer.log_completion(written);
        Ok(())
    }
}
