//! Merge overlapping mates into single records.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use famcall_lib::alignment_io::{SamTextWriter, open_sam, records};
use famcall_lib::grouper::templates;
use famcall_lib::layout::{AgreementStrategy, DisagreementStrategy, MergeOptions};
use famcall_lib::logging::{OperationTimer, log_merge_summary};
use famcall_lib::metrics::MergeMetrics;
use famcall_lib::pairing::{TemplateBatch, merge_templates};
use famcall_lib::parallel::{Batched, process_ordered};
use famcall_lib::process::{DEFAULT_SORT_TIMEOUT_SECS, ExternalStage};
use famcall_lib::progress::ProgressTracker;
use famcall_lib::validation::validate_positive;
use log::{info, warn};

use crate::commands::command::Command;
use crate::commands::common::{IoOptions, MetricsOptions, ThreadingOptions};

/// Quality model for two mates calling the same base.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AgreementArg {
    /// Fisher combination, never below the higher quality
    Fisher,
    /// Sum of the two qualities
    Sum,
    /// The higher of the two qualities
    MaxQual,
}

impl From<AgreementArg> for AgreementStrategy {
    fn from(arg: AgreementArg) -> Self {
        match arg {
            AgreementArg::Fisher => AgreementStrategy::Fisher,
            AgreementArg::Sum => AgreementStrategy::Sum,
            AgreementArg::MaxQual => AgreementStrategy::MaxQual,
        }
    }
}

/// Resolution of two mates calling different bases.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DisagreementArg {
    /// Keep the higher-quality base with the quality difference; ties become N
    Consensus,
    /// Always call N
    MaskBoth,
}

impl From<DisagreementArg> for DisagreementStrategy {
    fn from(arg: DisagreementArg) -> Self {
        match arg {
            DisagreementArg::Consensus => DisagreementStrategy::Consensus,
            DisagreementArg::MaskBoth => DisagreementStrategy::MaskBoth,
        }
    }
}

/// Merge overlapping read pairs into single alignment records.
#[derive(Debug, Parser)]
#[command(
    name = "merge",
    about = "\x1b[38;5;72m[ALIGNMENT]\x1b[0m     \x1b[36mMerge overlapping mates into single records\x1b[0m",
    long_about = r#"
Merge the two mates of each read pair into one alignment record spanning both.

The input SAM must be grouped by read name (e.g. samtools sort -n). Where the mates overlap,
agreeing bases have their qualities combined and disagreeing bases are resolved by
--disagreement. Merged records have MAPQ 255, MP:A:T, PM/MA (merged positions and their
agreement) and DG/DR (genomic and read positions of disagreements). Pairs that cannot be merged
(unmapped mate, different contigs, no shared reference position) are written as two records
with MP:A:F. Secondary, supplementary and unpaired records are written unchanged.

With --name-sort-with, the input is first sorted by read name with the given samtools-compatible
program (`<program> sort -n -O sam -o <tmp> <input>`). The sort is killed if it runs longer
than --sort-timeout seconds and its temporary output is removed after merging.

EXAMPLES:

  famcall merge -i by_name.sam -o merged.sam --agreement fisher --metrics merge.tsv
  famcall merge -i aligned.bam -o merged.sam --name-sort-with samtools
"#
)]
pub struct Merge {
    #[command(flatten)]
    pub io: IoOptions,

    /// How agreeing base qualities are combined
    #[arg(long = "agreement", value_enum, default_value = "fisher")]
    pub agreement: AgreementArg,

    /// How disagreeing bases are resolved
    #[arg(long = "disagreement", value_enum, default_value = "consensus")]
    pub disagreement: DisagreementArg,

    /// Sort the input by read name with this program before merging
    #[arg(long = "name-sort-with")]
    pub name_sort_with: Option<PathBuf>,

    /// Seconds to wait for the name sort before it is killed
    #[arg(long = "sort-timeout", default_value_t = DEFAULT_SORT_TIMEOUT_SECS)]
    pub sort_timeout: u64,

    #[command(flatten)]
    pub threading: ThreadingOptions,

    #[command(flatten)]
    pub metrics: MetricsOptions,
}

impl Merge {
    fn validate(&self) -> Result<()> {
        self.io.validate("SAM")?;
        self.threading.validate()?;
        self.metrics.validate()?;
        validate_positive(self.sort_timeout, "sort-timeout")?;
        Ok(())
    }

    /// Path of the name-sorted copy of the input, next to the output.
    fn sorted_path(&self) -> PathBuf {
        let name = self.io.output.file_name().map_or_else(
            || "merge".to_string(),
            |name| name.to_string_lossy().into_owned(),
        );
        self.io.output.with_file_name(format!(".{name}.by_name.sam"))
    }

    /// Runs the external name sort when requested and returns the path to merge from.
    fn sort_input(&self) -> Result<Option<PathBuf>> {
        let Some(program) = &self.name_sort_with else {
            return Ok(None);
        };
        let sorted = self.sorted_path();
        ExternalStage::name_sort(program, &self.io.input, &sorted)
            .run(Duration::from_secs(self.sort_timeout))?;
        info!("Sorted {} by read name", self.io.input.display());
        Ok(Some(sorted))
    }

    fn options(&self) -> MergeOptions {
        MergeOptions {
            agreement: self.agreement.into(),
            disagreement: self.disagreement.into(),
            ..MergeOptions::default()
        }
    }
}

impl Command for Merge {
    fn execute(&self, command_line: &str) -> Result<()> {
        self.validate()?;
        info!("Command: {command_line}");

        let sorted = self.sort_input()?;
        let input: &Path = sorted.as_deref().unwrap_or(&self.io.input);
        let options = self.options();
        let timer = OperationTimer::new("Merging read pairs");
        let (mut reader, header) = open_sam(input)?;
        let mut writer = SamTextWriter::create(&self.io.output, header.clone())?;
        let batches = Batched::new(
            templates(records(&mut reader, &header)).map(|group| group.map(|(_, recs)| recs)),
            self.threading.batch_size,
        );
        let progress = ProgressTracker::new("templates");
        let mut metrics = MergeMetrics::new();

        process_ordered(
            batches,
            self.threading.threads,
            |batch| merge_templates(batch, &header, &options),
            |batch: TemplateBatch| {
                for record in &batch.records {
                    record.write(&mut writer)?;
                }
                metrics.merge(&batch.metrics);
                progress.record(batch.metrics.total_pairs);
                Ok(())
            },
        )?;
        progress.finish();
        let written = writer.finish()?;
        if let Some(path) = &sorted {
            if let Err(e) = fs::remove_file(path) {
                warn!("Could not remove {}: {e}", path.display());
            }
        }

        metrics.finalize();
        self.metrics.write(&metrics)?;
        log_merge_summary(&metrics);
        timer.log_completion(written);
        Ok(())
    }
}
