//! Mate-pair merging over name-grouped SAM templates.
//!
//! A template is every record sharing a read name. When it holds exactly two primary,
//! paired records they are merged into one layout; if the merge is not possible both mates are
//! written with `MP:A:F`. Secondary and supplementary records, and templates without exactly two
//! primary records, are written unchanged.

use anyhow::{Context, Result};
use famcall_layout::{
    Layout, MergeFailure, MergeOptions, MergeOutcome, layout_from_record, mark_merge_not_attempted,
    merge_layouts,
};
use famcall_metrics::MergeMetrics;
use noodles::sam::Header;
use noodles::sam::alignment::record_buf::RecordBuf;

use crate::alignment_io::SamTextWriter;

/// One output record of a template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateRecord {
    /// A merged or merge-marked layout, rendered as a SAM line
    Line(String),
    /// An input record written unchanged
    Passthrough(RecordBuf),
}

impl TemplateRecord {
    pub fn write(&self, writer: &mut SamTextWriter) -> Result<()> {
        match self {
            Self::Line(line) => writer.write_line(line),
            Self::Passthrough(record) => writer.write_record(record),
        }
    }
}

/// Output records and merge counts for a batch of templates.
#[derive(Debug, Default)]
pub struct TemplateBatch {
    pub records: Vec<TemplateRecord>,
    pub metrics: MergeMetrics,
}

fn is_primary(record: &RecordBuf) -> bool {
    let flags = record.flags();
    !flags.is_secondary() && !flags.is_supplementary()
}

fn layout_of(record: &RecordBuf, header: &Header) -> Result<Layout> {
    layout_from_record(record, header).with_context(|| {
        let name =
            record.name().map(|n| String::from_utf8_lossy(n).into_owned()).unwrap_or_default();
        format!("Failed to build a layout for read '{name}'")
    })
}

/// Merges the mates of one template, appending its output records to `batch`.
pub fn merge_template(
    records: Vec<RecordBuf>,
    header: &Header,
    options: &MergeOptions,
    batch: &mut TemplateBatch,
) -> Result<()> {
    let (primary, others): (Vec<RecordBuf>, Vec<RecordBuf>) =
        records.into_iter().partition(is_primary);
    let is_pair = primary.len() == 2 && primary.iter().all(|r| r.flags().is_segmented());

    if is_pair {
        let first = layout_of(&primary[0], header)?;
        let second = layout_of(&primary[1], header)?;
        match merge_layouts(&first, &second, options) {
            MergeOutcome::Merged { layout, stats } => {
                batch.metrics.record_merged(
                    stats.overlapping_bases as u64,
                    stats.bases_agreeing as u64,
                    stats.bases_disagreeing as u64,
                );
                batch.records.push(TemplateRecord::Line(layout.to_sam_line()));
            }
            MergeOutcome::Failed(failure) => {
                batch.metrics.total_pairs += 1;
                match failure {
                    MergeFailure::Unmapped => batch.metrics.failed_unmapped += 1,
                    MergeFailure::DifferentContigs => batch.metrics.failed_different_contigs += 1,
                    MergeFailure::NoOverlap => batch.metrics.failed_no_overlap += 1,
                    MergeFailure::InteriorClip => batch.metrics.failed_interior_clip += 1,
                }
                for mut mate in [first, second] {
                    mark_merge_not_attempted(&mut mate);
                    batch.records.push(TemplateRecord::Line(mate.to_sam_line()));
                }
            }
        }
    } else {
        batch.metrics.unpaired_records += primary.len() as u64;
        batch.records.extend(primary.into_iter().map(TemplateRecord::Passthrough));
    }

    batch.metrics.unpaired_records += others.len() as u64;
    batch.records.extend(others.into_iter().map(TemplateRecord::Passthrough));
    Ok(())
}

/// Merges every template of a batch.
pub fn merge_templates(
    templates: Vec<Vec<RecordBuf>>,
    header: &Header,
    options: &MergeOptions,
) -> Result<TemplateBatch> {
    let mut batch = TemplateBatch::default();
    for records in templates {
        merge_template(records, header, options, &mut batch)?;
    }
    Ok(batch)
}
