//! # Alignment Layouts
//!
//! A [`Layout`] expands an aligned read into one [`LayoutPosition`] per base or reference
//! coordinate. Each position knows its reference coordinate (absent for insertions and soft
//! clips), its index in the read (absent for deletions), the base, its quality, how many reads
//! agreed with it in an upstream consensus, and whether a mate merge agreed or disagreed there.
//!
//! Layouts are built from a CIGAR plus the read's bases, qualities and optional `FA`/`PV` arrays,
//! and serialize back to SAM text with the CIGAR re-derived from the positions. A read with no
//! CIGAR is held as a run of soft-clipped positions and written back with a `*` CIGAR.

use famcall_consensus::FamilyTags;
use famcall_consensus::phred::DELETION_BASE;
use famcall_consensus::quality::encode_quality;
use itertools::Itertools;

use crate::cigar::{CigarOp, Operation, format_cigar, push_op, read_length};
use crate::errors::{LayoutError, Result};

/// SAM flag: template has multiple segments
pub const FLAG_PAIRED: u16 = 0x1;
/// SAM flag: each segment properly aligned
pub const FLAG_PROPER_PAIR: u16 = 0x2;
/// SAM flag: segment unmapped
pub const FLAG_UNMAPPED: u16 = 0x4;
/// SAM flag: next segment unmapped
pub const FLAG_MATE_UNMAPPED: u16 = 0x8;
/// SAM flag: next segment reverse complemented
pub const FLAG_MATE_REVERSE: u16 = 0x20;
/// SAM flag: first segment in the template
pub const FLAG_FIRST_SEGMENT: u16 = 0x40;

/// Outcome of a mate merge at one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeState {
    /// Covered by only one mate
    #[default]
    Unmerged,
    /// Both mates covered the position and called different bases
    Disagreed,
    /// Both mates covered the position and called the same base
    Agreed,
}

/// One base or reference coordinate of a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutPosition {
    /// 0-based reference coordinate; `None` for insertions and soft clips
    pub ref_pos: Option<u64>,
    /// 0-based index in the read; `None` for deletions
    pub read_pos: Option<usize>,
    pub base: u8,
    pub op: Operation,
    /// `None` for deletions
    pub quality: Option<u32>,
    pub agreement: u32,
    pub merge: MergeState,
}

impl LayoutPosition {
    #[must_use]
    pub fn is_deletion(&self) -> bool {
        self.op == Operation::Deletion
    }
}

/// Record-level fields carried through a layout unchanged unless a merge rewrites them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordInfo {
    pub name: String,
    pub flag: u16,
    /// `None` when the record is not placed on a contig
    pub contig: Option<String>,
    /// 0-based leftmost reference coordinate
    pub start: Option<u64>,
    pub mapping_quality: u8,
    pub mate_contig: Option<String>,
    /// 0-based mate start
    pub mate_start: Option<u64>,
    pub template_length: i64,
    /// Auxiliary tags; `FA` and `PV` live in the positions while the layout exists
    pub tags: FamilyTags,
}

/// A read expanded into per-position alignment detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub info: RecordInfo,
    positions: Vec<LayoutPosition>,
    /// Whether `FA`/`PV` are written back on serialization
    consensus_arrays: bool,
}

impl Layout {
    /// Builds a layout from an alignment.
    ///
    /// Qualities come from `PV` when present (it holds the uncapped values) and agreements from
    /// `FA`, defaulting to 1 per base. Both arrays are moved out of `info.tags` into the
    /// positions.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::MalformedRecord`] when the bases, qualities, `FA`/`PV` or CIGAR
    /// disagree in length, a soft clip sits inside the alignment, or a CIGAR that consumes
    /// reference bases has no start coordinate.
    pub fn build(
        mut info: RecordInfo,
        cigar: &[CigarOp],
        bases: &[u8],
        qualities: &[u32],
    ) -> Result<Self> {
        let name = info.name.clone();
        if qualities.len() != bases.len() {
            return Err(LayoutError::malformed(
                &name,
                format!("{} bases but {} qualities", bases.len(), qualities.len()),
            ));
        }
        for (tag, values) in [("PV", &info.tags.pv), ("FA", &info.tags.fa)] {
            if !values.is_empty() && values.len() != bases.len() {
                return Err(LayoutError::malformed(
                    &name,
                    format!("{tag} has {} values for {} bases", values.len(), bases.len()),
                ));
            }
        }

        let consensus_arrays = !info.tags.pv.is_empty() || !info.tags.fa.is_empty();
        let pv = std::mem::take(&mut info.tags.pv);
        let fa = std::mem::take(&mut info.tags.fa);
        let quality_at = |i: usize| pv.get(i).copied().unwrap_or(qualities[i]);
        let agreement_at = |i: usize| fa.get(i).copied().unwrap_or(1);

        let mut positions = Vec::with_capacity(bases.len());
        if cigar.is_empty() {
            for (i, &base) in bases.iter().enumerate() {
                positions.push(LayoutPosition {
                    ref_pos: None,
                    read_pos: Some(i),
                    base,
                    op: Operation::SoftClip,
                    quality: Some(quality_at(i)),
                    agreement: agreement_at(i),
                    merge: MergeState::Unmerged,
                });
            }
            return Ok(Self { info, positions, consensus_arrays });
        }

        validate_cigar(&name, cigar, bases.len())?;
        let mut ref_pos = match info.start {
            Some(start) => start,
            None if cigar.iter().any(|c| c.op.consumes_reference()) => {
                return Err(LayoutError::malformed(&name, "aligned record has no start"));
            }
            None => 0,
        };
        let mut read_pos = 0;
        for element in cigar {
            for _ in 0..element.len {
                let position = match element.op {
                    Operation::Deletion => LayoutPosition {
                        ref_pos: Some(ref_pos),
                        read_pos: None,
                        base: DELETION_BASE,
                        op: element.op,
                        quality: None,
                        agreement: 0,
                        merge: MergeState::Unmerged,
                    },
                    op => LayoutPosition {
                        ref_pos: op.consumes_reference().then_some(ref_pos),
                        read_pos: Some(read_pos),
                        base: bases[read_pos],
                        op,
                        quality: Some(quality_at(read_pos)),
                        agreement: agreement_at(read_pos),
                        merge: MergeState::Unmerged,
                    },
                };
                if element.op.consumes_reference() {
                    ref_pos += 1;
                }
                if element.op.consumes_read() {
                    read_pos += 1;
                }
                positions.push(position);
            }
        }
        Ok(Self { info, positions, consensus_arrays })
    }

    /// Builds a layout directly from positions, recomputing read indices.
    pub(crate) fn from_positions(info: RecordInfo, mut positions: Vec<LayoutPosition>) -> Self {
        let mut read_pos = 0;
        for position in &mut positions {
            if position.is_deletion() {
                position.read_pos = None;
            } else {
                position.read_pos = Some(read_pos);
                read_pos += 1;
            }
        }
        Self { info, positions, consensus_arrays: true }
    }

    #[must_use]
    pub fn positions(&self) -> &[LayoutPosition] {
        &self.positions
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// True when the record is flagged unmapped or has no reference-mapped position.
    #[must_use]
    pub fn is_unmapped(&self) -> bool {
        self.info.flag & FLAG_UNMAPPED != 0 || self.first_ref_pos().is_none()
    }

    /// First reference coordinate covered by the layout.
    #[must_use]
    pub fn first_ref_pos(&self) -> Option<u64> {
        self.positions.iter().find_map(|p| p.ref_pos)
    }

    /// Last reference coordinate covered by the layout.
    #[must_use]
    pub fn last_ref_pos(&self) -> Option<u64> {
        self.positions.iter().rev().find_map(|p| p.ref_pos)
    }

    /// Read bases, excluding deletions.
    #[must_use]
    pub fn sequence(&self) -> Vec<u8> {
        self.read_positions().map(|p| p.base).collect()
    }

    /// Per-base qualities, excluding deletions.
    #[must_use]
    pub fn qualities(&self) -> Vec<u32> {
        self.read_positions().map(|p| p.quality.unwrap_or(0)).collect()
    }

    /// Qualities of the aligned bases only, excluding deletions and clipped or inserted bases.
    #[must_use]
    pub fn aligned_qualities(&self) -> Vec<u32> {
        self.positions.iter().filter(|p| p.op.is_aligned()).filter_map(|p| p.quality).collect()
    }

    /// Per-base agreement counts, excluding deletions.
    #[must_use]
    pub fn agreements(&self) -> Vec<u32> {
        self.read_positions().map(|p| p.agreement).collect()
    }

    /// Run-length encoded CIGAR of the positions.
    #[must_use]
    pub fn cigar(&self) -> Vec<CigarOp> {
        let mut ops = Vec::new();
        for position in &self.positions {
            push_op(&mut ops, position.op, 1);
        }
        ops
    }

    /// CIGAR text, `*` for a layout with no reference-mapped position.
    #[must_use]
    pub fn cigar_string(&self) -> String {
        if self.first_ref_pos().is_none() {
            return "*".to_string();
        }
        format_cigar(&self.cigar())
    }

    fn read_positions(&self) -> impl Iterator<Item = &LayoutPosition> {
        self.positions.iter().filter(|p| !p.is_deletion())
    }

    /// The auxiliary tags as written on output, with `FA`/`PV` regenerated from the positions.
    #[must_use]
    pub fn output_tags(&self) -> FamilyTags {
        let mut tags = self.info.tags.clone();
        if self.consensus_arrays {
            tags.pv = self.qualities();
            tags.fa = self.agreements();
        }
        tags
    }

    /// Formats the layout as one tab-separated SAM line without a trailing newline.
    #[must_use]
    pub fn to_sam_line(&self) -> String {
        let info = &self.info;
        let start = self.first_ref_pos().or(info.start).map_or(0, |s| s + 1);
        let mate_contig = match (&info.mate_contig, &info.contig) {
            (None, _) => "*",
            (Some(mate), Some(contig)) if mate == contig => "=",
            (Some(mate), _) => mate.as_str(),
        };
        let sequence = self.sequence();
        let (bases, quals) = if sequence.is_empty() {
            ("*".to_string(), "*".to_string())
        } else {
            let quals: Vec<u8> = self.qualities().into_iter().map(encode_quality).collect();
            (
                String::from_utf8_lossy(&sequence).into_owned(),
                String::from_utf8_lossy(&quals).into_owned(),
            )
        };

        let mut fields = vec![
            info.name.clone(),
            info.flag.to_string(),
            info.contig.clone().unwrap_or_else(|| "*".to_string()),
            start.to_string(),
            info.mapping_quality.to_string(),
            self.cigar_string(),
            mate_contig.to_string(),
            info.mate_start.map_or(0, |s| s + 1).to_string(),
            info.template_length.to_string(),
            bases,
            quals,
        ];
        fields.extend(self.output_tags().to_sam_fields());
        fields.iter().join("\t")
    }
}

fn validate_cigar(name: &str, cigar: &[CigarOp], num_bases: usize) -> Result<()> {
    let consumed = read_length(cigar);
    if consumed != num_bases {
        return Err(LayoutError::malformed(
            name,
            format!("CIGAR {} covers {consumed} bases but the read has {num_bases}", format_cigar(cigar)),
        ));
    }
    let last = cigar.len() - 1;
    for (i, element) in cigar.iter().enumerate() {
        if element.op == Operation::SoftClip && i != 0 && i != last {
            return Err(LayoutError::malformed(
                name,
                format!("soft clip inside CIGAR {}", format_cigar(cigar)),
            ));
        }
    }
    Ok(())
}
