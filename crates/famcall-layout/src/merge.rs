//! # Mate-Pair Merging
//!
//! Merges the two layouts of an overlapping read pair into one layout spanning the union of
//! their reference coordinates.
//!
//! The mate starting further left is the anchor. Its positions before the overlap are kept
//! verbatim, the overlap is walked position by position and the remainder of whichever mate
//! extends further right is appended verbatim. Inside the overlap:
//!
//! - equal bases are combined with the agreement strategy and their agreement counts summed;
//! - different bases are resolved by the disagreement strategy;
//! - a deletion facing a base, or an insertion present in only one mate, becomes `N` at
//!   [`MIN_PHRED`];
//! - a soft-clipped base facing a real call keeps the real call, boosted when the bases agree;
//!   clipped bases line up with read bases of the other mate, so they step past its deletions.
//!
//! A merge that would leave a soft clip inside the alignment fails with
//! [`MergeFailure::InteriorClip`].
//!
//! The merged record is tagged `MP:A:T` and carries the genomic coordinates of every overlapped
//! position (`PM`), of the agreeing (`MA`) and disagreeing (`DG`) ones, and the read indices of
//! the disagreeing ones (`DR`). Fields the merge rewrites are backed up in `ot`, `om`, `op` and
//! `mp` when their values change.

use famcall_consensus::phred::{
    DEFAULT_UNDERFLOW_QUALITY, MIN_PHRED, NO_CALL_BASE, agreed_quality, disagreed_quality,
};
use famcall_consensus::ExtraTag;
use log::trace;
use thiserror::Error;

use crate::cigar::Operation;
use crate::layout::{
    FLAG_MATE_REVERSE, FLAG_MATE_UNMAPPED, FLAG_PROPER_PAIR, Layout, LayoutPosition, MergeState,
};

/// Mapping quality written on merged records
pub const MERGED_MAPPING_QUALITY: u8 = 255;

/// How the quality of two agreeing bases is combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgreementStrategy {
    /// Fisher combination of the two error probabilities, never below the higher input
    #[default]
    Fisher,
    /// Sum of the two qualities
    Sum,
    /// The higher of the two qualities
    MaxQual,
}

/// How two different bases at one position are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisagreementStrategy {
    /// Keep the higher-quality base with quality `high - low`; equal qualities give `N`
    #[default]
    Consensus,
    /// Always call `N`
    MaskBoth,
}

/// Tunables for [`merge_layouts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOptions {
    pub agreement: AgreementStrategy,
    pub disagreement: DisagreementStrategy,
    /// Quality reported when a Fisher combination underflows
    pub underflow_quality: u32,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            agreement: AgreementStrategy::default(),
            disagreement: DisagreementStrategy::default(),
            underflow_quality: DEFAULT_UNDERFLOW_QUALITY,
        }
    }
}

/// Statistics about merged positions.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeStats {
    /// Positions covered by both mates
    pub overlapping_bases: usize,
    pub bases_agreeing: usize,
    pub bases_disagreeing: usize,
}

impl MergeStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Adds the counts of `other`.
    pub fn merge(&mut self, other: &Self) {
        self.overlapping_bases += other.overlapping_bases;
        self.bases_agreeing += other.bases_agreeing;
        self.bases_disagreeing += other.bases_disagreeing;
    }
}

/// Why a pair could not be merged.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeFailure {
    #[error("a mate is unmapped")]
    Unmapped,
    #[error("mates are on different contigs")]
    DifferentContigs,
    #[error("mates share no reference position")]
    NoOverlap,
    #[error("mates would merge with a soft clip inside the alignment")]
    InteriorClip,
}

/// Result of [`merge_layouts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Merged { layout: Layout, stats: MergeStats },
    Failed(MergeFailure),
}

/// Tags a layout whose mates were not merged with `MP:A:F`.
pub fn mark_merge_not_attempted(layout: &mut Layout) {
    layout.info.tags.mp = Some(false);
}

/// Merges two mates into a single layout.
///
/// Record fields of the output come from the anchor (leftmost) mate. The first argument is the
/// anchor when both mates start at the same coordinate.
#[must_use]
pub fn merge_layouts(first: &Layout, second: &Layout, options: &MergeOptions) -> MergeOutcome {
    if first.is_unmapped() || second.is_unmapped() {
        return MergeOutcome::Failed(MergeFailure::Unmapped);
    }
    if first.info.contig != second.info.contig {
        return MergeOutcome::Failed(MergeFailure::DifferentContigs);
    }
    let (left, right) = if second.first_ref_pos() < first.first_ref_pos() {
        (second, first)
    } else {
        (first, second)
    };
    let (Some(right_first), Some(left_last)) = (right.first_ref_pos(), left.last_ref_pos()) else {
        return MergeOutcome::Failed(MergeFailure::Unmapped);
    };
    if right_first > left_last {
        return MergeOutcome::Failed(MergeFailure::NoOverlap);
    }
    let anchor_index = left.positions().iter().position(|p| p.ref_pos == Some(right_first));
    let right_index = right.positions().iter().position(|p| p.ref_pos == Some(right_first));
    let (Some(anchor_index), Some(right_index)) = (anchor_index, right_index) else {
        return MergeOutcome::Failed(MergeFailure::NoOverlap);
    };

    let merger = PairMerger { options };
    let positions = merger.walk(left.positions(), right.positions(), anchor_index, right_index);
    if !clips_only_at_ends(&positions) {
        return MergeOutcome::Failed(MergeFailure::InteriorClip);
    }
    let layout = finish(left, positions);
    let stats = tally(&layout);
    trace!(
        "Merged {} over {} positions ({} disagreeing)",
        layout.name(),
        stats.overlapping_bases,
        stats.bases_disagreeing
    );
    MergeOutcome::Merged { layout, stats }
}

/// Cursors that move past a position produced by [`PairMerger::merge_one_sided`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Both,
    OffRef,
    OnRef,
}

struct PairMerger<'a> {
    options: &'a MergeOptions,
}

impl PairMerger<'_> {
    /// Walks both position lists in lockstep once they are offset so that their first shared
    /// reference coordinates line up.
    fn walk(
        &self,
        left: &[LayoutPosition],
        right: &[LayoutPosition],
        anchor_index: usize,
        right_index: usize,
    ) -> Vec<LayoutPosition> {
        let (mut i, mut j) = lockstep_start(left, right, anchor_index, right_index);

        let mut out = Vec::with_capacity(left.len() + right.len());
        out.extend_from_slice(&right[..j]);
        out.extend_from_slice(&left[..i]);

        while i < left.len() && j < right.len() {
            let (p, q) = (&left[i], &right[j]);
            match (p.ref_pos, q.ref_pos) {
                (Some(a), Some(b)) if a < b => {
                    out.push(*p);
                    i += 1;
                }
                (Some(a), Some(b)) if a > b => {
                    out.push(*q);
                    j += 1;
                }
                (Some(_), Some(_)) => {
                    out.push(self.merge_mapped(p, q));
                    i += 1;
                    j += 1;
                }
                (None, None) => {
                    out.push(self.merge_unmapped(p, q));
                    i += 1;
                    j += 1;
                }
                (None, Some(_)) => {
                    let (position, step) = self.merge_one_sided(p, q);
                    out.push(position);
                    i += usize::from(step != Step::OnRef);
                    j += usize::from(step != Step::OffRef);
                }
                (Some(_), None) => {
                    let (position, step) = self.merge_one_sided(q, p);
                    out.push(position);
                    j += usize::from(step != Step::OnRef);
                    i += usize::from(step != Step::OffRef);
                }
            }
        }
        out.extend_from_slice(&left[i..]);
        out.extend_from_slice(&right[j..]);
        out
    }

    /// Both positions sit on the same reference coordinate.
    fn merge_mapped(&self, p: &LayoutPosition, q: &LayoutPosition) -> LayoutPosition {
        match (p.is_deletion(), q.is_deletion()) {
            (true, true) => LayoutPosition {
                agreement: p.agreement + q.agreement,
                merge: MergeState::Agreed,
                ..*p
            },
            (true, false) | (false, true) => LayoutPosition {
                ref_pos: p.ref_pos,
                read_pos: None,
                base: NO_CALL_BASE,
                op: Operation::Match,
                quality: Some(MIN_PHRED),
                agreement: 0,
                merge: MergeState::Disagreed,
            },
            (false, false) => self.combine(p, q),
        }
    }

    /// Neither position is on the reference: insertions and soft clips.
    fn merge_unmapped(&self, p: &LayoutPosition, q: &LayoutPosition) -> LayoutPosition {
        match (p.op, q.op) {
            (Operation::Insertion, Operation::SoftClip) => self.clip_against_call(p, q),
            (Operation::SoftClip, Operation::Insertion) => self.clip_against_call(q, p),
            _ => self.combine(p, q),
        }
    }

    /// `off_ref` has no reference coordinate while `on_ref` does. Returns the merged position
    /// and which cursors advance past it.
    fn merge_one_sided(
        &self,
        off_ref: &LayoutPosition,
        on_ref: &LayoutPosition,
    ) -> (LayoutPosition, Step) {
        if off_ref.op == Operation::Insertion {
            let conflict = LayoutPosition {
                base: NO_CALL_BASE,
                quality: Some(MIN_PHRED),
                agreement: 0,
                merge: MergeState::Disagreed,
                ..*off_ref
            };
            return (conflict, Step::OffRef);
        }
        // A clipped base pairs with the next read base of the other mate, not its deletion.
        if on_ref.is_deletion() {
            return (*on_ref, Step::OnRef);
        }
        (self.clip_against_call(on_ref, off_ref), Step::Both)
    }

    fn clip_against_call(&self, call: &LayoutPosition, clip: &LayoutPosition) -> LayoutPosition {
        if call.base != clip.base {
            return *call;
        }
        LayoutPosition {
            quality: Some(self.agreed(quality(call), quality(clip))),
            agreement: call.agreement + clip.agreement,
            merge: MergeState::Agreed,
            ..*call
        }
    }

    /// Combines two base calls at the same place.
    fn combine(&self, p: &LayoutPosition, q: &LayoutPosition) -> LayoutPosition {
        let op = if p.op == q.op { p.op } else { Operation::Match };
        let (qp, qq) = (quality(p), quality(q));
        if p.base == q.base {
            return LayoutPosition {
                op,
                quality: Some(self.agreed(qp, qq)),
                agreement: p.agreement + q.agreement,
                merge: MergeState::Agreed,
                ..*p
            };
        }

        let no_call = LayoutPosition {
            base: NO_CALL_BASE,
            op,
            quality: Some(MIN_PHRED),
            agreement: 0,
            merge: MergeState::Disagreed,
            ..*p
        };
        if self.options.disagreement == DisagreementStrategy::MaskBoth || qp == qq {
            return no_call;
        }
        let winner = if qp > qq { p } else { q };
        LayoutPosition {
            base: winner.base,
            quality: Some(disagreed_quality(qp, qq)),
            agreement: winner.agreement,
            ..no_call
        }
    }

    fn agreed(&self, q1: u32, q2: u32) -> u32 {
        match self.options.agreement {
            AgreementStrategy::Fisher => agreed_quality(q1, q2, self.options.underflow_quality),
            AgreementStrategy::Sum => q1.saturating_add(q2),
            AgreementStrategy::MaxQual => q1.max(q2),
        }
    }
}

/// Indices at which the lockstep walk starts. The read bases of `right` before its first
/// reference coordinate line up with the read bases of `left` before `anchor_index`; deletions
/// consume no read base and are skipped when counting back.
fn lockstep_start(
    left: &[LayoutPosition],
    right: &[LayoutPosition],
    anchor_index: usize,
    right_index: usize,
) -> (usize, usize) {
    let mut remaining = right[..right_index].iter().filter(|p| !p.is_deletion()).count();
    let mut i = anchor_index;
    while remaining > 0 && i > 0 {
        i -= 1;
        if !left[i].is_deletion() {
            remaining -= 1;
        }
    }
    (i, remaining)
}

/// True when every soft clip belongs to the leading or trailing run of clips.
fn clips_only_at_ends(positions: &[LayoutPosition]) -> bool {
    let is_clip = |p: &LayoutPosition| p.op == Operation::SoftClip;
    let leading = positions.iter().take_while(|p| is_clip(*p)).count();
    let trailing = positions[leading..].iter().rev().take_while(|p| is_clip(*p)).count();
    !positions[leading..positions.len() - trailing].iter().any(is_clip)
}

fn quality(position: &LayoutPosition) -> u32 {
    position.quality.unwrap_or(0)
}

/// Builds the merged record from the anchor's fields and the merged positions.
fn finish(anchor: &Layout, positions: Vec<LayoutPosition>) -> Layout {
    let original = &anchor.info;
    let mut layout = Layout::from_positions(original.clone(), positions);
    let first = layout.first_ref_pos();
    let last = layout.last_ref_pos();
    let template_length = match (first, last) {
        (Some(first), Some(last)) => i64::try_from(last - first + 1).unwrap_or(i64::MAX),
        _ => 0,
    };

    let (pm, ma, dg, dr) = merge_coordinates(layout.positions());
    let info = &mut layout.info;
    info.flag = (info.flag | FLAG_MATE_UNMAPPED) & !(FLAG_PROPER_PAIR | FLAG_MATE_REVERSE);
    info.start = first;
    info.mapping_quality = MERGED_MAPPING_QUALITY;
    info.mate_contig = None;
    info.mate_start = None;
    info.template_length = template_length;

    let one_based = |pos: Option<u64>| pos.map_or(0, |p| i64::try_from(p + 1).unwrap_or(i64::MAX));
    let backups = [
        ("ot", original.template_length, info.template_length),
        ("om", i64::from(original.mapping_quality), i64::from(info.mapping_quality)),
        ("op", one_based(original.start), one_based(info.start)),
        ("mp", one_based(original.mate_start), 0),
    ];
    for (key, before, after) in backups {
        if before != after {
            info.tags.extra.insert(key.to_string(), ExtraTag::int(before));
        }
    }

    info.tags.mp = Some(true);
    info.tags.pm = pm;
    info.tags.ma = ma;
    info.tags.dg = dg;
    info.tags.dr = dr;
    layout
}

type Coordinates = (Vec<i64>, Vec<i64>, Vec<i64>, Vec<i64>);

/// Collects `PM`, `MA`, `DG` (1-based genomic) and `DR` (0-based read index) values. Positions
/// without a reference coordinate report the closest preceding one.
fn merge_coordinates(positions: &[LayoutPosition]) -> Coordinates {
    let (mut pm, mut ma, mut dg, mut dr) = (Vec::new(), Vec::new(), Vec::new(), Vec::new());
    let mut last_ref = positions.iter().find_map(|p| p.ref_pos).unwrap_or(0);
    for position in positions {
        if let Some(ref_pos) = position.ref_pos {
            last_ref = ref_pos;
        }
        let genomic = i64::try_from(last_ref + 1).unwrap_or(i64::MAX);
        match position.merge {
            MergeState::Unmerged => continue,
            MergeState::Agreed => ma.push(genomic),
            MergeState::Disagreed => {
                dg.push(genomic);
                if let Some(read_pos) = position.read_pos {
                    dr.push(i64::try_from(read_pos).unwrap_or(i64::MAX));
                }
            }
        }
        pm.push(genomic);
    }
    (pm, ma, dg, dr)
}

fn tally(layout: &Layout) -> MergeStats {
    let mut stats = MergeStats::new();
    for position in layout.positions() {
        match position.merge {
            MergeState::Unmerged => {}
            MergeState::Agreed => stats.bases_agreeing += 1,
            MergeState::Disagreed => stats.bases_disagreeing += 1,
        }
    }
    stats.overlapping_bases = stats.bases_agreeing + stats.bases_disagreeing;
    stats
}
