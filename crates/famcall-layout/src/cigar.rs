//! CIGAR operations that can be expanded into per-base layout positions.
//!
//! Hard clips, reference skips and padding carry no bases of their own and are rejected with
//! [`LayoutError::UnsupportedCigarOp`].

use std::fmt;

use noodles::sam::alignment::record::cigar::op::Kind;

use crate::errors::{LayoutError, Result};

/// A CIGAR operation kind supported by layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Match,
    Insertion,
    Deletion,
    SoftClip,
    SequenceMatch,
    SequenceMismatch,
}

impl Operation {
    /// Parses the SAM character of an operation.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::UnsupportedCigarOp`] for `H`, `N` and `P`, and
    /// [`LayoutError::InvalidCigar`] for characters that are not CIGAR operations at all.
    pub fn from_char(c: char) -> Result<Self> {
        match c {
            'M' => Ok(Self::Match),
            'I' => Ok(Self::Insertion),
            'D' => Ok(Self::Deletion),
            'S' => Ok(Self::SoftClip),
            '=' => Ok(Self::SequenceMatch),
            'X' => Ok(Self::SequenceMismatch),
            'H' | 'N' | 'P' => Err(LayoutError::UnsupportedCigarOp { op: c }),
            _ => Err(LayoutError::InvalidCigar {
                cigar: c.to_string(),
                reason: format!("unknown operation '{c}'"),
            }),
        }
    }

    /// Converts a noodles operation kind.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::UnsupportedCigarOp`] for hard clips, skips and padding.
    pub fn from_kind(kind: Kind) -> Result<Self> {
        match kind {
            Kind::Match => Ok(Self::Match),
            Kind::Insertion => Ok(Self::Insertion),
            Kind::Deletion => Ok(Self::Deletion),
            Kind::SoftClip => Ok(Self::SoftClip),
            Kind::SequenceMatch => Ok(Self::SequenceMatch),
            Kind::SequenceMismatch => Ok(Self::SequenceMismatch),
            Kind::HardClip => Err(LayoutError::UnsupportedCigarOp { op: 'H' }),
            Kind::Skip => Err(LayoutError::UnsupportedCigarOp { op: 'N' }),
            Kind::Pad => Err(LayoutError::UnsupportedCigarOp { op: 'P' }),
        }
    }

    #[must_use]
    pub fn as_char(self) -> char {
        match self {
            Self::Match => 'M',
            Self::Insertion => 'I',
            Self::Deletion => 'D',
            Self::SoftClip => 'S',
            Self::SequenceMatch => '=',
            Self::SequenceMismatch => 'X',
        }
    }

    /// True for operations that consume read bases.
    #[must_use]
    pub fn consumes_read(self) -> bool {
        !matches!(self, Self::Deletion)
    }

    /// True for operations that consume reference bases.
    #[must_use]
    pub fn consumes_reference(self) -> bool {
        matches!(self, Self::Match | Self::Deletion | Self::SequenceMatch | Self::SequenceMismatch)
    }

    /// True for operations that place a read base on a reference base.
    #[must_use]
    pub fn is_aligned(self) -> bool {
        matches!(self, Self::Match | Self::SequenceMatch | Self::SequenceMismatch)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// One run-length encoded CIGAR element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarOp {
    pub op: Operation,
    pub len: usize,
}

impl CigarOp {
    #[must_use]
    pub fn new(op: Operation, len: usize) -> Self {
        Self { op, len }
    }
}

/// Parses a CIGAR string such as `5S10M2I3D20M`. `*` parses to an empty CIGAR.
///
/// # Errors
///
/// Returns [`LayoutError::InvalidCigar`] for zero-length elements, missing lengths or trailing
/// digits, and [`LayoutError::UnsupportedCigarOp`] for `H`, `N` and `P`.
pub fn parse_cigar(cigar: &str) -> Result<Vec<CigarOp>> {
    if cigar == "*" {
        return Ok(Vec::new());
    }
    let invalid = |reason: &str| LayoutError::InvalidCigar {
        cigar: cigar.to_string(),
        reason: reason.to_string(),
    };

    let mut ops = Vec::new();
    let mut num_start: Option<usize> = None;
    for (i, c) in cigar.char_indices() {
        if c.is_ascii_digit() {
            num_start.get_or_insert(i);
            continue;
        }
        let start = num_start.take().ok_or_else(|| invalid("operation without a length"))?;
        let len: usize = cigar[start..i].parse().map_err(|_| invalid("length out of range"))?;
        if len == 0 {
            return Err(invalid("zero-length operation"));
        }
        let op = Operation::from_char(c).map_err(|e| match e {
            LayoutError::InvalidCigar { reason, .. } => invalid(&reason),
            other => other,
        })?;
        push_op(&mut ops, op, len);
    }
    if num_start.is_some() {
        return Err(invalid("trailing length without an operation"));
    }
    Ok(ops)
}

/// Formats a CIGAR, `*` when empty.
#[must_use]
pub fn format_cigar(ops: &[CigarOp]) -> String {
    if ops.is_empty() {
        return "*".to_string();
    }
    ops.iter().map(|c| format!("{}{}", c.len, c.op)).collect()
}

/// Number of read bases consumed.
#[must_use]
pub fn read_length(ops: &[CigarOp]) -> usize {
    ops.iter().filter(|c| c.op.consumes_read()).map(|c| c.len).sum()
}

/// Number of reference bases spanned.
#[must_use]
pub fn reference_length(ops: &[CigarOp]) -> usize {
    ops.iter().filter(|c| c.op.consumes_reference()).map(|c| c.len).sum()
}

/// Appends `len` of `op`, extending the last element when it has the same operation.
pub fn push_op(ops: &mut Vec<CigarOp>, op: Operation, len: usize) {
    match ops.last_mut() {
        Some(last) if last.op == op => last.len += len,
        _ => ops.push(CigarOp::new(op, len)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("10M")]
    #[case("5S10M2I3D20M")]
    #[case("3=1X4=")]
    #[case("2S8M4S")]
    fn test_parse_and_format(#[case] text: &str) {
        assert_eq!(format_cigar(&parse_cigar(text).unwrap()), text);
    }

    #[test]
    fn test_parse_star_is_empty() {
        assert!(parse_cigar("*").unwrap().is_empty());
        assert_eq!(format_cigar(&[]), "*");
    }

    #[test]
    fn test_adjacent_ops_are_merged() {
        assert_eq!(parse_cigar("3M2M").unwrap(), vec![CigarOp::new(Operation::Match, 5)]);
    }

    #[rstest]
    #[case("5H10M", 'H')]
    #[case("10M100N10M", 'N')]
    #[case("5M1P5M", 'P')]
    fn test_unsupported_ops(#[case] text: &str, #[case] op: char) {
        assert_eq!(parse_cigar(text), Err(LayoutError::UnsupportedCigarOp { op }));
    }

    #[rstest]
    #[case("M")]
    #[case("10")]
    #[case("0M")]
    #[case("10Q")]
    fn test_invalid_cigars(#[case] text: &str) {
        assert!(matches!(parse_cigar(text), Err(LayoutError::InvalidCigar { .. })));
    }

    #[test]
    fn test_lengths() {
        let ops = parse_cigar("5S10M2I3D20M").unwrap();
        assert_eq!(read_length(&ops), 37);
        assert_eq!(reference_length(&ops), 33);
    }
}
