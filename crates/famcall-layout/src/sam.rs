//! Conversion of noodles alignment records into layouts.

use bstr::ByteSlice;
use famcall_consensus::FamilyTags;
use itertools::Itertools;
use noodles::sam::Header;
use noodles::sam::alignment::record::data::field::Tag;
use noodles::sam::alignment::record_buf::RecordBuf;
use noodles::sam::alignment::record_buf::data::field::Value;
use noodles::sam::alignment::record_buf::data::field::value::Array;

use crate::cigar::{CigarOp, Operation, push_op};
use crate::errors::{LayoutError, Result};
use crate::layout::{Layout, RecordInfo};

/// Mapping quality noodles leaves unset when the record reports 255
const MISSING_MAPPING_QUALITY: u8 = 255;

/// Builds a [`Layout`] from a SAM/BAM record.
///
/// # Errors
///
/// Returns [`LayoutError::UnsupportedCigarOp`] for hard clips, skips and padding,
/// [`LayoutError::Tag`] when a family tag is malformed and [`LayoutError::MalformedRecord`]
/// for records whose bases, qualities and CIGAR are inconsistent.
pub fn layout_from_record(record: &RecordBuf, header: &Header) -> Result<Layout> {
    let name = record.name().map(|n| n.to_str_lossy().into_owned()).unwrap_or_default();
    let contig_name = |id: Option<usize>| {
        id.and_then(|id| header.reference_sequences().get_index(id))
            .map(|(contig, _)| contig.to_string())
    };

    let mut tags = FamilyTags::default();
    for (tag, value) in record.data().iter() {
        let (kind, text) = value_text(value);
        tags.insert_sam(&tag_name(tag), kind, &text)
            .map_err(|source| LayoutError::Tag { read_name: name.clone(), source })?;
    }

    let mut cigar: Vec<CigarOp> = Vec::new();
    for op in record.cigar().as_ref() {
        push_op(&mut cigar, Operation::from_kind(op.kind())?, op.len());
    }

    let bases = record.sequence().as_ref();
    let qualities: Vec<u32> = record.quality_scores().as_ref().iter().map(|&q| u32::from(q)).collect();
    if qualities.is_empty() && !bases.is_empty() {
        return Err(LayoutError::malformed(&name, "record has bases but no qualities"));
    }

    let info = RecordInfo {
        flag: record.flags().bits(),
        contig: contig_name(record.reference_sequence_id()),
        start: record.alignment_start().map(|p| p.get() as u64 - 1),
        mapping_quality: record.mapping_quality().map_or(MISSING_MAPPING_QUALITY, |m| m.get()),
        mate_contig: contig_name(record.mate_reference_sequence_id()),
        mate_start: record.mate_alignment_start().map(|p| p.get() as u64 - 1),
        template_length: i64::from(record.template_length()),
        tags,
        name,
    };
    Layout::build(info, &cigar, bases, &qualities)
}

fn tag_name(tag: Tag) -> String {
    let bytes: [u8; 2] = tag.into();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// The SAM type code and value text of an auxiliary field.
fn value_text(value: &Value) -> (char, String) {
    match value {
        Value::Character(c) => ('A', char::from(*c).to_string()),
        Value::Int8(i) => ('i', i.to_string()),
        Value::UInt8(i) => ('i', i.to_string()),
        Value::Int16(i) => ('i', i.to_string()),
        Value::UInt16(i) => ('i', i.to_string()),
        Value::Int32(i) => ('i', i.to_string()),
        Value::UInt32(i) => ('i', i.to_string()),
        Value::Float(f) => ('f', f.to_string()),
        Value::String(s) => ('Z', s.to_string()),
        Value::Hex(h) => ('H', h.to_string()),
        Value::Array(array) => ('B', array_text(array)),
    }
}

fn array_text(array: &Array) -> String {
    let (subtype, values) = match array {
        Array::Int8(v) => ('c', v.iter().join(",")),
        Array::UInt8(v) => ('C', v.iter().join(",")),
        Array::Int16(v) => ('s', v.iter().join(",")),
        Array::UInt16(v) => ('S', v.iter().join(",")),
        Array::Int32(v) => ('i', v.iter().join(",")),
        Array::UInt32(v) => ('I', v.iter().join(",")),
        Array::Float(v) => ('f', v.iter().join(",")),
    };
    if values.is_empty() { subtype.to_string() } else { format!("{subtype},{values}") }
}
