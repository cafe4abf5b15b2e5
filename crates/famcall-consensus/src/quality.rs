//! Conversions between Phred qualities, ASCII quality strings and integer array tags.
//!
//! Qualities above [`MAX_ENCODED_QUALITY`] saturate when encoded: `decode(encode(q))` yields
//! `min(q, 93)`. Integer arrays travel in read descriptions as `|KEY=v0,v1,...,vn`.

use std::fmt::Display;
use std::str::FromStr;

use itertools::Itertools;

use crate::errors::CodecError;

/// Offset added to a Phred score to produce its ASCII character
pub const QUALITY_OFFSET: u8 = 33;

/// Highest quality representable as a single printable character (`93 + 33 = 126`)
pub const MAX_ENCODED_QUALITY: u32 = 93;

/// Encodes one Phred quality as a printable ASCII character, saturating at Q93.
///
/// # Examples
/// ```
/// use famcall_consensus::quality::encode_quality;
///
/// assert_eq!(encode_quality(0), b'!');
/// assert_eq!(encode_quality(30), b'?');
/// assert_eq!(encode_quality(3114), b'~');
/// ```
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn encode_quality(quality: u32) -> u8 {
    quality.min(MAX_ENCODED_QUALITY) as u8 + QUALITY_OFFSET
}

/// Decodes one ASCII quality character.
///
/// # Errors
///
/// Returns [`CodecError::InvalidQualityChar`] for bytes outside `[33, 126]`.
#[inline]
pub fn decode_quality(value: u8) -> Result<u32, CodecError> {
    if (QUALITY_OFFSET..=b'~').contains(&value) {
        Ok(u32::from(value - QUALITY_OFFSET))
    } else {
        Err(CodecError::InvalidQualityChar { value })
    }
}

/// Encodes a quality array as an ASCII quality string.
#[must_use]
pub fn encode_qualities(qualities: &[u32]) -> Vec<u8> {
    qualities.iter().map(|&q| encode_quality(q)).collect()
}

/// Decodes an ASCII quality string.
///
/// # Errors
///
/// Returns the first [`CodecError::InvalidQualityChar`] encountered.
pub fn decode_qualities(encoded: &[u8]) -> Result<Vec<u32>, CodecError> {
    encoded.iter().map(|&c| decode_quality(c)).collect()
}

/// Formats an integer array as a description tag, e.g. `|PV=30,30,10`.
///
/// # Examples
/// ```
/// use famcall_consensus::quality::format_int_tag;
///
/// assert_eq!(format_int_tag("FA", &[4u32, 4, 3]), "|FA=4,4,3");
/// assert_eq!(format_int_tag("PV", &[] as &[u32]), "|PV=");
/// ```
#[must_use]
pub fn format_int_tag<T: Display>(key: &str, values: &[T]) -> String {
    format!("|{key}={}", values.iter().join(","))
}

/// Parses a comma-separated integer list such as `30,30,10`. An empty string is an empty list.
///
/// # Errors
///
/// Returns [`CodecError::MalformedTag`] if any element is not an integer of type `T`.
pub fn parse_int_values<T: FromStr>(text: &str) -> Result<Vec<T>, CodecError> {
    if text.is_empty() {
        return Ok(Vec::new());
    }
    text.split(',')
        .map(|token| {
            token
                .trim()
                .parse::<T>()
                .map_err(|_| CodecError::malformed(text, format!("'{token}' is not an integer")))
        })
        .collect()
}

/// Parses a single description tag such as `|PV=30,30,10` (leading `|` optional) into its key
/// and values.
///
/// # Errors
///
/// Returns [`CodecError::MalformedTag`] if the `=` is missing or a value is not an integer.
pub fn parse_int_tag<T: FromStr>(tag: &str) -> Result<(String, Vec<T>), CodecError> {
    let body = tag.strip_prefix('|').unwrap_or(tag);
    let Some((key, values)) = body.split_once('=') else {
        return Err(CodecError::malformed(tag, "missing '=' between key and value"));
    };
    Ok((key.to_string(), parse_int_values(values)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_round_trip_saturates_at_93() {
        for q in 0..=200u32 {
            let encoded = encode_quality(q);
            assert!((33..=126).contains(&encoded), "q={q} encoded to {encoded}");
            assert_eq!(decode_quality(encoded).unwrap(), q.min(93));
        }
    }

    #[test]
    fn test_encode_decode_encode_is_stable() {
        let quals: Vec<u32> = (0..=93).collect();
        let encoded = encode_qualities(&quals);
        let decoded = decode_qualities(&encoded).unwrap();
        assert_eq!(decoded, quals);
        assert_eq!(encode_qualities(&decoded), encoded);
    }

    #[rstest]
    #[case(b' ')]
    #[case(0x7f)]
    #[case(0)]
    fn test_decode_rejects_unprintable(#[case] value: u8) {
        assert_eq!(decode_quality(value), Err(CodecError::InvalidQualityChar { value }));
    }

    #[test]
    fn test_parse_int_tag() {
        let (key, values) = parse_int_tag::<u32>("|PV=30,30,10").unwrap();
        assert_eq!(key, "PV");
        assert_eq!(values, vec![30, 30, 10]);

        let (key, values) = parse_int_tag::<i64>("DG=-1,100").unwrap();
        assert_eq!(key, "DG");
        assert_eq!(values, vec![-1, 100]);
    }

    #[test]
    fn test_parse_int_tag_empty_value() {
        let (_, values) = parse_int_tag::<u32>("|FA=").unwrap();
        assert!(values.is_empty());
    }

    #[rstest]
    #[case("|FA")]
    #[case("|FA=1,x,3")]
    #[case("|FA=1,,3")]
    fn test_parse_int_tag_rejects_malformed(#[case] tag: &str) {
        assert!(matches!(parse_int_tag::<u32>(tag), Err(CodecError::MalformedTag { .. })));
    }

    #[test]
    fn test_format_then_parse() {
        let tag = format_int_tag("FA", &[3u32, 3, 2, 3]);
        assert_eq!(tag, "|FA=3,3,2,3");
        let (key, values) = parse_int_tag::<u32>(&tag).unwrap();
        assert_eq!(key, "FA");
        assert_eq!(values, vec![3, 3, 2, 3]);
    }
}
