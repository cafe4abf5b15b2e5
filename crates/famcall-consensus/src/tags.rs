//! Typed auxiliary tag schema shared by consensus reads and alignment layouts.
//!
//! Known tags live in typed fields; anything else is kept verbatim in [`FamilyTags::extra`] so
//! that both serializations round-trip.
//!
//! | Tag | Meaning                                   | SAM type |
//! |-----|-------------------------------------------|----------|
//! | PV  | per-base recalibrated quality             | `B:I`    |
//! | FA  | per-base agreement count                  | `B:I`    |
//! | FM  | family size                               | `i`      |
//! | ND  | number of disagreeing bases               | `i`      |
//! | RC  | rescue count                              | `i`      |
//! | BS  | barcode sequence                          | `Z`      |
//! | MP  | merge performed (`T`/`F`)                 | `A`      |
//! | PM  | genomic coordinates of merged positions   | `B:i`    |
//! | MA  | genomic coordinates of agreeing positions | `B:i`    |
//! | DG  | genomic coordinates of discordant bases   | `B:i`    |
//! | DR  | read coordinates of discordant bases      | `B:i`    |

use std::collections::BTreeMap;
use std::fmt::Display;

use itertools::Itertools;

use crate::errors::CodecError;
use crate::quality::{format_int_tag, parse_int_values};

/// An unrecognized tag preserved with its SAM type code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraTag {
    /// SAM type code (`Z` for tags that only ever appeared in a read description)
    pub kind: char,
    /// Value text as it appears after the type code
    pub value: String,
}

impl ExtraTag {
    /// Creates a string-typed tag.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self { kind: 'Z', value: value.into() }
    }

    /// Creates an integer-typed tag.
    #[must_use]
    pub fn int(value: i64) -> Self {
        Self { kind: 'i', value: value.to_string() }
    }
}

/// Fixed-schema auxiliary tags with an open extension map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FamilyTags {
    pub pv: Vec<u32>,
    pub fa: Vec<u32>,
    pub fm: Option<u32>,
    pub nd: Option<u32>,
    pub rc: Option<u32>,
    pub bs: Option<String>,
    pub mp: Option<bool>,
    pub pm: Vec<i64>,
    pub ma: Vec<i64>,
    pub dg: Vec<i64>,
    pub dr: Vec<i64>,
    /// Unrecognized tags keyed by their two-character name
    pub extra: BTreeMap<String, ExtraTag>,
}

impl FamilyTags {
    /// Parses the pipe-delimited tag suffix of a read description, e.g. `|FM=3|ND=1|FA=3,3`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedTag`] if an entry lacks `=` or a known tag has a value of
    /// the wrong shape.
    ///
    /// # Examples
    /// ```
    /// use famcall_consensus::tags::FamilyTags;
    ///
    /// let tags = FamilyTags::from_description("|BS=ACGT|FM=3|XY=kept").unwrap();
    /// assert_eq!(tags.bs.as_deref(), Some("ACGT"));
    /// assert_eq!(tags.fm, Some(3));
    /// assert_eq!(tags.extra["XY"].value, "kept");
    /// ```
    pub fn from_description(text: &str) -> Result<Self, CodecError> {
        let mut tags = Self::default();
        for entry in text.split('|').filter(|entry| !entry.is_empty()) {
            let Some((key, value)) = entry.split_once('=') else {
                return Err(CodecError::malformed(entry, "missing '=' between key and value"));
            };
            tags.insert_description(key, value)?;
        }
        Ok(tags)
    }

    fn insert_description(&mut self, key: &str, value: &str) -> Result<(), CodecError> {
        match key {
            "PV" => self.pv = parse_int_values(value)?,
            "FA" => self.fa = parse_int_values(value)?,
            "FM" => self.fm = Some(parse_scalar(key, value)?),
            "ND" => self.nd = Some(parse_scalar(key, value)?),
            "RC" => self.rc = Some(parse_scalar(key, value)?),
            "BS" => self.bs = Some(value.to_string()),
            "MP" => self.mp = Some(parse_flag(value)?),
            "PM" => self.pm = parse_int_values(value)?,
            "MA" => self.ma = parse_int_values(value)?,
            "DG" => self.dg = parse_int_values(value)?,
            "DR" => self.dr = parse_int_values(value)?,
            _ => {
                self.extra.insert(key.to_string(), ExtraTag::text(value));
            }
        }
        Ok(())
    }

    /// Formats the tags as a read-description suffix. Scalars appear when set and arrays when
    /// non-empty, in the order FM, ND, FA, PV, BS, RC, MP, PM, MA, DG, DR, then extension tags by
    /// name.
    #[must_use]
    pub fn to_description(&self) -> String {
        let mut out = String::new();
        push_scalar(&mut out, "FM", self.fm);
        push_scalar(&mut out, "ND", self.nd);
        push_array(&mut out, "FA", &self.fa);
        push_array(&mut out, "PV", &self.pv);
        push_scalar(&mut out, "BS", self.bs.as_deref());
        push_scalar(&mut out, "RC", self.rc);
        push_scalar(&mut out, "MP", self.mp.map(flag_char));
        push_array(&mut out, "PM", &self.pm);
        push_array(&mut out, "MA", &self.ma);
        push_array(&mut out, "DG", &self.dg);
        push_array(&mut out, "DR", &self.dr);
        for (key, tag) in &self.extra {
            push_scalar(&mut out, key, Some(&tag.value));
        }
        out
    }

    /// Parses one SAM auxiliary field of the form `TAG:TYPE:VALUE`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedTag`] for fields that do not have three parts or whose
    /// value does not fit the known tag.
    pub fn insert_sam_field(&mut self, field: &str) -> Result<(), CodecError> {
        let mut parts = field.splitn(3, ':');
        let (Some(key), Some(kind), Some(value)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(CodecError::malformed(field, "expected TAG:TYPE:VALUE"));
        };
        let mut kind_chars = kind.chars();
        let (Some(kind), None) = (kind_chars.next(), kind_chars.next()) else {
            return Err(CodecError::malformed(field, "type must be a single character"));
        };
        self.insert_sam(key, kind, value)
    }

    /// Inserts one SAM auxiliary value already split into tag, type code and value text.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedTag`] if a known tag carries an unexpected type or value.
    pub fn insert_sam(&mut self, key: &str, kind: char, value: &str) -> Result<(), CodecError> {
        let expects = |expected: &[char]| {
            if expected.contains(&kind) {
                Ok(())
            } else {
                Err(CodecError::malformed(
                    format!("{key}:{kind}:{value}"),
                    format!("tag {key} must have type {}", expected.iter().join(" or ")),
                ))
            }
        };
        match key {
            "PV" | "FA" | "PM" | "MA" | "DG" | "DR" => {
                expects(&['B'])?;
                let elements = value.split_once(',').map_or("", |(_, rest)| rest);
                match key {
                    "PV" => self.pv = parse_int_values(elements)?,
                    "FA" => self.fa = parse_int_values(elements)?,
                    "PM" => self.pm = parse_int_values(elements)?,
                    "MA" => self.ma = parse_int_values(elements)?,
                    "DG" => self.dg = parse_int_values(elements)?,
                    _ => self.dr = parse_int_values(elements)?,
                }
            }
            "FM" | "ND" | "RC" => {
                expects(&['i'])?;
                let parsed = Some(parse_scalar(key, value)?);
                match key {
                    "FM" => self.fm = parsed,
                    "ND" => self.nd = parsed,
                    _ => self.rc = parsed,
                }
            }
            "BS" => {
                expects(&['Z'])?;
                self.bs = Some(value.to_string());
            }
            "MP" => {
                expects(&['A', 'Z'])?;
                self.mp = Some(parse_flag(value)?);
            }
            _ => {
                self.extra.insert(key.to_string(), ExtraTag { kind, value: value.to_string() });
            }
        }
        Ok(())
    }

    /// Formats the tags as SAM auxiliary fields sorted by tag name.
    ///
    /// # Examples
    /// ```
    /// use famcall_consensus::tags::FamilyTags;
    ///
    /// let tags = FamilyTags { fm: Some(2), mp: Some(true), pv: vec![30, 31], ..Default::default() };
    /// assert_eq!(tags.to_sam_fields(), vec!["FM:i:2", "MP:A:T", "PV:B:I,30,31"]);
    /// ```
    #[must_use]
    pub fn to_sam_fields(&self) -> Vec<String> {
        let mut fields: Vec<(String, String)> = Vec::new();
        let mut add = |key: &str, text: String| fields.push((key.to_string(), text));

        if !self.pv.is_empty() {
            add("PV", format!("PV:B:I,{}", self.pv.iter().join(",")));
        }
        if !self.fa.is_empty() {
            add("FA", format!("FA:B:I,{}", self.fa.iter().join(",")));
        }
        for (key, value) in [("FM", self.fm), ("ND", self.nd), ("RC", self.rc)] {
            if let Some(value) = value {
                add(key, format!("{key}:i:{value}"));
            }
        }
        if let Some(bs) = &self.bs {
            add("BS", format!("BS:Z:{bs}"));
        }
        if let Some(mp) = self.mp {
            add("MP", format!("MP:A:{}", flag_char(mp)));
        }
        for (key, values) in [("PM", &self.pm), ("MA", &self.ma), ("DG", &self.dg), ("DR", &self.dr)]
        {
            if !values.is_empty() {
                add(key, format!("{key}:B:i,{}", values.iter().join(",")));
            }
        }
        for (key, tag) in &self.extra {
            add(key, format!("{key}:{}:{}", tag.kind, tag.value));
        }

        fields.sort_by(|a, b| a.0.cmp(&b.0));
        fields.into_iter().map(|(_, text)| text).collect()
    }
}

fn parse_scalar(key: &str, value: &str) -> Result<u32, CodecError> {
    value
        .parse()
        .map_err(|_| CodecError::malformed(format!("{key}={value}"), "expected an unsigned integer"))
}

fn parse_flag(value: &str) -> Result<bool, CodecError> {
    match value {
        "T" => Ok(true),
        "F" => Ok(false),
        _ => Err(CodecError::malformed(format!("MP={value}"), "expected 'T' or 'F'")),
    }
}

fn flag_char(flag: bool) -> char {
    if flag { 'T' } else { 'F' }
}

fn push_scalar<T: Display>(out: &mut String, key: &str, value: Option<T>) {
    if let Some(value) = value {
        out.push_str(&format!("|{key}={value}"));
    }
}

fn push_array<T: Display>(out: &mut String, key: &str, values: &[T]) {
    if !values.is_empty() {
        out.push_str(&format_int_tag(key, values));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn populated() -> FamilyTags {
        let mut tags = FamilyTags {
            pv: vec![30, 45, 3114],
            fa: vec![3, 3, 2],
            fm: Some(3),
            nd: Some(1),
            rc: Some(2),
            bs: Some("ACGTAC".to_string()),
            mp: Some(true),
            pm: vec![101, 102],
            ma: vec![101],
            dg: vec![102],
            dr: vec![7],
            extra: BTreeMap::new(),
        };
        tags.extra.insert("XY".to_string(), ExtraTag::text("hello"));
        tags
    }

    #[test]
    fn test_description_round_trip() {
        let tags = FamilyTags { extra: BTreeMap::new(), ..populated() };
        let text = tags.to_description();
        assert!(text.starts_with("|FM=3|ND=1|FA=3,3,2|PV=30,45,3114"));
        assert_eq!(FamilyTags::from_description(&text).unwrap(), tags);
    }

    #[test]
    fn test_description_preserves_unknown_tags() {
        let tags = FamilyTags::from_description("|ZZ=abc|FM=2|AA=x=y").unwrap();
        assert_eq!(tags.fm, Some(2));
        assert_eq!(tags.extra["ZZ"], ExtraTag::text("abc"));
        assert_eq!(tags.extra["AA"], ExtraTag::text("x=y"));
        assert_eq!(tags.to_description(), "|FM=2|AA=x=y|ZZ=abc");
    }

    #[rstest]
    #[case("|FM")]
    #[case("|FM=three")]
    #[case("|MP=yes")]
    #[case("|FA=1,b")]
    fn test_description_rejects_malformed(#[case] text: &str) {
        assert!(FamilyTags::from_description(text).is_err());
    }

    #[test]
    fn test_empty_description() {
        assert_eq!(FamilyTags::from_description("").unwrap(), FamilyTags::default());
        assert_eq!(FamilyTags::default().to_description(), "");
    }

    #[test]
    fn test_sam_fields_are_sorted() {
        let fields = populated().to_sam_fields();
        let names: Vec<&str> = fields.iter().map(|f| &f[..2]).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
        assert!(fields.contains(&"MP:A:T".to_string()));
        assert!(fields.contains(&"DG:B:i,102".to_string()));
        assert!(fields.contains(&"XY:Z:hello".to_string()));
    }

    #[test]
    fn test_sam_round_trip() {
        let tags = populated();
        let mut parsed = FamilyTags::default();
        for field in tags.to_sam_fields() {
            parsed.insert_sam_field(&field).unwrap();
        }
        assert_eq!(parsed, tags);
    }

    #[test]
    fn test_sam_extension_keeps_type() {
        let mut tags = FamilyTags::default();
        tags.insert_sam_field("ot:i:-250").unwrap();
        tags.insert_sam_field("RG:Z:sample1").unwrap();
        assert_eq!(tags.extra["ot"], ExtraTag::int(-250));
        assert_eq!(tags.to_sam_fields(), vec!["RG:Z:sample1", "ot:i:-250"]);
    }

    #[test]
    fn test_empty_arrays_are_omitted() {
        let tags = FamilyTags { mp: Some(false), ..Default::default() };
        assert_eq!(tags.to_sam_fields(), vec!["MP:A:F"]);
    }

    #[rstest]
    #[case("FM:Z:3")]
    #[case("PV:i:3")]
    #[case("PV:B:I,3,x")]
    #[case("FM")]
    #[case("FM:ii:3")]
    fn test_sam_rejects_malformed(#[case] field: &str) {
        assert!(FamilyTags::default().insert_sam_field(field).is_err());
    }
}
