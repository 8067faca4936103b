// SPDX-License-Identifier: PMPL-1.0-or-later
//
// PITR WAL analysis - Segment naming
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A WAL segment is named by 24 hexadecimal characters: 8 for the timeline
// followed by 16 for the log sequence, e.g. `0000000100000000000000A1`.
// Because the encoding is fixed-width, lexicographic order of the names is
// the same as numeric order, which lets the continuity walk sort plain
// strings. Names are held in upper case whatever case they were listed in.
//
// Archive folders also contain objects that are not segments: backup
// markers (`...00000028.backup`), timeline history files (`00000002.history`)
// and segments still being written (`<name>.partial`). `canonicalize` sorts
// these out.

use std::fmt;

use crate::error::{WalError, WalResult};

/// Length of a canonical WAL segment name.
pub const SEGMENT_NAME_LEN: usize = 24;

/// Length of the timeline component at the start of a segment name.
pub const TIMELINE_LEN: usize = 8;

/// Marker carried by segments that were still being written when copied.
pub const PARTIAL_MARKER: &str = ".partial";

/// Suffixes of objects that live next to segments but are not segments.
pub const EXCLUDED_SUFFIXES: &[&str] = &[".backup", ".history"];

/// A validated, canonical 24-character WAL segment name.
///
/// Ordering compares the textual name, which matches numeric order for the
/// fixed-width hex encoding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentName {
    text: String,
    timeline: u32,
    log_sequence: u64,
}

impl SegmentName {
    /// Validate `name` as a segment name. Lower-case hex is accepted and
    /// normalized to upper case.
    pub fn parse(name: &str) -> WalResult<Self> {
        if name.len() != SEGMENT_NAME_LEN {
            return Err(WalError::malformed(
                name,
                format!("expected {SEGMENT_NAME_LEN} characters, got {}", name.len()),
            ));
        }
        let timeline = parse_timeline(name)?;
        let suffix = &name[TIMELINE_LEN..];
        let log_sequence = parse_hex_u64(name, suffix)?;

        Ok(Self {
            text: name.to_ascii_uppercase(),
            timeline,
            log_sequence,
        })
    }

    /// The name as text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The timeline component (first 8 hex characters).
    pub fn timeline(&self) -> u32 {
        self.timeline
    }

    /// The log sequence component (last 16 hex characters).
    pub fn log_sequence(&self) -> u64 {
        self.log_sequence
    }

    /// The name the database writes immediately after this one.
    ///
    /// The timeline prefix is kept; the 16-character suffix is incremented
    /// and zero-padded. `None` once the log sequence is exhausted.
    pub fn successor(&self) -> Option<SegmentName> {
        let log_sequence = self.log_sequence.checked_add(1)?;
        Some(SegmentName {
            text: format!("{:08X}{log_sequence:016X}", self.timeline),
            timeline: self.timeline,
            log_sequence,
        })
    }
}

impl fmt::Display for SegmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl AsRef<str> for SegmentName {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// A segment name reduced to canonical form, remembering whether the
/// observed object was a `.partial` upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalSegment {
    pub name: SegmentName,
    pub partial: bool,
}

/// Interpret the first 8 characters of `name` as the hexadecimal timeline.
///
/// Fails with [`WalError::MalformedSegmentName`] when the name is shorter
/// than a full segment name or the prefix is not hex.
pub fn parse_timeline(name: &str) -> WalResult<u32> {
    if name.len() < SEGMENT_NAME_LEN {
        return Err(WalError::malformed(
            name,
            format!("shorter than {SEGMENT_NAME_LEN} characters"),
        ));
    }
    let prefix = name
        .get(..TIMELINE_LEN)
        .ok_or_else(|| WalError::malformed(name, "timeline prefix is not ASCII"))?;
    if !prefix.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(WalError::malformed(name, "timeline prefix is not hexadecimal"));
    }
    u32::from_str_radix(prefix, 16).map_err(|e| WalError::malformed(name, e.to_string()))
}

/// Free-function form of [`SegmentName::successor`].
pub fn successor(name: &SegmentName) -> Option<SegmentName> {
    name.successor()
}

/// Reduce an observed object name to a canonical segment name.
///
/// Returns `None` for backup markers, history files, and anything whose
/// canonical form is not a valid 24-character segment name.
pub fn canonicalize(raw: &str) -> Option<CanonicalSegment> {
    if EXCLUDED_SUFFIXES.iter().any(|suffix| raw.ends_with(suffix)) {
        return None;
    }

    let partial = raw.contains(PARTIAL_MARKER);
    let candidate = if partial {
        raw.get(..SEGMENT_NAME_LEN)?
    } else {
        raw
    };

    SegmentName::parse(candidate)
        .ok()
        .map(|name| CanonicalSegment { name, partial })
}

fn parse_hex_u64(name: &str, digits: &str) -> WalResult<u64> {
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(WalError::malformed(name, "log sequence is not hexadecimal"));
    }
    u64::from_str_radix(digits, 16).map_err(|e| WalError::malformed(name, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(name: &str) -> SegmentName {
        SegmentName::parse(name).unwrap()
    }

    #[test]
    fn test_parse_components() {
        let name = seg("0000000100000000000000A1");
        assert_eq!(name.timeline(), 1);
        assert_eq!(name.log_sequence(), 0xA1);
        assert_eq!(name.as_str(), "0000000100000000000000A1");
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert!(SegmentName::parse("00000001000000000000A1").is_err());
        assert!(SegmentName::parse("0000000100000000000000A1F").is_err());
        assert!(SegmentName::parse("").is_err());
    }

    #[test]
    fn test_parse_rejects_non_hex() {
        let err = SegmentName::parse("0000000100000000000000ZZ").unwrap_err();
        assert!(matches!(err, WalError::MalformedSegmentName { .. }));
        assert!(SegmentName::parse("+000000100000000000000A1").is_err());
    }

    #[test]
    fn test_parse_timeline() {
        assert_eq!(parse_timeline("0000000200000000000000A1").unwrap(), 2);
        assert_eq!(parse_timeline("0000001A00000000000000A1.partial").unwrap(), 0x1A);
        assert!(parse_timeline("00000002").is_err());
        assert!(parse_timeline("XXXXXXXX00000000000000A1").is_err());
    }

    #[test]
    fn test_successor_increments_suffix() {
        assert_eq!(
            seg("0000000100000000000000A1").successor().unwrap().as_str(),
            "0000000100000000000000A2"
        );
        assert_eq!(
            successor(&seg("00000001000000000000000F")).unwrap().as_str(),
            "000000010000000000000010"
        );
    }

    #[test]
    fn test_successor_carries_into_high_digits() {
        assert_eq!(
            seg("0000000100000000000000FF").successor().unwrap().as_str(),
            "000000010000000000000100"
        );
        assert_eq!(
            seg("0000000300000000FFFFFFFF").successor().unwrap().as_str(),
            "000000030000000100000000"
        );
    }

    #[test]
    fn test_successor_keeps_timeline() {
        let next = seg("0000000700000000000000A1").successor().unwrap();
        assert_eq!(next.timeline(), 7);
        assert!(next.as_str().starts_with("00000007"));
    }

    #[test]
    fn test_successor_ends_at_last_sequence() {
        assert!(seg("00000001FFFFFFFFFFFFFFFF").successor().is_none());
        assert_eq!(
            seg("00000001FFFFFFFFFFFFFFFE").successor().unwrap().as_str(),
            "00000001FFFFFFFFFFFFFFFF"
        );
    }

    #[test]
    fn test_lowercase_names_are_normalized() {
        let lower = seg("0000000a00000000000000a1");
        assert_eq!(lower.as_str(), "0000000A00000000000000A1");
        assert_eq!(lower, seg("0000000A00000000000000A1"));
        assert_eq!(lower.successor().unwrap().as_str(), "0000000A00000000000000A2");

        let canonical = canonicalize("0000000100000000000000a3.partial").unwrap();
        assert_eq!(canonical.name.as_str(), "0000000100000000000000A3");
        assert!(canonical.partial);
    }

    #[test]
    fn test_ordering_matches_sequence() {
        let mut names = vec![
            seg("000000010000000000000100"),
            seg("0000000100000000000000A1"),
            seg("0000000100000000000000FF"),
        ];
        names.sort();
        assert_eq!(names[0].log_sequence(), 0xA1);
        assert_eq!(names[1].log_sequence(), 0xFF);
        assert_eq!(names[2].log_sequence(), 0x100);
    }

    #[test]
    fn test_canonicalize_plain_segment() {
        let canonical = canonicalize("0000000100000000000000A1").unwrap();
        assert_eq!(canonical.name.as_str(), "0000000100000000000000A1");
        assert!(!canonical.partial);
    }

    #[test]
    fn test_canonicalize_partial_segment() {
        let canonical = canonicalize("0000000100000000000000A3.partial").unwrap();
        assert_eq!(canonical.name.as_str(), "0000000100000000000000A3");
        assert!(canonical.partial);
    }

    #[test]
    fn test_canonicalize_excludes_markers() {
        assert!(canonicalize("0000000100000000000000A1.00000028.backup").is_none());
        assert!(canonicalize("00000002.history").is_none());
        assert!(canonicalize(".DS_Store").is_none());
        assert!(canonicalize("metadata.json").is_none());
        assert!(canonicalize("short.partial").is_none());
    }
}
