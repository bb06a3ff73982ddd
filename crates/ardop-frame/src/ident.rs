//! Station identification (IDF) frames.
//!
//! An IDF payload looks like ` LA5NTA:[JP20QE] `: a callsign, optional colons
//! or whitespace, then a locator in square brackets.

use crate::error::{FrameError, Result};
use crate::frame::{DataFrame, DataKind};

/// Callsign and locator announced by an IDF frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub callsign: String,
    pub locator: String,
}

/// Extract `(callsign, locator)` from an IDF frame.
///
/// Matches the first occurrence of `word [:\s]* [word]` in the payload, where
/// a word is a run of ASCII letters, digits or underscores. Both captures are
/// returned as they appear.
pub fn decode_identity(frame: &DataFrame) -> Result<(String, String)> {
    if !frame.id_frame() {
        return Err(FrameError::UnexpectedFrameKind {
            expected: DataKind::Idf.as_str(),
            actual: frame.tag_str(),
        });
    }

    let data = frame.payload();
    let mut start = 0;
    while start < data.len() {
        let call_end = start + word_len(&data[start..]);
        if call_end == start {
            start += 1;
            continue;
        }
        if let Some(found) = match_after_word(data, start, call_end) {
            return Ok(found);
        }
        // Every later start inside this word shares its tail, so it fails too.
        start = call_end + 1;
    }
    Err(FrameError::InvalidIdentity)
}

/// Try to complete a match for the word at `start..call_end`.
fn match_after_word(data: &[u8], start: usize, call_end: usize) -> Option<(String, String)> {
    let mut pos = call_end;
    while pos < data.len() && (data[pos] == b':' || is_space(data[pos])) {
        pos += 1;
    }
    if data.get(pos) != Some(&b'[') {
        return None;
    }

    let loc_start = pos + 1;
    let loc_end = loc_start + word_len(&data[loc_start..]);
    if loc_end == loc_start || data.get(loc_end) != Some(&b']') {
        return None;
    }

    // Word bytes are ASCII, so these slices are valid UTF-8.
    let callsign = String::from_utf8_lossy(&data[start..call_end]).into_owned();
    let locator = String::from_utf8_lossy(&data[loc_start..loc_end]).into_owned();
    Some((callsign, locator))
}

fn word_len(data: &[u8]) -> usize {
    data.iter()
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
        .count()
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\x0c' | b'\r')
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::codec::MAX_DATA_PAYLOAD;

    fn idf(text: &str) -> DataFrame {
        DataFrame::new(DataKind::Idf, text.as_bytes().to_vec())
    }

    #[test]
    fn decodes_colon_separated_identity() {
        let (call, loc) = decode_identity(&idf("LA5NTA:[JP20QE] ")).unwrap();
        assert_eq!(call, "LA5NTA");
        assert_eq!(loc, "JP20QE");
    }

    #[test]
    fn decodes_space_separated_identity() {
        let (call, loc) = decode_identity(&idf(" LA5NTA [JP20QE]")).unwrap();
        assert_eq!((call.as_str(), loc.as_str()), ("LA5NTA", "JP20QE"));
    }

    #[test]
    fn keeps_case_as_sent() {
        let ident = idf("la5nta: \t[jp20qe]").identity().unwrap();
        assert_eq!(ident.callsign, "la5nta");
        assert_eq!(ident.locator, "jp20qe");
    }

    #[test]
    fn missing_locator_is_a_format_error() {
        let err = decode_identity(&idf("NOCALL")).unwrap_err();
        assert!(matches!(err, FrameError::InvalidIdentity));
    }

    #[test]
    fn empty_brackets_do_not_match() {
        let err = decode_identity(&idf("NOCALL:[]")).unwrap_err();
        assert!(matches!(err, FrameError::InvalidIdentity));
    }

    #[test]
    fn skips_leading_noise() {
        let (call, loc) = decode_identity(&idf("ID: -- W1AW/P [FN31pr]")).unwrap();
        assert_eq!(call, "P");
        assert_eq!(loc, "FN31pr");
    }

    #[test]
    fn matches_like_the_id_pattern() {
        let (call, loc) = decode_identity(&idf("A:B [C]")).unwrap();
        assert_eq!((call.as_str(), loc.as_str()), ("B", "C"));
        let (call, loc) = decode_identity(&idf("AB[CD] x")).unwrap();
        assert_eq!((call.as_str(), loc.as_str()), ("AB", "CD"));
    }

    #[test]
    fn largest_word_only_payload_fails_fast() {
        let frame = DataFrame::new(DataKind::Idf, vec![b'A'; MAX_DATA_PAYLOAD]);
        let started = Instant::now();
        let err = decode_identity(&frame).unwrap_err();
        assert!(matches!(err, FrameError::InvalidIdentity));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn long_callsign_before_locator_still_matches() {
        let mut payload = vec![b'W'; MAX_DATA_PAYLOAD - 8];
        payload.extend_from_slice(b":[JP20]");
        let (call, loc) = decode_identity(&DataFrame::new(DataKind::Idf, payload)).unwrap();
        assert_eq!(call.len(), MAX_DATA_PAYLOAD - 8);
        assert_eq!(loc, "JP20");
    }

    #[test]
    fn non_idf_frame_is_rejected() {
        let frame = DataFrame::new(DataKind::Arq, &b"LA5NTA:[JP20QE]"[..]);
        let err = decode_identity(&frame).unwrap_err();
        assert!(matches!(
            err,
            FrameError::UnexpectedFrameKind { expected: "IDF", ref actual } if actual == "ARQ"
        ));
    }
}
