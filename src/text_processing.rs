//! # Text Processing Module
//!
//! This module finds VIN candidates in recognized text.
//!
//! A candidate is a 17-character run that starts with one of the recognized
//! manufacturer prefixes and continues with 14 characters from the VIN
//! alphabet (digits and uppercase letters other than I, O and Q). Matching is
//! case-sensitive and scans left to right without overlaps, so the same text
//! always yields the same ordered list.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::trace;

/// World manufacturer identifiers a candidate may start with
pub const MANUFACTURER_PREFIXES: [&str; 2] = ["5YJ", "7SA"];

/// Length of every VIN
pub const VIN_LENGTH: usize = 17;

lazy_static! {
    static ref VIN_CANDIDATE_PATTERN: Regex =
        Regex::new(r"(?:5YJ|7SA)[A-HJ-NPR-Z0-9]{14}").expect("VIN candidate pattern should be valid");
}

/// A candidate and where it was found in the recognized text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VinCandidate {
    pub value: String,
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset one past the last character
    pub end: usize,
}

/// Find every candidate in `text`, in order of appearance.
pub fn find_candidates(text: &str) -> Vec<VinCandidate> {
    let candidates: Vec<VinCandidate> = VIN_CANDIDATE_PATTERN
        .find_iter(text)
        .map(|m| VinCandidate {
            value: m.as_str().to_string(),
            start: m.start(),
            end: m.end(),
        })
        .collect();

    trace!(
        "Found {} VIN candidate(s) in {} characters of text",
        candidates.len(),
        text.len()
    );
    candidates
}

/// Candidate strings in `text`, in order of appearance.
///
/// # Examples
///
/// ```
/// use vin_extractor::text_processing::extract_candidates;
///
/// let candidates = extract_candidates("NOISE5YJSA1E14MF123456JUNK");
/// assert_eq!(candidates, vec!["5YJSA1E14MF123456".to_string()]);
/// ```
pub fn extract_candidates(text: &str) -> Vec<String> {
    find_candidates(text).into_iter().map(|c| c.value).collect()
}

/// Whether `prefix` is one of [`MANUFACTURER_PREFIXES`]
pub fn is_manufacturer_prefix(prefix: &str) -> bool {
    MANUFACTURER_PREFIXES.contains(&prefix)
}
