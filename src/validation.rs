//! Validation module for VIN check digits
//!
//! Implements the ISO 3779 check-digit scheme restricted to the recognized
//! manufacturer prefixes, in three flavours:
//!
//! - [`validate_vin`]: a plain yes/no, used by the page pipeline
//! - [`check_vin`]: the first precise reason a VIN is rejected
//! - [`review_vin`]: every problem at once, for operator review of edited VINs

use serde::Serialize;

use crate::text_processing::{is_manufacturer_prefix, MANUFACTURER_PREFIXES, VIN_LENGTH};

/// Position weights; index 8 is the check digit itself and weighs nothing.
const POSITION_WEIGHTS: [u32; VIN_LENGTH] = [8, 7, 6, 5, 4, 3, 2, 10, 0, 9, 8, 7, 6, 5, 4, 3, 2];

/// Index of the check digit
pub const CHECK_DIGIT_INDEX: usize = 8;

/// Why a VIN failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VinValidationError {
    /// Not exactly 17 characters
    InvalidLength { length: usize },
    /// Does not start with a recognized manufacturer prefix
    UnrecognizedPrefix { prefix: String },
    /// A character has no transliteration value (0-based position)
    MalformedCandidate { position: usize, character: char },
    /// Well-formed, but the check digit does not match
    CheckDigitMismatch { expected: char, found: char },
}

impl VinValidationError {
    /// Short label for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            VinValidationError::InvalidLength { .. } => "length",
            VinValidationError::UnrecognizedPrefix { .. } => "prefix",
            VinValidationError::MalformedCandidate { .. } => "malformed",
            VinValidationError::CheckDigitMismatch { .. } => "check_digit",
        }
    }
}

impl std::fmt::Display for VinValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VinValidationError::InvalidLength { length } => {
                write!(f, "VIN must be exactly {} characters long, got {}", VIN_LENGTH, length)
            }
            VinValidationError::UnrecognizedPrefix { prefix } => write!(
                f,
                "VIN prefix '{}' is not one of {}",
                prefix,
                MANUFACTURER_PREFIXES.join(", ")
            ),
            VinValidationError::MalformedCandidate { position, character } => write!(
                f,
                "Invalid character '{}' at position {}",
                character,
                position + 1
            ),
            VinValidationError::CheckDigitMismatch { expected, found } => write!(
                f,
                "Invalid check digit: expected '{}', found '{}'",
                expected, found
            ),
        }
    }
}

impl std::error::Error for VinValidationError {}

/// Numeric value of a VIN character, `None` for characters outside the
/// VIN alphabet (including I, O and Q).
///
/// ```
/// use vin_extractor::validation::transliterate;
///
/// assert_eq!(transliterate('7'), Some(7));
/// assert_eq!(transliterate('P'), Some(7));
/// assert_eq!(transliterate('Z'), Some(9));
/// assert_eq!(transliterate('O'), None);
/// ```
pub fn transliterate(c: char) -> Option<u32> {
    let value = match c {
        '0'..='9' => return c.to_digit(10),
        'A' | 'J' => 1,
        'B' | 'K' | 'S' => 2,
        'C' | 'L' | 'T' => 3,
        'D' | 'M' | 'U' => 4,
        'E' | 'N' | 'V' => 5,
        'F' | 'W' => 6,
        'G' | 'P' | 'X' => 7,
        'H' | 'Y' => 8,
        'R' | 'Z' => 9,
        _ => return None,
    };
    Some(value)
}

/// Compute the check character for a 17-character VIN: the weighted sum of
/// transliterated values modulo 11, with 10 written as `X`.
///
/// # Errors
///
/// `InvalidLength` or `MalformedCandidate`; the prefix is not checked here.
pub fn compute_check_digit(vin: &str) -> Result<char, VinValidationError> {
    let length = vin.chars().count();
    if length != VIN_LENGTH {
        return Err(VinValidationError::InvalidLength { length });
    }

    let mut sum = 0u32;
    for (position, (character, weight)) in vin.chars().zip(POSITION_WEIGHTS).enumerate() {
        let value = transliterate(character)
            .ok_or(VinValidationError::MalformedCandidate { position, character })?;
        sum += value * weight;
    }

    Ok(match sum % 11 {
        10 => 'X',
        // sum % 11 is a single digit here
        remainder => char::from_digit(remainder, 10).unwrap_or('X'),
    })
}

/// Validate a VIN, returning the first reason it is rejected.
///
/// Checks run in order: length, manufacturer prefix, characters, check digit.
///
/// ```
/// use vin_extractor::validation::{check_vin, VinValidationError};
///
/// assert!(check_vin("5YJSA1E13MF123456").is_ok());
/// assert_eq!(
///     check_vin("5YJSA1E14MF123456"),
///     Err(VinValidationError::CheckDigitMismatch { expected: '3', found: '4' })
/// );
/// ```
pub fn check_vin(vin: &str) -> Result<(), VinValidationError> {
    let length = vin.chars().count();
    if length != VIN_LENGTH {
        return Err(VinValidationError::InvalidLength { length });
    }

    let prefix: String = vin.chars().take(3).collect();
    if !is_manufacturer_prefix(&prefix) {
        return Err(VinValidationError::UnrecognizedPrefix { prefix });
    }

    let expected = compute_check_digit(vin)?;
    let found = vin.chars().nth(CHECK_DIGIT_INDEX).unwrap_or_default();
    if expected != found {
        return Err(VinValidationError::CheckDigitMismatch { expected, found });
    }

    Ok(())
}

/// Whether `vin` is a structurally valid VIN with a recognized prefix.
///
/// Never panics; malformed input is simply invalid.
pub fn validate_vin(vin: &str) -> bool {
    check_vin(vin).is_ok()
}

/// Outcome of reviewing a VIN, listing every problem found
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VinReport {
    pub vin: String,
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Review a VIN typed or corrected by an operator.
///
/// Surrounding whitespace is ignored. A wrong length is reported alone;
/// otherwise illegal letters, other invalid characters, an unrecognized
/// prefix and a check-digit mismatch are all reported together.
pub fn review_vin(vin: &str) -> VinReport {
    let vin = vin.trim();
    let mut errors = Vec::new();

    let length = vin.chars().count();
    if length != VIN_LENGTH {
        errors.push(VinValidationError::InvalidLength { length }.to_string());
        return VinReport {
            vin: vin.to_string(),
            is_valid: false,
            errors,
        };
    }

    if vin.chars().any(|c| matches!(c, 'I' | 'O' | 'Q')) {
        errors.push("VIN cannot contain I, O, or Q".to_string());
    }
    for (position, character) in vin.chars().enumerate() {
        if transliterate(character).is_none() && !matches!(character, 'I' | 'O' | 'Q') {
            errors.push(VinValidationError::MalformedCandidate { position, character }.to_string());
        }
    }

    let prefix: String = vin.chars().take(3).collect();
    if !is_manufacturer_prefix(&prefix) {
        errors.push(VinValidationError::UnrecognizedPrefix { prefix }.to_string());
    }

    // Only meaningful once every character has a value
    if let Ok(expected) = compute_check_digit(vin) {
        let found = vin.chars().nth(CHECK_DIGIT_INDEX).unwrap_or_default();
        if expected != found {
            errors.push(VinValidationError::CheckDigitMismatch { expected, found }.to_string());
        }
    }

    VinReport {
        vin: vin.to_string(),
        is_valid: errors.is_empty(),
        errors,
    }
}
