//! # Grayscale Conversion
//!
//! Brings a page image down to a single luminance channel.

use image::GrayImage;

use super::types::PreprocessingError;
use crate::models::PageImage;

// Rec. 601 luma weights in 14-bit fixed point; they sum to 1 << 14.
const R_WEIGHT: u32 = 4899;
const G_WEIGHT: u32 = 9617;
const B_WEIGHT: u32 = 1868;
const SHIFT: u32 = 14;

/// Converts a page to grayscale.
///
/// Single-channel pages are copied as is. Three-channel pages (RGB order) are
/// reduced with the Rec. 601 luminance weights, rounded in fixed point so the
/// result is reproducible bit for bit. Any other channel count is rejected.
pub fn to_grayscale(page: &PageImage) -> Result<GrayImage, PreprocessingError> {
    let (width, height) = page.dimensions();
    let data = match page.channels() {
        1 => page.as_bytes().to_vec(),
        3 => page
            .as_bytes()
            .chunks_exact(3)
            .map(|px| {
                let weighted = px[0] as u32 * R_WEIGHT
                    + px[1] as u32 * G_WEIGHT
                    + px[2] as u32 * B_WEIGHT
                    + (1 << (SHIFT - 1));
                (weighted >> SHIFT) as u8
            })
            .collect(),
        channels => return Err(PreprocessingError::UnsupportedImageFormat { channels }),
    };

    GrayImage::from_raw(width, height, data).ok_or_else(|| PreprocessingError::ProcessingFailed {
        message: "grayscale buffer does not match page dimensions".to_string(),
    })
}
