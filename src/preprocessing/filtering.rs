//! # Image Filtering Module
//!
//! Non-local means denoising for binarized pages. Each output pixel is a
//! weighted average of the pixels in a search window, where the weight of a
//! neighbour depends on how similar the patch around it is to the patch
//! around the pixel being filtered. Isolated binarization speckle has no
//! similar patches, while character strokes have many, so edges survive.

use image::GrayImage;
use tracing;

use super::types::{DenoisedImageResult, PreprocessingError};

/// Upper bound on the filter strength accepted by [`denoise_non_local_means`]
pub const MAX_DENOISE_STRENGTH: f32 = 30.0;

/// Upper bound on the search window side
pub const MAX_SEARCH_WINDOW: u32 = 35;

/// Patches whose weight falls below this contribute nothing.
const WEIGHT_THRESHOLD: f32 = 0.001;

/// Applies non-local means denoising to a grayscale image.
///
/// The patch distance is the sum of squared differences over a
/// `template_window`² patch, normalized by the patch area, and turned into a
/// weight with `exp(-distance / strength²)`. Borders are handled by
/// replicating edge pixels. The computation is sequential with a fixed
/// iteration order, so identical input always gives identical output.
///
/// # Arguments
///
/// * `image` - The input image to denoise
/// * `strength` - Filter strength `h`; higher removes more noise and more detail
/// * `template_window` - Odd side length of the compared patches
/// * `search_window` - Odd side length of the neighbourhood searched for patches
///
/// # Examples
///
/// ```
/// use vin_extractor::preprocessing::denoise_non_local_means;
///
/// let img = image::GrayImage::from_pixel(16, 16, image::Luma([255]));
/// let denoised = denoise_non_local_means(&img, 3.0, 3, 7).unwrap();
/// assert_eq!(denoised.image, img);
/// ```
pub fn denoise_non_local_means(
    image: &GrayImage,
    strength: f32,
    template_window: u32,
    search_window: u32,
) -> Result<DenoisedImageResult, PreprocessingError> {
    let start_time = std::time::Instant::now();

    validate_parameters(strength, template_window, search_window)?;

    let (width, height) = image.dimensions();
    let w = width as usize;
    let h = height as usize;
    let t = (template_window / 2) as usize;
    let s = (search_window / 2) as usize;
    let pad = s + t;
    let padded_width = w + 2 * pad;
    let padded = pad_replicate(image, pad);

    let weights = weight_table(strength, template_window);
    let span = 2 * t + 1;
    let band_width = w + 2 * t;

    let mut weight_sums = vec![0f32; w * h];
    let mut value_sums = vec![0f32; w * h];
    let mut column_sums = vec![0u32; band_width];

    let s_i = s as isize;
    for dy in -s_i..=s_i {
        for dx in -s_i..=s_i {
            // Band row b of the reference patches starts at (s, s + b); its
            // counterpart is shifted by (dx, dy).
            let shifted_col = (s as isize + dx) as usize;
            let shifted_row = |b: usize| ((s + b) as isize + dy) as usize;

            column_sums.fill(0);
            for b in 0..span {
                let here = band_row(&padded, padded_width, s + b, s, band_width);
                let there = band_row(&padded, padded_width, shifted_row(b), shifted_col, band_width);
                for (column, (&p, &q)) in column_sums.iter_mut().zip(here.iter().zip(there)) {
                    *column += squared_diff(p, q);
                }
            }

            for y in 0..h {
                if y > 0 {
                    let added = band_row(&padded, padded_width, s + y + 2 * t, s, band_width)
                        .iter()
                        .zip(band_row(&padded, padded_width, shifted_row(y + 2 * t), shifted_col, band_width));
                    let removed = band_row(&padded, padded_width, s + y - 1, s, band_width)
                        .iter()
                        .zip(band_row(&padded, padded_width, shifted_row(y - 1), shifted_col, band_width));
                    for (column, ((&p, &q), (&r, &u))) in column_sums.iter_mut().zip(added.zip(removed)) {
                        *column = *column + squared_diff(p, q) - squared_diff(r, u);
                    }
                }

                let neighbour_row = ((y + pad) as isize + dy) as usize * padded_width;
                let mut distance: u32 = column_sums[..span].iter().sum();
                for x in 0..w {
                    if x > 0 {
                        distance = distance + column_sums[x + 2 * t] - column_sums[x - 1];
                    }
                    if let Some(&weight) = weights.get(distance as usize) {
                        let neighbour = padded[neighbour_row + ((x + pad) as isize + dx) as usize];
                        let idx = y * w + x;
                        weight_sums[idx] += weight;
                        value_sums[idx] += weight * neighbour as f32;
                    }
                }
            }
        }
    }

    // The zero offset always contributes weight 1, so no sum is zero.
    let data = weight_sums
        .iter()
        .zip(value_sums.iter())
        .map(|(&weight, &value)| (value / weight).round().clamp(0.0, 255.0) as u8)
        .collect();

    let denoised = GrayImage::from_raw(width, height, data).ok_or_else(|| PreprocessingError::ProcessingFailed {
        message: "denoised buffer does not match image dimensions".to_string(),
    })?;

    let processing_time = start_time.elapsed();

    tracing::debug!(
        target: "ocr_preprocessing",
        "Non-local means denoising completed in {}ms: h={:.1}, template={}, search={}, dimensions={}x{}",
        processing_time.as_millis(),
        strength,
        template_window,
        search_window,
        width,
        height
    );

    Ok(DenoisedImageResult {
        image: denoised,
        strength,
        processing_time_ms: processing_time.as_millis() as u32,
    })
}

fn validate_parameters(strength: f32, template_window: u32, search_window: u32) -> Result<(), PreprocessingError> {
    if !(strength > 0.0 && strength <= MAX_DENOISE_STRENGTH) {
        return Err(PreprocessingError::InvalidParameter {
            name: "strength",
            message: format!("{} is outside (0, {}]", strength, MAX_DENOISE_STRENGTH),
        });
    }
    if template_window == 0 || template_window % 2 == 0 {
        return Err(PreprocessingError::InvalidParameter {
            name: "template_window",
            message: format!("{} must be odd", template_window),
        });
    }
    if search_window % 2 == 0 || search_window < template_window || search_window > MAX_SEARCH_WINDOW {
        return Err(PreprocessingError::InvalidParameter {
            name: "search_window",
            message: format!(
                "{} must be odd, at least {} and at most {}",
                search_window, template_window, MAX_SEARCH_WINDOW
            ),
        });
    }
    Ok(())
}

/// `len` pixels of the padded buffer starting at (`col`, `row`).
fn band_row(padded: &[u8], padded_width: usize, row: usize, col: usize, len: usize) -> &[u8] {
    let start = row * padded_width + col;
    &padded[start..start + len]
}

fn squared_diff(a: u8, b: u8) -> u32 {
    let diff = a.abs_diff(b) as u32;
    diff * diff
}

/// Precomputed weights indexed by raw patch SSD. Distances past the end of
/// the table have a weight below [`WEIGHT_THRESHOLD`].
fn weight_table(strength: f32, template_window: u32) -> Vec<f32> {
    let area = (template_window * template_window) as f32;
    let scale = strength * strength * area;
    let cutoff = (-WEIGHT_THRESHOLD.ln() * scale).ceil() as usize;
    (0..=cutoff)
        .map(|distance| (-(distance as f32) / scale).exp())
        .take_while(|&weight| weight >= WEIGHT_THRESHOLD)
        .collect()
}

/// Copy of `image` grown by `pad` pixels on every side, edges replicated.
fn pad_replicate(image: &GrayImage, pad: usize) -> Vec<u8> {
    let (width, height) = image.dimensions();
    let w = width as usize;
    let h = height as usize;
    let padded_width = w + 2 * pad;
    let padded_height = h + 2 * pad;
    let src = image.as_raw();

    let mut padded = Vec::with_capacity(padded_width * padded_height);
    for py in 0..padded_height {
        let y = py.saturating_sub(pad).min(h - 1);
        let row = &src[y * w..(y + 1) * w];
        padded.extend(std::iter::repeat(row[0]).take(pad));
        padded.extend_from_slice(row);
        padded.extend(std::iter::repeat(row[w - 1]).take(pad));
    }
    padded
}
