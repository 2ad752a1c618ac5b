//! # Image Thresholding Module
//!
//! This module provides binary thresholding functionality for OCR preprocessing.
//! The threshold is selected automatically with Otsu's method.

use image::GrayImage;
use tracing;

use super::types::ThresholdedImageResult;

/// Applies Otsu's thresholding algorithm to convert an image to binary (black/white).
///
/// The optimal threshold maximizes the between-class variance of the
/// histogram. Pixels strictly above the threshold become white (255), all
/// others black (0), so the output holds exactly two levels.
///
/// # Examples
///
/// ```
/// use vin_extractor::preprocessing::apply_otsu_threshold;
///
/// let mut img = image::GrayImage::new(4, 1);
/// img.put_pixel(0, 0, image::Luma([20]));
/// img.put_pixel(1, 0, image::Luma([30]));
/// img.put_pixel(2, 0, image::Luma([220]));
/// img.put_pixel(3, 0, image::Luma([230]));
///
/// let result = apply_otsu_threshold(&img);
/// assert_eq!(result.image.as_raw(), &vec![0, 0, 255, 255]);
/// ```
pub fn apply_otsu_threshold(gray: &GrayImage) -> ThresholdedImageResult {
    let start_time = std::time::Instant::now();

    // Calculate histogram
    let mut histogram = [0u32; 256];
    for pixel in gray.pixels() {
        histogram[pixel[0] as usize] += 1;
    }
    let total_pixels = gray.width() as f64 * gray.height() as f64;

    let optimal_threshold = find_otsu_threshold(&histogram, total_pixels);

    let binary_img = apply_binary_threshold(gray, optimal_threshold);

    let processing_time = start_time.elapsed();

    tracing::debug!(
        target: "ocr_preprocessing",
        "Otsu thresholding completed in {}ms: threshold={}, dimensions={}x{}",
        processing_time.as_millis(),
        optimal_threshold,
        gray.width(),
        gray.height()
    );

    ThresholdedImageResult {
        image: binary_img,
        threshold: optimal_threshold,
        processing_time_ms: processing_time.as_millis() as u32,
    }
}

/// Fixed binary rule: `value > threshold` maps to 255, everything else to 0.
pub fn apply_binary_threshold(gray: &GrayImage, threshold: u8) -> GrayImage {
    let mut binary_img = gray.clone();
    for pixel in binary_img.pixels_mut() {
        pixel[0] = if pixel[0] > threshold { 255 } else { 0 };
    }
    binary_img
}

/// Finds the optimal threshold using Otsu's method by maximizing between-class variance.
///
/// Background is the class of pixels `<= threshold`. Thresholds that leave
/// either class empty are skipped; if every threshold does (a uniform image),
/// the result is 0 and the whole image ends up white.
fn find_otsu_threshold(histogram: &[u32; 256], total_pixels: f64) -> u8 {
    if total_pixels == 0.0 {
        return 0;
    }

    let total_weighted_sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum();

    let mut cumulative_count = 0f64;
    let mut cumulative_weighted_sum = 0f64;
    let mut max_variance = 0f64;
    let mut optimal_threshold = 0u8;

    for (threshold, &count) in histogram.iter().enumerate() {
        cumulative_count += count as f64;
        cumulative_weighted_sum += threshold as f64 * count as f64;

        // Weight of background class (pixels <= threshold)
        let w0 = cumulative_count / total_pixels;
        // Weight of foreground class (pixels > threshold)
        let w1 = 1.0 - w0;

        if cumulative_count == 0.0 || cumulative_count == total_pixels {
            continue;
        }

        let mu0 = cumulative_weighted_sum / cumulative_count;
        let mu1 = (total_weighted_sum - cumulative_weighted_sum) / (total_pixels - cumulative_count);

        // Between-class variance
        let variance = w0 * w1 * (mu0 - mu1).powi(2);

        if variance > max_variance {
            max_variance = variance;
            optimal_threshold = threshold as u8;
        }
    }

    optimal_threshold
}
