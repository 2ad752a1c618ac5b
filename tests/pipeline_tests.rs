//! # Page Pipeline Tests
//!
//! End-to-end runs of the page pipeline over synthetic pages, with a
//! scripted recognizer in place of Tesseract.


#[cfg(test)]
mod tests {
    use super::test_helpers::*;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use std::sync::atomic::Ordering;
    use vin_extractor::errors::AppError;
    use vin_extractor::models::NormalizedImage;
    use vin_extractor::ocr_errors::OcrError;
    use vin_extractor::preview::{PreviewEncoder, DATA_URI_PREFIX};
    use vin_extractor::{PageOutcome, PagePipeline};

    fn decode_preview(preview: &str) -> image::DynamicImage {
        let b64 = preview.strip_prefix(DATA_URI_PREFIX).expect("data URI prefix");
        let png = STANDARD.decode(b64).expect("valid base64");
        image::load_from_memory_with_format(&png, image::ImageFormat::Png).expect("valid PNG")
    }

    #[test]
    fn test_candidate_with_wrong_check_digit_is_rejected() {
        let pipeline = pipeline_with(ScriptedRecognizer::texts(&["NOISE5YJSA1E14MF123456JUNK"]));

        let result = pipeline.normalize_and_extract(&scanned_page(60, 40), 1).unwrap();

        assert_eq!(result.outcome(), PageOutcome::NoValidVinsFound);
        assert_eq!(result.rejected_candidates.len(), 1);
        assert_eq!(result.rejected_candidates[0].candidate, "5YJSA1E14MF123456");
        assert!(result.rejected_candidates[0].reason.contains("check digit"));
    }

    #[test]
    fn test_embedded_vin_with_correct_check_digit_is_found() {
        let pipeline = pipeline_with(ScriptedRecognizer::texts(&["NOISE5YJSA1E13MF123456JUNK"]));

        let result = pipeline.normalize_and_extract(&scanned_page(60, 40), 1).unwrap();

        assert_eq!(result.outcome(), PageOutcome::VinsFound);
        assert_eq!(result.vins[0].vin, "5YJSA1E13MF123456");
        assert_eq!(result.vins[0].page_number, 1);
    }

    #[test]
    fn test_page_without_prefix_has_no_vins_but_a_preview() {
        let pipeline = pipeline_with(ScriptedRecognizer::texts(&["1HGCM82633A004352 INVOICE 2024"]));

        let result = pipeline.process_document(&[scanned_page(60, 40)]).unwrap();

        assert!(!result.has_vins());
        assert!(result.skipped_pages.is_empty());
        let page = result.page(1).unwrap();
        assert_eq!(page.outcome(), PageOutcome::NoValidVinsFound);
        assert!(page.preview.starts_with(DATA_URI_PREFIX));
    }

    #[test]
    fn test_unsupported_page_is_skipped_and_others_survive() {
        let recognizer = ScriptedRecognizer::texts(&["5YJ3E1EA2KF317000", "7SAYGDEE3NF000001"]);
        let calls = recognizer.call_counter();
        let pipeline = pipeline_with(recognizer);
        let pages = vec![scanned_page(48, 32), two_channel_page(48, 32), noisy_gray_page(48, 32, 7)];

        let result = pipeline.process_document(&pages).unwrap();

        assert_eq!(result.total_pages, 3);
        let processed: Vec<u32> = result.pages.iter().map(|p| p.page_number).collect();
        assert_eq!(processed, vec![1, 3]);
        assert_eq!(result.skipped_pages.len(), 1);
        assert_eq!(result.skipped_pages[0].page_number, 2);
        assert!(matches!(result.skipped_pages[0].error, AppError::UnsupportedImageFormat(_)));

        // The unsupported page never reaches the recognizer
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let vins: Vec<(u32, &str)> = result.vins.iter().map(|v| (v.page_number, v.vin.as_str())).collect();
        assert_eq!(vins, vec![(1, "5YJ3E1EA2KF317000"), (3, "7SAYGDEE3NF000001")]);
        assert!(result.has_vins());

        let response = result.to_response();
        assert_eq!(response.processed_images.len(), 2);
        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].page_number, 2);
    }

    #[test]
    fn test_valid_and_mutated_vins_on_one_page() {
        let text = "VIN: 5YJSA1E13MF123456\nVIN: 5YJSA1E14MF123456\nVIN: 5YJXCBE2XGF000000";
        let pipeline = pipeline_with(ScriptedRecognizer::texts(&[text]));

        let result = pipeline.process_document(&[scanned_page(40, 40)]).unwrap();

        let vins: Vec<&str> = result.vins.iter().map(|v| v.vin.as_str()).collect();
        assert_eq!(vins, vec!["5YJSA1E13MF123456", "5YJXCBE2XGF000000"]);
        assert_eq!(result.pages[0].rejected_candidates.len(), 1);
    }

    #[test]
    fn test_repeated_vin_is_reported_per_occurrence() {
        let pipeline = pipeline_with(ScriptedRecognizer::constant("5YJSA1E13MF123456"));

        let result = pipeline
            .process_document(&[scanned_page(40, 40), scanned_page(40, 40)])
            .unwrap();

        assert_eq!(result.vins.len(), 2);
        assert_eq!(result.vins[0].page_number, 1);
        assert_eq!(result.vins[1].page_number, 2);
    }

    #[test]
    fn test_recognition_failure_only_skips_that_page() {
        let pipeline = pipeline_with(ScriptedRecognizer::new(vec![
            Script::Fail(OcrError::Extraction("tesseract exited with status 1".to_string())),
            Script::Text("7SAXCBE66NF000000".to_string()),
        ]));

        let result = pipeline
            .process_document(&[scanned_page(40, 40), scanned_page(40, 40)])
            .unwrap();

        assert_eq!(result.skipped_pages.len(), 1);
        assert_eq!(result.skipped_pages[0].page_number, 1);
        assert!(matches!(result.skipped_pages[0].error, AppError::RecognitionFailed(_)));
        assert_eq!(result.vins.len(), 1);
        assert_eq!(result.vins[0].page_number, 2);
    }

    #[test]
    fn test_panicking_recognizer_only_skips_that_page() {
        let pipeline = pipeline_with(ScriptedRecognizer::new(vec![
            Script::Text("5YJSA1H28FF080000".to_string()),
            Script::Panic("leptonica assertion"),
        ]));

        let result = pipeline
            .process_document(&[scanned_page(40, 40), scanned_page(40, 40)])
            .unwrap();

        assert_eq!(result.pages.len(), 1);
        assert_eq!(result.vins[0].vin, "5YJSA1H28FF080000");
        assert_eq!(result.skipped_pages[0].page_number, 2);
        assert!(result.skipped_pages[0].error.to_string().contains("leptonica assertion"));
    }

    #[test]
    fn test_document_where_every_page_fails_still_succeeds() {
        let pipeline = pipeline_with(ScriptedRecognizer::constant(""));

        let result = pipeline
            .process_document(&[two_channel_page(8, 8), two_channel_page(8, 8)])
            .unwrap();

        assert!(result.pages.is_empty());
        assert_eq!(result.skipped_pages.len(), 2);
        assert!(result.to_response().success);
    }

    #[test]
    fn test_empty_document_is_conversion_failure() {
        let pipeline = pipeline_with(ScriptedRecognizer::constant(""));
        let err = pipeline.process_document(&[]).unwrap_err();
        assert!(matches!(err, AppError::ConversionFailed(_)));
        assert_eq!(err.code(), "CONVERSION_FAILED");
    }

    #[test]
    fn test_processing_is_deterministic() {
        let pipeline = pipeline_with(ScriptedRecognizer::constant("5YJ3E1EA2KF317000"));
        let pages = vec![noisy_gray_page(40, 30, 11), scanned_page(40, 30)];

        let first = pipeline.process_document(&pages).unwrap();
        let second = pipeline.process_document(&pages).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.to_response(), second.to_response());
    }

    #[test]
    fn test_preview_of_large_page_fits_bounding_box() {
        let image = NormalizedImage::new(image::GrayImage::from_pixel(4000, 3000, image::Luma([255])));

        let preview = PreviewEncoder::default().encode(&image).unwrap();

        let decoded = decode_preview(&preview);
        assert_eq!((decoded.width(), decoded.height()), (300, 225));
    }

    #[test]
    fn test_pipeline_preview_matches_page_geometry() {
        let pipeline = pipeline_with(ScriptedRecognizer::constant(""));

        let result = pipeline.normalize_and_extract(&scanned_page(60, 40), 1).unwrap();

        let decoded = decode_preview(&result.preview);
        assert_eq!((decoded.width(), decoded.height()), (60, 40));
        assert!(decoded.to_luma8().pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn test_custom_preview_box() {
        let mut config = fast_config();
        config.preview.max_dimension = 20;
        let pipeline = PagePipeline::with_recognizer(&config, Box::new(ScriptedRecognizer::constant(""))).unwrap();

        let result = pipeline.normalize_and_extract(&scanned_page(80, 40), 1).unwrap();

        let decoded = decode_preview(&result.preview);
        assert_eq!((decoded.width(), decoded.height()), (20, 10));
    }
}
