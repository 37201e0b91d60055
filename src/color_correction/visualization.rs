//! Debug overlays for inspecting detections and corrections.
//!
//! Purely observational: nothing here feeds back into the correction.

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, imageops};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use tracing::debug;

use crate::color_correction::common::error::{CorrectionError, Result};
use crate::color_correction::detection::BoundingBox;
use crate::color_correction::imaging::DetectionFrame;
use crate::color_correction::pipeline::{CorrectedImage, ReferenceBoxes};

const SAMPLE_REGION_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Files written for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayPaths {
    pub boxes: PathBuf,
    pub comparison: PathBuf,
}

fn draw_box(canvas: &mut RgbImage, bbox: &BoundingBox, color: Rgb<u8>) {
    let (x_min, y_min, x_max, y_max) = bbox.to_pixel_rect(canvas.width(), canvas.height());
    if x_max <= x_min || y_max <= y_min {
        return;
    }
    let rect = Rect::at(x_min as i32, y_min as i32).of_size(x_max - x_min, y_max - y_min);
    draw_hollow_rect_mut(canvas, rect, color);
}

/// The detection copy with each reference box outlined in its own color and
/// the shrunk sampling rectangle outlined in white.
pub fn draw_reference_boxes(frame: &DetectionFrame, boxes: &ReferenceBoxes, shrink_factor: f32) -> RgbImage {
    let mut canvas = DynamicImage::ImageRgb32F(frame.image.clone()).to_rgb8();

    let marks = [
        (boxes.red, Rgb([255, 0, 0])),
        (boxes.green, Rgb([0, 255, 0])),
        (boxes.blue, Rgb([0, 0, 255])),
    ];
    for (bbox, color) in marks {
        draw_box(&mut canvas, &bbox, color);
        draw_box(&mut canvas, &bbox.shrunk(shrink_factor), SAMPLE_REGION_COLOR);
    }
    canvas
}

/// Original on the left, corrected on the right.
pub fn side_by_side(original: &DynamicImage, corrected: &DynamicImage) -> RgbImage {
    let left = original.to_rgb8();
    let right = corrected.to_rgb8();
    let mut canvas = RgbImage::new(
        left.width() + right.width(),
        left.height().max(right.height()),
    );
    imageops::replace(&mut canvas, &left, 0, 0);
    imageops::replace(&mut canvas, &right, i64::from(left.width()), 0);
    canvas
}

fn save_png(image: &RgbImage, path: &Path) -> Result<()> {
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|e| CorrectionError::OutputWriteError(format!("{}: {}", path.display(), e)))
}

/// `<stem>_<ext>`, so `a.jpg` and `a.png` of one folder stay apart.
fn overlay_base(source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    match source.extension() {
        Some(ext) => format!("{}_{}", stem, ext.to_string_lossy()),
        None => stem,
    }
}

/// Writes `<stem>_<ext>_boxes.png` and `<stem>_<ext>_comparison.png` into `overlay_dir`.
pub fn write_overlays(result: &CorrectedImage, overlay_dir: &Path, shrink_factor: f32) -> Result<OverlayPaths> {
    let base = overlay_base(&result.frame.source);

    let paths = OverlayPaths {
        boxes: overlay_dir.join(format!("{base}_boxes.png")),
        comparison: overlay_dir.join(format!("{base}_comparison.png")),
    };

    save_png(&draw_reference_boxes(&result.frame, &result.boxes, shrink_factor), &paths.boxes)?;
    save_png(&side_by_side(&result.original, &result.corrected), &paths.comparison)?;

    debug!(boxes = %paths.boxes.display(), comparison = %paths.comparison.display(), "Wrote overlays");
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color_correction::pipeline::ColorCorrectionPipeline;
    use crate::color_correction::pipeline::tests::{StubDetector, native_config, standard_card, write_card};
    use image::{GenericImageView, Rgb32FImage};
    use tempfile::tempdir;

    fn boxes() -> ReferenceBoxes {
        ReferenceBoxes {
            red: BoundingBox::new(0.25, 0.75, 0.125, 0.125),
            green: BoundingBox::new(0.5, 0.5, 0.125, 0.125),
            blue: BoundingBox::new(0.75, 0.25, 0.125, 0.125),
        }
    }

    #[test]
    fn test_boxes_and_sample_regions_are_outlined() {
        let frame = DetectionFrame {
            source: PathBuf::from("card.png"),
            image: Rgb32FImage::new(64, 64),
        };
        let canvas = draw_reference_boxes(&frame, &boxes(), 2.0);

        // Green box spans [28, 36), its sampling rect [30, 34).
        assert_eq!(canvas.get_pixel(28, 28), &Rgb([0, 255, 0]));
        assert_eq!(canvas.get_pixel(35, 35), &Rgb([0, 255, 0]));
        assert_eq!(canvas.get_pixel(30, 30), &SAMPLE_REGION_COLOR);
        assert_eq!(canvas.get_pixel(32, 32), &Rgb([0, 0, 0]));
        assert_eq!(canvas.get_pixel(12, 44), &Rgb([255, 0, 0]));
        assert_eq!(canvas.get_pixel(44, 12), &Rgb([0, 0, 255]));
    }

    #[test]
    fn test_degenerate_box_is_not_drawn() {
        let frame = DetectionFrame {
            source: PathBuf::from("card.png"),
            image: Rgb32FImage::new(16, 16),
        };
        let mut flat = boxes();
        flat.green = BoundingBox::new(0.5, 0.5, 0.0, 0.0);
        let canvas = draw_reference_boxes(&frame, &flat, 2.0);
        assert_eq!(canvas.get_pixel(8, 8), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_side_by_side_layout() {
        let left = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 3, Rgb([10, 10, 10])));
        let right = DynamicImage::ImageRgb8(RgbImage::from_pixel(5, 6, Rgb([200, 200, 200])));
        let canvas = side_by_side(&left, &right);

        assert_eq!(canvas.dimensions(), (9, 6));
        assert_eq!(canvas.get_pixel(3, 2), &Rgb([10, 10, 10]));
        assert_eq!(canvas.get_pixel(3, 5), &Rgb([0, 0, 0]));
        assert_eq!(canvas.get_pixel(4, 5), &Rgb([200, 200, 200]));
    }

    #[test]
    fn test_write_overlays_names_files_after_source() {
        let dir = tempdir().unwrap();
        let path = write_card(&dir, "patient_07.png", &standard_card());
        let pipeline = ColorCorrectionPipeline::new(StubDetector::card(), native_config()).unwrap();
        let result = pipeline.correct_image(&path, None).unwrap();

        let overlay_dir = dir.path().join("overlays");
        std::fs::create_dir(&overlay_dir).unwrap();
        let paths = write_overlays(&result, &overlay_dir, 2.0).unwrap();

        assert_eq!(paths.boxes, overlay_dir.join("patient_07_png_boxes.png"));
        assert_eq!(paths.comparison, overlay_dir.join("patient_07_png_comparison.png"));
        assert_eq!(image::open(&paths.boxes).unwrap().dimensions(), (200, 200));
        assert_eq!(image::open(&paths.comparison).unwrap().dimensions(), (400, 200));
    }

    #[test]
    fn test_same_stem_with_different_extensions_do_not_collide() {
        let dir = tempdir().unwrap();
        let png = write_card(&dir, "a.png", &standard_card());
        let bmp = write_card(&dir, "a.bmp", &standard_card());
        let pipeline = ColorCorrectionPipeline::new(StubDetector::card(), native_config()).unwrap();

        let overlay_dir = dir.path().join("overlays");
        std::fs::create_dir(&overlay_dir).unwrap();
        let from_png = write_overlays(&pipeline.correct_image(&png, None).unwrap(), &overlay_dir, 2.0).unwrap();
        let from_bmp = write_overlays(&pipeline.correct_image(&bmp, None).unwrap(), &overlay_dir, 2.0).unwrap();

        assert_ne!(from_png.boxes, from_bmp.boxes);
        assert_ne!(from_png.comparison, from_bmp.comparison);
        assert!(from_png.boxes.is_file() && from_bmp.boxes.is_file());
    }

    #[test]
    fn test_write_overlays_into_missing_dir_fails() {
        let dir = tempdir().unwrap();
        let path = write_card(&dir, "card.png", &standard_card());
        let pipeline = ColorCorrectionPipeline::new(StubDetector::card(), native_config()).unwrap();
        let result = pipeline.correct_image(&path, None).unwrap();

        let missing = dir.path().join("nope");
        assert!(matches!(
            write_overlays(&result, &missing, 2.0),
            Err(CorrectionError::OutputWriteError(_))
        ));
    }
}
