use std::path::Path;

use image::{DynamicImage, GenericImageView};
use tracing::{info, instrument, warn};

use crate::color_correction::{
    common::error::{CorrectionError, Result},
    config::CorrectionConfig,
    detection::{BoundingBox, BoxDetector, DetectionResult, DetectorAdapter, select_best},
    geometry::{ReflectionEstimator, ThirdCircleEstimator},
    imaging::{CorrectedImageWriter, DetectionFrame, StandardImageWriter, load_image},
    sampling::{ReferenceColorSet, sample_color},
    transform::{ColorTransformMatrix, apply_transform, solve_transform},
};


/// Boxes of the three reference marks in detection-frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceBoxes {
    pub red: BoundingBox,
    pub green: BoundingBox,
    pub blue: BoundingBox,
}

/// Everything produced while correcting one image.
#[derive(Debug, Clone)]
pub struct CorrectedImage {
    pub frame: DetectionFrame,
    pub boxes: ReferenceBoxes,
    pub colors: ReferenceColorSet,
    pub transform: ColorTransformMatrix,
    pub original: DynamicImage,
    pub corrected: DynamicImage,
}

/// Per-image color correction: detect, select, estimate, sample, solve, apply.
pub struct ColorCorrectionPipeline<
    D: BoxDetector,
    W: CorrectedImageWriter = StandardImageWriter,
    E: ThirdCircleEstimator = ReflectionEstimator,
> {
    detector: DetectorAdapter<D>,
    writer: W,
    estimator: E,
    config: CorrectionConfig,
}

impl<D: BoxDetector> ColorCorrectionPipeline<D, StandardImageWriter, ReflectionEstimator> {
    pub fn new(detector: D, config: CorrectionConfig) -> Result<Self> {
        let writer = StandardImageWriter::new(config.jpeg_quality);
        Self::with_custom(detector, writer, ReflectionEstimator, config)
    }
}

impl<D: BoxDetector, W: CorrectedImageWriter, E: ThirdCircleEstimator> ColorCorrectionPipeline<D, W, E> {
    pub fn with_custom(detector: D, writer: W, estimator: E, config: CorrectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            detector: DetectorAdapter::new(detector),
            writer,
            estimator,
            config,
        })
    }

    fn validate_dimensions(&self, width: u32, height: u32) -> Result<()> {
        if !self.config.validate_dimensions {
            return Ok(());
        }

        if width == 0 || height == 0 {
            return Err(CorrectionError::DecodeFailure(format!(
                "invalid image dimensions: width={}, height={}",
                width, height
            )));
        }

        Ok(())
    }

    /// Selects the best box for `primary`, re-running detection with each
    /// fallback query while the label stays missing.
    fn locate_mark(
        &self,
        frame: &DetectionFrame,
        detections: &DetectionResult,
        primary: &str,
        fallbacks: &[String],
    ) -> Result<BoundingBox> {
        match select_best(primary, detections) {
            Err(e) if e.is_retryable() => {}
            found => return found,
        }

        for fallback in fallbacks {
            warn!(query = primary, fallback = %fallback, "No detection, retrying with fallback query");
            let retry = self.detector.detect(frame, std::slice::from_ref(fallback))?;
            match select_best(fallback, &retry) {
                Err(e) if e.is_retryable() => continue,
                found => return found,
            }
        }

        Err(CorrectionError::LabelNotFound(primary.to_string()))
    }

    /// Detects green and blue, then infers red from them.
    #[instrument(skip(self, frame), fields(source = %frame.source.display()))]
    pub fn locate_references(&self, frame: &DetectionFrame) -> Result<ReferenceBoxes> {
        let queries = &self.config.queries;

        let detections = {
            let _span = tracing::info_span!("detect").entered();
            self.detector.detect(frame, &queries.primary())?
        };

        let (green, blue) = {
            let _span = tracing::info_span!("select_boxes").entered();
            let green = self.locate_mark(frame, &detections, &queries.green, &queries.green_fallbacks)?;
            let blue = self.locate_mark(frame, &detections, &queries.blue, &queries.blue_fallbacks)?;
            (green, blue)
        };

        let red = {
            let _span = tracing::info_span!("estimate_red").entered();
            self.estimator.estimate(&blue, &green)?
        };

        Ok(ReferenceBoxes { red, green, blue })
    }

    /// Mean colors of the three reference marks, sampled on the frame.
    pub fn sample_references(&self, frame: &DetectionFrame, boxes: &ReferenceBoxes) -> Result<ReferenceColorSet> {
        let _span = tracing::info_span!("sample_colors").entered();
        let shrink = self.config.shrink_factor;
        ReferenceColorSet::new(
            sample_color(&boxes.red, &frame.image, shrink)?,
            sample_color(&boxes.green, &frame.image, shrink)?,
            sample_color(&boxes.blue, &frame.image, shrink)?,
        )
    }

    fn prepare_frame(&self, path: &Path, image: &DynamicImage) -> Result<DetectionFrame> {
        let _span = tracing::info_span!("prepare_frame").entered();
        self.validate_dimensions(image.width(), image.height())?;
        DetectionFrame::prepare(path, image, self.config.rotation, self.config.detection_size)
    }

    /// Reference colors of the card in the image at `path`.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn extract_reference_colors<P: AsRef<Path>>(&self, path: P) -> Result<ReferenceColorSet> {
        let path = path.as_ref();
        let image = load_image(path)?;
        let frame = self.prepare_frame(path, &image)?;
        let boxes = self.locate_references(&frame)?;
        self.sample_references(&frame, &boxes)
    }

    /// Corrects one image in memory. With `target`, the observed reference
    /// colors are mapped onto it; without, onto the unit basis.
    #[instrument(skip(self, path, target), fields(path = %path.as_ref().display()))]
    pub fn correct_image<P: AsRef<Path>>(
        &self,
        path: P,
        target: Option<&ReferenceColorSet>,
    ) -> Result<CorrectedImage> {
        let path = path.as_ref();
        let original = load_image(path)?;
        let frame = self.prepare_frame(path, &original)?;
        let boxes = self.locate_references(&frame)?;
        let colors = self.sample_references(&frame, &boxes)?;

        let transform = {
            let _span = tracing::info_span!("solve_transform").entered();
            solve_transform(&colors, target)?
        };

        let corrected = {
            let _span = tracing::info_span!("apply_transform").entered();
            apply_transform(&original, &transform)
        };

        Ok(CorrectedImage {
            frame,
            boxes,
            colors,
            transform,
            original,
            corrected,
        })
    }

    /// Corrects `input_path` and writes the result to `output_path`.
    #[instrument(skip(self, input_path, output_path, target))]
    pub fn correct_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: Q,
        target: Option<&ReferenceColorSet>,
    ) -> Result<CorrectedImage> {
        let input_path = input_path.as_ref();
        let output_path = output_path.as_ref();

        info!(
            input = %input_path.display(),
            output = %output_path.display(),
            "Correcting file"
        );

        let result = self.correct_image(input_path, target)?;

        {
            let _span = tracing::info_span!("write_output").entered();
            self.writer.write_image(&result.corrected, output_path)?;
        }

        info!(
            width = result.corrected.width(),
            height = result.corrected.height(),
            "Correction complete"
        );
        Ok(result)
    }

    pub fn config(&self) -> &CorrectionConfig {
        &self.config
    }
}
