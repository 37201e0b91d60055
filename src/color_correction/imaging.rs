//! Image loading, detection-copy preparation and corrected-image writing.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, Rgb32FImage};
use tracing::{debug, instrument};

use crate::color_correction::common::error::{CorrectionError, Result};
use crate::color_correction::config::DetectionRotation;

/// Loads a full-resolution image, keeping its native bit depth.
#[instrument]
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    if !path.is_file() {
        return Err(CorrectionError::ImageNotFound(path.to_path_buf()));
    }
    let image = image::open(path)
        .map_err(|e| CorrectionError::DecodeFailure(format!("{}: {}", path.display(), e)))?;
    debug!(
        width = image.width(),
        height = image.height(),
        color = ?image.color(),
        "Loaded image"
    );
    Ok(image)
}

/// The copy of an image that detection and color sampling run on.
///
/// Rotated into the detector's orientation, optionally resized to a square
/// and normalized to [0, 1]. Its dimensions are unrelated to the
/// full-resolution image; boxes are mapped to pixels with these.
#[derive(Debug, Clone)]
pub struct DetectionFrame {
    /// Path of the image the frame was prepared from
    pub source: PathBuf,
    pub image: Rgb32FImage,
}

impl DetectionFrame {
    pub fn prepare(
        source: &Path,
        image: &DynamicImage,
        rotation: DetectionRotation,
        size: Option<u32>,
    ) -> Result<Self> {
        let rotated = match rotation {
            DetectionRotation::None => image.to_rgb32f(),
            DetectionRotation::Clockwise90 => image.rotate90().to_rgb32f(),
            DetectionRotation::Rotate180 => image.rotate180().to_rgb32f(),
            DetectionRotation::CounterClockwise90 => image.rotate270().to_rgb32f(),
        };

        let image = match size {
            Some(0) => return Err(CorrectionError::invalid_parameter("detection_size", 0)),
            Some(side) => image::imageops::resize(&rotated, side, side, FilterType::Triangle),
            None => rotated,
        };

        debug!(
            width = image.width(),
            height = image.height(),
            ?rotation,
            "Prepared detection frame"
        );
        Ok(Self {
            source: source.to_path_buf(),
            image,
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Encodes a corrected image to its destination.
pub trait CorrectedImageWriter: Send + Sync {
    fn write_image(&self, image: &DynamicImage, output_path: &Path) -> Result<()>;
}

/// Writes images with the `image` crate, choosing the format from the
/// output extension so the source format is preserved.
pub struct StandardImageWriter {
    jpeg_quality: u8,
}

impl StandardImageWriter {
    pub fn new(jpeg_quality: u8) -> Self {
        Self { jpeg_quality }
    }
}

impl Default for StandardImageWriter {
    fn default() -> Self {
        Self::new(95)
    }
}

impl CorrectedImageWriter for StandardImageWriter {
    fn write_image(&self, image: &DynamicImage, output_path: &Path) -> Result<()> {
        let format = ImageFormat::from_path(output_path)
            .map_err(|e| CorrectionError::EncodeFailure(format!("{}: {}", output_path.display(), e)))?;
        debug!("Encoding {:?} image: {}", format, output_path.display());

        // Names may carry a subpath below the output location.
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                CorrectionError::OutputWriteError(format!("{}: {}", parent.display(), e))
            })?;
        }

        match format {
            ImageFormat::Jpeg => {
                let file = File::create(output_path).map_err(|e| {
                    CorrectionError::OutputWriteError(format!("{}: {}", output_path.display(), e))
                })?;
                let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), self.jpeg_quality);
                // JPEG carries neither alpha nor 16-bit samples.
                DynamicImage::ImageRgb8(image.to_rgb8())
                    .write_with_encoder(encoder)
                    .map_err(|e| CorrectionError::EncodeFailure(format!("{}: {}", output_path.display(), e)))
            }
            _ => image.save_with_format(output_path, format).map_err(|e| match e {
                image::ImageError::IoError(io) => {
                    CorrectionError::OutputWriteError(format!("{}: {}", output_path.display(), io))
                }
                other => CorrectionError::EncodeFailure(format!("{}: {}", output_path.display(), other)),
            }),
        }
    }
}
