use image::{DynamicImage, GenericImageView};
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::color_correction::transform::types::ColorTransformMatrix;

/// Pixels handed to one rayon task.
const CHUNK_PIXELS: usize = 16_384;

/// Applies `transform` to every pixel of `image`, returning a new image of
/// the same size and bit depth.
///
/// Channels are normalized to [0, 1], multiplied by the matrix, clipped to
/// [0, 1] and rescaled to the native sample range with rounding. 16-bit and
/// float images keep their depth, everything else is corrected as 8-bit.
/// Alpha is passed through untouched.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn apply_transform(image: &DynamicImage, transform: &ColorTransformMatrix) -> DynamicImage {
    let rows = transform.to_f32_rows();
    let has_alpha = image.color().has_alpha();

    let corrected = match image {
        DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA16(_)
        | DynamicImage::ImageRgb16(_)
        | DynamicImage::ImageRgba16(_) => {
            let max = u16::MAX as f32;
            let to_u16: fn(f32) -> u16 = |v| v as u16;
            if has_alpha {
                let mut buffer = image.to_rgba16();
                transform_samples(&mut buffer, 4, max, &rows, to_u16);
                DynamicImage::ImageRgba16(buffer)
            } else {
                let mut buffer = image.to_rgb16();
                transform_samples(&mut buffer, 3, max, &rows, to_u16);
                DynamicImage::ImageRgb16(buffer)
            }
        }
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
            let identity: fn(f32) -> f32 = |v| v;
            if has_alpha {
                let mut buffer = image.to_rgba32f();
                transform_samples(&mut buffer, 4, 1.0, &rows, identity);
                DynamicImage::ImageRgba32F(buffer)
            } else {
                let mut buffer = image.to_rgb32f();
                transform_samples(&mut buffer, 3, 1.0, &rows, identity);
                DynamicImage::ImageRgb32F(buffer)
            }
        }
        _ => {
            let max = u8::MAX as f32;
            let to_u8: fn(f32) -> u8 = |v| v as u8;
            if has_alpha {
                let mut buffer = image.to_rgba8();
                transform_samples(&mut buffer, 4, max, &rows, to_u8);
                DynamicImage::ImageRgba8(buffer)
            } else {
                let mut buffer = image.to_rgb8();
                transform_samples(&mut buffer, 3, max, &rows, to_u8);
                DynamicImage::ImageRgb8(buffer)
            }
        }
    };

    debug!(color = ?corrected.color(), "Applied color transform");
    corrected
}

fn transform_samples<T>(
    samples: &mut [T],
    channels: usize,
    max: f32,
    rows: &[[f32; 3]; 3],
    from_f32: fn(f32) -> T,
) where
    T: Copy + Send + Into<f32>,
{
    samples
        .par_chunks_mut(channels * CHUNK_PIXELS)
        .for_each(|chunk| {
            for pixel in chunk.chunks_exact_mut(channels) {
                let rgb = [
                    pixel[0].into() / max,
                    pixel[1].into() / max,
                    pixel[2].into() / max,
                ];
                for (out, row) in pixel.iter_mut().zip(rows.iter()) {
                    let value = row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2];
                    let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
                    *out = from_f32((value * max).round());
                }
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn gradient() -> RgbImage {
        RgbImage::from_fn(64, 48, |x, y| {
            Rgb([(x * 4) as u8, (y * 5) as u8, ((x + y) * 2) as u8])
        })
    }

    #[test]
    fn test_identity_preserves_pixels() {
        let image = DynamicImage::ImageRgb8(gradient());
        let corrected = apply_transform(&image, &ColorTransformMatrix::identity());
        assert_eq!(corrected.to_rgb8(), gradient());
    }

    #[test]
    fn test_output_has_same_dimensions_and_input_is_untouched() {
        let image = DynamicImage::ImageRgb8(gradient());
        let transform = ColorTransformMatrix::from_rows([
            [0.5, 0.0, 0.0],
            [0.0, 0.5, 0.0],
            [0.0, 0.0, 0.5],
        ])
        .unwrap();
        let corrected = apply_transform(&image, &transform);

        assert_eq!((corrected.width(), corrected.height()), (64, 48));
        assert_eq!(image.to_rgb8(), gradient());
        // 252 * 0.5 = 126
        assert_eq!(corrected.to_rgb8().get_pixel(63, 0)[0], 126);
    }

    #[test]
    fn test_extreme_transform_is_clipped() {
        let image = DynamicImage::ImageRgb8(gradient());
        let transform = ColorTransformMatrix::from_rows([
            [50.0, -3.0, 7.0],
            [-40.0, -2.0, -9.0],
            [1e6, 1e6, 1e6],
        ])
        .unwrap();
        let corrected = apply_transform(&image, &transform).to_rgb8();

        for pixel in corrected.pixels() {
            // Green row is never positive for non-negative input.
            assert_eq!(pixel[1], 0);
        }
        // Any non-black input pixel saturates blue.
        assert_eq!(corrected.get_pixel(10, 10)[2], 255);
        assert_eq!(corrected.get_pixel(0, 0)[2], 0);
    }

    #[test]
    fn test_swaps_channels() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 3, Rgb([200, 100, 50])));
        let transform = ColorTransformMatrix::from_rows([
            [0.0, 0.0, 1.0],
            [0.0, 1.0, 0.0],
            [1.0, 0.0, 0.0],
        ])
        .unwrap();
        let corrected = apply_transform(&image, &transform).to_rgb8();
        assert_eq!(corrected.get_pixel(1, 1), &Rgb([50, 100, 200]));
    }

    #[test]
    fn test_alpha_passes_through() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 77])));
        let transform = ColorTransformMatrix::from_rows([
            [2.0, 0.0, 0.0],
            [0.0, 2.0, 0.0],
            [0.0, 0.0, 2.0],
        ])
        .unwrap();
        let corrected = apply_transform(&image, &transform);
        assert!(matches!(corrected, DynamicImage::ImageRgba8(_)));
        assert_eq!(corrected.to_rgba8().get_pixel(0, 0), &Rgba([20, 40, 60, 77]));
    }

    #[test]
    fn test_sixteen_bit_depth_is_kept() {
        let buffer = image::ImageBuffer::from_pixel(2, 2, Rgb([40_000u16, 1_000, 65_535]));
        let image = DynamicImage::ImageRgb16(buffer);
        let corrected = apply_transform(&image, &ColorTransformMatrix::identity());
        assert!(matches!(corrected, DynamicImage::ImageRgb16(_)));
        assert_eq!(corrected.to_rgb16().get_pixel(1, 1), &Rgb([40_000, 1_000, 65_535]));
    }
}
