//! Color and depth image files.

use crate::config::ColorDepth;
use crate::error::RenderError;
use bevy::color::{LinearRgba, Srgba};
use image::{ImageBuffer, ImageFormat, Rgb, Rgba};
use std::path::Path;

/// Color read back from the render target.
#[derive(Clone, Debug, PartialEq)]
pub enum ColorPixels {
    /// sRGB-encoded RGBA8, from an 8-bit sRGB target
    Srgb8(Vec<u8>),
    /// Linear RGBA floats, from a float target
    Linear(Vec<f32>),
}

impl ColorPixels {
    fn len(&self) -> usize {
        match self {
            ColorPixels::Srgb8(v) => v.len(),
            ColorPixels::Linear(v) => v.len(),
        }
    }

    /// sRGB-encoded channels in `[0, 1]`, alpha left linear.
    fn encoded_f32(values: &[f32]) -> impl Iterator<Item = f32> + '_ {
        values.chunks_exact(4).flat_map(|px| {
            let srgb = Srgba::from(LinearRgba::new(px[0], px[1], px[2], px[3]));
            [srgb.red, srgb.green, srgb.blue, srgb.alpha].map(|c| c.clamp(0.0, 1.0))
        })
    }

    fn to_u8(&self) -> Vec<u8> {
        match self {
            ColorPixels::Srgb8(v) => v.clone(),
            ColorPixels::Linear(v) => Self::encoded_f32(v)
                .map(|c| (c * 255.0).round() as u8)
                .collect(),
        }
    }

    /// 8-bit input is widened as `v * 257`, so 255 maps to 65535.
    fn to_u16(&self) -> Vec<u16> {
        match self {
            ColorPixels::Srgb8(v) => v.iter().map(|&c| c as u16 * 257).collect(),
            ColorPixels::Linear(v) => Self::encoded_f32(v)
                .map(|c| (c * 65535.0).round() as u16)
                .collect(),
        }
    }
}

/// Write captured color as an sRGB PNG at the requested bit depth.
pub fn write_color_png(
    path: &Path,
    pixels: &ColorPixels,
    width: u32,
    height: u32,
    depth: ColorDepth,
) -> Result<(), RenderError> {
    check_len(pixels.len(), width, height, 4, "color")?;

    match depth {
        ColorDepth::Eight => {
            let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
                ImageBuffer::from_raw(width, height, pixels.to_u8()).ok_or_else(|| {
                    RenderError::RenderFailed("color buffer size mismatch".to_string())
                })?;
            img.save_with_format(path, ImageFormat::Png)?;
        }
        ColorDepth::Sixteen => {
            let img: ImageBuffer<Rgba<u16>, Vec<u16>> =
                ImageBuffer::from_raw(width, height, pixels.to_u16()).ok_or_else(|| {
                    RenderError::RenderFailed("color buffer size mismatch".to_string())
                })?;
            img.save_with_format(path, ImageFormat::Png)?;
        }
    }
    Ok(())
}

/// Write depth as a 32-bit float OpenEXR image, the value replicated in R, G
/// and B.
pub fn write_depth_exr(
    path: &Path,
    depth: &[f32],
    width: u32,
    height: u32,
) -> Result<(), RenderError> {
    check_len(depth.len(), width, height, 1, "depth")?;

    let rgb: Vec<f32> = depth.iter().flat_map(|&d| [d, d, d]).collect();
    let img: ImageBuffer<Rgb<f32>, Vec<f32>> = ImageBuffer::from_raw(width, height, rgb)
        .ok_or_else(|| RenderError::RenderFailed("depth buffer size mismatch".to_string()))?;
    img.save_with_format(path, ImageFormat::OpenExr)?;
    Ok(())
}

fn check_len(
    len: usize,
    width: u32,
    height: u32,
    channels: usize,
    what: &str,
) -> Result<(), RenderError> {
    let expected = width as usize * height as usize * channels;
    if len != expected {
        return Err(RenderError::RenderFailed(format!(
            "{} buffer has {} values, expected {} for {}x{}",
            what, len, expected, width, height
        )));
    }
    Ok(())
}
