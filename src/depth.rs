//! Depth buffer readback helpers.
//!
//! The camera uses Bevy's infinite reverse-Z projection: the near plane maps
//! to NDC depth 1 and infinity to 0, so view-space depth is `near / ndc`.

use crate::error::RenderError;

/// wgpu requires buffer row alignment of 256 bytes
pub const COPY_BYTES_PER_ROW_ALIGNMENT: u32 = 256;

/// Depth written for pixels where nothing was rasterized.
pub const BACKGROUND_DEPTH: f32 = 1.0e10;

/// Align byte size to wgpu's COPY_BYTES_PER_ROW_ALIGNMENT
pub fn align_byte_size(value: u32) -> u32 {
    let remainder = value % COPY_BYTES_PER_ROW_ALIGNMENT;
    if remainder == 0 {
        value
    } else {
        value + (COPY_BYTES_PER_ROW_ALIGNMENT - remainder)
    }
}

/// Size of a readback buffer holding a `width` x `height` f32 image.
pub fn aligned_buffer_size(width: u32, height: u32) -> u64 {
    height as u64 * align_byte_size(width * 4) as u64
}

/// Convert infinite reverse-Z NDC depth to view-space depth.
///
/// `ndc <= 0` is the cleared background and yields [`BACKGROUND_DEPTH`];
/// `ndc >= 1` is at or in front of the near plane.
pub fn reverse_z_to_view_depth(ndc: f32, near: f32) -> f32 {
    if ndc <= 0.0 {
        return BACKGROUND_DEPTH;
    }
    if ndc >= 1.0 {
        return near;
    }
    near / ndc
}

/// Extract depth values from a row-padded readback buffer.
pub fn extract_depth_with_alignment(
    data: &[u8],
    width: u32,
    height: u32,
) -> Result<Vec<f32>, RenderError> {
    let aligned_row_bytes = align_byte_size(width * 4) as usize;
    let actual_row_bytes = (width * 4) as usize;

    let needed = aligned_row_bytes * height.saturating_sub(1) as usize + actual_row_bytes;
    if height > 0 && data.len() < needed {
        return Err(RenderError::RenderFailed(format!(
            "depth buffer too small: {} bytes for {}x{}",
            data.len(),
            width,
            height
        )));
    }

    let mut depth_values = Vec::with_capacity((width * height) as usize);
    for y in 0..height as usize {
        let row_start = y * aligned_row_bytes;
        let row = &data[row_start..row_start + actual_row_bytes];
        depth_values.extend(
            row.chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
        );
    }

    Ok(depth_values)
}

/// Convert all NDC depth values to view-space depth.
pub fn convert_depth(raw: &[f32], near: f32) -> Vec<f32> {
    raw.iter()
        .map(|&ndc| reverse_z_to_view_depth(ndc, near))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_byte_size() {
        assert_eq!(align_byte_size(256), 256);
        assert_eq!(align_byte_size(257), 512);
        assert_eq!(align_byte_size(1), 256);
        assert_eq!(align_byte_size(0), 0);
        assert_eq!(aligned_buffer_size(256, 256), 256 * 1024);
        assert_eq!(aligned_buffer_size(10, 3), 3 * 256);
    }

    #[test]
    fn test_reverse_z_to_view_depth() {
        let near = 0.1;
        assert_eq!(reverse_z_to_view_depth(1.0, near), near);
        assert!((reverse_z_to_view_depth(0.1, near) - 1.0).abs() < 1e-6);
        assert!((reverse_z_to_view_depth(0.05, near) - 2.0).abs() < 1e-6);
        assert_eq!(reverse_z_to_view_depth(0.0, near), BACKGROUND_DEPTH);
        assert_eq!(reverse_z_to_view_depth(-0.5, near), BACKGROUND_DEPTH);
    }

    #[test]
    fn test_depth_matches_projection() {
        use bevy::math::{Mat4, Vec4};

        let near = 0.1;
        let proj = Mat4::perspective_infinite_reverse_rh(0.8, 1.0, near);
        for z in [0.5_f32, 1.2, 1.5, 7.0] {
            let clip = proj * Vec4::new(0.0, 0.0, -z, 1.0);
            let ndc = clip.z / clip.w;
            assert!((reverse_z_to_view_depth(ndc, near) - z).abs() < 1e-4);
        }
    }

    #[test]
    fn test_extract_depth_with_alignment() {
        let mut data = vec![0u8; 256 * 2];
        data[0..4].copy_from_slice(&0.5f32.to_le_bytes());
        data[4..8].copy_from_slice(&0.6f32.to_le_bytes());
        data[256..260].copy_from_slice(&0.7f32.to_le_bytes());
        data[260..264].copy_from_slice(&0.8f32.to_le_bytes());

        let depth = extract_depth_with_alignment(&data, 2, 2).unwrap();
        assert_eq!(depth, vec![0.5, 0.6, 0.7, 0.8]);
    }

    #[test]
    fn test_extract_depth_short_buffer() {
        let data = vec![0u8; 300];
        assert!(extract_depth_with_alignment(&data, 2, 2).is_err());
    }

    #[test]
    fn test_convert_depth() {
        let depth = convert_depth(&[0.0, 0.1, 1.0], 0.1);
        assert_eq!(depth[0], BACKGROUND_DEPTH);
        assert!((depth[1] - 1.0).abs() < 1e-6);
        assert_eq!(depth[2], 0.1);
    }
}
