use anyhow::{anyhow, Result};

/// Expand packed RGB24 into the RGBA8 wire layout, alpha fully opaque.
/// Validates the input length against the dimensions.
pub(crate) fn rgb24_to_rgba(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let pixel_count = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| anyhow!("RGB frame dimensions overflow"))?;
    let expected = pixel_count
        .checked_mul(3)
        .ok_or_else(|| anyhow!("RGB frame dimensions overflow"))?;
    if pixels.len() != expected {
        return Err(anyhow!(
            "RGB frame length mismatch: expected {}, got {}",
            expected,
            pixels.len()
        ));
    }

    let mut rgba = vec![0u8; pixel_count * 4];
    for (src, dst) in pixels.chunks_exact(3).zip(rgba.chunks_exact_mut(4)) {
        dst[0] = src[0];
        dst[1] = src[1];
        dst[2] = src[2];
        dst[3] = 0xFF;
    }
    Ok(rgba)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb24_expands_with_opaque_alpha() -> Result<()> {
        let rgb = vec![1, 2, 3, 4, 5, 6];
        let rgba = rgb24_to_rgba(&rgb, 2, 1)?;
        assert_eq!(rgba, vec![1, 2, 3, 255, 4, 5, 6, 255]);
        Ok(())
    }

    #[test]
    fn rgb24_validates_length() {
        assert!(rgb24_to_rgba(&[0u8; 7], 2, 1).is_err());
    }
}
