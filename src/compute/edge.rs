/// Edge rendering
///
/// Decodes the source, rotates it upright, runs Canny on the luma channel
/// and inverts the result so edges come out dark on white.

use image::metadata::Orientation;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

use crate::error::ComputeError;

/// Render an edge map for an encoded image and return it as PNG bytes
pub fn render_edges(
    source: &[u8],
    low_threshold: f32,
    high_threshold: f32,
    orientation: u16,
) -> Result<Vec<u8>, ComputeError> {
    let mut img = image::load_from_memory(source)?;

    // EXIF orientation 1..=8; anything else is treated as upright
    if let Some(orientation) = u8::try_from(orientation).ok().and_then(Orientation::from_exif) {
        img.apply_orientation(orientation);
    }

    let gray = img.to_luma8();
    let mut edges = imageproc::edges::canny(&gray, low_threshold, high_threshold);

    // invert black and white
    image::imageops::colorops::invert(&mut edges);

    let mut bytes: Vec<u8> = Vec::new();
    DynamicImage::ImageLuma8(edges).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    /// 32x16 image, left half black, right half white
    fn split_image() -> Vec<u8> {
        let img = GrayImage::from_fn(32, 16, |x, _| if x < 16 { Luma([0]) } else { Luma([255]) });
        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_render_edges_keeps_dimensions() {
        let png = render_edges(&split_image(), 50.0, 100.0, 1).unwrap();
        let out = image::load_from_memory(&png).unwrap();
        assert_eq!((out.width(), out.height()), (32, 16));
    }

    #[test]
    fn test_render_edges_applies_orientation() {
        // 6 = rotate 90 degrees clockwise
        let png = render_edges(&split_image(), 50.0, 100.0, 6).unwrap();
        let out = image::load_from_memory(&png).unwrap();
        assert_eq!((out.width(), out.height()), (16, 32));
    }

    #[test]
    fn test_render_edges_finds_the_boundary() {
        let png = render_edges(&split_image(), 50.0, 100.0, 1).unwrap();
        let out = image::load_from_memory(&png).unwrap().to_luma8();
        // inverted: edge pixels are black
        assert!(out.pixels().any(|p| p.0[0] == 0));
        assert!(out.pixels().any(|p| p.0[0] == 255));
    }

    #[test]
    fn test_render_edges_rejects_garbage() {
        assert!(matches!(
            render_edges(b"not an image", 50.0, 100.0, 1),
            Err(ComputeError::Decode(_))
        ));
    }
}
