//! Pencil sketch filter: grayscale, inverted Gaussian blur and a colour-dodge
//! divide.

use std::io::Cursor;

use image::{imageops, DynamicImage, GrayImage, ImageFormat, Luma, Rgb};

use crate::StylizeError;

/// Sigma matching a 21x21 Gaussian kernel: `0.3 * ((21 - 1) / 2 - 1) + 0.8`.
pub const SKETCH_BLUR_SIGMA: f32 = 3.5;

/// Decode `bytes`, apply the pencil sketch filter and return a grayscale PNG.
pub fn pencil_sketch(bytes: &[u8]) -> Result<Vec<u8>, StylizeError> {
    let image = image::load_from_memory(bytes).map_err(StylizeError::InvalidImage)?;
    let sketch = sketch_luma(&grayscale(&image));
    encode_png(DynamicImage::ImageLuma8(sketch))
}

/// BT.601 luma in 14-bit fixed point (0.299 R + 0.587 G + 0.114 B), the
/// weighting photo editors and OpenCV use. Alpha is dropped.
fn grayscale(image: &DynamicImage) -> GrayImage {
    const R: u32 = 4899;
    const G: u32 = 9617;
    const B: u32 = 1868;
    const SHIFT: u32 = 14;

    let rgb = image.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let Rgb([r, g, b]) = *rgb.get_pixel(x, y);
        let weighted = u32::from(r) * R + u32::from(g) * G + u32::from(b) * B;
        Luma([((weighted + (1 << (SHIFT - 1))) >> SHIFT) as u8])
    })
}

pub(crate) fn sketch_luma(gray: &GrayImage) -> GrayImage {
    let mut inverted = gray.clone();
    imageops::invert(&mut inverted);

    let mut inverted_blur = imageops::blur(&inverted, SKETCH_BLUR_SIGMA);
    imageops::invert(&mut inverted_blur);

    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let Luma([value]) = *gray.get_pixel(x, y);
        let Luma([blurred]) = *inverted_blur.get_pixel(x, y);
        Luma([dodge(value, blurred)])
    })
}

/// `value * 256 / blurred`, rounded and saturated; a zero divisor yields black.
fn dodge(value: u8, blurred: u8) -> u8 {
    if blurred == 0 {
        return 0;
    }
    let numerator = u32::from(value) * 256;
    let divisor = u32::from(blurred);
    let quotient = (numerator + divisor / 2) / divisor;
    u8::try_from(quotient).unwrap_or(u8::MAX)
}

pub(crate) fn encode_png(image: DynamicImage) -> Result<Vec<u8>, StylizeError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(StylizeError::Encode)?;
    Ok(buffer.into_inner())
}
