//! Embedded-PNG layer decoding.
//!
//! Some notebooks store a layer as a complete PNG file inside the bitmap
//! block, regardless of the protocol the layer metadata declares. The
//! payload is decoded with a standard PNG decoder, collapsed to grayscale
//! and optionally rotated into canonical orientation.

use image::GenericImageView;
use log::debug;

use crate::note::error::Result;
use crate::note::raster::Raster;

/// The 8-byte PNG file signature.
pub const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Whether a bitmap payload is an embedded PNG rather than an RLE stream.
pub fn is_png(data: &[u8]) -> bool {
    data.len() >= PNG_MAGIC.len() && data[..PNG_MAGIC.len()] == PNG_MAGIC
}

/// Decode an embedded PNG payload into a grayscale+alpha raster.
///
/// Color is collapsed to luma with the Rec.601 weights
/// `(299*R + 587*G + 114*B) / 1000`; the source alpha is preserved per
/// pixel. When `rotate_cw` is set (horizontally stored pages) both planes
/// are rotated a quarter turn clockwise so the result lands in canonical
/// orientation.
pub fn decode(data: &[u8], rotate_cw: bool) -> Result<Raster> {
    let decoded = image::load_from_memory(data)?;
    let (width, height) = decoded.dimensions();
    let rgba = decoded.to_rgba8();

    let n = width as usize * height as usize;
    let mut pix = Vec::with_capacity(n);
    let mut alpha = Vec::with_capacity(n);
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        let luma = (299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000;
        pix.push(luma.min(255) as u8);
        alpha.push(a);
    }
    debug!(
        "png layer: {}x{}, {} bytes, rotate_cw={}",
        width,
        height,
        data.len(),
        rotate_cw
    );

    if !rotate_cw {
        return Ok(Raster::from_planes(width, height, pix, alpha));
    }

    // Quarter turn clockwise: (x, y) -> (height - 1 - y, x).
    let (w, h) = (width as usize, height as usize);
    let out_width = h;
    let mut rotated_pix = vec![0u8; n];
    let mut rotated_alpha = vec![0u8; n];
    for y in 0..h {
        for x in 0..w {
            let src = y * w + x;
            let dst = x * out_width + (h - 1 - y);
            rotated_pix[dst] = pix[src];
            rotated_alpha[dst] = alpha[src];
        }
    }
    Ok(Raster::from_planes(height, width, rotated_pix, rotated_alpha))
}
