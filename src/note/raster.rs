//! Grayscale+alpha raster container and background compositing.

use log::trace;

/// A grayscale image with a per-pixel alpha plane.
///
/// Pixels are row-major, top-to-bottom, left-to-right; 0 is black, 255 is
/// white. Alpha 0 marks a transparent pixel, 255 an opaque one. Rasters own
/// their buffers and are freely movable; the reader retains no reference to
/// them after a decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    pix: Vec<u8>,
    alpha: Vec<u8>,
}

impl Raster {
    /// Assemble a raster from its planes.
    ///
    /// # Panics
    /// Panics if either plane's length differs from `width * height`.
    /// Decoders construct rasters only after verifying exact pixel counts,
    /// so a mismatch here is a programmer error.
    pub fn from_planes(width: u32, height: u32, pix: Vec<u8>, alpha: Vec<u8>) -> Self {
        let expected = width as usize * height as usize;
        assert_eq!(pix.len(), expected, "pixel plane length mismatch");
        assert_eq!(alpha.len(), expected, "alpha plane length mismatch");
        Self {
            width,
            height,
            pix,
            alpha,
        }
    }

    /// A uniform raster of one gray level, fully opaque.
    pub(crate) fn filled(width: u32, height: u32, gray: u8) -> Self {
        let n = width as usize * height as usize;
        Self {
            width,
            height,
            pix: vec![gray; n],
            alpha: vec![255; n],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The grayscale plane, `width * height` bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pix
    }

    /// The alpha plane, same length as [`pixels`](Self::pixels).
    pub fn alpha(&self) -> &[u8] {
        &self.alpha
    }

    /// Pull background pixels through wherever this raster is transparent.
    ///
    /// Every pixel with alpha 0 is replaced by the background's pixel at the
    /// same index and becomes opaque; all other pixels are untouched. The
    /// operation mutates in place and is idempotent. If the rasters differ
    /// in length only the shared prefix is composited.
    pub fn composite_background(&mut self, bg: &Raster) {
        let n = self.pix.len().min(bg.pix.len()).min(self.alpha.len());
        let mut replaced = 0usize;
        for i in 0..n {
            if self.alpha[i] == 0 {
                self.pix[i] = bg.pix[i];
                self.alpha[i] = 255;
                replaced += 1;
            }
        }
        trace!("background composite: replaced {} pixels", replaced);
    }

    /// Interleave the planes into gray/alpha pairs, the layout external PNG
    /// encoders expect for 8-bit grayscale+alpha images.
    pub fn interleaved_luma_alpha(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pix.len() * 2);
        for (&gray, &alpha) in self.pix.iter().zip(&self.alpha) {
            out.push(gray);
            out.push(alpha);
        }
        out
    }
}
