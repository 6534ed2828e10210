//! Decoder for the RATTA_RLE bitmap encoding.
//!
//! The payload is a stream of two-byte `(color, length)` pairs read strictly
//! left to right. A length byte of 0xFF is a fixed-size long run. A length
//! byte with the high bit set buffers its pair as a *holder* that the next
//! pair resolves: a pair of the same color merges with the holder into one
//! long run, any other pair flushes the holder alone and is then processed
//! from scratch. A holder still pending when the payload ends is converted by
//! a tail adjustment into the largest emission that fits the remaining gap.

use log::trace;

use crate::note::error::{NoteError, Result};
use crate::note::raster::Raster;

/// Palette code for black ink.
pub const COLOR_BLACK: u8 = 0x61;
/// Palette code for the transparent background sentinel.
pub const COLOR_BACKGROUND: u8 = 0x62;
/// Palette code for dark gray ink.
pub const COLOR_DARK_GRAY: u8 = 0x63;
/// Palette code for mid gray ink.
pub const COLOR_GRAY: u8 = 0x64;
/// Palette code for near-white ink.
pub const COLOR_WHITE: u8 = 0x65;
/// Marker-tool variant of [`COLOR_BLACK`].
pub const COLOR_MARKER_BLACK: u8 = 0x66;
/// Marker-tool variant of [`COLOR_DARK_GRAY`].
pub const COLOR_MARKER_DARK_GRAY: u8 = 0x67;
/// Marker-tool variant of [`COLOR_GRAY`].
pub const COLOR_MARKER_GRAY: u8 = 0x68;

/// Length byte marking a sentinel long run.
const LENGTH_SENTINEL: u8 = 0xFF;
/// Pixels emitted by a sentinel long run.
const LONG_RUN: usize = 0x4000;
/// Pixels emitted by a sentinel long run when the all-blank hint is set.
const LONG_RUN_ALL_BLANK: usize = 0x400;

/// Grayscale emitted for the transparent sentinel; pairs with alpha 0.
const GRAY_TRANSPARENT: u8 = 0xFF;
/// Grayscale for color codes outside the palette.
const GRAY_UNKNOWN: u8 = 0xC9;

/// Map a palette code to its grayscale value.
fn gray_for(code: u8) -> u8 {
    match code {
        COLOR_BLACK | COLOR_MARKER_BLACK => 0x00,
        COLOR_DARK_GRAY | COLOR_MARKER_DARK_GRAY => 0x9D,
        COLOR_GRAY | COLOR_MARKER_GRAY => 0xC9,
        COLOR_WHITE => 0xFE,
        COLOR_BACKGROUND => GRAY_TRANSPARENT,
        // Raw grayscale codes emitted by newer device revisions.
        0x9D | 0x9E => 0x9D,
        0xC9 | 0xCA => 0xC9,
        _ => GRAY_UNKNOWN,
    }
}

/// Accumulates decoded pixels, clamping every emission to the remaining
/// capacity and writing in chunks that never cross a row boundary. A single
/// semantic run may still span several rows as successive chunks.
struct RunWriter {
    out: Vec<u8>,
    expected: usize,
    width: usize,
}

impl RunWriter {
    fn new(width: u32, height: u32) -> Self {
        let expected = width as usize * height as usize;
        Self {
            out: Vec::with_capacity(expected),
            expected,
            width: width as usize,
        }
    }

    fn remaining(&self) -> usize {
        self.expected - self.out.len()
    }

    fn is_full(&self) -> bool {
        self.out.len() >= self.expected
    }

    /// Emit `length` pixels of `code`, row-aligned and clamped.
    fn push_run(&mut self, code: u8, length: usize) {
        let gray = gray_for(code);
        let mut length = length.min(self.remaining());
        while length > 0 {
            let space_in_row = self.width - self.out.len() % self.width;
            let chunk = length.min(space_in_row);
            self.out.resize(self.out.len() + chunk, gray);
            length -= chunk;
        }
    }
}

/// Pixel extent carried by a holder length byte at a given bit shift.
fn holder_extent(length: u8, shift: u32) -> usize {
    ((length as usize & 0x7F) + 1) << shift
}

/// Decode a RATTA_RLE payload into a `width * height` raster.
///
/// `width` and `height` are the dimensions the payload was encoded for; the
/// caller swaps them for horizontally stored pages, and the raster records
/// whatever was passed in. `all_blank` collapses the sentinel long run from
/// 0x4000 to 0x400 pixels for this stream only.
///
/// The alpha plane is derived from the transparent sentinel: pixels emitted
/// from color 0x62 get alpha 0, everything else alpha 255.
///
/// # Errors
/// Returns [`NoteError::SizeMismatch`] when the stream does not produce
/// exactly `width * height` pixels. No partial raster is returned.
pub fn decode(data: &[u8], width: u32, height: u32, all_blank: bool) -> Result<Raster> {
    let long_run = if all_blank { LONG_RUN_ALL_BLANK } else { LONG_RUN };
    let mut writer = RunWriter::new(width, height);
    let mut holder: Option<(u8, u8)> = None;

    for pair in data.chunks_exact(2) {
        if writer.is_full() {
            break;
        }
        let (color, length) = (pair[0], pair[1]);

        if let Some((held_color, held_length)) = holder.take() {
            if color == held_color {
                // Merge: the held pair and this one describe a single run.
                let merged = 1 + length as usize + holder_extent(held_length, 7);
                writer.push_run(held_color, merged);
                continue;
            }
            // Flush the holder alone; this pair is then processed from scratch.
            writer.push_run(held_color, 1 + holder_extent(held_length, 7));
        }

        if length == LENGTH_SENTINEL {
            writer.push_run(color, long_run);
        } else if length & 0x80 != 0 {
            holder = Some((color, length));
        } else {
            writer.push_run(color, length as usize + 1);
        }
    }

    // A holder pending at payload end becomes the largest emission that
    // still fits the gap, scanning shifts from 7 down to 0.
    if let Some((held_color, held_length)) = holder {
        if !writer.is_full() {
            let gap = writer.remaining();
            let adjusted = (0..=7u32)
                .rev()
                .map(|shift| holder_extent(held_length, shift))
                .find(|&extent| extent <= gap);
            if let Some(extent) = adjusted {
                writer.push_run(held_color, extent);
            }
        }
    }

    let produced = writer.out.len();
    if produced != writer.expected {
        return Err(NoteError::SizeMismatch {
            produced,
            expected: writer.expected,
        });
    }
    trace!(
        "ratta_rle: {} payload bytes -> {} pixels ({}x{}, all_blank={})",
        data.len(),
        produced,
        width,
        height,
        all_blank
    );

    let alpha = writer
        .out
        .iter()
        .map(|&gray| if gray == GRAY_TRANSPARENT { 0 } else { 255 })
        .collect();
    Ok(Raster::from_planes(width, height, writer.out, alpha))
}
