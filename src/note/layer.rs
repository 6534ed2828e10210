//! Layer resolution: bitmap block fetch and decoder dispatch.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};
use log::{debug, warn};

use super::codec::{png, rle};
use super::error::{NoteError, Result};
use super::metadata;
use super::models::{self, LayerKind, PageMeta, PAGE_HEIGHT, PAGE_WIDTH, WHITE_STYLE_BLOCK_LEN};
use super::raster::Raster;

/// Protocol tag of the run-length layer encoding.
const PROTOCOL_RLE: &str = "RATTA_RLE";

/// Bitmap blocks shorter than this carry a style reference, not raster data.
const MIN_BITMAP_LEN: u32 = 16;

/// Grayscale of the synthesized neutral background.
const NEUTRAL_GRAY: u8 = 0xFE;

/// Resolve and decode one layer of a page.
///
/// Follows the layer offset on the page descriptor to the layer metadata
/// block, fetches the bitmap block it references and selects a decoder:
/// an embedded PNG (detected by magic, overriding the declared protocol),
/// a synthesized neutral background for undersized background blocks, or
/// the RATTA_RLE codec. Anything else is an unsupported protocol.
pub(crate) fn load<R: Read + Seek>(
    source: &mut R,
    source_len: u64,
    page: &PageMeta,
    kind: LayerKind,
    width: u32,
    height: u32,
) -> Result<Raster> {
    let offset = match page.layer_offset(kind) {
        Some(offset) => offset?,
        None => return Err(NoteError::MissingKey(kind.key())),
    };
    let meta = metadata::read_block(source, offset)?;

    let bitmap_offset = match meta.get("LAYERBITMAP") {
        Some(value) => models::parse_offset("LAYERBITMAP", value)?,
        None => return Err(NoteError::MissingKey("LAYERBITMAP")),
    };
    let (block_len, data) = read_bitmap_block(source, source_len, bitmap_offset)?;

    let horizontal = page.is_horizontal();
    if png::is_png(&data) {
        debug!("{}: embedded png bitmap ({} bytes)", kind.key(), block_len);
        return png::decode(&data, horizontal);
    }
    if block_len < MIN_BITMAP_LEN && kind == LayerKind::Background {
        // A style reference rather than raster data; synthesize paper.
        debug!(
            "{}: {} byte block, synthesizing neutral background",
            kind.key(),
            block_len
        );
        return Ok(Raster::filled(PAGE_WIDTH, PAGE_HEIGHT, NEUTRAL_GRAY));
    }

    match meta.get("LAYERPROTOCOL").map(String::as_str) {
        Some(PROTOCOL_RLE) => {
            let all_blank = page.has_white_style() && block_len == WHITE_STYLE_BLOCK_LEN;
            decode_rle_with_fallback(&data, width, height, all_blank, horizontal)
        }
        other => Err(NoteError::UnsupportedProtocol(
            other.unwrap_or_default().to_string(),
        )),
    }
}

/// Read a `u32 length | payload` bitmap block, verifying the declared length
/// against the bytes that remain in the file.
fn read_bitmap_block<R: Read + Seek>(
    source: &mut R,
    source_len: u64,
    offset: u64,
) -> Result<(u32, Vec<u8>)> {
    source.seek(SeekFrom::Start(offset))?;
    let len = source.read_u32::<LittleEndian>()?;
    let end = offset.saturating_add(4).saturating_add(len as u64);
    if end > source_len {
        return Err(NoteError::Truncated {
            context: "bitmap block",
            needed: len as u64,
            available: source_len.saturating_sub(offset.saturating_add(4)),
        });
    }
    let mut data = vec![0u8; len as usize];
    source.read_exact(&mut data)?;
    Ok((len, data))
}

/// Decode a RATTA_RLE payload, swapping dimensions for horizontal pages.
///
/// A size mismatch at non-default dimensions is retried once at the default
/// page size before the error is surfaced.
fn decode_rle_with_fallback(
    data: &[u8],
    width: u32,
    height: u32,
    all_blank: bool,
    horizontal: bool,
) -> Result<Raster> {
    let (w, h) = oriented(width, height, horizontal);
    match rle::decode(data, w, h, all_blank) {
        Err(NoteError::SizeMismatch { produced, expected })
            if (width, height) != (PAGE_WIDTH, PAGE_HEIGHT) =>
        {
            warn!(
                "rle decode produced {} of {} pixels at {}x{}, retrying at default page size",
                produced, expected, w, h
            );
            let (fw, fh) = oriented(PAGE_WIDTH, PAGE_HEIGHT, horizontal);
            rle::decode(data, fw, fh, all_blank)
        }
        result => result,
    }
}

fn oriented(width: u32, height: u32, horizontal: bool) -> (u32, u32) {
    if horizontal {
        (height, width)
    } else {
        (width, height)
    }
}
