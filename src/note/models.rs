//! Data structures representing parsed notebook components.

use std::collections::HashMap;

use super::error::{NoteError, Result};

/// Default canonical page width in pixels.
pub const PAGE_WIDTH: u32 = 1404;
/// Default canonical page height in pixels.
pub const PAGE_HEIGHT: u32 = 1872;

/// `ORIENTATION` value marking a page stored rotated (horizontal).
const ORIENTATION_HORIZONTAL: &str = "1090";
/// `PAGESTYLE` value participating in the all-blank background hint.
const STYLE_WHITE: &str = "style_white";
/// Bitmap block length that, together with [`STYLE_WHITE`], collapses the
/// sentinel long run from 0x4000 to 0x400 pixels.
pub(crate) const WHITE_STYLE_BLOCK_LEN: u32 = 0x140E;

/// Which layer of a page to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Main,
    Background,
}

impl LayerKind {
    /// The page-descriptor key holding this layer's metadata offset.
    pub fn key(self) -> &'static str {
        match self {
            LayerKind::Main => "MAINLAYER",
            LayerKind::Background => "BGLAYER",
        }
    }
}

/// A page descriptor: the key/value map read from a page metadata block.
#[derive(Debug, Clone)]
pub struct PageMeta {
    params: HashMap<String, String>,
}

impl PageMeta {
    pub(crate) fn new(params: HashMap<String, String>) -> Self {
        Self { params }
    }

    /// Raw access to the descriptor's key/value pairs.
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// Offset of the metadata block for `kind`, if the descriptor has one.
    ///
    /// Offsets are stored as decimal ASCII. A missing `BGLAYER` entry is
    /// ordinary (`None`); an unparseable value is an error.
    pub fn layer_offset(&self, kind: LayerKind) -> Option<Result<u64>> {
        self.params
            .get(kind.key())
            .map(|value| parse_offset(kind.key(), value))
    }

    /// Whether the page is stored in horizontal orientation.
    pub fn is_horizontal(&self) -> bool {
        self.params.get("ORIENTATION").map(String::as_str) == Some(ORIENTATION_HORIZONTAL)
    }

    /// Whether the page style participates in the all-blank background hint.
    pub(crate) fn has_white_style(&self) -> bool {
        self.params.get("PAGESTYLE").map(String::as_str) == Some(STYLE_WHITE)
    }
}

/// Parse a decimal ASCII block offset.
pub(crate) fn parse_offset(key: &'static str, value: &str) -> Result<u64> {
    value.trim().parse::<u64>().map_err(|_| {
        NoteError::InvalidFormat(format!("unparseable offset for {}: {:?}", key, value))
    })
}
