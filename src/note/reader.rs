//! The notebook reader: signature scan, trailer-indexed page directory and
//! the page decoding facade.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use byteorder::{LittleEndian, ReadBytesExt};
use log::{debug, info, warn};
use regex::bytes::Regex;

use super::error::{NoteError, Result};
use super::layer;
use super::metadata;
use super::models::{parse_offset, LayerKind, PageMeta, PAGE_HEIGHT, PAGE_WIDTH};
use super::raster::Raster;

/// Width of the trailer pointer at the tail of the file.
const ADDRESS_SIZE: i64 = 4;
/// How many leading bytes are scanned for the signature.
const SIGNATURE_WINDOW: usize = 64;
/// Trailer keys with this prefix hold page descriptor offsets.
const PAGE_KEY_PREFIX: &str = "PAGE";

static SIGNATURE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn signature_regex() -> &'static Regex {
    SIGNATURE_PATTERN
        .get_or_init(|| Regex::new(r"SN_FILE_VER_\d{8}").expect("invalid signature pattern"))
}

/// The main reader for Supernote `.note` files.
///
/// Construction parses the metadata directory eagerly: the signature, the
/// trailer block the tail pointer names, and every page descriptor the
/// trailer references. Layers are fetched and decoded lazily, one page at a
/// time, through [`decode_page`](Self::decode_page).
///
/// # Thread safety
/// The byte source sits behind a `Mutex` so decode operations take `&self`.
/// The lock serializes decodes on one reader; a worker pool that decodes
/// pages in parallel should open one source per worker instead of sharing a
/// reader.
#[derive(Debug)]
pub struct NoteReader<R> {
    source: Mutex<R>,
    source_len: u64,
    signature: String,
    width: u32,
    height: u32,
    trailer: HashMap<String, String>,
    pages: Vec<PageMeta>,
}

impl NoteReader<File> {
    /// Open and parse a notebook from a file path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("opening notebook: {}", path.display());
        Self::new(File::open(path)?)
    }
}

impl<R: Read + Seek> NoteReader<R> {
    /// Parse a notebook from a seekable byte source.
    ///
    /// Reads the signature from the first 64 bytes, follows the trailer
    /// pointer at the tail of the file to the root metadata block, and
    /// indexes every page descriptor. Page indices are assigned by
    /// ascending descriptor offset and are stable across invocations on the
    /// same file.
    ///
    /// # Errors
    /// Returns an error if the signature is missing, the trailer pointer
    /// lies outside the file, a page offset is unparseable, or any metadata
    /// block cannot be read in full.
    pub fn new(source: R) -> Result<Self> {
        Self::with_page_size(source, PAGE_WIDTH, PAGE_HEIGHT)
    }

    /// Parse a notebook whose pages use non-default dimensions.
    ///
    /// Layers that fail to decode at these dimensions are retried once at
    /// the default 1404x1872 page size before the error is surfaced.
    pub fn with_page_size(mut source: R, width: u32, height: u32) -> Result<Self> {
        let signature = read_signature(&mut source)?;
        let source_len = source.seek(SeekFrom::End(0))?;

        source.seek(SeekFrom::End(-ADDRESS_SIZE))?;
        let trailer_offset = source.read_u32::<LittleEndian>()? as u64;
        if trailer_offset + 4 > source_len {
            return Err(NoteError::TrailerOutOfRange {
                offset: trailer_offset,
                file_len: source_len,
            });
        }
        debug!("trailer metadata block at {:#x}", trailer_offset);
        let trailer = metadata::read_block(&mut source, trailer_offset)?;

        let mut page_offsets = trailer
            .iter()
            .filter(|(key, _)| key.starts_with(PAGE_KEY_PREFIX))
            .map(|(_, value)| parse_offset("PAGE", value))
            .collect::<Result<Vec<u64>>>()?;
        page_offsets.sort_unstable();

        let mut pages = Vec::with_capacity(page_offsets.len());
        for offset in page_offsets {
            pages.push(PageMeta::new(metadata::read_block(&mut source, offset)?));
        }

        info!(
            "notebook {}: {} pages at {}x{}",
            signature,
            pages.len(),
            width,
            height
        );
        Ok(Self {
            source: Mutex::new(source),
            source_len,
            signature,
            width,
            height,
            trailer,
            pages,
        })
    }

    /// The `SN_FILE_VER_########` signature string.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Number of pages in the notebook.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Parsed page descriptors, in page-index order.
    pub fn pages(&self) -> &[PageMeta] {
        &self.pages
    }

    /// The raw trailer key/value map.
    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.trailer
    }

    /// Decode page `index` into a fully opaque grayscale+alpha raster.
    ///
    /// The main layer is decoded, the background layer (when present and
    /// decodable) is composited under it through the transparency sentinel,
    /// and the main raster is returned. A background decode failure is
    /// logged and the page is returned without background; a main layer
    /// failure is fatal for the page.
    pub fn decode_page(&self, index: usize) -> Result<Raster> {
        let (mut main, bg) = self.decode_layers(index)?;
        if let Some(bg) = bg {
            main.composite_background(&bg);
        }
        Ok(main)
    }

    /// Decode the raw main and background layers of page `index` without
    /// compositing.
    ///
    /// The background is `None` when the page declares no `BGLAYER` or when
    /// its decode fails (logged, non-fatal).
    pub fn decode_layers(&self, index: usize) -> Result<(Raster, Option<Raster>)> {
        let page = self.page(index)?;
        let mut source = self.source.lock().map_err(|_| NoteError::LockPoisoned)?;

        let main = layer::load(
            &mut *source,
            self.source_len,
            page,
            LayerKind::Main,
            self.width,
            self.height,
        )?;

        let bg = if page.layer_offset(LayerKind::Background).is_some() {
            match layer::load(
                &mut *source,
                self.source_len,
                page,
                LayerKind::Background,
                self.width,
                self.height,
            ) {
                Ok(bg) => Some(bg),
                Err(err) => {
                    warn!("page {}: background decode failed: {}", index, err);
                    None
                }
            }
        } else {
            None
        };

        Ok((main, bg))
    }

    fn page(&self, index: usize) -> Result<&PageMeta> {
        self.pages.get(index).ok_or(NoteError::PageOutOfRange {
            index,
            count: self.pages.len(),
        })
    }
}

/// Scan the first 64 bytes of the source for the notebook signature.
fn read_signature<R: Read + Seek>(source: &mut R) -> Result<String> {
    source.seek(SeekFrom::Start(0))?;
    let mut window = [0u8; SIGNATURE_WINDOW];
    let mut filled = 0;
    while filled < window.len() {
        match source.read(&mut window[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        }
    }
    let found = signature_regex()
        .find(&window[..filled])
        .ok_or(NoteError::SignatureNotFound)?;
    // The pattern matches ASCII only, so the bytes are valid UTF-8.
    Ok(String::from_utf8_lossy(found.as_bytes()).into_owned())
}
