//! Reader and rasterizer for Supernote `.note` files.
//!
//! Parses the trailer-indexed metadata directory of a notebook and decodes
//! each page's RATTA_RLE (or embedded PNG) layers into 8-bit grayscale+alpha
//! rasters, compositing the background layer under the main layer through
//! the transparency sentinel.
//!
//! # Example
//! ```no_run
//! use supernote_reader::NoteReader;
//!
//! let reader = NoteReader::open("notes/sketch.note")?;
//! for index in 0..reader.page_count() {
//!     let raster = reader.decode_page(index)?;
//!     println!("page {}: {}x{}", index, raster.width(), raster.height());
//! }
//! # Ok::<(), supernote_reader::NoteError>(())
//! ```

pub mod note;

pub use note::codec;
pub use note::{LayerKind, NoteError, NoteReader, PageMeta, Raster, Result, PAGE_HEIGHT, PAGE_WIDTH};
