//! Custom error types for the supernote-reader crate.

use thiserror::Error;

/// The primary error type for all operations in this crate.
#[derive(Debug, Error)]
pub enum NoteError {
    /// An error originating from I/O operations.
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    /// No `SN_FILE_VER_########` signature in the first 64 bytes of the file.
    #[error("signature not found")]
    SignatureNotFound,

    /// The trailer pointer at the tail of the file lies outside the file.
    #[error("trailer offset {offset:#x} out of range (file length {file_len})")]
    TrailerOutOfRange { offset: u64, file_len: u64 },

    /// A block declared more bytes than remain in the file.
    #[error("truncated {context}: need {needed} bytes, {available} available")]
    Truncated {
        context: &'static str,
        needed: u64,
        available: u64,
    },

    /// A required key was absent from a metadata block.
    #[error("missing metadata key {0}")]
    MissingKey(&'static str),

    /// A layer declared a protocol this crate cannot decode.
    #[error("unsupported layer protocol {0:?}")]
    UnsupportedProtocol(String),

    /// A decoded bitmap did not produce exactly `width * height` pixels.
    #[error("decoded pixel count mismatch: produced {produced}, expected {expected}")]
    SizeMismatch { produced: usize, expected: usize },

    /// A page index outside `[0, page_count)`.
    #[error("page index {index} out of range ({count} pages)")]
    PageOutOfRange { index: usize, count: usize },

    /// An embedded PNG layer failed to decode.
    #[error("png decode failed: {0}")]
    PngDecode(#[from] image::ImageError),

    /// The file is structurally invalid.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// A mutex lock was poisoned, indicating a panic in another thread holding the lock.
    #[error("a mutex lock was poisoned, indicating a panic in another thread holding the lock")]
    LockPoisoned,
}

/// A convenience `Result` type alias using the crate's `NoteError` type.
pub type Result<T> = std::result::Result<T, NoteError>;
