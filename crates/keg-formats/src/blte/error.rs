//! BLTE error types

use thiserror::Error;

/// BLTE-specific error type
#[derive(Debug, Error)]
pub enum BlteError {
    /// Invalid BLTE magic bytes
    #[error("invalid BLTE magic: expected [42 4C 54 45], got {0:02X?}")]
    InvalidMagic([u8; 4]),

    /// Invalid header size
    #[error("invalid header size: {0}")]
    InvalidHeaderSize(u32),

    /// Invalid header format
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// Invalid chunk format
    #[error("invalid chunk: {0}")]
    InvalidChunk(String),

    /// Invalid chunk count
    #[error("invalid chunk count: {0}")]
    InvalidChunkCount(u32),

    /// Empty chunk encountered
    #[error("empty chunk (zero size)")]
    EmptyChunk,

    /// Invalid chunk size for builder
    #[error("invalid chunk size: {size} bytes (must be between {min} and {max} bytes)")]
    InvalidChunkSize {
        /// The invalid size that was provided
        size: usize,
        /// Minimum allowed size
        min: usize,
        /// Maximum allowed size
        max: usize,
    },

    /// Unknown compression mode
    #[error("unknown compression mode: 0x{0:02X}")]
    UnknownCompressionMode(u8),

    /// Unsupported compression mode
    #[error("unsupported compression mode: 0x{0:02X}")]
    UnsupportedCompressionMode(u8),

    /// Checksum mismatch
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Expected checksum
        expected: String,
        /// Actual checksum
        actual: String,
    },

    /// Compression/decompression error
    #[error("compression error: {0}")]
    CompressionError(String),

    /// Decompression failed
    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    /// Encryption key not found
    #[error("encryption key not found: {0:016X}")]
    KeyNotFound(u64),

    /// Chunk mode `E` (encrypted) with no key available to decode it.
    ///
    /// The core does not guess keys; this is surfaced to the caller as-is.
    #[error("encrypted chunk, no key available for key name {key_name:016X}")]
    EncryptedChunk {
        /// Key name referenced by the chunk's encryption header
        key_name: u64,
    },

    /// Encrypted chunk header carried an IV size other than 4 or 8 bytes
    #[error("invalid IV size: {actual} (expected 4 or 8)")]
    InvalidIvSize {
        /// The IV size that was actually present
        actual: u8,
    },

    /// An encrypted chunk decrypted to another encrypted chunk (`E` inside `E`)
    #[error("nested encryption is not supported")]
    NestedEncryption,

    /// A single-chunk BLTE file (no chunk table) used mode `E`
    ///
    /// Single-chunk files have no per-chunk key context, so encrypted
    /// single-chunk BLTE is rejected outright rather than guessed at.
    #[error("single-chunk BLTE files cannot use encrypted mode")]
    SingleChunkEncrypted,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary parsing error
    #[error("binary parsing error: {0}")]
    BinRw(#[from] binrw::Error),
}

/// Result type for BLTE operations
pub type BlteResult<T> = Result<T, BlteError>;
