//! Error types for the CDN client and fetch planner

use thiserror::Error;

/// Errors raised by the CDN transport, catalog resolution, and fetch planner.
///
/// Each variant is tagged with the taxonomy kind it belongs to (network,
/// integrity, not-found, malformed, conflict) so a caller can match on
/// [`CdnError::kind`] without needing to know which layer actually raised it.
#[derive(Debug, Error)]
pub enum CdnError {
    /// Transport-level or HTTP failure, after the transport's own retry
    /// policy has given up.
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that could not be fetched
        url: String,
        /// Underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// A remote object (catalog response, config, data, patch, or index)
    /// returned a non-success, non-retryable HTTP status.
    #[error("CDN returned {status} for {url}")]
    HttpStatus {
        /// The URL requested
        url: String,
        /// The status code returned
        status: u16,
    },

    /// A downloaded object's bytes did not match the content key that was
    /// requested.
    #[error("integrity error: {key} expected, got {actual}")]
    IntegrityError {
        /// The key requested
        key: String,
        /// The MD5 actually computed over the downloaded bytes
        actual: String,
    },

    /// A requested CDN resolved to no usable entry in the `cdns` catalog,
    /// or a forced CDN URL was malformed.
    #[error("no usable CDN: {0}")]
    NoCdn(String),

    /// A required catalog (`versions`, `cdns`) or local object was absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// A catalog, config, or manifest failed to parse.
    #[error("malformed {what}: {reason}")]
    Malformed {
        /// What failed to parse (e.g. "cdns catalog", "build-config")
        what: String,
        /// Human-readable reason
        reason: String,
    },

    /// An install-time filename collision between entries with distinct
    /// content keys. Never fatal; surfaced so callers can inspect the
    /// discarded entry.
    #[error("install conflict: {path} already resolved to a different content key")]
    Conflict {
        /// The colliding install path
        path: String,
    },

    /// Multiple builds matched an ambiguous version query: more than one
    /// distinct `(build_config, cdn_config)` pair satisfied the selector.
    #[error("ambiguous version match: {} distinct build_config/cdn_config pairs", .0.len())]
    Ambiguous(Vec<(String, String)>),

    /// Lower-layer BPSV parse failure
    #[error("BPSV error: {0}")]
    Bpsv(#[from] keg_formats::bpsv::BpsvError),

    /// Lower-layer object-store error
    #[error("storage error: {0}")]
    Storage(#[from] keg_storage::StorageError),

    /// Lower-layer archive error
    #[error("archive error: {0}")]
    Archive(#[from] keg_formats::archive::ArchiveError),

    /// Lower-layer encoding-file error
    #[error("encoding error: {0}")]
    Encoding(#[from] keg_formats::encoding::EncodingError),

    /// Lower-layer install-manifest error
    #[error("install manifest error: {0}")]
    Install(#[from] keg_formats::install::InstallError),

    /// Lower-layer BLTE error
    #[error("BLTE error: {0}")]
    Blte(#[from] keg_formats::blte::BlteError),

    /// I/O error talking to the local filesystem
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The taxonomy kind a [`CdnError`] belongs to, independent of which layer
/// raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport/HTTP failure
    NetworkError,
    /// MD5 mismatch at any layer
    IntegrityError,
    /// Object or catalog row absent locally
    NotFound,
    /// Parse failure
    Malformed,
    /// Install-time filename collision
    Conflict,
    /// BLTE chunk mode `E` with no key available to decode it
    EncryptedChunk,
}

impl CdnError {
    /// Classify this error into the taxonomy kind described in the error
    /// handling design, so callers can match on *kind* without knowing
    /// which crate raised the underlying error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } | Self::HttpStatus { .. } => ErrorKind::NetworkError,
            Self::IntegrityError { .. } => ErrorKind::IntegrityError,
            Self::NoCdn(_) | Self::NotFound(_) => ErrorKind::NotFound,
            Self::Malformed { .. } | Self::Bpsv(_) | Self::Ambiguous(_) => ErrorKind::Malformed,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Storage(keg_storage::StorageError::NotFound(_)) => ErrorKind::NotFound,
            Self::Storage(keg_storage::StorageError::IntegrityError { .. }) => {
                ErrorKind::IntegrityError
            }
            Self::Storage(_) => ErrorKind::Malformed,
            Self::Archive(
                keg_formats::archive::ArchiveError::ChecksumMismatch { .. }
                | keg_formats::archive::ArchiveError::FooterChecksum
                | keg_formats::archive::ArchiveError::TocChecksum,
            ) => ErrorKind::IntegrityError,
            Self::Archive(_) | Self::Encoding(_) | Self::Install(_) => ErrorKind::Malformed,
            Self::Blte(keg_formats::blte::BlteError::ChecksumMismatch { .. }) => {
                ErrorKind::IntegrityError
            }
            Self::Blte(keg_formats::blte::BlteError::EncryptedChunk { .. }) => {
                ErrorKind::EncryptedChunk
            }
            Self::Blte(_) => ErrorKind::Malformed,
            Self::Io(_) => ErrorKind::NotFound,
        }
    }
}

/// Result type for CDN operations
pub type CdnResult<T> = Result<T, CdnError>;
