//! Content-addressed local object store for NGDP/CASC data.
//!
//! Objects (configs, archive/loose data blobs, patches, and their indices)
//! are kept under a partitioned hash layout and written with a
//! temp-file-then-rename discipline so that concurrent readers never
//! observe a partial write. See [`Store`] for the public surface.

mod error;
mod store;

pub use error::{StorageError, StorageResult};
pub use store::{FsckReport, ObjectKind, Store};
