mod builder;
mod entry;
mod error;
mod espec;
mod file;
mod header;
mod index;
mod page;

pub use builder::{CKeyEntryData, EKeyEntryData, EncodingBuilder};
pub use entry::{CKeyPageEntry, EKeyPageEntry};
pub use error::EncodingError;
pub use espec::ESpecTable;
pub use file::{EncodingFile, Page};
pub use header::EncodingHeader;
pub use index::IndexEntry;
pub use page::{EncodingPage, PageInfo};
