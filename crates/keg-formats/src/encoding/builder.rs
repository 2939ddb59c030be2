//! Builder for creating encoding files from scratch
//!
//! This module provides [`EncodingBuilder`] for creating NGDP encoding files from individual
//! content and encoding key entries. The builder handles:
//!
//! - `ESpec` table construction from unique compression specifications
//! - Page-based organization of `CKey` and `EKey` entries
//! - Proper sorting and indexing for binary search compatibility
//! - Page checksums and index generation
//! - Trailing `ESpec` generation for self-describing files
//! - Round-trip compatibility with the parser
//!
//! # Example
//!
//! ```rust
//! use keg_formats::encoding::{EncodingBuilder, CKeyEntryData, EKeyEntryData};
//! use keg_crypto::{ContentKey, EncodingKey};
//!
//! let mut builder = EncodingBuilder::new();
//!
//! // Add a content key entry
//! let content_key = ContentKey::from_bytes([1u8; 16]);
//! let encoding_key = EncodingKey::from_bytes([2u8; 16]);
//!
//! builder.add_ckey_entry(CKeyEntryData {
//!     content_key,
//!     file_size: 1024,
//!     encoding_keys: vec![encoding_key],
//! });
//!
//! // Add corresponding encoding key entry
//! builder.add_ekey_entry(EKeyEntryData {
//!     encoding_key,
//!     espec: "z".to_string(), // ZLib compression
//!     file_size: 512, // Compressed size
//! });
//!
//! // Build the encoding file
//! let encoding_file = builder.build().expect("Failed to build encoding file");
//!
//! // Serialize to bytes
//! let data = encoding_file.build().expect("Failed to serialize");
//!
//! // Or compress with BLTE
//! let blte_data = encoding_file.build_blte().expect("Failed to compress with BLTE");
//! ```

use crate::encoding::{
    ESpecTable, EncodingError, EncodingFile, EncodingHeader, IndexEntry, Page,
    entry::{CKeyPageEntry, EKeyPageEntry},
};
use binrw::BinWrite;
use keg_crypto::{ContentKey, EncodingKey};
use std::collections::HashMap;
use std::io::Cursor;

/// Entry data for building `CKey` pages
#[derive(Debug, Clone)]
pub struct CKeyEntryData {
    /// Content key (MD5 hash of file content)
    pub content_key: ContentKey,
    /// File size (uncompressed)
    pub file_size: u64,
    /// List of encoding keys for this content
    pub encoding_keys: Vec<EncodingKey>,
}

/// Entry data for building `EKey` pages
#[derive(Debug, Clone)]
pub struct EKeyEntryData {
    /// Encoding key
    pub encoding_key: EncodingKey,
    /// `ESpec` string for compression/encoding
    pub espec: String,
    /// Compressed file size
    pub file_size: u64,
}

/// Builder for creating encoding files
#[derive(Debug, Clone)]
pub struct EncodingBuilder {
    /// `CKey` entries (sorted by content key)
    ckey_entries: Vec<CKeyEntryData>,
    /// `EKey` entries (sorted by encoding key)
    ekey_entries: Vec<EKeyEntryData>,
    /// Page sizes in KB
    ckey_page_size_kb: u16,
    ekey_page_size_kb: u16,
    /// Self-describing `ESpec` for the encoding file itself
    trailing_espec: Option<String>,
}

impl EncodingBuilder {
    /// Create a new encoding builder with default page sizes (4KB)
    pub fn new() -> Self {
        Self {
            ckey_entries: Vec::new(),
            ekey_entries: Vec::new(),
            ckey_page_size_kb: 4,
            ekey_page_size_kb: 4,
            trailing_espec: None,
        }
    }

    /// Set page sizes in KB
    #[must_use]
    pub fn with_page_sizes(mut self, ckey_page_size_kb: u16, ekey_page_size_kb: u16) -> Self {
        self.ckey_page_size_kb = ckey_page_size_kb;
        self.ekey_page_size_kb = ekey_page_size_kb;
        self
    }

    /// Set the trailing `ESpec` for the file itself
    #[must_use]
    pub fn with_trailing_espec(mut self, espec: String) -> Self {
        self.trailing_espec = Some(espec);
        self
    }

    /// Add a content key entry
    pub fn add_ckey_entry(&mut self, entry: CKeyEntryData) {
        self.ckey_entries.push(entry);
    }

    /// Add an encoding key entry
    pub fn add_ekey_entry(&mut self, entry: EKeyEntryData) {
        self.ekey_entries.push(entry);
    }

    /// Build the `ESpec` table from all `EKey` entries
    fn build_espec_table(&self) -> ESpecTable {
        let mut table = ESpecTable::default();
        let mut espec_map = HashMap::new();

        // Collect unique ESpec strings
        for entry in &self.ekey_entries {
            if !espec_map.contains_key(&entry.espec) {
                let index = table.add(entry.espec.clone());
                espec_map.insert(entry.espec.clone(), index);
            }
        }

        table
    }

    /// Build `CKey` pages from entries
    fn build_ckey_pages(
        &self,
        page_size: usize,
    ) -> Result<Vec<Page<CKeyPageEntry>>, EncodingError> {
        let mut pages = Vec::new();
        let mut current_page_entries = Vec::new();
        let mut current_page_size = 0;

        // Sort entries by content key for consistent ordering
        let mut sorted_entries: Vec<_> = self.ckey_entries.iter().collect();
        sorted_entries.sort_by_key(|entry| entry.content_key.as_bytes());

        for entry_data in sorted_entries {
            // Calculate entry size: 1 (key_count) + 5 (file_size) + 16 (content_key) + 16 * key_count (encoding_keys)
            let entry_size = 1 + 5 + 16 + (16 * entry_data.encoding_keys.len());

            // Check if adding this entry would exceed page size
            if current_page_size + entry_size > page_size && !current_page_entries.is_empty() {
                // Finalize current page
                let page_data = self.serialize_ckey_page(&current_page_entries, page_size)?;
                pages.push(Page {
                    entries: current_page_entries,
                    original_data: page_data,
                });

                current_page_entries = Vec::new();
                current_page_size = 0;
            }

            // Convert to page entry
            let page_entry = CKeyPageEntry {
                #[allow(clippy::cast_possible_truncation)]
                key_count: entry_data.encoding_keys.len() as u8,
                file_size: entry_data.file_size,
                content_key: entry_data.content_key,
                encoding_keys: entry_data.encoding_keys.clone(),
            };

            current_page_entries.push(page_entry);
            current_page_size += entry_size;
        }

        // Add final page if not empty
        if !current_page_entries.is_empty() {
            let page_data = self.serialize_ckey_page(&current_page_entries, page_size)?;
            pages.push(Page {
                entries: current_page_entries,
                original_data: page_data,
            });
        }

        Ok(pages)
    }

    /// Build `EKey` pages from entries
    fn build_ekey_pages(
        &self,
        page_size: usize,
        espec_table: &ESpecTable,
    ) -> Result<Vec<Page<EKeyPageEntry>>, EncodingError> {
        let mut pages = Vec::new();
        let mut current_page_entries = Vec::new();
        let mut current_page_size = 0;

        // Create reverse lookup for ESpec indices
        let mut espec_indices = HashMap::new();
        for (index, espec) in espec_table.entries.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            espec_indices.insert(espec, index as u32);
        }

        // Sort entries by encoding key for consistent ordering
        let mut sorted_entries: Vec<_> = self.ekey_entries.iter().collect();
        sorted_entries.sort_by_key(|entry| entry.encoding_key.as_bytes());

        for entry_data in sorted_entries {
            // Calculate entry size: 16 (encoding_key) + 4 (espec_index) + 5 (file_size)
            let entry_size = 16 + 4 + 5;

            // Check if adding this entry would exceed page size
            if current_page_size + entry_size > page_size && !current_page_entries.is_empty() {
                // Finalize current page
                let page_data = self.serialize_ekey_page(&current_page_entries, page_size)?;
                pages.push(Page {
                    entries: current_page_entries,
                    original_data: page_data,
                });

                current_page_entries = Vec::new();
                current_page_size = 0;
            }

            // Get ESpec index
            let espec_index = espec_indices
                .get(&entry_data.espec)
                .copied()
                .ok_or_else(|| EncodingError::InvalidESpec(entry_data.espec.clone()))?;

            // Convert to page entry
            let page_entry = EKeyPageEntry {
                encoding_key: entry_data.encoding_key,
                espec_index,
                file_size: entry_data.file_size,
            };

            current_page_entries.push(page_entry);
            current_page_size += entry_size;
        }

        // Add final page if not empty
        if !current_page_entries.is_empty() {
            let page_data = self.serialize_ekey_page(&current_page_entries, page_size)?;
            pages.push(Page {
                entries: current_page_entries,
                original_data: page_data,
            });
        }

        Ok(pages)
    }

    /// Serialize `CKey` page entries to binary data
    #[allow(clippy::unused_self)]
    fn serialize_ckey_page(
        &self,
        entries: &[CKeyPageEntry],
        page_size: usize,
    ) -> Result<Vec<u8>, EncodingError> {
        let mut page_data = vec![0u8; page_size];
        let mut cursor = Cursor::new(&mut page_data);

        for entry in entries {
            entry
                .write_options(&mut cursor, binrw::Endian::Big, (16, 16))
                .map_err(EncodingError::BinRw)?;
        }

        Ok(page_data)
    }

    /// Serialize `EKey` page entries to binary data
    #[allow(clippy::unused_self)]
    fn serialize_ekey_page(
        &self,
        entries: &[EKeyPageEntry],
        page_size: usize,
    ) -> Result<Vec<u8>, EncodingError> {
        let mut page_data = vec![0u8; page_size];
        let mut cursor = Cursor::new(&mut page_data);

        for entry in entries {
            entry
                .write_options(&mut cursor, binrw::Endian::Big, (16,))
                .map_err(EncodingError::BinRw)?;
        }

        Ok(page_data)
    }

    /// Build index entries for pages
    fn build_index<T>(pages: &[Page<T>]) -> Vec<IndexEntry>
    where
        T: HasFirstKey,
    {
        pages
            .iter()
            .map(|page| {
                let first_key = if let Some(first_entry) = page.entries.first() {
                    first_entry.first_key()
                } else {
                    [0u8; 16] // Empty page
                };

                let checksum = md5::compute(&page.original_data);
                IndexEntry::new(first_key, *checksum)
            })
            .collect()
    }

    /// Build the complete encoding file
    pub fn build(self) -> Result<EncodingFile, EncodingError> {
        let ckey_page_size = self.ckey_page_size_kb as usize * 1024;
        let ekey_page_size = self.ekey_page_size_kb as usize * 1024;

        // Build ESpec table first
        let espec_table = self.build_espec_table();

        // Build pages
        let ckey_pages = self.build_ckey_pages(ckey_page_size)?;
        let ekey_pages = self.build_ekey_pages(ekey_page_size, &espec_table)?;

        // Build indices
        let ckey_index = Self::build_index(&ckey_pages);
        let ekey_index = Self::build_index(&ekey_pages);

        // Create header
        let espec_data = espec_table.build();
        let header = EncodingHeader {
            magic: *b"EN",
            version: 1,
            ckey_hash_size: 16,
            ekey_hash_size: 16,
            ckey_page_size_kb: self.ckey_page_size_kb,
            ekey_page_size_kb: self.ekey_page_size_kb,
            #[allow(clippy::cast_possible_truncation)]
            ckey_page_count: ckey_pages.len() as u32,
            #[allow(clippy::cast_possible_truncation)]
            ekey_page_count: ekey_pages.len() as u32,
            flags: 0,
            #[allow(clippy::cast_possible_truncation)]
            espec_block_size: espec_data.len() as u32,
        };

        Ok(EncodingFile {
            header,
            espec_table,
            ckey_index,
            ckey_pages,
            ekey_index,
            ekey_pages,
            trailing_espec: self.trailing_espec,
        })
    }

    /// Generate trailing `ESpec` for the encoding file itself
    pub fn generate_trailing_espec(encoding_file: &EncodingFile) -> String {
        let mut sections = Vec::new();
        // Header (22 bytes) - uncompressed
        sections.push(format!("{}=n", 22));

        // ESpec table - compressed
        let espec_size = encoding_file.header.espec_block_size;
        if espec_size > 0 {
            sections.push(format!("{espec_size}=z"));
        }

        // CKey index - uncompressed
        let ckey_index_size = encoding_file.header.ckey_page_count * 32; // 16 + 16 bytes per entry
        if ckey_index_size > 0 {
            sections.push(format!("{ckey_index_size}=n"));
        }

        // CKey pages - uncompressed
        let ckey_pages_size = encoding_file.header.ckey_page_count
            * (u32::from(encoding_file.header.ckey_page_size_kb) * 1024);
        if ckey_pages_size > 0 {
            sections.push(format!("{ckey_pages_size}=n"));
        }

        // EKey index - uncompressed
        let ekey_index_size = encoding_file.header.ekey_page_count * 32;
        if ekey_index_size > 0 {
            sections.push(format!("{ekey_index_size}=n"));
        }

        // EKey pages - uncompressed
        let ekey_pages_size = encoding_file.header.ekey_page_count
            * (u32::from(encoding_file.header.ekey_page_size_kb) * 1024);
        if ekey_pages_size > 0 {
            sections.push(format!("{ekey_pages_size}=n"));
        }

        // Remainder (the trailing ESpec itself) - compressed
        sections.push("*=z".to_string());

        format!("b:{{{}}}", sections.join(","))
    }
}

impl Default for EncodingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodingBuilder {
    /// Create builder from existing encoding file (for modification)
    ///
    /// This allows loading an existing encoding file, modifying its contents,
    /// and rebuilding it with the changes applied.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use keg_formats::encoding::{EncodingBuilder, EncodingFile, CKeyEntryData};
    /// use keg_crypto::{ContentKey, EncodingKey};
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// // Load existing encoding file
    /// let data = std::fs::read("encoding.bin")?;
    /// let encoding_file = EncodingFile::parse(&data)?;
    ///
    /// // Convert to builder for modification
    /// let mut builder = EncodingBuilder::from_encoding_file(&encoding_file);
    ///
    /// // Add new entry
    /// let content_key = ContentKey::from_bytes([1u8; 16]);
    /// let encoding_key = EncodingKey::from_bytes([2u8; 16]);
    /// builder.add_ckey_entry(CKeyEntryData {
    ///     content_key,
    ///     file_size: 1024,
    ///     encoding_keys: vec![encoding_key],
    /// });
    ///
    /// // Rebuild
    /// let modified = builder.build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_encoding_file(encoding_file: &EncodingFile) -> Self {
        let mut builder = Self::new().with_page_sizes(
            encoding_file.header.ckey_page_size_kb,
            encoding_file.header.ekey_page_size_kb,
        );

        // Copy trailing espec if present
        if let Some(ref trailing) = encoding_file.trailing_espec {
            builder = builder.with_trailing_espec(trailing.clone());
        }

        // Extract CKey entries from pages
        for page in &encoding_file.ckey_pages {
            for entry in &page.entries {
                builder.add_ckey_entry(CKeyEntryData {
                    content_key: entry.content_key,
                    file_size: entry.file_size,
                    encoding_keys: entry.encoding_keys.clone(),
                });
            }
        }

        // Extract EKey entries from pages
        for page in &encoding_file.ekey_pages {
            for entry in &page.entries {
                // Look up ESpec string from index
                let espec = encoding_file
                    .espec_table
                    .get(entry.espec_index)
                    .unwrap_or("z")
                    .to_string();

                builder.add_ekey_entry(EKeyEntryData {
                    encoding_key: entry.encoding_key,
                    espec,
                    file_size: entry.file_size,
                });
            }
        }

        builder
    }

    /// Remove a CKey entry by content key
    ///
    /// Returns true if an entry was removed, false if no matching entry was found.
    pub fn remove_ckey_entry(&mut self, content_key: &ContentKey) -> bool {
        let original_len = self.ckey_entries.len();
        self.ckey_entries.retain(|e| e.content_key != *content_key);
        self.ckey_entries.len() < original_len
    }

    /// Remove an EKey entry by encoding key
    ///
    /// Returns true if an entry was removed, false if no matching entry was found.
    pub fn remove_ekey_entry(&mut self, encoding_key: &EncodingKey) -> bool {
        let original_len = self.ekey_entries.len();
        self.ekey_entries
            .retain(|e| e.encoding_key != *encoding_key);
        self.ekey_entries.len() < original_len
    }

    /// Check if a CKey entry exists
    pub fn has_ckey_entry(&self, content_key: &ContentKey) -> bool {
        self.ckey_entries
            .iter()
            .any(|e| e.content_key == *content_key)
    }

    /// Check if an EKey entry exists
    pub fn has_ekey_entry(&self, encoding_key: &EncodingKey) -> bool {
        self.ekey_entries
            .iter()
            .any(|e| e.encoding_key == *encoding_key)
    }

    /// Get the number of CKey entries
    pub fn ckey_count(&self) -> usize {
        self.ckey_entries.len()
    }

    /// Get the number of EKey entries
    pub fn ekey_count(&self) -> usize {
        self.ekey_entries.len()
    }

    /// Clear all entries (useful for rebuilding from scratch)
    pub fn clear(&mut self) {
        self.ckey_entries.clear();
        self.ekey_entries.clear();
    }
}

/// Trait for types that have a first key for indexing
trait HasFirstKey {
    fn first_key(&self) -> [u8; 16];
}

impl HasFirstKey for CKeyPageEntry {
    fn first_key(&self) -> [u8; 16] {
        *self.content_key.as_bytes()
    }
}

impl HasFirstKey for EKeyPageEntry {
    fn first_key(&self) -> [u8; 16] {
        *self.encoding_key.as_bytes()
    }
}
