//! Install manifest main structure and parsing logic

use crate::install::{
    entry::InstallFileEntry,
    error::{InstallError, Result},
    header::InstallHeader,
    tag::InstallTag,
};
use binrw::{BinRead, BinWrite, io::Cursor};

/// Complete install manifest containing header, tags, and file entries
///
/// Install manifests define which game files should be installed on disk
/// and use tags to organize files by platform, architecture, locale, etc.
/// The manifest uses a binary format with big-endian multi-byte fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallManifest {
    /// Manifest header with metadata
    pub header: InstallHeader,
    /// Tags for file categorization and filtering
    pub tags: Vec<InstallTag>,
    /// File entries with paths, content keys, and sizes
    pub entries: Vec<InstallFileEntry>,
}

impl InstallManifest {
    /// Parse install manifest from binary data
    ///
    /// # Format Layout
    /// 1. Header (10 bytes)
    /// 2. Tags (variable length)
    /// 3. File entries (variable length)
    ///
    /// # Errors
    /// Returns error if:
    /// - Invalid header magic or version
    /// - Truncated or corrupted data
    /// - Invalid UTF-8 strings in paths/names
    /// - Inconsistent counts between header and actual data
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);

        // Parse header
        let header = InstallHeader::read(&mut cursor)?;
        header.validate()?;

        // Parse tags
        let mut tags = Vec::with_capacity(header.tag_count as usize);
        for _ in 0..header.tag_count {
            let tag =
                InstallTag::read_options(&mut cursor, binrw::Endian::Big, header.entry_count)?;
            tags.push(tag);
        }

        // Parse file entries
        let mut entries = Vec::with_capacity(header.entry_count as usize);
        for _ in 0..header.entry_count {
            let entry = InstallFileEntry::read_options(
                &mut cursor,
                binrw::Endian::Big,
                header.ckey_length,
            )?;
            entries.push(entry);
        }

        let manifest = Self {
            header,
            tags,
            entries,
        };

        // Validate internal consistency
        manifest.validate()?;

        Ok(manifest)
    }

    /// Build install manifest to binary data
    ///
    /// Serializes the manifest in the correct binary format with proper
    /// endianness and null-terminated strings.
    pub fn build(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);

        // Write header
        self.header.write(&mut cursor)?;

        // Write tags
        for tag in &self.tags {
            tag.write(&mut cursor)?;
        }

        // Write file entries
        for entry in &self.entries {
            entry.write(&mut cursor)?;
        }

        Ok(buffer)
    }

    /// Validate internal consistency of the manifest
    pub fn validate(&self) -> Result<()> {
        // Validate header
        self.header.validate()?;

        // Validate counts match actual data
        if self.tags.len() != self.header.tag_count as usize {
            return Err(InstallError::BitMaskSizeMismatch {
                expected: self.header.tag_count as usize,
                actual: self.tags.len(),
            });
        }

        if self.entries.len() != self.header.entry_count as usize {
            return Err(InstallError::BitMaskSizeMismatch {
                expected: self.header.entry_count as usize,
                actual: self.entries.len(),
            });
        }

        // Validate all tag bit masks have correct size
        let expected_mask_size = self.header.bit_mask_size();
        for tag in &self.tags {
            if tag.bit_mask.len() != expected_mask_size {
                return Err(InstallError::BitMaskSizeMismatch {
                    expected: expected_mask_size,
                    actual: tag.bit_mask.len(),
                });
            }
        }

        Ok(())
    }

    /// Get total size of all files in the manifest
    pub fn total_install_size(&self) -> u64 {
        self.entries
            .iter()
            .map(|entry| u64::from(entry.file_size))
            .sum()
    }

    /// Find tag by name
    pub fn find_tag(&self, name: &str) -> Option<&InstallTag> {
        self.tags.iter().find(|tag| tag.name == name)
    }

    /// Find mutable tag by name
    pub fn find_tag_mut(&mut self, name: &str) -> Option<&mut InstallTag> {
        self.tags.iter_mut().find(|tag| tag.name == name)
    }

    /// Get files associated with a specific tag
    pub fn get_files_for_tag(&self, tag_name: &str) -> Vec<(usize, &InstallFileEntry)> {
        let Some(tag) = self.find_tag(tag_name) else {
            return Vec::new();
        };

        self.entries
            .iter()
            .enumerate()
            .filter(|(index, _)| tag.has_file(*index))
            .collect()
    }

    /// Get files matching all specified tags (intersection)
    pub fn get_files_for_tags(&self, tag_names: &[&str]) -> Vec<(usize, &InstallFileEntry)> {
        let tags: Vec<&InstallTag> = tag_names
            .iter()
            .filter_map(|name| self.find_tag(name))
            .collect();

        // If any requested tag doesn't exist, return empty
        if tags.is_empty() || tags.len() != tag_names.len() {
            return Vec::new();
        }

        self.entries
            .iter()
            .enumerate()
            .filter(|(index, _)| tags.iter().all(|tag| tag.has_file(*index)))
            .collect()
    }

    /// Get files matching any of the specified tags (union)
    pub fn get_files_for_any_tag(&self, tag_names: &[&str]) -> Vec<(usize, &InstallFileEntry)> {
        let tags: Vec<&InstallTag> = tag_names
            .iter()
            .filter_map(|name| self.find_tag(name))
            .collect();

        if tags.is_empty() {
            return Vec::new();
        }

        self.entries
            .iter()
            .enumerate()
            .filter(|(index, _)| tags.iter().any(|tag| tag.has_file(*index)))
            .collect()
    }

    /// Calculate install size for specific tags
    pub fn calculate_install_size(&self, tag_names: &[&str]) -> u64 {
        self.get_files_for_tags(tag_names)
            .into_iter()
            .map(|(_, entry)| u64::from(entry.file_size))
            .sum()
    }

    /// Get statistics about the manifest
    pub fn stats(&self) -> InstallStats {
        let total_size = self.total_install_size();
        let tagged_files = self
            .tags
            .iter()
            .map(super::tag::InstallTag::file_count)
            .max()
            .unwrap_or(0);

        InstallStats {
            total_files: self.entries.len(),
            total_tags: self.tags.len(),
            total_size,
            tagged_files,
        }
    }

    /// Find files by path pattern (case-insensitive, supports * wildcard)
    pub fn find_files(&self, pattern: &str) -> Vec<(usize, &InstallFileEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.matches_pattern(pattern))
            .collect()
    }

    /// Get unique file extensions in the manifest
    pub fn get_extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self
            .entries
            .iter()
            .filter_map(|entry| entry.extension())
            .map(str::to_lowercase)
            .collect();

        extensions.sort();
        extensions.dedup();
        extensions
    }

    /// Get files by extension (case-insensitive)
    pub fn get_files_by_extension(&self, extension: &str) -> Vec<(usize, &InstallFileEntry)> {
        let ext_lower = extension.to_lowercase();
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| {
                entry
                    .extension()
                    .is_some_and(|e| e.to_lowercase() == ext_lower)
            })
            .collect()
    }

    /// Verify round-trip compatibility
    pub fn verify_round_trip(data: &[u8]) -> Result<()> {
        let manifest = Self::parse(data)?;
        let rebuilt = manifest.build()?;

        if data != rebuilt.as_slice() {
            return Err(InstallError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "Round-trip verification failed: rebuilt data differs from original",
            )));
        }

        Ok(())
    }
}

/// Statistics about an install manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallStats {
    /// Total number of files
    pub total_files: usize,
    /// Total number of tags
    pub total_tags: usize,
    /// Total size of all files in bytes
    pub total_size: u64,
    /// Number of files that have at least one tag
    pub tagged_files: usize,
}

impl crate::CascFormat for InstallManifest {
    fn parse(data: &[u8]) -> std::result::Result<Self, Box<dyn std::error::Error>> {
        Self::parse(data).map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
    }

    fn build(&self) -> std::result::Result<Vec<u8>, Box<dyn std::error::Error>> {
        self.build()
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
    }
}
