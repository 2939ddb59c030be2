//! Patch Config file format implementation
//!
//! Patch Config files contain patch information including patch hashes, sizes,
//! and entry mappings for encoded content.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};

use super::is_valid_md5_hex;

/// Patch Configuration containing patch metadata and entry mappings
#[derive(Debug, Clone)]
pub struct PatchConfig {
    /// Basic patch information (patch hash, size, etc.)
    properties: HashMap<String, String>,
    /// Patch entries mapping types to content information
    entries: Vec<PatchEntry>,
}

/// Information about a patch entry
#[derive(Debug, Clone)]
pub struct PatchEntry {
    /// Type of entry (e.g., "encoding")
    pub entry_type: String,
    /// Content key hash
    pub content_key: String,
    /// Content size in bytes
    pub content_size: u64,
    /// Encoding key hash
    pub encoding_key: String,
    /// Encoded size in bytes
    pub encoded_size: u64,
}

impl PatchConfig {
    /// Create a new empty `PatchConfig`
    pub fn new() -> Self {
        Self {
            properties: HashMap::new(),
            entries: Vec::new(),
        }
    }

    /// Parse `PatchConfig` from a reader
    pub fn parse<R: Read>(reader: R) -> Result<Self, PatchConfigError> {
        let reader = BufReader::new(reader);
        let mut properties = HashMap::new();
        let mut entries = Vec::new();

        for line in reader.lines() {
            let line = line.map_err(PatchConfigError::IoError)?;
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            // Parse patch-entry lines separately
            if line.starts_with("patch-entry") {
                let entry = Self::parse_patch_entry(line)?;
                entries.push(entry);
                continue;
            }

            // Parse regular key-value pairs
            if let Some((key, value)) = Self::parse_key_value(line) {
                properties.insert(key, value);
            }
        }

        Ok(Self {
            properties,
            entries,
        })
    }

    /// Parse a key-value line
    fn parse_key_value(line: &str) -> Option<(String, String)> {
        let mut parts = line.splitn(2, " = ");
        let key = parts.next()?.trim();
        let value = parts.next()?.trim();

        // Validate key format (alphanumeric plus hyphens)
        if key
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            Some((key.to_string(), value.to_string()))
        } else {
            None
        }
    }

    /// Parse a patch-entry line
    fn parse_patch_entry(line: &str) -> Result<PatchEntry, PatchConfigError> {
        // Format: patch-entry = <type> <content_key> <content_size> <encoding_key> <encoded_size>
        let parts: Vec<&str> = line.split_whitespace().collect();

        if parts.len() < 6 || parts.len() > 7 {
            return Err(PatchConfigError::InvalidPatchEntry(format!(
                "Expected 6-7 parts, found {}: {}",
                parts.len(),
                line
            )));
        }

        // Skip "patch-entry" and "="
        if parts[0] != "patch-entry" || parts[1] != "=" {
            return Err(PatchConfigError::InvalidPatchEntry(format!(
                "Invalid patch-entry format: {line}"
            )));
        }

        let entry_type = parts[2].to_string();
        let content_key = parts[3].to_string();
        let content_size = parts[4]
            .parse::<u64>()
            .map_err(|_| PatchConfigError::InvalidSize(parts[4].to_string()))?;
        let encoding_key = parts[5].to_string();

        // Handle encoded size - either provided as 7th part or defaults to content size
        let encoded_size = if parts.len() == 7 {
            parts[6]
                .parse::<u64>()
                .map_err(|_| PatchConfigError::InvalidSize(parts[6].to_string()))?
        } else {
            content_size // Default to content size if not provided
        };

        // Validate hash formats
        if !is_valid_md5_hex(&content_key) {
            return Err(PatchConfigError::InvalidHash(content_key));
        }
        if !is_valid_md5_hex(&encoding_key) {
            return Err(PatchConfigError::InvalidHash(encoding_key));
        }

        Ok(PatchEntry {
            entry_type,
            content_key,
            content_size,
            encoding_key,
            encoded_size,
        })
    }

    /// Build the config file content
    pub fn build(&self) -> Vec<u8> {
        let mut output = Vec::new();

        // Write header comment
        let _ = writeln!(output, "# Patch Configuration");

        // Write properties in sorted order for consistency
        let property_order = ["patch", "patch-size"];

        // Write ordered properties first
        for key in &property_order {
            if let Some(value) = self.properties.get(*key) {
                let _ = writeln!(output, "{key} = {value}");
            }
        }

        // Write remaining properties
        let mut remaining: Vec<_> = self
            .properties
            .keys()
            .filter(|k| !property_order.contains(&k.as_str()))
            .collect();
        remaining.sort();

        for key in remaining {
            let value = &self.properties[key];
            let _ = writeln!(output, "{key} = {value}");
        }

        // Write patch entries
        for entry in &self.entries {
            let _ = writeln!(
                output,
                "patch-entry = {} {} {} {} {}",
                entry.entry_type,
                entry.content_key,
                entry.content_size,
                entry.encoding_key,
                entry.encoded_size
            );
        }

        output
    }

    /// Get the main patch hash
    pub fn patch_hash(&self) -> Option<&str> {
        self.properties
            .get("patch")
            .map(std::string::String::as_str)
    }

    /// Get the patch size
    pub fn patch_size(&self) -> Option<u64> {
        self.properties
            .get("patch-size")
            .and_then(|s| s.parse().ok())
    }

    /// Get all patch entries
    pub fn entries(&self) -> &[PatchEntry] {
        &self.entries
    }

    /// Get patch entries of a specific type
    pub fn entries_by_type(&self, entry_type: &str) -> Vec<&PatchEntry> {
        self.entries
            .iter()
            .filter(|e| e.entry_type == entry_type)
            .collect()
    }

    /// Set the main patch hash
    pub fn set_patch_hash(&mut self, hash: impl Into<String>) {
        self.properties.insert("patch".to_string(), hash.into());
    }

    /// Set the patch size
    pub fn set_patch_size(&mut self, size: u64) {
        self.properties
            .insert("patch-size".to_string(), size.to_string());
    }

    /// Add a patch entry
    pub fn add_entry(&mut self, entry: PatchEntry) {
        self.entries.push(entry);
    }

    /// Remove all entries of a specific type
    pub fn remove_entries_by_type(&mut self, entry_type: &str) {
        self.entries.retain(|e| e.entry_type != entry_type);
    }

    /// Get a raw property value
    pub fn get_property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(std::string::String::as_str)
    }

    /// Set a raw property value
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), PatchConfigError> {
        // Must have patch hash
        if let Some(patch_hash) = self.patch_hash() {
            if !is_valid_md5_hex(patch_hash) {
                return Err(PatchConfigError::InvalidHash(patch_hash.to_string()));
            }
        } else {
            return Err(PatchConfigError::MissingPatch);
        }

        // Must have patch size
        if self.patch_size().is_none() {
            return Err(PatchConfigError::MissingPatchSize);
        }

        // Validate all patch entries
        for entry in &self.entries {
            if !is_valid_md5_hex(&entry.content_key) {
                return Err(PatchConfigError::InvalidHash(entry.content_key.clone()));
            }
            if !is_valid_md5_hex(&entry.encoding_key) {
                return Err(PatchConfigError::InvalidHash(entry.encoding_key.clone()));
            }

            if entry.entry_type.is_empty() {
                return Err(PatchConfigError::EmptyEntryType);
            }
        }

        Ok(())
    }

    /// Check if config has any entries
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.entries.is_empty()
    }

    /// Get number of patch entries
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Get number of properties
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// Clear all entries
    pub fn clear_entries(&mut self) {
        self.entries.clear();
    }

    /// Clear all properties
    pub fn clear_properties(&mut self) {
        self.properties.clear();
    }
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PatchEntry {
    /// Create a new patch entry
    pub fn new(
        entry_type: impl Into<String>,
        content_key: impl Into<String>,
        content_size: u64,
        encoding_key: impl Into<String>,
        encoded_size: u64,
    ) -> Self {
        Self {
            entry_type: entry_type.into(),
            content_key: content_key.into(),
            content_size,
            encoding_key: encoding_key.into(),
            encoded_size,
        }
    }

    /// Check if this entry matches a specific type
    pub fn is_type(&self, entry_type: &str) -> bool {
        self.entry_type == entry_type
    }
}

/// Patch config parsing and validation errors
#[derive(Debug, thiserror::Error)]
pub enum PatchConfigError {
    #[error("I/O error: {0}")]
    IoError(std::io::Error),
    #[error("invalid patch entry format: {0}")]
    InvalidPatchEntry(String),
    #[error("invalid size value: {0}")]
    InvalidSize(String),
    #[error("invalid hash format: {0}")]
    InvalidHash(String),
    #[error("missing patch field")]
    MissingPatch,
    #[error("missing patch-size field")]
    MissingPatchSize,
    #[error("empty entry type")]
    EmptyEntryType,
}

impl crate::CascFormat for PatchConfig {
    fn parse(data: &[u8]) -> Result<Self, Box<dyn std::error::Error>> {
        Self::parse(data).map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
    }

    fn build(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        Ok(self.build())
    }
}
