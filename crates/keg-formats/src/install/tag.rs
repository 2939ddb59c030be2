//! Install manifest tag system with bit mask operations

use crate::install::error::InstallError;
use binrw::{BinRead, BinResult, BinWrite};
use std::io::{Read, Seek, Write};

/// Tag types used to categorize files in install manifests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TagType {
    /// Platform tag (Windows, Mac, etc.)
    Platform = 0x0001,
    /// Architecture tag (x86, `x86_64`, etc.)
    Architecture = 0x0002,
    /// Locale tag (enUS, deDE, etc.)
    Locale = 0x0003,
    /// Category tag (base, optional, etc.)
    Category = 0x0004,
    /// Unknown tag type (commonly seen in manifests)
    Unknown = 0x0005,
    /// Component tag (game, launcher, etc.)
    Component = 0x0010,
    /// Version tag (live, ptr, beta, etc.)
    Version = 0x0020,
    /// Optimization tag (retail, debug, etc.)
    Optimization = 0x0040,
    /// Region tag (US, EU, KR, etc.)
    Region = 0x0080,
    /// Device tag (desktop, mobile, etc.)
    Device = 0x0100,
    /// Mode tag (online, offline, etc.)
    Mode = 0x0200,
    /// Branch tag (main, experimental, etc.)
    Branch = 0x0400,
    /// Content tag (cinematics, audio, etc.)
    Content = 0x0800,
    /// Feature tag (graphics, physics, etc.)
    Feature = 0x1000,
    /// Expansion tag (base, expansion1, etc.)
    Expansion = 0x2000,
    /// Alternate tag (alternate content version)
    Alternate = 0x4000,
    /// Option tag (optional features)
    Option = 0x8000,
}

impl TagType {
    /// Convert from raw u16 value
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0001 => Some(Self::Platform),
            0x0002 => Some(Self::Architecture),
            0x0003 => Some(Self::Locale),
            0x0004 => Some(Self::Category),
            0x0005 => Some(Self::Unknown),
            0x0010 => Some(Self::Component),
            0x0020 => Some(Self::Version),
            0x0040 => Some(Self::Optimization),
            0x0080 => Some(Self::Region),
            0x0100 => Some(Self::Device),
            0x0200 => Some(Self::Mode),
            0x0400 => Some(Self::Branch),
            0x0800 => Some(Self::Content),
            0x1000 => Some(Self::Feature),
            0x2000 => Some(Self::Expansion),
            0x4000 => Some(Self::Alternate),
            0x8000 => Some(Self::Option),
            _ => None,
        }
    }
}

/// Install tag with name, type, and file associations via bit mask
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTag {
    /// Tag name (e.g., "Windows", "`x86_64`", "enUS")
    pub name: String,
    /// Tag type categorizing the tag's purpose
    pub tag_type: TagType,
    /// Bit mask indicating which files are associated with this tag
    /// Each bit corresponds to a file index (bit 0 = file 0, etc.)
    /// Uses little-endian bit ordering within bytes
    pub bit_mask: Vec<u8>,
}

impl InstallTag {
    /// Create a new install tag
    pub fn new(name: String, tag_type: TagType, entry_count: usize) -> Self {
        let bit_mask_size = entry_count.div_ceil(8);
        Self {
            name,
            tag_type,
            bit_mask: vec![0u8; bit_mask_size],
        }
    }

    /// Check if a file at the given index is associated with this tag
    pub fn has_file(&self, file_index: usize) -> bool {
        let byte_index = file_index / 8;
        let bit_offset = file_index % 8;

        if byte_index >= self.bit_mask.len() {
            return false;
        }

        // Little-endian bit ordering within bytes: bit 0 = LSB
        (self.bit_mask[byte_index] & (1 << bit_offset)) != 0
    }

    /// Associate a file at the given index with this tag
    pub fn add_file(&mut self, file_index: usize) {
        let byte_index = file_index / 8;
        let bit_offset = file_index % 8;

        // Extend bit mask if needed
        if byte_index >= self.bit_mask.len() {
            self.bit_mask.resize(byte_index + 1, 0);
        }

        // Set bit using little-endian ordering
        self.bit_mask[byte_index] |= 1 << bit_offset;
    }

    /// Remove file association at the given index
    pub fn remove_file(&mut self, file_index: usize) {
        let byte_index = file_index / 8;
        let bit_offset = file_index % 8;

        if byte_index >= self.bit_mask.len() {
            return;
        }

        // Clear bit using little-endian ordering
        self.bit_mask[byte_index] &= !(1 << bit_offset);
    }

    /// Count the total number of files associated with this tag
    pub fn file_count(&self) -> usize {
        self.bit_mask
            .iter()
            .map(|byte| byte.count_ones() as usize)
            .sum()
    }

    /// Get all file indices associated with this tag
    pub fn get_files(&self, max_entry_count: usize) -> Vec<usize> {
        let mut files = Vec::new();

        for file_index in 0..max_entry_count {
            if self.has_file(file_index) {
                files.push(file_index);
            }
        }

        files
    }

    /// Compute intersection of bit masks with another tag
    pub fn intersect(&self, other: &Self) -> Vec<u8> {
        let min_len = self.bit_mask.len().min(other.bit_mask.len());
        let mut result = vec![0u8; min_len];

        for (i, result_byte) in result.iter_mut().enumerate().take(min_len) {
            *result_byte = self.bit_mask[i] & other.bit_mask[i];
        }

        result
    }

    /// Compute union of bit masks with another tag
    pub fn union(&self, other: &Self) -> Vec<u8> {
        let max_len = self.bit_mask.len().max(other.bit_mask.len());
        let mut result = vec![0u8; max_len];

        for (i, result_byte) in result.iter_mut().enumerate().take(max_len) {
            let a = self.bit_mask.get(i).copied().unwrap_or(0);
            let b = other.bit_mask.get(i).copied().unwrap_or(0);
            *result_byte = a | b;
        }

        result
    }

    /// Check if this tag is a platform tag
    pub fn is_platform_tag(&self) -> bool {
        matches!(self.tag_type, TagType::Platform)
    }

    /// Check if this tag is required for a specific platform
    pub fn is_required_for_platform(&self, platform: &str) -> bool {
        self.tag_type == TagType::Platform && self.name == platform
    }
}

impl BinRead for InstallTag {
    type Args<'a> = u32; // entry_count for bit mask size

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: binrw::Endian,
        entry_count: Self::Args<'_>,
    ) -> BinResult<Self> {
        // Read null-terminated tag name
        let mut name_bytes = Vec::new();
        loop {
            let byte = u8::read_options(reader, endian, ())?;
            if byte == 0 {
                break;
            }
            name_bytes.push(byte);
        }
        let name = String::from_utf8(name_bytes).map_err(|e| binrw::Error::Custom {
            pos: reader.stream_position().unwrap_or(0),
            err: Box::new(e),
        })?;

        // Read tag type (big-endian)
        let tag_type_value = u16::read_options(reader, binrw::Endian::Big, ())?;
        let tag_type = TagType::from_u16(tag_type_value).ok_or_else(|| binrw::Error::Custom {
            pos: reader.stream_position().unwrap_or(0),
            err: Box::new(InstallError::InvalidTagType(tag_type_value)),
        })?;

        // Read bit mask
        let bit_mask_size = (entry_count as usize).div_ceil(8);
        let mut bit_mask = vec![0u8; bit_mask_size];
        reader.read_exact(&mut bit_mask)?;

        Ok(Self {
            name,
            tag_type,
            bit_mask,
        })
    }
}

impl BinWrite for InstallTag {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        _endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        // Write null-terminated tag name
        writer.write_all(self.name.as_bytes())?;
        writer.write_all(&[0])?;

        // Write tag type (big-endian)
        (self.tag_type as u16).write_options(writer, binrw::Endian::Big, ())?;

        // Write bit mask
        writer.write_all(&self.bit_mask)?;

        Ok(())
    }
}

// Manual WriteEndian implementation required by binrw
impl binrw::meta::WriteEndian for InstallTag {
    const ENDIAN: binrw::meta::EndianKind = binrw::meta::EndianKind::Endian(binrw::Endian::Big);
}
