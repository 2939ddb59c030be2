//! BLTE (Block Table Encoded) format implementation
//!
//! BLTE is NGDP's container format for compressed and optionally encrypted content.
//! It provides block-based compression, encryption support, and efficient streaming
//! capabilities for game data delivery.
//!
//! # Features
//!
//! - Parser and builder for all BLTE modes
//! - Support for single and multi-chunk files
//! - Compression modes: None, `ZLib`, LZ4
//! - Encryption support: Salsa20, ARC4
//! - Round-trip validation

mod builder;
mod chunk;
mod compression;
mod encryption;
mod error;
mod header;

pub use builder::BlteBuilder;
pub use chunk::{ChunkData, CompressionMode};
pub use compression::{
    EncryptionSpec, compress_chunk, decompress_chunk, decrypt_chunk_with_keys,
    encrypt_chunk_with_key,
};
pub use encryption::{EncryptedHeader, EncryptionType};
pub use error::{BlteError, BlteResult};
pub use header::{BlteHeader, ChunkInfo, HeaderFlags};

use binrw::io::{Read, Seek, SeekFrom, Write};
use binrw::{BinRead, BinResult, BinWrite};
use keg_crypto::TactKeyStore;

/// Complete BLTE file structure
#[derive(Debug, Clone)]
pub struct BlteFile {
    /// BLTE header
    pub header: BlteHeader,
    /// Chunk data
    pub chunks: Vec<ChunkData>,
}

impl BinRead for BlteFile {
    type Args<'a> = ();

    #[allow(clippy::cast_possible_truncation)]
    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        // Read header
        let header = BlteHeader::read_options(reader, endian, ())?;

        // Read chunks based on header type
        let mut chunks = Vec::new();

        if header.is_single_chunk() {
            // For single chunk, we need to read the rest of the file
            // Get current position to calculate remaining size
            let start_pos = reader.stream_position()?;
            let end_pos = reader.seek(SeekFrom::End(0))?;
            reader.seek(SeekFrom::Start(start_pos))?;

            // Safe cast: file positions shouldn't exceed usize
            let chunk_size = (end_pos - start_pos) as usize;
            if chunk_size > 0 {
                let chunk = ChunkData::read_options(reader, endian, (chunk_size,))?;
                chunks.push(chunk);
            }
        } else {
            // Multi-chunk: read based on chunk info
            if let Some(ref extended) = header.extended {
                for info in &extended.chunk_infos {
                    let chunk =
                        ChunkData::read_options(reader, endian, (info.compressed_size as usize,))?;
                    chunks.push(chunk);
                }
            }
        }

        Ok(Self { header, chunks })
    }
}

impl BinWrite for BlteFile {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        // Write header
        self.header.write_options(writer, endian, ())?;

        // Write chunks
        for chunk in &self.chunks {
            chunk.write_options(writer, endian, ())?;
        }

        Ok(())
    }
}

impl BlteFile {
    /// Create a new single-chunk BLTE file
    pub fn single_chunk(data: Vec<u8>, mode: CompressionMode) -> BlteResult<Self> {
        Ok(Self {
            header: BlteHeader::single_chunk(),
            chunks: vec![ChunkData::new(data, mode)?],
        })
    }

    /// Create a new multi-chunk BLTE file
    pub fn multi_chunk(chunks: Vec<ChunkData>) -> BlteResult<Self> {
        let header = BlteHeader::multi_chunk(&chunks)?;
        Ok(Self { header, chunks })
    }

    /// Decompress all chunks and return the complete data
    ///
    /// Performance: Pre-allocates the output buffer based on the total
    /// decompressed size from chunk headers or chunk metadata.
    pub fn decompress(&self) -> BlteResult<Vec<u8>> {
        // Performance: Pre-allocate with estimated total decompressed size
        let total_size = self.estimate_decompressed_size();
        let mut result = Vec::with_capacity(total_size);

        for (index, chunk) in self.chunks.iter().enumerate() {
            let decompressed = chunk.decompress(index)?;
            result.extend_from_slice(&decompressed);
        }
        Ok(result)
    }

    /// Decompress all chunks with decryption support
    ///
    /// Encrypted BLTE files must use the extended (multi-chunk) header format.
    /// Single-chunk encrypted files are rejected.
    ///
    /// Performance: Pre-allocates the output buffer based on the total
    /// decompressed size from chunk headers or chunk metadata.
    pub fn decompress_with_keys(&self, key_store: &TactKeyStore) -> BlteResult<Vec<u8>> {
        // Single-chunk encrypted BLTE is not valid. The BLTE format requires
        // encrypted content to use the extended header with a chunk table.
        if self.header.is_single_chunk()
            && self
                .chunks
                .first()
                .is_some_and(|c| c.mode == CompressionMode::Encrypted)
        {
            return Err(BlteError::SingleChunkEncrypted);
        }

        // Performance: Pre-allocate with estimated total decompressed size
        let total_size = self.estimate_decompressed_size();
        let mut result = Vec::with_capacity(total_size);

        for (index, chunk) in self.chunks.iter().enumerate() {
            let decompressed = if chunk.mode == CompressionMode::Encrypted {
                // Decrypt encrypted chunks
                decrypt_chunk_with_keys(&chunk.data, key_store, index)?
            } else {
                // Regular decompression for non-encrypted chunks
                chunk.decompress(index)?
            };
            result.extend_from_slice(&decompressed);
        }
        Ok(result)
    }

    /// Estimate total decompressed size from header or chunk metadata
    fn estimate_decompressed_size(&self) -> usize {
        // Try to get size from extended header first (most accurate)
        if let Some(ref extended) = self.header.extended {
            let total: u64 = extended
                .chunk_infos
                .iter()
                .map(|info| u64::from(info.decompressed_size))
                .sum();
            // Saturate to usize max to handle potential overflow gracefully
            return usize::try_from(total).unwrap_or(usize::MAX);
        }

        // Fall back to chunk-level estimates
        self.chunks.iter().map(|c| c.decompressed_size()).sum()
    }

    /// Compress data with automatic chunking
    pub fn compress(data: &[u8], chunk_size: usize, mode: CompressionMode) -> BlteResult<Self> {
        if data.len() <= chunk_size {
            // Single chunk
            Self::single_chunk(data.to_vec(), mode)
        } else {
            // Multi-chunk
            let mut chunks = Vec::new();
            let mut offset = 0;

            while offset < data.len() {
                let end = (offset + chunk_size).min(data.len());
                let chunk_data = data[offset..end].to_vec();
                chunks.push(ChunkData::new(chunk_data, mode)?);
                offset = end;
            }

            Self::multi_chunk(chunks)
        }
    }
}

impl crate::CascFormat for BlteFile {
    fn parse(data: &[u8]) -> Result<Self, Box<dyn std::error::Error>> {
        use std::io::Cursor;
        let mut cursor = Cursor::new(data);
        Self::read_options(&mut cursor, binrw::Endian::Big, ())
            .map_err(|e| Box::new(BlteError::BinRw(e)) as Box<dyn std::error::Error>)
    }

    fn build(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        use std::io::Cursor;
        let mut data = Vec::new();
        let mut cursor = Cursor::new(&mut data);
        self.write_options(&mut cursor, binrw::Endian::Big, ())
            .map_err(|e| Box::new(BlteError::BinRw(e)) as Box<dyn std::error::Error>)?;
        Ok(data)
    }
}
