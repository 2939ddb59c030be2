//! BLTE chunk data structures and compression modes

use binrw::io::{Read, Seek, Write};
use binrw::{BinRead, BinResult, BinWrite};

use super::error::{BlteError, BlteResult};

/// BLTE compression modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CompressionMode {
    /// No compression (mode 'N')
    None = b'N',
    /// `ZLib` compression (mode 'Z')
    ZLib = b'Z',
    /// LZ4 compression (mode '4')
    LZ4 = b'4',
    /// Encrypted (mode 'E')
    Encrypted = b'E',
    /// Nested BLTE frame (mode 'F'), recursively decoded
    Frame = b'F',
}

impl CompressionMode {
    /// Parse compression mode from byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'N' => Some(Self::None),
            b'Z' => Some(Self::ZLib),
            b'4' => Some(Self::LZ4),
            b'E' => Some(Self::Encrypted),
            b'F' => Some(Self::Frame),
            _ => None,
        }
    }

    /// Get the byte representation
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Chunk data with compression
#[derive(Debug, Clone)]
pub struct ChunkData {
    /// Compression mode
    pub mode: CompressionMode,
    /// Compressed data (without mode byte)
    pub data: Vec<u8>,
    /// Original decompressed size (for validation)
    decompressed_size: Option<usize>,
}

impl BinRead for ChunkData {
    type Args<'a> = (usize,); // compressed_size from ChunkInfo

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: binrw::Endian,
        args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let (compressed_size,) = args;

        if compressed_size == 0 {
            return Err(binrw::Error::Custom {
                pos: 0,
                err: Box::new(BlteError::EmptyChunk),
            });
        }

        // Read compression mode byte directly using binrw
        let mode_byte = u8::read_options(reader, endian, ())?;

        let mode = CompressionMode::from_byte(mode_byte).ok_or_else(|| binrw::Error::Custom {
            pos: 0,
            err: Box::new(BlteError::UnknownCompressionMode(mode_byte)),
        })?;

        // Read remaining data
        let data_size = compressed_size - 1;
        let mut data = vec![0u8; data_size];
        reader.read_exact(&mut data)?;

        Ok(Self {
            mode,
            data,
            decompressed_size: None,
        })
    }
}

impl BinWrite for ChunkData {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        _endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        // Write compression mode byte
        writer.write_all(&[self.mode.as_byte()])?;

        // Write compressed data
        writer.write_all(&self.data)?;

        Ok(())
    }
}

impl ChunkData {
    /// Create a new chunk with specified compression mode
    pub fn new(data: Vec<u8>, mode: CompressionMode) -> BlteResult<Self> {
        let decompressed_size = data.len();

        if mode == CompressionMode::None {
            Ok(Self {
                mode,
                data,
                decompressed_size: Some(decompressed_size),
            })
        } else {
            // Use the compression module to compress the data
            let compressed_data = super::compression::compress_chunk(&data, mode)?;
            Ok(Self {
                mode,
                data: compressed_data,
                decompressed_size: Some(decompressed_size),
            })
        }
    }

    /// Create from already compressed data
    pub fn from_compressed(
        mode: CompressionMode,
        data: Vec<u8>,
        decompressed_size: Option<usize>,
    ) -> Self {
        Self {
            mode,
            data,
            decompressed_size,
        }
    }

    /// Get the compressed data including mode byte
    pub fn compressed_data(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(1 + self.data.len());
        result.push(self.mode.as_byte());
        result.extend_from_slice(&self.data);
        result
    }

    /// Get the compressed size (including mode byte)
    pub fn compressed_size(&self) -> usize {
        1 + self.data.len()
    }

    /// Get the decompressed size if known
    pub fn decompressed_size(&self) -> usize {
        self.decompressed_size.unwrap_or(self.data.len())
    }

    /// Decompress the chunk data.
    ///
    /// An `Encrypted` chunk cannot be decompressed without a key; this
    /// parses just enough of the chunk to report which key it names and
    /// returns [`BlteError::EncryptedChunk`] rather than failing opaquely.
    pub fn decompress(&self, _chunk_index: usize) -> BlteResult<Vec<u8>> {
        use super::compression::decompress_chunk;

        if self.mode == CompressionMode::Encrypted {
            let key_name = super::encryption::EncryptedHeader::read(&mut binrw::io::Cursor::new(
                &self.data,
            ))
            .map(|header| header.key_id())
            .unwrap_or(0);
            return Err(BlteError::EncryptedChunk { key_name });
        }

        decompress_chunk(&self.data, self.mode)
    }

    /// Verify checksum if provided
    pub fn verify_checksum(&self, checksum: &[u8; 16]) -> bool {
        use keg_crypto::md5::ContentKey;

        if *checksum == [0u8; 16] {
            return true; // No checksum to verify
        }

        let compressed = self.compressed_data();
        let calculated = ContentKey::from_data(&compressed);
        calculated.as_bytes() == checksum
    }
}
