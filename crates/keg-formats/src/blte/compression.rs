//! BLTE compression and decompression

use super::chunk::CompressionMode;
use super::error::{BlteError, BlteResult};
use keg_crypto::TactKeyStore;
use keg_crypto::salsa20::{decrypt_salsa20, encrypt_salsa20};
use flate2::Compression;
use flate2::read::{ZlibDecoder, ZlibEncoder};
use std::io::Read;

/// Maximum allowed decompression size (1 GB)
///
/// Security: Limits decompression output to prevent denial of service via
/// compression bombs. WoW's largest individual files are typically under
/// 100 MB, so 1 GB provides ample headroom while preventing abuse.
pub const MAX_DECOMPRESSION_SIZE: usize = 1024 * 1024 * 1024;

/// Compress data using specified mode
pub fn compress_chunk(data: &[u8], mode: CompressionMode) -> BlteResult<Vec<u8>> {
    match mode {
        CompressionMode::None => Ok(data.to_vec()),
        CompressionMode::ZLib => {
            let mut encoder = ZlibEncoder::new(data, Compression::default());
            let mut compressed = Vec::new();
            encoder.read_to_end(&mut compressed).map_err(|e| {
                BlteError::CompressionError(format!("ZLib compression failed: {e}"))
            })?;
            Ok(compressed)
        }
        CompressionMode::LZ4 => {
            // LZ4 compression: 8-byte LE decompressed size prefix + single LZ4 block.
            //
            // The WoWDev wiki describes a different format with headerVersion,
            // BE size, and blockShift for sub-blocks. However, Agent.exe 3.13.3
            // (`tact::Codec::DecodeLZ4` at 0x6f5fdb) is a stub that returns
            // error 5 — LZ4 decompression is not implemented in that binary.
            // This implementation uses the 8-byte LE prefix format observed in
            // real WoW BLTE data.
            let decompressed_size = data.len() as u64;

            // Pre-allocate with worst-case size (LZ4 worst case is ~1.06x original size)
            // We need 8 bytes for the size header plus the compressed data
            let max_compressed_size = lz4_flex::block::get_maximum_output_size(data.len());
            let mut result = vec![0u8; 8 + max_compressed_size];

            result[0..8].copy_from_slice(&decompressed_size.to_le_bytes());

            let compressed_len = lz4_flex::block::compress_into(data, &mut result[8..])
                .map_err(|e| BlteError::CompressionError(format!("LZ4 compression failed: {e}")))?;

            // Truncate to actual size
            result.truncate(8 + compressed_len);
            Ok(result)
        }
        CompressionMode::Encrypted => {
            // Encryption mode requires special handling via encrypt_chunk_with_key
            Err(BlteError::CompressionError(
                "Use encrypt_chunk_with_key for encryption mode".to_string(),
            ))
        }
        CompressionMode::Frame => {
            // Nest the data as a single-chunk, uncompressed BLTE frame and
            // serialize it. Real archives rarely author new Frame chunks;
            // this exists to round-trip what decompress_chunk accepts.
            use binrw::BinWrite;
            let inner = super::BlteFile::single_chunk(data.to_vec(), CompressionMode::None)?;
            let mut buf = Vec::new();
            inner
                .write_options(&mut std::io::Cursor::new(&mut buf), binrw::Endian::Big, ())
                .map_err(BlteError::BinRw)?;
            Ok(buf)
        }
    }
}

/// Decompress chunk data
pub fn decompress_chunk(data: &[u8], mode: CompressionMode) -> BlteResult<Vec<u8>> {
    match mode {
        CompressionMode::None => Ok(data.to_vec()),
        CompressionMode::ZLib => {
            let mut decoder = ZlibDecoder::new(data);
            let mut decompressed = Vec::new();

            // Read in chunks to enforce size limit
            let mut buffer = [0u8; 8192];
            loop {
                let bytes_read = decoder.read(&mut buffer).map_err(|e| {
                    BlteError::CompressionError(format!("ZLib decompression failed: {e}"))
                })?;

                if bytes_read == 0 {
                    break;
                }

                // Check size limit before extending
                if decompressed.len() + bytes_read > MAX_DECOMPRESSION_SIZE {
                    return Err(BlteError::CompressionError(format!(
                        "Decompressed size exceeds limit of {} bytes",
                        MAX_DECOMPRESSION_SIZE
                    )));
                }

                decompressed.extend_from_slice(&buffer[..bytes_read]);
            }

            Ok(decompressed)
        }
        CompressionMode::LZ4 => {
            // LZ4 decompression: 8-byte LE decompressed size prefix + single LZ4 block.
            // See compression comment above for format rationale.
            if data.len() < 8 {
                return Err(BlteError::CompressionError(
                    "LZ4 data too short - missing size header".to_string(),
                ));
            }

            let size_header = u64::from_le_bytes(
                data[0..8]
                    .try_into()
                    .map_err(|_| BlteError::CompressionError("Invalid size header".to_string()))?,
            );

            // Convert to usize with bounds checking
            let decompressed_size = usize::try_from(size_header).map_err(|_| {
                BlteError::CompressionError("Decompressed size too large".to_string())
            })?;

            // Security: Check against maximum decompression size to prevent DoS
            if decompressed_size > MAX_DECOMPRESSION_SIZE {
                return Err(BlteError::CompressionError(format!(
                    "LZ4 decompressed size {} exceeds limit of {} bytes",
                    decompressed_size, MAX_DECOMPRESSION_SIZE
                )));
            }

            // Decompress the remaining data
            let compressed_data = &data[8..];

            let decompressed = lz4_flex::block::decompress(compressed_data, decompressed_size)
                .map_err(|e| {
                    BlteError::CompressionError(format!("LZ4 decompression failed: {e}"))
                })?;

            // Validate decompressed size matches expected
            if decompressed.len() != decompressed_size {
                return Err(BlteError::CompressionError(format!(
                    "LZ4 decompression size mismatch: expected {decompressed_size}, got {}",
                    decompressed.len()
                )));
            }

            Ok(decompressed)
        }
        CompressionMode::Encrypted => {
            // Encryption mode requires special handling via decrypt_chunk_with_keys
            Err(BlteError::CompressionError(
                "Use decrypt_chunk_with_keys for encrypted chunks".to_string(),
            ))
        }
        CompressionMode::Frame => {
            use binrw::BinRead;
            let nested = super::BlteFile::read_options(
                &mut std::io::Cursor::new(data),
                binrw::Endian::Big,
                (),
            )
            .map_err(BlteError::BinRw)?;
            nested.decompress()
        }
    }
}


/// Encryption specification for BLTE chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncryptionSpec {
    /// 64-bit key name
    pub key_name: u64,
    /// 32-bit initialization vector
    pub iv: [u8; 4],
    /// Encryption type (0x53 for `Salsa20`, 0x41 for `ARC4`)
    pub encryption_type: u8,
}

impl EncryptionSpec {
    /// Create new encryption specification for `Salsa20`
    pub fn salsa20(key_name: u64, iv: [u8; 4]) -> Self {
        Self {
            key_name,
            iv,
            encryption_type: 0x53, // 'S' for Salsa20
        }
    }

    /// Create new encryption specification for `ARC4`
    pub fn arc4(key_name: u64, iv: [u8; 4]) -> Self {
        Self {
            key_name,
            iv,
            encryption_type: 0x41, // 'A' for ARC4
        }
    }

    /// Check if this is `Salsa20` encryption
    pub fn is_salsa20(&self) -> bool {
        self.encryption_type == 0x53
    }

    /// Check if this is `ARC4` encryption
    pub fn is_arc4(&self) -> bool {
        self.encryption_type == 0x41
    }
}

/// Encrypt chunk data with BLTE encryption format
///
/// Format: `[key_name_size:1] [key_name:8] [iv_size:1] [iv:4] [type:1] [encrypted_data...]`
///
/// Note: The caller must prepend the 0x45 mode byte
pub fn encrypt_chunk_with_key(
    data: &[u8],
    spec: EncryptionSpec,
    key: &[u8; 16],
    block_index: usize,
) -> BlteResult<Vec<u8>> {
    // Encrypt the data based on encryption type
    let encrypted_data = match spec.encryption_type {
        0x53 => {
            // Salsa20 encryption
            encrypt_salsa20(data, key, &spec.iv, block_index).map_err(|e| {
                BlteError::CompressionError(format!("Salsa20 encryption failed: {e}"))
            })?
        }
        0x41 => {
            // ARC4 encryption
            let mut cipher = keg_crypto::Arc4Cipher::new(key.as_slice()).map_err(|e| {
                BlteError::CompressionError(format!("ARC4 initialization failed: {e}"))
            })?;

            cipher.encrypt(data)
        }
        _ => {
            return Err(BlteError::CompressionError(format!(
                "Unknown encryption type: 0x{:02X}",
                spec.encryption_type
            )));
        }
    };

    // Build encrypted chunk header
    let mut result = Vec::new();

    // Key name size (always 8 for 64-bit keys)
    result.push(8);

    // Key name (64-bit little-endian)
    result.extend_from_slice(&spec.key_name.to_le_bytes());

    // IV size (always 4)
    result.push(4);

    // IV (4 bytes)
    result.extend_from_slice(&spec.iv);

    // Encryption type
    result.push(spec.encryption_type);

    // Encrypted data
    result.extend_from_slice(&encrypted_data);

    Ok(result)
}

/// Parse and decrypt encrypted chunk data
///
/// Expects data without the 0x45 mode byte
pub fn decrypt_chunk_with_keys(
    data: &[u8],
    key_store: &TactKeyStore,
    block_index: usize,
) -> BlteResult<Vec<u8>> {
    if data.len() < 17 {
        return Err(BlteError::CompressionError(format!(
            "Encrypted chunk too short: {} bytes (minimum 17)",
            data.len()
        )));
    }

    let mut offset = 0;

    // Read key name size
    let key_name_size = data[offset];
    offset += 1;

    if key_name_size != 8 {
        return Err(BlteError::CompressionError(format!(
            "Invalid key name size: {key_name_size} (expected 8)"
        )));
    }

    if data.len() < offset + 8 {
        return Err(BlteError::CompressionError(
            "Encrypted chunk too short for key name".to_string(),
        ));
    }

    // Read key name (64-bit little-endian)
    let key_name = u64::from_le_bytes(
        data[offset..offset + 8]
            .try_into()
            .map_err(|_| BlteError::CompressionError("Invalid key name".to_string()))?,
    );
    offset += 8;

    // Look up key
    let key = key_store
        .get(key_name)
        .ok_or(BlteError::EncryptedChunk { key_name })?;

    if data.len() < offset + 1 {
        return Err(BlteError::CompressionError(
            "Encrypted chunk too short for IV size".to_string(),
        ));
    }

    // Read IV size (must be 4 or 8, matching TACTSharp and CascLib)
    let iv_size = data[offset];
    offset += 1;

    if iv_size != 4 && iv_size != 8 {
        return Err(BlteError::InvalidIvSize { actual: iv_size });
    }

    let iv_len = iv_size as usize;
    if data.len() < offset + iv_len {
        return Err(BlteError::CompressionError(
            "Encrypted chunk too short for IV".to_string(),
        ));
    }

    // Read IV (4 or 8 bytes)
    let iv = &data[offset..offset + iv_len];
    offset += iv_len;

    if data.len() < offset + 1 {
        return Err(BlteError::CompressionError(
            "Encrypted chunk too short for encryption type".to_string(),
        ));
    }

    // Read encryption type
    let encryption_type = data[offset];
    offset += 1;

    // Get encrypted data
    let encrypted_data = &data[offset..];

    // Decrypt based on encryption type
    let decrypted_data = match encryption_type {
        0x53 => {
            // Salsa20 decryption (accepts 4 or 8 byte IV)
            decrypt_salsa20(encrypted_data, key, iv, block_index).map_err(|e| {
                BlteError::CompressionError(format!("Salsa20 decryption failed: {e}"))
            })?
        }
        0x41 => {
            // ARC4 decryption
            let mut cipher = keg_crypto::Arc4Cipher::new(key.as_slice()).map_err(|e| {
                BlteError::CompressionError(format!("ARC4 initialization failed: {e}"))
            })?;

            cipher.decrypt(encrypted_data)
        }
        _ => {
            return Err(BlteError::CompressionError(format!(
                "Unknown encryption type: 0x{encryption_type:02X}"
            )));
        }
    };

    // Check if decrypted data has a compression mode marker
    if !decrypted_data.is_empty()
        && let Some(inner_mode) = CompressionMode::from_byte(decrypted_data[0])
    {
        // Nested encryption (E inside E) is not valid
        if inner_mode == CompressionMode::Encrypted {
            return Err(BlteError::NestedEncryption);
        }
        // Decompress the decrypted data
        return decompress_chunk(&decrypted_data[1..], inner_mode);
    }

    Ok(decrypted_data)
}
