//! Cryptographic operations for NGDP/CASC system
//!
//! This crate provides the cryptographic primitives used throughout the CASC
//! system for content hashing, integrity verification, and encryption.
//!
//! # Components
//!
//! - **Hashing**: MD5 for content keys, Jenkins96 for archive indices
//! - **Encryption**: Salsa20 stream cipher for content protection, ARC4 for legacy blocks
//! - **Key Management**: TACT encryption key storage and lookup
//!
//! # Examples
//!
//! ## Content Key Generation
//!
//! ```
//! use keg_crypto::md5::ContentKey;
//!
//! let data = b"Hello, World!";
//! let content_key = ContentKey::from_data(data);
//! println!("Content key: {}", content_key);
//! ```
//!
//! ## Jenkins96 Hashing
//!
//! ```
//! use keg_crypto::jenkins::Jenkins96;
//!
//! let hash = Jenkins96::hash(b"test data");
//! println!("Jenkins96: {}", hash);
//! ```

#![warn(missing_docs)]

pub mod arc4;
pub mod error;
pub mod jenkins;
pub mod keys;
pub mod md5;
pub mod salsa20;

pub use error::CryptoError;

// Re-export commonly used types
pub use arc4::Arc4Cipher;
pub use jenkins::{Jenkins96, hashlittle, hashlittle2};
pub use keys::{TactKey, TactKeyStore};
pub use md5::{ContentKey, EncodingKey, FileDataId};
pub use salsa20::Salsa20Cipher;
