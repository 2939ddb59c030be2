//! File format parsers and builders for NGDP/CASC system
//!
#![allow(clippy::cast_possible_truncation)] // Intentional for binary format parsing
#![allow(clippy::cast_possible_wrap)] // Intentional for binary operations
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::uninlined_format_args)] // Backwards compatibility
#![allow(clippy::doc_markdown)] // Many CASC-specific terms don't need backticks
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::similar_names)] // Domain-specific naming patterns
#![allow(clippy::float_cmp)] // Binary format requirements
#![allow(clippy::no_effect_underscore_binding)] // Test placeholders
#![allow(clippy::used_underscore_binding)] // Test variables
#![allow(clippy::needless_pass_by_value)] // Configuration types
#![allow(clippy::redundant_clone)] // Binary format handling
#![allow(clippy::unused_self)] // Future implementation hooks
#![allow(clippy::map_unwrap_or)] // Binary format patterns
#![allow(clippy::redundant_closure)] // Test setup
#![allow(clippy::cast_precision_loss)] // Performance metrics
#![allow(clippy::derive_partial_eq_without_eq)] // Binary format structs
#![allow(clippy::redundant_closure_for_method_calls)] // Iterator chains
#![allow(clippy::unnecessary_wraps)] // Future error handling
#![allow(clippy::unused_async)] // Future implementation hooks
#![allow(clippy::needless_pass_by_ref_mut)] // Future mutability
#![allow(clippy::return_self_not_must_use)] // Builder patterns
#![allow(clippy::use_self)] // Type clarity
#![allow(clippy::map_entry)] // Error handling patterns
#![allow(clippy::clone_on_copy)] // Binary format handling
#![allow(clippy::future_not_send)] // Threading requirements
//! This crate provides parsers (and, where the planner or install operation
//! needs to round-trip a format for its own fixtures, builders) for the file
//! formats the NGDP/CASC fetch core actually consumes.
//!
//! # Supported Formats
//!
//! - **BPSV**: Blizzard Pipe-Separated Values for version and configuration data
//! - **BLTE**: Block Table Encoded format for compressed and encrypted content
//! - **Encoding**: Encoding file format for content key to encoding key mappings
//! - **Install**: Install manifest format for file tagging and selective installation
//! - **Config**: Build and CDN configuration file formats
//! - **Archive**: Archive index and data file operations for CDN content storage
//!
//! Root, download-manifest, TVFS, and patch-application (ZBSDIFF/patch-archive)
//! formats are part of the wider NGDP ecosystem but are not parsed here: the
//! fetch planner and install operation only ever need the encoding file's
//! content-key lookup and the install manifest's tagged entry iteration (see
//! DESIGN.md).

#![warn(missing_docs)]

/// Archive system for NGDP/CASC content storage and retrieval
///
/// This module provides complete support for CDN archive files (.data) and their
/// corresponding index files (.index). Archive files are the primary storage
/// mechanism for game content in NGDP/CASC systems.
///
/// Key features:
/// - **Archive Index Parsing**: Binary format parsing with chunked structure
/// - **Variable-Length Key Support**: Full encoding key support based on footer specification
/// - **Binary Search Operations**: Fast content location with O(log n) lookups
/// - **HTTP Range Requests**: Efficient partial content downloads
/// - **BLTE Integration**: Seamless decompression and decryption support
/// - **CDN Client Operations**: Complete CDN interaction support
/// - **Memory Efficient**: Chunked loading for large indices
///
/// See the [`archive`] module for detailed usage examples and integration patterns.
pub mod archive;
pub mod blte;
pub mod bpsv;
/// Configuration file formats (Build Config, CDN Config, Patch Config, Keyring Config)
pub mod config;
/// Encoding file format for content key to encoding key mappings
pub mod encoding;
/// Install manifest format for file tagging and selective installation
///
/// This module provides complete parsing and building support for CASC install manifests
/// that define which files should be installed and organize them using tags for
/// platform-specific and selective installation.
///
/// See the [`install`] module for detailed usage examples and tag system documentation.
pub mod install;

// Test utilities module
#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
pub(crate) mod test_utils;

/// Common format trait that all formats should implement
pub trait CascFormat: Sized {
    /// Parse from bytes
    fn parse(data: &[u8]) -> Result<Self, Box<dyn std::error::Error>>;

    /// Build to bytes
    fn build(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>>;

    /// Verify round-trip correctness
    fn verify_round_trip(data: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
        let parsed = Self::parse(data)?;
        let rebuilt = parsed.build()?;
        if data != rebuilt.as_slice() {
            return Err("Round-trip verification failed".into());
        }
        Ok(())
    }
}
