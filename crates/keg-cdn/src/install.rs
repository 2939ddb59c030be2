//! Installing a resolved build's selected files onto the local filesystem.
//!
//! Iterates an install manifest's tag-filtered entries, resolves each entry's
//! content key to an encoding key via the build's encoding file, and
//! materializes the file at its target path — decoding a loose object or
//! extracting it from the archive group, whichever holds the encoding key.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use keg_crypto::md5::ContentKey;
use keg_formats::archive::ArchiveFile;
use keg_formats::config::CdnConfig;
use keg_formats::encoding::EncodingFile;
use keg_formats::install::InstallManifest;
use keg_storage::{ObjectKind, Store};
use tracing::warn;

use crate::error::{CdnError, CdnResult};
use crate::group::resolve_archive_group;

/// What happened to one install-manifest entry.
#[derive(Debug, Clone)]
pub enum InstallOutcome {
    /// The file was written at `path`.
    Installed {
        /// Target path the file was written to
        path: PathBuf,
    },
    /// A file already existed at `path`; install refuses to overwrite it.
    AlreadyPresent {
        /// Target path that already existed
        path: PathBuf,
    },
}

/// Summary of one install run.
#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    /// Per-entry outcome, in manifest iteration order
    pub files: Vec<(String, InstallOutcome)>,
    /// Duplicate-filename conflicts: the first-seen content key was kept,
    /// the rest warned about and discarded (see Open Questions).
    pub conflicts: u64,
}

/// Install every entry of `manifest` matching `tags` under `dest_root`.
///
/// An empty `tags` selects every entry. Duplicate filenames that resolve to
/// the same content key are silently coalesced; duplicates with distinct
/// content keys keep the first-seen entry and increment
/// [`InstallReport::conflicts`].
pub async fn install(
    store: &Store,
    cdn_config: &CdnConfig,
    encoding: &EncodingFile,
    manifest: &InstallManifest,
    tags: &[&str],
    dest_root: &Path,
) -> CdnResult<InstallReport> {
    let group = resolve_archive_group(store, cdn_config).await?;
    let mut report = InstallReport::default();
    let mut seen: HashMap<&str, ContentKey> = HashMap::new();

    let selected = if tags.is_empty() {
        manifest.entries.iter().enumerate().collect::<Vec<_>>()
    } else {
        manifest.get_files_for_any_tag(tags)
    };

    for (_, entry) in selected {
        if let Some(prior_key) = seen.get(entry.path.as_str()) {
            if *prior_key != entry.content_key {
                warn!(path = %entry.path, "install conflict: keeping first-seen content key");
                report.conflicts += 1;
            }
            continue;
        }
        seen.insert(entry.path.as_str(), entry.content_key);

        let dest = dest_root.join(entry.path.trim_start_matches(['/', '\\']));
        if dest.exists() {
            report
                .files
                .push((entry.path.clone(), InstallOutcome::AlreadyPresent { path: dest }));
            continue;
        }

        let encoding_key = encoding.find_encoding(&entry.content_key).ok_or_else(|| {
            CdnError::NotFound(format!(
                "no encoding for content key {}",
                entry.content_key.to_hex()
            ))
        })?;
        let hex = encoding_key.to_hex();

        let bytes = if store.has_data(&hex).await {
            read_loose(store, &hex).await?
        } else if let Some((archive_key, offset, size)) = group.find(encoding_key.as_bytes()) {
            read_from_archive(store, archive_key, *offset, u64::from(*size))?
        } else {
            return Err(CdnError::NotFound(format!(
                "encoding key {hex} not resolvable from any local object or archive"
            )));
        };

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&dest, &bytes)?;
        report
            .files
            .push((entry.path.clone(), InstallOutcome::Installed { path: dest }));
    }

    Ok(report)
}

async fn read_loose(store: &Store, key: &str) -> CdnResult<Vec<u8>> {
    let mut file = store.open(ObjectKind::Data, key).await?;
    let mut bytes = Vec::new();
    tokio::io::AsyncReadExt::read_to_end(&mut file, &mut bytes).await?;
    decode_if_blte(bytes)
}

fn read_from_archive(store: &Store, archive_key: &str, offset: u64, size: u64) -> CdnResult<Vec<u8>> {
    let path = store.path(ObjectKind::Data, archive_key)?;
    let file = std::fs::File::open(&path)?;
    let mut archive = ArchiveFile::new(file);
    let raw = archive.read_at_offset(offset, size)?;
    decode_if_blte(raw)
}

/// Loose and archive-extracted bytes are BLTE-framed when the object itself
/// is; small config-adjacent blobs referenced by content key sometimes are
/// not. Detect the magic rather than assume.
fn decode_if_blte(bytes: Vec<u8>) -> CdnResult<Vec<u8>> {
    if bytes.len() >= 4 && &bytes[..4] == b"BLTE" {
        let blte = <keg_formats::blte::BlteFile as keg_formats::CascFormat>::parse(&bytes)
            .map_err(|e| CdnError::Malformed {
                what: "BLTE object".to_string(),
                reason: e.to_string(),
            })?;
        Ok(blte.decompress()?)
    } else {
        Ok(bytes)
    }
}
