//! Archive-group resolution shared by the fetch planner and the install
//! operation: map an encoding key to the archive that holds it.
//!
//! Prefers a downloaded standalone group-index object (`cdn-config.archive-group`)
//! when present; otherwise synthesizes the group by merging each archive's own
//! index in `cdn-config.archives` order, first occurrence wins on duplicate keys.

use std::collections::HashMap;
use std::fs::File;

use keg_formats::archive::{ArchiveGroup, ArchiveIndex};
use keg_formats::config::CdnConfig;
use keg_storage::{ObjectKind, Store};

use crate::error::{CdnError, CdnResult};

/// Resolved encoding-key → (archive content key, offset, size) view over
/// either a downloaded group-index object or a synthesized merge of each
/// archive's own index.
#[derive(Debug, Default)]
pub struct ResolvedGroup {
    entries: HashMap<Vec<u8>, (String, u64, u32)>,
}

impl ResolvedGroup {
    /// Look up the archive location for `encoding_key`, if resolvable
    /// through this group.
    pub fn find(&self, encoding_key: &[u8]) -> Option<&(String, u64, u32)> {
        self.entries.get(encoding_key)
    }
}

/// Load the archive-group view for `cdn_config`: either the downloaded
/// group-index object, or a synthesized merge of each archive's own index
/// with first-occurrence-wins semantics.
pub async fn resolve_archive_group(store: &Store, cdn_config: &CdnConfig) -> CdnResult<ResolvedGroup> {
    let archives = cdn_config.archives();

    if let Some(group_key) = cdn_config.archive_group() {
        if store.has_index(group_key).await {
            let path = store.path(ObjectKind::DataIndex, group_key)?;
            let file = File::open(&path)?;
            let mut reader = std::io::BufReader::new(file);
            let parsed = ArchiveGroup::parse(&mut reader)?;
            let mut entries = HashMap::with_capacity(parsed.entries.len());
            for entry in parsed.entries {
                let archive_key = archives
                    .get(entry.archive_index as usize)
                    .map(|a| a.content_key.clone())
                    .ok_or_else(|| CdnError::Malformed {
                        what: "archive group".to_string(),
                        reason: format!("archive index {} out of range", entry.archive_index),
                    })?;
                entries
                    .entry(entry.encoding_key)
                    .or_insert((archive_key, u64::from(entry.offset), entry.size));
            }
            return Ok(ResolvedGroup { entries });
        }
    }

    let mut entries = HashMap::new();
    for archive in &archives {
        if !store.has_index(&archive.content_key).await {
            continue;
        }
        let path = store.path(ObjectKind::DataIndex, &archive.content_key)?;
        let file = File::open(&path)?;
        let index = ArchiveIndex::parse(file)?;
        for entry in &index.entries {
            entries
                .entry(entry.encoding_key.clone())
                .or_insert((archive.content_key.clone(), entry.offset, entry.size));
        }
    }
    Ok(ResolvedGroup { entries })
}
