//! Metadata-graph fetch planner: versions → configs → indices → bodies.
//!
//! Walks the DAG described by a set of resolved builds (`versions` rows that
//! have already been matched to a product/region), deduplicating content
//! keys across builds and applying the warn-and-skip-on-network-failure /
//! abort-on-integrity-failure policy described at the crate root.

use std::collections::HashSet;

use keg_formats::blte::BlteFile;
use keg_formats::config::{BuildConfig, CdnConfig, PatchConfig};
use keg_formats::encoding::EncodingFile;
use keg_storage::{ObjectKind, Store};
use tracing::{debug, warn};

use crate::catalog::ResolvedCdn;
use crate::error::{CdnError, CdnResult, ErrorKind};
use crate::group::{ResolvedGroup, resolve_archive_group};
use crate::objects::{ObjectCategory, fetch_object};
use crate::transport::CdnTransport;

/// One logical build to fetch: a `(build_config, cdn_config, product_config)`
/// tuple taken from a row of the `versions` catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedBuild {
    /// Build-config content key
    pub build_config_key: String,
    /// CDN-config content key
    pub cdn_config_key: String,
    /// Product-config content key, if the versions row named one
    pub product_config_key: Option<String>,
}

/// Planner knobs.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Stop after configs/indices are materialized; skip bodies entirely.
    pub metadata_only: bool,
}

/// A skipped object: a network failure that the warn-and-skip policy
/// tolerated rather than aborting the whole plan.
#[derive(Debug, Clone)]
pub struct SkippedObject {
    /// Which fetch set the key belonged to
    pub set: &'static str,
    /// The content key that could not be fetched
    pub key: String,
    /// The error's display text
    pub reason: String,
}

/// Counters and diagnostics for one planner run.
#[derive(Debug, Clone, Default)]
pub struct FetchPlan {
    /// Configs fetched this run (build-config + cdn-config, deduplicated)
    pub configs_fetched: u64,
    /// Archive indices fetched this run
    pub indices_fetched: u64,
    /// Patch-archive indices fetched this run, kept as a distinct set from
    /// `indices_fetched` (see Open Questions)
    pub patch_indices_fetched: u64,
    /// Archive bodies fetched this run
    pub archives_fetched: u64,
    /// Loose content objects fetched this run
    pub loose_files_fetched: u64,
    /// Patch bodies fetched this run
    pub patch_files_fetched: u64,
    /// Objects skipped after a per-object network failure
    pub skipped: Vec<SkippedObject>,
}

struct ParsedBuild {
    cdn_config: CdnConfig,
    build_config: BuildConfig,
    patch_config: Option<PatchConfig>,
}

/// Walks the metadata DAG for a set of resolved builds against one CDN,
/// fetching and storing everything the builds need.
pub struct FetchPlanner<'a> {
    transport: &'a CdnTransport,
    store: &'a Store,
    cdn: &'a ResolvedCdn,
}

impl<'a> FetchPlanner<'a> {
    /// Build a planner over an already-resolved CDN.
    pub fn new(transport: &'a CdnTransport, store: &'a Store, cdn: &'a ResolvedCdn) -> Self {
        Self {
            transport,
            store,
            cdn,
        }
    }

    /// Run the 8-step fetch plan over `builds`.
    pub async fn run(&self, builds: &[ResolvedBuild], opts: &FetchOptions) -> CdnResult<FetchPlan> {
        let mut plan = FetchPlan::default();

        // Step 1: dedup by (build_config, cdn_config, product_config).
        let mut seen = HashSet::new();
        let mut unique: Vec<&ResolvedBuild> = Vec::new();
        for b in builds {
            if seen.insert((
                b.build_config_key.clone(),
                b.cdn_config_key.clone(),
                b.product_config_key.clone(),
            )) {
                unique.push(b);
            }
        }

        // Step 2/3: configs-to-fetch, then bulk download.
        let mut configs_to_fetch = HashSet::new();
        for b in &unique {
            if !self.store.has_config(&b.build_config_key).await {
                configs_to_fetch.insert(b.build_config_key.clone());
            }
            if !self.store.has_config(&b.cdn_config_key).await {
                configs_to_fetch.insert(b.cdn_config_key.clone());
            }
        }
        plan.configs_fetched = self
            .fetch_set(ObjectCategory::Config, false, configs_to_fetch, "configs", &mut plan)
            .await?;

        // Step 4: parse every build's cdn-config/build-config, collect
        // indices and patch-indices to fetch (two distinct sets).
        let mut indices_to_fetch = HashSet::new();
        let mut patch_indices_to_fetch = HashSet::new();
        let mut parsed = Vec::with_capacity(unique.len());

        for b in &unique {
            let cdn_config = match self.load_cdn_config(&b.cdn_config_key).await {
                Ok(c) => c,
                Err(e) if e.kind() == ErrorKind::NetworkError => {
                    warn!(build_config = %b.build_config_key, error = %e, "cdn-config unavailable, skipping build");
                    plan.skipped.push(SkippedObject {
                        set: "configs",
                        key: b.cdn_config_key.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
                Err(e) => return Err(e),
            };
            let build_config = match self.load_build_config(&b.build_config_key).await {
                Ok(c) => c,
                Err(e) if e.kind() == ErrorKind::NetworkError => {
                    warn!(build_config = %b.build_config_key, error = %e, "build-config unavailable, skipping build");
                    plan.skipped.push(SkippedObject {
                        set: "configs",
                        key: b.build_config_key.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
                Err(e) => return Err(e),
            };

            for archive in cdn_config.archives() {
                if !self.store.has_index(&archive.content_key).await {
                    indices_to_fetch.insert(archive.content_key.clone());
                }
            }
            if let Some(group_key) = cdn_config.archive_group() {
                if !self.store.has_index(group_key).await {
                    indices_to_fetch.insert(group_key.to_string());
                }
            }

            let patch_config = if let Some(patch_config_key) = build_config.patch_config() {
                match self.load_patch_config(patch_config_key).await {
                    Ok(pc) => {
                        for archive in cdn_config.patch_archives() {
                            if !self.store.has_index(&archive.content_key).await {
                                patch_indices_to_fetch.insert(archive.content_key.clone());
                            }
                        }
                        if let Some(group_key) = cdn_config.patch_archive_group() {
                            if !self.store.has_index(group_key).await {
                                patch_indices_to_fetch.insert(group_key.to_string());
                            }
                        }
                        Some(pc)
                    }
                    Err(e) if e.kind() == ErrorKind::NetworkError => {
                        warn!(patch_config_key, error = %e, "patch-config unavailable, skipping patch set");
                        plan.skipped.push(SkippedObject {
                            set: "configs",
                            key: patch_config_key.to_string(),
                            reason: e.to_string(),
                        });
                        None
                    }
                    Err(e) => return Err(e),
                }
            } else {
                None
            };

            parsed.push(ParsedBuild {
                cdn_config,
                build_config,
                patch_config,
            });
        }

        // Step 5: bulk indices, then bulk patch indices.
        plan.indices_fetched = self
            .fetch_set(ObjectCategory::Data, true, indices_to_fetch, "indices", &mut plan)
            .await?;
        plan.patch_indices_fetched = self
            .fetch_set(
                ObjectCategory::Patch,
                true,
                patch_indices_to_fetch,
                "patch_indices",
                &mut plan,
            )
            .await?;

        // Step 6: metadata-only stops here.
        if opts.metadata_only {
            return Ok(plan);
        }

        // Step 7: archive bodies, loose files, patch files.
        let mut archives_to_fetch = HashSet::new();
        let mut loose_to_fetch = HashSet::new();
        let mut patch_files_to_fetch = HashSet::new();

        for build in &parsed {
            for archive in build.cdn_config.archives() {
                if !self.store.has_data(&archive.content_key).await {
                    archives_to_fetch.insert(archive.content_key.clone());
                }
            }
            for archive in build.cdn_config.patch_archives() {
                if !self.store.has_data(&archive.content_key).await {
                    patch_files_to_fetch.insert(archive.content_key.clone());
                }
            }

            let group = match resolve_archive_group(self.store, &build.cdn_config).await {
                Ok(g) => g,
                Err(e) => {
                    warn!(error = %e, "archive group unresolvable, all encoding keys treated as loose");
                    ResolvedGroup::default()
                }
            };

            if let Some(encoding_key) = build.build_config.encoding_key() {
                match self.load_encoding_file(encoding_key).await {
                    Ok(encoding_file) => {
                        if let Some(install_info) = build.build_config.install().first() {
                            if let Some(install_encoding_key) = &install_info.encoding_key {
                                self.collect_install_references(
                                    install_encoding_key,
                                    &encoding_file,
                                    &group,
                                    &mut loose_to_fetch,
                                )
                                .await?;
                            }
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::NetworkError => {
                        warn!(encoding_key, error = %e, "encoding file unavailable, skipping reference resolution");
                        plan.skipped.push(SkippedObject {
                            set: "loose_files",
                            key: encoding_key.to_string(),
                            reason: e.to_string(),
                        });
                    }
                    Err(e) => return Err(e),
                }
            }

            if let Some(patch_config) = &build.patch_config {
                for entry in patch_config.entries() {
                    if !self.store.has_data(&entry.encoding_key).await {
                        patch_files_to_fetch.insert(entry.encoding_key.clone());
                    }
                }
            }
        }

        // Step 8: bulk download archives, then loose files, then patch files.
        plan.archives_fetched = self
            .fetch_set(ObjectCategory::Data, false, archives_to_fetch, "archives", &mut plan)
            .await?;
        plan.loose_files_fetched = self
            .fetch_set(ObjectCategory::Data, false, loose_to_fetch, "loose_files", &mut plan)
            .await?;
        plan.patch_files_fetched = self
            .fetch_set(
                ObjectCategory::Patch,
                false,
                patch_files_to_fetch,
                "patch_files",
                &mut plan,
            )
            .await?;

        Ok(plan)
    }

    /// Resolve the install manifest named by `build_config.install()` and
    /// add every entry's encoding key to `loose_to_fetch` unless it resolves
    /// through the archive group or is already a loose object.
    async fn collect_install_references(
        &self,
        install_encoding_key: &str,
        encoding_file: &EncodingFile,
        group: &ResolvedGroup,
        loose_to_fetch: &mut HashSet<String>,
    ) -> CdnResult<()> {
        if !self.store.has_data(install_encoding_key).await {
            match fetch_object(
                self.transport,
                self.cdn,
                self.store,
                ObjectCategory::Data,
                install_encoding_key,
                false,
            )
            .await
            {
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::NetworkError => {
                    warn!(install_encoding_key, error = %e, "install manifest unavailable, skipping");
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }

        let manifest = self.load_install_manifest(install_encoding_key).await?;
        for entry in &manifest.entries {
            if let Some(encoding_key) = encoding_file.find_encoding(&entry.content_key) {
                let hex = encoding_key.to_hex();
                let resolvable = group.find(encoding_key.as_bytes()).is_some();
                if !resolvable && !self.store.has_data(&hex).await {
                    loose_to_fetch.insert(hex);
                }
            }
        }
        Ok(())
    }

    async fn fetch_set(
        &self,
        category: ObjectCategory,
        is_index: bool,
        keys: HashSet<String>,
        set_name: &'static str,
        plan: &mut FetchPlan,
    ) -> CdnResult<u64> {
        let mut fetched = 0u64;
        for key in keys {
            match fetch_object(self.transport, self.cdn, self.store, category, &key, is_index).await {
                Ok(true) => fetched += 1,
                Ok(false) => {}
                Err(e) if e.kind() == ErrorKind::NetworkError => {
                    warn!(set = set_name, key, error = %e, "skipping object after network failure");
                    plan.skipped.push(SkippedObject {
                        set: set_name,
                        key,
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
        debug!(set = set_name, fetched, "bulk fetch complete");
        Ok(fetched)
    }

    async fn load_cdn_config(&self, key: &str) -> CdnResult<CdnConfig> {
        let bytes = self.read_config(key).await?;
        CdnConfig::parse(bytes.as_slice()).map_err(|e| malformed("cdn-config", e))
    }

    async fn load_build_config(&self, key: &str) -> CdnResult<BuildConfig> {
        let bytes = self.read_config(key).await?;
        BuildConfig::parse(bytes.as_slice()).map_err(|e| malformed("build-config", e))
    }

    async fn load_patch_config(&self, key: &str) -> CdnResult<PatchConfig> {
        let bytes = self.read_config(key).await?;
        PatchConfig::parse(bytes.as_slice()).map_err(|e| malformed("patch-config", e))
    }

    async fn read_config(&self, key: &str) -> CdnResult<Vec<u8>> {
        if !self.store.has_config(key).await {
            fetch_object(
                self.transport,
                self.cdn,
                self.store,
                ObjectCategory::Config,
                key,
                false,
            )
            .await?;
        }
        let mut file = self.store.open(ObjectKind::Config, key).await?;
        let mut bytes = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut file, &mut bytes).await?;
        Ok(bytes)
    }

    async fn load_encoding_file(&self, encoding_key: &str) -> CdnResult<EncodingFile> {
        if !self.store.has_data(encoding_key).await {
            fetch_object(
                self.transport,
                self.cdn,
                self.store,
                ObjectCategory::Data,
                encoding_key,
                false,
            )
            .await?;
        }
        let mut file = self.store.open(ObjectKind::Data, encoding_key).await?;
        let mut bytes = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut file, &mut bytes).await?;
        EncodingFile::parse_blte(&bytes).map_err(CdnError::from)
    }

    async fn load_install_manifest(
        &self,
        encoding_key: &str,
    ) -> CdnResult<keg_formats::install::InstallManifest> {
        let mut file = self.store.open(ObjectKind::Data, encoding_key).await?;
        let mut bytes = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut file, &mut bytes).await?;
        let blte = <BlteFile as keg_formats::CascFormat>::parse(&bytes)
            .map_err(|e| malformed("BLTE install manifest envelope", e))?;
        let decompressed = blte.decompress()?;
        keg_formats::install::InstallManifest::parse(&decompressed).map_err(CdnError::from)
    }

}

fn malformed(what: &str, err: impl std::fmt::Display) -> CdnError {
    CdnError::Malformed {
        what: what.to_string(),
        reason: err.to_string(),
    }
}
