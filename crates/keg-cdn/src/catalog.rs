//! Catalog fetch (`versions`/`cdns`/`bgdl`/`blobs`) and CDN resolution.

use keg_crypto::md5::ContentKey;
use keg_formats::bpsv::{BpsvDocument, parse as parse_bpsv};
use tracing::{debug, warn};

use crate::error::{CdnError, CdnResult};
use crate::transport::CdnTransport;

/// Where a cached response row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// Fetched over the network this run
    Network,
    /// Loaded from an externally ingested file
    Ingested,
}

/// One row of the `responses` side-table the core asks the caller to persist.
///
/// `(remote, path)` may have several historical digests; the core's only
/// obligation is to hand each parsed response to the caller's persistence
/// callback (see the purpose/scope notes on external collaborators).
#[derive(Debug, Clone)]
pub struct ResponseRecord {
    /// Catalog base URL this response was fetched from
    pub remote: String,
    /// Path under the remote, e.g. `versions`, `cdns`, `bgdl`
    pub path: String,
    /// MD5 of the raw response body
    pub digest: String,
    /// Raw response body
    pub body: String,
    /// Where this response came from
    pub source: ResponseSource,
}

/// A row of the `Versions` catalog table.
#[derive(Debug, Clone)]
pub struct VersionsEntry {
    /// Region code, e.g. `us`
    pub region: String,
    /// Build-config content key
    pub build_config: String,
    /// CDN-config content key
    pub cdn_config: String,
    /// Key-ring content key, if present
    pub key_ring: Option<String>,
    /// Numeric build id
    pub build_id: Option<u64>,
    /// Human-readable build/version name
    pub versions_name: Option<String>,
    /// Product-config content key, if present
    pub product_config: Option<String>,
}

/// A row of the `CDNs` catalog table.
#[derive(Debug, Clone)]
pub struct CdnEntry {
    /// CDN provider name, e.g. `blizzard`
    pub name: String,
    /// Path component common to every object URL served by this CDN
    pub path: String,
    /// Space-separated list of candidate hosts
    pub hosts: Vec<String>,
    /// Space-separated list of fully-qualified server base URLs
    pub servers: Vec<String>,
    /// Path to this CDN's product-config directory
    pub config_path: String,
}

/// Parsed `versions`/`cdns`/`bgdl`/`blobs` catalogs for one remote.
#[derive(Debug, Clone, Default)]
pub struct Catalogs {
    /// `versions` rows (required)
    pub versions: Vec<VersionsEntry>,
    /// `cdns` rows (required)
    pub cdns: Vec<CdnEntry>,
    /// `bgdl` rows (optional, absent without warning if 404)
    pub bgdl: Option<BpsvDocument>,
    /// `blobs` rows (optional, absent without warning if 404)
    pub blobs: Option<BpsvDocument>,
    /// One record per successfully fetched catalog response, for the
    /// caller's responses side-store persistence callback.
    pub responses: Vec<ResponseRecord>,
}

fn field(doc_row: &keg_formats::bpsv::BpsvRow, name: &str) -> Option<String> {
    doc_row.get_by_name(name).map(std::string::ToString::to_string)
}

fn parse_versions(doc: &BpsvDocument) -> CdnResult<Vec<VersionsEntry>> {
    let mut out = Vec::with_capacity(doc.row_count());
    for row in doc.rows() {
        let region = field(row, "Region").ok_or_else(|| CdnError::Malformed {
            what: "versions catalog".to_string(),
            reason: "row missing Region".to_string(),
        })?;
        let build_config = field(row, "BuildConfig").ok_or_else(|| CdnError::Malformed {
            what: "versions catalog".to_string(),
            reason: "row missing BuildConfig".to_string(),
        })?;
        let cdn_config = field(row, "CDNConfig").ok_or_else(|| CdnError::Malformed {
            what: "versions catalog".to_string(),
            reason: "row missing CDNConfig".to_string(),
        })?;
        out.push(VersionsEntry {
            region,
            build_config,
            cdn_config,
            key_ring: field(row, "KeyRing"),
            build_id: field(row, "BuildId").and_then(|s| s.parse().ok()),
            versions_name: field(row, "VersionsName"),
            product_config: field(row, "ProductConfig"),
        });
    }
    Ok(out)
}

fn parse_cdns(doc: &BpsvDocument) -> CdnResult<Vec<CdnEntry>> {
    let mut out = Vec::with_capacity(doc.row_count());
    for row in doc.rows() {
        let name = field(row, "Name").ok_or_else(|| CdnError::Malformed {
            what: "cdns catalog".to_string(),
            reason: "row missing Name".to_string(),
        })?;
        let path = field(row, "Path").unwrap_or_default();
        let hosts = field(row, "Hosts")
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        let servers = field(row, "Servers")
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        let config_path = field(row, "ConfigPath").unwrap_or_default();
        out.push(CdnEntry {
            name,
            path,
            hosts,
            servers,
            config_path,
        });
    }
    Ok(out)
}

/// Fetch and parse the four catalog endpoints for `remote`.
///
/// `versions` and `cdns` are required: a fetch failure for either fails the
/// whole operation. `bgdl` and `blobs` are optional: a 404 is silently
/// treated as absent.
pub async fn fetch_catalogs(transport: &CdnTransport, remote: &str) -> CdnResult<Catalogs> {
    let remote = remote.trim_end_matches('/');
    let mut catalogs = Catalogs::default();

    let versions_body = fetch_required(transport, remote, "versions", &mut catalogs.responses).await?;
    let versions_doc = parse_bpsv(&versions_body).map_err(CdnError::from)?;
    catalogs.versions = parse_versions(&versions_doc)?;

    let cdns_body = fetch_required(transport, remote, "cdns", &mut catalogs.responses).await?;
    let cdns_doc = parse_bpsv(&cdns_body).map_err(CdnError::from)?;
    catalogs.cdns = parse_cdns(&cdns_doc)?;

    if let Some(body) = fetch_optional(transport, remote, "bgdl", &mut catalogs.responses).await? {
        catalogs.bgdl = Some(parse_bpsv(&body).map_err(CdnError::from)?);
    }
    if let Some(body) = fetch_optional(transport, remote, "blobs", &mut catalogs.responses).await? {
        catalogs.blobs = Some(parse_bpsv(&body).map_err(CdnError::from)?);
    }

    debug!(
        remote,
        versions = catalogs.versions.len(),
        cdns = catalogs.cdns.len(),
        "fetched catalogs"
    );
    Ok(catalogs)
}

async fn fetch_required(
    transport: &CdnTransport,
    remote: &str,
    kind: &str,
    responses: &mut Vec<ResponseRecord>,
) -> CdnResult<String> {
    let url = format!("{remote}/{kind}");
    let response = transport.get(&url).await?;
    let body = response.text().await.map_err(|e| CdnError::Network {
        url: url.clone(),
        source: e,
    })?;
    let digest = ContentKey::from_data(body.as_bytes()).to_hex();
    responses.push(ResponseRecord {
        remote: remote.to_string(),
        path: kind.to_string(),
        digest,
        body: body.clone(),
        source: ResponseSource::Network,
    });
    Ok(body)
}

async fn fetch_optional(
    transport: &CdnTransport,
    remote: &str,
    kind: &str,
    responses: &mut Vec<ResponseRecord>,
) -> CdnResult<Option<String>> {
    let url = format!("{remote}/{kind}");
    match transport.get(&url).await {
        Ok(response) => {
            let body = response.text().await.map_err(|e| CdnError::Network {
                url: url.clone(),
                source: e,
            })?;
            let digest = ContentKey::from_data(body.as_bytes()).to_hex();
            responses.push(ResponseRecord {
                remote: remote.to_string(),
                path: kind.to_string(),
                digest,
                body: body.clone(),
                source: ResponseSource::Network,
            });
            Ok(Some(body))
        }
        Err(CdnError::HttpStatus { status: 404, .. }) => {
            debug!(remote, kind, "optional catalog absent (404)");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// A resolved CDN: host to talk to plus the path prefix for object URLs.
#[derive(Debug, Clone)]
pub struct ResolvedCdn {
    /// Host (or full server base URL) to issue requests against
    pub host: String,
    /// Path prefix under which `config`/`data`/`patch` live
    pub path: String,
}

/// Select a CDN from the `cdns` catalog.
///
/// Priority: a caller-forced URL wins outright; otherwise the first
/// case-insensitive name match among `preferred`; otherwise the first row
/// in the catalog.
pub fn select_cdn(
    cdns: &[CdnEntry],
    forced_url: Option<&str>,
    preferred: &[&str],
) -> CdnResult<ResolvedCdn> {
    if let Some(forced) = forced_url {
        let parsed = url::Url::parse(forced)
            .map_err(|e| CdnError::NoCdn(format!("invalid forced CDN URL {forced}: {e}")))?;
        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| CdnError::NoCdn(format!("forced CDN URL has no host: {forced}")))?;
        let path = parsed.path().trim_matches('/');
        if parsed.scheme().is_empty() || path.is_empty() {
            return Err(CdnError::NoCdn(format!(
                "forced CDN URL missing scheme or path: {forced}"
            )));
        }
        return Ok(ResolvedCdn {
            host: host.to_string(),
            path: path.to_string(),
        });
    }

    for name in preferred {
        if let Some(entry) = cdns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
        {
            return cdn_from_entry(entry);
        }
    }

    if let Some(entry) = cdns.first() {
        return cdn_from_entry(entry);
    }

    Err(CdnError::NoCdn("cdns catalog is empty".to_string()))
}

/// A way to select one or more `versions` rows: by human build name, by
/// numeric build id, or by `BuildConfig` content key.
#[derive(Debug, Clone, Copy)]
pub enum VersionSelector<'a> {
    /// Match `VersionsName`
    Name(&'a str),
    /// Match `BuildId`
    BuildId(u64),
    /// Match `BuildConfig` content key (case-insensitive)
    BuildConfig(&'a str),
}

/// Resolve a version selector against a `versions` catalog.
///
/// Rows are matched first, then reduced to their distinct
/// `(build_config, cdn_config)` pairs: several regional rows naming the same
/// pair are fine (one logical build mirrored per region) and all are
/// returned, but rows naming *different* pairs make the query ambiguous.
pub fn resolve_version(
    versions: &[VersionsEntry],
    selector: VersionSelector<'_>,
) -> CdnResult<Vec<crate::planner::ResolvedBuild>> {
    let matches: Vec<&VersionsEntry> = versions
        .iter()
        .filter(|v| match selector {
            VersionSelector::Name(name) => v.versions_name.as_deref() == Some(name),
            VersionSelector::BuildId(id) => v.build_id == Some(id),
            VersionSelector::BuildConfig(key) => v.build_config.eq_ignore_ascii_case(key),
        })
        .collect();

    if matches.is_empty() {
        return Err(CdnError::NotFound(format!(
            "no version row matching {selector:?}"
        )));
    }

    let mut distinct_pairs: Vec<(String, String)> = Vec::new();
    for m in &matches {
        let pair = (m.build_config.clone(), m.cdn_config.clone());
        if !distinct_pairs.contains(&pair) {
            distinct_pairs.push(pair);
        }
    }
    if distinct_pairs.len() > 1 {
        return Err(CdnError::Ambiguous(distinct_pairs));
    }

    Ok(matches
        .into_iter()
        .map(|m| crate::planner::ResolvedBuild {
            build_config_key: m.build_config.clone(),
            cdn_config_key: m.cdn_config.clone(),
            product_config_key: m.product_config.clone(),
        })
        .collect())
}

fn cdn_from_entry(entry: &CdnEntry) -> CdnResult<ResolvedCdn> {
    let host = entry
        .servers
        .first()
        .or_else(|| entry.hosts.first())
        .ok_or_else(|| CdnError::NoCdn(format!("CDN {} advertises no servers or hosts", entry.name)))?;
    // `servers` entries are often full base URLs; `hosts` are bare hostnames.
    // Normalize to a bare host for `CdnTransport::build_url`.
    let host = host
        .trim_start_matches("http://")
        .trim_start_matches("https://")
        .trim_end_matches('/');
    if host.is_empty() {
        warn!(cdn = %entry.name, "CDN entry resolved to an empty host");
        return Err(CdnError::NoCdn(format!("CDN {} has an empty host", entry.name)));
    }
    Ok(ResolvedCdn {
        host: host.to_string(),
        path: entry.path.trim_matches('/').to_string(),
    })
}
