//! Fetching individual content-keyed objects from a resolved CDN into the
//! local object store.

use keg_crypto::md5::ContentKey;
use keg_storage::{ObjectKind, Store};
use tracing::{debug, warn};

use crate::catalog::ResolvedCdn;
use crate::error::{CdnError, CdnResult};
use crate::transport::CdnTransport;

/// The three content categories the CDN serves objects under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectCategory {
    /// `config/` — build/CDN/patch/product config blobs
    Config,
    /// `data/` — archives and loose content blobs
    Data,
    /// `patch/` — patch blobs
    Patch,
}

impl ObjectCategory {
    fn url_segment(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Data => "data",
            Self::Patch => "patch",
        }
    }

    fn kind(self, is_index: bool) -> ObjectKind {
        match (self, is_index) {
            (Self::Config, _) => ObjectKind::Config,
            (Self::Data, false) => ObjectKind::Data,
            (Self::Data, true) => ObjectKind::DataIndex,
            (Self::Patch, false) => ObjectKind::Patch,
            (Self::Patch, true) => ObjectKind::PatchIndex,
        }
    }
}

/// Fetch `key` under `category` from `cdn` into `store`, unless already present.
///
/// Returns `Ok(true)` if a network fetch happened, `Ok(false)` if the object
/// was already present locally and nothing was requested. Index objects are
/// not content-addressed (see [`keg_storage::ObjectKind`]) so their bytes are
/// stored as-is; loose/archive/patch bodies are MD5-verified against `key`
/// before being handed to the store, which independently re-verifies on
/// write.
pub async fn fetch_object(
    transport: &CdnTransport,
    cdn: &ResolvedCdn,
    store: &Store,
    category: ObjectCategory,
    key: &str,
    is_index: bool,
) -> CdnResult<bool> {
    let kind = category.kind(is_index);
    if store.has(kind, key).await {
        return Ok(false);
    }

    let path = format!("{}/{}", cdn.path, category.url_segment());
    let mut url = CdnTransport::build_url(&cdn.host, &path, key)?;
    if is_index {
        url.push_str(".index");
    }

    let response = transport.get(&url).await?;
    let bytes = response
        .bytes()
        .await
        .map_err(|e| CdnError::Network {
            url: url.clone(),
            source: e,
        })?;

    if !is_index {
        let digest = ContentKey::from_data(&bytes).to_hex();
        if !digest.eq_ignore_ascii_case(key) {
            warn!(key, actual = %digest, url, "downloaded object failed integrity verification");
            return Err(CdnError::IntegrityError {
                key: key.to_string(),
                actual: digest,
            });
        }
    }

    store
        .write(kind, key, std::io::Cursor::new(bytes.to_vec()))
        .await?;
    debug!(key, url, "fetched and stored object");
    Ok(true)
}
