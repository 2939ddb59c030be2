//! Content-addressed object store with a partitioned hash layout.
//!
//! Objects are named by the hex-encoded content key that addresses them and
//! live under `objects/<kind>/<aa>/<bb>/<key>[.index]`, where `aa`/`bb` are
//! the first two hex-byte pairs of the key. Writes are staged to a
//! `.keg_temp` sibling, fsynced, integrity-checked, then renamed into place
//! so that no reader ever observes a partially written object.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use keg_crypto::md5::ContentKey;
use md5::{Digest, Md5};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, trace, warn};

use crate::error::{StorageError, StorageResult};

/// Suffix appended to the final path while a write is in flight.
const TEMP_SUFFIX: &str = ".keg_temp";

/// The closed set of object kinds this store tracks.
///
/// Mirrors the directory layout under `objects/`: configs and patch/data
/// bodies are self-verifying (their filename is the MD5 of their bytes),
/// while index objects are named after the archive they describe and are
/// verified instead by their own footer (see the archive layer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// `objects/config/<aa>/<bb>/<key>` — raw config blobs
    Config,
    /// `objects/data/<aa>/<bb>/<key>` — archive/loose data blobs
    Data,
    /// `objects/data/<aa>/<bb>/<key>.index` — an archive index footer
    DataIndex,
    /// `objects/patch/<aa>/<bb>/<key>` — patch blobs
    Patch,
    /// `objects/patch/<aa>/<bb>/<key>.index` — patch index footer
    PatchIndex,
}

impl ObjectKind {
    /// Directory component this kind lives under.
    fn dir(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Data | Self::DataIndex => "data",
            Self::Patch | Self::PatchIndex => "patch",
        }
    }

    /// Filename suffix appended after the hex key.
    fn suffix(self) -> &'static str {
        match self {
            Self::DataIndex | Self::PatchIndex => ".index",
            Self::Config | Self::Data | Self::Patch => "",
        }
    }

    /// Whether this kind's filename is required to equal the MD5 of its
    /// bytes (invariant 1 of the testable properties). Index objects are
    /// named after the archive they index, not their own hash, so they are
    /// exempt; their own tail self-verifies instead.
    fn is_content_addressed(self) -> bool {
        !matches!(self, Self::DataIndex | Self::PatchIndex)
    }
}

/// A content-addressed object store rooted at a single directory.
pub struct Store {
    root: PathBuf,
}

impl Store {
    /// Open (creating if absent) a store rooted at `root`.
    pub async fn open(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        for kind in [ObjectKind::Config, ObjectKind::Data, ObjectKind::Patch] {
            ensure_dir(&root.join("objects").join(kind.dir())).await?;
        }
        debug!(root = %root.display(), "opened object store");
        Ok(Self { root })
    }

    /// Root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn validate_key(key: &str) -> StorageResult<()> {
        if key.len() < 4 || !key.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(StorageError::MalformedKey(key.to_string()));
        }
        Ok(())
    }

    /// Final on-disk path for `(kind, key)`.
    ///
    /// Exposed so callers that need synchronous, seekable access to a large
    /// object (archive random-offset reads, in particular) can open it
    /// themselves rather than going through [`Store::open`]'s async handle.
    pub fn path(&self, kind: ObjectKind, key: &str) -> StorageResult<PathBuf> {
        Self::validate_key(key)?;
        Ok(self.object_path(kind, key))
    }

    /// Final on-disk path for `(kind, key)`, without validating `key`.
    fn object_path(&self, kind: ObjectKind, key: &str) -> PathBuf {
        let mut path = self.root.join("objects").join(kind.dir());
        if key.len() >= 4 {
            path.push(&key[..2]);
            path.push(&key[2..4]);
        }
        path.push(format!("{key}{}", kind.suffix()));
        path
    }

    /// Existence of a completed object. Never returns an error: a malformed
    /// key simply cannot exist.
    pub async fn has(&self, kind: ObjectKind, key: &str) -> bool {
        if Self::validate_key(key).is_err() {
            return false;
        }
        fs::metadata(self.object_path(kind, key)).await.is_ok()
    }

    /// Thin typed wrapper over [`Self::has`] for config objects.
    pub async fn has_config(&self, key: &str) -> bool {
        self.has(ObjectKind::Config, key).await
    }

    /// Thin typed wrapper over [`Self::has`] for archive index objects.
    pub async fn has_index(&self, key: &str) -> bool {
        self.has(ObjectKind::DataIndex, key).await
    }

    /// Thin typed wrapper over [`Self::has`] for patch objects.
    pub async fn has_patch(&self, key: &str) -> bool {
        self.has(ObjectKind::Patch, key).await
    }

    /// Thin typed wrapper over [`Self::has`] for patch index objects.
    pub async fn has_patch_index(&self, key: &str) -> bool {
        self.has(ObjectKind::PatchIndex, key).await
    }

    /// Thin typed wrapper over [`Self::has`] for data objects.
    pub async fn has_data(&self, key: &str) -> bool {
        self.has(ObjectKind::Data, key).await
    }

    /// Open a completed object for reading.
    ///
    /// Fails with [`StorageError::NotFound`] if the object does not exist.
    pub async fn open(&self, kind: ObjectKind, key: &str) -> StorageResult<File> {
        Self::validate_key(key)?;
        let path = self.object_path(kind, key);
        match OpenOptions::new().read(true).open(&path).await {
            Ok(f) => {
                trace!(path = %path.display(), "opened object");
                Ok(f)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(key.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Write `reader` to the object named `(kind, key)`.
    ///
    /// The bytes are staged at a `.keg_temp` sibling, fsynced, and (for
    /// content-addressed kinds) verified to MD5 to `key` before an atomic
    /// rename into place. A write that fails integrity verification leaves
    /// the `.keg_temp` file behind for the repair sweep to collect and does
    /// not touch any existing finalized object at the target path.
    pub async fn write(
        &self,
        kind: ObjectKind,
        key: &str,
        mut reader: impl tokio::io::AsyncRead + Unpin,
    ) -> StorageResult<()> {
        Self::validate_key(key)?;
        let final_path = self.object_path(kind, key);
        if let Some(parent) = final_path.parent() {
            ensure_dir(parent).await?;
        }
        let temp_path = temp_path_for(&final_path);

        let mut temp_file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&temp_path)
            .await?;

        let mut buf = [0u8; 8 << 10];
        let mut hasher = Md5::new();
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            temp_file.write_all(&buf[..n]).await?;
        }
        temp_file.flush().await?;
        temp_file.sync_all().await?;
        drop(temp_file);

        if kind.is_content_addressed() {
            let mut digest_bytes = [0u8; 16];
            digest_bytes.copy_from_slice(&hasher.finalize());
            let digest = ContentKey::from_bytes(digest_bytes);
            if digest.to_hex() != key.to_ascii_lowercase() {
                warn!(
                    key,
                    actual = %digest.to_hex(),
                    path = %temp_path.display(),
                    "object failed integrity verification on write; leaving .keg_temp for repair sweep"
                );
                return Err(StorageError::IntegrityError {
                    expected: key.to_string(),
                    actual: digest.to_hex(),
                });
            }
        }

        fs::rename(&temp_path, &final_path).await?;
        debug!(path = %final_path.display(), "finalized object");
        Ok(())
    }

    /// List every finalized object path under `kind`, as `(key, path)`.
    async fn list_kind(&self, kind: ObjectKind) -> StorageResult<Vec<(String, PathBuf)>> {
        let mut out = Vec::new();
        let base = self.root.join("objects").join(kind.dir());
        let mut stack = vec![base];
        while let Some(dir) = stack.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(e) => e,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    stack.push(path);
                    continue;
                }
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                if name.ends_with(TEMP_SUFFIX) {
                    continue;
                }
                let is_index = matches!(kind, ObjectKind::DataIndex | ObjectKind::PatchIndex);
                let key = if is_index {
                    name.strip_suffix(".index").map(str::to_string)
                } else if name.ends_with(".index") {
                    None
                } else {
                    Some(name.to_string())
                };
                if let Some(key) = key {
                    out.push((key, path));
                }
            }
        }
        Ok(out)
    }

    /// Sweep the store for stale `.keg_temp` files and objects whose
    /// filename no longer matches their content's MD5.
    ///
    /// This is the only operation permitted to delete a finalized object.
    /// It is never invoked implicitly by `write`/`open`.
    pub async fn fsck(&self) -> StorageResult<FsckReport> {
        let mut report = FsckReport::default();

        for kind in [ObjectKind::Config, ObjectKind::Data, ObjectKind::Patch] {
            let base = self.root.join("objects").join(kind.dir());
            remove_stale_temp_files(&base, &mut report).await?;
        }

        for kind in [ObjectKind::Config, ObjectKind::Data, ObjectKind::Patch] {
            for (key, path) in self.list_kind(kind).await? {
                let actual = md5_of_file(&path).await?;
                if actual.to_hex() != key.to_ascii_lowercase() {
                    warn!(
                        path = %path.display(),
                        expected = %key,
                        actual = %actual.to_hex(),
                        "removing corrupt object during integrity-repair sweep"
                    );
                    fs::remove_file(&path).await?;
                    report.corrupt_removed.push(path);
                } else {
                    report.verified += 1;
                }
            }
        }

        Ok(report)
    }
}

/// Outcome of an [`Store::fsck`] sweep.
#[derive(Debug, Default)]
pub struct FsckReport {
    /// Stale `.keg_temp` files removed
    pub stale_temp_removed: Vec<PathBuf>,
    /// Finalized objects removed because their content no longer matched
    /// their filename's MD5
    pub corrupt_removed: Vec<PathBuf>,
    /// Objects that passed verification
    pub verified: u64,
}

fn temp_path_for(final_path: &Path) -> PathBuf {
    let mut os = final_path.as_os_str().to_os_string();
    os.push(TEMP_SUFFIX);
    PathBuf::from(os)
}

async fn ensure_dir(path: &Path) -> StorageResult<()> {
    match fs::create_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn remove_stale_temp_files(dir: &Path, report: &mut FsckReport) -> StorageResult<()> {
    let mut stack = vec![dir.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let mut entries = match fs::read_dir(&dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                stack.push(path);
                continue;
            }
            if path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(TEMP_SUFFIX))
            {
                debug!(path = %path.display(), "removing stale .keg_temp file");
                fs::remove_file(&path).await?;
                report.stale_temp_removed.push(path);
            }
        }
    }
    Ok(())
}

async fn md5_of_file(path: &Path) -> StorageResult<ContentKey> {
    let mut file = File::open(path).await?;
    file.rewind().await?;
    let mut hasher = Md5::new();
    let mut buf = [0u8; 8 << 10];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let mut digest_bytes = [0u8; 16];
    digest_bytes.copy_from_slice(&hasher.finalize());
    Ok(ContentKey::from_bytes(digest_bytes))
}
