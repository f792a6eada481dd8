//! Persistent cache for derived level artifacts.
//!
//! Two artifacts per level are worth keeping: the neighbour rings and the
//! concatenated edge/attribute rows. [`ArtifactStore`] moves opaque bytes
//! for a [`CacheKey`]; [`Cache`] wraps each payload in a small bincode
//! envelope and decides, per [`CachePolicy`], whether an entry read back is
//! usable.
//!
//! # Policy
//!
//! The default [`CachePolicy::TrustIfPresent`] accepts any entry that
//! decodes, even if the source surface has since changed. Trained models
//! were fitted against whatever the cache held, so that stays the default;
//! [`CachePolicy::VerifySource`] additionally compares a blake3 digest of
//! the surface file recorded at write time.
//!
//! # Atomicity
//!
//! [`DiskStore`] writes into a temporary file in the cache directory and
//! renames it over the destination. Readers see the old entry, the new
//! entry, or nothing; never a torn write.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Error, Result};

const MAGIC: [u8; 4] = *b"MICO";
const FORMAT_VERSION: u32 = 1;

/// Kind of derived data stored per level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    /// Neighbour rings.
    Neighbours,
    /// `[source, target, angle, distance]` rows.
    EdgesAndAttrs,
}

impl Artifact {
    pub const ALL: [Artifact; 2] = [Artifact::Neighbours, Artifact::EdgesAndAttrs];

    const fn stem(self) -> &'static str {
        match self {
            Artifact::Neighbours => "neighbours",
            Artifact::EdgesAndAttrs => "edges_and_attrs",
        }
    }
}

/// Address of one cached artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub level: u8,
    pub artifact: Artifact,
}

impl CacheKey {
    pub const fn new(level: u8, artifact: Artifact) -> Self {
        Self { level, artifact }
    }

    /// File name under the cache directory, e.g. `ico7.neighbours.bin`.
    pub fn file_name(&self) -> String {
        format!("ico{}.{}.bin", self.level, self.artifact.stem())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ico{}.{}", self.level, self.artifact.stem())
    }
}

/// When a cache entry may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Any decodable entry is used.
    #[default]
    TrustIfPresent,
    /// Entries are used only if written from an identical surface file.
    VerifySource,
    /// Never read or write.
    Disabled,
}

impl CachePolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            CachePolicy::TrustIfPresent => "trust",
            CachePolicy::VerifySource => "verify",
            CachePolicy::Disabled => "off",
        }
    }
}

impl fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CachePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trust" | "trust_if_present" => Ok(CachePolicy::TrustIfPresent),
            "verify" | "verify_source" => Ok(CachePolicy::VerifySource),
            "off" | "disabled" | "none" => Ok(CachePolicy::Disabled),
            other => Err(format!("unknown cache policy {:?} (expected trust, verify or off)", other)),
        }
    }
}

/// blake3 digest of a surface file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceDigest(pub [u8; 32]);

impl SourceDigest {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for SourceDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}...", &self.to_hex()[..8])
    }
}

/// Byte storage for cache entries.
pub trait ArtifactStore: Send + Sync + fmt::Debug {
    /// Stored bytes for `key`, `None` if absent.
    fn get(&self, key: &CacheKey) -> io::Result<Option<Vec<u8>>>;

    /// Replace the entry for `key`. Must be all-or-nothing for readers.
    fn put(&self, key: &CacheKey, bytes: &[u8]) -> io::Result<()>;

    /// Drop the entry for `key`; absent entries are not an error.
    fn remove(&self, key: &CacheKey) -> io::Result<()>;
}

/// One file per key in a directory.
#[derive(Debug, Clone)]
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }
}

impl ArtifactStore for DiskStore {
    fn get(&self, key: &CacheKey) -> io::Result<Option<Vec<u8>>> {
        match std::fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn put(&self, key: &CacheKey, bytes: &[u8]) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.path_for(key)).map_err(|e| e.error)?;
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> io::Result<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// In-process store, mostly for tests and throwaway registries.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<CacheKey, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, Vec<u8>>> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ArtifactStore for MemoryStore {
    fn get(&self, key: &CacheKey) -> io::Result<Option<Vec<u8>>> {
        Ok(self.lock().get(key).cloned())
    }

    fn put(&self, key: &CacheKey, bytes: &[u8]) -> io::Result<()> {
        self.lock().insert(*key, bytes.to_vec());
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> io::Result<()> {
        self.lock().remove(key);
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    magic: [u8; 4],
    version: u32,
    level: u8,
    source: Option<SourceDigest>,
    payload: T,
}

/// Typed, policy-aware access to an [`ArtifactStore`].
#[derive(Debug)]
pub struct Cache {
    store: Box<dyn ArtifactStore>,
    policy: CachePolicy,
}

impl Cache {
    pub fn new(store: impl ArtifactStore + 'static, policy: CachePolicy) -> Self {
        Self {
            store: Box::new(store),
            policy,
        }
    }

    /// Cache backed by files in `dir`.
    pub fn on_disk(dir: impl Into<PathBuf>, policy: CachePolicy) -> Self {
        Self::new(DiskStore::new(dir), policy)
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn store(&self) -> &dyn ArtifactStore {
        self.store.as_ref()
    }

    /// Whether loads should be checked against the surface file digest.
    pub fn wants_source_digest(&self) -> bool {
        self.policy == CachePolicy::VerifySource
    }

    /// Read the entry for `key`.
    ///
    /// `Ok(None)` for a miss, a disabled cache, or (under `VerifySource`) an
    /// entry written from a different surface. An entry that exists but does
    /// not decode is [`Error::CacheCorruption`]; callers treat that as a miss
    /// and rewrite.
    pub fn load<T: DeserializeOwned>(&self, key: &CacheKey, source: Option<&SourceDigest>) -> Result<Option<T>> {
        if self.policy == CachePolicy::Disabled {
            return Ok(None);
        }
        let Some(bytes) = self.store.get(key)? else {
            debug!(%key, "Cache miss");
            return Ok(None);
        };

        let corrupt = |reason: String| Error::CacheCorruption { key: *key, reason };
        let envelope: Envelope<T> = bincode::deserialize(&bytes).map_err(|e| corrupt(e.to_string()))?;
        if envelope.magic != MAGIC {
            return Err(corrupt("bad magic".to_string()));
        }
        if envelope.version != FORMAT_VERSION {
            return Err(corrupt(format!("format version {}", envelope.version)));
        }
        if envelope.level != key.level {
            return Err(corrupt(format!("entry belongs to level {}", envelope.level)));
        }

        if self.policy == CachePolicy::VerifySource && envelope.source.as_ref() != source {
            debug!(
                %key,
                cached = ?envelope.source.map(|d| d.to_string()),
                current = ?source.map(|d| d.to_string()),
                "Cache entry is stale"
            );
            return Ok(None);
        }

        debug!(%key, bytes = bytes.len(), "Cache hit");
        Ok(Some(envelope.payload))
    }

    /// Write `value` under `key`, recording `source` if given.
    pub fn save<T: Serialize>(&self, key: &CacheKey, source: Option<&SourceDigest>, value: &T) -> Result<()> {
        if self.policy == CachePolicy::Disabled {
            return Ok(());
        }
        let envelope = Envelope {
            magic: MAGIC,
            version: FORMAT_VERSION,
            level: key.level,
            source: source.copied(),
            payload: value,
        };
        let bytes = bincode::serialize(&envelope)?;
        self.store.put(key, &bytes)?;
        debug!(%key, bytes = bytes.len(), "Cache entry written");
        Ok(())
    }

    /// Remove every artifact of `level`.
    pub fn clear_level(&self, level: u8) -> Result<()> {
        for artifact in Artifact::ALL {
            self.store.remove(&CacheKey::new(level, artifact))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const KEY: CacheKey = CacheKey::new(3, Artifact::Neighbours);

    #[test]
    fn file_names() {
        assert_eq!(KEY.file_name(), "ico3.neighbours.bin");
        assert_eq!(
            CacheKey::new(7, Artifact::EdgesAndAttrs).file_name(),
            "ico7.edges_and_attrs.bin"
        );
    }

    #[test]
    fn memory_round_trip() {
        let cache = Cache::new(MemoryStore::new(), CachePolicy::TrustIfPresent);
        assert_eq!(cache.load::<Vec<u32>>(&KEY, None).unwrap(), None);
        cache.save(&KEY, None, &vec![1u32, 2, 3]).unwrap();
        assert_eq!(cache.load::<Vec<u32>>(&KEY, None).unwrap(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn disk_round_trip_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let cache = Cache::on_disk(dir.path(), CachePolicy::TrustIfPresent);
        let rows = vec![[0.0, 0.0, 1e-15, 1e-15], [0.0, 1.0, 1.2566, 0.618]];
        cache.save(&KEY, None, &rows).unwrap();

        assert_eq!(cache.load::<Vec<[f64; 4]>>(&KEY, None).unwrap(), Some(rows));
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["ico3.neighbours.bin".to_string()]);
    }

    #[test]
    fn garbage_is_corruption() {
        let store = MemoryStore::new();
        store.put(&KEY, b"definitely not bincode").unwrap();
        let cache = Cache::new(store, CachePolicy::TrustIfPresent);
        let err = cache.load::<Vec<u32>>(&KEY, None).unwrap_err();
        assert!(matches!(err, Error::CacheCorruption { key, .. } if key == KEY));
    }

    #[test]
    fn entry_for_other_level_is_corruption() {
        let cache = Cache::new(MemoryStore::new(), CachePolicy::TrustIfPresent);
        let other = CacheKey::new(4, Artifact::Neighbours);
        cache.save(&other, None, &vec![1u32]).unwrap();
        let bytes = cache.store().get(&other).unwrap().unwrap();
        cache.store().put(&KEY, &bytes).unwrap();
        assert!(matches!(
            cache.load::<Vec<u32>>(&KEY, None),
            Err(Error::CacheCorruption { .. })
        ));
    }

    #[test]
    fn trust_ignores_source_digest() {
        let cache = Cache::new(MemoryStore::new(), CachePolicy::TrustIfPresent);
        let old = SourceDigest::of_bytes(b"old mesh");
        let new = SourceDigest::of_bytes(b"new mesh");
        cache.save(&KEY, Some(&old), &7u32).unwrap();
        assert_eq!(cache.load::<u32>(&KEY, Some(&new)).unwrap(), Some(7));
    }

    #[test]
    fn verify_rejects_changed_source() {
        let cache = Cache::new(MemoryStore::new(), CachePolicy::VerifySource);
        let old = SourceDigest::of_bytes(b"old mesh");
        let new = SourceDigest::of_bytes(b"new mesh");
        cache.save(&KEY, Some(&old), &7u32).unwrap();
        assert_eq!(cache.load::<u32>(&KEY, Some(&old)).unwrap(), Some(7));
        assert_eq!(cache.load::<u32>(&KEY, Some(&new)).unwrap(), None);
    }

    #[test]
    fn disabled_never_touches_store() {
        let cache = Cache::new(MemoryStore::new(), CachePolicy::Disabled);
        cache.save(&KEY, None, &1u32).unwrap();
        assert!(cache.store().get(&KEY).unwrap().is_none());
        assert_eq!(cache.load::<u32>(&KEY, None).unwrap(), None);
    }

    #[test]
    fn clear_level_removes_both_artifacts() {
        let dir = tempdir().unwrap();
        let cache = Cache::on_disk(dir.path(), CachePolicy::TrustIfPresent);
        for artifact in Artifact::ALL {
            cache.save(&CacheKey::new(2, artifact), None, &0u8).unwrap();
        }
        cache.clear_level(2).unwrap();
        cache.clear_level(2).unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn policy_parsing() {
        assert_eq!("trust".parse::<CachePolicy>().unwrap(), CachePolicy::TrustIfPresent);
        assert_eq!("VERIFY".parse::<CachePolicy>().unwrap(), CachePolicy::VerifySource);
        assert_eq!("off".parse::<CachePolicy>().unwrap(), CachePolicy::Disabled);
        assert!("sometimes".parse::<CachePolicy>().is_err());
    }
}
