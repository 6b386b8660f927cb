//! Transposition cache and the on-disk format shared by both persisted caches.
//!
//! The search cache is keyed by the full `BoardState::fingerprint`. The path
//! cache (`path::PathCache`) is keyed by the coarse wall-shape hash. Both are
//! written as one JSON document per file: a header carrying the format
//! version, the kind of entries and a tag of the rules/weights they were
//! computed under, followed by the entry list. Anything that does not match
//! is thrown away and the cache starts empty.

use log::{debug, info, warn};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::CacheFormatError;
use crate::path::{DistanceField, PathCache};
use crate::types::Move;

pub const FORMAT_VERSION: u32 = 1;

const SEARCH_KIND: &str = "search";
const PATH_KIND: &str = "path";

/// Path distances depend on geometry alone, never on weights or rule switches
pub const PATH_RULES_TAG: u64 = 0;

/// How a stored score relates to the true value of the position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bound {
    Exact,
    LowerBound,
    UpperBound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: u64,
    pub score: i32,
    pub best_move: Option<Move>,
    pub depth: u8,
    pub bound: Bound,
}

/// Memo of search results keyed by full position fingerprint
#[derive(Debug)]
pub struct TranspositionCache {
    table: RwLock<HashMap<u64, CacheEntry>>,
    capacity: usize,
    probes: AtomicUsize,
    hits: AtomicUsize,
}

impl TranspositionCache {
    pub fn new(capacity: usize) -> Self {
        TranspositionCache {
            table: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            probes: AtomicUsize::new(0),
            hits: AtomicUsize::new(0),
        }
    }

    /// Entry for `fingerprint` regardless of depth, used for move ordering
    pub fn probe(&self, fingerprint: u64) -> Option<CacheEntry> {
        self.probes.fetch_add(1, Ordering::Relaxed);
        let entry = self.table.read().get(&fingerprint).copied();
        if entry.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        entry
    }

    /// Entry for `fingerprint` searched at least `required_depth` plies deep
    pub fn lookup(&self, fingerprint: u64, required_depth: u8) -> Option<CacheEntry> {
        self.probe(fingerprint)
            .filter(|entry| entry.depth >= required_depth)
    }

    /// Depth-preferred store: an existing entry with strictly greater depth wins.
    pub fn store(&self, entry: CacheEntry) {
        let mut table = self.table.write();
        if let Some(existing) = table.get(&entry.fingerprint) {
            if existing.depth > entry.depth {
                return;
            }
        } else if table.len() >= self.capacity {
            evict_shallowest(&mut table);
        }
        table.insert(entry.fingerprint, entry);
    }

    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.table.write().clear();
    }

    /// (probes, hits) since creation
    pub fn stats(&self) -> (usize, usize) {
        (
            self.probes.load(Ordering::Relaxed),
            self.hits.load(Ordering::Relaxed),
        )
    }

    /// Loads a saved cache, or an empty one if the file is missing or stale
    pub fn load_or_empty<P: AsRef<Path>>(path: P, capacity: usize, rules_tag: u64) -> Self {
        let cache = TranspositionCache::new(capacity);
        if let Some(entries) = load_entries::<CacheEntry, _>(path.as_ref(), SEARCH_KIND, rules_tag) {
            let mut table = cache.table.write();
            for entry in entries.into_iter().take(cache.capacity) {
                table.insert(entry.fingerprint, entry);
            }
        }
        cache
    }

    pub fn save<P: AsRef<Path>>(&self, path: P, rules_tag: u64) -> io::Result<()> {
        let entries: Vec<CacheEntry> = self.table.read().values().copied().collect();
        save_entries(path.as_ref(), SEARCH_KIND, rules_tag, &entries)
    }
}

/// Drops every entry at the shallowest stored depth, or everything if that
/// would leave the table unchanged in size.
fn evict_shallowest(table: &mut HashMap<u64, CacheEntry>) {
    let before = table.len();
    if let Some(min_depth) = table.values().map(|e| e.depth).min() {
        table.retain(|_, e| e.depth > min_depth);
    }
    if table.len() == before {
        table.clear();
    }
    debug!(
        "Transposition cache full, evicted {} entries",
        before - table.len()
    );
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheHeader {
    format_version: u32,
    kind: String,
    rules_tag: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile<E> {
    #[serde(flatten)]
    header: CacheHeader,
    entries: E,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PathEntry {
    key: u64,
    field: DistanceField,
}

/// Structural checks on a decoded entry beyond what serde enforces
pub trait CacheRecord {
    fn check(&self) -> Result<(), String>;
}

impl CacheRecord for CacheEntry {
    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

impl CacheRecord for PathEntry {
    fn check(&self) -> Result<(), String> {
        self.field.check()
    }
}

/// Reads and validates a cache file; one bad entry rejects the whole file
pub fn read_cache_file<T: DeserializeOwned + CacheRecord>(
    path: &Path,
    kind: &str,
    rules_tag: u64,
) -> Result<Vec<T>, CacheFormatError> {
    let contents = fs::read_to_string(path)?;

    // Validate the header before committing to the entry type
    let header: CacheHeader = serde_json::from_str(&contents)?;
    if header.format_version != FORMAT_VERSION {
        return Err(CacheFormatError::VersionMismatch {
            found: header.format_version,
            expected: FORMAT_VERSION,
        });
    }
    if header.kind != kind {
        return Err(CacheFormatError::KindMismatch {
            found: header.kind,
            expected: kind.to_string(),
        });
    }
    if header.rules_tag != rules_tag {
        return Err(CacheFormatError::RulesMismatch {
            found: header.rules_tag,
            expected: rules_tag,
        });
    }

    let file: CacheFile<Vec<T>> = serde_json::from_str(&contents)?;
    for (index, entry) in file.entries.iter().enumerate() {
        entry
            .check()
            .map_err(|reason| CacheFormatError::InvalidEntry { index, reason })?;
    }
    Ok(file.entries)
}

fn load_entries<T: DeserializeOwned + CacheRecord, P: AsRef<Path>>(
    path: P,
    kind: &str,
    rules_tag: u64,
) -> Option<Vec<T>> {
    let path = path.as_ref();
    if !path.exists() {
        info!("No {} cache at {}, starting empty", kind, path.display());
        return None;
    }
    match read_cache_file::<T>(path, kind, rules_tag) {
        Ok(entries) => {
            info!(
                "Loaded {} {} cache entries from {}",
                entries.len(),
                kind,
                path.display()
            );
            Some(entries)
        }
        Err(e) => {
            warn!(
                "Discarding {} cache at {}: {}",
                kind,
                path.display(),
                e
            );
            None
        }
    }
}

/// Writes to a sibling temp file first so a crash never leaves a torn cache
fn save_entries<T: Serialize>(
    path: &Path,
    kind: &str,
    rules_tag: u64,
    entries: &[T],
) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file = CacheFile {
        header: CacheHeader {
            format_version: FORMAT_VERSION,
            kind: kind.to_string(),
            rules_tag,
        },
        entries,
    };
    let json = serde_json::to_string(&file).map_err(io::Error::other)?;

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;

    info!(
        "Saved {} {} cache entries to {}",
        entries.len(),
        kind,
        path.display()
    );
    Ok(())
}

pub fn load_path_cache<P: AsRef<Path>>(path: P, capacity: usize) -> PathCache {
    let cache = PathCache::new(capacity);
    if let Some(entries) = load_entries::<PathEntry, _>(path, PATH_KIND, PATH_RULES_TAG) {
        cache.import(entries.into_iter().map(|e| (e.key, e.field)).collect());
    }
    cache
}

pub fn save_path_cache<P: AsRef<Path>>(cache: &PathCache, path: P) -> io::Result<()> {
    let entries: Vec<PathEntry> = cache
        .export()
        .into_iter()
        .map(|(key, field)| PathEntry { key, field })
        .collect();
    save_entries(path.as_ref(), PATH_KIND, PATH_RULES_TAG, &entries)
}
