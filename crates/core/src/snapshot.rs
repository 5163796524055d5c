//! Snapshot regression testing
//!
//! Each suite file owns one snapshot cache stored next to it in
//! `__snapshot__/<suite file>.snap`. The file maps test names to the
//! canonical YAML of every `matchSnapshot` assertion, numbered in the order
//! the assertions ran within the test.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_yaml::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::yaml::to_yaml;

/// Directory holding snapshot files, relative to the suite file.
pub const SNAPSHOT_DIR_NAME: &str = "__snapshot__";

/// Extension appended to the suite file name.
pub const SNAPSHOT_FILE_EXT: &str = ".snap";

type Generation = BTreeMap<String, BTreeMap<u32, String>>;

/// Outcome of comparing one value against the cached snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompareResult {
    pub passed: bool,
    pub test: String,
    pub index: u32,
    pub new_snapshot: String,
    pub cached_snapshot: String,
}

/// Compares values against the snapshot of the assertion being evaluated.
pub trait SnapshotComparer {
    fn compare_to_snapshot(&mut self, content: &Value) -> CompareResult;
}

/// Snapshot cache of a single suite file.
#[derive(Debug)]
pub struct SnapshotCache {
    path: PathBuf,
    existed: bool,
    is_updating: bool,
    cached: Generation,
    current: Generation,
    updated_count: u32,
    inserted_count: u32,
    current_count: u32,
}

impl SnapshotCache {
    /// Create an empty cache backed by `path`
    pub fn new(path: impl Into<PathBuf>, is_updating: bool) -> Self {
        Self {
            path: path.into(),
            existed: false,
            is_updating,
            cached: Generation::new(),
            current: Generation::new(),
            updated_count: 0,
            inserted_count: 0,
            current_count: 0,
        }
    }

    /// Create the cache for a suite file, creating the snapshot directory
    /// when needed and restoring any previously stored snapshots.
    pub fn for_suite(suite_path: &Path, is_updating: bool) -> Result<Self> {
        let suite_dir = suite_path.parent().unwrap_or_else(|| Path::new("."));
        let cache_dir = suite_dir.join(SNAPSHOT_DIR_NAME);
        ensure_dir(&cache_dir)?;

        let file_name = suite_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut cache = Self::new(
            cache_dir.join(format!("{}{}", file_name, SNAPSHOT_FILE_EXT)),
            is_updating,
        );
        cache.restore()?;
        Ok(cache)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a snapshot file was present on disk
    pub fn existed(&self) -> bool {
        self.existed
    }

    pub fn is_updating(&self) -> bool {
        self.is_updating
    }

    /// Load the cached generation. A missing file leaves the cache empty.
    pub fn restore(&mut self) -> Result<()> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No snapshot file at {}", self.path.display());
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if !content.trim().is_empty() {
            self.cached = serde_yaml::from_str(&content)?;
        }
        self.existed = true;
        Ok(())
    }

    /// Compare `content` to the snapshot cached for `test` at `index`.
    pub fn compare(&mut self, test: &str, index: u32, content: &Value) -> CompareResult {
        self.current_count += 1;

        let cached = self.cached_snapshot(test, index).map(str::to_string);
        let new_snapshot = to_yaml(content);

        let matched = match &cached {
            Some(cached) if *cached != new_snapshot => {
                self.updated_count += 1;
                false
            }
            Some(_) => true,
            None => {
                self.inserted_count += 1;
                true
            }
        };

        // outside update mode a stale snapshot is kept so the next run fails again
        let to_save = match &cached {
            Some(cached) if !self.is_updating => cached.clone(),
            _ => new_snapshot.clone(),
        };
        self.current
            .entry(test.to_string())
            .or_default()
            .insert(index, to_save);

        CompareResult {
            passed: self.is_updating || matched,
            test: test.to_string(),
            index,
            new_snapshot,
            cached_snapshot: cached.unwrap_or_default(),
        }
    }

    fn cached_snapshot(&self, test: &str, index: u32) -> Option<&str> {
        self.cached
            .get(test)
            .and_then(|by_index| by_index.get(&index))
            .map(String::as_str)
    }

    /// Whether anything differs between the cached and current generation.
    pub fn changed(&self) -> bool {
        self.updated_count > 0 || self.inserted_count > 0 || self.vanished_count() > 0
    }

    /// Write the current generation when snapshots were inserted, vanished,
    /// or changed in update mode. Returns whether the file was written.
    pub fn store_if_needed(&mut self) -> Result<bool> {
        if !self.changed() {
            return Ok(false);
        }

        if self.is_updating || self.inserted_count > 0 || self.vanished_count() > 0 {
            let data = serde_yaml::to_string(&self.current)?;
            std::fs::write(&self.path, data)?;
            self.existed = true;
            info!("Snapshot written to {}", self.path.display());
            return Ok(true);
        }

        Ok(false)
    }

    /// Snapshots cached before and changed this run
    pub fn updated_count(&self) -> u32 {
        self.updated_count
    }

    /// Snapshots newly inserted this run
    pub fn inserted_count(&self) -> u32 {
        self.inserted_count
    }

    /// Total snapshot comparisons this run
    pub fn current_count(&self) -> u32 {
        self.current_count
    }

    /// Snapshots that failed comparison. Always zero in update mode.
    pub fn failed_count(&self) -> u32 {
        if self.is_updating {
            0
        } else {
            self.updated_count
        }
    }

    /// Snapshots cached last time that no assertion produced this time
    pub fn vanished_count(&self) -> u32 {
        let mut count = 0;
        for (test, by_index) in &self.cached {
            for index in by_index.keys() {
                let present = self
                    .current
                    .get(test)
                    .map_or(false, |current| current.contains_key(index));
                if !present {
                    count += 1;
                }
            }
        }
        count
    }
}

fn ensure_dir(path: &Path) -> Result<()> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(Error::SnapshotDir(path.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            std::fs::create_dir_all(path)?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
