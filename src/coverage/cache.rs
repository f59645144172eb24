//! Persistent record of which raw profiles belong to which instrumented library.
//!
//! The cache lives at `{binary_dir}/profiles/cache.json` and maps a library file name to the raw profile files that
//! exercised it, for example `{"libym.common.random-unittest.so": ["ym.common.random.profraw"]}`. It is written with
//! a three-space indent.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::CoverageError;
use crate::json;

pub const CACHE_FILE_NAME: &str = "cache.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoverageCache {
    entries: BTreeMap<String, Vec<String>>,
}

impl CoverageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse cache JSON. `null` and blank input mean an empty cache.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let entries: Option<BTreeMap<String, Vec<String>>> = serde_json::from_str(text)?;
        Ok(Self {
            entries: entries.unwrap_or_default(),
        })
    }

    /// Read the cache at `path`. A missing file is an empty cache.
    pub fn load(path: &Path) -> Result<Self, CoverageError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(CoverageError::io(path, source)),
        };
        Self::from_json(&text).map_err(|source| CoverageError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the cache to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), CoverageError> {
        let text = json::to_string_indented(self).map_err(|source| CoverageError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        json::write_creating_dirs(path, &text).map_err(|source| CoverageError::io(path, source))
    }

    /// Record that `profile` exercised `library`. Returns `false` if it was already recorded.
    pub fn merge(&mut self, library: &str, profile: &str) -> bool {
        let profiles = self.entries.entry(library.to_string()).or_default();
        if profiles.iter().any(|p| p == profile) {
            false
        } else {
            profiles.push(profile.to_string());
            true
        }
    }

    pub fn profiles(&self, library: &str) -> Option<&[String]> {
        self.entries.get(library).map(Vec::as_slice)
    }

    pub fn libraries(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Load the cache at `path`, record `profile` for `library` and save it back.
#[tracing::instrument(skip_all, fields(library = %library, profile = %profile))]
pub fn record_profile(path: &Path, library: &str, profile: &str) -> Result<CoverageCache, CoverageError> {
    let mut cache = CoverageCache::load(path)?;
    if cache.merge(library, profile) {
        cache.save(path)?;
        tracing::debug!(cache = %path.display(), "recorded profile");
    }
    Ok(cache)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_deduplicates() {
        let mut cache = CoverageCache::from_json(r#"{"libfoo":["a.profraw"]}"#).unwrap();
        assert!(!cache.merge("libfoo", "a.profraw"));
        assert!(cache.merge("libfoo", "b.profraw"));
        assert!(cache.merge("libbar", "a.profraw"));
        assert_eq!(cache.profiles("libfoo").unwrap(), &["a.profraw", "b.profraw"]);
        assert_eq!(cache.libraries().collect::<Vec<_>>(), vec!["libbar", "libfoo"]);
    }

    #[test]
    fn test_null_and_blank_are_empty() {
        assert!(CoverageCache::from_json("null").unwrap().is_empty());
        assert!(CoverageCache::from_json("  \n").unwrap().is_empty());
        assert!(CoverageCache::from_json("[1]").is_err());
    }

    #[test]
    fn test_save_uses_three_space_indent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles").join(CACHE_FILE_NAME);
        let mut cache = CoverageCache::new();
        cache.merge("libfoo", "a.profraw");
        cache.save(&path).unwrap();
        insta::assert_snapshot!(fs::read_to_string(&path).unwrap(), @r#"
        {
           "libfoo": [
              "a.profraw"
           ]
        }
        "#);
    }

    #[test]
    fn test_record_profile_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE_NAME);
        record_profile(&path, "libfoo", "a.profraw").unwrap();
        record_profile(&path, "libfoo", "a.profraw").unwrap();
        let cache = record_profile(&path, "libfoo", "b.profraw").unwrap();
        assert_eq!(cache, CoverageCache::load(&path).unwrap());
        assert_eq!(cache.profiles("libfoo").unwrap().len(), 2);
    }
}
