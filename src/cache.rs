//! Write-once disk cache for fetched pages.
//!
//! Every fetched URL gets one `<sha256(url)>.json` file holding the raw
//! record array and the follow-up link. Entries are never evicted or
//! invalidated; deleting the directory is the only way to force a refetch.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One fetched page, exactly as persisted per URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub body: Vec<serde_json::Value>,
    pub next_url: Option<String>,
}

pub struct PageCache {
    dir: PathBuf,
    keys: HashSet<String>,
}

impl PageCache {
    /// Opens the cache directory, creating it if absent, and indexes the
    /// entries left behind by earlier runs.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create cache directory {}", dir.display()))?;

        let mut keys = HashSet::new();
        for entry in fs::read_dir(&dir)
            .with_context(|| format!("failed to scan cache directory {}", dir.display()))?
        {
            let name = entry?.file_name();
            if let Some(key) = name.to_str().and_then(|n| n.strip_suffix(".json")) {
                keys.insert(key.to_string());
            }
        }

        Ok(Self { dir, keys })
    }

    pub fn get(&self, url: &str) -> Result<Option<Page>> {
        let key = key(url);
        if !self.keys.contains(&key) {
            return Ok(None);
        }
        let path = self.path_for(&key);
        let raw = fs::read(&path)
            .with_context(|| format!("failed to read cache entry {}", path.display()))?;
        let page = serde_json::from_slice(&raw)
            .with_context(|| format!("corrupt cache entry {}", path.display()))?;
        Ok(Some(page))
    }

    pub fn put(&mut self, url: &str, page: &Page) -> Result<()> {
        let key = key(url);
        let path = self.path_for(&key);
        let raw = serde_json::to_vec(page)?;
        fs::write(&path, raw)
            .with_context(|| format!("failed to write cache entry {}", path.display()))?;
        self.keys.insert(key);
        Ok(())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

fn key(url: &str) -> String {
    format!("{:x}", Sha256::digest(url.as_bytes()))
}
