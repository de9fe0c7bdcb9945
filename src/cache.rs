use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One cached translation, keyed by its exact source text.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheRecord {
    pub source: String,
    pub translation: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
struct StoreFile {
    schema: String,
    records: Vec<CacheRecord>,
}

const STORE_SCHEMA: &str = "chatfold.translation_cache.v1";

/// Persistent key-value translation cache backed by one JSON file. Keys are
/// sha256 of the source text, so edited messages miss cleanly instead of
/// serving a stale translation.
#[derive(Debug)]
pub struct TranslationStore {
    path: PathBuf,
    entries: HashMap<String, CacheRecord>,
}

pub fn source_key(source_text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_text.as_bytes());
    hex::encode(hasher.finalize())
}

impl TranslationStore {
    /// Opens the store at `path`; a missing file is an empty store.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let mut entries = HashMap::new();
        if path.is_file() {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read cache: {}", path.display()))?;
            let file: StoreFile = serde_json::from_str(&text)
                .with_context(|| format!("parse cache: {}", path.display()))?;
            for record in file.records {
                entries.insert(source_key(&record.source), record);
            }
        }
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, source_text: &str) -> Option<&str> {
        self.entries
            .get(&source_key(source_text))
            .map(|r| r.translation.as_str())
    }

    /// Inserts or overwrites, then persists.
    pub fn put(&mut self, source_text: &str, translation: &str) -> anyhow::Result<()> {
        self.entries.insert(
            source_key(source_text),
            CacheRecord {
                source: source_text.to_string(),
                translation: translation.to_string(),
            },
        );
        self.save()
    }

    /// Rewrites an existing entry; returns false when the key is absent.
    pub fn update(&mut self, source_text: &str, translation: &str) -> anyhow::Result<bool> {
        let key = source_key(source_text);
        match self.entries.get_mut(&key) {
            Some(record) => {
                record.translation = translation.to_string();
                self.save()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Removes an entry; returns false when the key is absent.
    pub fn delete(&mut self, source_text: &str) -> anyhow::Result<bool> {
        let removed = self.entries.remove(&source_key(source_text)).is_some();
        if removed {
            self.save()?;
        }
        Ok(removed)
    }

    pub fn clear(&mut self) -> anyhow::Result<()> {
        self.entries.clear();
        self.save()
    }

    /// Writes all records to `path` as a portable JSON backup.
    pub fn export(&self, path: &Path) -> anyhow::Result<()> {
        let file = StoreFile {
            schema: STORE_SCHEMA.to_string(),
            records: self.sorted_records(),
        };
        let json = serde_json::to_string_pretty(&file).context("serialize cache export")?;
        std::fs::write(path, json)
            .with_context(|| format!("write cache export: {}", path.display()))?;
        Ok(())
    }

    /// Merges records from a backup file into this store. Existing keys are
    /// overwritten by the imported records. Returns the imported count.
    pub fn import(&mut self, path: &Path) -> anyhow::Result<usize> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read cache import: {}", path.display()))?;
        let file: StoreFile = serde_json::from_str(&text)
            .with_context(|| format!("parse cache import: {}", path.display()))?;
        let count = file.records.len();
        for record in file.records {
            self.entries.insert(source_key(&record.source), record);
        }
        self.save()?;
        Ok(count)
    }

    fn sorted_records(&self) -> Vec<CacheRecord> {
        let mut records: Vec<CacheRecord> = self.entries.values().cloned().collect();
        records.sort_by(|a, b| a.source.cmp(&b.source));
        records
    }

    fn save(&self) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("create cache dir: {}", dir.display()))?;
            }
        }
        let file = StoreFile {
            schema: STORE_SCHEMA.to_string(),
            records: self.sorted_records(),
        };
        let json = serde_json::to_string_pretty(&file).context("serialize cache")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("write cache: {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(name: &str) -> (PathBuf, TranslationStore) {
        let path = std::env::temp_dir().join(format!(
            "chatfold-cache-test-{name}-{}.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        let store = TranslationStore::open(&path).expect("open");
        (path, store)
    }

    #[test]
    fn missing_file_is_empty_store() {
        let (path, store) = temp_store("empty");
        assert!(store.is_empty());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn put_get_update_delete_round_trip() {
        let (path, mut store) = temp_store("crud");

        store.put("Hello", "안녕").expect("put");
        assert_eq!(store.get("Hello"), Some("안녕"));
        assert_eq!(store.get("hello"), None);

        assert!(store.update("Hello", "안녕하세요").expect("update"));
        assert_eq!(store.get("Hello"), Some("안녕하세요"));
        assert!(!store.update("absent", "x").expect("update absent"));

        assert!(store.delete("Hello").expect("delete"));
        assert!(!store.delete("Hello").expect("delete again"));
        assert!(store.is_empty());

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn entries_survive_reopen() {
        let (path, mut store) = temp_store("reopen");
        store.put("A", "a-trans").expect("put");
        store.put("B", "b-trans").expect("put");
        drop(store);

        let reopened = TranslationStore::open(&path).expect("reopen");
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.get("A"), Some("a-trans"));

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn export_import_merges_records() {
        let (path_a, mut a) = temp_store("export-a");
        let (path_b, mut b) = temp_store("export-b");

        a.put("X", "x1").expect("put");
        a.put("Y", "y1").expect("put");
        let backup = std::env::temp_dir().join(format!(
            "chatfold-cache-test-backup-{}.json",
            std::process::id()
        ));
        a.export(&backup).expect("export");

        b.put("X", "stale").expect("put");
        let count = b.import(&backup).expect("import");
        assert_eq!(count, 2);
        assert_eq!(b.get("X"), Some("x1"));
        assert_eq!(b.get("Y"), Some("y1"));

        for p in [path_a, path_b, backup] {
            let _ = std::fs::remove_file(p);
        }
    }
}
