//! Per-language article dictionary: the only place article IDs are minted.
//!
//! IDs are dense `u32`s handed out in increasing order, starting at `max + 1`
//! (or 0 for an empty dictionary). An assigned ID is never changed, reused or
//! deleted. New titles from one build are assigned in sorted title order, so
//! a rebuild from the same starting dictionary mints the same IDs.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use arrow::array::{ArrayRef, StringArray, UInt32Array};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use tracing::{debug, info};

use crate::columnar::{read_parquet, write_parquet_atomic, Columns};
use crate::error::{GoldError, Result};
use crate::partition::PartitionAddress;

/// Table directory of the persisted dictionaries under the Gold root.
pub const DICTIONARY_TABLE: &str = "dimensions/articles";
pub const DICTIONARY_FILE: &str = "dict.parquet";

/// In-memory snapshot of one language's dictionary, plus any titles minted
/// since it was loaded.
#[derive(Debug, Clone)]
pub struct ArticleDictionary {
    lang: String,
    by_title: HashMap<String, u32>,
    by_id: BTreeMap<u32, String>,
    next_id: u64,
    minted: usize,
}

impl ArticleDictionary {
    pub fn empty(lang: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            by_title: HashMap::new(),
            by_id: BTreeMap::new(),
            next_id: 0,
            minted: 0,
        }
    }

    /// Build a snapshot from persisted entries, rejecting duplicate IDs or titles.
    pub fn from_entries<I>(lang: impl Into<String>, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u32, String)>,
    {
        let mut dict = Self::empty(lang);
        for (id, title) in entries {
            if let Some(existing) = dict.by_id.get(&id) {
                return Err(dict.corruption(format!(
                    "article_id {id} maps to both {existing:?} and {title:?}"
                )));
            }
            if let Some(existing) = dict.by_title.get(&title) {
                return Err(dict.corruption(format!(
                    "title {title:?} maps to both {existing} and {id}"
                )));
            }
            dict.next_id = dict.next_id.max(u64::from(id) + 1);
            dict.by_title.insert(title.clone(), id);
            dict.by_id.insert(id, title);
        }
        Ok(dict)
    }

    fn corruption(&self, reason: String) -> GoldError {
        GoldError::DictionaryCorruption {
            lang: self.lang.clone(),
            reason,
        }
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Titles minted since this snapshot was loaded or last flushed.
    pub fn minted(&self) -> usize {
        self.minted
    }

    pub fn get(&self, title: &str) -> Option<u32> {
        self.by_title.get(title).copied()
    }

    pub fn contains_id(&self, article_id: u32) -> bool {
        self.by_id.contains_key(&article_id)
    }

    /// Existing ID for `title`, or the next unused one.
    pub fn resolve(&mut self, title: &str) -> Result<u32> {
        if let Some(id) = self.get(title) {
            return Ok(id);
        }
        let id = u32::try_from(self.next_id)
            .map_err(|_| self.corruption("article_id space exhausted".to_string()))?;
        self.next_id += 1;
        self.minted += 1;
        self.by_title.insert(title.to_string(), id);
        self.by_id.insert(id, title.to_string());
        Ok(id)
    }

    /// Resolve a batch of titles, minting unseen ones in sorted order.
    /// Returns how many were new.
    pub fn resolve_all<'t, I>(&mut self, titles: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'t str>,
    {
        let unseen: BTreeSet<&str> = titles
            .into_iter()
            .filter(|title| !self.by_title.contains_key(*title))
            .collect();
        for title in &unseen {
            self.resolve(title)?;
        }
        Ok(unseen.len())
    }

    fn to_record_batch(&self) -> Result<RecordBatch> {
        let schema = schema! {
            "article_id" => DataType::UInt32, false;
            "title" => DataType::Utf8, false;
        };
        let ids: ArrayRef = Arc::new(UInt32Array::from_iter_values(self.by_id.keys().copied()));
        let titles: ArrayRef = Arc::new(StringArray::from_iter_values(
            self.by_id.values().map(String::as_str),
        ));
        Ok(record_batch!(schema, ids, titles)?)
    }
}

/// Loads and flushes dictionaries under `<gold>/dimensions/articles`, and
/// hands out one lock per language so resolve+flush never interleaves within
/// a language while different languages proceed in parallel.
#[derive(Debug)]
pub struct DictionaryManager {
    gold_root: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DictionaryManager {
    pub fn new(gold_root: impl Into<PathBuf>) -> Self {
        Self {
            gold_root: gold_root.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn path_for(&self, lang: &str) -> PathBuf {
        self.gold_root
            .join(DICTIONARY_TABLE)
            .join(PartitionAddress::language(lang).relative_dir())
            .join(DICTIONARY_FILE)
    }

    /// Exclusive-access handle for `lang`. Hold the guard across load, resolve and flush.
    pub fn language_lock(&self, lang: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(lang.to_string()).or_default().clone()
    }

    /// Read the persisted dictionary, or start an empty one.
    pub fn load(&self, lang: &str) -> Result<ArticleDictionary> {
        let path = self.path_for(lang);
        if !path.exists() {
            debug!(lang, "no dictionary yet, starting empty");
            return Ok(ArticleDictionary::empty(lang));
        }
        let entries = read_entries(&path).map_err(|e| match e {
            GoldError::DictionaryCorruption { .. } => e,
            other => GoldError::DictionaryCorruption {
                lang: lang.to_string(),
                reason: other.to_string(),
            },
        })?;
        let dict = ArticleDictionary::from_entries(lang, entries)?;
        debug!(lang, entries = dict.len(), "loaded dictionary");
        Ok(dict)
    }

    /// Persist `dict`, replacing the previous file atomically.
    ///
    /// A no-op when nothing was minted and the file already exists.
    pub fn flush(&self, dict: &mut ArticleDictionary) -> Result<()> {
        let path = self.path_for(dict.lang());
        if dict.minted() == 0 && path.exists() {
            return Ok(());
        }
        write_parquet_atomic(&path, &dict.to_record_batch()?)?;
        info!(
            lang = dict.lang(),
            entries = dict.len(),
            added = dict.minted(),
            "flushed article dictionary"
        );
        dict.minted = 0;
        Ok(())
    }
}

fn read_entries(path: &Path) -> Result<Vec<(u32, String)>> {
    let mut entries = Vec::new();
    for batch in read_parquet(path)? {
        let columns = Columns::new(path, &batch);
        let ids = columns.uint32(&["article_id", "id"])?;
        let titles = columns.strings(&["title"])?;
        columns.require_non_null("article_id", &ids)?;
        columns.require_non_null("title", &titles)?;
        entries.extend(
            ids.values()
                .iter()
                .zip(titles.iter().flatten())
                .map(|(id, title)| (*id, title.to_string())),
        );
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn resolve_is_stable_and_starts_at_zero() {
        let mut dict = ArticleDictionary::empty("en");
        let a = dict.resolve("A").unwrap();
        let b = dict.resolve("B").unwrap();
        assert_eq!((a, b), (0, 1));
        assert_eq!(dict.resolve("A").unwrap(), a);
        assert_eq!(dict.minted(), 2);
        assert_eq!(dict.get("B"), Some(b));
    }

    #[test]
    fn resolve_all_mints_in_title_order() {
        let mut dict = ArticleDictionary::from_entries("en", vec![(7, "Zeta".to_string())]).unwrap();
        let added = dict.resolve_all(["Gamma", "Alpha", "Zeta", "Alpha"]).unwrap();
        assert_eq!(added, 2);
        assert_eq!(dict.get("Alpha"), Some(8));
        assert_eq!(dict.get("Gamma"), Some(9));
        assert_eq!(dict.get("Zeta"), Some(7));
    }

    #[test]
    fn titles_are_exact_match() {
        let mut dict = ArticleDictionary::empty("es");
        let plain = dict.resolve("Titulo con acento").unwrap();
        let accented = dict.resolve("Título con acento").unwrap();
        let upper = dict.resolve("TÍTULO CON ACENTO").unwrap();
        assert_ne!(plain, accented);
        assert_ne!(accented, upper);
    }

    #[test]
    fn duplicate_entries_are_corruption() {
        let dup_id = ArticleDictionary::from_entries(
            "en",
            vec![(1, "A".to_string()), (1, "B".to_string())],
        );
        assert!(matches!(dup_id, Err(GoldError::DictionaryCorruption { .. })));

        let dup_title = ArticleDictionary::from_entries(
            "en",
            vec![(1, "A".to_string()), (2, "A".to_string())],
        );
        assert!(matches!(dup_title, Err(GoldError::DictionaryCorruption { .. })));
    }

    #[test]
    fn ids_survive_flush_and_reload_without_reuse() {
        let tmp = TempDir::new().unwrap();
        let manager = DictionaryManager::new(tmp.path());

        let mut seen = BTreeSet::new();
        let mut assigned: Vec<(String, u32)> = Vec::new();
        for round in 0..5 {
            let mut dict = manager.load("en").unwrap();
            for (title, id) in &assigned {
                assert_eq!(dict.get(title), Some(*id));
            }
            let titles: Vec<String> = (0..10).map(|i| format!("round{round}-{i}")).collect();
            dict.resolve_all(titles.iter().map(String::as_str)).unwrap();
            for title in &titles {
                let id = dict.get(title).unwrap();
                assert!(seen.insert(id), "id reused");
                assigned.push((title.clone(), id));
            }
            manager.flush(&mut dict).unwrap();
        }
        assert_eq!(manager.load("en").unwrap().len(), 50);
        assert!(manager.load("fr").unwrap().is_empty());
    }

    #[test]
    fn unreadable_dictionary_is_corruption() {
        let tmp = TempDir::new().unwrap();
        let manager = DictionaryManager::new(tmp.path());
        let path = manager.path_for("en");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"garbage").unwrap();

        assert!(matches!(
            manager.load("en"),
            Err(GoldError::DictionaryCorruption { .. })
        ));
        assert_eq!(std::fs::read(&path).unwrap(), b"garbage");
    }

    #[test]
    fn language_locks_are_shared_per_language() {
        let manager = DictionaryManager::new("/unused");
        let en = manager.language_lock("en");
        assert!(Arc::ptr_eq(&en, &manager.language_lock("en")));
        assert!(!Arc::ptr_eq(&en, &manager.language_lock("fr")));
    }
}
