//! Named sets of network-wide benchmark metrics.
//!
//! The whole collection and the active-set pointer are persisted as one JSON
//! record under a single key. Every mutation reloads the record, changes it
//! and writes it back in one step, so a later read never sees half an update.
//!
//! On first use the store seeds itself with a protected `"default"` set.

use crate::error::{LeadError, Result};
use crate::types::{BenchmarkData, BenchmarkExport, BenchmarkMetrics, BenchmarkRow};
use crate::util::{format_int, format_number};
use chrono::{SecondsFormat, Utc};
use log::{info, warn};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SET: &str = "default";
pub const STORE_KEY: &str = "benchmarkData";

/// Minimal key-value persistence.
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// In-process storage; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
///
/// Writes go to a temporary sibling first and are renamed into place.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStorage { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

pub struct BenchmarkStore<S: Storage> {
    storage: S,
}

impl<S: Storage> BenchmarkStore<S> {
    /// Open the store, seeding the default set if nothing is persisted yet.
    pub fn open(storage: S) -> Result<Self> {
        let mut store = BenchmarkStore { storage };
        if store.storage.get(STORE_KEY)?.is_none() {
            info!("initializing benchmark store with the '{}' set", DEFAULT_SET);
            store.persist(&seed_data())?;
        }
        Ok(store)
    }

    pub fn into_inner(self) -> S {
        self.storage
    }

    fn load(&self) -> Result<BenchmarkData> {
        match self.storage.get(STORE_KEY)? {
            Some(text) => {
                let mut data: BenchmarkData = serde_json::from_str(&text)?;
                data.benchmark_sets
                    .entry(DEFAULT_SET.to_string())
                    .or_insert_with(BenchmarkMetrics::default);
                Ok(data)
            }
            None => Ok(seed_data()),
        }
    }

    fn persist(&mut self, data: &BenchmarkData) -> Result<()> {
        let text = serde_json::to_string_pretty(data)?;
        self.storage.set(STORE_KEY, &text)
    }

    fn update<T>(&mut self, f: impl FnOnce(&mut BenchmarkData) -> Result<T>) -> Result<T> {
        let mut data = self.load()?;
        let out = f(&mut data)?;
        self.persist(&data)?;
        Ok(out)
    }

    /// Name and metrics of the active set. A dangling pointer resolves to
    /// the default set.
    pub fn get_active(&self) -> Result<(String, BenchmarkMetrics)> {
        let mut data = self.load()?;
        if let Some(m) = data.benchmark_sets.remove(&data.active_benchmark) {
            return Ok((data.active_benchmark, m));
        }
        warn!(
            "active benchmark '{}' is missing, using '{}'",
            data.active_benchmark, DEFAULT_SET
        );
        let m = data.benchmark_sets.remove(DEFAULT_SET).unwrap_or_default();
        Ok((DEFAULT_SET.to_string(), m))
    }

    pub fn active_name(&self) -> Result<String> {
        Ok(self.get_active()?.0)
    }

    pub fn list_sets(&self) -> Result<BTreeMap<String, BenchmarkMetrics>> {
        Ok(self.load()?.benchmark_sets)
    }

    pub fn get(&self, name: &str) -> Result<BenchmarkMetrics> {
        self.load()?
            .benchmark_sets
            .remove(name)
            .ok_or_else(|| LeadError::NotFound(name.to_string()))
    }

    /// Insert or overwrite a set's values. The active pointer is unchanged.
    pub fn save(&mut self, name: &str, metrics: BenchmarkMetrics) -> Result<()> {
        let name = validate_name(name)?;
        self.update(|data| {
            data.benchmark_sets.insert(name.clone(), metrics);
            Ok(())
        })?;
        info!("saved benchmark set '{}'", name);
        Ok(())
    }

    pub fn activate(&mut self, name: &str) -> Result<()> {
        self.update(|data| {
            if !data.benchmark_sets.contains_key(name) {
                return Err(LeadError::NotFound(name.to_string()));
            }
            data.active_benchmark = name.to_string();
            Ok(())
        })?;
        info!("activated benchmark set '{}'", name);
        Ok(())
    }

    /// Remove a set. Deleting the active set moves the pointer to `"default"`.
    pub fn delete(&mut self, name: &str) -> Result<()> {
        if name == DEFAULT_SET {
            return Err(LeadError::ProtectedResource(name.to_string()));
        }
        self.update(|data| {
            if data.benchmark_sets.remove(name).is_none() {
                return Err(LeadError::NotFound(name.to_string()));
            }
            if data.active_benchmark == name {
                data.active_benchmark = DEFAULT_SET.to_string();
            }
            Ok(())
        })?;
        info!("deleted benchmark set '{}'", name);
        Ok(())
    }

    /// Add a new set seeded with `seed` and make it active.
    pub fn create(&mut self, name: &str, seed: BenchmarkMetrics) -> Result<()> {
        let name = validate_name(name)?;
        self.update(|data| {
            if data.benchmark_sets.contains_key(&name) {
                return Err(LeadError::AlreadyExists(name.clone()));
            }
            data.benchmark_sets.insert(name.clone(), seed);
            data.active_benchmark = name.clone();
            Ok(())
        })?;
        info!("created benchmark set '{}'", name);
        Ok(())
    }

    /// Store `metrics` under `name`, replacing any existing set, and activate it.
    pub fn import(&mut self, name: &str, metrics: BenchmarkMetrics) -> Result<()> {
        let name = validate_name(name)?;
        self.update(|data| {
            data.benchmark_sets.insert(name.clone(), metrics);
            data.active_benchmark = name.clone();
            Ok(())
        })?;
        info!("imported benchmark set '{}'", name);
        Ok(())
    }

    /// Import an interchange document. `name_override` wins over the
    /// document's own name; a nameless document gets `"Imported <date>"`.
    /// Returns the name the set was stored under.
    pub fn import_json(&mut self, text: &str, name_override: Option<&str>) -> Result<String> {
        let doc = parse_export(text)?;
        let name = match name_override {
            Some(n) => n.to_string(),
            None if !doc.name.trim().is_empty() => doc.name.clone(),
            None => format!("Imported {}", Utc::now().format("%Y-%m-%d")),
        };
        self.import(&name, doc.metrics)?;
        Ok(name.trim().to_string())
    }

    pub fn export(&self, name: &str) -> Result<BenchmarkExport> {
        let metrics = self.get(name)?;
        Ok(BenchmarkExport {
            name: name.to_string(),
            date: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            metrics,
        })
    }

    /// Export as pretty JSON, ready to write to disk.
    pub fn export_json(&self, name: &str) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.export(name)?)?)
    }

    /// Table rows for console display.
    pub fn rows(&self) -> Result<Vec<BenchmarkRow>> {
        let data = self.load()?;
        Ok(data
            .benchmark_sets
            .iter()
            .map(|(name, m)| BenchmarkRow {
                active: if *name == data.active_benchmark { "*".into() } else { String::new() },
                name: name.clone(),
                total_leads: format_int(m.total_leads),
                conversion_rate: format!("{}%", format_number(m.conversion_rate, 2)),
                response_rate: format!("{}%", format_number(m.response_rate, 1)),
                no_response_rate: format!("{}%", format_number(m.no_response_rate, 1)),
            })
            .collect())
    }
}

impl BenchmarkStore<FileStorage> {
    pub fn open_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::open(FileStorage::new(dir))
    }
}

fn seed_data() -> BenchmarkData {
    let mut sets = BTreeMap::new();
    sets.insert(DEFAULT_SET.to_string(), BenchmarkMetrics::default());
    BenchmarkData {
        benchmark_sets: sets,
        active_benchmark: DEFAULT_SET.to_string(),
    }
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LeadError::InvalidName("name must not be empty".into()));
    }
    Ok(name.to_string())
}

/// Parse an interchange document, requiring a `metrics` object.
pub fn parse_export(text: &str) -> Result<BenchmarkExport> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| LeadError::InvalidImport(e.to_string()))?;
    if !value.get("metrics").is_some_and(|m| m.is_object()) {
        return Err(LeadError::InvalidImport("missing 'metrics' object".into()));
    }
    let name = value
        .get("name")
        .and_then(|n| n.as_str())
        .unwrap_or("")
        .to_string();
    let date = value
        .get("date")
        .and_then(|d| d.as_str())
        .unwrap_or("")
        .to_string();
    let metrics: BenchmarkMetrics = serde_json::from_value(value["metrics"].clone())
        .map_err(|e| LeadError::InvalidImport(e.to_string()))?;
    Ok(BenchmarkExport { name, date, metrics })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn store() -> BenchmarkStore<MemoryStorage> {
        BenchmarkStore::open(MemoryStorage::default()).unwrap()
    }

    fn q3() -> BenchmarkMetrics {
        BenchmarkMetrics {
            total_leads: 30000,
            conversion_rate: 17.5,
            response_rate: 60.0,
            no_response_rate: 40.0,
            fifteen_min_response: 35.2,
            avg_response_time: 4.0,
            median_response_time: 10.0,
        }
    }

    #[test]
    fn first_use_seeds_default() {
        let s = store();
        let (name, m) = s.get_active().unwrap();
        assert_eq!(name, DEFAULT_SET);
        assert_eq!(m, BenchmarkMetrics::default());
        assert_eq!(s.list_sets().unwrap().len(), 1);
    }

    #[test]
    fn create_activates_and_rejects_duplicates() {
        let mut s = store();
        s.create("Q3 2025", q3()).unwrap();
        assert_eq!(s.active_name().unwrap(), "Q3 2025");
        let err = s.create("Q3 2025", q3()).unwrap_err();
        assert!(matches!(err, LeadError::AlreadyExists(_)));
        assert!(matches!(s.create("  ", q3()), Err(LeadError::InvalidName(_))));
    }

    #[test]
    fn activate_unknown_is_not_found_and_changes_nothing() {
        let mut s = store();
        let err = s.activate("nope").unwrap_err();
        assert!(matches!(err, LeadError::NotFound(_)));
        assert_eq!(s.active_name().unwrap(), DEFAULT_SET);
    }

    #[test]
    fn default_is_protected() {
        let mut s = store();
        let err = s.delete(DEFAULT_SET).unwrap_err();
        assert!(matches!(err, LeadError::ProtectedResource(_)));
        assert!(s.list_sets().unwrap().contains_key(DEFAULT_SET));
    }

    #[test]
    fn deleting_active_set_falls_back_to_default() {
        let mut s = store();
        s.create("Southeast", q3()).unwrap();
        s.delete("Southeast").unwrap();
        assert_eq!(s.active_name().unwrap(), DEFAULT_SET);
        assert!(matches!(s.delete("Southeast"), Err(LeadError::NotFound(_))));
    }

    #[test]
    fn deleting_inactive_set_keeps_pointer() {
        let mut s = store();
        s.create("A", q3()).unwrap();
        s.create("B", q3()).unwrap();
        s.delete("A").unwrap();
        assert_eq!(s.active_name().unwrap(), "B");
    }

    #[test]
    fn save_overwrites_without_activating() {
        let mut s = store();
        s.save("Regional", q3()).unwrap();
        assert_eq!(s.active_name().unwrap(), DEFAULT_SET);
        let mut changed = q3();
        changed.conversion_rate = 18.0;
        s.save("Regional", changed.clone()).unwrap();
        assert_eq!(s.get("Regional").unwrap(), changed);
    }

    #[test]
    fn export_then_import_under_new_name_round_trips() {
        let mut s = store();
        s.create("Q3 2025", q3()).unwrap();
        let json = s.export_json("Q3 2025").unwrap();
        let name = s.import_json(&json, Some("Q3 copy")).unwrap();
        assert_eq!(name, "Q3 copy");
        assert_eq!(s.get("Q3 copy").unwrap(), s.get("Q3 2025").unwrap());
        assert_eq!(s.active_name().unwrap(), "Q3 copy");
    }

    #[test]
    fn import_accepts_integer_fields_and_defaults_the_name() {
        let mut s = store();
        let text = r#"{"date":"2025-07-01T00:00:00.000Z","metrics":{"totalLeads":100,
            "conversionRate":12,"responseRate":50,"noResponseRate":50,
            "fifteenMinResponse":20,"avgResponseTime":6,"medianResponseTime":11}}"#;
        let name = s.import_json(text, None).unwrap();
        assert!(name.starts_with("Imported "));
        assert_eq!(s.get(&name).unwrap().conversion_rate, 12.0);
    }

    #[test]
    fn import_rejects_documents_without_metrics() {
        let mut s = store();
        assert!(matches!(
            s.import_json(r#"{"name":"x"}"#, None),
            Err(LeadError::InvalidImport(_))
        ));
        assert!(matches!(
            s.import_json(r#"{"name":"x","metrics":3}"#, None),
            Err(LeadError::InvalidImport(_))
        ));
        assert!(matches!(s.import_json("not json", None), Err(LeadError::InvalidImport(_))));
    }

    #[test]
    fn export_unknown_is_not_found() {
        assert!(matches!(store().export("ghost"), Err(LeadError::NotFound(_))));
    }

    #[test]
    fn state_survives_reopening_the_same_storage() {
        let mut s = store();
        s.create("Kept", q3()).unwrap();
        let reopened = BenchmarkStore::open(s.into_inner()).unwrap();
        assert_eq!(reopened.active_name().unwrap(), "Kept");
        assert_eq!(reopened.list_sets().unwrap().len(), 2);
    }

    #[test]
    fn persisted_layout_uses_camel_case_keys() {
        let s = store();
        let raw = s.storage.get(STORE_KEY).unwrap().unwrap();
        let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(v["activeBenchmark"], "default");
        assert_eq!(v["benchmarkSets"]["default"]["totalLeads"], 27047);
        assert_eq!(v["benchmarkSets"]["default"]["fifteenMinResponse"], 31.7);
    }

    #[test]
    fn rows_mark_the_active_set() {
        let mut s = store();
        s.create("Q3", q3()).unwrap();
        let rows = s.rows().unwrap();
        let active: Vec<_> = rows.iter().filter(|r| r.active == "*").collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Q3");
    }
}
