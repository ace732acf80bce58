//! Shared pet registry: a flat list of named, timestamped records with
//! swappable backends.

mod file;
mod kv;
mod memory;

pub(crate) use file::FileStore;
pub(crate) use kv::{DirKv, KvStore};
pub(crate) use memory::MemoryStore;

use crate::model::{iso_millis, PetRecord};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};
use thiserror::Error;

pub(crate) const KV_KEY: &str = "tamagotchis";
pub(crate) const FILE_NAME: &str = "tamagotchis.json";

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode pet records: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("registry lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub(crate) enum BackendKind {
    Memory,
    File,
    Kv,
}

/// Read-all / upsert / remove over one flat list.
///
/// Backends only provide `load` and `commit`; the list semantics live in the
/// provided methods so every backend agrees on casing and fallback rules.
/// Writers hold `write_lock` across `load` and `commit`, so concurrent
/// upserts on one handle never lose each other's records.
pub(crate) trait PetStore: Send + Sync {
    fn backend(&self) -> &'static str;

    /// Raw stored list; `None` when nothing has been stored yet or the
    /// stored value cannot be parsed.
    fn load(&self) -> Result<Option<Vec<PetRecord>>, StoreError>;

    fn commit(&self, records: &[PetRecord]) -> Result<(), StoreError>;

    /// Serialises read-modify-write cycles. `None` means no serialisation.
    fn write_lock(&self) -> Result<Option<MutexGuard<'_, ()>>, StoreError> {
        Ok(None)
    }

    fn list(&self) -> Result<Vec<PetRecord>, StoreError> {
        Ok(with_fallback(self.load()?.unwrap_or_default()))
    }

    fn upsert(&self, name: &str) -> Result<Vec<PetRecord>, StoreError> {
        let _writer = self.write_lock()?;
        let current = self.list()?;
        match upsert_records(&current, name, now_millis()) {
            Some(next) => {
                let next = with_fallback(sanitize_records(next));
                self.commit(&next)?;
                log::debug!("{} registry: upserted {:?}", self.backend(), name.trim());
                Ok(next)
            }
            None => Ok(current),
        }
    }

    fn remove(&self, name: &str) -> Result<Vec<PetRecord>, StoreError> {
        let _writer = self.write_lock()?;
        let current = self.list()?;
        match remove_record(&current, name) {
            Some(next) => {
                let next = with_fallback(next);
                self.commit(&next)?;
                log::debug!("{} registry: removed {:?}", self.backend(), name.trim());
                Ok(next)
            }
            None => Ok(current),
        }
    }
}

pub(crate) fn open(kind: BackendKind, data_dir: &Path) -> Arc<dyn PetStore> {
    match kind {
        BackendKind::Memory => Arc::new(MemoryStore::new()),
        BackendKind::File => Arc::new(FileStore::new(data_dir.join(FILE_NAME))),
        BackendKind::Kv => Arc::new(KvStore::new(DirKv::new(data_dir.join("kv")))),
    }
}

pub(crate) fn normalise_name(value: &str) -> &str {
    value.trim()
}

pub(crate) fn comparison_key(value: &str) -> String {
    normalise_name(value).to_lowercase()
}

pub(crate) fn names_equal(a: &str, b: &str) -> bool {
    comparison_key(a) == comparison_key(b)
}

pub(crate) fn lock_writes(lock: &Mutex<()>) -> Result<Option<MutexGuard<'_, ()>>, StoreError> {
    lock.lock().map(Some).map_err(|_| StoreError::Poisoned)
}

fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

pub(crate) fn seed_records() -> Vec<PetRecord> {
    let seed = [
        ("Pixel Panni", "2024-01-12T08:30:00.000Z"),
        ("Render Róka", "2023-11-03T18:15:00.000Z"),
        ("Synth Sanyi", "2024-03-22T10:05:00.000Z"),
    ];
    let raw = seed
        .iter()
        .filter_map(|(name, at)| {
            iso_millis::parse(at).map(|created_at| PetRecord {
                name: (*name).to_string(),
                created_at,
            })
        })
        .collect();
    sanitize_records(raw)
}

fn with_fallback(records: Vec<PetRecord>) -> Vec<PetRecord> {
    if records.is_empty() {
        seed_records()
    } else {
        records
    }
}

/// Lenient shape used while reading whatever happens to be stored.
#[derive(Deserialize)]
struct RawRecord {
    #[serde(default)]
    name: serde_json::Value,
    #[serde(default, rename = "createdAt")]
    created_at: serde_json::Value,
}

/// Parses a stored JSON array, skipping malformed entries. Returns `None`
/// when the document itself is not an array.
pub(crate) fn parse_records(text: &str) -> Option<Vec<PetRecord>> {
    let entries: Vec<serde_json::Value> = serde_json::from_str(text).ok()?;
    let raw = entries
        .into_iter()
        .filter_map(|v| serde_json::from_value::<RawRecord>(v).ok())
        .filter_map(|r| {
            let name = r.name.as_str()?;
            let created_at = iso_millis::parse(r.created_at.as_str()?)?;
            Some(PetRecord {
                name: name.to_string(),
                created_at,
            })
        })
        .collect();
    Some(sanitize_records(raw))
}

pub(crate) fn encode_records(records: &[PetRecord]) -> Result<String, StoreError> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Trims names, drops empty ones, keeps the earliest record per comparison
/// key and sorts by creation time.
pub(crate) fn sanitize_records(mut records: Vec<PetRecord>) -> Vec<PetRecord> {
    for r in &mut records {
        let trimmed = normalise_name(&r.name);
        if trimmed.len() != r.name.len() {
            r.name = trimmed.to_string();
        }
    }
    records.retain(|r| !r.name.is_empty());
    records.sort_by_key(|r| r.created_at);

    let mut seen = HashSet::new();
    records.retain(|r| seen.insert(comparison_key(&r.name)));
    records
}

/// `None` when nothing changes.
pub(crate) fn upsert_records(
    records: &[PetRecord],
    name: &str,
    now: DateTime<Utc>,
) -> Option<Vec<PetRecord>> {
    let trimmed = normalise_name(name);
    if trimmed.is_empty() {
        return None;
    }
    let key = comparison_key(trimmed);
    let mut next = records.to_vec();
    match next.iter_mut().find(|r| comparison_key(&r.name) == key) {
        Some(existing) if existing.name == trimmed => None,
        Some(existing) => {
            existing.name = trimmed.to_string();
            Some(next)
        }
        None => {
            next.push(PetRecord {
                name: trimmed.to_string(),
                created_at: now,
            });
            Some(next)
        }
    }
}

pub(crate) fn remove_record(records: &[PetRecord], name: &str) -> Option<Vec<PetRecord>> {
    let key = comparison_key(name);
    if key.is_empty() {
        return None;
    }
    let next: Vec<PetRecord> = records
        .iter()
        .filter(|r| comparison_key(&r.name) != key)
        .cloned()
        .collect();
    (next.len() != records.len()).then_some(next)
}
