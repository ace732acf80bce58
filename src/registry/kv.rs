use super::{encode_records, lock_writes, parse_records, PetStore, StoreError, KV_KEY};
use crate::config::write_atomic;
use crate::model::PetRecord;
#[cfg(test)]
use std::collections::HashMap;
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

/// Minimal string key-value namespace.
pub(crate) trait KvNamespace: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn put(&self, key: &str, value: String) -> Result<(), StoreError>;
}

#[cfg(test)]
#[derive(Default)]
pub(crate) struct MemoryKv {
    values: Mutex<HashMap<String, String>>,
}

#[cfg(test)]
impl KvNamespace for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let guard = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(guard.get(key).cloned())
    }

    fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut guard = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        guard.insert(key.to_string(), value);
        Ok(())
    }
}

/// One file per key under a directory.
pub(crate) struct DirKv {
    dir: PathBuf,
}

impl DirKv {
    pub(crate) fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(Path::new(&safe).with_extension("kv"))
    }
}

impl KvNamespace for DirKv {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        let path = self.path_for(key);
        write_atomic(&path, value.as_bytes()).map_err(|e| StoreError::io(&path, e))
    }
}

/// The whole list as one JSON value under [`KV_KEY`].
pub(crate) struct KvStore<N> {
    ns: N,
    writes: Mutex<()>,
}

impl<N: KvNamespace> KvStore<N> {
    pub(crate) fn new(ns: N) -> Self {
        Self {
            ns,
            writes: Mutex::new(()),
        }
    }
}

impl<N: KvNamespace> PetStore for KvStore<N> {
    fn backend(&self) -> &'static str {
        "kv"
    }

    fn load(&self) -> Result<Option<Vec<PetRecord>>, StoreError> {
        Ok(self.ns.get(KV_KEY)?.and_then(|raw| parse_records(&raw)))
    }

    fn commit(&self, records: &[PetRecord]) -> Result<(), StoreError> {
        self.ns.put(KV_KEY, encode_records(records)?)
    }

    fn write_lock(&self) -> Result<Option<MutexGuard<'_, ()>>, StoreError> {
        lock_writes(&self.writes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::seed_records;
    use crate::registry::tests::exercise_contract;

    #[test]
    fn memory_kv_honours_contract() {
        exercise_contract(&KvStore::new(MemoryKv::default()));
    }

    #[test]
    fn dir_kv_honours_contract() {
        let dir = tempfile::tempdir().unwrap();
        exercise_contract(&KvStore::new(DirKv::new(dir.path().join("kv"))));
    }

    #[test]
    fn garbage_value_falls_back_to_seed() {
        let ns = MemoryKv::default();
        ns.put(KV_KEY, "\"just a string\"".to_string()).unwrap();
        let store = KvStore::new(ns);
        assert_eq!(store.list().unwrap(), seed_records());
    }

    #[test]
    fn backends_agree_on_the_logical_set() {
        let dir = tempfile::tempdir().unwrap();
        let stores: Vec<Box<dyn PetStore>> = vec![
            Box::new(crate::registry::MemoryStore::new()),
            Box::new(crate::registry::FileStore::new(dir.path().join("list.json"))),
            Box::new(KvStore::new(DirKv::new(dir.path().join("kv")))),
        ];
        let mut keys = Vec::new();
        for store in &stores {
            store.upsert("Kvantum Kati").unwrap();
            store.upsert(" kvantum KATI ").unwrap();
            store.remove("Synth Sanyi").unwrap();
            let mut k: Vec<String> = store
                .list()
                .unwrap()
                .iter()
                .map(|r| crate::registry::comparison_key(&r.name))
                .collect();
            k.sort();
            keys.push(k);
        }
        assert!(keys.windows(2).all(|w| w[0] == w[1]), "{keys:?}");
    }

    #[test]
    fn concurrent_upserts_keep_every_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = KvStore::new(DirKv::new(dir.path().join("kv")));
        std::thread::scope(|scope| {
            for worker in 0..6 {
                let store = &store;
                scope.spawn(move || {
                    for round in 0..10 {
                        store.upsert(&format!("Kv {worker}-{round}")).unwrap();
                    }
                });
            }
        });
        assert_eq!(store.list().unwrap().len(), seed_records().len() + 60);
    }

    #[test]
    fn dir_kv_sanitises_key_to_file_name() {
        let kv = DirKv::new(PathBuf::from("/tmp/x"));
        assert_eq!(kv.path_for("a/b c"), PathBuf::from("/tmp/x/a_b_c.kv"));
    }
}
