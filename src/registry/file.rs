use super::{encode_records, lock_writes, parse_records, PetStore, StoreError};
use crate::config::write_atomic;
use crate::model::PetRecord;
use std::{
    fs, io,
    path::PathBuf,
    sync::{Mutex, MutexGuard},
};

/// Pretty-printed JSON array in a single file.
pub(crate) struct FileStore {
    path: PathBuf,
    writes: Mutex<()>,
}

impl FileStore {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self {
            path,
            writes: Mutex::new(()),
        }
    }
}

impl PetStore for FileStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    fn load(&self) -> Result<Option<Vec<PetRecord>>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => {
                let parsed = parse_records(&text);
                if parsed.is_none() {
                    log::warn!("{} is not a record list, using seed", self.path.display());
                }
                Ok(parsed)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(&self.path, e)),
        }
    }

    fn commit(&self, records: &[PetRecord]) -> Result<(), StoreError> {
        let data = encode_records(records)?;
        write_atomic(&self.path, data.as_bytes()).map_err(|e| StoreError::io(&self.path, e))
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
    fn file_backend_honours_contract() {
        let dir = tempfile::tempdir().unwrap();
        exercise_contract(&FileStore::new(dir.path().join("nested/tamagotchis.json")));
    }

    #[test]
    fn corrupt_file_falls_back_to_seed_and_is_repaired_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tamagotchis.json");
        fs::write(&path, "{ definitely not json").unwrap();

        let store = FileStore::new(path.clone());
        assert_eq!(store.list().unwrap(), seed_records());

        store.upsert("Glitch Gizi").unwrap();
        let on_disk = parse_records(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.len(), 4);
        assert_eq!(on_disk.last().map(|r| r.name.as_str()), Some("Glitch Gizi"));
    }

    #[test]
    fn records_survive_a_fresh_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tamagotchis.json");
        let written = FileStore::new(path.clone()).upsert("Vektor Vili").unwrap();
        assert_eq!(FileStore::new(path).list().unwrap(), written);
    }

    #[test]
    fn concurrent_upserts_keep_every_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tamagotchis.json");
        let store = FileStore::new(path.clone());
        std::thread::scope(|scope| {
            for worker in 0..8 {
                let store = &store;
                scope.spawn(move || {
                    for round in 0..10 {
                        store.upsert(&format!("Pet {worker}-{round}")).unwrap();
                    }
                });
            }
        });

        let on_disk = parse_records(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.len(), seed_records().len() + 80);
        for worker in 0..8 {
            for round in 0..10 {
                let name = format!("Pet {worker}-{round}");
                assert!(on_disk.iter().any(|r| r.name == name), "{name} was lost");
            }
        }
        let stray = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(stray, 1, "temporary files were left behind");
    }

    #[test]
    fn unreadable_path_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be cannot be read as text.
        let store = FileStore::new(dir.path().to_path_buf());
        assert!(matches!(store.list(), Err(StoreError::Io { .. })));
    }
}
