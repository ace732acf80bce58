use super::{lock_writes, seed_records, PetStore, StoreError};
use crate::model::PetRecord;
use std::sync::{Mutex, MutexGuard};

/// Process-local list, owned by whoever constructed it.
pub(crate) struct MemoryStore {
    records: Mutex<Vec<PetRecord>>,
    writes: Mutex<()>,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::with_records(seed_records())
    }

    pub(crate) fn with_records(records: Vec<PetRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            writes: Mutex::new(()),
        }
    }
}

impl PetStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn load(&self) -> Result<Option<Vec<PetRecord>>, StoreError> {
        let guard = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(Some(guard.clone()))
    }

    fn commit(&self, records: &[PetRecord]) -> Result<(), StoreError> {
        let mut guard = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        *guard = records.to_vec();
        Ok(())
    }

    fn write_lock(&self) -> Result<Option<MutexGuard<'_, ()>>, StoreError> {
        lock_writes(&self.writes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::exercise_contract;

    #[test]
    fn memory_backend_honours_contract() {
        exercise_contract(&MemoryStore::new());
    }

    #[test]
    fn empty_memory_falls_back_to_seed() {
        let store = MemoryStore::with_records(Vec::new());
        assert_eq!(store.list().unwrap(), seed_records());
    }

    #[test]
    fn concurrent_upserts_keep_every_name() {
        let store = MemoryStore::new();
        std::thread::scope(|scope| {
            for worker in 0..6 {
                let store = &store;
                scope.spawn(move || {
                    for round in 0..20 {
                        store.upsert(&format!("Mem {worker}-{round}")).unwrap();
                    }
                });
            }
        });
        assert_eq!(store.list().unwrap().len(), seed_records().len() + 120);
    }

    #[test]
    fn separate_instances_do_not_share_state() {
        let a = MemoryStore::new();
        let b = MemoryStore::new();
        a.upsert("Only In A").unwrap();
        assert!(b.list().unwrap().iter().all(|r| r.name != "Only In A"));
    }
}
