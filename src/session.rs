//! Session binding: which pet name the current caller has chosen.
//!
//! [`Session`] is a plain value; carrying it between requests is the job of
//! the transport (a cookie over HTTP, `session.json` in the terminal).

use crate::model::{PetRecord, SessionFile, SESSION_VERSION};
use crate::registry::{normalise_name, PetStore, StoreError};
use anyhow::Result;
use chrono::Utc;
use std::{fs, path::Path, sync::Arc};
use thiserror::Error;

pub(crate) const MAX_NAME_LENGTH: usize = 24;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Session {
    pub(crate) name: Option<String>,
}

impl Session {
    #[cfg(test)]
    pub(crate) fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum SessionError {
    #[error("Give your tamagochi a name first!")]
    EmptyName,
    #[error("The name can be at most {max} characters long!")]
    NameTooLong { max: usize },
    #[error("Could not save the tamagochi to the registry.")]
    Storage(#[source] StoreError),
}

/// Trims and checks a candidate name without touching any state.
pub(crate) fn validate_name(raw: &str) -> Result<&str, SessionError> {
    let name = normalise_name(raw);
    if name.is_empty() {
        return Err(SessionError::EmptyName);
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(SessionError::NameTooLong {
            max: MAX_NAME_LENGTH,
        });
    }
    Ok(name)
}

/// Get/set/clear over a session, backed by the shared registry.
#[derive(Clone)]
pub(crate) struct SessionService {
    store: Arc<dyn PetStore>,
    forget_on_clear: bool,
}

impl SessionService {
    pub(crate) fn new(store: Arc<dyn PetStore>, forget_on_clear: bool) -> Self {
        Self {
            store,
            forget_on_clear,
        }
    }

    pub(crate) fn store(&self) -> &Arc<dyn PetStore> {
        &self.store
    }

    pub(crate) fn get<'a>(&self, session: &'a Session) -> Option<&'a str> {
        session.name.as_deref()
    }

    /// Validates, registers, then binds. Nothing changes on error.
    pub(crate) fn set(
        &self,
        session: &mut Session,
        raw: &str,
    ) -> Result<Vec<PetRecord>, SessionError> {
        let name = validate_name(raw)?.to_string();
        let records = self.store.upsert(&name).map_err(SessionError::Storage)?;
        log::info!("session bound to {name:?} via {} registry", self.store.backend());
        session.name = Some(name);
        Ok(records)
    }

    /// Drops the binding; with `forget_on_clear` the record goes too. The
    /// binding is dropped even if removing the record fails.
    pub(crate) fn clear(&self, session: &mut Session) -> Result<Option<String>, SessionError> {
        let previous = session.name.take();
        if self.forget_on_clear {
            if let Some(name) = &previous {
                self.store.remove(name).map_err(SessionError::Storage)?;
                log::info!("forgot {name:?}");
            }
        }
        Ok(previous)
    }
}

/// Reads the terminal session carrier; anything unreadable means "no session".
pub(crate) fn load_session_file(path: &Path) -> Session {
    if let Ok(s) = fs::read_to_string(path) {
        if let Ok(file) = serde_json::from_str::<SessionFile>(&s) {
            let name = file
                .name
                .as_deref()
                .and_then(|n| validate_name(n).ok())
                .map(str::to_string);
            return Session { name };
        }
    }
    Session::default()
}

pub(crate) fn save_session_file(path: &Path, session: &Session) -> Result<()> {
    let file = SessionFile {
        version: SESSION_VERSION,
        name: session.name.clone(),
        saved_at: Utc::now(),
    };
    let data = serde_json::to_vec_pretty(&file)?;
    crate::config::write_atomic(path, &data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{comparison_key, MemoryStore};

    struct BrokenStore;

    impl PetStore for BrokenStore {
        fn backend(&self) -> &'static str {
            "broken"
        }
        fn load(&self) -> Result<Option<Vec<PetRecord>>, StoreError> {
            Ok(None)
        }
        fn commit(&self, _: &[PetRecord]) -> Result<(), StoreError> {
            Err(StoreError::Poisoned)
        }
    }

    fn service(forget: bool) -> SessionService {
        SessionService::new(Arc::new(MemoryStore::new()), forget)
    }

    #[test]
    fn validation_trims_and_bounds_length() {
        assert_eq!(validate_name("  Bit Bogi  ").unwrap(), "Bit Bogi");
        assert!(matches!(validate_name("   "), Err(SessionError::EmptyName)));
        let exact = "ő".repeat(MAX_NAME_LENGTH);
        assert!(validate_name(&exact).is_ok(), "limit counts characters, not bytes");
        let long = "a".repeat(MAX_NAME_LENGTH + 1);
        assert!(matches!(
            validate_name(&long),
            Err(SessionError::NameTooLong { max: MAX_NAME_LENGTH })
        ));
    }

    #[test]
    fn set_registers_and_binds_trimmed_name() {
        let svc = service(false);
        let mut session = Session::default();
        svc.set(&mut session, "  Pixel Panni ").unwrap();
        assert_eq!(svc.get(&session), Some("Pixel Panni"));
        let records = svc.set(&mut session, "pixel panni").unwrap();
        let matches: Vec<_> = records
            .iter()
            .filter(|r| comparison_key(&r.name) == "pixel panni")
            .collect();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].name, "pixel panni");
    }

    #[test]
    fn invalid_name_leaves_session_untouched() {
        let svc = service(false);
        let mut session = Session::named("Keeper");
        let before = svc.store().list().unwrap();
        assert!(svc.set(&mut session, "").is_err());
        assert_eq!(session, Session::named("Keeper"));
        assert_eq!(svc.store().list().unwrap(), before);
    }

    #[test]
    fn storage_failure_does_not_bind() {
        let svc = SessionService::new(Arc::new(BrokenStore), false);
        let mut session = Session::default();
        let err = svc.set(&mut session, "Nova").unwrap_err();
        assert!(matches!(err, SessionError::Storage(_)));
        assert_eq!(session.name, None);
    }

    #[test]
    fn clear_optionally_forgets_the_record() {
        let keep = service(false);
        let mut session = Session::default();
        keep.set(&mut session, "Flux Feri").unwrap();
        assert_eq!(keep.clear(&mut session).unwrap().as_deref(), Some("Flux Feri"));
        assert_eq!(session.name, None);
        assert!(keep.store().list().unwrap().iter().any(|r| r.name == "Flux Feri"));

        let forget = service(true);
        forget.set(&mut session, "Flux Feri").unwrap();
        forget.clear(&mut session).unwrap();
        assert!(forget.store().list().unwrap().iter().all(|r| r.name != "Flux Feri"));
        assert_eq!(forget.clear(&mut session).unwrap(), None);
    }

    #[test]
    fn session_file_round_trip_and_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        assert_eq!(load_session_file(&path), Session::default());

        save_session_file(&path, &Session::named("Render Róka")).unwrap();
        assert_eq!(load_session_file(&path), Session::named("Render Róka"));

        fs::write(&path, "{").unwrap();
        assert_eq!(load_session_file(&path), Session::default());
    }
}
