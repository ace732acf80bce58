use crate::model::MoodPreset;
use crate::registry::BackendKind;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::{self, Write},
    net::SocketAddr,
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) backend: BackendKind,
    /// Overrides the project data directory when set.
    pub(crate) data_dir: Option<PathBuf>,
    pub(crate) cookie_secure: bool,
    pub(crate) forget_on_clear: bool,
    pub(crate) mood: MoodPreset,
    pub(crate) fps_cap: u32,
    pub(crate) seed: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            backend: BackendKind::File,
            data_dir: None,
            cookie_secure: false,
            forget_on_clear: false,
            mood: MoodPreset::Cheerful,
            fps_cap: 30,
            seed: 0xC0FFEE_u64,
        }
    }
}

pub(crate) struct Paths {
    pub(crate) data_dir: PathBuf,
    pub(crate) settings_path: PathBuf,
    pub(crate) session_path: PathBuf,
    pub(crate) log_path: PathBuf,
}

impl Paths {
    pub(crate) fn in_dir(dir: PathBuf, settings_path: PathBuf) -> Self {
        Self {
            session_path: dir.join("session.json"),
            log_path: dir.join("pixelgotchi.log"),
            data_dir: dir,
            settings_path,
        }
    }
}

pub(crate) fn project_paths() -> Result<Paths> {
    let proj = ProjectDirs::from("com", "pixelgotchi", "Pixelgotchi")
        .context("could not resolve project directories")?;
    let dir = proj.data_local_dir().to_path_buf();
    fs::create_dir_all(&dir).ok();
    Ok(Paths::in_dir(dir.clone(), dir.join("settings.json")))
}

/// Resolves the effective paths once settings are known: an explicit
/// `data_dir` moves everything except the settings file itself.
pub(crate) fn resolve_paths(base: Paths, settings: &Settings) -> Result<Paths> {
    match &settings.data_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("could not create {}", dir.display()))?;
            Ok(Paths::in_dir(dir.clone(), base.settings_path))
        }
        None => Ok(base),
    }
}

pub(crate) fn load_settings(path: &Path) -> Settings {
    if let Ok(s) = fs::read_to_string(path) {
        match serde_json::from_str::<Settings>(&s) {
            Ok(v) => return v,
            Err(e) => log::warn!("ignoring {}: {e}", path.display()),
        }
    }
    Settings::default()
}

pub(crate) fn save_settings_atomic(path: &Path, s: &Settings) -> Result<()> {
    let data = serde_json::to_vec_pretty(s)?;
    write_atomic(path, &data).with_context(|| format!("could not write {}", path.display()))?;
    Ok(())
}

/// Writes to a uniquely named temporary sibling, then renames it over `path`,
/// so concurrent writers never share a temp file.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_fill_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "backend": "kv", "mood": "calm" }"#).unwrap();
        let s = load_settings(&path);
        assert_eq!(s.backend, BackendKind::Kv);
        assert_eq!(s.mood, MoodPreset::Calm);
        assert_eq!(s.fps_cap, 30);
        assert_eq!(s.bind_addr.port(), 8080);
    }

    #[test]
    fn unreadable_settings_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();
        assert_eq!(load_settings(&path).backend, BackendKind::File);
        assert!(!load_settings(&dir.path().join("missing.json")).cookie_secure);
    }

    #[test]
    fn settings_round_trip_through_atomic_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep/settings.json");
        let s = Settings {
            forget_on_clear: true,
            seed: 7,
            ..Settings::default()
        };
        save_settings_atomic(&path, &s).unwrap();
        let back = load_settings(&path);
        assert!(back.forget_on_clear);
        assert_eq!(back.seed, 7);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn concurrent_atomic_writes_never_tear() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.json");
        let payloads: Vec<String> = (0..8)
            .map(|i| format!("[{}]", i.to_string().repeat(4096)))
            .collect();
        std::thread::scope(|scope| {
            for payload in &payloads {
                let path = &path;
                scope.spawn(move || {
                    for _ in 0..25 {
                        write_atomic(path, payload.as_bytes()).unwrap();
                    }
                });
            }
        });
        let on_disk = fs::read_to_string(&path).unwrap();
        assert!(payloads.contains(&on_disk));
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1, "temporary files were left behind");
    }

    #[test]
    fn explicit_data_dir_moves_session_and_log() {
        let dir = tempfile::tempdir().unwrap();
        let base = Paths::in_dir(dir.path().join("a"), dir.path().join("a/settings.json"));
        let s = Settings {
            data_dir: Some(dir.path().join("b")),
            ..Settings::default()
        };
        let p = resolve_paths(base, &s).unwrap();
        assert_eq!(p.session_path, dir.path().join("b/session.json"));
        assert_eq!(p.settings_path, dir.path().join("a/settings.json"));
        assert!(p.data_dir.is_dir());
    }
}
