//! Persisted configuration shared by the control and preview surfaces.
//!
//! Only the control surface writes. Every write is flushed to the store first
//! and only then swapped in as the new snapshot, so a reader holding an
//! `Arc<Settings>` always sees a complete value.

use crate::error::{Error, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;
use tvlink_protocol::{BorderStyle, DeviceId, DeviceRecord, Resolution};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub display: DisplaySettings,
    pub border: BorderSettings,
    pub control: ControlSettings,
    pub files: FileSettings,
    /// Window geometry keyed by window name.
    pub windows: BTreeMap<String, WindowBounds>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DisplaySettings {
    /// Capture device shown in the preview.
    pub device_id: Option<String>,
    pub filter: String,
    pub resolution: Resolution,
    pub transparency: f32,
    pub launch_app_at_login: bool,
    pub show_settings_on_start: bool,
    pub audio_enabled: bool,
    pub show_in_dock: bool,
    pub dark_mode: bool,
    pub auto_update: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            device_id: None,
            filter: "none".to_string(),
            resolution: Resolution::default(),
            transparency: 1.0,
            launch_app_at_login: false,
            show_settings_on_start: true,
            audio_enabled: false,
            show_in_dock: true,
            dark_mode: false,
            auto_update: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayFlag {
    LaunchAppAtLogin,
    ShowSettingsOnStart,
    AudioEnabled,
    ShowInDock,
    DarkMode,
    AutoUpdate,
}

impl DisplaySettings {
    pub fn flag_mut(&mut self, flag: DisplayFlag) -> &mut bool {
        match flag {
            DisplayFlag::LaunchAppAtLogin => &mut self.launch_app_at_login,
            DisplayFlag::ShowSettingsOnStart => &mut self.show_settings_on_start,
            DisplayFlag::AudioEnabled => &mut self.audio_enabled,
            DisplayFlag::ShowInDock => &mut self.show_in_dock,
            DisplayFlag::DarkMode => &mut self.dark_mode,
            DisplayFlag::AutoUpdate => &mut self.auto_update,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct BorderSettings {
    pub width: u32,
    pub style: BorderStyle,
    pub color: String,
}

impl Default for BorderSettings {
    fn default() -> Self {
        Self {
            width: 0,
            style: BorderStyle::None,
            color: "#000000".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ControlSettings {
    pub device_list: Vec<DeviceRecord>,
    pub device_id: Option<DeviceId>,
}

impl ControlSettings {
    pub fn find(&self, id: &DeviceId) -> Option<&DeviceRecord> {
        self.device_list.iter().find(|d| &d.id() == id)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FileSettings {
    pub screenshot_path: Option<PathBuf>,
    pub recording_path: Option<PathBuf>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

pub trait SettingsStore: Send + Sync {
    fn load(&self) -> Result<Settings>;
    fn save(&self, settings: &Settings) -> Result<()>;
}

/// Pretty JSON on disk, replaced through a temp file and rename.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "tvlink", "tvlink").ok_or(Error::NoConfigDir)?;
        Ok(dirs.config_dir().join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> Error {
        Error::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no settings file yet; using defaults");
            return Ok(Settings::default());
        }
        let raw = fs::read_to_string(&self.path).map_err(|e| self.io_err(e))?;
        serde_json::from_str(&raw).map_err(|source| Error::Json {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
            }
        }
        let payload = serde_json::to_string_pretty(settings).map_err(|source| Error::Json {
            path: self.path.clone(),
            source,
        })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, payload).map_err(|e| self.io_err(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))?;
        Ok(())
    }
}

/// In-memory store for dry runs and tests. Can be told to refuse writes.
#[derive(Default)]
pub struct MemoryStore {
    saved: Mutex<Option<Settings>>,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    pub fn with(settings: Settings) -> Self {
        Self {
            saved: Mutex::new(Some(settings)),
            fail_saves: AtomicBool::new(false),
        }
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::Relaxed);
    }

    pub fn saved(&self) -> Option<Settings> {
        self.saved.lock().ok().and_then(|g| g.clone())
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<Settings> {
        Ok(self.saved().unwrap_or_default())
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        if self.fail_saves.load(Ordering::Relaxed) {
            return Err(Error::Store("memory store is read-only".to_string()));
        }
        let mut guard = self
            .saved
            .lock()
            .map_err(|_| Error::Store("memory store lock poisoned".to_string()))?;
        *guard = Some(settings.clone());
        Ok(())
    }
}

impl<T: SettingsStore + ?Sized> SettingsStore for Arc<T> {
    fn load(&self) -> Result<Settings> {
        (**self).load()
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        (**self).save(settings)
    }
}

/// Single-writer handle over a store plus the current snapshot.
pub struct SharedSettings {
    store: Box<dyn SettingsStore>,
    current: Arc<Settings>,
}

impl SharedSettings {
    pub fn open(store: Box<dyn SettingsStore>) -> Result<Self> {
        let current = Arc::new(store.load()?);
        Ok(Self { store, current })
    }

    pub fn snapshot(&self) -> Arc<Settings> {
        Arc::clone(&self.current)
    }

    /// Applies `f` to a copy, persists it, then publishes it. On a failed save
    /// the previous snapshot stays authoritative.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut Settings) -> R) -> Result<R> {
        let mut next = Settings::clone(&self.current);
        let out = f(&mut next);
        if next == *self.current {
            return Ok(out);
        }
        self.store.save(&next)?;
        self.current = Arc::new(next);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tvlink_protocol::DeviceFamily;

    #[test]
    fn json_store_round_trips_and_replaces_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let store = JsonFileStore::new(&path);

        assert_eq!(store.load().unwrap(), Settings::default());

        let mut settings = Settings::default();
        settings.border.width = 3;
        settings.control.device_list.push(DeviceRecord {
            address: "10.0.0.5".into(),
            family: DeviceFamily::EcpHttp,
            alias: Some("Living room".into()),
        });
        settings.control.device_id = Some(DeviceId::new("10.0.0.5", DeviceFamily::EcpHttp));
        settings.windows.insert(
            "preview".into(),
            WindowBounds {
                x: 10,
                y: 20,
                width: 640,
                height: 360,
            },
        );
        store.save(&settings).unwrap();

        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(store.load().unwrap(), settings);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"deviceList\""));
        assert!(raw.contains("\"deviceId\": \"10.0.0.5|ecp-http\""));
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"border": {"width": 2}}"#).unwrap();

        let loaded = JsonFileStore::new(&path).load().unwrap();
        assert_eq!(loaded.border.width, 2);
        assert_eq!(loaded.border.color, "#000000");
        assert_eq!(loaded.display, DisplaySettings::default());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(JsonFileStore::new(&path).load(), Err(Error::Json { .. })));
    }

    #[test]
    fn failed_save_keeps_previous_snapshot() {
        let store = Arc::new(MemoryStore::default());
        let mut shared = SharedSettings::open(Box::new(Arc::clone(&store))).unwrap();

        shared.update(|s| s.border.width = 5).unwrap();
        let before = shared.snapshot();

        store.fail_saves(true);
        assert!(shared.update(|s| s.border.width = 9).is_err());
        assert_eq!(shared.snapshot().border.width, 5);
        assert!(Arc::ptr_eq(&before, &shared.snapshot()));
        assert_eq!(store.saved().unwrap().border.width, 5);
    }

    #[test]
    fn readers_keep_their_snapshot_across_updates() {
        let mut shared = SharedSettings::open(Box::new(MemoryStore::default())).unwrap();
        let old = shared.snapshot();
        shared.update(|s| s.display.filter = "grayscale(1)".into()).unwrap();
        assert_eq!(old.display.filter, "none");
        assert_eq!(shared.snapshot().display.filter, "grayscale(1)");
    }
}
