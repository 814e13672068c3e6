//! Configuration store.
//!
//! A store binds an application (or device) name to a backing file on the
//! flash filesystem, loads it once at setup, and then answers every query
//! and mutation from memory until [`ConfigStore::save`] writes the whole
//! entry set back.

use tracing::{debug, info, warn};

use crate::entry::ConfigEntry;
use crate::error::{ConfigError, FsError};
use crate::format;
use crate::fs::Filesystem;

/// Directory holding every config file.
pub const CONFIG_DIR: &str = "/config";

/// Extension of config files.
pub const CONFIG_EXTENSION: &str = "cfg";

/// Prefix applied to device names to form their app name.
pub const DEVICE_PREFIX: &str = "device_";

/// Path of the backing file for `app_name`, e.g. `/config/myapp.cfg`.
pub fn config_path(app_name: &str) -> String {
    format!("{}/{}.{}", CONFIG_DIR, app_name, CONFIG_EXTENSION)
}

/// App name used by the device-scoped store for `device_name`.
pub fn device_app_name(device_name: &str) -> String {
    format!("{}{}", DEVICE_PREFIX, device_name)
}

/// In-memory name/value store bound to one config file.
///
/// The store never writes on its own. [`has_changed`](Self::has_changed)
/// tells the caller whether unsaved mutations exist.
#[derive(Debug)]
pub struct ConfigStore<F: Filesystem> {
    app_name: String,
    fs: F,
    entries: Vec<ConfigEntry>,
    changed: bool,
    mounted: bool,
}

impl<F: Filesystem> ConfigStore<F> {
    /// Create a store for `app_name`. Does not touch the filesystem.
    pub fn new(app_name: impl Into<String>, fs: F) -> Self {
        Self {
            app_name: app_name.into(),
            fs,
            entries: Vec::new(),
            changed: false,
            mounted: false,
        }
    }

    /// Create the device-scoped store for `device_name`.
    pub fn for_device(device_name: &str, fs: F) -> Self {
        Self::new(device_app_name(device_name), fs)
    }

    /// Mount the filesystem and load the backing file.
    ///
    /// Never fails: if the mount fails the store keeps working in memory
    /// only, and a missing or unreadable file yields an empty store.
    pub fn setup(&mut self) {
        match self.fs.mount() {
            Ok(()) => {
                self.mounted = true;
                info!(app = %self.app_name, "Filesystem mounted");
            }
            Err(e) => {
                self.mounted = false;
                self.entries.clear();
                warn!(app = %self.app_name, "Filesystem unavailable, config is memory-only: {}", e);
                return;
            }
        }

        if let Err(e) = self.load() {
            warn!(app = %self.app_name, "Failed to load config, starting empty: {}", e);
        }
    }

    /// Replace the in-memory entries with the contents of the backing file.
    ///
    /// A missing file is not an error and leaves the store empty.
    fn load(&mut self) -> Result<(), ConfigError> {
        let path = self.file_name();
        self.entries.clear();
        self.changed = false;

        if !self.fs.exists(&path) {
            debug!(%path, "No config file, starting empty");
            return Ok(());
        }

        let reader = match self.fs.open_read(&path) {
            Ok(reader) => reader,
            Err(FsError::NotFound(_)) => return Ok(()),
            Err(source) => return Err(ConfigError::ReadFailure { path, source }),
        };

        self.entries = format::read_entries(reader).map_err(|e| ConfigError::ReadFailure {
            path: path.clone(),
            source: e.into(),
        })?;

        info!(%path, entries = self.entries.len(), "Loaded config");
        Ok(())
    }

    /// Get the value for `name`, or an empty string if absent.
    pub fn get_value(&self, name: &str) -> String {
        self.get_value_or(name, "")
    }

    /// Get the value for `name`, or `default` if absent.
    pub fn get_value_or(&self, name: &str, default: &str) -> String {
        self.find(name)
            .map(|entry| entry.value.clone())
            .unwrap_or_else(|| default.to_string())
    }

    /// Set `name` to `value`, replacing in place or appending.
    pub fn set_value(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        if format::is_unsafe_name(&name) || format::needs_escaping(&value) {
            warn!(name = %name, "Config entry will not reload faithfully from file");
        }

        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.value = value,
            None => self.entries.push(ConfigEntry { name, value }),
        }
        self.changed = true;
    }

    /// Remove `name` if present.
    ///
    /// Returns whether an entry was removed. Removing an absent name leaves
    /// the changed flag untouched.
    pub fn unset_value(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.name != name);

        let removed = self.entries.len() != before;
        if removed {
            self.changed = true;
        }
        removed
    }

    /// Remove every entry.
    pub fn unset_all(&mut self) {
        self.entries.clear();
        self.changed = true;
    }

    /// Write every entry to the backing file, replacing its content.
    ///
    /// The in-memory entries are left untouched on failure. The file itself
    /// may be left truncated or partially written.
    pub fn save(&mut self) -> Result<(), ConfigError> {
        if !self.mounted {
            return Err(ConfigError::FilesystemUnavailable);
        }

        let path = self.file_name();
        let write_failure = |source: FsError| ConfigError::WriteFailure {
            path: path.clone(),
            source,
        };

        let mut writer = self.fs.open_write(&path).map_err(write_failure)?;
        let written = format::write_entries(&mut writer, &self.entries);
        // Close on every path so the handle is released before returning.
        let closed = self.fs.close(writer);

        written.map_err(|e| write_failure(e.into()))?;
        closed.map_err(write_failure)?;

        self.changed = false;
        debug!(%path, entries = self.entries.len(), "Saved config");
        Ok(())
    }

    /// Like [`save`](Self::save), reporting only success.
    pub fn save_to_file(&mut self) -> bool {
        match self.save() {
            Ok(()) => true,
            Err(e) => {
                warn!(app = %self.app_name, "Config save failed: {}", e);
                false
            }
        }
    }

    /// Whether mutations happened since the last load or save.
    pub fn has_changed(&self) -> bool {
        self.changed
    }

    /// Whether the filesystem was mounted during setup.
    pub fn littlefs_mounted(&self) -> bool {
        self.mounted
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Path of the backing file.
    pub fn file_name(&self) -> String {
        config_path(&self.app_name)
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[ConfigEntry] {
        &self.entries
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find(&self, name: &str) -> Option<&ConfigEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

impl<F: Filesystem + Clone> ConfigStore<F> {
    /// Create the device-scoped store for `device_name` on the same
    /// filesystem. The new store still needs its own [`setup`](Self::setup).
    pub fn device_config(&self, device_name: &str) -> ConfigStore<F> {
        ConfigStore::for_device(device_name, self.fs.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;
    use pretty_assertions::assert_eq;

    fn mounted_store(app: &str) -> (ConfigStore<MemoryFs>, MemoryFs) {
        let fs = MemoryFs::new();
        let mut store = ConfigStore::new(app, fs.clone());
        store.setup();
        (store, fs)
    }

    #[test]
    fn test_new_store() {
        let fs = MemoryFs::new();
        let store = ConfigStore::new("myapp", fs.clone());

        assert_eq!(store.app_name(), "myapp");
        assert_eq!(store.file_name(), "/config/myapp.cfg");
        assert!(store.is_empty());
        assert!(!store.has_changed());
        assert!(!store.littlefs_mounted());
        assert!(!fs.is_mounted());
    }

    #[test]
    fn test_setup_without_file() {
        let (store, _fs) = mounted_store("myapp");

        assert!(store.littlefs_mounted());
        assert!(store.is_empty());
        assert_eq!(store.get_value_or("missing", "fallback"), "fallback");
        assert_eq!(store.get_value("missing"), "");
    }

    #[test]
    fn test_setup_loads_file() {
        let fs = MemoryFs::new();
        fs.write_file("/config/myapp.cfg", "a=1\nb=2\n");
        let mut store = ConfigStore::new("myapp", fs);
        store.setup();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get_value("a"), "1");
        assert_eq!(store.get_value("b"), "2");
        assert!(!store.has_changed());
    }

    #[test]
    fn test_setup_skips_undecodable_lines() {
        let fs = MemoryFs::new();
        fs.write_file(
            "/config/myapp.cfg",
            b"wifi_ssid=HomeNet\nbad=\xFF\xFE\nboot_count=42\n".to_vec(),
        );
        let mut store = ConfigStore::new("myapp", fs.clone());
        store.setup();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get_value("wifi_ssid"), "HomeNet");
        assert_eq!(store.get_value("boot_count"), "42");
        assert!(!store.has_changed());

        store.set_value("x", "1");
        assert!(store.save_to_file());
        assert_eq!(
            fs.read_file("/config/myapp.cfg").as_deref(),
            Some("wifi_ssid=HomeNet\nboot_count=42\nx=1\n")
        );
    }

    #[test]
    fn test_load_failure_reports_read_error() {
        let fs = MemoryFs::new();
        fs.write_file("/config/myapp.cfg", "a=1\n");
        fs.fail_reads(true);
        let mut store = ConfigStore::new("myapp", fs);
        store.fs.mount().unwrap();

        assert!(matches!(
            store.load(),
            Err(ConfigError::ReadFailure { ref path, .. }) if path == "/config/myapp.cfg"
        ));
    }

    #[test]
    fn test_setup_unreadable_file_starts_empty() {
        let fs = MemoryFs::new();
        fs.write_file("/config/myapp.cfg", "a=1\nb=2\n");
        fs.fail_reads(true);
        let mut store = ConfigStore::new("myapp", fs.clone());
        store.set_value("stale", "x");

        store.setup();

        assert!(store.littlefs_mounted());
        assert!(store.is_empty());
        assert!(!store.has_changed());
        assert_eq!(store.get_value_or("a", "fallback"), "fallback");

        fs.fail_reads(false);
        store.setup();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_setup_mount_failure() {
        let fs = MemoryFs::new();
        fs.fail_mount();
        let mut store = ConfigStore::new("myapp", fs);
        store.setup();

        assert!(!store.littlefs_mounted());
        store.set_value("k", "v");
        assert_eq!(store.get_value("k"), "v");
        assert!(matches!(store.save(), Err(ConfigError::FilesystemUnavailable)));
        assert!(!store.save_to_file());
        assert!(store.has_changed());
    }

    #[test]
    fn test_set_then_get() {
        let (mut store, _fs) = mounted_store("myapp");
        store.set_value("wifi_ssid", "HomeNet");

        assert_eq!(store.get_value("wifi_ssid"), "HomeNet");
        assert!(store.has_changed());
    }

    #[test]
    fn test_set_replaces_in_place() {
        let (mut store, _fs) = mounted_store("myapp");
        store.set_value("k", "a");
        store.set_value("other", "x");
        store.set_value("k", "b");

        assert_eq!(
            store.entries(),
            &[ConfigEntry::new("k", "b"), ConfigEntry::new("other", "x")]
        );
    }

    #[test]
    fn test_unset_value() {
        let (mut store, _fs) = mounted_store("myapp");
        store.set_value("k", "v");
        assert!(store.save_to_file());

        assert!(store.unset_value("k"));
        assert!(store.has_changed());
        assert_eq!(store.get_value_or("k", "default"), "default");
    }

    #[test]
    fn test_unset_absent_keeps_changed_flag() {
        let (mut store, _fs) = mounted_store("myapp");

        assert!(!store.unset_value("missing"));
        assert!(!store.has_changed());
    }

    #[test]
    fn test_unset_all_twice() {
        let (mut store, _fs) = mounted_store("myapp");
        store.set_value("a", "1");
        store.set_value("b", "2");

        store.unset_all();
        assert!(store.is_empty());
        store.unset_all();
        assert!(store.is_empty());
        assert!(store.has_changed());
    }

    #[test]
    fn test_save_writes_file_and_clears_changed() {
        let (mut store, fs) = mounted_store("myapp");
        store.set_value("wifi_ssid", "HomeNet");
        store.set_value("boot_count", "42");

        store.save().unwrap();

        assert!(!store.has_changed());
        assert_eq!(
            fs.read_file("/config/myapp.cfg").as_deref(),
            Some("wifi_ssid=HomeNet\nboot_count=42\n")
        );
    }

    #[test]
    fn test_save_failure_keeps_entries() {
        let (mut store, fs) = mounted_store("myapp");
        store.set_value("k", "v");
        fs.fail_writes(true);

        assert!(matches!(store.save(), Err(ConfigError::WriteFailure { .. })));
        assert_eq!(store.get_value("k"), "v");
        assert!(store.has_changed());

        fs.fail_writes(false);
        assert!(store.save_to_file());
        assert!(!store.has_changed());
    }

    #[test]
    fn test_setup_reload_discards_unsaved() {
        let (mut store, _fs) = mounted_store("myapp");
        store.set_value("saved", "1");
        store.save().unwrap();
        store.set_value("unsaved", "2");

        store.setup();

        assert!(store.contains("saved"));
        assert!(!store.contains("unsaved"));
        assert!(!store.has_changed());
    }

    #[test]
    fn test_device_config() {
        let (mut store, fs) = mounted_store("myapp");
        store.set_value("app_key", "1");
        store.save().unwrap();

        let mut device = store.device_config("thermostat");
        assert_eq!(device.app_name(), "device_thermostat");
        assert_eq!(device.file_name(), "/config/device_thermostat.cfg");

        device.setup();
        assert!(device.is_empty());
        device.set_value("setpoint", "21.5");
        assert!(device.save_to_file());

        assert_eq!(
            fs.read_file("/config/device_thermostat.cfg").as_deref(),
            Some("setpoint=21.5\n")
        );
        assert_eq!(store.get_value("setpoint"), "");
    }
}
