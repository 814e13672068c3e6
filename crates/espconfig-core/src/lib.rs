//! # espconfig-core
//!
//! Persistent name/value configuration store for ESP8266/ESP32 class firmware.
//!
//! This crate provides:
//! - The configuration entry type and its line-oriented file format
//! - A filesystem collaborator trait plus an in-memory implementation
//! - `ConfigStore`, which loads entries at setup, serves them from memory
//!   and writes the whole set back on demand
//!
//! This crate is intentionally runtime-agnostic and performs no I/O of its
//! own: every file access goes through the injected [`Filesystem`].
//!
//! # Example
//!
//! ```
//! use espconfig_core::{ConfigStore, MemoryFs};
//!
//! let mut store = ConfigStore::new("myapp", MemoryFs::new());
//! store.setup();
//!
//! store.set_value("wifi_ssid", "HomeNet");
//! assert_eq!(store.get_value("wifi_ssid"), "HomeNet");
//! assert!(store.save_to_file());
//! ```

pub mod entry;
pub mod error;
pub mod format;
pub mod fs;
pub mod store;

pub use entry::ConfigEntry;
pub use error::{ConfigError, FormatError, FsError};
pub use fs::{Filesystem, MemoryFs};
pub use store::{
    config_path, device_app_name, ConfigStore, CONFIG_DIR, CONFIG_EXTENSION, DEVICE_PREFIX,
};
