//! Key-value storage seam
//!
//! Every component reads and writes through [`KeyValueStore`], a minimal
//! synchronous `get/set/remove` interface. Two lifetimes exist:
//! - **durable** ([`PersistentConfigStore`]): survives restarts
//! - **ephemeral** ([`EphemeralConfigStore`]): lives for one session
//!
//! The typed wrappers never fail outward. Storage errors are logged and the
//! caller keeps operating on its in-memory state; reads degrade to `None`.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, warn};

use crate::constants::{FLAG_TRUE, paths};

/// Storage backend failure
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Minimal synchronous key-value backend
///
/// Methods take `&self`; backends use interior mutability since the store is
/// shared by several components on one thread.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove(&self, key: &str) -> StorageResult<()>;
}

/// In-process map. Used as the ephemeral store and as a durable fake.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Durable store backed by a single JSON object file
///
/// The file is read once on open and rewritten on every mutation.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RefCell<BTreeMap<String, String>>,
}

impl FileStore {
    /// Default location: `<data_dir>/a11y-overlay/store.json`
    pub fn default_path() -> PathBuf {
        let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(paths::APP_DIR);
        path.push(paths::STORE_FILENAME);
        path
    }

    /// Open the store at `path`. A missing file is an empty store; an
    /// unreadable or corrupt file is logged and treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<BTreeMap<String, String>>(&contents) {
                Ok(entries) => {
                    debug!(path = %path.display(), keys = entries.len(), "Loaded durable store");
                    entries
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Durable store file is corrupt, starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Durable store file unreadable, starting empty");
                BTreeMap::new()
            }
        };

        Self {
            path,
            entries: RefCell::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.borrow_mut();
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.entries.borrow_mut();
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}

/// Shared handle with typed, non-failing accessors
#[derive(Clone)]
struct StoreHandle {
    backend: Rc<dyn KeyValueStore>,
    lifetime: &'static str,
}

impl StoreHandle {
    fn get_raw(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(store = self.lifetime, key, error = %e, "Storage read failed, treating as absent");
                None
            }
        }
    }

    fn set_raw(&self, key: &str, value: &str) -> bool {
        match self.backend.set(key, value) {
            Ok(()) => true,
            Err(e) => {
                warn!(store = self.lifetime, key, error = %e, "Storage write failed, keeping in-memory value");
                false
            }
        }
    }

    fn remove(&self, key: &str) -> bool {
        match self.backend.remove(key) {
            Ok(()) => true,
            Err(e) => {
                warn!(store = self.lifetime, key, error = %e, "Storage remove failed");
                false
            }
        }
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get_raw(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(store = self.lifetime, key, error = %e, "Malformed stored record, treating as absent");
                None
            }
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> bool {
        match serde_json::to_string(value) {
            Ok(json) => self.set_raw(key, &json),
            Err(e) => {
                warn!(store = self.lifetime, key, error = %e, "Failed to serialize record");
                false
            }
        }
    }

    fn get_flag(&self, key: &str) -> bool {
        self.get_raw(key).is_some_and(|v| v.trim() == FLAG_TRUE)
    }

    fn set_flag(&self, key: &str) -> bool {
        self.set_raw(key, FLAG_TRUE)
    }
}

macro_rules! typed_store {
    ($(#[$meta:meta])* $name:ident, $lifetime:literal) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name {
            inner: StoreHandle,
        }

        impl $name {
            pub fn new(backend: Rc<dyn KeyValueStore>) -> Self {
                Self {
                    inner: StoreHandle { backend, lifetime: $lifetime },
                }
            }

            /// Store backed by a fresh [`MemoryStore`]
            pub fn in_memory() -> Self {
                Self::new(Rc::new(MemoryStore::new()))
            }

            /// Raw string value; `None` when absent or unreadable
            pub fn get_raw(&self, key: &str) -> Option<String> {
                self.inner.get_raw(key)
            }

            /// Returns `false` when the write was rejected
            pub fn set_raw(&self, key: &str, value: &str) -> bool {
                self.inner.set_raw(key, value)
            }

            pub fn remove(&self, key: &str) -> bool {
                self.inner.remove(key)
            }

            /// JSON-decoded value; malformed records read as `None`
            pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
                self.inner.get_json(key)
            }

            pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> bool {
                self.inner.set_json(key, value)
            }

            /// True only for an exact `"true"` marker
            pub fn get_flag(&self, key: &str) -> bool {
                self.inner.get_flag(key)
            }

            pub fn set_flag(&self, key: &str) -> bool {
                self.inner.set_flag(key)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name)).finish_non_exhaustive()
            }
        }
    };
}

typed_store!(
    /// Durable store: survives reloads and restarts
    PersistentConfigStore,
    "durable"
);

typed_store!(
    /// Session-scoped store: cleared when the session ends
    EphemeralConfigStore,
    "ephemeral"
);
