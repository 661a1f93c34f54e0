//! Durable string key/value storage for the session.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::Error;

/// Storage keys written by the session manager.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "accessToken";
    pub const ID_TOKEN: &str = "idToken";
    pub const USER_INFO: &str = "userInfo";
    pub const IS_LOGGED_IN: &str = "isLoggedIn";
    pub const USER_EMAIL: &str = "userEmail";

    /// Every key owned by the session; cleared together on logout.
    pub const ALL: [&str; 5] = [ACCESS_TOKEN, ID_TOKEN, USER_INFO, IS_LOGGED_IN, USER_EMAIL];

    /// Value stored under [`IS_LOGGED_IN`] while a session exists.
    pub const LOGGED_IN_SENTINEL: &str = "true";
}

/// String-valued key/value storage that survives process restarts.
///
/// Multi-key writes must be all-or-nothing: a reader never observes half of a
/// `set_many` or `remove_many`.
pub trait KeyValueStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> Result<Option<String>, Error>;

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), Error>;

    fn remove_many(&self, keys: &[&str]) -> Result<(), Error>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        (**self).get(key)
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), Error> {
        (**self).set_many(entries)
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), Error> {
        (**self).remove_many(keys)
    }
}

/// In-process storage. Nothing outlives the process; used by tests and
/// short-lived hosts.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, Error> {
        self.entries
            .lock()
            .map_err(|_| Error::Storage("memory storage lock poisoned".into()))
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), Error> {
        let mut map = self.lock()?;
        for (key, value) in entries {
            map.insert((*key).to_owned(), (*value).to_owned());
        }
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), Error> {
        let mut map = self.lock()?;
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}

/// JSON-file storage.
///
/// The whole map is rewritten on every mutation through a temp file and a
/// rename, so a crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_raw(&self) -> Result<Option<String>, Error> {
        match fs::read_to_string(&self.path) {
            Ok(data) if data.trim().is_empty() => Ok(None),
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::Storage(format!("{}: {err}", self.path.display()))),
        }
    }

    fn parse(&self, raw: &str) -> Result<HashMap<String, String>, Error> {
        serde_json::from_str(raw)
            .map_err(|e| Error::Storage(format!("{}: {e}", self.path.display())))
    }

    fn read_all(&self) -> Result<HashMap<String, String>, Error> {
        match self.read_raw()? {
            Some(raw) => self.parse(&raw),
            None => Ok(HashMap::new()),
        }
    }

    fn write_all(&self, entries: &HashMap<String, String>) -> Result<(), Error> {
        let io_err = |e: std::io::Error| Error::Storage(format!("{}: {e}", self.path.display()));

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let serialized = serde_json::to_string_pretty(entries)
            .map_err(|e| Error::Storage(format!("serialize: {e}")))?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serialized).map_err(io_err)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600)).map_err(io_err)?;
        }
        fs::rename(&tmp, &self.path).map_err(io_err)
    }

    fn update(&self, apply: impl FnOnce(&mut HashMap<String, String>)) -> Result<(), Error> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| Error::Storage("file storage lock poisoned".into()))?;
        // Reads stay strict; a write replaces an unparsable file.
        let mut entries = match self.read_raw()? {
            Some(raw) => self.parse(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Overwriting unreadable storage file");
                HashMap::new()
            }),
            None => HashMap::new(),
        };
        apply(&mut entries);
        self.write_all(&entries)
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.read_all()?.remove(key))
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), Error> {
        self.update(|map| {
            for (key, value) in entries {
                map.insert((*key).to_owned(), (*value).to_owned());
            }
        })
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), Error> {
        self.update(|map| {
            for key in keys {
                map.remove(*key);
            }
        })
    }
}
