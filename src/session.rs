// Session persistence: the accounts text, the last command and the last
// verified backend survive between runs. The storage itself is an opaque
// string key-value store; the default one is a small JSON file in the
// user's home directory.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::warn;

pub const KEY_ACCOUNTS: &str = "multirun.accounts";
pub const KEY_COMMAND: &str = "multirun.lastCommand";
pub const KEY_API_BASE: &str = "multirun.apiBase";

const DEFAULT_SESSION_FILE: &str = ".multirun_session.json";

/// Opaque string store. Writes report failure but callers of
/// `SessionStore` never see it: persistence is best effort.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// What the UI restores at startup. `cached_backend` is `None` when no
/// backend has been stored (or the stored one was cleared).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub accounts_text: String,
    pub last_command: String,
    pub cached_backend: Option<String>,
}

/// Typed view over the three session keys. Cheap to clone; clones share
/// the same store.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        SessionStore { store }
    }

    /// Missing keys load as empty values.
    pub fn load(&self) -> SessionState {
        SessionState {
            accounts_text: self.store.get(KEY_ACCOUNTS).unwrap_or_default(),
            last_command: self.store.get(KEY_COMMAND).unwrap_or_default(),
            cached_backend: self.cached_backend(),
        }
    }

    /// Writes every key. A `None` backend is stored as an empty value, so
    /// it loads back as `None`.
    pub fn save(&self, state: &SessionState) {
        self.save_accounts(&state.accounts_text);
        self.save_command(&state.last_command);
        self.remember_backend(state.cached_backend.as_deref().unwrap_or(""));
    }

    pub fn save_accounts(&self, accounts_text: &str) {
        self.write(KEY_ACCOUNTS, accounts_text);
    }

    /// The command is stored trimmed.
    pub fn save_command(&self, command: &str) {
        self.write(KEY_COMMAND, command.trim());
    }

    pub fn cached_backend(&self) -> Option<String> {
        self.store
            .get(KEY_API_BASE)
            .filter(|base| !base.trim().is_empty())
    }

    pub fn remember_backend(&self, base: &str) {
        self.write(KEY_API_BASE, base);
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(error) = self.store.set(key, value) {
            warn!(key, error = %format!("{error:#}"), "failed to persist session value");
        }
    }
}

/// In-memory store, for tests and for running without a session file.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON object on disk, rewritten on every `set`. An unreadable or
/// corrupt file is treated as empty.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|error| {
                warn!(path = %path.display(), %error, "ignoring unreadable session file");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        FileStore {
            path,
            entries: Mutex::new(entries),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        let data = serde_json::to_string_pretty(&*entries).context("Serializing session")?;
        std::fs::write(&self.path, data)
            .with_context(|| format!("Writing session file {}", self.path.display()))?;
        Ok(())
    }
}

/// Session file in the user's home directory (or the working directory
/// when no home is known).
pub fn default_session_path() -> PathBuf {
    let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.join(DEFAULT_SESSION_FILE)
}
