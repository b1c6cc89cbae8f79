//! Key-value persistence for the resolved site id.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tokio::runtime::{Handle, RuntimeFlavor};

/// Key the resolved site id is cached under.
pub const SITE_ID_KEY: &str = "cms_site_id";

/// A small string store that outlives a single resolution.
///
/// Failures to persist are logged by implementations and never surface;
/// a lost cache entry only costs a slower resolution next time.
pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}

/// Store backed by a JSON object on disk, so the id survives restarts.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> HashMap<String, String> {
        match std::fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable site cache {:?}: {}", self.path, e);
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        }
    }

    fn save(&self, entries: &HashMap<String, String>) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("Failed to create site cache directory {:?}: {}", parent, e);
                return;
            }
        }

        let result = serde_json::to_vec_pretty(entries)
            .map_err(std::io::Error::other)
            .and_then(|bytes| std::fs::write(&self.path, bytes));
        if let Err(e) = result {
            tracing::warn!("Failed to write site cache {:?}: {}", self.path, e);
        }
    }

    fn update(&self, apply: impl FnOnce(&mut HashMap<String, String>)) {
        off_runtime(|| {
            let Ok(_guard) = self.lock.lock() else {
                return;
            };
            let mut entries = self.load();
            apply(&mut entries);
            self.save(&entries);
        })
    }
}

/// Run blocking file I/O, handing this worker's other tasks to the rest of a
/// multi-threaded runtime first. Elsewhere the closure runs inline.
fn off_runtime<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

impl LocalStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        off_runtime(|| {
            let _guard = self.lock.lock().ok()?;
            self.load().remove(key)
        })
    }

    fn set(&self, key: &str, value: &str) {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        });
    }

    fn remove(&self, key: &str) {
        self.update(|entries| {
            entries.remove(key);
        });
    }
}
