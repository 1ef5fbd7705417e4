use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const ROLE_KEY: &str = "hr_role";
pub const EMPLOYEE_ID_KEY: &str = "employee_id";
pub const FIRST_NAME_KEY: &str = "f_name";
pub const LAST_NAME_KEY: &str = "l_name";
pub const WORKSTATION_HOLD_KEY: &str = "workstation_hold";

/// Every key a session writes; all of them go away on logout.
pub const SESSION_KEYS: [&str; 6] = [
    ACCESS_TOKEN_KEY,
    ROLE_KEY,
    EMPLOYEE_ID_KEY,
    FIRST_NAME_KEY,
    LAST_NAME_KEY,
    WORKSTATION_HOLD_KEY,
];

/// The signed-in user's credential plus denormalized profile fields.
///
/// Holding a record says nothing about validity; the token's own expiry
/// claim decides that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub access_token: String,
    pub hr_role: String,
    pub employee_id: String,
    #[serde(rename = "f_name")]
    pub first_name: String,
    #[serde(rename = "l_name")]
    pub last_name: String,
    #[serde(default)]
    pub workstation_hold: Option<String>,
}

impl SessionRecord {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            (ACCESS_TOKEN_KEY, self.access_token.clone()),
            (ROLE_KEY, self.hr_role.clone()),
            (EMPLOYEE_ID_KEY, self.employee_id.clone()),
            (FIRST_NAME_KEY, self.first_name.clone()),
            (LAST_NAME_KEY, self.last_name.clone()),
        ];
        if let Some(ref hold) = self.workstation_hold {
            pairs.push((WORKSTATION_HOLD_KEY, hold.clone()));
        }
        pairs
    }

    fn from_map(map: &HashMap<String, String>) -> Option<Self> {
        let field = |key: &str| map.get(key).cloned().unwrap_or_default();
        let access_token = map.get(ACCESS_TOKEN_KEY)?.clone();
        Some(Self {
            access_token,
            hr_role: field(ROLE_KEY),
            employee_id: field(EMPLOYEE_ID_KEY),
            first_name: field(FIRST_NAME_KEY),
            last_name: field(LAST_NAME_KEY),
            workstation_hold: map.get(WORKSTATION_HOLD_KEY).cloned(),
        })
    }
}

/// Where a session record is persisted between runs.
pub trait SessionBackend: Send + Sync {
    fn load(&self) -> Result<Option<SessionRecord>>;
    fn save(&self, record: &SessionRecord) -> Result<()>;
    /// Remove every session key. Clearing an empty backend is not an error.
    fn clear(&self) -> Result<()>;
}

/// Process-local key-value store holding one entry per session key.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

impl SessionBackend for MemoryBackend {
    fn load(&self) -> Result<Option<SessionRecord>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(SessionRecord::from_map(&entries))
    }

    fn save(&self, record: &SessionRecord) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        for key in SESSION_KEYS {
            entries.remove(key);
        }
        for (key, value) in record.to_pairs() {
            entries.insert(key.to_string(), value);
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        for key in SESSION_KEYS {
            entries.remove(key);
        }
        Ok(())
    }
}

/// Persists the record as `session.json` in the cache directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    cache_dir: PathBuf,
}

impl FileBackend {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}

impl SessionBackend for FileBackend {
    fn load(&self) -> Result<Option<SessionRecord>> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        let record: SessionRecord =
            serde_json::from_str(&contents).context("Failed to parse session file")?;
        Ok(Some(record))
    }

    fn save(&self, record: &SessionRecord) -> Result<()> {
        std::fs::create_dir_all(&self.cache_dir).context("Failed to create cache directory")?;
        let contents = serde_json::to_string_pretty(record)?;
        std::fs::write(self.session_path(), contents).context("Failed to write session file")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove session file")?;
        }
        Ok(())
    }
}

/// Shared handle to the current session.
///
/// Clone is cheap; the facade and the guard hold clones of the same store.
#[derive(Clone)]
pub struct SessionStore {
    current: Arc<RwLock<Option<SessionRecord>>>,
    backend: Arc<dyn SessionBackend>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn SessionBackend>) -> Self {
        Self {
            current: Arc::new(RwLock::new(None)),
            backend,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Load the persisted record, if any. Returns whether one was found.
    pub fn load(&self) -> Result<bool> {
        let record = self.backend.load()?;
        let found = record.is_some();
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = record;
        debug!(found, "Session loaded from backend");
        Ok(found)
    }

    pub fn get(&self) -> Option<SessionRecord> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Bearer token of the current session, if one is held.
    pub fn token(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|r| r.access_token.clone())
            .filter(|t| !t.is_empty())
    }

    /// Replace the whole record. The backend is written first so a failed
    /// write leaves the previous session in place.
    pub fn set(&self, record: SessionRecord) -> Result<()> {
        self.backend.save(&record)?;
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(record);
        Ok(())
    }

    /// Drop the session from memory and the backend. Idempotent.
    pub fn clear(&self) -> Result<()> {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.backend.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SessionRecord {
        SessionRecord {
            access_token: "tok".to_string(),
            hr_role: "admin".to_string(),
            employee_id: "1001".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Cruz".to_string(),
            workstation_hold: Some("Main Office".to_string()),
        }
    }

    #[test]
    fn test_memory_backend_writes_and_clears_all_keys() {
        let backend = Arc::new(MemoryBackend::new());
        let store = SessionStore::new(backend.clone());

        store.set(record()).unwrap();
        assert_eq!(backend.keys().len(), SESSION_KEYS.len());
        assert_eq!(backend.get(ACCESS_TOKEN_KEY).as_deref(), Some("tok"));
        assert_eq!(store.token().as_deref(), Some("tok"));

        store.clear().unwrap();
        assert!(backend.keys().is_empty());
        assert!(store.get().is_none());
    }

    #[test]
    fn test_clear_twice_is_harmless() {
        let backend = Arc::new(MemoryBackend::new());
        let store = SessionStore::new(backend.clone());
        store.set(record()).unwrap();

        store.clear().unwrap();
        store.clear().unwrap();
        assert!(backend.keys().is_empty());
        assert!(store.token().is_none());
    }

    #[test]
    fn test_set_replaces_stale_workstation_hold() {
        let backend = Arc::new(MemoryBackend::new());
        let store = SessionStore::new(backend.clone());
        store.set(record()).unwrap();

        let mut next = record();
        next.workstation_hold = None;
        store.set(next).unwrap();
        assert!(backend.get(WORKSTATION_HOLD_KEY).is_none());
    }

    #[test]
    fn test_load_from_memory_backend() {
        let backend = Arc::new(MemoryBackend::new());
        backend.save(&record()).unwrap();

        let store = SessionStore::new(backend);
        assert!(store.load().unwrap());
        assert_eq!(store.get(), Some(record()));
    }

    #[test]
    fn test_file_backend_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(Arc::new(FileBackend::new(dir.path().join("hrportal"))));

        assert!(!store.load().unwrap());
        store.set(record()).unwrap();

        let reopened = SessionStore::new(Arc::new(FileBackend::new(dir.path().join("hrportal"))));
        assert!(reopened.load().unwrap());
        assert_eq!(reopened.get().unwrap().display_name(), "Ana Cruz");

        reopened.clear().unwrap();
        reopened.clear().unwrap();
        assert!(!dir.path().join("hrportal").join(SESSION_FILE).exists());
    }

    #[test]
    fn test_empty_token_is_not_a_token() {
        let store = SessionStore::in_memory();
        let mut empty = record();
        empty.access_token.clear();
        store.set(empty).unwrap();
        assert!(store.token().is_none());
    }
}
