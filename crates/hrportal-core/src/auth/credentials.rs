use anyhow::{Context, Result};
use keyring::Entry;

use super::session::{SessionBackend, SessionRecord};

const SERVICE_NAME: &str = "hrportal";

/// Keychain account the session record is stored under
const SESSION_ACCOUNT: &str = "session";

/// Keeps the session record in the OS keychain as one JSON secret.
#[derive(Debug, Clone)]
pub struct KeyringBackend {
    service: String,
}

impl KeyringBackend {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    /// Use a different keychain service name, e.g. one per API environment.
    pub fn with_service(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(&self.service, SESSION_ACCOUNT).context("Failed to create keyring entry")
    }
}

impl Default for KeyringBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBackend for KeyringBackend {
    fn load(&self) -> Result<Option<SessionRecord>> {
        match self.entry()?.get_password() {
            Ok(secret) => {
                let record = serde_json::from_str(&secret)
                    .context("Failed to parse session stored in keychain")?;
                Ok(Some(record))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve session from keychain"),
        }
    }

    fn save(&self, record: &SessionRecord) -> Result<()> {
        let secret = serde_json::to_string(record)?;
        self.entry()?
            .set_password(&secret)
            .context("Failed to store session in keychain")
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete session from keychain"),
        }
    }
}
