//! Durable storage for the session token.
//!
//! Exactly one key is persisted: `token`. A missing key means logged out.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{Config, TokenBackend, APP_NAME};

use super::Token;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Keyring account the token is stored under
const KEYRING_ACCOUNT: &str = "token";

/// Backing storage for the current token. Only `SessionContext` writes to it.
pub trait TokenStore: Send {
    fn load(&self) -> Result<Option<Token>>;
    fn save(&mut self, token: &Token) -> Result<()>;
    /// Removing an absent entry is not an error.
    fn clear(&mut self) -> Result<()>;
}

/// Build the store selected in the configuration.
pub fn open_store(config: &Config) -> Result<Box<dyn TokenStore>> {
    match config.token_backend {
        TokenBackend::File => Ok(Box::new(FileTokenStore::new(config.cache_dir()?))),
        TokenBackend::Keyring => Ok(Box::new(KeyringTokenStore::new(APP_NAME))),
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    token: String,
}

/// Token kept in `session.json` under the cache directory.
pub struct FileTokenStore {
    cache_dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    pub fn path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }

    fn read(path: &Path) -> Result<SessionFile> {
        let contents = std::fs::read_to_string(path).context("Failed to read session file")?;
        serde_json::from_str(&contents).context("Failed to parse session file")
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<Token>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let file = Self::read(&path)?;
        Ok(Token::new(file.token))
    }

    fn save(&mut self, token: &Token) -> Result<()> {
        let path = self.path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&SessionFile {
            token: token.as_str().to_string(),
        })?;
        std::fs::write(&path, contents).context("Failed to write session file")?;
        debug!(path = %path.display(), "Session token saved");
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        let path = self.path();
        if path.exists() {
            std::fs::remove_file(&path).context("Failed to remove session file")?;
            debug!(path = %path.display(), "Session token removed");
        }
        Ok(())
    }
}

/// Token kept in the OS keychain.
pub struct KeyringTokenStore {
    service: String,
}

impl KeyringTokenStore {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(&self.service, KEYRING_ACCOUNT).context("Failed to create keyring entry")
    }
}

impl TokenStore for KeyringTokenStore {
    fn load(&self) -> Result<Option<Token>> {
        match self.entry()?.get_password() {
            Ok(value) => Ok(Token::new(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read token from keychain"),
        }
    }

    fn save(&mut self, token: &Token) -> Result<()> {
        self.entry()?
            .set_password(token.as_str())
            .context("Failed to store token in keychain")
    }

    fn clear(&mut self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}

/// In-process store. Clones share the same slot, so a clone handed to a new
/// `SessionContext` behaves like a restart reading what the old one wrote.
#[derive(Clone, Default)]
pub struct MemoryTokenStore {
    slot: Arc<Mutex<Option<Token>>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(value: &str) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Token::new(value))),
        }
    }

    /// Current stored value, for inspection.
    pub fn peek(&self) -> Option<Token> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<Token>> {
        Ok(self.peek())
    }

    fn save(&mut self, token: &Token) -> Result<()> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(token.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}
