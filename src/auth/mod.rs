//! Credential storage and resolution.
//!
//! The API key lives in the system keyring when available, with an
//! environment-variable fallback for headless setups. The credential never
//! enters session state, so clearing a conversation cannot touch it.

use keyring::Entry;
use std::error::Error;
use std::io::{self, Write};
use tracing::warn;

/// Environment fallback for the endpoint credential.
pub const ENV_API_KEY: &str = "MMCHAT_API_KEY";

const KEYRING_SERVICE: &str = "mmchat";
const KEYRING_USER: &str = "api-key";

pub struct AuthManager {
    use_keyring: bool,
}

impl AuthManager {
    pub fn new() -> Self {
        Self::new_with_keyring(true)
    }

    /// Construct an AuthManager, optionally disabling keyring access
    /// (useful for tests and headless environments).
    pub fn new_with_keyring(use_keyring: bool) -> Self {
        Self { use_keyring }
    }

    fn entry(&self) -> Result<Entry, keyring::Error> {
        Entry::new(KEYRING_SERVICE, KEYRING_USER)
    }

    /// Resolve the API key: keyring entry first, environment second.
    pub fn resolve_token(&self) -> Option<String> {
        if self.use_keyring {
            match self.entry().and_then(|entry| entry.get_password()) {
                Ok(token) if !token.is_empty() => return Some(token),
                Ok(_) | Err(keyring::Error::NoEntry) => {}
                Err(err) => {
                    warn!(%err, "keyring unavailable, falling back to environment");
                }
            }
        }
        std::env::var(ENV_API_KEY).ok().filter(|t| !t.is_empty())
    }

    pub fn store_token(&self, token: &str) -> Result<(), Box<dyn Error>> {
        if !self.use_keyring {
            return Err("keyring disabled; set the environment variable instead".into());
        }
        self.entry()?.set_password(token)?;
        Ok(())
    }

    pub fn remove_token(&self) -> Result<(), Box<dyn Error>> {
        if !self.use_keyring {
            return Ok(());
        }
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(Box::new(err)),
        }
    }

    /// Prompt for an API key on the terminal and store it in the keyring.
    pub fn interactive_auth(&self) -> Result<(), Box<dyn Error>> {
        print!("API key: ");
        io::stdout().flush()?;
        let mut token = String::new();
        io::stdin().read_line(&mut token)?;
        let token = token.trim();
        if token.is_empty() {
            return Err("no API key entered".into());
        }
        self.store_token(token)?;
        println!("✅ API key stored in the system keyring.");
        Ok(())
    }

    pub fn interactive_deauth(&self) -> Result<(), Box<dyn Error>> {
        self.remove_token()?;
        println!("✅ Stored API key removed.");
        Ok(())
    }
}

impl Default for AuthManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyring_disabled_falls_back_to_environment() {
        let manager = AuthManager::new_with_keyring(false);
        std::env::remove_var(ENV_API_KEY);
        assert!(manager.resolve_token().is_none());

        std::env::set_var(ENV_API_KEY, "secret-token");
        assert_eq!(manager.resolve_token().as_deref(), Some("secret-token"));
        std::env::remove_var(ENV_API_KEY);
    }

    #[test]
    fn store_without_keyring_is_an_error() {
        let manager = AuthManager::new_with_keyring(false);
        assert!(manager.store_token("x").is_err());
        assert!(manager.remove_token().is_ok());
    }
}
