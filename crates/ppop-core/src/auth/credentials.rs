use std::fmt;

use serde::{Deserialize, Serialize};

use super::storage::{KeyValueStore, StoreError};

/// Storage key for the bearer token
pub const TOKEN_KEY: &str = "ppop_token";

/// Storage key for the identity label (the clinician's email)
pub const IDENTITY_KEY: &str = "ppop_email";

/// A bearer token together with the identity it was issued to.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    pub identity: String,
}

impl Credential {
    pub fn new(token: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            identity: identity.into(),
        }
    }
}

// Keep tokens out of logs and panic messages
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("identity", &self.identity)
            .finish()
    }
}

/// Persists the credential as two keys that are always written and cleared
/// together.
pub struct CredentialStore {
    backend: Box<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// Store both the token and the identity
    pub fn save(&mut self, credential: &Credential) -> Result<(), StoreError> {
        self.backend.set(TOKEN_KEY, &credential.token)?;
        self.backend.set(IDENTITY_KEY, &credential.identity)?;
        Ok(())
    }

    /// Read the stored credential.
    ///
    /// Returns `None` unless both keys are present.
    pub fn load(&self) -> Result<Option<Credential>, StoreError> {
        let token = self.backend.get(TOKEN_KEY)?;
        let identity = self.backend.get(IDENTITY_KEY)?;
        match (token, identity) {
            (Some(token), Some(identity)) => Ok(Some(Credential { token, identity })),
            _ => Ok(None),
        }
    }

    /// Remove both keys. Both removals are attempted even if the first fails.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        let token = self.backend.remove(TOKEN_KEY);
        let identity = self.backend.remove(IDENTITY_KEY);
        token.and(identity)
    }
}
