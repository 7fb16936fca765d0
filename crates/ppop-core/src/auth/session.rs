use tracing::{info, warn};

use crate::routing::{Navigator, LOGIN_PATH};
use crate::validation::ValidationError;

use super::credentials::{Credential, CredentialStore};

/// The in-memory session and the store that backs it.
///
/// The credential only changes through `login`, `logout`, and the one-shot
/// restore performed by the hydration gate. `is_authenticated` is derived
/// from it and cannot be set on its own.
pub struct SessionContext {
    store: CredentialStore,
    credential: Option<Credential>,
}

impl SessionContext {
    pub fn new(store: CredentialStore) -> Self {
        Self {
            store,
            credential: None,
        }
    }

    /// Record a credential the caller has already validated against the
    /// backend, and persist it.
    ///
    /// A storage failure is logged; the session is still authenticated for
    /// the rest of the process.
    pub fn login(&mut self, token: &str, identity: &str) -> Result<(), ValidationError> {
        if token.is_empty() {
            return Err(ValidationError::Required("Token"));
        }
        if identity.is_empty() {
            return Err(ValidationError::Required("Email"));
        }

        let credential = Credential::new(token, identity);
        if let Err(e) = self.store.save(&credential) {
            warn!(error = %e, "Failed to persist credential");
        }
        info!(identity, "Logged in");
        self.credential = Some(credential);
        Ok(())
    }

    /// Forget the credential everywhere and go to the login screen.
    ///
    /// Safe to call when already logged out.
    pub fn logout(&mut self, navigator: &mut dyn Navigator) {
        if let Some(credential) = self.credential.take() {
            info!(identity = %credential.identity, "Logged out");
        }
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear stored credential");
        }
        navigator.replace(LOGIN_PATH);
    }

    pub fn current_credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn identity(&self) -> Option<&str> {
        self.credential.as_ref().map(|c| c.identity.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }

    pub(crate) fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Populate from storage without writing back.
    pub(crate) fn restore(&mut self, credential: Credential) {
        self.credential = Some(credential);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::credentials::TOKEN_KEY;
    use crate::auth::storage::{FileStore, KeyValueStore, MemoryStore};
    use crate::routing::Router;
    use tempfile::TempDir;

    fn file_session(dir: &TempDir) -> SessionContext {
        let path = dir.path().join("credentials.json");
        SessionContext::new(CredentialStore::new(FileStore::new(path)))
    }

    fn stored(dir: &TempDir) -> Option<Credential> {
        let path = dir.path().join("credentials.json");
        CredentialStore::new(FileStore::new(path)).load().unwrap()
    }

    #[test]
    fn test_new_session_is_empty() {
        let session = SessionContext::new(CredentialStore::new(MemoryStore::new()));
        assert!(!session.is_authenticated());
        assert!(session.current_credential().is_none());
    }

    #[test]
    fn test_login_sets_and_persists() {
        let dir = TempDir::new().unwrap();
        let mut session = file_session(&dir);

        session.login("tok-1", "doc@example.org").unwrap();

        let expected = Credential::new("tok-1", "doc@example.org");
        assert!(session.is_authenticated());
        assert_eq!(session.current_credential(), Some(&expected));
        assert_eq!(session.identity(), Some("doc@example.org"));
        assert_eq!(stored(&dir), Some(expected));
    }

    #[test]
    fn test_login_rejects_empty_fields() {
        let dir = TempDir::new().unwrap();
        let mut session = file_session(&dir);

        assert_eq!(
            session.login("", "doc@example.org"),
            Err(ValidationError::Required("Token"))
        );
        assert_eq!(session.login("tok", ""), Err(ValidationError::Required("Email")));
        assert!(!session.is_authenticated());
        assert_eq!(stored(&dir), None);
    }

    #[test]
    fn test_login_overwrites_previous_credential() {
        let dir = TempDir::new().unwrap();
        let mut session = file_session(&dir);

        session.login("old", "a@example.org").unwrap();
        session.login("new", "b@example.org").unwrap();

        assert_eq!(stored(&dir), Some(Credential::new("new", "b@example.org")));
    }

    #[test]
    fn test_logout_clears_and_redirects() {
        let dir = TempDir::new().unwrap();
        let mut session = file_session(&dir);
        let mut router = Router::new("/patients");

        session.login("tok", "doc@example.org").unwrap();
        session.logout(&mut router);

        assert!(!session.is_authenticated());
        assert_eq!(stored(&dir), None);
        assert_eq!(router.current(), LOGIN_PATH);
    }

    #[test]
    fn test_logout_and_login_recover_corrupt_storage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "{broken").unwrap();
        let mut router = Router::new("/patients");

        let mut session = file_session(&dir);
        session.logout(&mut router);
        assert!(!path.exists());

        session.login("tok", "doc@example.org").unwrap();

        let mut reloaded = file_session(&dir);
        let credential = reloaded.store().load().unwrap().unwrap();
        reloaded.restore(credential);
        assert!(reloaded.is_authenticated());
        assert_eq!(reloaded.identity(), Some("doc@example.org"));
    }

    #[test]
    fn test_logout_clears_half_written_storage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.json");
        let mut partial = FileStore::new(path.clone());
        partial.set(TOKEN_KEY, "orphan").unwrap();
        let mut router = Router::new("/");

        let mut session = file_session(&dir);
        assert!(!session.is_authenticated());
        session.logout(&mut router);

        assert!(!path.exists());
        assert!(!session.is_authenticated());
        assert_eq!(router.current(), LOGIN_PATH);
    }

    #[test]
    fn test_logout_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut session = file_session(&dir);
        let mut router = Router::new("/");

        session.login("tok", "doc@example.org").unwrap();
        session.logout(&mut router);
        session.logout(&mut router);

        assert!(!session.is_authenticated());
        assert_eq!(stored(&dir), None);
        assert_eq!(router.current(), LOGIN_PATH);
    }
}
