use tracing::{debug, warn};

use super::session::SessionContext;

/// Startup progress of the session. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum HydrationState {
    #[default]
    Uninitialized,
    Hydrating,
    Ready,
}

/// One-shot load of the persisted credential into the session.
///
/// Until `run` has finished, nothing that depends on the session (rendering,
/// the route guard) may act, otherwise a returning user would be treated as
/// logged out on the first frame.
#[derive(Debug, Default)]
pub struct HydrationGate {
    state: HydrationState,
}

impl HydrationGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> HydrationState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == HydrationState::Ready
    }

    /// Load the stored credential into `session`.
    ///
    /// Returns `false` if hydration already happened. An unreadable store is
    /// logged and hydrates as logged out.
    pub fn run(&mut self, session: &mut SessionContext) -> bool {
        if self.state != HydrationState::Uninitialized {
            debug!(state = ?self.state, "Hydration already performed");
            return false;
        }
        self.state = HydrationState::Hydrating;

        match session.store().load() {
            Ok(Some(credential)) => {
                debug!(identity = %credential.identity, "Restored stored credential");
                session.restore(credential);
            }
            Ok(None) => debug!("No stored credential"),
            Err(e) => warn!(error = %e, "Failed to read stored credential"),
        }

        self.state = HydrationState::Ready;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::credentials::{Credential, CredentialStore};
    use crate::auth::storage::{FileStore, MemoryStore};
    use tempfile::TempDir;

    #[test]
    fn test_hydrate_with_stored_credential() {
        let mut store = CredentialStore::new(MemoryStore::new());
        let credential = Credential::new("tok", "doc@example.org");
        store.save(&credential).unwrap();

        let mut session = SessionContext::new(store);
        let mut gate = HydrationGate::new();
        assert_eq!(gate.state(), HydrationState::Uninitialized);

        assert!(gate.run(&mut session));
        assert!(gate.is_ready());
        assert!(session.is_authenticated());
        assert_eq!(session.current_credential(), Some(&credential));
    }

    #[test]
    fn test_hydrate_with_empty_store() {
        let mut session = SessionContext::new(CredentialStore::new(MemoryStore::new()));
        let mut gate = HydrationGate::new();

        gate.run(&mut session);

        assert!(gate.is_ready());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_hydrate_runs_once() {
        let mut session = SessionContext::new(CredentialStore::new(MemoryStore::new()));
        let mut gate = HydrationGate::new();

        assert!(gate.run(&mut session));
        assert!(!gate.run(&mut session));
        assert_eq!(gate.state(), HydrationState::Ready);
    }

    #[test]
    fn test_hydrate_survives_corrupt_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "{broken").unwrap();

        let mut session = SessionContext::new(CredentialStore::new(FileStore::new(path)));
        let mut gate = HydrationGate::new();
        gate.run(&mut session);

        assert!(gate.is_ready());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_states_are_ordered() {
        assert!(HydrationState::Uninitialized < HydrationState::Hydrating);
        assert!(HydrationState::Hydrating < HydrationState::Ready);
    }
}
