//! The application shell: session, hydration gate and router in one place.
//!
//! Every client owns exactly one `Shell` and passes it explicitly to the code
//! that needs the session. The route guard is re-evaluated after every
//! navigation and every session change.

use tracing::{debug, info};

use crate::api::ApiError;
use crate::auth::{Credential, CredentialStore, HydrationGate, HydrationState, SessionContext};
use crate::routing::{Navigator, RouteGuard, Router, Screen};
use crate::validation::ValidationError;

pub struct Shell {
    session: SessionContext,
    gate: HydrationGate,
    router: Router,
}

impl Shell {
    pub fn new(store: CredentialStore, initial_path: &str) -> Self {
        Self {
            session: SessionContext::new(store),
            gate: HydrationGate::new(),
            router: Router::new(initial_path),
        }
    }

    /// Run the hydration gate, then apply the guard to the initial path.
    pub fn hydrate(&mut self) -> bool {
        let ran = self.gate.run(&mut self.session);
        if ran {
            self.enforce_guard();
        }
        ran
    }

    pub fn hydration_state(&self) -> HydrationState {
        self.gate.state()
    }

    /// Whether anything may be rendered yet.
    pub fn is_ready(&self) -> bool {
        self.gate.is_ready()
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.session.current_credential()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn current_path(&self) -> &str {
        self.router.current()
    }

    pub fn screen(&self) -> Screen {
        self.router.screen()
    }

    pub fn navigate(&mut self, path: &str) {
        self.router.push(path);
        self.enforce_guard();
    }

    pub fn redirect(&mut self, path: &str) {
        self.router.replace(path);
        self.enforce_guard();
    }

    pub fn back(&mut self) -> bool {
        let moved = self.router.back();
        if moved {
            self.enforce_guard();
        }
        moved
    }

    pub fn login(&mut self, token: &str, identity: &str) -> Result<(), ValidationError> {
        self.session.login(token, identity)?;
        self.enforce_guard();
        Ok(())
    }

    pub fn logout(&mut self) {
        self.session.logout(&mut self.router);
        self.enforce_guard();
    }

    /// Turn an API failure into what the user should see.
    ///
    /// `SessionExpired` logs out (which lands on the login screen) and yields
    /// nothing to display; every other error yields its message verbatim.
    pub fn handle_api_error(&mut self, err: &ApiError) -> Option<String> {
        if err.is_session_expired() {
            info!("Session expired, signing out");
            self.logout();
            return None;
        }
        err.user_message()
    }

    fn enforce_guard(&mut self) {
        let path = self.router.current().to_string();
        if let Some(target) = RouteGuard::evaluate(self.gate.state(), &self.session, &path) {
            debug!(from = %path, to = target, "Route guard redirect");
            self.router.replace(target);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryStore;
    use crate::routing::{HOME_PATH, LOGIN_PATH, PATIENTS_PATH};

    fn shell_with(credential: Option<Credential>, path: &str) -> Shell {
        let mut store = CredentialStore::new(MemoryStore::new());
        if let Some(credential) = credential {
            store.save(&credential).unwrap();
        }
        Shell::new(store, path)
    }

    #[test]
    fn test_not_ready_before_hydration() {
        let shell = shell_with(None, "/patients/1");
        assert!(!shell.is_ready());
        assert_eq!(shell.hydration_state(), HydrationState::Uninitialized);
        // Guard has not fired
        assert_eq!(shell.current_path(), "/patients/1");
    }

    #[test]
    fn test_navigation_before_hydration_does_not_redirect() {
        let mut shell = shell_with(None, HOME_PATH);
        shell.navigate("/patients/1");
        assert_eq!(shell.current_path(), "/patients/1");
    }

    #[test]
    fn test_returning_user_keeps_protected_path() {
        let credential = Credential::new("tok", "doc@example.org");
        let mut shell = shell_with(Some(credential.clone()), "/patients/1");

        assert!(shell.hydrate());

        assert!(shell.is_ready());
        assert!(shell.is_authenticated());
        assert_eq!(shell.credential(), Some(&credential));
        assert_eq!(shell.current_path(), "/patients/1");
    }

    #[test]
    fn test_anonymous_user_redirected_on_hydration() {
        let mut shell = shell_with(None, "/optimize/1");
        shell.hydrate();
        assert_eq!(shell.current_path(), LOGIN_PATH);
    }

    #[test]
    fn test_anonymous_navigation_redirected() {
        let mut shell = shell_with(None, HOME_PATH);
        shell.hydrate();
        assert_eq!(shell.current_path(), HOME_PATH);

        shell.navigate(PATIENTS_PATH);
        assert_eq!(shell.current_path(), LOGIN_PATH);
    }

    #[test]
    fn test_back_into_protected_path_redirected() {
        let mut shell = shell_with(Some(Credential::new("tok", "a@b.c")), HOME_PATH);
        shell.hydrate();
        shell.navigate(PATIENTS_PATH);
        shell.navigate(HOME_PATH);
        shell.logout();
        assert_eq!(shell.current_path(), LOGIN_PATH);

        // History still holds /patients; the guard bounces it again
        shell.back();
        assert_eq!(shell.current_path(), LOGIN_PATH);
    }

    #[test]
    fn test_login_then_navigate() {
        let mut shell = shell_with(None, LOGIN_PATH);
        shell.hydrate();
        shell.login("tok", "doc@example.org").unwrap();
        shell.navigate(PATIENTS_PATH);
        assert_eq!(shell.current_path(), PATIENTS_PATH);
    }

    #[test]
    fn test_logout_redirects_even_when_anonymous() {
        let mut shell = shell_with(None, HOME_PATH);
        shell.hydrate();
        shell.logout();
        assert!(!shell.is_authenticated());
        assert_eq!(shell.current_path(), LOGIN_PATH);
    }

    #[test]
    fn test_session_expired_logs_out_silently() {
        let mut shell = shell_with(Some(Credential::new("stale", "a@b.c")), "/patients/1");
        shell.hydrate();

        let shown = shell.handle_api_error(&ApiError::SessionExpired);

        assert_eq!(shown, None);
        assert!(!shell.is_authenticated());
        assert_eq!(shell.current_path(), LOGIN_PATH);
    }

    #[test]
    fn test_api_error_is_shown_verbatim() {
        let mut shell = shell_with(Some(Credential::new("tok", "a@b.c")), "/patients/1");
        shell.hydrate();

        let err = ApiError::Api {
            status: 500,
            body: "server error".to_string(),
        };
        assert_eq!(shell.handle_api_error(&err).as_deref(), Some("server error"));
        assert!(shell.is_authenticated());
        assert_eq!(shell.current_path(), "/patients/1");
    }
}
