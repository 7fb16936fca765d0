//! Navigation paths, the router, and the route guard.
//!
//! Paths look like web routes (`/patients/42`) so the screens of every
//! client share one vocabulary. Patient records and optimization views are
//! protected: they need an authenticated session.

use tracing::debug;

use crate::auth::{HydrationState, SessionContext};

pub const HOME_PATH: &str = "/";
pub const TRY_PATH: &str = "/try";
pub const LOGIN_PATH: &str = "/login";
pub const PATIENTS_PATH: &str = "/patients";
pub const NEW_PATIENT_PATH: &str = "/patients/new";
pub const OPTIMIZE_PATH: &str = "/optimize";

/// Where a successful login lands.
pub const POST_LOGIN_PATH: &str = NEW_PATIENT_PATH;

const PROTECTED_PREFIXES: [&str; 2] = [PATIENTS_PATH, OPTIMIZE_PATH];

pub fn is_protected(path: &str) -> bool {
    PROTECTED_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

pub fn patient_path(id: &str) -> String {
    format!("{}/{}", PATIENTS_PATH, id)
}

pub fn optimize_path(patient_id: &str) -> String {
    format!("{}/{}", OPTIMIZE_PATH, patient_id)
}

// ============================================================================
// Router
// ============================================================================

/// Something that can move the user to another path.
pub trait Navigator {
    /// Go to `path`, keeping the current path in history.
    fn push(&mut self, path: &str);
    /// Go to `path`, replacing the current history entry.
    fn replace(&mut self, path: &str);
}

#[derive(Debug, Clone)]
pub struct Router {
    current: String,
    history: Vec<String>,
}

impl Router {
    pub fn new(initial: &str) -> Self {
        Self {
            current: initial.to_string(),
            history: Vec::new(),
        }
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn screen(&self) -> Screen {
        Screen::from_path(&self.current)
    }

    /// Return to the previous path. Returns false when there is none.
    pub fn back(&mut self) -> bool {
        match self.history.pop() {
            Some(previous) => {
                self.current = previous;
                true
            }
            None => false,
        }
    }
}

impl Navigator for Router {
    fn push(&mut self, path: &str) {
        if path == self.current {
            return;
        }
        let previous = std::mem::replace(&mut self.current, path.to_string());
        self.history.push(previous);
    }

    fn replace(&mut self, path: &str) {
        self.current = path.to_string();
    }
}

// ============================================================================
// Route guard
// ============================================================================

/// Redirect policy for unauthenticated access to protected paths.
pub struct RouteGuard;

impl RouteGuard {
    /// Decide whether `path` must be redirected.
    ///
    /// Never fires before hydration is `Ready`: the session is still empty
    /// at that point even for a returning user. Authenticated users are
    /// never moved away from the login screen here.
    pub fn evaluate(
        hydration: HydrationState,
        session: &SessionContext,
        path: &str,
    ) -> Option<&'static str> {
        if hydration != HydrationState::Ready {
            return None;
        }
        if is_protected(path) && !session.is_authenticated() && path != LOGIN_PATH {
            debug!(path, "Unauthenticated access to protected path");
            return Some(LOGIN_PATH);
        }
        None
    }
}

// ============================================================================
// Screens
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Home,
    Try,
    Login,
    Patients,
    NewPatient,
    Patient(String),
    Optimize(String),
    Unknown,
}

impl Screen {
    pub fn from_path(path: &str) -> Self {
        let path = path.trim_end_matches('/');
        if path.is_empty() {
            return Screen::Home;
        }
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        match segments.as_slice() {
            ["try"] => Screen::Try,
            ["login"] => Screen::Login,
            ["patients"] => Screen::Patients,
            ["patients", "new"] => Screen::NewPatient,
            ["patients", id] => Screen::Patient((*id).to_string()),
            ["optimize", id] => Screen::Optimize((*id).to_string()),
            _ => Screen::Unknown,
        }
    }

    /// Header label for the screen
    pub fn label(&self) -> &'static str {
        match self {
            Screen::Home => "Home",
            Screen::Try => "Try Simulation",
            Screen::Login => "Login",
            Screen::NewPatient => "New Patient",
            Screen::Patients | Screen::Patient(_) => "Patient",
            Screen::Optimize(_) => "Optimization",
            Screen::Unknown => "App",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
