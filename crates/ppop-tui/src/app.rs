//! Application state for the terminal client.
//!
//! `App` owns the session shell, the API gateway and the health monitor.
//! Requests run on background tasks and report back over an mpsc channel;
//! every screen change bumps an epoch so results that arrive after the user
//! has moved on are dropped instead of applied.

use std::future::Future;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use ppop_core::auth::CredentialStore;
use ppop_core::models::{
    Explanation, Infusion, OptimizationResponse, Patient, Prediction, Regimen,
};
use ppop_core::routing::{patient_path, HOME_PATH, POST_LOGIN_PATH};
use ppop_core::validation::ValidationError;
use ppop_core::{ApiClient, ApiError, BackendStatus, Config, HealthMonitor, MonitorHandle, Screen, Shell};

use crate::forms::{self, TextForm};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background result channel
const CHANNEL_BUFFER_SIZE: usize = 32;

// ============================================================================
// State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    AddingInfusion,
    ShowingHelp,
    ConfirmingQuit,
    Quitting,
}

/// Outcome of a background request
enum Outcome {
    Patients(Result<Vec<Patient>, ApiError>),
    PatientDetail(Result<(Patient, Vec<Infusion>), ApiError>),
    Infusions(Result<Vec<Infusion>, ApiError>),
    InfusionSaved(Result<serde_json::Value, ApiError>),
    Prediction(Result<Prediction, ApiError>),
    Explanation(Result<Explanation, ApiError>),
    Regimens(Result<OptimizationResponse, ApiError>),
    PatientCreated(Result<Patient, ApiError>),
    Simulation(Result<Prediction, ApiError>),
    Login {
        email: String,
        result: Result<String, ApiError>,
    },
}

struct FetchResult {
    epoch: u64,
    outcome: Outcome,
}

pub struct App {
    pub config: Config,
    pub shell: Shell,
    api: ApiClient,
    monitor: Option<MonitorHandle>,

    pub state: AppState,
    pub status_message: Option<String>,
    pub error_message: Option<String>,
    pub loading: bool,

    // Screen data
    pub patients: Vec<Patient>,
    pub patients_selection: usize,
    pub patient: Option<Patient>,
    pub infusions: Vec<Infusion>,
    pub prediction: Option<Prediction>,
    pub explanation: Option<Explanation>,
    pub regimens: Vec<Regimen>,
    pub simulation: Option<Prediction>,

    // Forms
    pub login_form: TextForm,
    pub patient_form: TextForm,
    pub infusion_form: TextForm,
    pub optimization_form: TextForm,
    pub simulation_form: TextForm,

    persist_config: bool,
    epoch: u64,
    entered_path: Option<String>,
    fetch_tx: mpsc::Sender<FetchResult>,
    fetch_rx: mpsc::Receiver<FetchResult>,
}

impl App {
    pub fn new(config: Config, initial_path: &str) -> Result<Self> {
        let store = config.credential_store()?;
        let api = ApiClient::new(config.api_url())?;
        let mut app = Self::with_parts(config, store, api, initial_path);
        app.persist_config = true;
        Ok(app)
    }

    pub(crate) fn with_parts(config: Config, store: CredentialStore, api: ApiClient, initial_path: &str) -> Self {
        let (fetch_tx, fetch_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let login_form = forms::login_form(config.last_email.as_deref());
        Self {
            shell: Shell::new(store, initial_path),
            config,
            api,
            monitor: None,
            state: AppState::Normal,
            status_message: None,
            error_message: None,
            loading: false,
            patients: Vec::new(),
            patients_selection: 0,
            patient: None,
            infusions: Vec::new(),
            prediction: None,
            explanation: None,
            regimens: Vec::new(),
            simulation: None,
            login_form,
            patient_form: forms::patient_form(),
            infusion_form: forms::infusion_form(),
            optimization_form: forms::optimization_form(),
            simulation_form: forms::simulation_form(),
            persist_config: false,
            epoch: 0,
            entered_path: None,
            fetch_tx,
            fetch_rx,
        }
    }

    /// Hydrate the session, enter the first screen and start health polling.
    pub fn start(&mut self) {
        self.shell.hydrate();
        self.sync_screen();
        let monitor = HealthMonitor::new(self.api.clone())
            .with_interval(self.config.health_interval())
            .start();
        self.monitor = Some(monitor);
        info!(path = self.shell.current_path(), "Client ready");
    }

    /// Stop health polling and wait for the task to finish.
    pub async fn shutdown(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            monitor.shutdown().await;
        }
    }

    pub fn backend_status(&self) -> BackendStatus {
        self.monitor
            .as_ref()
            .map(|m| m.status())
            .unwrap_or_default()
    }

    pub fn screen(&self) -> Screen {
        self.shell.screen()
    }

    /// Screens whose keystrokes go to a form
    pub fn is_form_screen(&self) -> bool {
        matches!(
            self.screen(),
            Screen::Login | Screen::NewPatient | Screen::Try | Screen::Optimize(_)
        )
    }

    pub fn selected_patient(&self) -> Option<&Patient> {
        self.patients.get(self.patients_selection)
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub fn go(&mut self, path: &str) {
        self.shell.navigate(path);
        self.sync_screen();
    }

    pub fn back(&mut self) {
        if !self.shell.back() {
            self.shell.navigate(HOME_PATH);
        }
        self.sync_screen();
    }

    pub fn logout(&mut self) {
        self.shell.logout();
        self.status_message = Some("Signed out".to_string());
        self.sync_screen();
    }

    /// Reset per-screen state and start loading when the route changed.
    fn sync_screen(&mut self) {
        let path = self.shell.current_path().to_string();
        if self.entered_path.as_deref() == Some(path.as_str()) {
            return;
        }
        self.epoch += 1;
        self.entered_path = Some(path);
        self.error_message = None;
        self.loading = false;
        if self.state == AppState::AddingInfusion {
            self.state = AppState::Normal;
        }

        match self.screen() {
            Screen::Login => {
                if self.shell.is_authenticated() {
                    self.go(POST_LOGIN_PATH);
                    return;
                }
                self.login_form = forms::login_form(self.config.last_email.as_deref());
            }
            Screen::Patients => {
                self.patients_selection = 0;
                self.load_patients();
            }
            Screen::NewPatient => self.patient_form = forms::patient_form(),
            Screen::Patient(id) => {
                self.patient = None;
                self.infusions.clear();
                self.prediction = None;
                self.explanation = None;
                self.regimens.clear();
                self.infusion_form = forms::infusion_form();
                self.load_patient(id);
            }
            Screen::Optimize(_) => {
                self.regimens.clear();
                self.optimization_form = forms::optimization_form();
            }
            Screen::Try => self.simulation = None,
            Screen::Home | Screen::Unknown => {}
        }
    }

    // ========================================================================
    // Background requests
    // ========================================================================

    fn spawn<F>(&mut self, request: F)
    where
        F: Future<Output = Outcome> + Send + 'static,
    {
        self.loading = true;
        let tx = self.fetch_tx.clone();
        let epoch = self.epoch;
        tokio::spawn(async move {
            let outcome = request.await;
            if let Err(e) = tx.send(FetchResult { epoch, outcome }).await {
                error!(error = %e, "Failed to send fetch result - channel closed");
            }
        });
    }

    fn load_patients(&mut self) {
        if !self.shell.is_authenticated() {
            return;
        }
        let api = self.api.clone();
        let credential = self.shell.credential().cloned();
        self.spawn(async move { Outcome::Patients(api.fetch_patients(credential.as_ref()).await) });
    }

    fn load_patient(&mut self, id: String) {
        if !self.shell.is_authenticated() {
            return;
        }
        let api = self.api.clone();
        let credential = self.shell.credential().cloned();
        self.spawn(async move {
            let credential = credential.as_ref();
            let result = futures::try_join!(
                api.fetch_patient(credential, &id),
                api.fetch_infusions(credential, &id)
            );
            Outcome::PatientDetail(result)
        });
    }

    fn load_infusions(&mut self, id: String) {
        let api = self.api.clone();
        let credential = self.shell.credential().cloned();
        self.spawn(async move {
            Outcome::Infusions(api.fetch_infusions(credential.as_ref(), &id).await)
        });
    }

    fn current_patient_id(&self) -> Option<String> {
        match self.screen() {
            Screen::Patient(id) | Screen::Optimize(id) => Some(id),
            _ => None,
        }
    }

    pub fn reload(&mut self) {
        match self.screen() {
            Screen::Patients => self.load_patients(),
            Screen::Patient(id) => self.load_patient(id),
            _ => {}
        }
    }

    pub fn run_prediction(&mut self) {
        let Some(id) = self.current_patient_id() else {
            return;
        };
        let api = self.api.clone();
        let credential = self.shell.credential().cloned();
        self.spawn(async move {
            Outcome::Prediction(api.predict_current_state(credential.as_ref(), &id).await)
        });
    }

    pub fn run_explanation(&mut self) {
        let Some(id) = self.current_patient_id() else {
            return;
        };
        let api = self.api.clone();
        let credential = self.shell.credential().cloned();
        self.spawn(async move {
            Outcome::Explanation(api.explain_prediction(credential.as_ref(), &id).await)
        });
    }

    // ========================================================================
    // Form submission
    // ========================================================================

    fn show_validation(&mut self, err: ValidationError) {
        self.error_message = Some(err.to_string());
    }

    pub fn submit_form(&mut self) {
        self.error_message = None;
        match self.screen() {
            Screen::Login => self.submit_login(),
            Screen::NewPatient => self.submit_patient(),
            Screen::Try => self.submit_simulation(),
            Screen::Optimize(id) => self.submit_optimization(id),
            _ => {}
        }
    }

    fn submit_login(&mut self) {
        let email = self.login_form.value("Email").trim().to_string();
        let password = self.login_form.value("Password").to_string();
        if email.is_empty() {
            return self.show_validation(ValidationError::Required("Email"));
        }
        if password.is_empty() {
            return self.show_validation(ValidationError::Required("Password"));
        }
        self.login_form.clear_secrets();
        let api = self.api.clone();
        self.spawn(async move {
            let result = api.authenticate(&email, &password).await;
            Outcome::Login { email, result }
        });
    }

    fn submit_patient(&mut self) {
        let patient = match forms::to_patient_form(&self.patient_form).validate() {
            Ok(p) => p,
            Err(e) => return self.show_validation(e),
        };
        let api = self.api.clone();
        let credential = self.shell.credential().cloned();
        self.spawn(async move {
            Outcome::PatientCreated(api.create_patient(credential.as_ref(), &patient).await)
        });
    }

    fn submit_simulation(&mut self) {
        let request = match forms::to_simulation_form(&self.simulation_form)
            .and_then(|form| form.validate())
        {
            Ok(r) => r,
            Err(e) => return self.show_validation(e),
        };
        let api = self.api.clone();
        self.spawn(async move { Outcome::Simulation(api.simulate(&request).await) });
    }

    fn submit_optimization(&mut self, patient_id: String) {
        let request = match forms::to_optimization_form(&self.optimization_form).validate(&patient_id) {
            Ok(r) => r,
            Err(e) => return self.show_validation(e),
        };
        let api = self.api.clone();
        let credential = self.shell.credential().cloned();
        self.spawn(async move {
            Outcome::Regimens(api.optimize_regimen(credential.as_ref(), &request).await)
        });
    }

    pub fn start_infusion(&mut self) {
        if self.current_patient_id().is_some() {
            self.infusion_form = forms::infusion_form();
            self.error_message = None;
            self.state = AppState::AddingInfusion;
        }
    }

    pub fn submit_infusion(&mut self) {
        let Some(id) = self.current_patient_id() else {
            return;
        };
        let infusion = match forms::to_infusion_form(&self.infusion_form).validate() {
            Ok(i) => i,
            Err(e) => return self.show_validation(e),
        };
        let api = self.api.clone();
        let credential = self.shell.credential().cloned();
        self.spawn(async move {
            Outcome::InfusionSaved(api.add_infusion(credential.as_ref(), &id, &infusion).await)
        });
    }

    // ========================================================================
    // Results
    // ========================================================================

    pub fn check_background_tasks(&mut self) {
        let mut results = Vec::new();
        while let Ok(result) = self.fetch_rx.try_recv() {
            results.push(result);
        }
        for result in results {
            if result.epoch != self.epoch {
                debug!(epoch = result.epoch, current = self.epoch, "Discarding stale result");
                continue;
            }
            self.loading = false;
            self.apply(result.outcome);
        }
    }

    /// Route a failed request through the session shell.
    fn report_error(&mut self, err: &ApiError) {
        match self.shell.handle_api_error(err) {
            Some(message) => self.error_message = Some(message),
            None => {
                self.status_message = Some("Session expired, please sign in again".to_string());
                self.sync_screen();
            }
        }
    }

    fn apply(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Patients(Ok(patients)) => {
                self.patients = patients;
                self.patients_selection = 0;
            }
            Outcome::PatientDetail(Ok((patient, infusions))) => {
                self.patient = Some(patient);
                self.infusions = infusions;
            }
            Outcome::Infusions(Ok(infusions)) => self.infusions = infusions,
            Outcome::InfusionSaved(Ok(_)) => {
                self.state = AppState::Normal;
                self.status_message = Some("Infusion recorded".to_string());
                if let Some(id) = self.current_patient_id() {
                    self.load_infusions(id);
                }
            }
            Outcome::Prediction(Ok(prediction)) => self.prediction = Some(prediction),
            Outcome::Explanation(Ok(explanation)) => self.explanation = Some(explanation),
            Outcome::Regimens(Ok(response)) => self.regimens = response.regimens,
            Outcome::PatientCreated(Ok(patient)) => {
                info!(patient_id = %patient.id, "Patient created");
                self.status_message = Some(format!("Created {}", patient.name));
                self.go(&patient_path(&patient.id));
            }
            Outcome::Simulation(Ok(prediction)) => self.simulation = Some(prediction),
            Outcome::Login { email, result } => self.finish_login(email, result),

            Outcome::Patients(Err(e))
            | Outcome::PatientDetail(Err(e))
            | Outcome::Infusions(Err(e))
            | Outcome::InfusionSaved(Err(e))
            | Outcome::Prediction(Err(e))
            | Outcome::Explanation(Err(e))
            | Outcome::Regimens(Err(e))
            | Outcome::PatientCreated(Err(e))
            | Outcome::Simulation(Err(e)) => self.report_error(&e),
        }
    }

    fn finish_login(&mut self, email: String, result: Result<String, ApiError>) {
        let token = match result {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.error_message = Some(e.to_string());
                return;
            }
        };
        if let Err(e) = self.shell.login(&token, &email) {
            self.error_message = Some(e.to_string());
            return;
        }
        self.config.last_email = Some(email);
        if self.persist_config {
            if let Err(e) = self.config.save() {
                warn!(error = %e, "Failed to save config");
            }
        }
        self.status_message = Some("Signed in".to_string());
        self.go(POST_LOGIN_PATH);
    }
}

// ============================================================================
// Tests
// ============================================================================
