//! Authorized request gateway for the clinical API.
//!
//! Every call to the backend goes through `ApiClient::request`, which
//! attaches the bearer credential and classifies the response: a 401 on an
//! authorized call becomes `ApiError::SessionExpired`, any other failure
//! keeps the raw body.

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::Credential;
use crate::models::{
    Explanation, Infusion, NewInfusion, NewPatient, OptimizationRequest, OptimizationResponse,
    Patient, Prediction, PredictionRequest, SimulationRequest,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

const LOGIN_PATH: &str = "/auth/login";
const HEALTH_PATH: &str = "/health";

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
}

/// Method, extra headers and JSON body of a gateway call.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post<T: Serialize>(body: &T) -> Result<Self, ApiError> {
        let body = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode request body: {}", e)))?;
        Ok(Self {
            method: Method::POST,
            headers: HeaderMap::new(),
            body: Some(body),
        })
    }

    pub fn with_header(mut self, name: header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// API client for the clinical backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Option<String>,
}

impl ApiClient {
    /// Create a client for `base_url`. A missing or blank address is allowed
    /// here; every call then fails with `ApiError::Configuration`.
    pub fn new(base_url: Option<String>) -> Result<Self, ApiError> {
        let client = Client::builder().build()?;
        let base_url = base_url
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    fn url(&self, path: &str) -> Result<String, ApiError> {
        let base = self.base_url.as_deref().ok_or(ApiError::Configuration)?;
        if path.starts_with('/') {
            Ok(format!("{}{}", base, path))
        } else {
            Ok(format!("{}/{}", base, path))
        }
    }

    /// Body of a failed response. A body that cannot be read counts as empty.
    async fn error_body(response: reqwest::Response) -> String {
        match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(error = %e, "Failed to read error response body");
                String::new()
            }
        }
    }

    /// Check if response is successful, returning a classified error if not.
    ///
    /// Only an authorized call can report an expired session.
    async fn check_response(
        response: reqwest::Response,
        authorized: bool,
    ) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = Self::error_body(response).await;
        warn!(
            status = status.as_u16(),
            authorized,
            body = %ApiError::truncate_body(&body),
            "API request failed"
        );
        if authorized {
            Err(ApiError::from_status(status, &body))
        } else {
            Err(ApiError::from_anonymous_status(status, &body))
        }
    }

    /// Issue an authorized call and decode its JSON answer.
    ///
    /// Headers start with `Content-Type: application/json`, then the
    /// caller's headers (which win), then `Authorization` when a credential
    /// is given. No retry and no timeout beyond the transport's own.
    pub async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        credential: Option<&Credential>,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let url = self.url(path)?;

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.extend(options.headers);
        if let Some(credential) = credential {
            headers.insert(
                header::AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", credential.token))?,
            );
        }

        debug!(method = %options.method, url = %url, authorized = credential.is_some(), "API request");

        let mut builder = self.client.request(options.method, &url).headers(headers);
        if let Some(body) = options.body {
            builder = builder.body(body.to_string());
        }

        let response = builder.send().await?;
        let response = Self::check_response(response, credential.is_some()).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!(
                "Failed to parse JSON response from {}: {} ({})",
                path,
                e,
                ApiError::truncate_body(&text)
            ))
        })
    }

    // ========================================================================
    // Authentication and liveness
    // ========================================================================

    /// Exchange email and password for an access token.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<String, ApiError> {
        let url = self.url(LOGIN_PATH)?;

        let response = self
            .client
            .post(&url)
            .json(&LoginRequest { email, password })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = Self::error_body(response).await;
            warn!(status = status.as_u16(), email, "Login rejected");
            return Err(ApiError::login_rejected(status, &body));
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse login response: {}", e)))?;
        Ok(login.access_token)
    }

    /// Liveness probe: any success status counts as reachable.
    pub async fn check_health(&self) -> Result<(), ApiError> {
        let url = self.url(HEALTH_PATH)?;
        let response = self.client.get(&url).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ApiError::from_anonymous_status(response.status(), ""))
        }
    }

    // ========================================================================
    // Patients
    // ========================================================================

    pub async fn fetch_patients(&self, credential: Option<&Credential>) -> Result<Vec<Patient>, ApiError> {
        self.request("/patients", credential, RequestOptions::get()).await
    }

    pub async fn fetch_patient(
        &self,
        credential: Option<&Credential>,
        patient_id: &str,
    ) -> Result<Patient, ApiError> {
        self.request(&format!("/patients/{}", patient_id), credential, RequestOptions::get())
            .await
    }

    pub async fn create_patient(
        &self,
        credential: Option<&Credential>,
        patient: &NewPatient,
    ) -> Result<Patient, ApiError> {
        self.request("/patients", credential, RequestOptions::post(patient)?).await
    }

    // ========================================================================
    // Infusions
    // ========================================================================

    pub async fn fetch_infusions(
        &self,
        credential: Option<&Credential>,
        patient_id: &str,
    ) -> Result<Vec<Infusion>, ApiError> {
        self.request(
            &format!("/patients/{}/infusions", patient_id),
            credential,
            RequestOptions::get(),
        )
        .await
    }

    pub async fn add_infusion(
        &self,
        credential: Option<&Credential>,
        patient_id: &str,
        infusion: &NewInfusion,
    ) -> Result<serde_json::Value, ApiError> {
        self.request(
            &format!("/patients/{}/infusions", patient_id),
            credential,
            RequestOptions::post(infusion)?,
        )
        .await
    }

    // ========================================================================
    // Prediction and optimization
    // ========================================================================

    pub async fn predict_current_state(
        &self,
        credential: Option<&Credential>,
        patient_id: &str,
    ) -> Result<Prediction, ApiError> {
        let body = PredictionRequest { patient_id };
        self.request("/predict/current-state", credential, RequestOptions::post(&body)?)
            .await
    }

    pub async fn explain_prediction(
        &self,
        credential: Option<&Credential>,
        patient_id: &str,
    ) -> Result<Explanation, ApiError> {
        self.request(
            &format!("/predict/explain/{}", patient_id),
            credential,
            RequestOptions::get(),
        )
        .await
    }

    pub async fn optimize_regimen(
        &self,
        credential: Option<&Credential>,
        request: &OptimizationRequest,
    ) -> Result<OptimizationResponse, ApiError> {
        self.request("/optimize/regimen", credential, RequestOptions::post(request)?)
            .await
    }

    /// Anonymous what-if simulation; needs no credential.
    pub async fn simulate(&self, request: &SimulationRequest) -> Result<Prediction, ApiError> {
        self.request("/simulate", None, RequestOptions::post(request)?).await
    }
}

// ============================================================================
// Tests
// ============================================================================
