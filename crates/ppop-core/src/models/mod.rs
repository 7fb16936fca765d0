//! Data models for the clinical API.
//!
//! Request bodies are built from the form types here, which validate user
//! input before any request is made. Response types deserialize the
//! backend's JSON.

pub mod infusion;
pub mod patient;
pub mod prediction;
pub mod regimen;

pub use infusion::{Infusion, InfusionForm, NewInfusion, ProductType};
pub use patient::{HemophiliaType, NewPatient, Patient, PatientForm, Severity};
pub use prediction::{
    Explanation, FactorPoint, FeatureImpact, Prediction, PredictionMeta, PredictionRequest,
    SimulationForm, SimulationRequest,
};
pub use regimen::{OptimizationForm, OptimizationRequest, OptimizationResponse, Regimen};
