use serde::{Deserialize, Serialize};

use crate::validation::{parse_days, parse_non_negative, ValidationError};

use super::infusion::ProductType;
use super::patient::{HemophiliaType, Severity};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct FactorPoint {
    pub hours: f64,
    pub factor_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PredictionMeta {
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub factor_curve: Option<Vec<FactorPoint>>,
}

/// Answer of `POST /predict/current-state` and `POST /simulate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Prediction {
    pub factor_percent: f64,
    /// Probability in 0..=1
    pub bleed_risk: f64,
    pub risk_category: String,
    #[serde(default)]
    pub meta: Option<PredictionMeta>,
}

impl Prediction {
    pub fn bleed_risk_percent(&self) -> f64 {
        self.bleed_risk * 100.0
    }

    pub fn factor_curve(&self) -> &[FactorPoint] {
        self.meta
            .as_ref()
            .and_then(|m| m.factor_curve.as_deref())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionRequest<'a> {
    pub patient_id: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct FeatureImpact {
    pub feature: String,
    pub impact: f64,
}

impl FeatureImpact {
    /// `days_since_last_infusion` -> `days since last infusion`
    pub fn label(&self) -> String {
        self.feature.replace('_', " ")
    }

    pub fn increases_risk(&self) -> bool {
        self.impact > 0.0
    }
}

/// Answer of `GET /predict/explain/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Explanation {
    #[serde(default)]
    pub explanation: Vec<FeatureImpact>,
}

// ============================================================================
// Anonymous simulation
// ============================================================================

/// Body of `POST /simulate`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct SimulationRequest {
    pub hemophilia_type: HemophiliaType,
    pub severity: Severity,
    pub age: f64,
    pub weight_kg: f64,
    pub baseline_factor_percent: f64,
    pub half_life_hours: f64,
    pub product_type: ProductType,
    pub dose_iu_per_kg: f64,
    pub interval_days: u32,
    pub activity_level: u8,
}

/// Simulation form. Blank clinical fields fall back to estimates derived
/// from severity, hemophilia type and age.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationForm {
    pub hemophilia_type: HemophiliaType,
    pub severity: Severity,
    pub age: String,
    pub weight_kg: String,
    pub baseline_factor_percent: String,
    pub half_life_hours: String,
    pub product_type: ProductType,
    pub dose_iu_per_kg: String,
    pub interval_days: String,
    pub activity_level: u8,
}

impl Default for SimulationForm {
    fn default() -> Self {
        Self {
            hemophilia_type: HemophiliaType::A,
            severity: Severity::Severe,
            age: String::new(),
            weight_kg: String::new(),
            baseline_factor_percent: String::new(),
            half_life_hours: String::new(),
            product_type: ProductType::Shl,
            dose_iu_per_kg: String::new(),
            interval_days: "2".to_string(),
            activity_level: 1,
        }
    }
}

/// Typical baseline factor level (%) for a severity
pub fn default_baseline(severity: Severity) -> f64 {
    match severity {
        Severity::Severe => 0.5,
        Severity::Moderate => 3.0,
        Severity::Mild => 15.0,
    }
}

/// Typical factor half-life (hours); children are 0 < age < 12
pub fn default_half_life(hemophilia_type: HemophiliaType, age: f64) -> f64 {
    let is_child = age > 0.0 && age < 12.0;
    match (hemophilia_type, is_child) {
        (HemophiliaType::A, true) => 8.0,
        (HemophiliaType::A, false) => 10.0,
        (HemophiliaType::B, true) => 18.0,
        (HemophiliaType::B, false) => 22.0,
    }
}

/// Typical prophylactic dose (IU/kg) for a severity
pub fn default_dose(severity: Severity) -> f64 {
    match severity {
        Severity::Severe => 30.0,
        Severity::Moderate => 25.0,
        Severity::Mild => 20.0,
    }
}

impl SimulationForm {
    pub fn validate(&self) -> Result<SimulationRequest, ValidationError> {
        if self.age.trim().is_empty() || self.weight_kg.trim().is_empty() {
            return Err(ValidationError::Message(
                "Please fill age and weight first so the system can estimate defaults.".to_string(),
            ));
        }
        let age = parse_non_negative("Age", &self.age)?;
        let weight_kg = parse_non_negative("Weight", &self.weight_kg)?;

        let or_default = |field: &'static str, value: &str, fallback: f64| {
            if value.trim().is_empty() {
                Ok(fallback)
            } else {
                parse_non_negative(field, value)
            }
        };

        Ok(SimulationRequest {
            hemophilia_type: self.hemophilia_type,
            severity: self.severity,
            age,
            weight_kg,
            baseline_factor_percent: or_default(
                "Baseline factor level",
                &self.baseline_factor_percent,
                default_baseline(self.severity),
            )?,
            half_life_hours: or_default(
                "Half-life",
                &self.half_life_hours,
                default_half_life(self.hemophilia_type, age),
            )?,
            product_type: self.product_type,
            dose_iu_per_kg: or_default(
                "Dose",
                &self.dose_iu_per_kg,
                default_dose(self.severity),
            )?,
            interval_days: if self.interval_days.trim().is_empty() {
                1
            } else {
                parse_days("Interval", &self.interval_days)?
            },
            activity_level: self.activity_level.min(2),
        })
    }
}
