use serde::{Deserialize, Serialize};

use crate::validation::{parse_days, parse_optional_non_negative, ValidationError};

/// One Pareto-optimal prophylaxis regimen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Regimen {
    #[serde(default)]
    pub id: Option<String>,
    pub dose_iu_per_kg: f64,
    pub interval_days: f64,
    #[serde(default)]
    pub product_type: Option<String>,
    pub weekly_iu: f64,
    #[serde(default)]
    pub predicted_annual_bleeds: Option<f64>,
    pub predicted_risk: f64,
}

/// Body of `POST /optimize/regimen`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct OptimizationRequest {
    pub patient_id: String,
    pub min_interval_days: u32,
    pub max_interval_days: u32,
    pub max_weekly_iu: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct OptimizationResponse {
    #[serde(default)]
    pub regimens: Vec<Regimen>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationForm {
    pub max_weekly_iu: String,
    pub min_interval_days: String,
    pub max_interval_days: String,
}

impl Default for OptimizationForm {
    fn default() -> Self {
        Self {
            max_weekly_iu: String::new(),
            min_interval_days: "2".to_string(),
            max_interval_days: "7".to_string(),
        }
    }
}

impl OptimizationForm {
    pub fn validate(&self, patient_id: &str) -> Result<OptimizationRequest, ValidationError> {
        if patient_id.trim().is_empty() {
            return Err(ValidationError::Message("Invalid patient ID".to_string()));
        }
        let min_interval_days = parse_days("Min interval", &self.min_interval_days)?;
        let max_interval_days = parse_days("Max interval", &self.max_interval_days)?;
        if min_interval_days > max_interval_days {
            return Err(ValidationError::Message(
                "Min interval must not exceed max interval".to_string(),
            ));
        }
        Ok(OptimizationRequest {
            patient_id: patient_id.to_string(),
            min_interval_days,
            max_interval_days,
            max_weekly_iu: parse_optional_non_negative("Max weekly IU", &self.max_weekly_iu)?,
        })
    }
}
