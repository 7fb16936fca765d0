use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::{parse_non_negative, require, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum HemophiliaType {
    #[default]
    A,
    B,
}

impl HemophiliaType {
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(HemophiliaType::A),
            "B" => Ok(HemophiliaType::B),
            other => Err(ValidationError::InvalidChoice {
                field: "Hemophilia type",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for HemophiliaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HemophiliaType::A => write!(f, "Hemophilia A"),
            HemophiliaType::B => write!(f, "Hemophilia B"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum Severity {
    #[default]
    Severe,
    Moderate,
    Mild,
}

impl Severity {
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "severe" => Ok(Severity::Severe),
            "moderate" => Ok(Severity::Moderate),
            "mild" => Ok(Severity::Mild),
            other => Err(ValidationError::InvalidChoice {
                field: "Severity",
                value: other.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Severe => "severe",
            Severity::Moderate => "moderate",
            Severity::Mild => "mild",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub hemophilia_type: HemophiliaType,
    pub severity: Severity,
    pub age: f64,
    pub weight_kg: f64,
    #[serde(default)]
    pub hospital_id: Option<String>,
    #[serde(default)]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub baseline_factor_percent: Option<f64>,
    #[serde(default)]
    pub half_life_hours: Option<f64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of `POST /patients`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct NewPatient {
    pub name: String,
    pub hospital_id: String,
    pub hemophilia_type: HemophiliaType,
    pub severity: Severity,
    pub age: f64,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub baseline_factor_percent: f64,
    pub half_life_hours: f64,
    pub activity_level: u8,
}

/// Raw text of the new-patient form
#[derive(Debug, Clone, PartialEq)]
pub struct PatientForm {
    pub name: String,
    pub hospital_id: String,
    pub hemophilia_type: String,
    pub severity: String,
    pub age: String,
    pub weight_kg: String,
    pub height_cm: String,
    pub baseline_factor_percent: String,
    pub half_life_hours: String,
    pub activity_level: String,
}

impl Default for PatientForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            hospital_id: String::new(),
            hemophilia_type: "A".to_string(),
            severity: "severe".to_string(),
            age: String::new(),
            weight_kg: String::new(),
            height_cm: String::new(),
            baseline_factor_percent: String::new(),
            half_life_hours: String::new(),
            activity_level: "1".to_string(),
        }
    }
}

impl PatientForm {
    pub fn validate(&self) -> Result<NewPatient, ValidationError> {
        let name = require("Patient name", &self.name)?.to_string();
        let activity_level = match self.activity_level.trim() {
            "0" => 0,
            "1" => 1,
            "2" => 2,
            other => {
                return Err(ValidationError::InvalidChoice {
                    field: "Activity level",
                    value: other.to_string(),
                })
            }
        };

        Ok(NewPatient {
            name,
            hospital_id: self.hospital_id.trim().to_string(),
            hemophilia_type: HemophiliaType::parse(&self.hemophilia_type)?,
            severity: Severity::parse(&self.severity)?,
            age: parse_non_negative("Age", &self.age)?,
            weight_kg: parse_non_negative("Weight", &self.weight_kg)?,
            height_cm: parse_non_negative("Height", &self.height_cm)?,
            baseline_factor_percent: parse_non_negative(
                "Baseline factor level",
                &self.baseline_factor_percent,
            )?,
            half_life_hours: parse_non_negative("Half-life", &self.half_life_hours)?,
            activity_level,
        })
    }
}
