use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::{parse_non_negative, ValidationError};

/// Accepted layouts for a local infusion time
const LOCAL_TIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum ProductType {
    /// Standard half-life
    #[default]
    #[serde(rename = "SHL")]
    Shl,
    /// Extended half-life
    #[serde(rename = "EHL")]
    Ehl,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Shl => "SHL",
            ProductType::Ehl => "EHL",
        }
    }

    pub fn toggle(&self) -> Self {
        match self {
            ProductType::Shl => ProductType::Ehl,
            ProductType::Ehl => ProductType::Shl,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Infusion {
    pub id: String,
    pub infusion_time: DateTime<Utc>,
    pub dose_iu_per_kg: f64,
    #[serde(default)]
    pub product_type: Option<ProductType>,
}

/// Body of `POST /patients/{id}/infusions`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct NewInfusion {
    pub dose_iu_per_kg: f64,
    pub infusion_time: DateTime<Utc>,
    pub product_type: ProductType,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InfusionForm {
    pub dose: String,
    /// Local wall-clock time, e.g. `2024-05-01T08:30`
    pub datetime: String,
    pub product_type: ProductType,
}

impl InfusionForm {
    pub fn validate(&self) -> Result<NewInfusion, ValidationError> {
        if self.dose.trim().is_empty() || self.datetime.trim().is_empty() {
            return Err(ValidationError::Message(
                "Dose and date/time are required.".to_string(),
            ));
        }
        let infusion_time = parse_local_time(self.datetime.trim())
            .ok_or_else(|| ValidationError::Message("Invalid date/time value.".to_string()))?;

        Ok(NewInfusion {
            dose_iu_per_kg: parse_non_negative("Dose", &self.dose)?,
            infusion_time,
            product_type: self.product_type,
        })
    }
}

/// Interpret a wall-clock time in the local zone and convert it to UTC.
/// RFC 3339 input is taken as-is.
fn parse_local_time(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    LOCAL_TIME_FORMATS.iter().find_map(|format| {
        let naive = NaiveDateTime::parse_from_str(value, format).ok()?;
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
    })
}
