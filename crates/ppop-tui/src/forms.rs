//! Editable text forms for the terminal screens.
//!
//! A `TextForm` is a list of labelled fields with one focused field. Choice
//! fields cycle through a fixed set of values instead of taking text. The
//! `*_form` constructors build the forms for each screen and the `to_*`
//! functions turn their raw text into the core library's form types, which
//! do the actual validation.

use ppop_core::models::{
    HemophiliaType, InfusionForm, OptimizationForm, PatientForm, ProductType, Severity,
    SimulationForm,
};
use ppop_core::validation::ValidationError;

/// Maximum length for a free-text field.
const MAX_FIELD_LENGTH: usize = 64;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

const HEMOPHILIA_TYPES: &[&str] = &["A", "B"];
const SEVERITIES: &[&str] = &["severe", "moderate", "mild"];
const ACTIVITY_LEVELS: &[&str] = &["0", "1", "2"];
const PRODUCT_TYPES: &[&str] = &["SHL", "EHL"];

#[derive(Debug, Clone)]
pub struct Field {
    pub label: &'static str,
    pub value: String,
    pub secret: bool,
    pub choices: Option<&'static [&'static str]>,
}

impl Field {
    fn text(label: &'static str, value: &str) -> Self {
        Self {
            label,
            value: value.to_string(),
            secret: false,
            choices: None,
        }
    }

    fn secret(label: &'static str) -> Self {
        Self {
            secret: true,
            ..Self::text(label, "")
        }
    }

    fn choice(label: &'static str, choices: &'static [&'static str], value: &str) -> Self {
        Self {
            choices: Some(choices),
            ..Self::text(label, value)
        }
    }

    /// Text to draw for this field
    pub fn display(&self) -> String {
        if self.secret {
            "*".repeat(self.value.chars().count())
        } else if self.choices.is_some() {
            format!("< {} >", self.value)
        } else {
            self.value.clone()
        }
    }

    fn max_len(&self) -> usize {
        if self.secret {
            MAX_PASSWORD_LENGTH
        } else {
            MAX_FIELD_LENGTH
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextForm {
    pub fields: Vec<Field>,
    pub focus: usize,
}

impl TextForm {
    fn new(fields: Vec<Field>) -> Self {
        Self { fields, focus: 0 }
    }

    pub fn value(&self, label: &str) -> &str {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .map(|f| f.value.as_str())
            .unwrap_or("")
    }

    pub fn focus_label(&mut self, label: &str) {
        if let Some(index) = self.fields.iter().position(|f| f.label == label) {
            self.focus = index;
        }
    }

    pub fn next(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
        }
    }

    pub fn prev(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
        }
    }

    /// Type a character into the focused field. Choice fields cycle on space.
    pub fn push_char(&mut self, c: char) {
        let Some(field) = self.fields.get_mut(self.focus) else {
            return;
        };
        if field.choices.is_some() {
            if c == ' ' {
                self.cycle(true);
            }
            return;
        }
        if can_add_char(field.value.chars().count(), c, field.max_len()) {
            field.value.push(c);
        }
    }

    pub fn pop_char(&mut self) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            if field.choices.is_none() {
                field.value.pop();
            }
        }
    }

    /// Move a choice field to its next or previous value
    pub fn cycle(&mut self, forward: bool) {
        let Some(field) = self.fields.get_mut(self.focus) else {
            return;
        };
        let Some(choices) = field.choices else {
            return;
        };
        let current = choices.iter().position(|c| *c == field.value).unwrap_or(0);
        let next = if forward {
            (current + 1) % choices.len()
        } else {
            (current + choices.len() - 1) % choices.len()
        };
        field.value = choices[next].to_string();
    }

    pub fn clear_secrets(&mut self) {
        for field in self.fields.iter_mut().filter(|f| f.secret) {
            field.value.clear();
        }
    }
}

fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

pub fn can_add_char(current_len: usize, c: char, max_len: usize) -> bool {
    current_len < max_len && is_valid_input_char(c)
}

// ============================================================================
// Screen forms
// ============================================================================

pub fn login_form(last_email: Option<&str>) -> TextForm {
    let mut form = TextForm::new(vec![
        Field::text("Email", last_email.unwrap_or("")),
        Field::secret("Password"),
    ]);
    if last_email.is_some_and(|e| !e.is_empty()) {
        form.focus_label("Password");
    }
    form
}

pub fn patient_form() -> TextForm {
    let defaults = PatientForm::default();
    TextForm::new(vec![
        Field::text("Patient name", ""),
        Field::text("Hospital / record ID", ""),
        Field::choice("Hemophilia type", HEMOPHILIA_TYPES, &defaults.hemophilia_type),
        Field::choice("Severity", SEVERITIES, &defaults.severity),
        Field::text("Age (years)", ""),
        Field::text("Weight (kg)", ""),
        Field::text("Height (cm)", ""),
        Field::text("Baseline factor level (%)", ""),
        Field::text("Estimated half-life (hours)", ""),
        Field::choice("Activity level", ACTIVITY_LEVELS, &defaults.activity_level),
    ])
}

pub fn to_patient_form(form: &TextForm) -> PatientForm {
    PatientForm {
        name: form.value("Patient name").to_string(),
        hospital_id: form.value("Hospital / record ID").to_string(),
        hemophilia_type: form.value("Hemophilia type").to_string(),
        severity: form.value("Severity").to_string(),
        age: form.value("Age (years)").to_string(),
        weight_kg: form.value("Weight (kg)").to_string(),
        height_cm: form.value("Height (cm)").to_string(),
        baseline_factor_percent: form.value("Baseline factor level (%)").to_string(),
        half_life_hours: form.value("Estimated half-life (hours)").to_string(),
        activity_level: form.value("Activity level").to_string(),
    }
}

pub fn infusion_form() -> TextForm {
    TextForm::new(vec![
        Field::text("Dose (IU/kg)", ""),
        Field::text("Infusion time (YYYY-MM-DD HH:MM)", ""),
        Field::choice("Product type", PRODUCT_TYPES, ProductType::default().as_str()),
    ])
}

pub fn to_infusion_form(form: &TextForm) -> InfusionForm {
    InfusionForm {
        dose: form.value("Dose (IU/kg)").to_string(),
        datetime: form.value("Infusion time (YYYY-MM-DD HH:MM)").to_string(),
        product_type: if form.value("Product type") == ProductType::Ehl.as_str() {
            ProductType::Ehl
        } else {
            ProductType::Shl
        },
    }
}

pub fn optimization_form() -> TextForm {
    let defaults = OptimizationForm::default();
    TextForm::new(vec![
        Field::text("Max weekly IU (optional)", &defaults.max_weekly_iu),
        Field::text("Min interval (days)", &defaults.min_interval_days),
        Field::text("Max interval (days)", &defaults.max_interval_days),
    ])
}

pub fn to_optimization_form(form: &TextForm) -> OptimizationForm {
    OptimizationForm {
        max_weekly_iu: form.value("Max weekly IU (optional)").to_string(),
        min_interval_days: form.value("Min interval (days)").to_string(),
        max_interval_days: form.value("Max interval (days)").to_string(),
    }
}

pub fn simulation_form() -> TextForm {
    let defaults = SimulationForm::default();
    TextForm::new(vec![
        Field::choice("Hemophilia type", HEMOPHILIA_TYPES, "A"),
        Field::choice("Severity", SEVERITIES, defaults.severity.as_str()),
        Field::text("Age (years)", ""),
        Field::text("Weight (kg)", ""),
        Field::text("Baseline factor level (%)", ""),
        Field::text("Half-life (hours)", ""),
        Field::choice("Product type", PRODUCT_TYPES, defaults.product_type.as_str()),
        Field::text("Dose (IU/kg)", ""),
        Field::text("Interval (days)", &defaults.interval_days),
        Field::choice("Activity level", ACTIVITY_LEVELS, "1"),
    ])
}

pub fn to_simulation_form(form: &TextForm) -> Result<SimulationForm, ValidationError> {
    Ok(SimulationForm {
        hemophilia_type: HemophiliaType::parse(form.value("Hemophilia type"))?,
        severity: Severity::parse(form.value("Severity"))?,
        age: form.value("Age (years)").to_string(),
        weight_kg: form.value("Weight (kg)").to_string(),
        baseline_factor_percent: form.value("Baseline factor level (%)").to_string(),
        half_life_hours: form.value("Half-life (hours)").to_string(),
        product_type: if form.value("Product type") == ProductType::Ehl.as_str() {
            ProductType::Ehl
        } else {
            ProductType::Shl
        },
        dose_iu_per_kg: form.value("Dose (IU/kg)").to_string(),
        interval_days: form.value("Interval (days)").to_string(),
        activity_level: form.value("Activity level").parse().unwrap_or(1),
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn set(form: &mut TextForm, label: &str, value: &str) {
        form.focus_label(label);
        for c in value.chars() {
            form.push_char(c);
        }
    }

    #[test]
    fn test_can_add_char() {
        assert!(can_add_char(0, 'a', 10));
        assert!(can_add_char(9, 'z', 10));
        assert!(!can_add_char(10, 'a', 10));
        assert!(!can_add_char(0, '\x00', 10));
        assert!(!can_add_char(0, '\n', 10));
    }

    #[test]
    fn test_focus_wraps() {
        let mut form = login_form(None);
        assert_eq!(form.focus, 0);
        form.next();
        form.next();
        assert_eq!(form.focus, 0);
        form.prev();
        assert_eq!(form.focus, 1);
    }

    #[test]
    fn test_login_form_focuses_password_with_known_email() {
        let form = login_form(Some("doc@example.org"));
        assert_eq!(form.value("Email"), "doc@example.org");
        assert_eq!(form.fields[form.focus].label, "Password");
    }

    #[test]
    fn test_secret_display_and_clear() {
        let mut form = login_form(Some("doc@example.org"));
        for c in "hunter2".chars() {
            form.push_char(c);
        }
        assert_eq!(form.fields[1].display(), "*******");
        form.clear_secrets();
        assert_eq!(form.value("Password"), "");
        assert_eq!(form.value("Email"), "doc@example.org");
    }

    #[test]
    fn test_choice_field_cycles() {
        let mut form = patient_form();
        form.focus_label("Severity");
        form.push_char('x');
        assert_eq!(form.value("Severity"), "severe");
        form.push_char(' ');
        assert_eq!(form.value("Severity"), "moderate");
        form.cycle(false);
        form.cycle(false);
        assert_eq!(form.value("Severity"), "mild");
        form.pop_char();
        assert_eq!(form.value("Severity"), "mild");
    }

    #[test]
    fn test_patient_form_conversion_validates() {
        let mut form = patient_form();
        set(&mut form, "Patient name", "Sam");
        set(&mut form, "Age (years)", "12");
        set(&mut form, "Weight (kg)", "40");
        set(&mut form, "Height (cm)", "150");
        set(&mut form, "Baseline factor level (%)", "0.5");
        set(&mut form, "Estimated half-life (hours)", "9");

        let patient = to_patient_form(&form).validate().unwrap();
        assert_eq!(patient.name, "Sam");
        assert_eq!(patient.severity, Severity::Severe);
        assert_eq!(patient.activity_level, 1);
    }

    #[test]
    fn test_infusion_form_conversion() {
        let mut form = infusion_form();
        form.focus_label("Product type");
        form.push_char(' ');
        let infusion = to_infusion_form(&form);
        assert_eq!(infusion.product_type, ProductType::Ehl);
    }

    #[test]
    fn test_simulation_form_conversion() {
        let mut form = simulation_form();
        set(&mut form, "Age (years)", "30");
        set(&mut form, "Weight (kg)", "70");
        let request = to_simulation_form(&form).unwrap().validate().unwrap();
        assert_eq!(request.dose_iu_per_kg, 30.0);
        assert_eq!(request.interval_days, 2);
    }

    #[test]
    fn test_optimization_form_defaults() {
        let form = optimization_form();
        let request = to_optimization_form(&form).validate("p1").unwrap();
        assert_eq!(request.min_interval_days, 2);
        assert_eq!(request.max_interval_days, 7);
    }
}
