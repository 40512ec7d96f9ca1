//! Local validation of user-entered health metrics
//!
//! Runs before any network call. Each field reports at most one message,
//! the first constraint it fails in the order required → parse → range.

use crate::models::{
    BloodPressure, BmiCategory, CoachRequest, Gender, HealthMetricsInput, RawMetrics,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Field name to human-readable message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message unless the field already has one
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// One-line description for a notification
    pub fn summary(&self) -> String {
        match self.0.len() {
            0 => String::new(),
            1 => self.0.values().next().cloned().unwrap_or_default(),
            n => format!("{} fields need attention", n),
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

/// Validate a form and produce a typed record
pub fn validate(raw: &RawMetrics) -> Result<HealthMetricsInput, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let profile = profile_fields(&mut errors, raw);
    let blood_pressure = blood_pressure_field(&mut errors, &raw.blood_pressure);
    let heart_rate = int_field::<u16>(
        &mut errors,
        "heart_rate",
        "Heart rate",
        &raw.heart_rate,
        30,
        Some(220),
    );
    let physical_activity = int_field::<u32>(
        &mut errors,
        "physical_activity",
        "Physical activity",
        &raw.physical_activity,
        0,
        None,
    );

    match (profile, blood_pressure, heart_rate, physical_activity) {
        (Some(p), Some(blood_pressure), Some(heart_rate), Some(physical_activity))
            if errors.is_empty() =>
        {
            Ok(HealthMetricsInput {
                age: p.age,
                gender: p.gender,
                sleep_duration: p.sleep_duration,
                stress_level: p.stress_level,
                daily_steps: p.daily_steps,
                bmi_category: p.bmi_category,
                blood_pressure,
                heart_rate,
                physical_activity,
            })
        }
        _ => Err(errors),
    }
}

/// Validate only the fields `/coach` takes and build the request
///
/// Blood pressure, heart rate and physical activity are not part of a
/// coach request and are ignored.
pub fn validate_coach(
    raw: &RawMetrics,
    disorder_risk: impl Into<String>,
    top_drivers: Vec<String>,
) -> Result<CoachRequest, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    match profile_fields(&mut errors, raw) {
        Some(p) if errors.is_empty() => Ok(CoachRequest {
            age: p.age,
            gender: p.gender,
            sleep_duration: p.sleep_duration,
            stress_level: p.stress_level,
            daily_steps: p.daily_steps,
            bmi_category: p.bmi_category,
            disorder_risk: disorder_risk.into(),
            top_drivers,
        }),
        _ => Err(errors),
    }
}

/// Fields shared by the full form and the coach request
struct Profile {
    age: u8,
    gender: Gender,
    sleep_duration: f64,
    stress_level: u8,
    daily_steps: u32,
    bmi_category: BmiCategory,
}

fn profile_fields(errors: &mut ValidationErrors, raw: &RawMetrics) -> Option<Profile> {
    let age = int_field::<u8>(errors, "age", "Age", &raw.age, 1, Some(120));
    let gender = enum_field(
        errors,
        "gender",
        "Gender",
        &raw.gender,
        Gender::parse,
        Gender::VARIANTS,
    );
    let sleep_duration = sleep_field(errors, &raw.sleep_duration);
    let stress_level = int_field::<u8>(
        errors,
        "stress_level",
        "Stress level",
        &raw.stress_level,
        1,
        Some(10),
    );
    let daily_steps = int_field::<u32>(
        errors,
        "daily_steps",
        "Daily steps",
        &raw.daily_steps,
        0,
        None,
    );
    let bmi_category = enum_field(
        errors,
        "bmi_category",
        "BMI category",
        &raw.bmi_category,
        BmiCategory::parse,
        BmiCategory::VARIANTS,
    );

    Some(Profile {
        age: age?,
        gender: gender?,
        sleep_duration: sleep_duration?,
        stress_level: stress_level?,
        daily_steps: daily_steps?,
        bmi_category: bmi_category?,
    })
}

fn required<'a>(
    errors: &mut ValidationErrors,
    field: &str,
    label: &str,
    value: &'a Option<String>,
) -> Option<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Some(v),
        _ => {
            errors.add(field, format!("{} is required", label));
            None
        }
    }
}

fn int_field<T: TryFrom<i64>>(
    errors: &mut ValidationErrors,
    field: &str,
    label: &str,
    value: &Option<String>,
    min: i64,
    max: Option<i64>,
) -> Option<T> {
    let text = required(errors, field, label, value)?;

    let Ok(n) = text.parse::<i64>() else {
        errors.add(field, format!("{} must be a whole number", label));
        return None;
    };

    let in_range = n >= min && max.map_or(true, |max| n <= max);
    if !in_range {
        let message = match max {
            Some(max) => format!("{} must be between {} and {}", label, min, max),
            None => format!("{} must be {} or more", label, min),
        };
        errors.add(field, message);
        return None;
    }

    match T::try_from(n) {
        Ok(v) => Some(v),
        Err(_) => {
            errors.add(field, format!("{} is too large", label));
            None
        }
    }
}

fn sleep_field(errors: &mut ValidationErrors, value: &Option<String>) -> Option<f64> {
    const FIELD: &str = "sleep_duration";
    let text = required(errors, FIELD, "Sleep duration", value)?;

    match text.parse::<f64>() {
        Ok(hours) if hours.is_finite() => {
            if (0.0..=24.0).contains(&hours) {
                Some(hours)
            } else {
                errors.add(FIELD, "Sleep duration must be between 0 and 24 hours");
                None
            }
        }
        _ => {
            errors.add(FIELD, "Sleep duration must be a number");
            None
        }
    }
}

fn enum_field<T>(
    errors: &mut ValidationErrors,
    field: &str,
    label: &str,
    value: &Option<String>,
    parse: fn(&str) -> Option<T>,
    variants: &[&str],
) -> Option<T> {
    let text = required(errors, field, label, value)?;
    let parsed = parse(text);
    if parsed.is_none() {
        errors.add(
            field,
            format!("{} must be one of {}", label, variants.join(", ")),
        );
    }
    parsed
}

fn blood_pressure_field(
    errors: &mut ValidationErrors,
    value: &Option<String>,
) -> Option<BloodPressure> {
    const FIELD: &str = "blood_pressure";
    let text = required(errors, FIELD, "Blood pressure", value)?;
    match text.parse::<BloodPressure>() {
        Ok(bp) => Some(bp),
        Err(message) => {
            errors.add(FIELD, message);
            None
        }
    }
}
