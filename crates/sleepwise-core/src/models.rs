//! Core data models exchanged with the SleepWise API

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Gender as accepted by the prediction model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub const VARIANTS: &'static [&'static str] = &["Male", "Female", "Other"];

    /// Case-insensitive match against the canonical spelling
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            "other" => Some(Gender::Other),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// BMI category as accepted by the prediction model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BmiCategory {
    Normal,
    Overweight,
    Obese,
}

impl BmiCategory {
    pub const VARIANTS: &'static [&'static str] = &["Normal", "Overweight", "Obese"];

    /// Case-insensitive match against the canonical spelling
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "normal" => Some(BmiCategory::Normal),
            "overweight" => Some(BmiCategory::Overweight),
            "obese" => Some(BmiCategory::Obese),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BmiCategory::Normal => "Normal",
            BmiCategory::Overweight => "Overweight",
            BmiCategory::Obese => "Obese",
        }
    }
}

impl fmt::Display for BmiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Blood pressure reading, carried on the wire as `"systolic/diastolic"`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BloodPressure {
    pub systolic: u16,
    pub diastolic: u16,
}

impl FromStr for BloodPressure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (sys, dia) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| "Blood pressure must look like 120/80".to_string())?;

        let parse = |part: &str| -> Result<u16, String> {
            match part.trim().parse::<u16>() {
                Ok(v) if v > 0 => Ok(v),
                _ => Err("Blood pressure must look like 120/80".to_string()),
            }
        };

        Ok(Self {
            systolic: parse(sys)?,
            diastolic: parse(dia)?,
        })
    }
}

impl fmt::Display for BloodPressure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.systolic, self.diastolic)
    }
}

impl Serialize for BloodPressure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BloodPressure {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Unvalidated form state as entered by the user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMetrics {
    pub age: Option<String>,
    pub gender: Option<String>,
    pub sleep_duration: Option<String>,
    pub stress_level: Option<String>,
    pub daily_steps: Option<String>,
    pub bmi_category: Option<String>,
    pub blood_pressure: Option<String>,
    pub heart_rate: Option<String>,
    pub physical_activity: Option<String>,
}

/// Validated health metrics, ready for transmission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthMetricsInput {
    pub age: u8,
    pub gender: Gender,
    pub sleep_duration: f64,
    pub stress_level: u8,
    pub daily_steps: u32,
    pub bmi_category: BmiCategory,
    pub blood_pressure: BloodPressure,
    pub heart_rate: u16,
    pub physical_activity: u32,
}

/// Confidence reported alongside a coach tip
///
/// The value comes from a language model, so spelling is matched
/// case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
    /// Emitted when the rule engine overrides the model or no coach is configured
    #[serde(rename = "n/a")]
    NotApplicable,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::High => write!(f, "high"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::Low => write!(f, "low"),
            Confidence::NotApplicable => write!(f, "n/a"),
        }
    }
}

impl FromStr for Confidence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Confidence::High),
            "medium" => Ok(Confidence::Medium),
            "low" => Ok(Confidence::Low),
            "n/a" => Ok(Confidence::NotApplicable),
            other => Err(format!("unknown confidence {:?}", other)),
        }
    }
}

impl<'de> Deserialize<'de> for Confidence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Sleep quality prediction returned by `/predict`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_quality: f64,
    pub disorder_risk: String,
    pub top_drivers: Vec<String>,
    pub coach_tip: String,
    pub confidence: Confidence,
    pub rule_override_flag: bool,
}

impl PredictionResult {
    /// Check value ranges the type system cannot express
    pub fn check(&self) -> Result<(), String> {
        if !self.predicted_quality.is_finite() || !(0.0..=10.0).contains(&self.predicted_quality)
        {
            return Err(format!(
                "predicted_quality {} outside 0-10",
                self.predicted_quality
            ));
        }
        if self.disorder_risk.trim().is_empty() {
            return Err("disorder_risk is empty".to_string());
        }
        Ok(())
    }

    /// True when the backend reports no disorder risk
    pub fn is_risk_free(&self) -> bool {
        self.disorder_risk.eq_ignore_ascii_case("none")
    }
}

/// Acknowledgement returned by `/log`; no field is required
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogReceipt {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// One historical log row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepLogEntry {
    pub created_at: DateTime<Utc>,
    pub sleep_duration: Option<f64>,
    pub predicted_quality: Option<f64>,
    pub stress_level: Option<i32>,
    pub daily_steps: Option<i64>,
}

/// Window averages precomputed by the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Averages {
    pub sleep: f64,
    pub quality: f64,
    pub stress: f64,
    pub steps: f64,
}

/// Response of `/dashboard/series`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSeries {
    pub logs: Vec<SleepLogEntry>,
    pub averages: Averages,
}

impl DashboardSeries {
    /// Order logs by `created_at` ascending, keeping ties in arrival order
    pub fn sort_logs(&mut self) {
        self.logs.sort_by_key(|entry| entry.created_at);
    }
}

/// Driver name to occurrence count, in the order the backend listed them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverCounts(Vec<(String, u32)>);

impl DriverCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a count; an existing driver keeps its original position
    pub fn insert(&mut self, driver: impl Into<String>, count: u32) {
        let driver = driver.into();
        match self.0.iter_mut().find(|(name, _)| *name == driver) {
            Some(entry) => entry.1 = count,
            None => self.0.push((driver, count)),
        }
    }

    pub fn get(&self, driver: &str) -> Option<u32> {
        self.0
            .iter()
            .find(|(name, _)| name == driver)
            .map(|(_, count)| *count)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(name, count)| (name.as_str(), *count))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, u32)> for DriverCounts {
    fn from_iter<I: IntoIterator<Item = (S, u32)>>(iter: I) -> Self {
        let mut counts = DriverCounts::new();
        for (driver, count) in iter {
            counts.insert(driver, count);
        }
        counts
    }
}

impl Serialize for DriverCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (driver, count) in &self.0 {
            map.serialize_entry(driver, count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DriverCounts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CountsVisitor;

        impl<'de> Visitor<'de> for CountsVisitor {
            type Value = DriverCounts;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of driver name to count")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut counts = DriverCounts::new();
                while let Some((driver, count)) = access.next_entry::<String, u32>()? {
                    counts.insert(driver, count);
                }
                Ok(counts)
            }
        }

        deserializer.deserialize_map(CountsVisitor)
    }
}

/// Response of `/dashboard/top-drivers`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopDrivers {
    pub latest_top_drivers: Vec<String>,
    pub driver_counts: DriverCounts,
}

/// A ranked driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverFrequency {
    pub driver: String,
    pub count: u32,
}

/// Trailing dashboard window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Window {
    #[default]
    Week,
    Fortnight,
    Month,
}

impl Window {
    pub const ALL: [Window; 3] = [Window::Week, Window::Fortnight, Window::Month];

    pub fn days(&self) -> u32 {
        match self {
            Window::Week => 7,
            Window::Fortnight => 14,
            Window::Month => 30,
        }
    }
}

impl TryFrom<u32> for Window {
    type Error = String;

    fn try_from(days: u32) -> Result<Self, Self::Error> {
        match days {
            7 => Ok(Window::Week),
            14 => Ok(Window::Fortnight),
            30 => Ok(Window::Month),
            other => Err(format!("window must be 7, 14 or 30 days, got {}", other)),
        }
    }
}

impl From<Window> for u32 {
    fn from(window: Window) -> u32 {
        window.days()
    }
}

impl FromStr for Window {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let days: u32 = s
            .trim()
            .trim_end_matches('d')
            .parse()
            .map_err(|_| format!("invalid window: {}", s))?;
        Window::try_from(days)
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d", self.days())
    }
}

/// Body of `/coach`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachRequest {
    pub age: u8,
    pub gender: Gender,
    pub sleep_duration: f64,
    pub stress_level: u8,
    pub daily_steps: u32,
    pub bmi_category: BmiCategory,
    pub disorder_risk: String,
    pub top_drivers: Vec<String>,
}

impl CoachRequest {
    pub fn new(
        metrics: &HealthMetricsInput,
        disorder_risk: impl Into<String>,
        top_drivers: Vec<String>,
    ) -> Self {
        Self {
            age: metrics.age,
            gender: metrics.gender,
            sleep_duration: metrics.sleep_duration,
            stress_level: metrics.stress_level,
            daily_steps: metrics.daily_steps,
            bmi_category: metrics.bmi_category,
            disorder_risk: disorder_risk.into(),
            top_drivers,
        }
    }

    /// Ask for a fresh tip on an existing prediction
    pub fn from_prediction(metrics: &HealthMetricsInput, prediction: &PredictionResult) -> Self {
        Self::new(
            metrics,
            prediction.disorder_risk.clone(),
            prediction.top_drivers.clone(),
        )
    }
}

/// Response of `/coach`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachTip {
    pub tip: String,
    #[serde(default)]
    pub rationale: String,
    pub confidence: Confidence,
    #[serde(default)]
    pub rule_override_flag: bool,
}

/// Body of `/feedback`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub followed: bool,
    #[serde(default = "default_acknowledged")]
    pub acknowledged: bool,
}

fn default_acknowledged() -> bool {
    true
}

/// Response of `/feedback`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackReceipt {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Email/password pair for `/login` and `/signup`
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Response of `/login`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user_id: String,
}

/// Response of `/signup`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignupResponse {
    pub message: String,
    #[serde(default)]
    pub user: Option<String>,
}
