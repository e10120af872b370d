//! Wire types for the forecasting service API.
//!
//! Field names follow the service's JSON exactly; the handful of
//! Portuguese field names on the city endpoints are renamed to English
//! on the Rust side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One result row from `GET /cities/search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitySummary {
    pub id: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "estado")]
    pub state: String,
    #[serde(rename = "regiao")]
    pub region: String,
}

/// Response of `GET /cities/{id}/coordinates`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Body of `POST /forecast/predict`.
///
/// `hospital_id` and `session_token` are sent together or not at all; the
/// orchestrator fills them from the active session.
#[derive(Debug, Clone, Serialize)]
pub struct PredictRequest {
    pub series_id: String,
    pub horizon: u32,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hospital_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

/// A single forecast horizon day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// ISO-8601 date (`YYYY-MM-DD`).
    pub ds: String,
    pub yhat: f64,
    pub yhat_lower: Option<f64>,
    pub yhat_upper: Option<f64>,
}

/// A typed advisory attached to a forecast (heat wave, holiday bridge, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    /// `high`, `medium` or `low`.
    pub impact: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub expected_increase: Option<String>,
    #[serde(default)]
    pub expected_change: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightsSummary {
    pub total_insights: usize,
    pub high_impact: usize,
    pub medium_impact: usize,
    pub low_impact: usize,
    pub insights: Vec<Insight>,
}

/// Response of `POST /forecast/predict`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub series_id: String,
    pub forecast: Vec<ForecastPoint>,
    #[serde(default)]
    pub insights: Option<InsightsSummary>,
}

/// Response of `POST /forecast/train-file`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainResponse {
    pub series_id: String,
}

/// Body of `POST /hospital-access/register`.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationRequest {
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cnes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    pub password: String,
}

/// Response of `POST /hospital-access/register`. The `short_code` is the
/// human-shareable login code the operator must keep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationResponse {
    pub hospital_id: String,
    pub display_name: String,
    pub short_code: String,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /hospital-access/login`. `identifier` accepts either the
/// short code or the raw hospital id.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

/// One past forecast attributable to a hospital.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub forecast_id: String,
    pub series_id: String,
    pub horizon: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub average_yhat: Option<f64>,
}

/// Response of `GET /hospital-access/{hospital_id}/forecasts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub hospital_id: String,
    pub forecasts: Vec<HistoryEntry>,
}

/// One date of an actual-vs-predicted comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonPoint {
    pub ds: String,
    pub actual: f64,
    pub predicted: f64,
    #[serde(default)]
    pub predicted_lower: Option<f64>,
    #[serde(default)]
    pub predicted_upper: Option<f64>,
}

/// Aggregate accuracy metrics for a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonMetrics {
    pub mape: f64,
    pub rmse: f64,
    pub mae: f64,
    pub smape: f64,
    pub mase: f64,
    pub bias: f64,
    pub r2: f64,
}

/// Qualitative verdict: `excellent`, `good`, `acceptable` or `poor`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub overall: String,
}

/// Response of `POST /forecast/compare-predictions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub comparison_data: Vec<ComparisonPoint>,
    pub metrics: ComparisonMetrics,
    pub quality_assessment: QualityAssessment,
}
