//! Single observable view state and its reducer.
//!
//! Every change to what the operator sees goes through [`reduce`] as an
//! [`AppEvent`], so transitions are enumerable and testable instead of
//! scattered across call sites. Panel switches never clear held state.

use crate::api::types::{
    CitySummary, ComparisonResult, ForecastPoint, HistoryEntry, InsightsSummary,
};
use crate::session::Session;

/// Mean demand at or above this is a red risk level.
const RISK_RED_THRESHOLD: i64 = 90;
/// Mean demand at or above this (and below red) is yellow.
const RISK_YELLOW_THRESHOLD: i64 = 70;

/// Top-level panel the operator is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Panel {
    #[default]
    Forecast,
    /// Live service-monitoring view. Presentation-only: the CLI shell has
    /// no subcommand for it, so only an embedding UI selects it.
    Monitoring,
    Comparison,
}

/// Traffic-light summary of the current forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Green,
    Yellow,
    Red,
    Unknown,
}

impl RiskLevel {
    /// Pure function of the rounded mean forecast.
    pub fn from_mean(mean: Option<i64>) -> Self {
        match mean {
            None => RiskLevel::Unknown,
            Some(m) if m >= RISK_RED_THRESHOLD => RiskLevel::Red,
            Some(m) if m >= RISK_YELLOW_THRESHOLD => RiskLevel::Yellow,
            Some(_) => RiskLevel::Green,
        }
    }
}

/// Rounded arithmetic mean of the finite `yhat` values, `None` when there
/// are none.
pub fn mean_forecast(points: &[ForecastPoint]) -> Option<i64> {
    let vals: Vec<f64> = points.iter().map(|p| p.yhat).filter(|v| v.is_finite()).collect();
    if vals.is_empty() {
        return None;
    }
    let sum: f64 = vals.iter().sum();
    Some((sum / vals.len() as f64).round() as i64)
}

/// Everything the presentation layer reads.
#[derive(Debug, Default)]
pub struct AppState {
    pub panel: Panel,
    /// Read-only mirror of the session owned by the session manager.
    pub session: Option<Session>,
    pub selected_city: Option<CitySummary>,
    pub city_results: Vec<CitySummary>,
    /// Sequence number of the newest city-search result applied. Responses
    /// tagged with an older number arrive too late and are dropped.
    city_seq: u64,
    pub forecast: Vec<ForecastPoint>,
    pub insights: Option<InsightsSummary>,
    pub history: Vec<HistoryEntry>,
    pub comparison: Option<ComparisonResult>,
    /// Last human-readable status line.
    pub status: Option<String>,
}

impl AppState {
    pub fn mean_forecast(&self) -> Option<i64> {
        mean_forecast(&self.forecast)
    }

    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_mean(self.mean_forecast())
    }
}

/// A state transition. Produced by the orchestrator, consumed by [`reduce`].
#[derive(Debug)]
pub enum AppEvent {
    PanelSelected(Panel),
    Status(String),
    /// Results of a city search. `seq` orders concurrent lookups.
    CityResults { seq: u64, cities: Vec<CitySummary> },
    /// Query fell under the search threshold; drop the result list.
    CityResultsCleared { seq: u64 },
    CitySelected(CitySummary),
    ForecastLoaded {
        forecast: Vec<ForecastPoint>,
        insights: Option<InsightsSummary>,
    },
    SessionEstablished(Session),
    /// Logout or token rejection. Drops history and the forecast context.
    SessionCleared,
    HistoryLoaded(Vec<HistoryEntry>),
    ComparisonLoaded(ComparisonResult),
}

/// Applies one event to the state.
pub fn reduce(state: &mut AppState, event: AppEvent) {
    match event {
        AppEvent::PanelSelected(panel) => state.panel = panel,
        AppEvent::Status(msg) => state.status = Some(msg),
        AppEvent::CityResults { seq, cities } => {
            if seq >= state.city_seq {
                state.city_seq = seq;
                state.city_results = cities;
            }
        }
        AppEvent::CityResultsCleared { seq } => {
            if seq >= state.city_seq {
                state.city_seq = seq;
                state.city_results.clear();
            }
        }
        AppEvent::CitySelected(city) => {
            state.selected_city = Some(city);
            state.city_results.clear();
        }
        AppEvent::ForecastLoaded { forecast, insights } => {
            state.forecast = forecast;
            state.insights = insights;
        }
        AppEvent::SessionEstablished(session) => state.session = Some(session),
        AppEvent::SessionCleared => {
            state.session = None;
            state.history.clear();
            state.forecast.clear();
            state.insights = None;
        }
        AppEvent::HistoryLoaded(entries) => state.history = entries,
        AppEvent::ComparisonLoaded(result) => state.comparison = Some(result),
    }
}
