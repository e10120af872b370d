//! Client for the forecasting service's JSON-over-HTTP API.
//!
//! [`BackendApi`] is the seam the orchestrator talks through; production
//! code uses the reqwest-backed [`HttpBackend`], tests substitute a
//! recording double.

pub mod error;
mod http;
pub mod types;

pub use http::HttpBackend;

use crate::api::error::ApiResult;
use crate::api::types::{
    CitySummary, ComparisonResult, Coordinates, ForecastResponse, HistoryResponse, LoginRequest,
    PredictRequest, RegistrationRequest, RegistrationResponse, TrainResponse,
};
use crate::session::Session;

/// Abstraction over the remote forecasting service.
///
/// One method per endpoint; each returns the parsed success shape or a
/// normalized [`error::ApiError`].
#[async_trait::async_trait]
pub trait BackendApi: Send + Sync {
    /// `GET /cities/search?q=&limit=`
    async fn search_cities(&self, query: &str, limit: usize) -> ApiResult<Vec<CitySummary>>;

    /// `GET /cities/{id}/coordinates`
    async fn city_coordinates(&self, city_id: &str) -> ApiResult<Coordinates>;

    /// `POST /forecast/train-file` (multipart: `file`, `series_id`)
    async fn train(
        &self,
        file_name: &str,
        contents: Vec<u8>,
        series_id: &str,
    ) -> ApiResult<TrainResponse>;

    /// `POST /forecast/predict`
    async fn predict(&self, request: &PredictRequest) -> ApiResult<ForecastResponse>;

    /// `POST /hospital-access/register`
    async fn register(&self, request: &RegistrationRequest) -> ApiResult<RegistrationResponse>;

    /// `POST /hospital-access/login`. The success body is the full session.
    async fn login(&self, request: &LoginRequest) -> ApiResult<Session>;

    /// `GET /hospital-access/{hospital_id}/forecasts` with `X-Hospital-Token`.
    async fn forecast_history(&self, hospital_id: &str, token: &str) -> ApiResult<HistoryResponse>;

    /// `POST /forecast/compare-predictions` (multipart: `file`, `series_id`,
    /// optional `start_date` / `end_date`)
    async fn compare(
        &self,
        file_name: &str,
        contents: Vec<u8>,
        series_id: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> ApiResult<ComparisonResult>;
}
