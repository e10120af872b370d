use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::api::BackendApi;
use crate::api::error::{ApiError, ApiResult};
use crate::api::types::{
    CitySummary, ComparisonResult, Coordinates, ForecastResponse, HistoryResponse, LoginRequest,
    PredictRequest, RegistrationRequest, RegistrationResponse, TrainResponse,
};
use crate::session::Session;

/// Header carrying the session token on the history endpoint.
const HOSPITAL_TOKEN_HEADER: &str = "X-Hospital-Token";

/// reqwest-backed [`BackendApi`] against a configurable base URL.
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    /// Creates a backend for `base_url` (no trailing slash required).
    ///
    /// # Errors
    ///
    /// Fails only if the underlying client cannot be built.
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Maps a non-2xx response to a normalized [`ApiError`].
    async fn check(resp: reqwest::Response) -> ApiResult<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), "API call failed");
        Err(ApiError::from_status(status.as_u16(), &body))
    }

    fn csv_part(file_name: &str, contents: Vec<u8>) -> ApiResult<Part> {
        Ok(Part::bytes(contents)
            .file_name(file_name.to_string())
            .mime_str("text/csv")?)
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn search_cities(&self, query: &str, limit: usize) -> ApiResult<Vec<CitySummary>> {
        let resp = self
            .client
            .get(self.url("/cities/search"))
            .query(&[("q", query), ("limit", &limit.to_string())])
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    async fn city_coordinates(&self, city_id: &str) -> ApiResult<Coordinates> {
        let resp = self
            .client
            .get(self.url(&format!("/cities/{city_id}/coordinates")))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    async fn train(
        &self,
        file_name: &str,
        contents: Vec<u8>,
        series_id: &str,
    ) -> ApiResult<TrainResponse> {
        let form = Form::new()
            .part("file", Self::csv_part(file_name, contents)?)
            .text("series_id", series_id.to_string());

        let resp = self
            .client
            .post(self.url("/forecast/train-file"))
            .multipart(form)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    async fn predict(&self, request: &PredictRequest) -> ApiResult<ForecastResponse> {
        let resp = self
            .client
            .post(self.url("/forecast/predict"))
            .json(request)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    async fn register(&self, request: &RegistrationRequest) -> ApiResult<RegistrationResponse> {
        let resp = self
            .client
            .post(self.url("/hospital-access/register"))
            .json(request)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    async fn login(&self, request: &LoginRequest) -> ApiResult<Session> {
        let resp = self
            .client
            .post(self.url("/hospital-access/login"))
            .json(request)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    async fn forecast_history(&self, hospital_id: &str, token: &str) -> ApiResult<HistoryResponse> {
        let resp = self
            .client
            .get(self.url(&format!("/hospital-access/{hospital_id}/forecasts")))
            .header(HOSPITAL_TOKEN_HEADER, token)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    async fn compare(
        &self,
        file_name: &str,
        contents: Vec<u8>,
        series_id: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> ApiResult<ComparisonResult> {
        let mut form = Form::new()
            .part("file", Self::csv_part(file_name, contents)?)
            .text("series_id", series_id.to_string());
        if let Some(start) = start_date {
            form = form.text("start_date", start.to_string());
        }
        if let Some(end) = end_date {
            form = form.text("end_date", end.to_string());
        }

        let resp = self
            .client
            .post(self.url("/forecast/compare-predictions"))
            .multipart(form)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }
}
