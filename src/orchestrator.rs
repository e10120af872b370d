//! Sequencing of user actions into ordered backend calls.
//!
//! Each operation validates its inputs before touching the network,
//! issues its calls in the required order, and folds the outcome into the
//! shared [`AppState`] through the reducer. Failures surface as a status
//! line; nothing retries automatically. Background city-search failures
//! are the one exception: they are logged and the previous results stay.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::api::BackendApi;
use crate::api::types::{CitySummary, LoginRequest, PredictRequest, RegistrationRequest};
use crate::session::{MIN_PASSWORD_LEN, SessionManager, SessionPhase};
use crate::state::{AppEvent, AppState, Panel, reduce};
use crate::upload;

/// Longest horizon the service will forecast, in days.
pub const MAX_HORIZON: u32 = 365;
/// Queries shorter than this never hit the city-search endpoint.
const MIN_CITY_QUERY_LEN: usize = 2;
/// Result cap passed to the city-search endpoint.
const CITY_SEARCH_LIMIT: usize = 10;

/// Ties the backend, the session manager, and the view state together.
///
/// Operations return `Ok(true)` when they succeeded, `Ok(false)` when the
/// failure was surfaced to the operator in the status line, and `Err` only
/// for local faults (session storage, file system) the UI cannot express.
pub struct Orchestrator {
    api: Arc<dyn BackendApi>,
    sessions: SessionManager,
    state: AppState,
    search_seq: AtomicU64,
}

impl Orchestrator {
    pub fn new(api: Arc<dyn BackendApi>, sessions: SessionManager) -> Self {
        Self {
            api,
            sessions,
            state: AppState::default(),
            search_seq: AtomicU64::new(1),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.sessions.is_authenticated()
    }

    pub fn session_phase(&self) -> SessionPhase {
        self.sessions.phase()
    }

    fn apply(&mut self, event: AppEvent) {
        reduce(&mut self.state, event);
    }

    fn status(&mut self, message: impl Into<String>) {
        self.apply(AppEvent::Status(message.into()));
    }

    /// Restores a persisted session at startup and mirrors it into the
    /// view state. No backend call is made; the restored token is trusted
    /// until the first authenticated request answers.
    pub fn restore_session(&mut self) -> Result<bool> {
        let Some(session) = self.sessions.restore()? else {
            return Ok(false);
        };
        let name = session.display_name.clone();
        self.apply(AppEvent::SessionEstablished(session));
        self.status(format!("Active session for {name}"));
        Ok(true)
    }

    pub fn select_panel(&mut self, panel: Panel) {
        self.apply(AppEvent::PanelSelected(panel));
    }

    pub fn select_city(&mut self, city: CitySummary) {
        self.apply(AppEvent::CitySelected(city));
    }

    /// City lookup for the search box. Short queries clear the result list
    /// without network chatter; failures are logged only and leave the
    /// previous results in place.
    #[tracing::instrument(skip(self))]
    pub async fn search_cities(&mut self, query: &str) -> Result<bool> {
        let seq = self.search_seq.fetch_add(1, Ordering::Relaxed);
        let query = query.trim();
        if query.chars().count() < MIN_CITY_QUERY_LEN {
            self.apply(AppEvent::CityResultsCleared { seq });
            return Ok(true);
        }

        match self.api.search_cities(query, CITY_SEARCH_LIMIT).await {
            Ok(cities) => {
                self.apply(AppEvent::CityResults { seq, cities });
                Ok(true)
            }
            Err(e) => {
                warn!(query, error = %e, "City search failed");
                Ok(false)
            }
        }
    }

    /// Uploads a CSV and trains the model for `series_id`.
    ///
    /// Success only reports a status; the held forecast and session are
    /// left untouched.
    #[tracing::instrument(skip(self), fields(path = %path.display()))]
    pub async fn train(&mut self, path: &Path, series_id: &str) -> Result<bool> {
        if series_id.trim().is_empty() {
            self.status("Please provide a series id");
            return Ok(false);
        }
        if !path.exists() {
            self.status("Please select a CSV file");
            return Ok(false);
        }
        let summary = match upload::inspect_csv(path) {
            Ok(summary) => summary,
            Err(e) => {
                self.status(format!("Training failed: {e}"));
                return Ok(false);
            }
        };

        let contents = std::fs::read(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.csv");

        info!(series_id, rows = summary.rows, "Submitting training file");
        match self.api.train(file_name, contents, series_id).await {
            Ok(resp) => {
                self.status(format!(
                    "Model trained successfully ({} rows, series {})",
                    summary.rows, resp.series_id
                ));
                Ok(true)
            }
            Err(e) => {
                self.status(format!("Training failed: {e}"));
                Ok(false)
            }
        }
    }

    /// Resolves the selected city to coordinates and requests a forecast.
    ///
    /// The prediction call is never issued unless the coordinate lookup
    /// for this invocation succeeded; there are no synthesized or stale
    /// coordinates.
    #[tracing::instrument(skip(self))]
    pub async fn predict(&mut self, series_id: &str, horizon: u32) -> Result<bool> {
        if series_id.trim().is_empty() {
            self.status("Please provide a series id");
            return Ok(false);
        }
        if horizon == 0 || horizon > MAX_HORIZON {
            self.status(format!("Horizon must be between 1 and {MAX_HORIZON} days"));
            return Ok(false);
        }
        let Some(city) = self.state.selected_city.clone() else {
            self.status("Please select a city first");
            return Ok(false);
        };

        let coords = match self.api.city_coordinates(&city.id).await {
            Ok(coords) => coords,
            Err(e) => {
                self.status(format!("Could not resolve coordinates for {}: {e}", city.name));
                return Ok(false);
            }
        };

        let session = self.sessions.session();
        let request = PredictRequest {
            series_id: series_id.to_string(),
            horizon,
            latitude: coords.latitude,
            longitude: coords.longitude,
            hospital_id: session.map(|s| s.hospital_id.clone()),
            session_token: session.map(|s| s.token.clone()),
        };

        match self.api.predict(&request).await {
            Ok(resp) => {
                info!(series_id, horizon, points = resp.forecast.len(), "Forecast received");
                self.apply(AppEvent::ForecastLoaded {
                    forecast: resp.forecast,
                    insights: resp.insights,
                });
                self.status("Forecast generated successfully");
                if self.sessions.is_authenticated() {
                    self.refresh_history().await?;
                }
                Ok(true)
            }
            Err(e) => {
                if e.is_unauthorized() {
                    self.drop_rejected_session()?;
                }
                self.status(format!("Prediction failed: {e}"));
                Ok(false)
            }
        }
    }

    /// Refetches the forecast history for the authenticated hospital.
    ///
    /// A failed fetch keeps the previously held list; stale-but-present
    /// beats empty.
    #[tracing::instrument(skip(self))]
    pub async fn refresh_history(&mut self) -> Result<bool> {
        let Some(session) = self.sessions.session().cloned() else {
            return Ok(false);
        };

        match self
            .api
            .forecast_history(&session.hospital_id, &session.token)
            .await
        {
            Ok(resp) => {
                self.apply(AppEvent::HistoryLoaded(resp.forecasts));
                Ok(true)
            }
            Err(e) => {
                if e.is_unauthorized() {
                    self.drop_rejected_session()?;
                }
                self.status(format!("Could not load forecast history: {e}"));
                Ok(false)
            }
        }
    }

    /// Registers a new hospital. On success the operator is handed the
    /// short code and moved to the login form.
    #[tracing::instrument(skip(self, form))]
    pub async fn register(&mut self, form: RegistrationRequest) -> Result<bool> {
        self.sessions.begin_registration();
        if form.password.chars().count() < MIN_PASSWORD_LEN {
            self.status(format!("Password must be at least {MIN_PASSWORD_LEN} characters"));
            return Ok(false);
        }

        match self.api.register(&form).await {
            Ok(resp) => {
                self.sessions.begin_login();
                self.status(format!(
                    "Hospital registered. Keep this login code: {}",
                    resp.short_code
                ));
                Ok(true)
            }
            Err(e) => {
                // Stay in Registering; the server message is surfaced verbatim.
                self.status(format!("Registration failed: {e}"));
                Ok(false)
            }
        }
    }

    /// Authenticates with a short code or raw hospital id. On success the
    /// session is persisted before anything else happens, then history is
    /// fetched.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&mut self, identifier: &str, password: &str) -> Result<bool> {
        self.sessions.begin_login();
        let request = LoginRequest {
            identifier: identifier.to_string(),
            password: password.to_string(),
        };

        match self.api.login(&request).await {
            Ok(session) => {
                self.sessions.establish(session.clone())?;
                let name = session.display_name.clone();
                self.apply(AppEvent::SessionEstablished(session));
                self.status(format!("Session started for {name}"));
                self.refresh_history().await?;
                Ok(true)
            }
            Err(e) => {
                self.status(format!("Login failed: {e}"));
                Ok(false)
            }
        }
    }

    /// Explicit logout: clears the durable slot, the mirror, and history.
    pub fn logout(&mut self) -> Result<()> {
        self.sessions.logout()?;
        self.apply(AppEvent::SessionCleared);
        self.status("Session ended");
        Ok(())
    }

    /// Uploads observed actuals and compares them against stored
    /// predictions for `series_id`.
    #[tracing::instrument(skip(self), fields(path = %path.display()))]
    pub async fn compare(
        &mut self,
        path: &Path,
        series_id: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<bool> {
        if series_id.trim().is_empty() {
            self.status("Please provide a series id");
            return Ok(false);
        }
        if !path.exists() {
            self.status("Please select a CSV file with observed values");
            return Ok(false);
        }
        if let Err(e) = upload::inspect_csv(path) {
            self.status(format!("Comparison failed: {e}"));
            return Ok(false);
        }

        let contents = std::fs::read(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("actuals.csv");

        match self
            .api
            .compare(file_name, contents, series_id, start_date, end_date)
            .await
        {
            Ok(result) => {
                self.status(format!(
                    "Comparison ready: {} points, overall quality {}",
                    result.comparison_data.len(),
                    result.quality_assessment.overall
                ));
                self.apply(AppEvent::ComparisonLoaded(result));
                Ok(true)
            }
            Err(e) => {
                self.status(format!("Comparison failed: {e}"));
                Ok(false)
            }
        }
    }

    /// 401 on an authenticated call: token is gone, so is everything
    /// attributable to it.
    fn drop_rejected_session(&mut self) -> Result<()> {
        self.sessions.invalidate()?;
        self.apply(AppEvent::SessionCleared);
        Ok(())
    }
}
