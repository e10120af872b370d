//! End-to-end orchestration scenarios against a recording backend double.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use hospicast::api::BackendApi;
use hospicast::api::error::{ApiError, ApiResult};
use hospicast::api::types::{
    CitySummary, ComparisonMetrics, ComparisonPoint, ComparisonResult, Coordinates,
    ForecastPoint, ForecastResponse, HistoryEntry, HistoryResponse, LoginRequest,
    PredictRequest, QualityAssessment, RegistrationRequest, RegistrationResponse,
    TrainResponse,
};
use hospicast::orchestrator::Orchestrator;
use hospicast::session::{FileStore, Session, SessionManager, SessionPhase};
use hospicast::state::RiskLevel;

fn sample_session() -> Session {
    Session {
        hospital_id: "h1".to_string(),
        display_name: "Hospital X".to_string(),
        short_code: "ABC123".to_string(),
        token: "t1".to_string(),
        expires_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
    }
}

fn joinville() -> CitySummary {
    CitySummary {
        id: "42".to_string(),
        name: "Joinville".to_string(),
        state: "Santa Catarina".to_string(),
        region: "Sul".to_string(),
    }
}

fn single_point_forecast() -> Vec<ForecastPoint> {
    vec![ForecastPoint {
        ds: "2024-01-01".to_string(),
        yhat: 80.0,
        yhat_lower: Some(70.0),
        yhat_upper: Some(90.0),
    }]
}

/// Backend double that records every call in order.
#[derive(Default)]
struct MockBackend {
    calls: Mutex<Vec<String>>,
    cities: Vec<CitySummary>,
    coordinates: Option<Coordinates>,
    forecast: Vec<ForecastPoint>,
    predict_unauthorized: bool,
    last_predict: Mutex<Option<PredictRequest>>,
    login_session: Option<Session>,
    history: Vec<HistoryEntry>,
    history_fails: std::sync::atomic::AtomicBool,
    comparison: Option<ComparisonResult>,
}

impl MockBackend {
    fn log(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl BackendApi for MockBackend {
    async fn search_cities(&self, query: &str, limit: usize) -> ApiResult<Vec<CitySummary>> {
        self.log(format!("search:{query}:{limit}"));
        Ok(self.cities.clone())
    }

    async fn city_coordinates(&self, city_id: &str) -> ApiResult<Coordinates> {
        self.log(format!("coords:{city_id}"));
        self.coordinates.ok_or(ApiError::Status {
            status: 404,
            message: "Coordenadas não encontradas para esta cidade".to_string(),
        })
    }

    async fn train(
        &self,
        _file_name: &str,
        _contents: Vec<u8>,
        series_id: &str,
    ) -> ApiResult<TrainResponse> {
        self.log(format!("train:{series_id}"));
        Ok(TrainResponse {
            series_id: series_id.to_string(),
        })
    }

    async fn predict(&self, request: &PredictRequest) -> ApiResult<ForecastResponse> {
        self.log("predict");
        *self.last_predict.lock().unwrap() = Some(request.clone());
        if self.predict_unauthorized {
            return Err(ApiError::Unauthorized {
                message: "sessão expirada".to_string(),
            });
        }
        Ok(ForecastResponse {
            series_id: request.series_id.clone(),
            forecast: self.forecast.clone(),
            insights: None,
        })
    }

    async fn register(&self, request: &RegistrationRequest) -> ApiResult<RegistrationResponse> {
        self.log("register");
        Ok(RegistrationResponse {
            hospital_id: "h1".to_string(),
            display_name: request.display_name.clone(),
            short_code: "ABC123".to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        })
    }

    async fn login(&self, request: &LoginRequest) -> ApiResult<Session> {
        self.log(format!("login:{}", request.identifier));
        self.login_session.clone().ok_or(ApiError::Unauthorized {
            message: "credenciais inválidas".to_string(),
        })
    }

    async fn forecast_history(&self, hospital_id: &str, _token: &str) -> ApiResult<HistoryResponse> {
        self.log(format!("history:{hospital_id}"));
        if self.history_fails.load(std::sync::atomic::Ordering::Relaxed) {
            return Err(ApiError::Status {
                status: 500,
                message: "história indisponível".to_string(),
            });
        }
        Ok(HistoryResponse {
            hospital_id: hospital_id.to_string(),
            forecasts: self.history.clone(),
        })
    }

    async fn compare(
        &self,
        _file_name: &str,
        _contents: Vec<u8>,
        series_id: &str,
        _start_date: Option<&str>,
        _end_date: Option<&str>,
    ) -> ApiResult<ComparisonResult> {
        self.log(format!("compare:{series_id}"));
        self.comparison.clone().ok_or(ApiError::Status {
            status: 404,
            message: "Modelo não encontrado".to_string(),
        })
    }
}

struct Harness {
    backend: Arc<MockBackend>,
    orch: Orchestrator,
    session_path: PathBuf,
    _dir: tempfile::TempDir,
}

fn harness(backend: MockBackend) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let session_path = dir.path().join("session.json");
    let backend = Arc::new(backend);
    let sessions = SessionManager::new(Box::new(FileStore::new(&session_path)));
    let orch = Orchestrator::new(backend.clone(), sessions);
    Harness {
        backend,
        orch,
        session_path,
        _dir: dir,
    }
}

fn csv_fixture(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("demand.csv");
    std::fs::write(&path, "ds,y\n2024-01-01,80\n2024-01-02,84\n").unwrap();
    path
}

#[tokio::test]
async fn test_login_scenario_establishes_session_and_fetches_history() {
    let mut h = harness(MockBackend {
        login_session: Some(sample_session()),
        history: vec![HistoryEntry {
            forecast_id: "f1".to_string(),
            series_id: "demanda_hospitalar".to_string(),
            horizon: 14,
            created_at: Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap(),
            average_yhat: Some(81.2),
        }],
        ..Default::default()
    });

    assert!(h.orch.login("ABC123", "secret1").await.unwrap());

    // Session is exactly the login response, in memory and on disk.
    assert_eq!(h.orch.state().session, Some(sample_session()));
    let persisted: Session =
        serde_json::from_str(&std::fs::read_to_string(&h.session_path).unwrap()).unwrap();
    assert_eq!(persisted, sample_session());

    // History was fetched exactly once, for the right hospital.
    let history_calls: Vec<_> = h
        .backend
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("history:"))
        .collect();
    assert_eq!(history_calls, vec!["history:h1".to_string()]);
    assert_eq!(h.orch.state().history.len(), 1);
}

#[tokio::test]
async fn test_session_survives_reload_field_for_field() {
    let mut h = harness(MockBackend {
        login_session: Some(sample_session()),
        ..Default::default()
    });
    assert!(h.orch.login("ABC123", "secret1").await.unwrap());

    // A fresh manager over the same file is a reload.
    let mut reloaded = SessionManager::new(Box::new(FileStore::new(&h.session_path)));
    assert_eq!(reloaded.restore().unwrap(), Some(sample_session()));
    assert_eq!(reloaded.session(), Some(&sample_session()));
    assert_eq!(reloaded.phase(), SessionPhase::Authenticated);
}

#[tokio::test]
async fn test_failed_login_surfaces_error_and_stays_logged_out() {
    let mut h = harness(MockBackend::default());

    assert!(!h.orch.login("WRONG", "nope").await.unwrap());
    assert!(!h.orch.is_authenticated());
    assert_eq!(h.orch.session_phase(), SessionPhase::LoggingIn);
    assert!(h.orch.state().status.as_ref().unwrap().contains("credenciais inválidas"));
}

#[tokio::test]
async fn test_predict_resolves_coordinates_before_predicting() {
    let mut h = harness(MockBackend {
        coordinates: Some(Coordinates {
            latitude: -26.3,
            longitude: -48.8,
        }),
        forecast: single_point_forecast(),
        ..Default::default()
    });

    h.orch.select_city(joinville());
    assert!(h.orch.predict("demanda_hospitalar", 14).await.unwrap());

    assert_eq!(h.backend.calls(), vec!["coords:42".to_string(), "predict".to_string()]);
    let request = h.backend.last_predict.lock().unwrap().clone().unwrap();
    assert_eq!(request.latitude, -26.3);
    assert_eq!(request.longitude, -48.8);
    assert!(request.hospital_id.is_none());

    assert_eq!(h.orch.state().mean_forecast(), Some(80));
    assert_eq!(h.orch.state().risk_level(), RiskLevel::Yellow);
}

#[tokio::test]
async fn test_predict_aborts_when_coordinates_fail() {
    let mut h = harness(MockBackend {
        coordinates: None, // lookup returns 404
        ..Default::default()
    });

    h.orch.select_city(joinville());
    assert!(!h.orch.predict("demanda_hospitalar", 14).await.unwrap());

    assert_eq!(h.backend.calls(), vec!["coords:42".to_string()]);
    let status = h.orch.state().status.clone().unwrap();
    assert!(status.contains("Could not resolve coordinates"));
    assert!(status.contains("Joinville"));
}

#[tokio::test]
async fn test_predict_fails_fast_without_city_or_valid_horizon() {
    let mut h = harness(MockBackend::default());

    assert!(!h.orch.predict("demanda_hospitalar", 14).await.unwrap());
    assert!(h.backend.calls().is_empty());

    h.orch.select_city(joinville());
    assert!(!h.orch.predict("demanda_hospitalar", 0).await.unwrap());
    assert!(!h.orch.predict("demanda_hospitalar", 366).await.unwrap());
    assert!(!h.orch.predict("", 14).await.unwrap());
    assert!(h.backend.calls().is_empty());
}

#[tokio::test]
async fn test_authenticated_predict_attaches_credentials_and_refreshes_history() {
    let mut h = harness(MockBackend {
        login_session: Some(sample_session()),
        coordinates: Some(Coordinates {
            latitude: -26.3,
            longitude: -48.8,
        }),
        forecast: single_point_forecast(),
        ..Default::default()
    });

    assert!(h.orch.login("ABC123", "secret1").await.unwrap());
    h.orch.select_city(joinville());
    assert!(h.orch.predict("demanda_hospitalar", 14).await.unwrap());

    let request = h.backend.last_predict.lock().unwrap().clone().unwrap();
    assert_eq!(request.hospital_id.as_deref(), Some("h1"));
    assert_eq!(request.session_token.as_deref(), Some("t1"));

    // One history fetch at login, another after the successful predict.
    let history_calls = h
        .backend
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("history:"))
        .count();
    assert_eq!(history_calls, 2);
}

#[tokio::test]
async fn test_predict_401_clears_session_and_storage() {
    let mut h = harness(MockBackend {
        login_session: Some(sample_session()),
        coordinates: Some(Coordinates {
            latitude: -26.3,
            longitude: -48.8,
        }),
        predict_unauthorized: true,
        ..Default::default()
    });

    assert!(h.orch.login("ABC123", "secret1").await.unwrap());
    h.orch.select_city(joinville());
    assert!(!h.orch.predict("demanda_hospitalar", 14).await.unwrap());

    assert!(!h.orch.is_authenticated());
    assert!(h.orch.state().session.is_none());
    assert!(h.orch.state().history.is_empty());
    assert!(h.orch.state().status.as_ref().unwrap().contains("sessão expirada"));

    // A reload restores Anonymous.
    let mut reloaded = SessionManager::new(Box::new(FileStore::new(&h.session_path)));
    assert!(reloaded.restore().unwrap().is_none());
    assert_eq!(reloaded.phase(), SessionPhase::Anonymous);
}

#[tokio::test]
async fn test_train_fails_fast_without_file_or_series_id() {
    let mut h = harness(MockBackend::default());

    assert!(!h.orch.train(std::path::Path::new("/missing.csv"), "s1").await.unwrap());
    let dir = tempfile::tempdir().unwrap();
    let csv = csv_fixture(&dir);
    assert!(!h.orch.train(&csv, "").await.unwrap());
    assert!(!h.orch.train(&csv, "   ").await.unwrap());

    assert!(h.backend.calls().is_empty());
}

#[tokio::test]
async fn test_train_success_reports_series_and_keeps_forecast() {
    let mut h = harness(MockBackend {
        coordinates: Some(Coordinates {
            latitude: -26.3,
            longitude: -48.8,
        }),
        forecast: single_point_forecast(),
        ..Default::default()
    });

    // Hold a forecast from the previous model first.
    h.orch.select_city(joinville());
    assert!(h.orch.predict("demanda_hospitalar", 14).await.unwrap());
    assert!(!h.orch.state().forecast.is_empty());

    let dir = tempfile::tempdir().unwrap();
    let csv = csv_fixture(&dir);
    assert!(h.orch.train(&csv, "demanda_hospitalar").await.unwrap());

    // Training only reports a status; the held forecast and session
    // context survive it.
    assert_eq!(h.orch.state().forecast, single_point_forecast());
    assert_eq!(h.orch.state().mean_forecast(), Some(80));
    let status = h.orch.state().status.clone().unwrap();
    assert!(status.contains("demanda_hospitalar"));
    assert!(status.contains("2 rows"));
}

#[tokio::test]
async fn test_city_search_threshold_and_results() {
    let mut h = harness(MockBackend {
        cities: vec![joinville()],
        ..Default::default()
    });

    assert!(h.orch.search_cities("jo").await.unwrap());
    assert_eq!(h.orch.state().city_results.len(), 1);

    // A query under the threshold issues nothing and clears the list.
    assert!(h.orch.search_cities("j").await.unwrap());
    assert!(h.orch.state().city_results.is_empty());

    assert_eq!(h.backend.calls(), vec!["search:jo:10".to_string()]);
}

#[tokio::test]
async fn test_register_rejects_short_password_before_network() {
    let mut h = harness(MockBackend::default());

    let form = RegistrationRequest {
        display_name: "Hospital X".to_string(),
        cnes: None,
        city: Some("Joinville".to_string()),
        state: Some("SC".to_string()),
        contact_email: None,
        password: "12345".to_string(),
    };
    assert!(!h.orch.register(form).await.unwrap());

    assert!(h.backend.calls().is_empty());
    assert_eq!(h.orch.session_phase(), SessionPhase::Registering);
}

#[tokio::test]
async fn test_register_success_moves_to_login_with_short_code() {
    let mut h = harness(MockBackend::default());

    let form = RegistrationRequest {
        display_name: "Hospital X".to_string(),
        cnes: Some("1234567".to_string()),
        city: Some("Joinville".to_string()),
        state: Some("SC".to_string()),
        contact_email: Some("ops@hospital-x.example".to_string()),
        password: "secret1".to_string(),
    };
    assert!(h.orch.register(form).await.unwrap());

    assert_eq!(h.orch.session_phase(), SessionPhase::LoggingIn);
    assert!(h.orch.state().status.as_ref().unwrap().contains("ABC123"));
}

#[tokio::test]
async fn test_history_failure_keeps_previous_entries() {
    let entry = HistoryEntry {
        forecast_id: "f1".to_string(),
        series_id: "s1".to_string(),
        horizon: 7,
        created_at: Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap(),
        average_yhat: None,
    };

    let mut h = harness(MockBackend {
        login_session: Some(sample_session()),
        history: vec![entry.clone()],
        ..Default::default()
    });
    assert!(h.orch.login("ABC123", "secret1").await.unwrap());
    assert_eq!(h.orch.state().history, vec![entry.clone()]);

    // Later fetches start failing; the held list must survive.
    h.backend
        .history_fails
        .store(true, std::sync::atomic::Ordering::Relaxed);
    assert!(!h.orch.refresh_history().await.unwrap());

    assert_eq!(h.orch.state().history, vec![entry]);
    assert!(h.orch.state().status.as_ref().unwrap().contains("história indisponível"));
}

#[tokio::test]
async fn test_logout_clears_everything_attributable() {
    let mut h = harness(MockBackend {
        login_session: Some(sample_session()),
        history: vec![HistoryEntry {
            forecast_id: "f1".to_string(),
            series_id: "s1".to_string(),
            horizon: 7,
            created_at: Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap(),
            average_yhat: None,
        }],
        ..Default::default()
    });

    assert!(h.orch.login("ABC123", "secret1").await.unwrap());
    h.orch.logout().unwrap();

    assert!(!h.orch.is_authenticated());
    assert!(h.orch.state().history.is_empty());
    assert!(!h.session_path.exists());
}

#[tokio::test]
async fn test_compare_round_trip() {
    let comparison = ComparisonResult {
        comparison_data: vec![ComparisonPoint {
            ds: "2024-01-01".to_string(),
            actual: 78.0,
            predicted: 80.0,
            predicted_lower: Some(70.0),
            predicted_upper: Some(90.0),
        }],
        metrics: ComparisonMetrics {
            mape: 2.6,
            rmse: 2.0,
            mae: 2.0,
            smape: 2.5,
            mase: 0.8,
            bias: 2.0,
            r2: 0.91,
        },
        quality_assessment: QualityAssessment {
            overall: "excellent".to_string(),
        },
    };
    let mut h = harness(MockBackend {
        comparison: Some(comparison),
        ..Default::default()
    });

    let dir = tempfile::tempdir().unwrap();
    let csv = csv_fixture(&dir);
    assert!(h.orch.compare(&csv, "s1", Some("2024-01-01"), None).await.unwrap());

    let held = h.orch.state().comparison.as_ref().unwrap();
    assert_eq!(held.quality_assessment.overall, "excellent");
    assert!(h.orch.state().status.as_ref().unwrap().contains("excellent"));
}

#[tokio::test]
async fn test_compare_fails_fast_without_inputs() {
    let mut h = harness(MockBackend::default());

    assert!(!h.orch.compare(std::path::Path::new("/missing.csv"), "s1", None, None).await.unwrap());
    let dir = tempfile::tempdir().unwrap();
    let csv = csv_fixture(&dir);
    assert!(!h.orch.compare(&csv, "", None, None).await.unwrap());

    assert!(h.backend.calls().is_empty());
}
