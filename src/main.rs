//! CLI entry point for the HospiCast client.
//!
//! Provides subcommands for training the remote model, generating
//! forecasts, managing the hospital session, and comparing predictions
//! against observed values. Each invocation restores the persisted
//! session first, so the CLI behaves like a dashboard reload.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use hospicast::api::HttpBackend;
use hospicast::api::types::RegistrationRequest;
use hospicast::orchestrator::Orchestrator;
use hospicast::session::{FileStore, SessionManager};
use hospicast::state::Panel;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const DEFAULT_API_BASE: &str = "http://127.0.0.1:8001";
const DEFAULT_SESSION_FILE: &str = "hospicast_session.json";

#[derive(Parser)]
#[command(name = "hospicast")]
#[command(about = "Hospital demand forecasting client", long_about = None)]
struct Cli {
    /// Base URL of the forecasting service
    #[arg(long, global = true)]
    api_base: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a CSV of historical demand and train the model
    Train {
        /// Path to the CSV file (must have a `ds` date column)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Model identifier to train
        #[arg(short, long, default_value = "demanda_hospitalar")]
        series_id: String,
    },
    /// Generate a forecast for a city
    Predict {
        /// City name to search for (the best match is used)
        #[arg(short, long)]
        city: String,

        /// Model identifier to predict with
        #[arg(short, long, default_value = "demanda_hospitalar")]
        series_id: String,

        /// Days ahead to forecast (1-365)
        #[arg(long, default_value_t = 14)]
        horizon: u32,
    },
    /// Search for cities by name
    Cities {
        #[arg(value_name = "QUERY")]
        query: String,
    },
    /// Register a new hospital and receive a login code
    Register {
        #[arg(long)]
        name: String,

        /// CNES identifier, if the hospital has one
        #[arg(long)]
        cnes: Option<String>,

        #[arg(long)]
        city: Option<String>,

        /// Two-letter state code
        #[arg(long)]
        state: Option<String>,

        #[arg(long)]
        contact_email: Option<String>,

        /// Password for later logins (at least 6 characters)
        #[arg(long)]
        password: String,
    },
    /// Log in with a short code or hospital id
    Login {
        #[arg(value_name = "IDENTIFIER")]
        identifier: String,

        #[arg(long)]
        password: String,
    },
    /// End the current session and clear the persisted credentials
    Logout,
    /// List the forecast history of the authenticated hospital
    History,
    /// Compare stored predictions against a CSV of observed values
    Compare {
        /// Path to the CSV file with actuals
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(short, long, default_value = "demanda_hospitalar")]
        series_id: String,

        /// Restrict the comparison window (YYYY-MM-DD)
        #[arg(long)]
        start_date: Option<String>,

        #[arg(long)]
        end_date: Option<String>,
    },
    /// Show the current session, if any
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/hospicast.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("hospicast.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let api_base = cli
        .api_base
        .or_else(|| std::env::var("HOSPICAST_API_BASE_URL").ok())
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
    let session_path = std::env::var("HOSPICAST_SESSION_PATH")
        .unwrap_or_else(|_| DEFAULT_SESSION_FILE.to_string());

    let api = Arc::new(HttpBackend::new(&api_base)?);
    let sessions = SessionManager::new(Box::new(FileStore::new(&session_path)));
    let mut orch = Orchestrator::new(api, sessions);
    orch.restore_session()?;

    let ok = match cli.command {
        Commands::Train { file, series_id } => orch.train(&file, &series_id).await?,
        Commands::Predict {
            city,
            series_id,
            horizon,
        } => {
            if !orch.search_cities(&city).await? {
                report(&orch);
                std::process::exit(1);
            }
            let Some(best_match) = orch.state().city_results.first().cloned() else {
                info!(query = %city, "No city matched the query");
                std::process::exit(1);
            };
            info!(city = %best_match.name, state = %best_match.state, "City selected");
            orch.select_city(best_match);
            let ok = orch.predict(&series_id, horizon).await?;
            if ok {
                print_forecast(&orch);
            }
            ok
        }
        Commands::Cities { query } => {
            let ok = orch.search_cities(&query).await?;
            for city in &orch.state().city_results {
                info!(id = %city.id, name = %city.name, state = %city.state, region = %city.region, "City");
            }
            if orch.state().city_results.is_empty() {
                info!(query = %query, "No matching cities");
            }
            ok
        }
        Commands::Register {
            name,
            cnes,
            city,
            state,
            contact_email,
            password,
        } => {
            orch.register(RegistrationRequest {
                display_name: name,
                cnes,
                city,
                state,
                contact_email,
                password,
            })
            .await?
        }
        Commands::Login {
            identifier,
            password,
        } => {
            let ok = orch.login(&identifier, &password).await?;
            if ok {
                print_history(&orch);
            }
            ok
        }
        Commands::Logout => {
            orch.logout()?;
            true
        }
        Commands::History => {
            if !orch.is_authenticated() {
                info!("Not logged in; use `hospicast login` first");
                std::process::exit(1);
            }
            let ok = orch.refresh_history().await?;
            if ok {
                print_history(&orch);
            }
            ok
        }
        Commands::Compare {
            file,
            series_id,
            start_date,
            end_date,
        } => {
            orch.select_panel(Panel::Comparison);
            let ok = orch
                .compare(&file, &series_id, start_date.as_deref(), end_date.as_deref())
                .await?;
            if ok {
                print_comparison(&orch);
            }
            ok
        }
        Commands::Status => {
            match orch.state().session.as_ref() {
                Some(session) => info!(
                    hospital_id = %session.hospital_id,
                    display_name = %session.display_name,
                    short_code = %session.short_code,
                    expires_at = %session.expires_at,
                    "Session active"
                ),
                None => info!("No active session"),
            }
            true
        }
    };

    report(&orch);
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

/// Logs the last status line the orchestrator surfaced, if any.
fn report(orch: &Orchestrator) {
    if let Some(status) = &orch.state().status {
        info!("{status}");
    }
}

fn print_forecast(orch: &Orchestrator) {
    let state = orch.state();
    info!(
        points = state.forecast.len(),
        mean = ?state.mean_forecast(),
        risk = ?state.risk_level(),
        "Forecast summary"
    );
    for point in &state.forecast {
        info!(
            ds = %point.ds,
            yhat = point.yhat,
            yhat_lower = ?point.yhat_lower,
            yhat_upper = ?point.yhat_upper,
            "Forecast point"
        );
    }
    if let Some(insights) = &state.insights {
        for insight in &insights.insights {
            info!(kind = %insight.kind, impact = %insight.impact, title = %insight.title, "{}", insight.message);
        }
    }
}

fn print_history(orch: &Orchestrator) {
    let history = &orch.state().history;
    if history.is_empty() {
        info!("No saved forecasts yet");
        return;
    }
    for entry in history {
        info!(
            forecast_id = %entry.forecast_id,
            series_id = %entry.series_id,
            horizon = entry.horizon,
            created_at = %entry.created_at,
            average_yhat = ?entry.average_yhat,
            "Saved forecast"
        );
    }
}

fn print_comparison(orch: &Orchestrator) {
    let Some(result) = &orch.state().comparison else {
        return;
    };
    let m = &result.metrics;
    info!(
        mape = m.mape,
        rmse = m.rmse,
        mae = m.mae,
        smape = m.smape,
        mase = m.mase,
        bias = m.bias,
        r2 = m.r2,
        overall = %result.quality_assessment.overall,
        "Comparison metrics"
    );
    for point in &result.comparison_data {
        info!(
            ds = %point.ds,
            actual = point.actual,
            predicted = point.predicted,
            "Comparison point"
        );
    }
}
