mod config;
mod render;
mod wallets;

use axum::{
    Form, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, Redirect},
    routing::{get, post},
};
use sd_dashboard::{ActionError, DashboardController};
use sd_history::GraphQlHistoryClient;
use sd_types::{ActionReceipt, ConnectStrategy, DashboardSnapshot, WriteAction};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::wallets::ContractWallets;

#[derive(Debug, Serialize)]
struct HealthResponse {
    service: &'static str,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct VersionResponse {
    service: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Default, Deserialize)]
struct AmountForm {
    #[serde(default)]
    amount: Option<String>,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

#[derive(Clone)]
struct AppState {
    controller: DashboardController,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env()?;
    let wallets = ContractWallets::from_config(&config)?;
    let history = GraphQlHistoryClient::new(&config.subgraph_url, config.history_query.clone());
    let controller = DashboardController::new(
        Arc::new(wallets),
        Arc::new(history),
        config.controller.clone(),
    );

    let app = router(AppState { controller });

    info!("dashboard-service listening on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/api/dashboard", get(dashboard))
        .route("/connect/{strategy}", post(connect))
        .route("/stake/{action}", post(stake_form))
        .route("/api/stake/{action}", post(stake_api))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        service: "dashboard-service",
        status: "ok",
    })
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        service: "dashboard-service",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn index(State(state): State<AppState>) -> Html<String> {
    let view = state.controller.view().await;
    Html(render::page(&view, state.controller.options()))
}

async fn dashboard(State(state): State<AppState>) -> Json<DashboardSnapshot> {
    Json(state.controller.view().await)
}

/// Activation runs in the background; the page polls the view until it lands.
async fn connect(
    State(state): State<AppState>,
    Path(strategy): Path<String>,
) -> Result<Redirect, (StatusCode, Json<ErrorResponse>)> {
    let strategy: ConnectStrategy = strategy.parse().map_err(|err: String| bad_request(&err))?;

    let controller = state.controller.clone();
    tokio::spawn(async move {
        // The read batch keeps running once its handle drops.
        if let Err(err) = controller.connect(strategy).await {
            debug!(%strategy, "background connect ended: {err}");
        }
    });

    Ok(Redirect::to("/"))
}

async fn stake_form(
    State(state): State<AppState>,
    Path(action): Path<String>,
    Form(form): Form<AmountForm>,
) -> Result<Redirect, (StatusCode, Json<ErrorResponse>)> {
    let action = parse_action(&action)?;
    if let Err(err) = state.controller.run(action, form.amount.as_deref()).await {
        debug!(%action, "form action ended: {err}");
    }
    Ok(Redirect::to("/"))
}

async fn stake_api(
    State(state): State<AppState>,
    Path(action): Path<String>,
    body: Option<Json<AmountForm>>,
) -> ApiResult<ActionReceipt> {
    let action = parse_action(&action)?;
    let form = body.map(|Json(form)| form).unwrap_or_default();

    match state.controller.run(action, form.amount.as_deref()).await {
        Ok(receipt) => Ok(Json(receipt)),
        Err(err @ (ActionError::NotConnected | ActionError::InvalidAmount { .. })) => {
            Err(bad_request(&err.to_string()))
        }
        Err(err) => Err(bad_gateway(err)),
    }
}

fn parse_action(action: &str) -> Result<WriteAction, (StatusCode, Json<ErrorResponse>)> {
    match action {
        "approve" => Ok(WriteAction::Approve),
        "deposit" => Ok(WriteAction::Deposit),
        "withdraw" => Ok(WriteAction::Withdraw),
        "harvest" => Ok(WriteAction::Harvest),
        other => Err(bad_request(&format!("unknown stake action: {other}"))),
    }
}

fn bad_request(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_owned(),
        }),
    )
}

fn bad_gateway(err: impl std::fmt::Display) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_GATEWAY,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}
