//! HTTP façade over the Session Controller.
//!
//! Handlers never touch the plotter themselves: each one forwards to the
//! controller on the blocking pool and maps the result onto the wire types in
//! [`crate::api`].

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{info, warn};

use crate::api::{
    Ack, CmdRequest, ConfigRequest, Failure, HomeQuery, LayerSpec, PlotRequest, ProfileInfo,
};
use crate::config::PlotctlConfig;
use crate::device::sim::SimulatedFactory;
use crate::device::{DriverFactory, PenParams};
use crate::error::{DriverError, SessionError};
use crate::profile::ProfileKind;
use crate::session::{ControllerSettings, SessionController, SessionState};
use crate::signal::interrupt_bridge;

#[derive(Clone)]
pub struct AppState {
    controller: SessionController,
    /// Applied to plot requests that leave pen settings out.
    pen_defaults: PenParams,
}

impl AppState {
    pub fn new(controller: SessionController, pen_defaults: PenParams) -> Self {
        Self {
            controller,
            pen_defaults,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/state", get(get_state))
        .route("/config", get(get_config).post(set_config))
        .route("/connect", post(connect))
        .route("/disconnect", post(disconnect))
        .route("/cmd", post(command))
        .route("/plot", post(plot))
        .route("/resume", post(resume))
        .route("/home", post(home))
        .with_state(state)
}

/// A controller error on its way to the wire.
struct ApiError(SessionError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let failure = Failure::from(&self.0);
        let status = if failure.kind.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(failure)).into_response()
    }
}

/// Runs a controller operation on the blocking pool.
async fn blocking<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&SessionController) -> Result<T, SessionError> + Send + 'static,
    T: Send + 'static,
{
    let controller = state.controller.clone();
    tokio::task::spawn_blocking(move || op(&controller))
        .await
        .map_err(|err| {
            ApiError(SessionError::HardwareFailure(DriverError::Sdk(format!(
                "controller task failed: {err}"
            ))))
        })?
        .map_err(ApiError)
}

async fn get_state(State(state): State<AppState>) -> Result<Json<SessionState>, ApiError> {
    blocking(&state, |controller| Ok(controller.state())).await.map(Json)
}

async fn get_config(State(state): State<AppState>) -> Result<Json<ProfileInfo>, ApiError> {
    blocking(&state, |controller| {
        let profile = controller.profile();
        Ok(ProfileInfo {
            plotter_type: profile.kind,
            profile,
            nextdraw_available: controller.nextdraw_available(),
        })
    })
    .await
    .map(Json)
}

async fn set_config(
    State(state): State<AppState>,
    Json(req): Json<ConfigRequest>,
) -> Result<Json<Ack>, ApiError> {
    let message =
        blocking(&state, move |controller| controller.set_profile(&req.plotter_type)).await?;
    Ok(Json(Ack::new(message)))
}

async fn connect(State(state): State<AppState>) -> Result<Json<Ack>, ApiError> {
    let message = blocking(&state, |controller| controller.connect()).await?;
    Ok(Json(Ack::new(message)))
}

async fn disconnect(State(state): State<AppState>) -> Result<Json<Ack>, ApiError> {
    let message = blocking(&state, |controller| controller.disconnect()).await?;
    Ok(Json(Ack::new(message)))
}

async fn command(
    State(state): State<AppState>,
    Json(req): Json<CmdRequest>,
) -> Result<Json<Ack>, ApiError> {
    let message = blocking(&state, move |controller| controller.jog(&req.command)).await?;
    Ok(Json(Ack::new(message)))
}

async fn plot(
    State(state): State<AppState>,
    Json(req): Json<PlotRequest>,
) -> Result<Json<Ack>, ApiError> {
    let pen = req.settings.resolve(state.pen_defaults);
    let layers = LayerSpec::selector(req.layer);
    let job_id = blocking(&state, move |controller| {
        controller.submit_plot(&req.svg, layers, pen)
    })
    .await?;
    Ok(Json(Ack::job("Plot started", job_id)))
}

async fn resume(State(state): State<AppState>) -> Result<Json<Ack>, ApiError> {
    let job_id = blocking(&state, |controller| controller.resume()).await?;
    Ok(Json(Ack::job("Resuming plot", job_id)))
}

async fn home(
    State(state): State<AppState>,
    Query(query): Query<HomeQuery>,
) -> Result<Json<Ack>, ApiError> {
    let message = blocking(&state, move |controller| {
        if query.from_pause {
            controller.return_home_from_pause()
        } else {
            controller.go_home()
        }
    })
    .await?;
    Ok(Json(Ack::new(message)))
}

/// Runs the façade against the simulated plotter until Ctrl+C with no job
/// active.
pub async fn serve(config: &PlotctlConfig) -> Result<()> {
    let factory = SimulatedFactory::new(config.simulator_settings());
    let profile = if factory.is_available(config.profile) {
        config.profile
    } else {
        warn!(
            "{} library is not installed; starting with {}",
            config.profile.display_name(),
            ProfileKind::AxiDraw.display_name()
        );
        ProfileKind::AxiDraw
    };
    let controller = SessionController::new(
        Arc::new(factory),
        ControllerSettings {
            profile,
            watchdog: config.watchdog(),
        },
    );

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    info!(
        profile = %profile,
        "plotctl listening on http://{}",
        listener.local_addr()?
    );

    let app = router(AppState::new(controller.clone(), config.pen));
    axum::serve(listener, app)
        .with_graceful_shutdown(interrupt_bridge(controller.clone()))
        .await
        .context("serving HTTP")?;

    if controller.is_job_running() {
        info!("waiting for the running plot to finish");
        controller.wait_for_idle().await;
    }
    tokio::task::spawn_blocking(move || match controller.disconnect() {
        Ok(message) => info!("{message}"),
        Err(SessionError::NotConnected) => {}
        Err(err) => warn!("disconnect on shutdown failed: {err}"),
    })
    .await?;
    info!("plotctl stopped");
    Ok(())
}
