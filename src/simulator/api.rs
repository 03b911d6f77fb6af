//! REST API for the simulator web client

use super::{ScpiCalculator, ScpiInfo, ScpiType, SimulationRequest, SimulationResults};
use crate::config::SimulatorConfig;
use crate::error::BotError;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub const SERVICE_NAME: &str = "scpi-simulator";

#[derive(Debug)]
pub enum ApiError {
    /// Input rejected by business rules (400)
    Calculation(String),
    /// Malformed or out-of-range fields (422)
    Validation(String),
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
    #[serde(rename = "type")]
    kind: &'static str,
}

impl From<BotError> for ApiError {
    fn from(e: BotError) -> Self {
        if e.is_calculation_error() {
            ApiError::Calculation(e.to_string())
        } else {
            ApiError::Internal(e.to_string())
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail, kind) = match self {
            ApiError::Calculation(detail) => {
                (StatusCode::BAD_REQUEST, detail, "calculation_error")
            }
            ApiError::Validation(detail) => {
                (StatusCode::UNPROCESSABLE_ENTITY, detail, "validation_error")
            }
            ApiError::Internal(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal server error: {}", detail),
                "internal_error",
            ),
        };
        (status, Json(ErrorBody { detail, kind })).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ServiceStatus {
    status: &'static str,
    service: &'static str,
}

#[derive(Debug, Serialize)]
struct ValidationStatus {
    status: &'static str,
    message: &'static str,
}

async fn health() -> Json<ServiceStatus> {
    Json(ServiceStatus {
        status: "healthy",
        service: SERVICE_NAME,
    })
}

async fn list_scpis(State(calculator): State<Arc<ScpiCalculator>>) -> Json<Vec<ScpiInfo>> {
    Json(calculator.list())
}

async fn get_scpi_info(
    State(calculator): State<Arc<ScpiCalculator>>,
    Path(raw): Path<String>,
) -> Result<Json<ScpiInfo>, ApiError> {
    let scpi_type: ScpiType = raw
        .parse()
        .map_err(|e: BotError| ApiError::Validation(e.to_string()))?;
    Ok(Json(calculator.scpi_info(scpi_type)?))
}

async fn calculate(
    State(calculator): State<Arc<ScpiCalculator>>,
    payload: Result<Json<SimulationRequest>, JsonRejection>,
) -> Result<Json<SimulationResults>, ApiError> {
    let Json(request) = payload?;
    request.check_fields().map_err(ApiError::Validation)?;

    tracing::info!(
        "Calculating simulation for {} - {}€",
        request.scpi_type,
        request.investment_amount
    );

    match calculator.calculate(&request) {
        Ok(results) => {
            tracing::info!(
                "Simulation completed: {:.2}€ total return",
                results.total_return
            );
            Ok(Json(results))
        }
        Err(e) => {
            tracing::warn!("Simulation rejected: {}", e);
            Err(e.into())
        }
    }
}

async fn validate(
    State(calculator): State<Arc<ScpiCalculator>>,
    payload: Result<Json<SimulationRequest>, JsonRejection>,
) -> Result<Json<ValidationStatus>, ApiError> {
    let Json(request) = payload?;
    request.check_fields().map_err(ApiError::Validation)?;
    calculator.validate(&request)?;

    Ok(Json(ValidationStatus {
        status: "valid",
        message: "Parameters are valid",
    }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    // A wildcard cannot be combined with credentials
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter(|o| o.as_str() != "*")
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

pub fn create_router(calculator: Arc<ScpiCalculator>, config: &SimulatorConfig) -> Router {
    let api = Router::new()
        .route("/scpi/list", get(list_scpis))
        .route("/scpi/{scpi_type}", get(get_scpi_info))
        .route("/simulation/calculate", post(calculate))
        .route("/simulation/validate", post(validate));

    let mount = config.api_mount();
    let router = if mount.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(&mount, api)
    };

    router
        .route("/health", get(health))
        .with_state(calculator)
        .layer(cors_layer(&config.cors_origins()))
        .layer(TraceLayer::new_for_http())
}

pub async fn start_server(
    config: &SimulatorConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let calculator = Arc::new(ScpiCalculator::new(config));
    let app = create_router(calculator, config);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        "🏠 SCPI simulator listening on {} ({})",
        addr,
        config.environment
    );
    axum::serve(listener, app).await?;

    Ok(())
}
