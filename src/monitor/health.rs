//! Liveness endpoints for the bot process
//!
//! Hosting platforms that expect a web service poll these.

use axum::{extract::State, response::Json, routing::get, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

pub const SERVICE_NAME: &str = "Discord PayPal Bot";

pub struct HealthState {
    started: Instant,
}

impl HealthState {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
struct ServiceStatus {
    status: &'static str,
    service: &'static str,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct UptimeStatus {
    status: &'static str,
    uptime: f64,
    timestamp: DateTime<Utc>,
}

async fn root() -> Json<ServiceStatus> {
    Json(ServiceStatus {
        status: "healthy",
        service: SERVICE_NAME,
        timestamp: Utc::now(),
    })
}

async fn health_check(State(state): State<Arc<HealthState>>) -> Json<UptimeStatus> {
    Json(UptimeStatus {
        status: "healthy",
        uptime: state.uptime_secs(),
        timestamp: Utc::now(),
    })
}

pub fn create_router(state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .with_state(state)
}

pub async fn start_health_server(
    state: Arc<HealthState>,
    host: &str,
    port: u16,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = create_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("🌐 Web server listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn get_json(path: &str) -> (StatusCode, serde_json::Value) {
        let app = create_router(Arc::new(HealthState::new()));
        let response = app
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_root_reports_service() {
        let (status, json) = get_json("/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["service"], SERVICE_NAME);
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_health_reports_uptime() {
        let (status, json) = get_json("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert!(json["uptime"].as_f64().unwrap() >= 0.0);
    }
}
