// Presentation layer - HTTP routes
pub mod app_state;
pub mod handlers;

use crate::presentation::app_state::AppState;
use crate::presentation::handlers::*;
use axum::{
    Router,
    routing::{delete, get, patch, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the HTTP router.
///
/// Compression is handled in the response builders, so no CompressionLayer
/// is stacked on top.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/summary", get(summary))
        .route("/devices", get(list_devices).post(add_device))
        .route("/devices/stream", get(device_stream))
        .route("/devices/command", post(bulk_command))
        .route("/devices/:id", get(get_device).delete(remove_device))
        .route("/devices/:id/command", post(device_command))
        .route("/devices/:id/toggle", post(toggle_device))
        .route("/analytics", get(analytics))
        .route("/insights", get(list_insights))
        .route("/insights/:id", delete(dismiss_insight))
        .route("/preferences", get(get_preferences).patch(update_preferences))
        .route("/preferences/thresholds", patch(update_thresholds))
        .route("/assistant", get(quick_questions).post(chat))
        .route("/notifications", post(send_notification))
        .route("/export", get(export))
        .route("/data", delete(clear_data))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::energy_service::EnergyService;
    use crate::application::monitor::Monitor;
    use crate::application::telemetry_service::TelemetryService;
    use crate::domain::device::default_catalog;
    use crate::domain::energy::Tariff;
    use crate::infrastructure::log_notifier::LogNotifier;
    use crate::infrastructure::simulated_gateway::SimulatedGateway;
    use crate::infrastructure::store::MemoryStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    async fn app() -> (Router, Monitor) {
        let gateway = Arc::new(SimulatedGateway::with_seed(default_catalog(), Duration::from_secs(5), 11));
        let monitor = Monitor::new(
            TelemetryService::new(gateway),
            EnergyService::new(Arc::new(MemoryStore::new()), Tariff::default()),
            Arc::new(LogNotifier),
        );
        monitor.telemetry().tick().await;
        monitor.refresh().await;
        let router = router(Arc::new(AppState {
            monitor: monitor.clone(),
        }));
        (router, monitor)
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let (router, _) = app().await;
        let (status, body) = send(&router, get_request("/healthz")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"ok");
    }

    #[tokio::test]
    async fn test_summary_lists_every_device() {
        let (router, _) = app().await;
        let (status, body) = send(&router, get_request("/summary")).await;
        assert_eq!(status, StatusCode::OK);

        let summary: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(summary["devices"].as_array().unwrap().len(), 5);
        assert_eq!(summary["current"]["total_devices"], 5);
    }

    #[tokio::test]
    async fn test_unknown_device_is_not_found() {
        let (router, _) = app().await;
        let (status, _) = send(&router, get_request("/devices/missing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &router,
            json_request("POST", "/devices/missing/command", serde_json::json!({"command": "ON"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, br#"{"success":false}"#);
    }

    #[tokio::test]
    async fn test_command_updates_device() {
        let (router, monitor) = app().await;
        let id = monitor.telemetry().readings().await[0].id.clone();

        let (status, _) = send(
            &router,
            json_request("POST", &format!("/devices/{}/command", id), serde_json::json!({"command": "OFF"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(!monitor.telemetry().reading(&id).await.unwrap().is_on);
    }

    #[tokio::test]
    async fn test_add_and_remove_device() {
        let (router, monitor) = app().await;
        let (status, body) = send(
            &router,
            json_request("POST", "/devices", serde_json::json!({"name": "Heater", "type": "climate"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = serde_json::from_slice::<Value>(&body).unwrap()["id"].as_str().unwrap().to_string();
        assert!(monitor.telemetry().reading(&id).await.is_some());

        let request = Request::builder()
            .method("DELETE")
            .uri(format!("/devices/{}", id))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&router, request).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(monitor.telemetry().reading(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_assistant_rejects_blank_message() {
        let (router, _) = app().await;
        let (status, _) = send(&router, json_request("POST", "/assistant", serde_json::json!({"message": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &router,
            json_request("POST", "/assistant", serde_json::json!({"message": "How can I save money?"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let reply: Value = serde_json::from_slice(&body).unwrap();
        assert!(!reply["text"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_quick_questions() {
        let (router, _) = app().await;
        let (status, body) = send(&router, get_request("/assistant")).await;
        assert_eq!(status, StatusCode::OK);

        let questions: Vec<String> = serde_json::from_slice(&body).unwrap();
        assert_eq!(questions.len(), 6);
        assert_eq!(questions[0], "Which device consumes the most energy?");
    }

    #[tokio::test]
    async fn test_thresholds_patch() {
        let (router, _) = app().await;
        let (status, body) = send(
            &router,
            json_request("PATCH", "/preferences/thresholds", serde_json::json!({"max_daily_cost": 3.5})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let preferences: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(preferences["thresholds"]["max_daily_cost"], 3.5);
    }

    #[tokio::test]
    async fn test_csv_export() {
        let (router, _) = app().await;
        let response = router.clone().oneshot(get_request("/export?format=csv")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.starts_with("Timestamp,Total Power,Total Energy,Total Cost,Online Devices"));
        assert_eq!(text.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_analytics_and_clear() {
        let (router, _) = app().await;
        let (status, body) = send(&router, get_request("/analytics")).await;
        assert_eq!(status, StatusCode::OK);
        let analytics: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(analytics["history"]["hourly"].as_array().unwrap().len(), 1);
        assert_eq!(analytics["energy_trend"]["hour"], 0.0);

        let request = Request::builder().method("DELETE").uri("/data").body(Body::empty()).unwrap();
        let (status, _) = send(&router, request).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = send(&router, get_request("/analytics")).await;
        let analytics: Value = serde_json::from_slice(&body).unwrap();
        assert!(analytics["history"]["hourly"].as_array().unwrap().is_empty());
        assert_eq!(analytics["peak_usage_time"], "N/A");
    }
}
