// HTTP request handlers
use crate::domain::assistant::{self, AssistantReply};
use crate::domain::device::{DeviceCommand, DeviceReading, NewDevice};
use crate::domain::energy::EnergySnapshot;
use crate::domain::history::{HistoricalData, Period};
use crate::domain::insight::Insight;
use crate::domain::notification::NotificationRequest;
use crate::domain::preferences::{PreferencesPatch, ThresholdsPatch};
use crate::infrastructure::chunked_json::stream_from_receiver;
use crate::infrastructure::export::ExportFormat;
use crate::infrastructure::http_response::{accepts_brotli, body_response, json_response};
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_INSIGHT_LIMIT: usize = 10;

#[derive(Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
}

#[derive(Deserialize)]
pub struct CommandRequest {
    pub command: DeviceCommand,
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Serialize)]
pub struct Outcome {
    pub success: bool,
}

#[derive(Serialize)]
pub struct Created {
    pub id: String,
}

#[derive(Serialize)]
pub struct Summary {
    pub current: Option<EnergySnapshot>,
    pub devices: Vec<DeviceReading>,
    pub insights: Vec<Insight>,
}

#[derive(Serialize)]
pub struct Trends {
    pub hour: f64,
    pub day: f64,
    pub week: f64,
}

#[derive(Serialize)]
pub struct Predictions {
    pub next_hour: f64,
    pub next_day: f64,
    pub next_week: f64,
}

#[derive(Serialize)]
pub struct Analytics {
    pub history: HistoricalData,
    pub energy_trend: Trends,
    pub cost_trend: Trends,
    /// Local "HH:MM" of the hourly peak, or "N/A"
    pub peak_usage_time: String,
    pub average_daily_usage: f64,
    pub average_daily_cost: f64,
    pub predictions: Predictions,
}

async fn respond<T: Serialize>(headers: &HeaderMap, data: &T) -> Response {
    match json_response(data, accepts_brotli(headers)).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Home screen: latest snapshot, every device and the newest insights
pub async fn summary(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let energy = state.monitor.energy();
    let summary = Summary {
        current: energy.current().await,
        devices: state.monitor.telemetry().readings().await,
        insights: energy.recent_insights(DEFAULT_INSIGHT_LIMIT).await,
    };
    respond(&headers, &summary).await
}

pub async fn list_devices(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let devices = state.monitor.telemetry().readings().await;
    respond(&headers, &devices).await
}

pub async fn get_device(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.monitor.telemetry().reading(&id).await {
        Some(device) => respond(&headers, &device).await,
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub async fn add_device(State(state): State<Arc<AppState>>, Json(device): Json<NewDevice>) -> Response {
    match state.monitor.telemetry().add_device(device).await {
        Ok(id) => (StatusCode::CREATED, Json(Created { id })).into_response(),
        Err(e) => {
            tracing::error!("Error adding device: {}", e);
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}

pub async fn remove_device(Path(id): Path<String>, State(state): State<Arc<AppState>>) -> StatusCode {
    if state.monitor.telemetry().remove_device(&id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

pub async fn device_command(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<CommandRequest>,
) -> Json<Outcome> {
    let success = state.monitor.telemetry().send_command(&id, request.command).await;
    Json(Outcome { success })
}

pub async fn toggle_device(Path(id): Path<String>, State(state): State<Arc<AppState>>) -> Json<Outcome> {
    let success = state.monitor.toggle_device(&id).await;
    Json(Outcome { success })
}

pub async fn bulk_command(State(state): State<Arc<AppState>>, Json(request): Json<CommandRequest>) -> Json<Outcome> {
    let success = state.monitor.toggle_all(request.command.is_on()).await;
    Json(Outcome { success })
}

/// Live device updates as newline-delimited JSON
pub async fn device_stream(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    stream_from_receiver(state.monitor.feed())
}

pub async fn analytics(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let energy = state.monitor.energy();
    let peak_usage_time = energy
        .peak_usage_time()
        .await
        .map(|t| t.with_timezone(&Local).format("%H:%M").to_string())
        .unwrap_or_else(|| "N/A".to_string());

    let analytics = Analytics {
        history: energy.history().await,
        energy_trend: Trends {
            hour: energy.energy_trend(Period::Hour).await,
            day: energy.energy_trend(Period::Day).await,
            week: energy.energy_trend(Period::Week).await,
        },
        cost_trend: Trends {
            hour: energy.cost_trend(Period::Hour).await,
            day: energy.cost_trend(Period::Day).await,
            week: energy.cost_trend(Period::Week).await,
        },
        peak_usage_time,
        average_daily_usage: energy.average_daily_usage().await,
        average_daily_cost: energy.average_daily_cost().await,
        predictions: Predictions {
            next_hour: energy.predict_next_hour_usage().await,
            next_day: energy.predict_next_day_usage().await,
            next_week: energy.predict_next_week_usage().await,
        },
    };
    respond(&headers, &analytics).await
}

pub async fn list_insights(
    Query(query): Query<LimitQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let limit = query.limit.unwrap_or(DEFAULT_INSIGHT_LIMIT);
    let insights = state.monitor.energy().recent_insights(limit).await;
    respond(&headers, &insights).await
}

pub async fn dismiss_insight(Path(id): Path<String>, State(state): State<Arc<AppState>>) -> StatusCode {
    if state.monitor.energy().mark_insight_read(&id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

pub async fn get_preferences(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let preferences = state.monitor.energy().preferences().await;
    respond(&headers, &preferences).await
}

pub async fn update_preferences(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<PreferencesPatch>,
) -> impl IntoResponse {
    Json(state.monitor.energy().update_preferences(patch).await)
}

pub async fn update_thresholds(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<ThresholdsPatch>,
) -> impl IntoResponse {
    Json(state.monitor.energy().update_thresholds(patch).await)
}

pub async fn send_notification(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NotificationRequest>,
) -> Json<Outcome> {
    let success = state.monitor.send_notification(request).await;
    Json(Outcome { success })
}

/// Starter questions for the assistant
pub async fn quick_questions() -> Json<&'static [&'static str]> {
    Json(&assistant::QUICK_QUESTIONS[..])
}

pub async fn chat(Json(request): Json<ChatRequest>) -> Result<Json<AssistantReply>, StatusCode> {
    if request.message.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(Json(assistant::reply(&request.message, Utc::now())))
}

pub async fn export(
    Query(query): Query<ExportQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.monitor.energy().export(query.format).await {
        Ok(text) => match body_response(text.into_bytes(), query.format.content_type(), accepts_brotli(&headers)).await {
            Ok(response) => response,
            Err(status) => status.into_response(),
        },
        Err(e) => {
            tracing::error!("Error exporting data: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn clear_data(State(state): State<Arc<AppState>>) -> StatusCode {
    state.monitor.energy().clear_all().await;
    StatusCode::NO_CONTENT
}
