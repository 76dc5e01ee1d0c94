// SPDX-License-Identifier: MIT

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::adk::error::Result;
use crate::nourish::workflow::state::{HealthData, UserProfile};
use crate::nourish::workflow::{SharedState, WorkflowEngine};

const MISSING_JOURNAL: &str = "Missing journal_entry in request body";

/// Shared by every request; the engine is immutable
#[derive(Clone)]
pub struct AppState {
    engine: Arc<WorkflowEngine>,
}

/// Build the router; static files are served as the fallback when a
/// directory is given
pub fn app(engine: Arc<WorkflowEngine>, static_dir: Option<PathBuf>) -> Router {
    let router = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/analyze", post(analyze))
        .route("/api/analyze/stream", post(analyze_stream))
        .with_state(AppState { engine });

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn serve(
    engine: Arc<WorkflowEngine>,
    port: u16,
    static_dir: Option<PathBuf>,
) -> Result<()> {
    let app = app(engine, static_dir);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    log::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "Nutrition Assistant API"
    }))
}

/// Turn a request body into the initial state, or a 400 message
fn parse_request(body: &[u8]) -> std::result::Result<SharedState, String> {
    let payload: Value = serde_json::from_slice(body).map_err(|_| MISSING_JOURNAL.to_string())?;
    let journal = payload
        .get("journal_entry")
        .and_then(Value::as_str)
        .ok_or_else(|| MISSING_JOURNAL.to_string())?;

    let mut state = SharedState::for_journal(journal);
    if let Some(profile) = payload.get("user_profile").filter(|v| !v.is_null()) {
        let profile: UserProfile = serde_json::from_value(profile.clone())
            .map_err(|e| format!("Invalid user_profile: {}", e))?;
        state = state.with_profile(profile);
    }
    if let Some(health) = payload.get("health_data").filter(|v| !v.is_null()) {
        let health: HealthData = serde_json::from_value(health.clone())
            .map_err(|e| format!("Invalid health_data: {}", e))?;
        state = state.with_health(health);
    }
    Ok(state)
}

fn results_body(state: &SharedState) -> Value {
    json!({
        "success": true,
        "results": {
            "user_profile": state.user_profile(),
            "detected_triggers": state.detected_triggers(),
            "final_plan": state.final_plan().unwrap_or(""),
            "complete_response": state.last_message().content,
        }
    })
}

fn error_body(message: String) -> Value {
    json!({ "success": false, "error": message })
}

async fn analyze(State(app): State<AppState>, body: Bytes) -> (StatusCode, Json<Value>) {
    let state = match parse_request(&body) {
        Ok(state) => state,
        Err(message) => {
            log::warn!("Rejected analyze request: {}", message);
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": message })));
        }
    };

    log::info!("Processing journal entry via API");
    match app.engine.invoke(state).await {
        Ok(result) => (StatusCode::OK, Json(results_body(&result))),
        Err(e) => {
            log::error!("Error processing request: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(error_body(e.to_string())),
            )
        }
    }
}

fn to_sse<T: serde::Serialize>(name: &str, data: &T) -> Event {
    Event::default()
        .event(name)
        .json_data(data)
        .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
}

async fn analyze_stream(State(app): State<AppState>, body: Bytes) -> Response {
    let state = match parse_request(&body) {
        Ok(state) => state,
        Err(message) => {
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response();
        }
    };

    let (tx, rx) = mpsc::channel::<Event>(100);

    tokio::spawn(async move {
        log::info!("Starting streaming analysis");
        let (event_tx, mut event_rx) = mpsc::channel(100);

        let run = app.engine.invoke_traced(state, Some(event_tx));
        let forward = async {
            while let Some(event) = event_rx.recv().await {
                let _ = tx.send(to_sse("workflow", &event)).await;
            }
        };
        let (result, _) = tokio::join!(run, forward);

        let body = match result {
            Ok((state, execution)) => {
                let mut body = results_body(&state);
                body["execution"] = json!(execution);
                body
            }
            Err(e) => {
                log::error!("Streaming analysis failed: {}", e);
                error_body(e.to_string())
            }
        };
        let _ = tx.send(to_sse("result", &body)).await;
    });

    event_stream(rx).into_response()
}

fn event_stream(
    rx: mpsc::Receiver<Event>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let stream = ReceiverStream::new(rx).map(Ok::<_, Infallible>);
    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_wraps_journal() {
        let state = parse_request(br#"{"journal_entry": "Tired today"}"#).unwrap();
        assert_eq!(state.last_message().content, "Here is my journal: Tired today");
        assert_eq!(state.journal_entry(), "Tired today");
        assert_eq!(state.user_profile(), &UserProfile::default());
    }

    #[test]
    fn test_parse_request_reads_profile_and_health() {
        let state = parse_request(
            br#"{
                "journal_entry": "x",
                "user_profile": {"name": "Alex", "diet": "Low Carb", "allergies": ["Peanuts"]},
                "health_data": {"glucose_trend": "Spiking", "energy_level": "Low"}
            }"#,
        )
        .unwrap();
        assert_eq!(state.user_profile().name, "Alex");
        assert_eq!(state.user_profile().allergies, vec!["Peanuts"]);
        assert_eq!(state.health_data().glucose_trend, "Spiking");
    }

    #[test]
    fn test_parse_request_rejects_missing_journal() {
        assert_eq!(parse_request(b"{}").unwrap_err(), MISSING_JOURNAL);
        assert_eq!(parse_request(b"not json").unwrap_err(), MISSING_JOURNAL);
        assert_eq!(parse_request(b"[1]").unwrap_err(), MISSING_JOURNAL);
    }

    #[test]
    fn test_parse_request_rejects_bad_profile() {
        let err = parse_request(br#"{"journal_entry": "x", "user_profile": "Alex"}"#).unwrap_err();
        assert!(err.starts_with("Invalid user_profile"));
    }

    #[test]
    fn test_results_body_empty_plan() {
        let state = SharedState::for_journal("x");
        let body = results_body(&state);
        assert_eq!(body["success"], true);
        assert_eq!(body["results"]["final_plan"], "");
        assert_eq!(
            body["results"]["complete_response"],
            "Here is my journal: x"
        );
    }
}
