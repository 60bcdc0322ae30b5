//! HttpControlApi against an in-process axum stub of the timer service.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use countdown_client::{ClientError, ControlApi, HttpControlApi};
use countdown_core::models::{ProjectId, TimerDraft, TimerId};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

#[derive(Debug, Clone)]
struct StubTimer {
    id: u64,
    name: String,
    description: String,
    duration: u64,
    remaining_seconds: u64,
    paused: bool,
}

impl StubTimer {
    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "description": self.description,
            "duration": self.duration,
            "remaining_seconds": self.remaining_seconds,
            "paused": self.paused,
        })
    }
}

#[derive(Debug, Default)]
struct Stub {
    timers: Vec<StubTimer>,
    selected: Option<u64>,
    next_id: u64,
    requests: Vec<String>,
}

type Shared = Arc<Mutex<Stub>>;

fn not_found(body: Value) -> Response {
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}

fn timer_missing() -> Response {
    not_found(json!({"error": "Timer not found"}))
}

async fn get_project(State(stub): State<Shared>, Path(project_id): Path<u64>) -> Response {
    let mut stub = stub.lock().unwrap();
    stub.requests.push(format!("GET project {}", project_id));
    let timers: Vec<Value> = stub.timers.iter().map(StubTimer::to_json).collect();
    Json(json!({
        "id": project_id,
        "name": "Conference",
        "description": null,
        "selected_timer_id": stub.selected,
        "timers": timers,
    }))
    .into_response()
}

async fn get_timer(State(stub): State<Shared>, Path((_, timer_id)): Path<(u64, u64)>) -> Response {
    let stub = stub.lock().unwrap();
    match stub.timers.iter().find(|t| t.id == timer_id) {
        Some(timer) => Json(timer.to_json()).into_response(),
        None => timer_missing(),
    }
}

async fn get_selected(State(stub): State<Shared>, Path(_): Path<u64>) -> Response {
    let stub = stub.lock().unwrap();
    let selected = stub
        .selected
        .and_then(|id| stub.timers.iter().find(|t| t.id == id));
    match selected {
        Some(timer) => Json(timer.to_json()).into_response(),
        None => not_found(json!({"message": "No timer selected for this project"})),
    }
}

async fn create_timer(
    State(stub): State<Shared>,
    Path(_): Path<u64>,
    Json(body): Json<Value>,
) -> Response {
    let (Some(name), Some(duration)) = (body["name"].as_str(), body["duration"].as_u64()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Timer name and duration required"})),
        )
            .into_response();
    };

    let mut stub = stub.lock().unwrap();
    stub.next_id += 1;
    let timer = StubTimer {
        id: stub.next_id,
        name: name.to_string(),
        description: body["description"].as_str().unwrap_or_default().to_string(),
        duration,
        remaining_seconds: duration,
        paused: true,
    };
    stub.timers.push(timer.clone());
    (StatusCode::CREATED, Json(timer.to_json())).into_response()
}

async fn update_timer(
    State(stub): State<Shared>,
    Path((_, timer_id)): Path<(u64, u64)>,
    Json(body): Json<Value>,
) -> Response {
    let mut stub = stub.lock().unwrap();
    let Some(timer) = stub.timers.iter_mut().find(|t| t.id == timer_id) else {
        return timer_missing();
    };
    timer.name = body["name"].as_str().unwrap_or_default().to_string();
    timer.description = body["description"].as_str().unwrap_or_default().to_string();
    timer.duration = body["duration"].as_u64().unwrap_or(timer.duration);
    timer.remaining_seconds = timer.duration;
    Json(timer.to_json()).into_response()
}

async fn delete_timer(State(stub): State<Shared>, Path((_, timer_id)): Path<(u64, u64)>) -> Response {
    let mut stub = stub.lock().unwrap();
    let before = stub.timers.len();
    stub.timers.retain(|t| t.id != timer_id);
    if stub.timers.len() == before {
        return timer_missing();
    }
    if stub.selected == Some(timer_id) {
        stub.selected = None;
    }
    Json(json!({"message": "Timer deleted"})).into_response()
}

async fn command(
    State(stub): State<Shared>,
    Path((_, timer_id, action)): Path<(u64, u64, String)>,
) -> Response {
    let mut stub = stub.lock().unwrap();
    stub.requests.push(format!("{} {}", action, timer_id));
    let Some(timer) = stub.timers.iter_mut().find(|t| t.id == timer_id) else {
        return timer_missing();
    };
    match action.as_str() {
        "start" => timer.paused = false,
        "pause" => timer.paused = true,
        "reset" => {
            timer.paused = true;
            timer.remaining_seconds = timer.duration;
        }
        _ => return (StatusCode::BAD_REQUEST, "unknown action").into_response(),
    }
    Json(timer.to_json()).into_response()
}

async fn select_timer(State(stub): State<Shared>, Path((_, timer_id)): Path<(u64, u64)>) -> Response {
    let mut stub = stub.lock().unwrap();
    if !stub.timers.iter().any(|t| t.id == timer_id) {
        return timer_missing();
    }
    stub.selected = Some(timer_id);
    Json(json!({"message": "Timer selected"})).into_response()
}

async fn deselect_timer(State(stub): State<Shared>, Path(_): Path<u64>) -> Response {
    stub.lock().unwrap().selected = None;
    Json(json!({"message": "Timer deselected"})).into_response()
}

async fn broken() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>").into_response()
}

async fn serve(stub: Shared) -> String {
    let app = Router::new()
        .route("/api/projects/:project_id", get(get_project))
        .route("/api/projects/:project_id/selected-timer", get(get_selected))
        .route("/api/projects/:project_id/timers", post(create_timer))
        .route(
            "/api/projects/:project_id/timers/:timer_id",
            put(update_timer).get(get_timer).delete(delete_timer),
        )
        .route(
            "/api/projects/:project_id/timers/:timer_id/:action",
            post(command),
        )
        .route(
            "/api/projects/:project_id/select-timer/:timer_id",
            post(select_timer),
        )
        .route("/api/projects/:project_id/deselect-timer", post(deselect_timer))
        .with_state(stub);

    serve_router(app).await
}

async fn serve_router(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

fn seeded() -> Shared {
    Arc::new(Mutex::new(Stub {
        timers: vec![
            StubTimer {
                id: 1,
                name: "Keynote".to_string(),
                description: "Main hall".to_string(),
                duration: 3600,
                remaining_seconds: 1800,
                paused: false,
            },
            StubTimer {
                id: 2,
                name: "Q&A".to_string(),
                description: String::new(),
                duration: 600,
                remaining_seconds: 600,
                paused: true,
            },
        ],
        selected: None,
        next_id: 2,
        requests: Vec::new(),
    }))
}

#[tokio::test]
async fn test_get_project_with_numeric_ids() {
    let stub = seeded();
    let api = HttpControlApi::new(serve(stub.clone()).await);

    let project = api.get_project(&ProjectId::from(1)).await.unwrap();
    assert_eq!(project.id, ProjectId::from(1));
    assert_eq!(project.timers.len(), 2);
    assert_eq!(project.timers[0].id, TimerId::from(1));
    assert_eq!(project.timers[0].remaining_seconds, 1800);
    assert!(project.timers[0].is_running());
    assert_eq!(project.selection.selected_timer_id, None);
}

#[tokio::test]
async fn test_selected_timer_not_found_carries_message() {
    let api = HttpControlApi::new(serve(seeded()).await);

    let err = api.get_selected_timer(&ProjectId::from(1)).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(
        err.not_found_message(),
        Some("No timer selected for this project")
    );
}

#[tokio::test]
async fn test_select_then_get_selected() {
    let stub = seeded();
    let api = HttpControlApi::new(serve(stub.clone()).await);
    let project = ProjectId::from(1);

    api.select_timer(&project, &TimerId::from(2)).await.unwrap();
    let selected = api.get_selected_timer(&project).await.unwrap();
    assert_eq!(selected.id, TimerId::from(2));
    assert_eq!(selected.name.as_deref(), Some("Q&A"));

    api.deselect_timer(&project).await.unwrap();
    assert!(api.get_selected_timer(&project).await.is_err());
}

#[tokio::test]
async fn test_control_commands() {
    let stub = seeded();
    let api = HttpControlApi::new(serve(stub.clone()).await);
    let project = ProjectId::from(1);
    let timer = TimerId::from(2);

    api.start_timer(&project, &timer).await.unwrap();
    assert_eq!(api.get_timer(&project, &timer).await.unwrap().paused, Some(false));

    api.pause_timer(&project, &timer).await.unwrap();
    api.reset_timer(&project, &timer).await.unwrap();

    let requests = stub.lock().unwrap().requests.clone();
    assert_eq!(requests, vec!["start 2", "pause 2", "reset 2"]);
}

#[tokio::test]
async fn test_create_update_delete() {
    let stub = seeded();
    let api = HttpControlApi::new(serve(stub.clone()).await);
    let project = ProjectId::from(1);

    let draft = TimerDraft::from_input("Break", "Coffee", "15m").unwrap();
    let created = api.create_timer(&project, &draft).await.unwrap();
    assert_eq!(created.id, TimerId::from(3));
    assert_eq!(created.duration, 900);
    assert_eq!(created.description, "Coffee");

    let draft = TimerDraft::from_input("Long break", "", "20m").unwrap();
    let updated = api.update_timer(&project, &created.id, &draft).await.unwrap();
    assert_eq!(updated.name.as_deref(), Some("Long break"));
    assert_eq!(updated.remaining_seconds, Some(1200));

    api.delete_timer(&project, &created.id).await.unwrap();
    let err = api.get_timer(&project, &created.id).await.unwrap_err();
    assert_eq!(err.not_found_message(), Some("Timer not found"));
}

#[tokio::test]
async fn test_non_json_error_uses_status_reason() {
    let app = Router::new().route("/api/projects/:project_id", get(broken));
    let api = HttpControlApi::new(serve_router(app).await);

    match api.get_project(&ProjectId::from(1)).await {
        Err(ClientError::Status { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "Internal Server Error");
        }
        other => panic!("expected status error, got {:?}", other.map(|p| p.id)),
    }
}
