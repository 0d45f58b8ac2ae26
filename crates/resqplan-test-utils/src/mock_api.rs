use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use uuid::Uuid;

use resqplan_store::{NewProject, ProjectRecord, ProjectSummary};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Mutable behavior and storage of the mock server.
#[derive(Default)]
pub struct MockApiState {
    projects: Mutex<BTreeMap<String, ProjectRecord>>,
    rejections: Mutex<HashSet<String>>,
    solution: Mutex<Option<Value>>,
    relaxed: Mutex<Vec<String>>,
    last_optimize: Mutex<Vec<String>>,
    failing_converts: AtomicUsize,
    convert_calls: AtomicUsize,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl MockApiState {
    /// Answer the next `n` converts with HTTP 500.
    pub fn fail_next_converts(&self, n: usize) {
        self.failing_converts.store(n, Ordering::SeqCst);
    }

    /// Answer `valid: false` for this text.
    pub fn reject(&self, text: &str) {
        lock(&self.rejections).insert(text.to_string());
    }

    /// Set the raw `solution` value returned by optimize (a map or a string).
    pub fn set_solution(&self, solution: Value) {
        *lock(&self.solution) = Some(solution);
    }

    /// Constraints reported as relaxed by optimize.
    pub fn set_relaxed(&self, relaxed: &[&str]) {
        *lock(&self.relaxed) = relaxed.iter().map(|s| s.to_string()).collect();
    }

    pub fn convert_calls(&self) -> usize {
        self.convert_calls.load(Ordering::SeqCst)
    }

    pub fn last_optimize(&self) -> Vec<String> {
        lock(&self.last_optimize).clone()
    }

    pub fn project(&self, id: &str) -> Option<ProjectRecord> {
        lock(&self.projects).get(id).cloned()
    }
}

type AppState = Arc<MockApiState>;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/translate", post(translate))
        .route("/api/convert", post(convert))
        .route("/api/optimize", post(optimize))
        .route("/api/edit_constraint", post(edit_constraint))
        .route("/api/delete_constraint", post(delete_constraint))
        .route("/api/view_constraint", post(view_constraint))
        .route("/api/projects", get(list_projects).post(create_project))
        .route(
            "/api/projects/{id}",
            get(get_project).put(update_project).delete(delete_project),
        )
        .with_state(state)
}

/// A running mock server bound to `127.0.0.1` on an ephemeral port.
pub struct MockApi {
    pub addr: SocketAddr,
    pub state: AppState,
    handle: JoinHandle<()>,
}

impl MockApi {
    pub async fn start() -> Self {
        let state: AppState = Arc::new(MockApiState::default());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock API");
        let addr = listener.local_addr().expect("mock API has no address");
        let app = build_router(Arc::clone(&state));
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for MockApi {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct TranslateBody {
    #[serde(default)]
    input_data: String,
}

async fn translate(Json(body): Json<TranslateBody>) -> Result<Json<Value>, AppError> {
    if body.input_data.trim().is_empty() {
        return Err(AppError::bad_request("No input data provided"));
    }
    Ok(Json(json!({
        "result": {
            "variables": { "context_length": body.input_data.len() },
            "detected_constraints": []
        }
    })))
}

#[derive(Deserialize)]
struct ConvertBody {
    #[serde(default)]
    constraint: String,
}

async fn convert(
    State(state): State<AppState>,
    Json(body): Json<ConvertBody>,
) -> Result<Json<Value>, AppError> {
    state.convert_calls.fetch_add(1, Ordering::SeqCst);
    let failing = state
        .failing_converts
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if failing {
        return Err(AppError::internal("injected failure"));
    }
    if body.constraint.trim().is_empty() {
        return Err(AppError::bad_request("No constraint provided"));
    }
    if lock(&state.rejections).contains(&body.constraint) {
        return Ok(Json(json!({
            "valid": false,
            "message": "constraint does not apply to this context"
        })));
    }
    Ok(Json(json!({
        "valid": true,
        "result": format!("# {}", body.constraint)
    })))
}

#[derive(Deserialize)]
struct OptimizeBody {
    #[serde(default)]
    active_constraints: Vec<String>,
}

async fn optimize(
    State(state): State<AppState>,
    Json(body): Json<OptimizeBody>,
) -> Json<Value> {
    *lock(&state.last_optimize) = body.active_constraints;
    let solution = lock(&state.solution).clone().unwrap_or_else(|| json!({}));
    Json(json!({
        "solution": solution,
        "relaxed_constraints": lock(&state.relaxed).clone()
    }))
}

#[derive(Deserialize)]
struct EditBody {
    old_nl: String,
    new_nl: String,
}

async fn edit_constraint(Json(body): Json<EditBody>) -> Json<Value> {
    if body.old_nl.trim().is_empty() || body.new_nl.trim().is_empty() {
        return Json(json!({ "success": false, "error": "empty constraint" }));
    }
    Json(json!({ "success": true }))
}

#[derive(Deserialize)]
struct NlBody {
    nl: String,
}

async fn delete_constraint(Json(_body): Json<NlBody>) -> Json<Value> {
    Json(json!({ "success": true }))
}

async fn view_constraint(Json(body): Json<NlBody>) -> Json<Value> {
    Json(json!({ "code": format!("# {}", body.nl) }))
}

async fn list_projects(State(state): State<AppState>) -> Json<Vec<ProjectSummary>> {
    let projects = lock(&state.projects);
    Json(projects.values().map(ProjectSummary::from).collect())
}

async fn create_project(
    State(state): State<AppState>,
    Json(body): Json<NewProject>,
) -> Json<ProjectRecord> {
    let record = ProjectRecord::new(Uuid::new_v4().to_string(), body);
    lock(&state.projects).insert(record.id.clone(), record.clone());
    Json(record)
}

async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProjectRecord>, AppError> {
    state
        .project(&id)
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("project {id} not found")))
}

async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(record): Json<ProjectRecord>,
) -> Result<Json<Value>, AppError> {
    if record.id != id {
        return Err(AppError::bad_request("id mismatch"));
    }
    let mut projects = lock(&state.projects);
    match projects.get_mut(&id) {
        Some(slot) => {
            *slot = record;
            Ok(Json(json!({ "success": true })))
        }
        None => Err(AppError::not_found(format!("project {id} not found"))),
    }
}

async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    match lock(&state.projects).remove(&id) {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err(AppError::not_found(format!("project {id} not found"))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;

    async fn post_json(state: AppState, uri: &str, body: Value) -> Response {
        build_router(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn convert_failure_injection_counts_down() {
        let state: AppState = Arc::new(MockApiState::default());
        state.fail_next_converts(1);

        let resp = post_json(state.clone(), "/api/convert", json!({"constraint": "a"})).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(resp).await["error"], "injected failure");

        let resp = post_json(state.clone(), "/api/convert", json!({"constraint": "a"})).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["valid"], true);
        assert_eq!(state.convert_calls(), 2);
    }

    #[tokio::test]
    async fn translate_requires_input() {
        let state: AppState = Arc::new(MockApiState::default());
        let resp = post_json(state, "/api/translate", json!({"input_data": ""})).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
