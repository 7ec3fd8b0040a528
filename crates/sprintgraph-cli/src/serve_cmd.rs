use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;

use sprintgraph_core::allocation::allocate_by_owner;
use sprintgraph_core::plan::{
    AnalysisResult, BuildOptions, PlanningError, planning_response_to_meeting,
};
use sprintgraph_core::schedule::{ScheduleError, compute_schedule};
use sprintgraph_store::{MeetingStore, MergeOutcome};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: msg.into(),
        }
    }

    pub fn unprocessable(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: msg.into(),
        }
    }
}

impl From<PlanningError> for AppError {
    fn from(err: PlanningError) -> Self {
        Self::unprocessable(err.to_string())
    }
}

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        Self::unprocessable(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Shared server state. Each request takes the store lock for the whole of
/// its read or merge.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<MeetingStore>>,
    pub build: BuildOptions,
    pub capacity_hours: u32,
}

impl AppState {
    pub fn new(store: MeetingStore, build: BuildOptions, capacity_hours: u32) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            build,
            capacity_hours,
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/meetings", get(list_meetings).post(add_meeting))
        .route("/api/meetings/{id}", get(get_meeting))
        .route("/api/meetings/{id}/schedule", get(get_schedule))
        .route("/api/meetings/{id}/allocations", get(get_allocations))
        .route("/api/tasks/{id}", get(get_task))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(state: AppState, bind: &str, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("sprintgraph serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("sprintgraph serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

type HandlerResult = Result<axum::response::Response, AppError>;

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_meetings(State(state): State<AppState>) -> HandlerResult {
    let store = state.store.read().await;
    Ok(Json(store.snapshot()).into_response())
}

async fn get_meeting(State(state): State<AppState>, Path(id): Path<String>) -> HandlerResult {
    let store = state.store.read().await;
    let meeting = store
        .meeting(&id)
        .ok_or_else(|| AppError::not_found(format!("meeting {id} not found")))?;
    Ok(Json(meeting).into_response())
}

/// Build a meeting from an analysis result and merge it.
///
/// The build runs before the lock is taken; a failed build never reaches the
/// store.
async fn add_meeting(
    State(state): State<AppState>,
    Json(result): Json<AnalysisResult>,
) -> HandlerResult {
    let meeting = planning_response_to_meeting(&result.response, &result.context, &state.build)
        .inspect_err(|err| {
            tracing::warn!(
                meeting_id = %result.response.meeting_id,
                error = %err,
                "planning failed"
            );
        })?;

    let mut store = state.store.write().await;
    let outcome = store.add_meeting_checked(meeting.clone());
    let status = match outcome {
        MergeOutcome::Inserted => StatusCode::CREATED,
        MergeOutcome::Replaced => StatusCode::OK,
        MergeOutcome::Stale { stored, incoming } => {
            return Err(AppError::conflict(format!(
                "meeting {} revision {incoming} is older than stored revision {stored}",
                meeting.id
            )));
        }
    };
    Ok((status, Json(meeting)).into_response())
}

async fn get_schedule(State(state): State<AppState>, Path(id): Path<String>) -> HandlerResult {
    let store = state.store.read().await;
    let meeting = store
        .meeting(&id)
        .ok_or_else(|| AppError::not_found(format!("meeting {id} not found")))?;
    let schedule = compute_schedule(&meeting.tasks)?;
    Ok(Json(schedule).into_response())
}

async fn get_allocations(State(state): State<AppState>, Path(id): Path<String>) -> HandlerResult {
    let store = state.store.read().await;
    let meeting = store
        .meeting(&id)
        .ok_or_else(|| AppError::not_found(format!("meeting {id} not found")))?;
    Ok(Json(allocate_by_owner(&meeting.tasks, state.capacity_hours)).into_response())
}

async fn get_task(State(state): State<AppState>, Path(id): Path<String>) -> HandlerResult {
    let store = state.store.read().await;
    let task = store
        .task(&id)
        .ok_or_else(|| AppError::not_found(format!("task {id} not found")))?;
    Ok(Json(task).into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use sprintgraph_core::plan::BuildOptions;
    use sprintgraph_store::MeetingStore;
    use sprintgraph_test_utils::{analysis_result, failed_response, meeting, two_milestone_plan};

    use super::AppState;

    // -----------------------------------------------------------------------
    // HTTP helpers
    // -----------------------------------------------------------------------

    fn state_with(store: MeetingStore) -> AppState {
        AppState::new(store, BuildOptions::default(), 120)
    }

    async fn send_request(state: AppState, uri: &str) -> axum::response::Response {
        let app = super::build_router(state);
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn post_json(
        state: AppState,
        uri: &str,
        body: &impl serde::Serialize,
    ) -> axum::response::Response {
        let app = super::build_router(state);
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap();
        app.oneshot(request).await.unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_health() {
        let resp = send_request(state_with(MeetingStore::new()), "/health").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, serde_json::json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_list_meetings_empty() {
        let resp = send_request(state_with(MeetingStore::new()), "/api/meetings").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            body_json(resp).await,
            serde_json::json!({ "meetings": [], "tasks": [] })
        );
    }

    #[tokio::test]
    async fn test_list_meetings_in_display_order() {
        let store = MeetingStore::from_snapshot_meetings(vec![
            meeting("m1", &["a"]),
            meeting("m2", &["b"]),
        ]);
        let resp = send_request(state_with(store), "/api/meetings").await;
        let json = body_json(resp).await;
        assert_eq!(json["meetings"][0]["id"], "m1");
        assert_eq!(json["meetings"][1]["id"], "m2");
        assert_eq!(json["tasks"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_post_inserts_then_replaces() {
        let state = state_with(MeetingStore::new());
        let body = analysis_result("m1", two_milestone_plan());

        let resp = post_json(state.clone(), "/api/meetings", &body).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let json = body_json(resp).await;
        assert_eq!(json["id"], "m1");
        assert_eq!(json["tasks"][1]["depends_on"][0], "m1-task-0-0");

        let resp = post_json(state.clone(), "/api/meetings", &body).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let store = state.store.read().await;
        assert_eq!(store.len(), 1);
        assert_eq!(store.task_count(), 2);
    }

    #[tokio::test]
    async fn test_post_failed_plan_leaves_store_untouched() {
        let state = state_with(MeetingStore::from_snapshot_meetings(vec![meeting(
            "m1",
            &["a"],
        )]));
        let before = state.store.read().await.snapshot();

        let mut body = analysis_result("m1", two_milestone_plan());
        body.response = failed_response("m1", Some("transcription failed"));

        let resp = post_json(state.clone(), "/api/meetings", &body).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body_json(resp).await,
            serde_json::json!({ "error": "transcription failed" })
        );
        assert_eq!(state.store.read().await.snapshot(), before);
    }

    #[tokio::test]
    async fn test_post_stale_revision_conflicts() {
        let state = state_with(MeetingStore::new());

        let mut newer = analysis_result("m1", two_milestone_plan());
        newer.response.revision = Some(5);
        let resp = post_json(state.clone(), "/api/meetings", &newer).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let mut older = newer.clone();
        older.response.revision = Some(3);
        let resp = post_json(state.clone(), "/api/meetings", &older).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let store = state.store.read().await;
        assert_eq!(store.meeting("m1").unwrap().revision, Some(5));
    }

    #[tokio::test]
    async fn test_get_meeting_and_not_found() {
        let state = state_with(MeetingStore::from_snapshot_meetings(vec![meeting(
            "m1",
            &["a"],
        )]));

        let resp = send_request(state.clone(), "/api/meetings/m1").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["title"], "meeting m1");

        let resp = send_request(state, "/api/meetings/missing").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(resp).await,
            serde_json::json!({ "error": "meeting missing not found" })
        );
    }

    #[tokio::test]
    async fn test_get_task_and_not_found() {
        let state = state_with(MeetingStore::from_snapshot_meetings(vec![meeting(
            "m1",
            &["a"],
        )]));

        let resp = send_request(state.clone(), "/api/tasks/a").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "pending");

        let resp = send_request(state, "/api/tasks/zzz").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_schedule() {
        let mut m = meeting("m1", &["a", "b"]);
        m.tasks[1].depends_on = vec!["a".to_owned()];
        let state = state_with(MeetingStore::from_snapshot_meetings(vec![m]));

        let resp = send_request(state, "/api/meetings/m1/schedule").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["makespan"], 12);
        assert_eq!(json["critical_path"], serde_json::json!(["a", "b"]));
    }

    #[tokio::test]
    async fn test_schedule_cycle_is_unprocessable() {
        let mut m = meeting("m1", &["a"]);
        m.tasks[0].depends_on = vec!["a".to_owned()];
        let state = state_with(MeetingStore::from_snapshot_meetings(vec![m]));

        let resp = send_request(state, "/api/meetings/m1/schedule").await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(resp).await;
        assert!(json["error"].as_str().unwrap().contains("cycle"));
    }

    #[tokio::test]
    async fn test_allocations() {
        let state = state_with(MeetingStore::from_snapshot_meetings(vec![meeting(
            "m1",
            &["a", "b"],
        )]));

        let resp = send_request(state, "/api/meetings/m1/allocations").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        let arr = json.as_array().expect("response should be an array");
        assert_eq!(arr.len(), 1);
        assert_eq!(arr[0]["name"], "Unassigned");
        assert_eq!(arr[0]["allocated_hours"], 12);
        assert_eq!(arr[0]["capacity_hours"], 120);
    }
}
