//! HTTP API for workers and job submitters.
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/` | Dashboard page |
//! | POST | `/api/worker/register` | Register or re-register a worker |
//! | POST | `/api/worker/progress` | Report progress on a job |
//! | POST | `/api/job/submit` | Submit a job |
//! | GET | `/api/job/{job_id}` | Get a job |
//! | GET | `/api/jobs` | List all jobs |
//! | GET | `/api/workers` | List workers with their idle capacity |
//! | GET | `/api/queue` | Pending job ids in queue order |
//!
//! Request bodies are checked here; the scheduler assumes valid input.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::error::SchedulerError;
use crate::scheduler::{Job, JobSpec, ProgressReport, SharedScheduler, Worker, WorkerRegistration};

#[derive(Clone)]
pub struct ApiState {
    pub scheduler: SharedScheduler,
}

#[derive(Debug, Deserialize)]
pub struct RegisterWorkerRequest {
    pub worker_id: String,
    pub categories: Vec<String>,
    pub capacity: BTreeMap<String, u32>,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitJobRequest {
    pub category: String,
    pub quantity: u32,
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub method: String,
}

#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    pub worker_id: String,
    pub job_id: String,
    #[serde(default)]
    pub status: String,
    pub progress: u32,
    #[serde(default)]
    pub logs: Option<String>,
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct SubmitJobResponse {
    job_id: String,
    status: String,
    grants: BTreeMap<String, u32>,
}

#[derive(Serialize)]
struct JobResponse {
    job_id: String,
    status: String,
    progress: u32,
    grants: BTreeMap<String, u32>,
}

#[derive(Serialize)]
struct JobListItem {
    job_id: String,
    category: String,
    quantity: u32,
    targets: Vec<String>,
    duration: u64,
    method: String,
    status: String,
    progress: u32,
    grants: BTreeMap<String, u32>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl From<&Job> for JobListItem {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.to_string(),
            category: job.spec.category.clone(),
            quantity: job.spec.quantity,
            targets: job.spec.targets.clone(),
            duration: job.spec.duration,
            method: job.spec.method.clone(),
            status: job.status.to_string(),
            progress: job.progress,
            grants: job.grants.clone(),
            created_at: job.created_at,
            completed_at: job.completed_at,
        }
    }
}

#[derive(Serialize)]
struct QueueResponse {
    pending: Vec<String>,
}

impl IntoResponse for SchedulerError {
    fn into_response(self) -> Response {
        let status = match &self {
            SchedulerError::JobNotFound(_) => StatusCode::NOT_FOUND,
            SchedulerError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        };
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Build the API router over a shared scheduler.
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/api/worker/register", post(register_worker_handler))
        .route("/api/worker/progress", post(report_progress_handler))
        .route("/api/job/submit", post(submit_job_handler))
        .route("/api/job/{job_id}", get(get_job_handler))
        .route("/api/jobs", get(list_jobs_handler))
        .route("/api/workers", get(list_workers_handler))
        .route("/api/queue", get(queue_handler))
        .layer(cors)
        .with_state(state)
}

fn parse_job_id(raw: &str) -> Result<Uuid, SchedulerError> {
    Uuid::parse_str(raw).map_err(|_| SchedulerError::JobNotFound(raw.to_string()))
}

fn require_non_empty(field: &str, value: &str) -> Result<(), SchedulerError> {
    if value.trim().is_empty() {
        return Err(SchedulerError::InvalidArgument(format!(
            "{} cannot be empty",
            field
        )));
    }
    Ok(())
}

async fn index_handler() -> Html<&'static str> {
    Html(include_str!("index.html"))
}

async fn register_worker_handler(
    State(state): State<ApiState>,
    Json(payload): Json<RegisterWorkerRequest>,
) -> Result<Json<StatusResponse>, SchedulerError> {
    require_non_empty("worker_id", &payload.worker_id)?;
    for category in &payload.categories {
        require_non_empty("category", category)?;
    }

    state.scheduler.write().await.register_worker(WorkerRegistration {
        worker_id: payload.worker_id,
        categories: payload.categories,
        capacity: payload.capacity,
        address: payload.address,
    });

    Ok(Json(StatusResponse { status: "ok" }))
}

async fn submit_job_handler(
    State(state): State<ApiState>,
    Json(payload): Json<SubmitJobRequest>,
) -> Result<Json<SubmitJobResponse>, SchedulerError> {
    require_non_empty("category", &payload.category)?;
    if payload.quantity == 0 {
        return Err(SchedulerError::InvalidArgument(
            "quantity must be greater than zero".to_string(),
        ));
    }

    let spec = JobSpec {
        category: payload.category,
        quantity: payload.quantity,
        targets: payload.targets,
        duration: payload.duration,
        method: payload.method,
    };
    let job = state.scheduler.write().await.submit_job(spec)?;

    Ok(Json(SubmitJobResponse {
        job_id: job.id.to_string(),
        status: job.status.to_string(),
        grants: job.grants,
    }))
}

async fn report_progress_handler(
    State(state): State<ApiState>,
    Json(payload): Json<ProgressRequest>,
) -> Result<Json<StatusResponse>, SchedulerError> {
    if payload.progress > 100 {
        return Err(SchedulerError::InvalidArgument(format!(
            "progress must be between 0 and 100, got {}",
            payload.progress
        )));
    }
    let job_id = parse_job_id(&payload.job_id)?;

    if let Some(logs) = payload.logs.as_deref().filter(|l| !l.is_empty()) {
        tracing::debug!(job_id = %job_id, worker_id = %payload.worker_id, logs, "Worker logs");
    }

    let report = ProgressReport {
        worker_id: payload.worker_id,
        label: payload.status,
        progress: payload.progress,
    };
    let result = state.scheduler.write().await.report_progress(&job_id, report);
    if let Err(e) = &result {
        tracing::warn!(job_id = %job_id, error = %e, "Progress report declined");
    }
    result?;

    Ok(Json(StatusResponse { status: "ok" }))
}

async fn get_job_handler(
    State(state): State<ApiState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobResponse>, SchedulerError> {
    let id = parse_job_id(&job_id)?;
    let scheduler = state.scheduler.read().await;
    let job = scheduler.get_job(&id)?;

    Ok(Json(JobResponse {
        job_id: job.id.to_string(),
        status: job.status.to_string(),
        progress: job.progress,
        grants: job.grants.clone(),
    }))
}

async fn list_jobs_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let scheduler = state.scheduler.read().await;
    let jobs: Vec<JobListItem> = scheduler
        .jobs()
        .all()
        .into_iter()
        .map(JobListItem::from)
        .collect();

    Json(jobs)
}

async fn list_workers_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let scheduler = state.scheduler.read().await;
    let workers: Vec<Worker> = scheduler.workers().all().into_iter().cloned().collect();

    Json(workers)
}

async fn queue_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let scheduler = state.scheduler.read().await;
    let pending = scheduler.pending().ids().map(|id| id.to_string()).collect();

    Json(QueueResponse { pending })
}
