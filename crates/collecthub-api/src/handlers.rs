use crate::{json_body, ApiError, ApiResult, AppState};
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use collecthub_ai::PersonalityError;
use collecthub_core::UserDataSnapshot;
use serde::{Deserialize, Serialize};
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub timestamp: String,
    pub runtime: RuntimeStats,
}

/// Process and async runtime figures. Memory fields are `None` when the
/// platform does not report them.
#[derive(Serialize)]
pub struct RuntimeStats {
    pub memory_rss_bytes: Option<u64>,
    pub memory_virtual_bytes: Option<u64>,
    pub system_memory_total_bytes: u64,
    pub worker_threads: usize,
    pub alive_tasks: usize,
}

#[derive(Deserialize)]
pub struct AnalysisRequest {
    #[serde(default)]
    pub user_id: String,
}

#[derive(Serialize)]
pub struct AnalysisResponse {
    pub success: bool,
    pub user_id: String,
    pub personality_analysis: String,
    pub data_collected: UserDataSnapshot,
}

pub async fn ping() -> &'static str {
    "Pong"
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        runtime: runtime_stats(),
    })
}

fn runtime_stats() -> RuntimeStats {
    let mut sys = System::new();
    sys.refresh_memory();

    let process_memory = sysinfo::get_current_pid().ok().and_then(|pid| {
        sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );
        sys.process(pid)
            .map(|process| (process.memory(), process.virtual_memory()))
    });

    let metrics = tokio::runtime::Handle::current().metrics();
    RuntimeStats {
        memory_rss_bytes: process_memory.map(|(rss, _)| rss),
        memory_virtual_bytes: process_memory.map(|(_, virt)| virt),
        system_memory_total_bytes: sys.total_memory(),
        worker_threads: metrics.num_workers(),
        alive_tasks: metrics.num_alive_tasks(),
    }
}

/// `POST /api/aipersonality/analysis`
///
/// Client failures from the analysis provider all collapse into one message;
/// the analyzer has already logged the specific cause.
pub async fn personality_analysis(
    State(state): State<AppState>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> ApiResult<Json<AnalysisResponse>> {
    let request = json_body(payload, "Invalid request body")?;
    if request.user_id.is_empty() {
        return Err(ApiError::BadRequest("User ID is required".to_string()));
    }

    match state.analyzer.analyze(&request.user_id).await {
        Ok(analysis) => Ok(Json(AnalysisResponse {
            success: true,
            user_id: request.user_id,
            personality_analysis: analysis.analysis_text,
            data_collected: analysis.snapshot,
        })),
        Err(PersonalityError::Aggregation(e)) if e.is_client_error() => {
            Err(ApiError::BadRequest("Invalid user ID format".to_string()))
        }
        Err(PersonalityError::Aggregation(_)) => {
            Err(ApiError::Internal("Failed to collect user data".to_string()))
        }
        Err(PersonalityError::Analysis(_)) => Err(ApiError::Internal(
            "Failed to generate personality analysis".to_string(),
        )),
    }
}
