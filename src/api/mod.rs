use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use validator::Validate;

use crate::database::DatabaseError;
use crate::food::analyzer::{AnalyzerError, FoodAnalyzer, SubmitOutcome, WorkflowStatus};
use crate::food::record::AnalysisRecord;

#[derive(Clone)]
pub struct AppState {
    analyzer: FoodAnalyzer,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct AnalyzeRequest {
    #[validate(length(min = 1, max = 4096))]
    pub image_path: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub result: String,
    #[serde(flatten)]
    pub outcome: SubmitOutcome,
}

#[derive(Debug, Serialize)]
pub struct ResultResponse {
    pub result: Option<String>,
    pub status: WorkflowStatus,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub records: Vec<AnalysisRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
}

fn error_response(code: StatusCode, status: impl Into<String>) -> Response {
    (code, Json(ApiResponse { status: status.into() })).into_response()
}

fn analyzer_error_response(e: AnalyzerError) -> Response {
    let code = match &e {
        AnalyzerError::Busy => StatusCode::CONFLICT,
        AnalyzerError::Image(_) => StatusCode::BAD_REQUEST,
        AnalyzerError::Persistence(DatabaseError::NotFound(_)) => StatusCode::NOT_FOUND,
        AnalyzerError::Persistence(_) | AnalyzerError::Cancelled | AnalyzerError::Task(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(code, e.to_string())
}

/// Create and configure the API router
pub fn create_api(analyzer: FoodAnalyzer) -> Router {
    let state = AppState { analyzer };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_check))
        .route("/analyze", post(analyze_handler))
        .route("/result", get(result_handler).delete(clear_result_handler))
        .route("/history", get(history_handler))
        .route("/history/:id", delete(delete_handler))
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> Response {
    Json(ApiResponse {
        status: "Server is running and healthy".to_string(),
    })
    .into_response()
}

async fn analyze_handler(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Response {
    if let Err(e) = request.validate() {
        return error_response(StatusCode::BAD_REQUEST, format!("Invalid request: {}", e));
    }

    info!("Analyze requested for {}", request.image_path);
    let outcome = match state
        .analyzer
        .analyze_file(&PathBuf::from(&request.image_path))
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => return analyzer_error_response(e),
    };

    let code = match outcome {
        SubmitOutcome::InferenceFailed { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::OK,
    };
    let body = AnalyzeResponse {
        result: outcome.display_text().to_string(),
        outcome,
    };
    (code, Json(body)).into_response()
}

async fn result_handler(State(state): State<AppState>) -> Response {
    let result = state.analyzer.current_result().borrow().clone();
    let status = state.analyzer.status().borrow().clone();
    Json(ResultResponse { result, status }).into_response()
}

async fn clear_result_handler(State(state): State<AppState>) -> Response {
    state.analyzer.clear_current_result();
    Json(ApiResponse {
        status: "Result cleared".to_string(),
    })
    .into_response()
}

async fn history_handler(State(state): State<AppState>) -> Response {
    match state.analyzer.load_history().await {
        Ok(records) => Json(HistoryResponse { records }).into_response(),
        Err(e) => analyzer_error_response(e),
    }
}

async fn delete_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.analyzer.delete_record(&id).await {
        Ok(()) => Json(ApiResponse {
            status: format!("Deleted {}", id),
        })
        .into_response(),
        Err(e) => {
            warn!("Delete of {} failed: {}", id, e);
            analyzer_error_response(e)
        }
    }
}
