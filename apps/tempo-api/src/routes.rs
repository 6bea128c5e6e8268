use axum::{
	Json, Router,
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;

use crate::state::AppState;
use tempo_domain::builder::BuildReport;
use tempo_service::{
	AnswerRequest, AnswerResponse, CleanupLevelRequest, CleanupLevelResponse, Error,
	RebuildChunksRequest, SearchRequest, SearchResponse,
};

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/answer", post(answer))
		.route("/v1/search", post(search))
		.with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	Router::new()
		.route("/v1/admin/rebuild_chunks", post(rebuild_chunks))
		.route("/v1/admin/cleanup_level", post(cleanup_level))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn answer(
	State(state): State<AppState>,
	Json(payload): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
	let response = state.service.answer_query(payload).await?;

	Ok(Json(response))
}

async fn search(
	State(state): State<AppState>,
	Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
	let response = state.service.search(payload).await?;

	Ok(Json(response))
}

async fn rebuild_chunks(
	State(state): State<AppState>,
	Json(payload): Json<RebuildChunksRequest>,
) -> Result<Json<BuildReport>, ApiError> {
	let report = state.service.build_chunks(&payload.owner_id).await?;

	Ok(Json(report))
}

async fn cleanup_level(
	State(state): State<AppState>,
	Json(payload): Json<CleanupLevelRequest>,
) -> Result<Json<CleanupLevelResponse>, ApiError> {
	let response = state.service.cleanup_level(payload).await?;

	Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::InvalidRequest { message } =>
				Self::new(StatusCode::BAD_REQUEST, "invalid_request", message),
			Error::Provider { message, .. } => {
				tracing::error!(error = %message, "Provider failure surfaced to the client.");

				Self::new(StatusCode::BAD_GATEWAY, "provider_error", "Upstream provider failed.")
			},
			Error::Storage { message } => {
				tracing::error!(error = %message, "Storage failure surfaced to the client.");

				Self::new(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", "Storage failed.")
			},
			Error::Timeout { message } =>
				Self::new(StatusCode::GATEWAY_TIMEOUT, "timeout", message),
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
