use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use provider_gateway::GatewayError;
use rlm_controller::ControllerError;
use review_pipeline::ReviewPipelineError;
use serde::Serialize;
use thiserror::Error;

use crate::core::app_state::ConfigError;

/// Public application error type. Wraps every engine-layer error taxonomy
/// (spec §7: C1/C4/C5 codes) behind one `IntoResponse` impl so handlers can
/// use `?` throughout.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Controller(#[from] ControllerError),

    #[error(transparent)]
    ReviewPipeline(#[from] ReviewPipelineError),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Gateway(e) => gateway_status(e),
            AppError::Controller(e) => controller_status(e),
            AppError::ReviewPipeline(ReviewPipelineError::Gateway(e)) => gateway_status(e),
            AppError::ReviewPipeline(ReviewPipelineError::Controller(e)) => controller_status(e),
            AppError::ReviewPipeline(ReviewPipelineError::UnparseableAnswer) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::NotFound => "NOT_FOUND",
            AppError::Gateway(e) => e.code(),
            AppError::Controller(e) => e.code(),
            AppError::ReviewPipeline(e) => e.code(),
        }
    }
}

fn gateway_status(e: &GatewayError) -> StatusCode {
    match e {
        GatewayError::UrlInvalid(_) => StatusCode::BAD_REQUEST,
        GatewayError::NotFound => StatusCode::NOT_FOUND,
        GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
        GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        GatewayError::Transport(_) | GatewayError::Serde(_) | GatewayError::Unsupported => {
            StatusCode::BAD_GATEWAY
        }
    }
}

fn controller_status(e: &ControllerError) -> StatusCode {
    match e {
        ControllerError::Parse => StatusCode::UNPROCESSABLE_ENTITY,
        ControllerError::BudgetExceeded => StatusCode::OK,
        ControllerError::Cancelled => StatusCode::CONFLICT,
        ControllerError::Deadline => StatusCode::GATEWAY_TIMEOUT,
        ControllerError::Llm(_) => StatusCode::BAD_GATEWAY,
        ControllerError::Sandbox(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ControllerError::Gateway(e) => gateway_status(e),
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.error_code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(err: axum::extract::rejection::JsonRejection) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<axum::extract::rejection::QueryRejection> for AppError {
    fn from(err: axum::extract::rejection::QueryRejection) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
