//! Mapping of bracket errors onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use olympiad::BracketError;
use serde::{Deserialize, Serialize};

use crate::logging;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error returned by every API handler
#[derive(Debug)]
pub struct ApiError(pub BracketError);

impl ApiError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        ApiError(BracketError::InvalidInput(message.into()))
    }

    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            BracketError::NotFound { .. } => StatusCode::NOT_FOUND,
            BracketError::InvalidState(_)
            | BracketError::IncompleteTournament(_)
            | BracketError::AlreadyDistributed(_)
            | BracketError::AlreadyRegistered(_)
            | BracketError::TournamentFull { .. } => StatusCode::CONFLICT,
            BracketError::InvalidWinner { .. } | BracketError::InvalidInput(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            BracketError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            BracketError::Database(_) | BracketError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<BracketError> for ApiError {
    fn from(err: BracketError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            logging::log_internal_error("bracket", &self.0);
        }

        (
            status,
            Json(ErrorResponse {
                error: self.0.client_message(),
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
