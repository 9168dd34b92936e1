use crate::config::ConfigError;
use crate::fleet::repository::DataSourceError;
use crate::fleet::service::FleetServiceError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Fleet(FleetServiceError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Fleet(err) => write!(f, "fleet ledger error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Fleet(err) => Some(err),
        }
    }
}

impl FleetServiceError {
    /// Status reported for this error on every HTTP surface.
    pub fn status_code(&self) -> StatusCode {
        match self {
            FleetServiceError::Validation(_)
            | FleetServiceError::Amount(_)
            | FleetServiceError::Import(_) => StatusCode::UNPROCESSABLE_ENTITY,
            FleetServiceError::Assignment(_)
            | FleetServiceError::Duplicate { .. }
            | FleetServiceError::DataSource(DataSourceError::Conflict) => StatusCode::CONFLICT,
            FleetServiceError::NotFound { .. }
            | FleetServiceError::DataSource(DataSourceError::NotFound) => StatusCode::NOT_FOUND,
            FleetServiceError::DataSource(DataSourceError::Unavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            FleetServiceError::Advisory(_) => StatusCode::BAD_GATEWAY,
            FleetServiceError::DataSource(DataSourceError::Codec(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Ledger errors carry their own message; the prefix is for the CLI.
        let (status, message) = match &self {
            AppError::Fleet(err) => (err.status_code(), err.to_string()),
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<FleetServiceError> for AppError {
    fn from(value: FleetServiceError) -> Self {
        Self::Fleet(value)
    }
}
