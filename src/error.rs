use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

// Error kinds raised while resolving cities and building outbound links
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecommendError {
    #[error("destination {destination_id} is missing required field `{field}`")]
    DataIntegrity {
        destination_id: i64,
        field: &'static str,
    },

    #[error("city `{city}` is not in the city registry")]
    RegistryMiss { city: String },

    #[error("destination {destination_id} requested without an origin city")]
    MissingOriginParameter { destination_id: i64 },

    #[error("no coordinate known for city `{city}`")]
    CoordinateUnavailable { city: String },
}

impl RecommendError {
    // Only integrity failures drop the entity; everything else degrades
    pub fn is_fatal_for_entity(&self) -> bool {
        matches!(self, RecommendError::DataIntegrity { .. })
    }
}

// Errors while loading static data files
#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parse error in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Dataset {0} is empty")]
    Empty(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to load city registry: {0}")]
    Registry(#[from] DataError),
}

// Errors surfaced to HTTP clients
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    BadRequest { message: String, detail: String },

    #[error("{0}")]
    NotFound(String),

    #[error("Route {0} not found")]
    UnknownRoute(String),

    #[error("Too many requests, retry later")]
    RateLimited { retry_after_secs: u64 },

    #[error("Internal server error")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) | ApiError::UnknownRoute(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RecommendError> for ApiError {
    fn from(err: RecommendError) -> Self {
        match err {
            RecommendError::MissingOriginParameter { .. } => ApiError::BadRequest {
                message: "Missing origin parameter, choose a departure city first".to_string(),
                detail: err.to_string(),
            },
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<DataError> for ApiError {
    fn from(err: DataError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::BadRequest { detail, .. } => ErrorBody {
                code: status.as_u16(),
                message: self.to_string(),
                error: Some(detail.clone()),
                retry_after: None,
                path: None,
            },
            ApiError::RateLimited { retry_after_secs } => ErrorBody {
                code: status.as_u16(),
                message: self.to_string(),
                error: None,
                retry_after: Some(*retry_after_secs),
                path: None,
            },
            ApiError::NotFound(_) => ErrorBody {
                code: status.as_u16(),
                message: self.to_string(),
                error: None,
                retry_after: None,
                path: None,
            },
            ApiError::UnknownRoute(path) => ErrorBody {
                code: status.as_u16(),
                message: self.to_string(),
                error: None,
                retry_after: None,
                path: Some(path.clone()),
            },
            ApiError::Internal(detail) => ErrorBody {
                code: status.as_u16(),
                message: self.to_string(),
                error: Some(detail.clone()),
                retry_after: None,
                path: None,
            },
        };

        (status, Json(body)).into_response()
    }
}
