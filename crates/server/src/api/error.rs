//! Mapping of component errors onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use curator_core::{AcquireError, BackendError, ControlError, MonitorError, SearchError};

pub type ApiResult<T> = Result<T, ApiError>;

/// Error body: `{ "error": "<kind>", "message": "<detail>" }`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_input", message)
    }

    pub fn client_unavailable() -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "client_unavailable",
            "The backend has no download client configured",
        )
    }

    /// An upstream failure; the backend's own 404 stays a 404.
    fn upstream(kind: &'static str, e: &BackendError) -> Self {
        let status = match e {
            BackendError::Status { status: 404, .. } => StatusCode::NOT_FOUND,
            BackendError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, kind, e.message())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.kind.to_string(),
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<SearchError> for ApiError {
    fn from(e: SearchError) -> Self {
        let kind = e.kind();
        match &e {
            SearchError::InvalidInput(_) | SearchError::NoScopeSelected => {
                Self::new(StatusCode::BAD_REQUEST, kind, e.to_string())
            }
            SearchError::Busy | SearchError::Superseded => {
                Self::new(StatusCode::CONFLICT, kind, e.to_string())
            }
            SearchError::RequestFailed(inner) => Self::upstream(kind, inner),
        }
    }
}

impl From<AcquireError> for ApiError {
    fn from(e: AcquireError) -> Self {
        let kind = e.kind();
        match &e {
            AcquireError::InvalidInput(_) => Self::new(StatusCode::BAD_REQUEST, kind, e.to_string()),
            AcquireError::Busy | AcquireError::NotResolved(_) | AcquireError::AlreadyExists(_) => {
                Self::new(StatusCode::CONFLICT, kind, e.to_string())
            }
            AcquireError::NoCandidates => Self::new(StatusCode::NOT_FOUND, kind, e.to_string()),
            AcquireError::RequestFailed(inner) => Self::upstream(kind, inner),
        }
    }
}

impl From<ControlError> for ApiError {
    fn from(e: ControlError) -> Self {
        match &e {
            ControlError::InvalidInput(message) => Self::bad_request(message.clone()),
            ControlError::Backend(inner) => Self::upstream("request_failed", inner),
        }
    }
}

impl From<MonitorError> for ApiError {
    fn from(e: MonitorError) -> Self {
        match &e {
            MonitorError::ClientUnavailable => Self::client_unavailable(),
            MonitorError::RequestFailed(inner) => Self::upstream("request_failed", inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_errors_map_to_status() {
        assert_eq!(
            ApiError::from(SearchError::NoScopeSelected).status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(SearchError::Busy).status,
            StatusCode::CONFLICT
        );
        let e = ApiError::from(SearchError::RequestFailed(BackendError::ConnectionFailed(
            "refused".to_string(),
        )));
        assert_eq!(e.status, StatusCode::BAD_GATEWAY);
        assert_eq!(e.kind, "request_failed");
    }

    #[test]
    fn test_acquire_errors_map_to_status() {
        assert_eq!(
            ApiError::from(AcquireError::AlreadyExists("dup".to_string())).status,
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(AcquireError::NoCandidates).status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(AcquireError::RequestFailed(BackendError::Timeout)).status,
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_control_not_found_stays_not_found() {
        let e = ApiError::from(ControlError::Backend(BackendError::Status {
            status: 404,
            message: "torrent not found".to_string(),
        }));
        assert_eq!(e.status, StatusCode::NOT_FOUND);
        assert_eq!(e.message, "torrent not found");
    }

    #[test]
    fn test_client_unavailable_is_503() {
        let e = ApiError::from(MonitorError::ClientUnavailable);
        assert_eq!(e.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(e.kind, "client_unavailable");
    }
}
