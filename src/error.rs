//! Error taxonomy and JSON error responses

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::{Response, StatusCode};
use serde::Serialize;

/// Error codes for request-local failures
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiErrorCode {
    /// Malformed request body or missing required parameter
    BadRequest,
    /// No authenticated session on a guarded route
    Unauthorized,
    /// Unknown catalog id
    NotFound,
    /// Database operation failed
    StoreFailure,
    /// Outbound health probe could not reach its target
    UpstreamFailure,
    /// Anything else
    InternalError,
}

impl ApiErrorCode {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ApiErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::StoreFailure => StatusCode::INTERNAL_SERVER_ERROR,
            ApiErrorCode::UpstreamFailure => StatusCode::INTERNAL_SERVER_ERROR,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code as a string for the X-Appdock-Error header
    pub fn as_header_value(&self) -> &'static str {
        match self {
            ApiErrorCode::BadRequest => "BAD_REQUEST",
            ApiErrorCode::Unauthorized => "UNAUTHORIZED",
            ApiErrorCode::NotFound => "NOT_FOUND",
            ApiErrorCode::StoreFailure => "STORE_FAILURE",
            ApiErrorCode::UpstreamFailure => "UPSTREAM_FAILURE",
            ApiErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

/// JSON error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
    /// The error code
    pub code: ApiErrorCode,
    /// HTTP status code (for reference)
    pub status: u16,
}

impl ErrorResponse {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            status: code.status_code().as_u16(),
            code,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"error":"{}","code":"{}","status":{}}}"#,
                self.error.replace('\"', "\\\""),
                self.code.as_header_value(),
                self.status
            )
        })
    }
}

/// Helper to create a JSON response - infallible with valid StatusCode
pub fn json_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(body.into()))
        .expect("valid response with StatusCode enum and static header")
}

/// Create a JSON error response with X-Appdock-Error header
pub fn json_error(code: ApiErrorCode, message: impl Into<String>) -> Response<Full<Bytes>> {
    let error = ErrorResponse::new(code, message);

    Response::builder()
        .status(code.status_code())
        .header(CONTENT_TYPE, "application/json")
        .header("X-Appdock-Error", code.as_header_value())
        .body(Full::new(Bytes::from(error.to_json())))
        .expect("valid response with StatusCode enum and static headers")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_status_codes() {
        assert_eq!(ApiErrorCode::BadRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiErrorCode::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiErrorCode::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiErrorCode::StoreFailure.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiErrorCode::UpstreamFailure.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_response_json() {
        let error = ErrorResponse::new(ApiErrorCode::NotFound, "App not found: 42");
        let json = error.to_json();

        assert!(json.contains("\"error\":\"App not found: 42\""));
        assert!(json.contains("\"code\":\"NOT_FOUND\""));
        assert!(json.contains("\"status\":404"));
    }

    #[test]
    fn test_json_error_response() {
        let response = json_error(ApiErrorCode::Unauthorized, "You need to login first");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(
            response.headers().get("X-Appdock-Error").unwrap(),
            "UNAUTHORIZED"
        );
    }
}
