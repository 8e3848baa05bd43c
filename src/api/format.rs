use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};

pub const STATUS_OK: &str = "OK";
pub const STATUS_FAILED: &str = "FAILED";

/// Uniform response wrapper.
///
/// Success: `{"status": "OK", "data": <payload>}`.
/// Failure: `{"status": "FAILED", "data": {"error": true, "message": <string|object>}}`.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub status_code: StatusCode,
    pub body: Value,
    pub headers: HeaderMap,
}

impl Envelope {
    pub fn ok(data: Value) -> Self {
        Self {
            status_code: StatusCode::OK,
            body: json!({ "status": STATUS_OK, "data": data }),
            headers: HeaderMap::new(),
        }
    }

    pub fn failed(status_code: StatusCode, message: Value) -> Self {
        Self {
            status_code,
            body: json!({
                "status": STATUS_FAILED,
                "data": { "error": true, "message": message }
            }),
            headers: HeaderMap::new(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.body["status"] == STATUS_OK
    }

    pub fn data(&self) -> &Value {
        &self.body["data"]
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        (self.status_code, self.headers, Json(self.body)).into_response()
    }
}
