/// Uniform response envelope
///
/// Every endpoint answers with the same shape: a numeric status, a
/// human-readable message, and a typed, nullable payload. List endpoints
/// wrap their items in [`Paginated`] inside the envelope.
///
/// ```json
/// {
///   "status": 200,
///   "message": "Event retrieved",
///   "data": { "id": "..." }
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Success envelope carried by every 2xx response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// HTTP status code, mirrored into the body
    pub status: u16,

    /// Human-readable message
    pub message: String,

    /// Typed payload; null for message-only responses
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 200 OK with payload
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::OK.as_u16(),
            message: message.into(),
            data: Some(data),
        }
    }

    /// 201 Created with payload
    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::CREATED.as_u16(),
            message: message.into(),
            data: Some(data),
        }
    }

    /// 200 OK with no payload
    ///
    /// Used for acknowledgements and negative-but-not-error outcomes, e.g.
    /// unregistering when no registration exists.
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK.as_u16(),
            message: message.into(),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Page of items with pagination metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,

    /// 1-based page number
    pub page: i64,

    pub per_page: i64,

    /// Total matching items across all pages
    pub total: i64,
}

/// Page/per-page query parameters for list endpoints
///
/// Defaults to page 1 with 20 items; page size is capped at 100.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,

    pub per_page: Option<i64>,
}

impl PageParams {
    pub const DEFAULT_PER_PAGE: i64 = 20;
    pub const MAX_PER_PAGE: i64 = 100;

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.per_page
            .unwrap_or(Self::DEFAULT_PER_PAGE)
            .clamp(1, Self::MAX_PER_PAGE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let response = ApiResponse::ok("done", serde_json::json!({"k": "v"}));
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["status"], 200);
        assert_eq!(json["message"], "done");
        assert_eq!(json["data"]["k"], "v");
    }

    #[test]
    fn test_message_only_has_null_data() {
        let response = ApiResponse::<()>::message_only("nothing to do");
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["status"], 200);
        assert!(json["data"].is_null());
    }

    #[test]
    fn test_page_params_clamping() {
        let params = PageParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 20);
        assert_eq!(params.offset(), 0);

        let params = PageParams {
            page: Some(4),
            per_page: Some(1000),
        };
        assert_eq!(params.limit(), 100);
        assert_eq!(params.offset(), 300);

        let params = PageParams {
            page: Some(-1),
            per_page: Some(0),
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 1);
    }
}
