use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Response envelope shared by every endpoint:
/// `{success, data?, message?, error?, pagination?}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
            pagination: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok(data)
        }
    }

    pub fn paginated(data: T, pagination: Pagination) -> Self {
        Self {
            pagination: Some(pagination),
            ..Self::ok(data)
        }
    }
}

impl ApiResponse<()> {
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            error: None,
            pagination: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = if limit > 0 {
            (total + limit - 1) / limit
        } else {
            0
        };
        Self {
            page,
            limit,
            total,
            total_pages,
        }
    }
}

pub fn error_response(status: StatusCode, message: &str) -> Response {
    let body = Json(serde_json::json!({
        "success": false,
        "error": message,
    }));
    (status, body).into_response()
}

#[cfg(test)]
mod tests {
    use super::{ApiResponse, Pagination};

    #[test]
    fn pagination_rounds_up() {
        let p = Pagination::new(1, 20, 41);
        assert_eq!(p.total_pages, 3);
        let p = Pagination::new(1, 20, 40);
        assert_eq!(p.total_pages, 2);
        let p = Pagination::new(1, 20, 0);
        assert_eq!(p.total_pages, 0);
    }

    #[test]
    fn envelope_omits_empty_fields() {
        let rendered = serde_json::to_string(&ApiResponse::ok(1)).unwrap();
        assert_eq!(rendered, r#"{"success":true,"data":1}"#);
    }

    #[test]
    fn envelope_includes_pagination() {
        let rendered =
            serde_json::to_string(&ApiResponse::paginated(1, Pagination::new(2, 10, 25))).unwrap();
        assert!(rendered.contains(r#""total_pages":3"#));
        assert!(rendered.contains(r#""page":2"#));
    }
}
