//! Wire-level request and response types

pub mod users;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::db::PaginationResult;

/// Standard response envelope. Every endpoint, success or failure,
/// renders one of these.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T = ()> {
    pub success: bool,
    pub code: u16,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<Page>,
}

impl<T> ApiResponse<T> {
    /// A 200 envelope carrying a single record.
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            code: StatusCode::OK.as_u16(),
            message: message.into(),
            stacktrace: None,
            data: Some(data),
            page: None,
        }
    }

    /// A 201 envelope for newly created records.
    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            code: StatusCode::CREATED.as_u16(),
            ..Self::success(message, data)
        }
    }

    /// A 200 envelope carrying a page of records plus the pagination
    /// values that produced it.
    pub fn success_page(message: impl Into<String>, data: T, page: Page) -> Self {
        Self {
            page: Some(page),
            ..Self::success(message, data)
        }
    }
}

impl ApiResponse<()> {
    /// A 200 envelope with no payload, for operations like delete.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: StatusCode::OK.as_u16(),
            message: message.into(),
            stacktrace: None,
            data: None,
            page: None,
        }
    }

    /// A failure envelope. `stacktrace` carries error detail for
    /// debugging and is omitted from the body when `None`.
    pub fn failure(status: StatusCode, message: impl Into<String>, stacktrace: Option<String>) -> Self {
        Self {
            success: false,
            code: status.as_u16(),
            message: message.into(),
            stacktrace,
            data: None,
            page: None,
        }
    }
}

/// Pagination echo attached to list responses.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Page {
    pub offset: i64,
    pub limit: i64,
    pub count: i64,
    pub order_by: String,
}

impl From<PaginationResult> for Page {
    fn from(result: PaginationResult) -> Self {
        Self {
            offset: result.offset,
            limit: result.limit,
            count: result.count,
            order_by: result.order_by,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_failure_envelope_omits_absent_fields() {
        let body = ApiResponse::failure(StatusCode::NOT_FOUND, "user not found", None);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "success": false,
                "code": 404,
                "message": "user not found",
            })
        );
    }

    #[test]
    fn test_failure_envelope_carries_stacktrace() {
        let body = ApiResponse::failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            "boom",
            Some("error: boom".to_string()),
        );
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["stacktrace"], "error: boom");
    }

    #[test]
    fn test_created_envelope_carries_201() {
        let body = ApiResponse::created("Successfully created a user", 7);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["code"], 201);
        assert_eq!(json["data"], 7);
    }

    #[test]
    fn test_success_page_envelope() {
        let page = Page::from(PaginationResult {
            offset: 40,
            limit: 20,
            order_by: "-name".to_string(),
            count: 97,
        });
        let body = ApiResponse::success_page("ok", vec![1, 2, 3], page);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["code"], 200);
        assert_eq!(json["data"], serde_json::json!([1, 2, 3]));
        assert_eq!(json["page"]["count"], 97);
        assert_eq!(json["page"]["order_by"], "-name");
    }
}
