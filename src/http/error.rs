//! Problem-detail error responses.
//!
//! Every failing API call renders the same JSON shape:
//! `{type, title, status, detail, timestamp, errors?, debug?}`.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::clients::ClientError;
use crate::db::DbError;

const PROBLEM_JSON: &str = "application/problem+json";

#[derive(Debug, Serialize)]
struct ProblemDetail {
    #[serde(rename = "type")]
    kind: &'static str,
    title: &'static str,
    status: u16,
    detail: String,
    timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    debug: Option<String>,
}

/// Error returned by HTTP handlers.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    title: &'static str,
    detail: String,
    errors: Option<BTreeMap<String, String>>,
    debug: Option<String>,
}

impl ApiError {
    fn new(status: StatusCode, kind: &'static str, title: &'static str, detail: String) -> Self {
        Self {
            status,
            kind,
            title,
            detail,
            errors: None,
            debug: None,
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "/errors/bad-request",
            "Bad Request",
            detail.into(),
        )
    }

    /// No route matches `path`.
    pub fn no_route(method: &str, path: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "/errors/not-found",
            "Not Found",
            format!("No handler for {method} {path}"),
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    fn from_db(err: DbError) -> Self {
        if err.is_unavailable() {
            tracing::warn!(error = %err, "Request rejected, database unavailable");
            let mut api = Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "/errors/database-unavailable",
                "Database Unavailable",
                "The database is temporarily unavailable, retry later".to_string(),
            );
            api.debug = debug_detail(&err);
            return api;
        }

        tracing::error!(error = %err, "Unhandled database error");
        let mut api = Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "/errors/internal-error",
            "Internal Server Error",
            "An unexpected error occurred".to_string(),
        );
        api.debug = debug_detail(&err);
        api
    }
}

fn debug_detail(err: &DbError) -> Option<String> {
    cfg!(debug_assertions).then(|| err.to_string())
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::NotFound(detail) => Self::new(
                StatusCode::NOT_FOUND,
                "/errors/client-not-found",
                "Client Not Found",
                detail,
            ),
            ClientError::AlreadyExists(detail) => Self::new(
                StatusCode::CONFLICT,
                "/errors/client-already-exists",
                "Client Already Exists",
                detail,
            ),
            ClientError::Conflict(detail) => Self::new(
                StatusCode::CONFLICT,
                "/errors/concurrent-modification",
                "Concurrent Modification",
                detail,
            ),
            ClientError::Validation(fields) => {
                let mut api = Self::new(
                    StatusCode::BAD_REQUEST,
                    "/errors/validation-error",
                    "Validation Error",
                    "Request validation failed".to_string(),
                );
                api.errors = Some(fields);
                api
            }
            ClientError::InvalidArgument(detail) => Self::new(
                StatusCode::BAD_REQUEST,
                "/errors/invalid-argument",
                "Invalid Argument",
                detail,
            ),
            ClientError::Database(db) => Self::from_db(db),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        Self::from_db(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ProblemDetail {
            kind: self.kind,
            title: self.title,
            status: self.status.as_u16(),
            detail: self.detail,
            timestamp: Utc::now(),
            errors: self.errors,
            debug: self.debug,
        };

        let mut response = (self.status, Json(body)).into_response();
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(PROBLEM_JSON));
        response
    }
}
