//! # Request Extraction
//!
//! Turns axum's body and path rejections into [`AppError`]s. A body that is
//! not JSON, or JSON that does not describe the expected record, is a `400`;
//! a well-formed record that breaks a business rule ([`Validate`]) is a `422`
//! naming the offending field.

use std::fmt;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::Path;
use axum::Json;
use event_core::EventId;

use crate::error::AppError;

/// A business rule broken by one field of a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: &'static str,
    pub reason: String,
}

impl Violation {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.reason)
    }
}

impl From<Violation> for AppError {
    fn from(violation: Violation) -> Self {
        Self::Validation(violation.to_string())
    }
}

/// Business rules a request body must satisfy beyond what serde checks.
pub trait Validate {
    /// The first broken rule, if any.
    fn validate(&self) -> Result<(), Violation>;
}

fn rejection_message(rejection: &JsonRejection) -> String {
    match rejection {
        JsonRejection::JsonSyntaxError(err) => {
            format!("request body is not valid JSON: {}", err.body_text())
        }
        JsonRejection::JsonDataError(err) => {
            format!("request body does not match the record shape: {}", err.body_text())
        }
        JsonRejection::MissingJsonContentType(_) => {
            "request body must be sent as Content-Type: application/json".to_string()
        }
        other => other.body_text(),
    }
}

/// Unwrap a JSON body, mapping every rejection to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|rejection| AppError::BadRequest(rejection_message(&rejection)))
}

/// Unwrap a JSON body and check it with [`Validate`].
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate()?;
    Ok(value)
}

/// Unwrap the `{id}` segment of an event path. Non-numeric ids are a `400`.
pub fn extract_event_id(path: Result<Path<EventId>, PathRejection>) -> Result<EventId, AppError> {
    path.map(|Path(id)| id).map_err(|rejection| {
        AppError::BadRequest(format!("event id must be an unsigned integer: {}", rejection.body_text()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::{header, Request};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Ticket {
        seats: u32,
    }

    impl Validate for Ticket {
        fn validate(&self) -> Result<(), Violation> {
            if self.seats == 0 {
                return Err(Violation::new("seats", "must be at least 1"));
            }
            Ok(())
        }
    }

    async fn body(content_type: Option<&str>, raw: &str) -> Result<Json<Ticket>, JsonRejection> {
        let mut builder = Request::builder().method("POST").uri("/tickets");
        if let Some(value) = content_type {
            builder = builder.header(header::CONTENT_TYPE, value);
        }
        let request = builder.body(Body::from(raw.to_string())).unwrap();
        Json::<Ticket>::from_request(request, &()).await
    }

    fn message(err: AppError) -> String {
        match err {
            AppError::BadRequest(m) | AppError::Validation(m) => m,
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn valid_body_passes() {
        let ticket = extract_validated_json(body(Some("application/json"), r#"{"seats": 2}"#).await)
            .unwrap();
        assert_eq!(ticket.seats, 2);
    }

    #[tokio::test]
    async fn syntax_errors_are_bad_requests() {
        let err = extract_json(body(Some("application/json"), "{ seats").await).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(message(err).starts_with("request body is not valid JSON"));
    }

    #[tokio::test]
    async fn wrong_shape_is_a_bad_request() {
        let err = extract_json(body(Some("application/json"), r#"{"seats": "two"}"#).await)
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(message(err).contains("record shape"));
    }

    #[tokio::test]
    async fn missing_content_type_is_a_bad_request() {
        let err = extract_json(body(None, r#"{"seats": 2}"#).await).unwrap_err();
        assert!(message(err).contains("application/json"));
    }

    #[tokio::test]
    async fn broken_rule_is_a_validation_error_naming_the_field() {
        let err = extract_validated_json(body(Some("application/json"), r#"{"seats": 0}"#).await)
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(message(err), "seats must be at least 1");
    }
}
