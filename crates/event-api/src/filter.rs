//! # Exception Filter
//!
//! Turns a panic raised while a handler produces its response into the
//! uniform `500` error body. Handler errors that are returned rather than
//! raised go through [`AppError`](crate::error::AppError) instead; this is
//! the single translation point for faults nobody caught.

use std::any::Any;

use axum::body::Body;
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use tower_http::catch_panic::{CatchPanicLayer, ResponseForPanic};

use crate::error::ErrorBody;

const FAULT_MESSAGE: &str = "An unexpected fault occurred while processing the request";

#[derive(Debug, Clone, Copy)]
pub struct ExceptionFilter {
    /// Include the panic message under `details`. Development only.
    expose_detail: bool,
}

impl ExceptionFilter {
    pub fn new(expose_detail: bool) -> Self {
        Self { expose_detail }
    }

    pub fn layer(self) -> CatchPanicLayer<Self> {
        CatchPanicLayer::custom(self)
    }
}

fn panic_message(err: &(dyn Any + Send)) -> &str {
    if let Some(s) = err.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

impl ResponseForPanic for ExceptionFilter {
    type ResponseBody = Body;

    fn response_for_panic(&mut self, err: Box<dyn Any + Send + 'static>) -> Response<Body> {
        let message = panic_message(err.as_ref());
        tracing::error!(panic = message, "handler panicked");

        let mut body = ErrorBody::new("INTERNAL_ERROR", FAULT_MESSAGE);
        if self.expose_detail {
            body = body.with_details(json!({ "panic": message }));
        }
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
