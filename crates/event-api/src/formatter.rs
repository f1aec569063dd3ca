//! # Output Formatting
//!
//! Content negotiation for response bodies. Handlers return [`Formatted`],
//! which renders JSON and tags the response with the serialized payload.
//! The format stage ([`format_response`]) reads the request's `Accept`
//! header, and when it selects a formatter other than the default it
//! re-renders that payload.
//!
//! Negotiation never fails the request: no acceptable formatter, or a
//! formatter that cannot represent the payload, leaves the default JSON
//! body in place.

use std::cmp::Ordering;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::error::AppError;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("payload has no fields to render as columns")]
    NoColumns,

    #[error("csv encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("flushing output failed: {0}")]
    Flush(String),
}

// ── Media ranges ────────────────────────────────────────────────────────────

/// One entry of an `Accept` header, e.g. `text/csv;q=0.8`.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRange {
    pub kind: String,
    pub subtype: String,
    pub quality: f32,
}

impl MediaRange {
    /// Parse one range. Returns `None` for entries without a `/`.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(';');
        let essence = parts.next()?.trim();
        let (kind, subtype) = essence.split_once('/')?;
        if kind.is_empty() || subtype.is_empty() {
            return None;
        }
        let quality = parts
            .filter_map(|p| p.trim().strip_prefix("q="))
            .find_map(|q| q.trim().parse::<f32>().ok())
            .map_or(1.0, |q| q.clamp(0.0, 1.0));
        Some(Self {
            kind: kind.trim().to_ascii_lowercase(),
            subtype: subtype.trim().to_ascii_lowercase(),
            quality,
        })
    }

    /// Acceptable ranges from an `Accept` header value, best first. Ranges
    /// with `q=0` are dropped; equal qualities keep header order.
    pub fn parse_accept(accept: &str) -> Vec<Self> {
        let mut ranges: Vec<Self> = accept
            .split(',')
            .filter_map(Self::parse)
            .filter(|r| r.quality > 0.0)
            .collect();
        ranges.sort_by(|a, b| b.quality.partial_cmp(&a.quality).unwrap_or(Ordering::Equal));
        ranges
    }

    /// Whether this range covers `essence` (`type/subtype`, no parameters).
    pub fn matches(&self, essence: &str) -> bool {
        let Some((kind, subtype)) = essence.split_once('/') else {
            return false;
        };
        match (self.kind.as_str(), self.subtype.as_str()) {
            ("*", "*") => true,
            (k, "*") => k.eq_ignore_ascii_case(kind),
            (k, s) => k.eq_ignore_ascii_case(kind) && s.eq_ignore_ascii_case(subtype),
        }
    }
}

// ── Formatters ──────────────────────────────────────────────────────────────

/// Renders a serialized payload in one representation.
pub trait OutputFormatter: Send + Sync {
    /// `Content-Type` of the rendered body.
    fn media_type(&self) -> &'static str;

    fn supports(&self, range: &MediaRange) -> bool;

    fn write(&self, payload: &Value) -> Result<Vec<u8>, FormatError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn media_type(&self) -> &'static str {
        "application/json"
    }

    fn supports(&self, range: &MediaRange) -> bool {
        range.matches("application/json") || range.matches("text/json")
    }

    fn write(&self, payload: &Value) -> Result<Vec<u8>, FormatError> {
        Ok(serde_json::to_vec(payload)?)
    }
}

/// Delimited text: a header row of field names, then one row per record.
///
/// An array renders one row per element and a single object renders one
/// row. Nested objects flatten to dotted column names (`venue.city`), nulls
/// become empty cells, and arrays nested inside a record are written as
/// JSON text. Columns follow first-seen field order.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvFormatter;

impl CsvFormatter {
    fn flatten(prefix: Option<&str>, value: &Value, row: &mut Vec<(String, String)>) {
        match value {
            Value::Object(map) => {
                for (key, nested) in map {
                    let column = match prefix {
                        Some(p) => format!("{p}.{key}"),
                        None => key.clone(),
                    };
                    Self::flatten(Some(&column), nested, row);
                }
            }
            scalar => {
                let column = prefix.unwrap_or("value").to_string();
                row.push((column, Self::cell(scalar)));
            }
        }
    }

    fn cell(value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            other => other.to_string(),
        }
    }
}

impl OutputFormatter for CsvFormatter {
    fn media_type(&self) -> &'static str {
        "text/csv; charset=utf-8"
    }

    fn supports(&self, range: &MediaRange) -> bool {
        range.kind != "*" && range.matches("text/csv")
    }

    fn write(&self, payload: &Value) -> Result<Vec<u8>, FormatError> {
        let records: Vec<&Value> = match payload {
            Value::Array(items) => items.iter().collect(),
            single => vec![single],
        };

        let rows: Vec<Vec<(String, String)>> = records
            .into_iter()
            .map(|record| {
                let mut row = Vec::new();
                Self::flatten(None, record, &mut row);
                row
            })
            .collect();

        let mut columns: Vec<&str> = Vec::new();
        for (column, _) in rows.iter().flatten() {
            if !columns.contains(&column.as_str()) {
                columns.push(column);
            }
        }
        if columns.is_empty() {
            return Err(FormatError::NoColumns);
        }

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&columns)?;
        for row in &rows {
            writer.write_record(columns.iter().map(|column| {
                row.iter()
                    .find(|(name, _)| name == column)
                    .map_or("", |(_, cell)| cell.as_str())
            }))?;
        }
        writer
            .into_inner()
            .map_err(|e| FormatError::Flush(e.to_string()))
    }
}

// ── Registry ────────────────────────────────────────────────────────────────

/// Ordered formatters. The first one is the default.
#[derive(Clone)]
pub struct FormatterRegistry {
    formatters: Vec<Arc<dyn OutputFormatter>>,
}

impl std::fmt::Debug for FormatterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.formatters.iter().map(|fmt| fmt.media_type()))
            .finish()
    }
}

impl Default for FormatterRegistry {
    /// JSON first, then CSV.
    fn default() -> Self {
        Self::new(JsonFormatter).with(CsvFormatter)
    }
}

impl FormatterRegistry {
    pub fn new(default: impl OutputFormatter + 'static) -> Self {
        Self {
            formatters: vec![Arc::new(default)],
        }
    }

    pub fn with(mut self, formatter: impl OutputFormatter + 'static) -> Self {
        self.formatters.push(Arc::new(formatter));
        self
    }

    pub fn default_formatter(&self) -> &dyn OutputFormatter {
        self.formatters[0].as_ref()
    }

    fn position(&self, accept: Option<&str>) -> usize {
        let Some(accept) = accept else {
            return 0;
        };
        MediaRange::parse_accept(accept)
            .iter()
            .find_map(|range| self.formatters.iter().position(|f| f.supports(range)))
            .unwrap_or(0)
    }

    /// Pick the formatter for an `Accept` header value.
    pub fn negotiate(&self, accept: Option<&str>) -> &dyn OutputFormatter {
        self.formatters[self.position(accept)].as_ref()
    }
}

// ── Handler return type ─────────────────────────────────────────────────────

/// Serialized body carried on the response for the format stage.
#[derive(Debug, Clone)]
pub struct Payload(pub Arc<Value>);

/// Handler return type for content-negotiated bodies.
#[derive(Debug)]
pub struct Formatted<T> {
    status: StatusCode,
    location: Option<String>,
    body: T,
}

impl<T> Formatted<T> {
    pub fn ok(body: T) -> Self {
        Self {
            status: StatusCode::OK,
            location: None,
            body,
        }
    }

    /// `201 Created` pointing at `location`.
    pub fn created(body: T, location: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CREATED,
            location: Some(location.into()),
            body,
        }
    }
}

impl<T: Serialize> IntoResponse for Formatted<T> {
    fn into_response(self) -> Response {
        let value = match serde_json::to_value(&self.body) {
            Ok(value) => value,
            Err(e) => {
                return AppError::Internal(format!("response serialization failed: {e}"))
                    .into_response()
            }
        };
        let mut response = (self.status, Json(&value)).into_response();
        if let Some(location) = self.location.and_then(|l| HeaderValue::from_str(&l).ok()) {
            response.headers_mut().insert(header::LOCATION, location);
        }
        response.extensions_mut().insert(Payload(Arc::new(value)));
        response
    }
}

// ── Format stage ────────────────────────────────────────────────────────────

fn accept_header(headers: &HeaderMap) -> Option<String> {
    let values: Vec<&str> = headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    (!values.is_empty()).then(|| values.join(","))
}

/// Format stage: re-render [`Formatted`] payloads for the negotiated
/// representation. Every negotiable response carries `Vary: Accept`.
/// Responses without a payload (errors, empty bodies) pass through untouched.
pub async fn format_response(
    State(registry): State<Arc<FormatterRegistry>>,
    request: Request,
    next: Next,
) -> Response {
    let accept = accept_header(request.headers());
    let position = registry.position(accept.as_deref());

    let mut response = next.run(request).await;
    let Some(Payload(payload)) = response.extensions_mut().remove::<Payload>() else {
        return response;
    };
    response
        .headers_mut()
        .append(header::VARY, HeaderValue::from_static("accept"));
    if position == 0 {
        return response;
    }

    let formatter = registry.formatters[position].as_ref();
    match formatter.write(&payload) {
        Ok(bytes) => {
            let headers = response.headers_mut();
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static(formatter.media_type()),
            );
            headers.remove(header::CONTENT_LENGTH);
            *response.body_mut() = Body::from(bytes);
            response
        }
        Err(err) => {
            tracing::warn!(
                media_type = formatter.media_type(),
                error = %err,
                "formatter failed, sending default representation"
            );
            response
        }
    }
}
