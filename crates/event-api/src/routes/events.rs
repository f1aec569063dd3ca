//! # Event Records API
//!
//! CRUD over the persistence context. Every route requires a bearer token;
//! successful bodies are content-negotiated through [`Formatted`].
//!
//! ## Endpoints
//!
//! - `GET /api/events` — list events
//! - `GET /api/events/{id}` — get event
//! - `POST /api/events` — create event
//! - `PUT /api/events/{id}` — replace event
//! - `DELETE /api/events/{id}` — delete event

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use event_core::{EventFields, EventId, EventRecord};

use crate::auth::CallerIdentity;
use crate::error::{AppError, ErrorBody};
use crate::extractors::{extract_event_id, extract_validated_json, Validate, Violation};
use crate::formatter::Formatted;
use crate::pipeline::{RouteEntry, RouteTable};
use crate::state::AppState;

pub const COLLECTION_PATH: &str = "/api/events";
pub const ITEM_PATH: &str = "/api/events/{id}";

impl Validate for EventFields {
    fn validate(&self) -> Result<(), Violation> {
        if self.title.trim().is_empty() {
            return Err(Violation::new("title", "must not be empty"));
        }
        if self.end_date < self.start_date {
            return Err(Violation::new("end_date", "must not be earlier than start_date"));
        }
        if !self.registration_url.trim().is_empty() {
            url::Url::parse(self.registration_url.trim()).map_err(|e| {
                Violation::new("registration_url", format!("must be an absolute URL: {e}"))
            })?;
        }
        Ok(())
    }
}

/// Build the event routes.
pub fn routes() -> RouteTable {
    RouteTable::new()
        .route(RouteEntry::get(COLLECTION_PATH, list_events))
        .route(RouteEntry::post(COLLECTION_PATH, create_event))
        .route(RouteEntry::get(ITEM_PATH, get_event))
        .route(RouteEntry::put(ITEM_PATH, replace_event))
        .route(RouteEntry::delete(ITEM_PATH, delete_event))
}

fn not_found(id: EventId) -> AppError {
    AppError::NotFound(format!("event {id} not found"))
}

/// GET /api/events — List all events in id order.
#[utoipa::path(
    get,
    path = "/api/events",
    responses(
        (status = 200, description = "All events", body = Vec<EventRecord>),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
    ),
    tag = "events"
)]
pub(crate) async fn list_events(
    State(state): State<AppState>,
) -> Result<Formatted<Vec<EventRecord>>, AppError> {
    Ok(Formatted::ok(state.store.list()?))
}

/// GET /api/events/{id} — Get a single event.
#[utoipa::path(
    get,
    path = "/api/events/{id}",
    params(("id" = u64, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event found", body = EventRecord),
        (status = 404, description = "Event not found", body = ErrorBody),
    ),
    tag = "events"
)]
pub(crate) async fn get_event(
    State(state): State<AppState>,
    path: Result<Path<EventId>, PathRejection>,
) -> Result<Formatted<EventRecord>, AppError> {
    let id = extract_event_id(path)?;
    state
        .store
        .get(id)?
        .map(Formatted::ok)
        .ok_or_else(|| not_found(id))
}

/// POST /api/events — Create an event.
#[utoipa::path(
    post,
    path = "/api/events",
    request_body = EventFields,
    responses(
        (status = 201, description = "Event created", body = EventRecord),
        (status = 400, description = "Malformed body", body = ErrorBody),
        (status = 422, description = "Validation error", body = ErrorBody),
    ),
    tag = "events"
)]
pub(crate) async fn create_event(
    caller: CallerIdentity,
    State(state): State<AppState>,
    body: Result<Json<EventFields>, JsonRejection>,
) -> Result<Formatted<EventRecord>, AppError> {
    let fields = extract_validated_json(body)?;
    let record = state.store.insert(fields)?;
    tracing::info!(event_id = %record.id, caller = ?caller.subject, "event created");
    let location = format!("{COLLECTION_PATH}/{}", record.id);
    Ok(Formatted::created(record, location))
}

/// PUT /api/events/{id} — Replace an event's attributes.
#[utoipa::path(
    put,
    path = "/api/events/{id}",
    params(("id" = u64, Path, description = "Event ID")),
    request_body = EventFields,
    responses(
        (status = 200, description = "Event replaced", body = EventRecord),
        (status = 404, description = "Event not found", body = ErrorBody),
        (status = 422, description = "Validation error", body = ErrorBody),
    ),
    tag = "events"
)]
pub(crate) async fn replace_event(
    caller: CallerIdentity,
    State(state): State<AppState>,
    path: Result<Path<EventId>, PathRejection>,
    body: Result<Json<EventFields>, JsonRejection>,
) -> Result<Formatted<EventRecord>, AppError> {
    let id = extract_event_id(path)?;
    let fields = extract_validated_json(body)?;
    let record = state.store.replace(id, fields)?.ok_or_else(|| not_found(id))?;
    tracing::info!(event_id = %id, caller = ?caller.subject, "event replaced");
    Ok(Formatted::ok(record))
}

/// DELETE /api/events/{id} — Delete an event.
#[utoipa::path(
    delete,
    path = "/api/events/{id}",
    params(("id" = u64, Path, description = "Event ID")),
    responses(
        (status = 204, description = "Event deleted"),
        (status = 404, description = "Event not found", body = ErrorBody),
    ),
    tag = "events"
)]
pub(crate) async fn delete_event(
    caller: CallerIdentity,
    State(state): State<AppState>,
    path: Result<Path<EventId>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let id = extract_event_id(path)?;
    state.store.remove(id)?.ok_or_else(|| not_found(id))?;
    tracing::info!(event_id = %id, caller = ?caller.subject, "event deleted");
    Ok(StatusCode::NO_CONTENT)
}
