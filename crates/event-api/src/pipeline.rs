//! # Request Pipeline
//!
//! Assembles the route table and the cross-cutting stages into one router.
//! Every request passes the stages in [`REQUEST_PIPELINE`] order, outermost
//! first:
//!
//! ```text
//! Cors → Authentication → Format → ExceptionFilter → handler
//! ```
//!
//! Per-request states: Received → CORS-Checked → Authenticated →
//! Dispatched → Formatted → Sent. A preflight is answered at CORS-Checked,
//! a bad token is rejected at Authenticated (401), and a handler fault is
//! turned into a 500 by the exception filter. Documentation routes are
//! [`Access::Anonymous`] and skip authentication.
//!
//! Requests that match no route still pass the default CORS policy and
//! authentication before receiving a uniform 404. A known path called with
//! an unsupported method gets a uniform 405 through the same stages, with
//! the `Allow` header listing the routed methods.

use std::sync::Arc;

use axum::handler::Handler;
use axum::http::{Method, Uri};
use axum::middleware::from_fn_with_state;
use axum::routing::{any, MethodRouter};
use axum::Router;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{authenticate, JwtValidator};
use crate::cors::CorsPolicies;
use crate::error::AppError;
use crate::filter::ExceptionFilter;
use crate::formatter::{format_response, FormatterRegistry};
use crate::state::AppState;

/// A cross-cutting request stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Cors,
    Authentication,
    Format,
    ExceptionFilter,
}

/// Stage order, outermost first.
pub const REQUEST_PIPELINE: [Stage; 4] = [
    Stage::Cors,
    Stage::Authentication,
    Stage::Format,
    Stage::ExceptionFilter,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// A valid bearer token is required.
    Authenticated,
    /// Authentication is skipped.
    Anonymous,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("routes on {path} disagree on CORS policy: {first} vs {second}")]
    ConflictingCors {
        path: String,
        first: String,
        second: String,
    },

    #[error("{method} {path} is registered twice")]
    DuplicateRoute { method: Method, path: String },
}

// ── Route table ─────────────────────────────────────────────────────────────

/// One entry of the route table.
#[derive(Debug)]
pub struct RouteEntry {
    pub method: Method,
    pub path: String,
    pub access: Access,
    /// Named CORS policy; `None` uses the process default.
    pub cors_policy: Option<String>,
    handler: MethodRouter<AppState>,
}

impl RouteEntry {
    fn new(method: Method, path: &str, handler: MethodRouter<AppState>) -> Self {
        Self {
            method,
            path: path.to_string(),
            access: Access::Authenticated,
            cors_policy: None,
            handler,
        }
    }

    pub fn get<H, T>(path: &str, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        Self::new(Method::GET, path, axum::routing::get(handler))
    }

    pub fn post<H, T>(path: &str, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        Self::new(Method::POST, path, axum::routing::post(handler))
    }

    pub fn put<H, T>(path: &str, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        Self::new(Method::PUT, path, axum::routing::put(handler))
    }

    pub fn delete<H, T>(path: &str, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        Self::new(Method::DELETE, path, axum::routing::delete(handler))
    }

    pub fn anonymous(mut self) -> Self {
        self.access = Access::Anonymous;
        self
    }

    pub fn with_cors_policy(mut self, name: impl Into<String>) -> Self {
        self.cors_policy = Some(name.into());
        self
    }
}

/// Ordered list of routes served by the application.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, entry: RouteEntry) -> Self {
        self.routes.push(entry);
        self
    }

    pub fn merge(mut self, other: RouteTable) -> Self {
        self.routes.extend(other.routes);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteEntry> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

// ── Assembly ────────────────────────────────────────────────────────────────

/// Everything the stages need, built once by the composition root.
#[derive(Debug, Clone)]
pub struct PipelineComponents {
    pub validator: JwtValidator,
    pub formatters: Arc<FormatterRegistry>,
    pub cors: Arc<CorsPolicies>,
    pub filter: ExceptionFilter,
}

impl PipelineComponents {
    /// Wrap `route` in every stage of [`REQUEST_PIPELINE`], applying the
    /// innermost stage first.
    fn stage(
        &self,
        mut route: MethodRouter<AppState>,
        access: Access,
        cors: &CorsLayer,
    ) -> MethodRouter<AppState> {
        for stage in REQUEST_PIPELINE.iter().rev() {
            route = match stage {
                Stage::ExceptionFilter => route.layer(self.filter.layer()),
                Stage::Format => {
                    route.layer(from_fn_with_state(self.formatters.clone(), format_response))
                }
                Stage::Authentication => match access {
                    Access::Authenticated => {
                        route.layer(from_fn_with_state(self.validator.clone(), authenticate))
                    }
                    Access::Anonymous => route,
                },
                Stage::Cors => route.layer(cors.clone()),
            };
        }
        route
    }
}

struct PathGroup {
    path: String,
    policy: String,
    methods: Vec<Method>,
    router: MethodRouter<AppState>,
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("no route for {}", uri.path()))
}

async fn method_not_allowed(method: Method, uri: Uri) -> AppError {
    AppError::MethodNotAllowed(format!("{method} is not supported on {}", uri.path()))
}

/// Build the application router from `table`.
///
/// Fails when two routes share a method and path, or when routes on the
/// same path resolve to different CORS policies.
pub fn assemble(
    components: &PipelineComponents,
    state: AppState,
    table: RouteTable,
) -> Result<Router, PipelineError> {
    let mut groups: Vec<PathGroup> = Vec::new();

    for entry in table.routes {
        let policy = components
            .cors
            .effective_name(entry.cors_policy.as_deref())
            .to_string();
        let cors = components.cors.resolve(Some(policy.as_str())).layer();
        let staged = components.stage(entry.handler, entry.access, &cors);

        match groups.iter_mut().find(|g| g.path == entry.path) {
            Some(group) => {
                if group.policy != policy {
                    return Err(PipelineError::ConflictingCors {
                        path: entry.path,
                        first: group.policy.clone(),
                        second: policy,
                    });
                }
                if group.methods.contains(&entry.method) {
                    return Err(PipelineError::DuplicateRoute {
                        method: entry.method,
                        path: entry.path,
                    });
                }
                group.methods.push(entry.method);
                let merged = std::mem::replace(&mut group.router, MethodRouter::new());
                group.router = merged.merge(staged);
            }
            None => {
                // One fallback per path; axum refuses to merge two.
                let fallback = components.stage(
                    MethodRouter::new().fallback(method_not_allowed),
                    Access::Authenticated,
                    &cors,
                );
                groups.push(PathGroup {
                    path: entry.path,
                    policy,
                    methods: vec![entry.method],
                    router: fallback.merge(staged),
                });
            }
        }
    }

    let mut router = Router::new();
    for group in groups {
        tracing::debug!(
            path = %group.path,
            methods = ?group.methods,
            cors_policy = %group.policy,
            "mounted route"
        );
        router = router.route(&group.path, group.router);
    }

    let default_cors = components.cors.resolve(None).layer();
    let fallback = components.stage(any(not_found), Access::Authenticated, &default_cors);

    Ok(router
        .fallback(fallback)
        .with_state(state)
        .layer(TraceLayer::new_for_http()))
}
