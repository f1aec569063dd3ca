//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented event routes into one OpenAPI document,
//! served at `/swagger/v1/swagger.json` with a Swagger UI page at
//! `/swagger/index.html`. Both are mounted in development mode only.

use axum::response::{Html, Redirect};
use axum::Json;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::pipeline::{RouteEntry, RouteTable};

pub const DOCUMENT_PATH: &str = "/swagger/v1/swagger.json";
pub const UI_PATH: &str = "/swagger/index.html";

/// Name of the bearer security scheme in the document.
pub const BEARER_SCHEME: &str = "bearer_auth";

/// Assembled OpenAPI document for the Event API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Event API",
        version = "v1",
        description = "Event records behind JWT bearer authentication. Responses are JSON by default; send `Accept: text/csv` for delimited text.",
        contact(name = "Rajni", email = "rajni@gmail.com")
    ),
    paths(
        crate::routes::events::list_events,
        crate::routes::events::get_event,
        crate::routes::events::create_event,
        crate::routes::events::replace_event,
        crate::routes::events::delete_event,
    ),
    components(schemas(
        event_core::EventId,
        event_core::EventRecord,
        event_core::EventFields,
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
    )),
    modifiers(&SecurityAddon),
    security(("bearer_auth" = [])),
    tags((name = "events", description = "Event records"))
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            BEARER_SCHEME,
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Documentation routes. Anonymous, and only mounted in development.
pub fn routes() -> RouteTable {
    RouteTable::new()
        .route(RouteEntry::get(DOCUMENT_PATH, swagger_json).anonymous())
        .route(RouteEntry::get(UI_PATH, swagger_ui).anonymous())
        .route(RouteEntry::get("/swagger", swagger_redirect).anonymous())
}

async fn swagger_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn swagger_ui() -> Html<&'static str> {
    Html(SWAGGER_UI_PAGE)
}

async fn swagger_redirect() -> Redirect {
    Redirect::permanent(UI_PATH)
}

const SWAGGER_UI_PAGE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <title>Event API</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js" crossorigin></script>
  <script>
    window.onload = () => {
      window.ui = SwaggerUIBundle({
        url: "/swagger/v1/swagger.json",
        dom_id: "#swagger-ui",
        persistAuthorization: true,
      });
    };
  </script>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use super::*;

    fn document_json() -> serde_json::Value {
        serde_json::to_value(ApiDoc::openapi()).unwrap()
    }

    #[test]
    fn document_lists_event_routes() {
        let doc = document_json();
        let paths = doc["paths"].as_object().unwrap();
        assert!(paths.contains_key("/api/events"));
        assert!(paths.contains_key("/api/events/{id}"));

        let item = &paths["/api/events/{id}"];
        for method in ["get", "put", "delete"] {
            assert!(item.get(method).is_some(), "missing {method}");
        }
        assert!(paths["/api/events"].get("post").is_some());
    }

    #[test]
    fn document_has_title_and_version() {
        let doc = document_json();
        assert_eq!(doc["info"]["title"], "Event API");
        assert_eq!(doc["info"]["version"], "v1");
    }

    #[test]
    fn bearer_scheme_is_declared() {
        let doc = document_json();
        let scheme = &doc["components"]["securitySchemes"][BEARER_SCHEME];
        assert_eq!(scheme["type"], "http");
        assert_eq!(scheme["scheme"], "bearer");
        assert_eq!(scheme["bearerFormat"], "JWT");
    }

    #[test]
    fn event_schemas_are_registered() {
        let doc = document_json();
        let schemas = doc["components"]["schemas"].as_object().unwrap();
        for name in ["EventRecord", "EventFields", "ErrorBody"] {
            assert!(schemas.contains_key(name), "missing schema {name}");
        }
    }

    #[test]
    fn ui_page_points_at_document() {
        assert!(SWAGGER_UI_PAGE.contains(DOCUMENT_PATH));
        assert!(SWAGGER_UI_PAGE.contains(r##"dom_id: "#swagger-ui""##));
        assert!(SWAGGER_UI_PAGE.trim_end().ends_with("</html>"));
    }

    #[test]
    fn documentation_routes_are_anonymous() {
        let table = routes();
        assert_eq!(table.len(), 3);
        assert!(table
            .iter()
            .all(|r| r.access == crate::pipeline::Access::Anonymous));
    }
}
