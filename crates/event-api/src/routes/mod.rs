//! # Route Table
//!
//! The explicit list of routes the application serves. Documentation routes
//! are only part of the table in development.

pub mod events;

use crate::config::Environment;
use crate::openapi;
use crate::pipeline::RouteTable;

/// All routes for `environment`.
pub fn table(environment: Environment) -> RouteTable {
    let table = events::routes();
    if environment.is_development() {
        table.merge(openapi::routes())
    } else {
        table
    }
}
