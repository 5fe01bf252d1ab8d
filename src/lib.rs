//! shopkit: a soft-deleting CRUD backend over Axum and SeaORM.
//!
//! The crate is organized around a generic query layer and a resource
//! surface built on top of it:
//!
//! - [`models`] holds the wire types: the response envelope, the JSON query
//!   specification (conditions, sorts, preloads), and pagination metadata.
//! - [`query`] translates a parsed specification into SeaORM predicates.
//! - [`pagination`] implements count-then-fetch page resolution.
//! - [`cache`] is a read-through cache shim over Redis that degrades to a
//!   no-op when unconfigured.
//! - [`transaction`] wraps multi-step writes with rollback-on-error.
//! - [`handlers`] and [`routes`] expose the user resource and `/metrics`.

pub mod cache;
pub mod config;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod pagination;
pub mod query;
pub mod routes;
pub mod schema;
pub mod state;
pub mod transaction;

pub use cache::Cache;
pub use errors::ApiError;
pub use models::{
    ApiResponse, FilterCondition, FilterOperator, Pagination, QuerySpec, SortDirection, SortSpec,
};
pub use state::AppState;
