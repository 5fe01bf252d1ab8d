//! Wire types shared across the CRUD surface: the declarative query spec,
//! pagination metadata, and the uniform response envelope.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use utoipa::{IntoParams, ToSchema};

/// Recognized filter operators. Anything else fails deserialization and
/// surfaces as a 400 rather than silently returning unfiltered results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum FilterOperator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "LIKE")]
    Like,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "NOT IN")]
    NotIn,
    #[serde(rename = "BETWEEN")]
    Between,
}

/// One predicate of a query: `{"field": "age", "operator": ">=", "value": 18}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FilterCondition {
    pub field: String,
    pub operator: FilterOperator,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum SortDirection {
    #[default]
    #[serde(rename = "ASC", alias = "asc")]
    Asc,
    #[serde(rename = "DESC", alias = "desc")]
    Desc,
}

/// Sort directive. Field existence is not validated here; an unknown field
/// surfaces as a store error when the query executes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SortSpec {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

/// Declarative query: AND-combined conditions, sorts in priority order, and
/// typed eager-load relations. `P` is the per-resource preload enum, so a
/// typo'd relation name is rejected at bind time instead of reaching the
/// store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "P: DeserializeOwned"))]
pub struct QuerySpec<P> {
    #[serde(default)]
    pub conditions: Vec<FilterCondition>,
    #[serde(default)]
    pub sorts: Vec<SortSpec>,
    #[serde(default)]
    pub preloads: Vec<P>,
}

impl<P> Default for QuerySpec<P> {
    fn default() -> Self {
        Self {
            conditions: Vec::new(),
            sorts: Vec::new(),
            preloads: Vec::new(),
        }
    }
}

impl<P: DeserializeOwned> QuerySpec<P> {
    /// Parse the JSON-encoded `query` parameter of a list request. Absent
    /// means "match everything".
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the JSON is malformed, names an unknown
    /// operator, or names an unknown preload relation.
    pub fn from_param(raw: Option<&str>) -> Result<Self, crate::ApiError> {
        match raw {
            None => Ok(Self::default()),
            Some(raw) => serde_json::from_str(raw)
                .map_err(|err| crate::ApiError::invalid_input(format!("invalid query: {err}"))),
        }
    }
}

/// Query-string parameters of list endpoints. `page` and `pageSize` are
/// taken as raw strings so that non-numeric values fall back to defaults
/// instead of failing extraction.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// JSON-encoded [`QuerySpec`], e.g.
    /// `{"conditions":[{"field":"age","operator":">=","value":18}]}`.
    pub query: Option<String>,
    /// 1-based page number, defaults to 1.
    pub page: Option<String>,
    /// Page size, defaults to 10.
    #[serde(rename = "pageSize")]
    pub page_size: Option<String>,
}

/// Pagination metadata returned alongside a page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: u64,
    #[serde(rename = "pageSize")]
    pub page_size: u64,
    pub total: u64,
}

/// Uniform response envelope: `{code, message, data, page?}`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<Pagination>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            code: StatusCode::OK.as_u16(),
            message: message.into(),
            data,
            page: None,
        }
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            code: StatusCode::CREATED.as_u16(),
            message: message.into(),
            data,
            page: None,
        }
    }

    #[must_use]
    pub fn with_page(mut self, page: Pagination) -> Self {
        self.page = Some(page);
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

/// Body of the batch endpoints: `{"ids": [1, 2, 3]}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchIds {
    pub ids: Vec<i32>,
}
