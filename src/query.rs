//! Query builder: turns a declarative [`QuerySpec`] into predicates and sort
//! clauses on a `Select`. Conditions are AND-combined only; there is no
//! OR/grouping support, which is a known expressiveness ceiling of the
//! condition list format.
//!
//! Preloads are not handled here. They are typed per resource and resolved
//! by the handlers with SeaORM's loader, after the page has been fetched.

use sea_orm::{
    Condition, EntityTrait, Order, QueryFilter, QueryOrder, Select, Value,
    sea_query::{Alias, Expr, IntoColumnRef, SimpleExpr},
};

use crate::errors::ApiError;
use crate::models::{FilterCondition, FilterOperator, QuerySpec, SortDirection, SortSpec};

/// Apply conditions and sorts from `spec` to a base select, returning the
/// augmented select. The base is consumed, never mutated in place.
///
/// # Errors
///
/// Returns `InvalidInput` when a condition's value does not fit its
/// operator (non-string `LIKE`, non-array `IN`, `BETWEEN` without exactly
/// two bounds, or a value type the store cannot bind).
pub fn apply_query_spec<E, P>(select: Select<E>, spec: &QuerySpec<P>) -> Result<Select<E>, ApiError>
where
    E: EntityTrait,
{
    let mut select = select.filter(build_condition(&spec.conditions)?);
    for sort in &spec.sorts {
        select = select.order_by(sort_expr(sort), sort_order(sort));
    }
    Ok(select)
}

/// AND-combine a condition list into a single `sea_orm::Condition`.
///
/// # Errors
///
/// Same contract as [`apply_query_spec`].
pub fn build_condition(conditions: &[FilterCondition]) -> Result<Condition, ApiError> {
    let mut combined = Condition::all();
    for condition in conditions {
        combined = combined.add(predicate(condition)?);
    }
    Ok(combined)
}

/// Sorts apply in list order (earlier = primary). Duplicate fields are both
/// forwarded; the store resolves which wins.
fn sort_expr(sort: &SortSpec) -> SimpleExpr {
    SimpleExpr::Column(Alias::new(sort.field.as_str()).into_column_ref())
}

fn sort_order(sort: &SortSpec) -> Order {
    match sort.direction {
        SortDirection::Asc => Order::Asc,
        SortDirection::Desc => Order::Desc,
    }
}

fn predicate(condition: &FilterCondition) -> Result<SimpleExpr, ApiError> {
    let field = condition.field.as_str();
    let col = || Expr::col(Alias::new(field));

    match condition.operator {
        FilterOperator::Eq => Ok(col().eq(scalar(field, &condition.value)?)),
        FilterOperator::Ne => Ok(col().ne(scalar(field, &condition.value)?)),
        FilterOperator::Gt => Ok(col().gt(scalar(field, &condition.value)?)),
        FilterOperator::Lt => Ok(col().lt(scalar(field, &condition.value)?)),
        FilterOperator::Gte => Ok(col().gte(scalar(field, &condition.value)?)),
        FilterOperator::Lte => Ok(col().lte(scalar(field, &condition.value)?)),
        FilterOperator::Like => {
            // Always substring match; case sensitivity is left to the
            // store's collation.
            let needle = condition.value.as_str().ok_or_else(|| {
                ApiError::invalid_input(format!("LIKE on '{field}' requires a string value"))
            })?;
            Ok(col().like(format!("%{needle}%")))
        }
        FilterOperator::In => Ok(col().is_in(sequence(field, &condition.value)?)),
        FilterOperator::NotIn => Ok(col().is_not_in(sequence(field, &condition.value)?)),
        FilterOperator::Between => {
            let bounds = sequence(field, &condition.value)?;
            let [low, high]: [Value; 2] = bounds.try_into().map_err(|_| {
                ApiError::invalid_input(format!(
                    "BETWEEN on '{field}' requires exactly two bounds"
                ))
            })?;
            Ok(col().between(low, high))
        }
    }
}

fn scalar(field: &str, value: &serde_json::Value) -> Result<Value, ApiError> {
    match value {
        serde_json::Value::String(s) => Ok(s.clone().into()),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i.into())
            } else if let Some(f) = n.as_f64() {
                Ok(f.into())
            } else {
                Err(ApiError::invalid_input(format!(
                    "condition on '{field}' has an out-of-range number"
                )))
            }
        }
        serde_json::Value::Bool(b) => Ok((*b).into()),
        _ => Err(ApiError::invalid_input(format!(
            "condition on '{field}' has an unsupported value type"
        ))),
    }
}

fn sequence(field: &str, value: &serde_json::Value) -> Result<Vec<Value>, ApiError> {
    let items = value.as_array().ok_or_else(|| {
        ApiError::invalid_input(format!("condition on '{field}' requires an array value"))
    })?;
    items.iter().map(|item| scalar(field, item)).collect()
}
