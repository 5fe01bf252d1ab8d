//! Offset/limit pager on top of a built query.
//!
//! Count and fetch are two independent round-trips with no shared snapshot,
//! so `total` may be stale relative to the returned page under concurrent
//! writes. Best-effort consistency.

use sea_orm::{ConnectionTrait, EntityTrait, FromQueryResult, PaginatorTrait, QuerySelect, Select};

use crate::errors::ApiError;
use crate::models::Pagination;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Parse 1-based page and page size from raw query-string values. Anything
/// absent, non-numeric, or below 1 falls back to the 1/10 defaults.
#[must_use]
pub fn parse_page_params(page: Option<&str>, page_size: Option<&str>) -> (u64, u64) {
    (
        positive_or(page, DEFAULT_PAGE),
        positive_or(page_size, DEFAULT_PAGE_SIZE),
    )
}

fn positive_or(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|value| *value >= 1)
        .map_or(default, |value| {
            u64::try_from(value).unwrap_or(default)
        })
}

/// Count the rows matching `select`, then fetch the slice at
/// `(page - 1) * page_size` limited to `page_size`.
///
/// # Errors
///
/// Returns a store failure if either round-trip fails.
pub async fn paginate<C, E>(
    db: &C,
    select: Select<E>,
    page: u64,
    page_size: u64,
) -> Result<(Vec<E::Model>, Pagination), ApiError>
where
    C: ConnectionTrait,
    E: EntityTrait,
    E::Model: FromQueryResult + Sized + Send + Sync,
{
    let total = select
        .clone()
        .count(db)
        .await
        .map_err(ApiError::store)?;

    // page and page_size come straight from the query string; saturate and
    // stay within the store's signed integer range instead of overflowing.
    let offset = (page - 1)
        .saturating_mul(page_size)
        .min(i64::MAX.unsigned_abs());

    let rows = select
        .offset(offset)
        .limit(page_size)
        .all(db)
        .await
        .map_err(ApiError::store)?;

    Ok((
        rows,
        Pagination {
            page,
            page_size,
            total,
        },
    ))
}
