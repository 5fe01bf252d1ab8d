//! Operation handlers for the `/users` surface and `/metrics`.
//!
//! Every handler follows the same state machine: bind, validate the id
//! (path-scoped routes), existence-check (update), execute — inside a
//! transaction for multi-step writes — invalidate the cache key it touched,
//! respond with the envelope. The first failing step short-circuits into an
//! error response.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DbBackend, EntityTrait, IntoActiveModel, LoaderTrait, ModelTrait, QueryFilter,
    sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::cache::Cache;
use crate::entities::{profile, tag, user, user_tag};
use crate::errors::ApiError;
use crate::models::{ApiResponse, BatchIds, ListParams, QuerySpec};
use crate::pagination::{paginate, parse_page_params};
use crate::query::apply_query_spec;
use crate::state::AppState;
use crate::transaction::with_transaction;

const USER_RESOURCE: &str = "user";

/// Relations of the user resource that can be eagerly loaded. Typed, so a
/// typo'd relation name is a 400 at bind time instead of a store error at
/// execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserPreload {
    #[serde(alias = "Profile")]
    Profile,
    #[serde(alias = "Tags")]
    Tags,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ProfilePayload {
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub bio: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TagPayload {
    pub name: String,
}

/// Cascade-create payload: user plus profile plus tags, all-or-nothing.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserPayload {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Age", default)]
    pub age: i32,
    #[serde(default)]
    pub profile: Option<ProfilePayload>,
    #[serde(default)]
    pub tags: Vec<TagPayload>,
}

/// Update payload. Absent fields keep their stored values; a present `tags`
/// list replaces the full tag set.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserPayload {
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Age")]
    pub age: Option<i32>,
    pub tags: Option<Vec<TagPayload>>,
}

/// User record with its optional preloaded relations. This is also what the
/// cache stores for single-record reads.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: user::Model,
    #[serde(rename = "Profile", default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<profile::Model>,
    #[serde(rename = "Tags", default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<tag::Model>>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GetUserParams {
    /// Read past the soft-delete boundary. Unscoped reads bypass the cache.
    #[serde(default)]
    pub include_deleted: bool,
}

/// `POST /users` — transactional cascade create of user, profile, and tags.
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserPayload>, JsonRejection>,
) -> Result<ApiResponse<UserDetail>, ApiError> {
    let payload = bind(payload)?;

    let detail = with_transaction(&state.db, "create_user", move |txn| {
        Box::pin(async move {
            let now = Utc::now();
            let created = user::ActiveModel {
                name: Set(payload.name),
                age: Set(payload.age),
                created_at: Set(now),
                updated_at: Set(now),
                deleted_at: Set(None),
                ..Default::default()
            }
            .insert(txn)
            .await
            .map_err(ApiError::store)?;

            let profile_payload = payload.profile.unwrap_or_default();
            let created_profile = profile::ActiveModel {
                user_id: Set(created.id),
                avatar: Set(profile_payload.avatar),
                bio: Set(profile_payload.bio),
                created_at: Set(now),
                updated_at: Set(now),
                deleted_at: Set(None),
                ..Default::default()
            }
            .insert(txn)
            .await
            .map_err(ApiError::store)?;

            let tags = replace_tags(txn, created.id, &payload.tags).await?;

            Ok(UserDetail {
                user: created,
                profile: Some(created_profile),
                tags: Some(tags),
            })
        })
    })
    .await?;

    tracing::info!(operation = "create_user", id = detail.user.id, "user created");
    Ok(ApiResponse::created("created", detail))
}

/// `GET /users` — filtered, sorted, paginated list. Soft-deleted users are
/// excluded; the cache is never consulted on this path.
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<ApiResponse<Vec<UserDetail>>, ApiError> {
    let spec: QuerySpec<UserPreload> = QuerySpec::from_param(params.query.as_deref())?;
    let (page, page_size) = parse_page_params(params.page.as_deref(), params.page_size.as_deref());

    let select = user::Entity::find().filter(user::Column::DeletedAt.is_null());
    let select = apply_query_spec(select, &spec)?;
    let (users, pagination) = paginate(&state.db, select, page, page_size).await?;

    let profiles = if spec.preloads.contains(&UserPreload::Profile) {
        Some(
            users
                .load_one(profile::Entity, &state.db)
                .await
                .map_err(ApiError::store)?,
        )
    } else {
        None
    };
    let tags = if spec.preloads.contains(&UserPreload::Tags) {
        Some(
            users
                .load_many_to_many(tag::Entity, user_tag::Entity, &state.db)
                .await
                .map_err(ApiError::store)?,
        )
    } else {
        None
    };

    let items = users
        .into_iter()
        .enumerate()
        .map(|(index, found)| UserDetail {
            user: found,
            profile: profiles
                .as_ref()
                .and_then(|loaded| loaded.get(index).cloned().flatten()),
            tags: tags
                .as_ref()
                .map(|loaded| loaded.get(index).cloned().unwrap_or_default()),
        })
        .collect();

    tracing::info!(
        operation = "list_users",
        page = pagination.page,
        total = pagination.total,
        "users listed"
    );
    Ok(ApiResponse::ok("ok", items).with_page(pagination))
}

/// `GET /users/:id` — cached single-record read with profile and tags.
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<GetUserParams>,
) -> Result<ApiResponse<UserDetail>, ApiError> {
    let id = parse_id(&id)?;
    let key = Cache::key(USER_RESOURCE, id);

    if !params.include_deleted {
        if let Some(detail) = state.cache.get_json::<UserDetail>(&key).await {
            return Ok(ApiResponse::ok("ok (cached)", detail));
        }
    }

    let mut select = user::Entity::find_by_id(id);
    if !params.include_deleted {
        select = select.filter(user::Column::DeletedAt.is_null());
    }
    let found = select
        .one(&state.db)
        .await
        .map_err(ApiError::store)?
        .ok_or_else(|| ApiError::not_found(USER_RESOURCE, Some(id.to_string())))?;

    let detail = load_detail(&state.db, found).await?;

    if !params.include_deleted {
        state.cache.set_json(&key, &detail).await;
    }

    tracing::info!(operation = "get_user", id, "user fetched");
    Ok(ApiResponse::ok("ok", detail))
}

/// `PUT /users/:id` — full update plus tag-set replace, transactional, with
/// synchronous cache invalidation before responding.
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUserPayload>, JsonRejection>,
) -> Result<ApiResponse<UserDetail>, ApiError> {
    let id = parse_id(&id)?;
    let payload = bind(payload)?;

    // Existence check honors the soft-delete boundary, like the default read.
    let existing = user::Entity::find_by_id(id)
        .filter(user::Column::DeletedAt.is_null())
        .one(&state.db)
        .await
        .map_err(ApiError::store)?
        .ok_or_else(|| ApiError::not_found(USER_RESOURCE, Some(id.to_string())))?;

    let detail = with_transaction(&state.db, "update_user", move |txn| {
        Box::pin(async move {
            let mut active = existing.into_active_model();
            if let Some(name) = payload.name {
                active.name = Set(name);
            }
            if let Some(age) = payload.age {
                active.age = Set(age);
            }
            active.updated_at = Set(Utc::now());
            let updated = active.update(txn).await.map_err(ApiError::store)?;

            let tags = match payload.tags {
                Some(tags) => replace_tags(txn, updated.id, &tags).await?,
                None => updated
                    .find_related(tag::Entity)
                    .all(txn)
                    .await
                    .map_err(ApiError::store)?,
            };
            let loaded_profile = updated
                .find_related(profile::Entity)
                .one(txn)
                .await
                .map_err(ApiError::store)?;

            Ok(UserDetail {
                user: updated,
                profile: loaded_profile,
                tags: Some(tags),
            })
        })
    })
    .await?;

    state.cache.invalidate(&Cache::key(USER_RESOURCE, id)).await;
    tracing::info!(operation = "update_user", id, "user updated");
    Ok(ApiResponse::ok("updated", detail))
}

/// `DELETE /users/:id` — soft delete. Tags are deliberately not cascaded.
/// Deleting an already soft-deleted user affects zero rows and is a 404.
pub async fn soft_delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Option<()>>, ApiError> {
    let id = parse_id(&id)?;

    let result = user::Entity::update_many()
        .col_expr(user::Column::DeletedAt, Expr::value(Utc::now()))
        .filter(user::Column::Id.eq(id))
        .filter(user::Column::DeletedAt.is_null())
        .exec(&state.db)
        .await
        .map_err(ApiError::store)?;

    if result.rows_affected == 0 {
        return Err(ApiError::not_found(USER_RESOURCE, Some(id.to_string())));
    }

    state.cache.invalidate(&Cache::key(USER_RESOURCE, id)).await;
    tracing::info!(operation = "soft_delete_user", id, "user soft deleted");
    Ok(ApiResponse::ok("deleted", None))
}

/// `PUT /users/:id/restore` — clear the soft-delete marker. Restoring an
/// already-active user is a no-op success; the marker is all that comes
/// back, not any state the record's associations lost while hidden.
pub async fn restore_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Option<()>>, ApiError> {
    let id = parse_id(&id)?;

    let result = user::Entity::update_many()
        .col_expr(
            user::Column::DeletedAt,
            Expr::value(Option::<chrono::DateTime<Utc>>::None),
        )
        .filter(user::Column::Id.eq(id))
        .exec(&state.db)
        .await
        .map_err(ApiError::store)?;

    if result.rows_affected == 0 {
        return Err(ApiError::not_found(USER_RESOURCE, Some(id.to_string())));
    }

    state.cache.invalidate(&Cache::key(USER_RESOURCE, id)).await;
    tracing::info!(operation = "restore_user", id, "user restored");
    Ok(ApiResponse::ok("restored", None))
}

/// `DELETE /users/batch/:action` — batch verb dispatch. Only `hard` is
/// routed; anything else is an unsupported operation. Hard delete bypasses
/// the soft-delete marker, removes join and profile rows, and is
/// irreversible.
pub async fn batch_delete_users(
    State(state): State<AppState>,
    Path(action): Path<String>,
    payload: Result<Json<BatchIds>, JsonRejection>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    if action != "hard" {
        return Err(ApiError::unsupported_operation(action));
    }
    let BatchIds { ids } = bind(payload)?;

    let (affected, ids) = with_transaction(&state.db, "batch_hard_delete", move |txn| {
        Box::pin(async move {
            user_tag::Entity::delete_many()
                .filter(user_tag::Column::UserId.is_in(ids.clone()))
                .exec(txn)
                .await
                .map_err(ApiError::store)?;

            profile::Entity::delete_many()
                .filter(profile::Column::UserId.is_in(ids.clone()))
                .exec(txn)
                .await
                .map_err(ApiError::store)?;

            let result = user::Entity::delete_many()
                .filter(user::Column::Id.is_in(ids.clone()))
                .exec(txn)
                .await
                .map_err(ApiError::store)?;

            Ok((result.rows_affected, ids))
        })
    })
    .await?;

    for id in &ids {
        state.cache.invalidate(&Cache::key(USER_RESOURCE, *id)).await;
    }

    tracing::info!(operation = "batch_hard_delete", affected, "batch hard delete complete");
    Ok(ApiResponse::ok(
        "batch operation complete",
        serde_json::json!({ "affected": affected }),
    ))
}

/// `GET /metrics` — store pool counters plus the cache backend's raw
/// status report.
pub async fn metrics(
    State(state): State<AppState>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let database = pool_report(&state.db, state.max_connections);
    let cache = state.cache.status().await;
    Ok(ApiResponse::ok(
        "ok",
        serde_json::json!({ "database": database, "cache": cache }),
    ))
}

fn bind<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(ApiError::invalid_input(format!(
            "invalid body: {}",
            rejection.body_text()
        ))),
    }
}

fn parse_id(raw: &str) -> Result<i32, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::invalid_input(format!("invalid id '{raw}'")))
}

async fn load_detail<C: ConnectionTrait>(db: &C, found: user::Model) -> Result<UserDetail, ApiError> {
    let loaded_profile = found
        .find_related(profile::Entity)
        .one(db)
        .await
        .map_err(ApiError::store)?;
    let tags = found
        .find_related(tag::Entity)
        .all(db)
        .await
        .map_err(ApiError::store)?;
    Ok(UserDetail {
        user: found,
        profile: loaded_profile,
        tags: Some(tags),
    })
}

/// Replace a user's tag set: drop existing join rows, then find-or-create
/// each named tag and attach it. Duplicate names within one payload are
/// attached once.
async fn replace_tags<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    tags: &[TagPayload],
) -> Result<Vec<tag::Model>, ApiError> {
    user_tag::Entity::delete_many()
        .filter(user_tag::Column::UserId.eq(user_id))
        .exec(db)
        .await
        .map_err(ApiError::store)?;

    let mut attached: Vec<tag::Model> = Vec::with_capacity(tags.len());
    for tag_payload in tags {
        let found = find_or_create_tag(db, &tag_payload.name).await?;
        if attached.iter().any(|existing| existing.id == found.id) {
            continue;
        }
        user_tag::Entity::insert(user_tag::ActiveModel {
            user_id: Set(user_id),
            tag_id: Set(found.id),
        })
        .exec_without_returning(db)
        .await
        .map_err(ApiError::store)?;
        attached.push(found);
    }
    Ok(attached)
}

async fn find_or_create_tag<C: ConnectionTrait>(db: &C, name: &str) -> Result<tag::Model, ApiError> {
    if let Some(existing) = tag::Entity::find()
        .filter(tag::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(ApiError::store)?
    {
        return Ok(existing);
    }

    let now = Utc::now();
    tag::ActiveModel {
        name: Set(name.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(ApiError::store)
}

fn pool_report(db: &DatabaseConnection, max_connections: u32) -> serde_json::Value {
    #[cfg(feature = "sqlite")]
    if db.get_database_backend() == DbBackend::Sqlite {
        let pool = db.get_sqlite_connection_pool();
        return pool_counters(max_connections, pool.size(), pool.num_idle());
    }
    #[cfg(feature = "postgresql")]
    if db.get_database_backend() == DbBackend::Postgres {
        let pool = db.get_postgres_connection_pool();
        return pool_counters(max_connections, pool.size(), pool.num_idle());
    }
    #[cfg(feature = "mysql")]
    if db.get_database_backend() == DbBackend::MySql {
        let pool = db.get_mysql_connection_pool();
        return pool_counters(max_connections, pool.size(), pool.num_idle());
    }
    serde_json::json!("pool statistics unavailable for this backend")
}

/// The sqlx pool does not expose acquire-wait counters, so the report is
/// limited to the connection counts it can observe.
fn pool_counters(max_open: u32, open: u32, idle: usize) -> serde_json::Value {
    let idle = u32::try_from(idle).unwrap_or(u32::MAX);
    serde_json::json!({
        "max_open_connections": max_open,
        "open_connections": open,
        "in_use": open.saturating_sub(idle),
        "idle": idle,
    })
}
