use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    error::ApiError,
    extract::Json,
    labels::dto::{LabelListQuery, LabelOut, UpdateLabelRequest},
    labels::repo::{self, LabelKind},
    state::AppState,
};

pub fn tag_routes() -> Router<AppState> {
    Router::new()
        .route("/tags", get(list_tags))
        .route(
            "/tags/:id",
            axum::routing::put(update_tag)
                .patch(update_tag)
                .delete(delete_tag),
        )
}

pub fn ingredient_routes() -> Router<AppState> {
    Router::new()
        .route("/ingredients", get(list_ingredients))
        .route(
            "/ingredients/:id",
            axum::routing::put(update_ingredient)
                .patch(update_ingredient)
                .delete(delete_ingredient),
        )
}

async fn list_labels(
    state: AppState,
    user_id: Uuid,
    query: LabelListQuery,
    kind: LabelKind,
) -> Result<Json<Vec<LabelOut>>, ApiError> {
    let labels = repo::list_for_user(&state.db, kind, user_id, query.assigned_only()).await?;
    Ok(Json(labels.into_iter().map(LabelOut::from).collect()))
}

async fn update_label(
    state: AppState,
    user_id: Uuid,
    id: Uuid,
    payload: UpdateLabelRequest,
    kind: LabelKind,
) -> Result<Json<LabelOut>, ApiError> {
    if payload.name.is_empty() {
        return Err(ApiError::Validation("Name is required".into()));
    }
    let label = repo::rename(&state.db, kind, user_id, id, &payload.name)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                ApiError::Conflict("Name already in use".into())
            }
            _ => ApiError::Internal(e.into()),
        })?
        .ok_or_else(|| not_found(kind))?;
    info!(%user_id, %id, name = %label.name, "label renamed");
    Ok(Json(label.into()))
}

async fn delete_label(
    state: AppState,
    user_id: Uuid,
    id: Uuid,
    kind: LabelKind,
) -> Result<StatusCode, ApiError> {
    if !repo::delete(&state.db, kind, user_id, id).await? {
        return Err(not_found(kind));
    }
    info!(%user_id, %id, "label deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn not_found(kind: LabelKind) -> ApiError {
    match kind {
        LabelKind::Tag => ApiError::NotFound("Tag not found".into()),
        LabelKind::Ingredient => ApiError::NotFound("Ingredient not found".into()),
    }
}

#[instrument(skip(state))]
async fn list_tags(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<LabelListQuery>,
) -> Result<Json<Vec<LabelOut>>, ApiError> {
    list_labels(state, user_id, query, LabelKind::Tag).await
}

#[instrument(skip(state, payload))]
async fn update_tag(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLabelRequest>,
) -> Result<Json<LabelOut>, ApiError> {
    update_label(state, user_id, id, payload, LabelKind::Tag).await
}

#[instrument(skip(state))]
async fn delete_tag(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    delete_label(state, user_id, id, LabelKind::Tag).await
}

#[instrument(skip(state))]
async fn list_ingredients(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<LabelListQuery>,
) -> Result<Json<Vec<LabelOut>>, ApiError> {
    list_labels(state, user_id, query, LabelKind::Ingredient).await
}

#[instrument(skip(state, payload))]
async fn update_ingredient(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLabelRequest>,
) -> Result<Json<LabelOut>, ApiError> {
    update_label(state, user_id, id, payload, LabelKind::Ingredient).await
}

#[instrument(skip(state))]
async fn delete_ingredient(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    delete_label(state, user_id, id, LabelKind::Ingredient).await
}
