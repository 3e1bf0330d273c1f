use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    error::ApiError,
    extract::Json,
    images,
    labels::repo::LabelKind,
    recipes::dto::{
        parse_id_filter, CreateRecipeRequest, RecipeDetail, RecipeFilter, RecipeListItem,
        UpdateRecipeRequest,
    },
    recipes::{repo, services},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/recipes/:id",
            get(get_recipe)
                .put(replace_recipe)
                .patch(update_recipe)
                .delete(delete_recipe),
        )
        .route("/recipes/:id/image", post(upload_image).get(get_image))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
}

async fn detail_for(state: &AppState, recipe: repo::Recipe) -> Result<RecipeDetail, ApiError> {
    let ids = [recipe.id];
    let mut tags = repo::labels_for_recipes(&state.db, LabelKind::Tag, &ids).await?;
    let mut ingredients = repo::labels_for_recipes(&state.db, LabelKind::Ingredient, &ids).await?;
    Ok(RecipeDetail::project(
        recipe,
        tags.remove(&ids[0]).unwrap_or_default(),
        ingredients.remove(&ids[0]).unwrap_or_default(),
    ))
}

#[instrument(skip(state))]
pub async fn list_recipes(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(filter): Query<RecipeFilter>,
) -> Result<Json<Vec<RecipeListItem>>, ApiError> {
    let tag_ids = parse_id_filter(filter.tags.as_deref())?;
    let ingredient_ids = parse_id_filter(filter.ingredients.as_deref())?;

    let recipes = repo::list_for_user(
        &state.db,
        user_id,
        tag_ids.as_deref(),
        ingredient_ids.as_deref(),
    )
    .await?;

    let ids: Vec<Uuid> = recipes.iter().map(|r| r.id).collect();
    let mut tags = repo::labels_for_recipes(&state.db, LabelKind::Tag, &ids).await?;
    let mut ingredients = repo::labels_for_recipes(&state.db, LabelKind::Ingredient, &ids).await?;

    let items = recipes
        .into_iter()
        .map(|recipe| {
            let t = tags.remove(&recipe.id).unwrap_or_default();
            let i = ingredients.remove(&recipe.id).unwrap_or_default();
            RecipeListItem::project(recipe, t, i)
        })
        .collect();
    Ok(Json(items))
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<RecipeDetail>, ApiError> {
    let recipe = repo::get_for_user(&state.db, user_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Recipe not found".into()))?;
    Ok(Json(detail_for(&state, recipe).await?))
}

#[instrument(skip(state, body))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateRecipeRequest>,
) -> Result<(StatusCode, Json<RecipeDetail>), ApiError> {
    let recipe = services::create_recipe(&state, user_id, body).await?;
    let detail = detail_for(&state, recipe).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

#[instrument(skip(state, body))]
pub async fn replace_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<CreateRecipeRequest>,
) -> Result<Json<RecipeDetail>, ApiError> {
    let recipe = services::replace_recipe(&state, user_id, id, body).await?;
    Ok(Json(detail_for(&state, recipe).await?))
}

#[instrument(skip(state, body))]
pub async fn update_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateRecipeRequest>,
) -> Result<Json<RecipeDetail>, ApiError> {
    let recipe = services::update_recipe(&state, user_id, id, body).await?;
    Ok(Json(detail_for(&state, recipe).await?))
}

#[instrument(skip(state))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    services::delete_recipe(&state, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /recipes/:id/image — multipart field `image`.
#[instrument(skip(state, multipart))]
pub async fn upload_image(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<RecipeDetail>, ApiError> {
    let mut upload: Option<(String, bytes::Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(e.to_string()))?
    {
        if field.name() == Some("image") {
            let filename = field.file_name().unwrap_or_default().to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(e.to_string()))?;
            upload = Some((filename, data));
            break;
        }
    }
    let Some((filename, data)) = upload else {
        return Err(ApiError::Validation("multipart field 'image' is required".into()));
    };

    let recipe = images::services::attach_image(&state, user_id, id, data, &filename).await?;
    Ok(Json(detail_for(&state, recipe).await?))
}

/// GET /recipes/:id/image — 302 to a short-lived presigned URL for the
/// attached blob.
#[instrument(skip(state))]
pub async fn get_image(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Redirect, ApiError> {
    let recipe = repo::get_for_user(&state.db, user_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Recipe not found".into()))?;
    let Some(path) = recipe.image_path else {
        return Err(ApiError::NotFound("Recipe has no image".into()));
    };
    let url = state.storage.presign_get(&path, 600).await?;
    Ok(Redirect::temporary(&url))
}
