use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgExecutor, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::labels::repo::{Label, LabelKind};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Recipe {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub image_path: Option<String>,
    pub created_at: OffsetDateTime,
}

const RECIPE_COLUMNS: &str =
    "id, user_id, title, description, time_minutes, price, link, image_path, created_at";

pub async fn insert<'e>(
    ex: impl PgExecutor<'e>,
    user_id: Uuid,
    title: &str,
    description: &str,
    time_minutes: i32,
    price: Decimal,
    link: &str,
) -> anyhow::Result<Recipe> {
    let recipe = sqlx::query_as::<_, Recipe>(&format!(
        "INSERT INTO recipes (user_id, title, description, time_minutes, price, link)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {RECIPE_COLUMNS}"
    ))
    .bind(user_id)
    .bind(title)
    .bind(description)
    .bind(time_minutes)
    .bind(price)
    .bind(link)
    .fetch_one(ex)
    .await?;
    Ok(recipe)
}

/// Fetch one recipe scoped to its owner. Foreign ids come back as `None`,
/// same as absent ones.
pub async fn get_for_user<'e>(
    ex: impl PgExecutor<'e>,
    user_id: Uuid,
    id: Uuid,
) -> anyhow::Result<Option<Recipe>> {
    let recipe = sqlx::query_as::<_, Recipe>(&format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(ex)
    .await?;
    Ok(recipe)
}

/// Lock a recipe row for the duration of the surrounding transaction so
/// concurrent updates to the same recipe serialize.
pub async fn lock_for_user<'e>(
    ex: impl PgExecutor<'e>,
    user_id: Uuid,
    id: Uuid,
) -> anyhow::Result<Option<Recipe>> {
    let recipe = sqlx::query_as::<_, Recipe>(&format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1 AND user_id = $2 FOR UPDATE"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(ex)
    .await?;
    Ok(recipe)
}

/// List the caller's recipes, newest first. Each id filter, when present,
/// keeps recipes associated with at least one listed label (OR within the
/// list); the two filters combine with AND. `EXISTS` keeps the result
/// de-duplicated without a DISTINCT over all columns.
pub async fn list_for_user(
    db: &PgPool,
    user_id: Uuid,
    tag_ids: Option<&[Uuid]>,
    ingredient_ids: Option<&[Uuid]>,
) -> anyhow::Result<Vec<Recipe>> {
    let rows = sqlx::query_as::<_, Recipe>(&format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes r
         WHERE r.user_id = $1
           AND ($2::uuid[] IS NULL OR EXISTS (
                SELECT 1 FROM recipe_tags rt
                WHERE rt.recipe_id = r.id AND rt.tag_id = ANY($2)))
           AND ($3::uuid[] IS NULL OR EXISTS (
                SELECT 1 FROM recipe_ingredients ri
                WHERE ri.recipe_id = r.id AND ri.ingredient_id = ANY($3)))
         ORDER BY r.created_at DESC, r.id DESC"
    ))
    .bind(user_id)
    .bind(tag_ids)
    .bind(ingredient_ids)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Partial scalar update; only non-None fields change.
pub async fn update_scalars<'e>(
    ex: impl PgExecutor<'e>,
    user_id: Uuid,
    id: Uuid,
    title: Option<&str>,
    description: Option<&str>,
    time_minutes: Option<i32>,
    price: Option<Decimal>,
    link: Option<&str>,
) -> anyhow::Result<Option<Recipe>> {
    let recipe = sqlx::query_as::<_, Recipe>(&format!(
        "UPDATE recipes SET
             title = COALESCE($3, title),
             description = COALESCE($4, description),
             time_minutes = COALESCE($5, time_minutes),
             price = COALESCE($6, price),
             link = COALESCE($7, link)
         WHERE id = $1 AND user_id = $2
         RETURNING {RECIPE_COLUMNS}"
    ))
    .bind(id)
    .bind(user_id)
    .bind(title)
    .bind(description)
    .bind(time_minutes)
    .bind(price)
    .bind(link)
    .fetch_optional(ex)
    .await?;
    Ok(recipe)
}

/// Delete a recipe the caller owns; association rows cascade, label rows
/// survive. Returns the image path that needs blob cleanup, if any.
pub async fn delete(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Option<String>>> {
    let row = sqlx::query_as::<_, (Option<String>,)>(
        "DELETE FROM recipes WHERE id = $1 AND user_id = $2 RETURNING image_path",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(row.map(|(path,)| path))
}

pub async fn set_image_path(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
    image_path: &str,
) -> anyhow::Result<Option<Recipe>> {
    let recipe = sqlx::query_as::<_, Recipe>(&format!(
        "UPDATE recipes SET image_path = $3
         WHERE id = $1 AND user_id = $2
         RETURNING {RECIPE_COLUMNS}"
    ))
    .bind(id)
    .bind(user_id)
    .bind(image_path)
    .fetch_optional(db)
    .await?;
    Ok(recipe)
}

/// Remove every tag or ingredient association of one recipe.
pub async fn clear_associations<'e>(
    ex: impl PgExecutor<'e>,
    kind: LabelKind,
    recipe_id: Uuid,
) -> anyhow::Result<()> {
    sqlx::query(&format!(
        "DELETE FROM {} WHERE recipe_id = $1",
        kind.join_table()
    ))
    .bind(recipe_id)
    .execute(ex)
    .await?;
    Ok(())
}

/// Attach a label to a recipe. Duplicate attachments are no-ops thanks to
/// the composite primary key.
pub async fn attach_label<'e>(
    ex: impl PgExecutor<'e>,
    kind: LabelKind,
    recipe_id: Uuid,
    label_id: Uuid,
) -> anyhow::Result<()> {
    sqlx::query(&format!(
        "INSERT INTO {} (recipe_id, {}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        kind.join_table(),
        kind.join_column()
    ))
    .bind(recipe_id)
    .bind(label_id)
    .execute(ex)
    .await?;
    Ok(())
}

/// Batched association fetch for a page of recipes, avoiding one query per
/// row. Labels come back grouped by recipe, name-ascending.
pub async fn labels_for_recipes(
    db: &PgPool,
    kind: LabelKind,
    recipe_ids: &[Uuid],
) -> anyhow::Result<HashMap<Uuid, Vec<Label>>> {
    if recipe_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = sqlx::query_as::<_, (Uuid, Uuid, Uuid, String)>(&format!(
        "SELECT j.recipe_id, l.id, l.user_id, l.name
         FROM {join} j
         JOIN {table} l ON l.id = j.{col}
         WHERE j.recipe_id = ANY($1)
         ORDER BY l.name ASC",
        join = kind.join_table(),
        table = kind.table(),
        col = kind.join_column(),
    ))
    .bind(recipe_ids)
    .fetch_all(db)
    .await?;

    let mut grouped: HashMap<Uuid, Vec<Label>> = HashMap::new();
    for (recipe_id, id, user_id, name) in rows {
        grouped
            .entry(recipe_id)
            .or_default()
            .push(Label { id, user_id, name });
    }
    Ok(grouped)
}
