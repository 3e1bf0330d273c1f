use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::labels::repo::{self as labels_repo, LabelKind};
use crate::recipes::dto::{CreateRecipeRequest, LabelRef, UpdateRecipeRequest};
use crate::recipes::repo::{self, Recipe};
use crate::state::AppState;

/// Payload order preserved, exact-match duplicates dropped. Case-sensitive
/// and untrimmed: "Cajun" and "cajun" are distinct labels.
pub fn deduped_names(payload: &[LabelRef]) -> Vec<&str> {
    let mut seen: Vec<&str> = Vec::with_capacity(payload.len());
    for entry in payload {
        if !seen.contains(&entry.name.as_str()) {
            seen.push(&entry.name);
        }
    }
    seen
}

pub fn validate_price(price: Decimal) -> Result<(), ApiError> {
    if price.is_sign_negative() {
        return Err(ApiError::Validation("price must be non-negative".into()));
    }
    if price.normalize().scale() > 2 {
        return Err(ApiError::Validation(
            "price supports at most 2 decimal digits".into(),
        ));
    }
    Ok(())
}

fn validate_scalars(title: &str, time_minutes: i32, price: Decimal) -> Result<(), ApiError> {
    if title.is_empty() {
        return Err(ApiError::Validation("title is required".into()));
    }
    if time_minutes < 0 {
        return Err(ApiError::Validation("time_minutes must be non-negative".into()));
    }
    validate_price(price)
}

/// Get-or-create each named label under the authenticated user and attach
/// it to the recipe, in payload order. Runs on the surrounding transaction.
async fn attach_named_labels(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    kind: LabelKind,
    user_id: Uuid,
    recipe_id: Uuid,
    payload: &[LabelRef],
) -> Result<(), ApiError> {
    for name in deduped_names(payload) {
        if name.is_empty() {
            return Err(ApiError::Validation("label name must not be empty".into()));
        }
        let (label, _created) = labels_repo::get_or_create(&mut **tx, kind, user_id, name).await?;
        repo::attach_label(&mut **tx, kind, recipe_id, label.id).await?;
    }
    Ok(())
}

/// Create a recipe: scalar row first, then nested tags/ingredients
/// reconciled through get-or-create, all in one transaction.
pub async fn create_recipe(
    state: &AppState,
    user_id: Uuid,
    body: CreateRecipeRequest,
) -> Result<Recipe, ApiError> {
    validate_scalars(&body.title, body.time_minutes, body.price)?;

    let mut tx = state.db.begin().await?;
    let recipe = repo::insert(
        &mut *tx,
        user_id,
        &body.title,
        &body.description,
        body.time_minutes,
        body.price,
        &body.link,
    )
    .await?;
    attach_named_labels(&mut tx, LabelKind::Tag, user_id, recipe.id, &body.tags).await?;
    attach_named_labels(
        &mut tx,
        LabelKind::Ingredient,
        user_id,
        recipe.id,
        &body.ingredients,
    )
    .await?;
    tx.commit().await?;

    info!(user_id = %user_id, recipe_id = %recipe.id, "recipe created");
    Ok(recipe)
}

/// Partial update. A present `tags`/`ingredients` key, even an empty
/// array, clears the existing associations before reconciling; an absent
/// key leaves them alone. Scalars are applied after association changes.
pub async fn update_recipe(
    state: &AppState,
    user_id: Uuid,
    id: Uuid,
    body: UpdateRecipeRequest,
) -> Result<Recipe, ApiError> {
    if let Some(price) = body.price {
        validate_price(price)?;
    }
    if body.title.as_deref() == Some("") {
        return Err(ApiError::Validation("title must not be empty".into()));
    }
    if matches!(body.time_minutes, Some(m) if m < 0) {
        return Err(ApiError::Validation("time_minutes must be non-negative".into()));
    }

    let mut tx = state.db.begin().await?;
    if repo::lock_for_user(&mut *tx, user_id, id).await?.is_none() {
        return Err(ApiError::NotFound("Recipe not found".into()));
    }

    if let Some(tags) = &body.tags {
        repo::clear_associations(&mut *tx, LabelKind::Tag, id).await?;
        attach_named_labels(&mut tx, LabelKind::Tag, user_id, id, tags).await?;
    }
    if let Some(ingredients) = &body.ingredients {
        repo::clear_associations(&mut *tx, LabelKind::Ingredient, id).await?;
        attach_named_labels(&mut tx, LabelKind::Ingredient, user_id, id, ingredients).await?;
    }

    let recipe = repo::update_scalars(
        &mut *tx,
        user_id,
        id,
        body.title.as_deref(),
        body.description.as_deref(),
        body.time_minutes,
        body.price,
        body.link.as_deref(),
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Recipe not found".into()))?;
    tx.commit().await?;

    info!(user_id = %user_id, recipe_id = %id, "recipe updated");
    Ok(recipe)
}

/// Full replace (PUT). Every writable field is taken from the body;
/// associations are always cleared and reconciled, so omitted lists end
/// up empty.
pub async fn replace_recipe(
    state: &AppState,
    user_id: Uuid,
    id: Uuid,
    body: CreateRecipeRequest,
) -> Result<Recipe, ApiError> {
    update_recipe(
        state,
        user_id,
        id,
        UpdateRecipeRequest {
            title: Some(body.title),
            time_minutes: Some(body.time_minutes),
            price: Some(body.price),
            link: Some(body.link),
            description: Some(body.description),
            tags: Some(body.tags),
            ingredients: Some(body.ingredients),
        },
    )
    .await
}

/// Delete the recipe row (associations cascade, labels survive) and clean
/// up the attached blob, if any.
pub async fn delete_recipe(state: &AppState, user_id: Uuid, id: Uuid) -> Result<(), ApiError> {
    let Some(image_path) = repo::delete(&state.db, user_id, id).await? else {
        return Err(ApiError::NotFound("Recipe not found".into()));
    };
    if let Some(path) = image_path {
        // Row is already gone; a stale blob is only worth a warning.
        if let Err(e) = state.storage.delete_object(&path).await {
            warn!(error = %e, %path, "failed to delete recipe image blob");
        }
    }
    info!(user_id = %user_id, recipe_id = %id, "recipe deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(names: &[&str]) -> Vec<LabelRef> {
        names
            .iter()
            .map(|n| LabelRef {
                name: n.to_string(),
            })
            .collect()
    }

    #[test]
    fn deduped_names_keeps_payload_order() {
        let payload = refs(&["Cajun", "Dinner", "Cajun", "Quick"]);
        assert_eq!(deduped_names(&payload), vec!["Cajun", "Dinner", "Quick"]);
    }

    #[test]
    fn deduped_names_is_case_sensitive() {
        let payload = refs(&["Cajun", "cajun"]);
        assert_eq!(deduped_names(&payload), vec!["Cajun", "cajun"]);
    }

    #[test]
    fn deduped_names_does_not_trim() {
        let payload = refs(&["Cajun", " Cajun"]);
        assert_eq!(deduped_names(&payload), vec!["Cajun", " Cajun"]);
    }

    #[test]
    fn price_rejects_negative() {
        let err = validate_price(Decimal::new(-1, 0)).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn price_rejects_three_decimal_digits() {
        let err = validate_price(Decimal::new(10505, 3)).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn price_accepts_two_digits_and_trailing_zeros() {
        validate_price(Decimal::new(1050, 2)).expect("10.50 is valid");
        validate_price(Decimal::ZERO).expect("0 is valid");
        // 10.500 normalizes to 10.5
        validate_price(Decimal::new(10500, 3)).expect("10.500 is valid");
    }
}
