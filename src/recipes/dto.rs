use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::labels::dto::LabelOut;
use crate::labels::repo::Label;
use crate::recipes::repo::Recipe;

/// Nested tag/ingredient payload entry. Carries no user field on purpose;
/// the authenticated caller is the authoritative owner.
#[derive(Debug, Clone, Deserialize)]
pub struct LabelRef {
    pub name: String,
}

/// Body for POST and PUT. With PUT, serde defaults implement the
/// full-replace rule: an omitted optional field resets to empty.
#[derive(Debug, Deserialize)]
pub struct CreateRecipeRequest {
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<LabelRef>,
    #[serde(default)]
    pub ingredients: Vec<LabelRef>,
}

/// Body for PATCH. `tags`/`ingredients` distinguish "key absent" (no
/// change) from "present, possibly empty" (clear then reconcile).
#[derive(Debug, Default, Deserialize)]
pub struct UpdateRecipeRequest {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<LabelRef>>,
    pub ingredients: Option<Vec<LabelRef>>,
}

#[derive(Debug, Deserialize)]
pub struct RecipeFilter {
    pub tags: Option<String>,
    pub ingredients: Option<String>,
}

/// Parse a comma-separated id list filter value. An absent or empty value
/// means "no filter", not "match nothing".
pub fn parse_id_filter(raw: Option<&str>) -> Result<Option<Vec<Uuid>>, ApiError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Uuid::parse_str(s)
                .map_err(|_| ApiError::Validation(format!("Invalid id in filter: {s}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(if ids.is_empty() { None } else { Some(ids) })
}

/// List projection: no description, no image path.
#[derive(Debug, Serialize)]
pub struct RecipeListItem {
    pub id: Uuid,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub tags: Vec<LabelOut>,
    pub ingredients: Vec<LabelOut>,
}

/// Detail projection: list fields plus description and image path.
#[derive(Debug, Serialize)]
pub struct RecipeDetail {
    pub id: Uuid,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub tags: Vec<LabelOut>,
    pub ingredients: Vec<LabelOut>,
    pub description: String,
    pub image_path: Option<String>,
}

impl RecipeListItem {
    pub fn project(recipe: Recipe, tags: Vec<Label>, ingredients: Vec<Label>) -> Self {
        Self {
            id: recipe.id,
            title: recipe.title,
            time_minutes: recipe.time_minutes,
            price: recipe.price,
            link: recipe.link,
            tags: tags.into_iter().map(LabelOut::from).collect(),
            ingredients: ingredients.into_iter().map(LabelOut::from).collect(),
        }
    }
}

impl RecipeDetail {
    pub fn project(recipe: Recipe, tags: Vec<Label>, ingredients: Vec<Label>) -> Self {
        Self {
            id: recipe.id,
            title: recipe.title,
            time_minutes: recipe.time_minutes,
            price: recipe.price,
            link: recipe.link,
            tags: tags.into_iter().map(LabelOut::from).collect(),
            ingredients: ingredients.into_iter().map(LabelOut::from).collect(),
            description: recipe.description,
            image_path: recipe.image_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn sample_recipe() -> Recipe {
        Recipe {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Gumbo".into(),
            description: "Slow-cooked".into(),
            time_minutes: 60,
            price: Decimal::new(1050, 2),
            link: "https://example.com/gumbo".into(),
            image_path: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn list_projection_omits_description() {
        let item = RecipeListItem::project(sample_recipe(), vec![], vec![]);
        let json = serde_json::to_string(&item).unwrap();
        assert!(!json.contains("description"));
        assert!(!json.contains("image_path"));
        assert!(json.contains("Gumbo"));
    }

    #[test]
    fn detail_projection_includes_description() {
        let detail = RecipeDetail::project(sample_recipe(), vec![], vec![]);
        let json = serde_json::to_string(&detail).unwrap();
        assert!(json.contains("Slow-cooked"));
        assert!(json.contains("image_path"));
    }

    #[test]
    fn price_serializes_with_two_digits() {
        let detail = RecipeDetail::project(sample_recipe(), vec![], vec![]);
        let json = serde_json::to_string(&detail).unwrap();
        assert!(json.contains("\"10.50\""));
    }

    #[test]
    fn parse_id_filter_splits_on_commas() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let ids = parse_id_filter(Some(&format!("{a},{b}"))).unwrap();
        assert_eq!(ids, Some(vec![a, b]));
    }

    #[test]
    fn parse_id_filter_rejects_garbage() {
        let err = parse_id_filter(Some("not-a-uuid")).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn parse_id_filter_ignores_empty_segments() {
        let a = Uuid::new_v4();
        let ids = parse_id_filter(Some(&format!(" {a}, ,"))).unwrap();
        assert_eq!(ids, Some(vec![a]));
    }

    #[test]
    fn empty_or_absent_filter_means_no_filter() {
        assert_eq!(parse_id_filter(None).unwrap(), None);
        assert_eq!(parse_id_filter(Some("")).unwrap(), None);
        assert_eq!(parse_id_filter(Some(" , ,")).unwrap(), None);
    }

    #[test]
    fn patch_body_distinguishes_absent_from_empty_tags() {
        let absent: UpdateRecipeRequest = serde_json::from_str(r#"{"title": "x"}"#).unwrap();
        assert!(absent.tags.is_none());

        let empty: UpdateRecipeRequest = serde_json::from_str(r#"{"tags": []}"#).unwrap();
        assert_eq!(empty.tags.as_deref().map(<[LabelRef]>::len), Some(0));
    }

    #[test]
    fn put_body_defaults_omitted_fields_to_empty() {
        let body: CreateRecipeRequest =
            serde_json::from_str(r#"{"title": "Gumbo", "time_minutes": 60, "price": "10.50"}"#)
                .unwrap();
        assert_eq!(body.link, "");
        assert_eq!(body.description, "");
        assert!(body.tags.is_empty());
        assert!(body.ingredients.is_empty());
        assert_eq!(body.price, Decimal::new(1050, 2));
    }
}
