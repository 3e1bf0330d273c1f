use anyhow::Context;
use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::recipes::repo::{self, Recipe};
use crate::state::AppState;

/// Compose a collision-free storage path for an uploaded recipe image.
/// Keeps the declared extension (with its dot), drops the rest of the
/// original name.
pub fn generate_image_path(original_filename: &str) -> String {
    let ext = std::path::Path::new(original_filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default();
    format!("uploads/recipe/{}{}", Uuid::new_v4(), ext)
}

/// Validate, store, and record an uploaded image for a recipe the caller
/// owns. The payload must actually decode as an image; the declared
/// filename only contributes the extension.
pub async fn attach_image(
    state: &AppState,
    user_id: Uuid,
    recipe_id: Uuid,
    data: Bytes,
    declared_filename: &str,
) -> Result<Recipe, ApiError> {
    let previous = repo::get_for_user(&state.db, user_id, recipe_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Recipe not found".into()))?
        .image_path;

    let format = image::guess_format(&data)
        .map_err(|_| ApiError::Validation("payload is not a recognized image format".into()))?;
    image::load_from_memory(&data)
        .map_err(|_| ApiError::Validation("payload does not decode as an image".into()))?;

    let path = generate_image_path(declared_filename);
    state
        .storage
        .put_object(&path, data, format.to_mime_type())
        .await
        .context("store recipe image")?;

    let Some(recipe) = repo::set_image_path(&state.db, user_id, recipe_id, &path).await? else {
        // Recipe vanished between the ownership check and the update;
        // don't leave the fresh blob orphaned.
        if let Err(e) = state.storage.delete_object(&path).await {
            warn!(error = %e, %path, "failed to delete orphaned image blob");
        }
        return Err(ApiError::NotFound("Recipe not found".into()));
    };

    if let Some(old) = previous {
        if let Err(e) = state.storage.delete_object(&old).await {
            warn!(error = %e, path = %old, "failed to delete replaced image blob");
        }
    }

    info!(user_id = %user_id, recipe_id = %recipe_id, %path, "image attached");
    Ok(recipe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_keeps_extension_and_prefix() {
        let path = generate_image_path("dinner.JPG");
        assert!(path.starts_with("uploads/recipe/"));
        assert!(path.ends_with(".jpg"));
    }

    #[test]
    fn path_without_extension_has_no_trailing_dot() {
        let path = generate_image_path("photo");
        assert!(path.starts_with("uploads/recipe/"));
        assert!(!path.ends_with('.'));
    }

    #[test]
    fn paths_are_unique_per_upload() {
        assert_ne!(generate_image_path("a.png"), generate_image_path("a.png"));
    }

    #[test]
    fn path_embeds_a_uuid() {
        let path = generate_image_path("a.png");
        let stem = path
            .strip_prefix("uploads/recipe/")
            .and_then(|p| p.strip_suffix(".png"))
            .expect("prefix and suffix");
        Uuid::parse_str(stem).expect("uuid stem");
    }

    #[test]
    fn text_bytes_are_not_an_image() {
        assert!(image::guess_format(b"definitely not an image").is_err());
    }

    #[test]
    fn png_magic_is_recognized() {
        // Magic alone passes sniffing but must still fully decode upstream.
        let magic = [0x89u8, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(
            image::guess_format(&magic).expect("png magic"),
            image::ImageFormat::Png
        );
        assert!(image::load_from_memory(&magic).is_err());
    }
}
