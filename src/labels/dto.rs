use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::labels::repo::Label;

/// Wire shape of a tag or ingredient; the owning user stays implicit.
#[derive(Debug, Serialize)]
pub struct LabelOut {
    pub id: Uuid,
    pub name: String,
}

impl From<Label> for LabelOut {
    fn from(l: Label) -> Self {
        Self {
            id: l.id,
            name: l.name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateLabelRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LabelListQuery {
    /// `assigned_only=1` restricts to labels attached to some recipe.
    #[serde(default)]
    pub assigned_only: Option<u8>,
}

impl LabelListQuery {
    pub fn assigned_only(&self) -> bool {
        self.assigned_only.map(|v| v != 0).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigned_only_flag_parses_numeric_values() {
        let q: LabelListQuery = serde_json::from_str(r#"{"assigned_only": 1}"#).unwrap();
        assert!(q.assigned_only());
        let q: LabelListQuery = serde_json::from_str(r#"{"assigned_only": 0}"#).unwrap();
        assert!(!q.assigned_only());
        let q: LabelListQuery = serde_json::from_str("{}").unwrap();
        assert!(!q.assigned_only());
    }

    #[test]
    fn label_out_hides_owner() {
        let out = LabelOut::from(Label {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Cajun".into(),
        });
        let json = serde_json::to_string(&out).unwrap();
        assert!(json.contains("Cajun"));
        assert!(!json.contains("user_id"));
    }
}
