use serde::Serialize;
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

/// Tags and ingredients share one shape and one set of queries; only the
/// tables differ. Namespaces are fully independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Tag,
    Ingredient,
}

impl LabelKind {
    pub fn table(self) -> &'static str {
        match self {
            LabelKind::Tag => "tags",
            LabelKind::Ingredient => "ingredients",
        }
    }

    pub fn join_table(self) -> &'static str {
        match self {
            LabelKind::Tag => "recipe_tags",
            LabelKind::Ingredient => "recipe_ingredients",
        }
    }

    pub fn join_column(self) -> &'static str {
        match self {
            LabelKind::Tag => "tag_id",
            LabelKind::Ingredient => "ingredient_id",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Label {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
}

/// Atomic lookup-or-insert keyed on (user_id, name), backed by the unique
/// constraint. The no-op `DO UPDATE` makes the conflicting row come back
/// through `RETURNING`; `xmax = 0` distinguishes a fresh insert from a
/// conflict hit.
pub async fn get_or_create<'e>(
    ex: impl PgExecutor<'e>,
    kind: LabelKind,
    user_id: Uuid,
    name: &str,
) -> anyhow::Result<(Label, bool)> {
    let table = kind.table();
    let (id, user_id, name, created) = sqlx::query_as::<_, (Uuid, Uuid, String, bool)>(&format!(
        "INSERT INTO {table} (user_id, name)
         VALUES ($1, $2)
         ON CONFLICT (user_id, name) DO UPDATE SET name = excluded.name
         RETURNING id, user_id, name, (xmax = 0)"
    ))
    .bind(user_id)
    .bind(name)
    .fetch_one(ex)
    .await?;
    Ok((Label { id, user_id, name }, created))
}

/// List the caller's labels, name-descending. With `assigned_only`, only
/// labels attached to at least one of the caller's recipes are returned,
/// de-duplicated.
pub async fn list_for_user(
    db: &PgPool,
    kind: LabelKind,
    user_id: Uuid,
    assigned_only: bool,
) -> anyhow::Result<Vec<Label>> {
    let table = kind.table();
    let sql = if assigned_only {
        format!(
            "SELECT DISTINCT l.id, l.user_id, l.name
             FROM {table} l
             JOIN {join} j ON j.{col} = l.id
             WHERE l.user_id = $1
             ORDER BY l.name DESC",
            join = kind.join_table(),
            col = kind.join_column(),
        )
    } else {
        format!(
            "SELECT id, user_id, name
             FROM {table}
             WHERE user_id = $1
             ORDER BY name DESC"
        )
    };
    let rows = sqlx::query_as::<_, Label>(&sql)
        .bind(user_id)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

/// Rename a label the caller owns. `None` when the id is absent or owned
/// by someone else.
pub async fn rename(
    db: &PgPool,
    kind: LabelKind,
    user_id: Uuid,
    id: Uuid,
    name: &str,
) -> Result<Option<Label>, sqlx::Error> {
    let table = kind.table();
    sqlx::query_as::<_, Label>(&format!(
        "UPDATE {table} SET name = $3
         WHERE id = $1 AND user_id = $2
         RETURNING id, user_id, name"
    ))
    .bind(id)
    .bind(user_id)
    .bind(name)
    .fetch_optional(db)
    .await
}

/// Delete a label the caller owns; association rows cascade, recipes are
/// untouched. Returns false when nothing matched.
pub async fn delete(db: &PgPool, kind: LabelKind, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
    let table = kind.table();
    let result = sqlx::query(&format!(
        "DELETE FROM {table} WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_independent_tables() {
        assert_eq!(LabelKind::Tag.table(), "tags");
        assert_eq!(LabelKind::Ingredient.table(), "ingredients");
        assert_ne!(LabelKind::Tag.join_table(), LabelKind::Ingredient.join_table());
        assert_ne!(
            LabelKind::Tag.join_column(),
            LabelKind::Ingredient.join_column()
        );
    }
}
