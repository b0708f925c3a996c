use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
}

impl Ingredient {
    /// Lists the catalog, optionally restricted to a case-insensitive name
    /// prefix (the search box on the recipe form).
    pub async fn list(db: &PgPool, name_prefix: Option<&str>) -> sqlx::Result<Vec<Ingredient>> {
        match name_prefix {
            Some(prefix) => {
                sqlx::query_as::<_, Ingredient>(
                    r#"
                    SELECT id, name, measurement_unit
                    FROM ingredients
                    WHERE name ILIKE $1 || '%'
                    ORDER BY name, measurement_unit
                    "#,
                )
                .bind(prefix)
                .fetch_all(db)
                .await
            }
            None => {
                sqlx::query_as::<_, Ingredient>(
                    r#"
                    SELECT id, name, measurement_unit
                    FROM ingredients
                    ORDER BY name, measurement_unit
                    "#,
                )
                .fetch_all(db)
                .await
            }
        }
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<Ingredient>> {
        sqlx::query_as::<_, Ingredient>(
            "SELECT id, name, measurement_unit FROM ingredients WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }
}
