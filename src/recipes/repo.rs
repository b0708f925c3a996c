use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{is_foreign_key_violation, is_unique_violation, ApiError};
use crate::recipes::dto::{IngredientInRecipe, RecipeUpsert};
use crate::recipes::filter::RecipeFilter;
use crate::recipes::shopping_list::ShoppingRow;
use crate::tags::repo::Tag;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Recipe {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub text: String,
    pub cooking_time: i32,
    pub created_at: OffsetDateTime,
}

/// Minimal recipe view used by the toggle responses and the subscriptions
/// preview.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RecipeBrief {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub cooking_time: i32,
}

impl Recipe {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<Recipe>> {
        sqlx::query_as::<_, Recipe>(
            r#"
            SELECT id, author_id, name, image, text, cooking_time, created_at
            FROM recipes
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }
}

pub async fn brief_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<RecipeBrief>> {
    sqlx::query_as::<_, RecipeBrief>(
        "SELECT id, name, image, cooking_time FROM recipes WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn recent_by_author(
    db: &PgPool,
    author_id: Uuid,
    limit: i64,
) -> sqlx::Result<Vec<RecipeBrief>> {
    sqlx::query_as::<_, RecipeBrief>(
        r#"
        SELECT id, name, image, cooking_time
        FROM recipes
        WHERE author_id = $1
        ORDER BY created_at DESC, id
        LIMIT $2
        "#,
    )
    .bind(author_id)
    .bind(limit)
    .fetch_all(db)
    .await
}

pub async fn count_by_author(db: &PgPool, author_id: Uuid) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author_id)
        .fetch_one(db)
        .await
}

fn push_relation_constraint(
    qb: &mut QueryBuilder<'_, Postgres>,
    table: &str,
    wanted: bool,
    actor: Uuid,
) {
    qb.push(if wanted {
        " AND EXISTS ("
    } else {
        " AND NOT EXISTS ("
    });
    qb.push(format!(
        "SELECT 1 FROM {table} x WHERE x.recipe_id = r.id AND x.user_id = "
    ));
    qb.push_bind(actor);
    qb.push(")");
}

/// Lists recipes matching the filter, newest first.
///
/// `is_favorited = false` / `is_in_shopping_cart = false` select the
/// complement of the actor's relation, not "no constraint".
pub async fn list(
    db: &PgPool,
    filter: &RecipeFilter,
    actor: Option<Uuid>,
) -> Result<Vec<Recipe>, ApiError> {
    if filter.requires_actor() && actor.is_none() {
        return Err(ApiError::Unauthorized(
            "authentication required for favorite or shopping cart filters".into(),
        ));
    }

    let mut qb = QueryBuilder::<Postgres>::new(
        r#"SELECT r.id, r.author_id, r.name, r.image, r.text, r.cooking_time, r.created_at
           FROM recipes r WHERE TRUE"#,
    );

    if let Some(author) = filter.author {
        qb.push(" AND r.author_id = ");
        qb.push_bind(author);
    }

    if !filter.tags.is_empty() {
        qb.push(
            " AND EXISTS (SELECT 1 FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id \
             WHERE rt.recipe_id = r.id AND t.slug = ANY(",
        );
        qb.push_bind(filter.tags.clone());
        qb.push("))");
    }

    if let (Some(wanted), Some(actor)) = (filter.is_favorited, actor) {
        push_relation_constraint(&mut qb, "favorites", wanted, actor);
    }
    if let (Some(wanted), Some(actor)) = (filter.is_in_shopping_cart, actor) {
        push_relation_constraint(&mut qb, "basket_items", wanted, actor);
    }

    qb.push(" ORDER BY r.created_at DESC, r.id LIMIT ");
    qb.push_bind(filter.limit);
    qb.push(" OFFSET ");
    qb.push_bind(filter.offset);

    let rows = qb.build_query_as::<Recipe>().fetch_all(db).await?;
    Ok(rows)
}

fn map_reference_error(e: sqlx::Error) -> ApiError {
    if is_foreign_key_violation(&e) {
        ApiError::Validation("unknown ingredient or tag in payload".into())
    } else if is_unique_violation(&e) {
        ApiError::Validation("duplicate ingredient or tag in payload".into())
    } else {
        ApiError::Database(e)
    }
}

async fn attach_tags_and_ingredients(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
    payload: &RecipeUpsert,
) -> Result<(), ApiError> {
    for tag_id in &payload.tags {
        sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES ($1, $2)")
            .bind(recipe_id)
            .bind(tag_id)
            .execute(&mut **tx)
            .await
            .map_err(map_reference_error)?;
    }
    for item in &payload.ingredients {
        sqlx::query(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) VALUES ($1, $2, $3)",
        )
        .bind(recipe_id)
        .bind(item.id)
        .bind(item.amount)
        .execute(&mut **tx)
        .await
        .map_err(map_reference_error)?;
    }
    Ok(())
}

/// Creates the recipe and its tag/ingredient rows in one transaction, so a
/// rejected payload never leaves a partial recipe behind.
pub async fn create(
    db: &PgPool,
    author_id: Uuid,
    payload: &RecipeUpsert,
) -> Result<Recipe, ApiError> {
    let mut tx = db.begin().await?;

    let recipe = sqlx::query_as::<_, Recipe>(
        r#"
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, author_id, name, image, text, cooking_time, created_at
        "#,
    )
    .bind(author_id)
    .bind(&payload.name)
    .bind(&payload.image)
    .bind(&payload.text)
    .bind(payload.cooking_time)
    .fetch_one(&mut *tx)
    .await?;

    attach_tags_and_ingredients(&mut tx, recipe.id, payload).await?;

    tx.commit().await?;
    Ok(recipe)
}

/// Replaces the recipe's fields and its tag/ingredient sets atomically.
pub async fn replace(
    db: &PgPool,
    recipe_id: Uuid,
    payload: &RecipeUpsert,
) -> Result<Recipe, ApiError> {
    let mut tx = db.begin().await?;

    let recipe = sqlx::query_as::<_, Recipe>(
        r#"
        UPDATE recipes
        SET name = $2, image = $3, text = $4, cooking_time = $5
        WHERE id = $1
        RETURNING id, author_id, name, image, text, cooking_time, created_at
        "#,
    )
    .bind(recipe_id)
    .bind(&payload.name)
    .bind(&payload.image)
    .bind(&payload.text)
    .bind(payload.cooking_time)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tx)
        .await?;

    attach_tags_and_ingredients(&mut tx, recipe_id, payload).await?;

    tx.commit().await?;
    Ok(recipe)
}

/// Deletes the recipe; relation rows cascade at the schema level.
pub async fn delete(db: &PgPool, recipe_id: Uuid) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe_id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn tags_of(db: &PgPool, recipe_id: Uuid) -> sqlx::Result<Vec<Tag>> {
    sqlx::query_as::<_, Tag>(
        r#"
        SELECT t.id, t.name, t.color, t.slug
        FROM recipe_tags rt
        JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = $1
        ORDER BY t.name
        "#,
    )
    .bind(recipe_id)
    .fetch_all(db)
    .await
}

pub async fn ingredients_of(db: &PgPool, recipe_id: Uuid) -> sqlx::Result<Vec<IngredientInRecipe>> {
    sqlx::query_as::<_, IngredientInRecipe>(
        r#"
        SELECT i.id, i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = $1
        ORDER BY i.name
        "#,
    )
    .bind(recipe_id)
    .fetch_all(db)
    .await
}

/// All (ingredient, amount) occurrences across the user's basket recipes;
/// aggregation happens in [`crate::recipes::shopping_list`].
pub async fn shopping_rows(db: &PgPool, user_id: Uuid) -> sqlx::Result<Vec<ShoppingRow>> {
    sqlx::query_as::<_, ShoppingRow>(
        r#"
        SELECT i.name, i.measurement_unit, ri.amount
        FROM basket_items b
        JOIN recipe_ingredients ri ON ri.recipe_id = b.recipe_id
        JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE b.user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}
