use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{AuthUser, MaybeAuthUser},
    error::ApiError,
    recipes::{
        dto::{RecipeResponse, RecipeUpsert},
        filter::RecipeFilter,
        repo::{self, Recipe, RecipeBrief},
        shopping_list::{self, SHOPPING_LIST_FILENAME},
    },
    relations::{self, RelationKind},
    state::AppState,
    users::{dto::UserProfile, repo as users_repo, repo::User},
};

pub fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/recipes/download_shopping_cart",
            get(download_shopping_cart),
        )
        .route(
            "/recipes/:id",
            get(get_recipe).patch(update_recipe).delete(delete_recipe),
        )
        .route(
            "/recipes/:id/favorite",
            axum::routing::post(add_favorite).delete(remove_favorite),
        )
        .route(
            "/recipes/:id/shopping_cart",
            axum::routing::post(add_to_cart).delete(remove_from_cart),
        )
}

/// Assembles the full representation: tags, author profile relative to the
/// viewer, ingredients with amounts, and the viewer's relation flags.
async fn build_response(
    state: &AppState,
    recipe: Recipe,
    viewer: Option<Uuid>,
) -> Result<RecipeResponse, ApiError> {
    let tags = repo::tags_of(&state.db, recipe.id).await?;
    let ingredients = repo::ingredients_of(&state.db, recipe.id).await?;

    let author = User::find_by_id(&state.db, recipe.author_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {} not found", recipe.author_id)))?;
    let author_followed = users_repo::is_subscribed(&state.db, viewer, author.id).await?;

    let is_favorited =
        relations::exists(&state.db, RelationKind::Favorite, viewer, recipe.id).await?;
    let is_in_shopping_cart =
        relations::exists(&state.db, RelationKind::Basket, viewer, recipe.id).await?;

    Ok(RecipeResponse {
        id: recipe.id,
        tags,
        author: UserProfile::new(author, author_followed),
        ingredients,
        is_favorited,
        is_in_shopping_cart,
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
    })
}

async fn owned_recipe(state: &AppState, recipe_id: Uuid, actor: Uuid) -> Result<Recipe, ApiError> {
    let recipe = Recipe::find_by_id(&state.db, recipe_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("recipe {recipe_id} not found")))?;
    if recipe.author_id != actor {
        return Err(ApiError::Forbidden(
            "only the author may modify a recipe".into(),
        ));
    }
    Ok(recipe)
}

#[instrument(skip(state))]
pub async fn list_recipes(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<RecipeResponse>>, ApiError> {
    let filter = RecipeFilter::from_pairs(pairs)?;
    let recipes = repo::list(&state.db, &filter, viewer).await?;
    let mut out = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        out.push(build_response(&state, recipe, viewer).await?);
    }
    Ok(Json(out))
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<RecipeResponse>, ApiError> {
    let recipe = Recipe::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("recipe {id} not found")))?;
    Ok(Json(build_response(&state, recipe, viewer).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<RecipeUpsert>,
) -> Result<(StatusCode, Json<RecipeResponse>), ApiError> {
    payload.validate()?;
    let recipe = repo::create(&state.db, user_id, &payload).await?;
    info!(recipe_id = %recipe.id, author = %user_id, "recipe created");
    let response = build_response(&state, recipe, Some(user_id)).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[instrument(skip(state, payload))]
pub async fn update_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecipeUpsert>,
) -> Result<Json<RecipeResponse>, ApiError> {
    payload.validate()?;
    owned_recipe(&state, id, user_id).await?;
    let recipe = repo::replace(&state.db, id, &payload).await?;
    info!(recipe_id = %id, author = %user_id, "recipe updated");
    Ok(Json(build_response(&state, recipe, Some(user_id)).await?))
}

#[instrument(skip(state))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    owned_recipe(&state, id, user_id).await?;
    repo::delete(&state.db, id).await?;
    info!(recipe_id = %id, author = %user_id, "recipe deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn add_recipe_relation(
    state: &AppState,
    kind: RelationKind,
    actor: Uuid,
    recipe_id: Uuid,
) -> Result<(StatusCode, Json<RecipeBrief>), ApiError> {
    relations::add(&state.db, kind, actor, recipe_id).await?;
    let brief = repo::brief_by_id(&state.db, recipe_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("recipe {recipe_id} not found")))?;
    Ok((StatusCode::CREATED, Json(brief)))
}

#[instrument(skip(state))]
pub async fn add_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<RecipeBrief>), ApiError> {
    add_recipe_relation(&state, RelationKind::Favorite, user_id, id).await
}

#[instrument(skip(state))]
pub async fn remove_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    relations::remove(&state.db, RelationKind::Favorite, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<RecipeBrief>), ApiError> {
    add_recipe_relation(&state, RelationKind::Basket, user_id, id).await
}

#[instrument(skip(state))]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    relations::remove(&state.db, RelationKind::Basket, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn download_shopping_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let rows = repo::shopping_rows(&state.db, user_id).await?;
    let body = shopping_list::render(&rows);

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""))
            .map_err(anyhow::Error::from)?,
    );

    Ok((headers, body))
}
