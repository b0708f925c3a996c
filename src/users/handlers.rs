use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::{AuthUser, MaybeAuthUser},
    error::ApiError,
    recipes::repo as recipes_repo,
    relations::{self, RelationKind},
    state::AppState,
    users::{
        dto::{Pagination, SubscriptionItem, SubscriptionsQuery, UserProfile},
        repo::{self, User},
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/me", get(get_me))
        .route("/users/subscriptions", get(list_subscriptions))
        .route("/users/:id", get(get_user))
        .route(
            "/users/:id/subscribe",
            post(subscribe).delete(unsubscribe),
        )
}

async fn subscription_item(
    state: &AppState,
    author: User,
    recipes_limit: i64,
) -> Result<SubscriptionItem, ApiError> {
    let recipes =
        recipes_repo::recent_by_author(&state.db, author.id, recipes_limit.clamp(0, 50)).await?;
    let recipes_count = recipes_repo::count_by_author(&state.db, author.id).await?;
    Ok(SubscriptionItem {
        author: UserProfile::new(author, true),
        recipes,
        recipes_count,
    })
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
    let users = User::list(&state.db, p.limit, p.offset).await?;
    let mut profiles = Vec::with_capacity(users.len());
    for user in users {
        let followed = repo::is_subscribed(&state.db, viewer, user.id).await?;
        profiles.push(UserProfile::new(user, followed));
    }
    Ok(Json(profiles))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserProfile>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("user not found".into()))?;
    Ok(Json(UserProfile::new(user, false)))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))?;
    let followed = repo::is_subscribed(&state.db, viewer, user.id).await?;
    Ok(Json(UserProfile::new(user, followed)))
}

#[instrument(skip(state))]
pub async fn list_subscriptions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<SubscriptionsQuery>,
) -> Result<Json<Vec<SubscriptionItem>>, ApiError> {
    let authors = repo::followed_authors(&state.db, user_id).await?;
    let mut items = Vec::with_capacity(authors.len());
    for author in authors {
        items.push(subscription_item(&state, author, q.recipes_limit).await?);
    }
    Ok(Json(items))
}

#[instrument(skip(state))]
pub async fn subscribe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(author_id): Path<Uuid>,
    Query(q): Query<SubscriptionsQuery>,
) -> Result<(StatusCode, Json<SubscriptionItem>), ApiError> {
    relations::add(&state.db, RelationKind::Subscription, user_id, author_id).await?;
    let author = User::find_by_id(&state.db, author_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {author_id} not found")))?;
    let item = subscription_item(&state, author, q.recipes_limit).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

#[instrument(skip(state))]
pub async fn unsubscribe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(author_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    relations::remove(&state.db, RelationKind::Subscription, user_id, author_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
