//! Toggle service for the user-to-target join relations: favorites, shopping
//! basket and author subscriptions. All three share the same shape (actor,
//! target, composite-unique pair), so they are handled by one service tagged
//! by [`RelationKind`].
//!
//! Duplicate inserts are arbitrated by the database's unique constraints;
//! racing writers lose with a unique violation, which is surfaced as
//! `AlreadyExists` rather than a storage error.

use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{is_unique_violation, ApiError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    Favorite,
    Basket,
    Subscription,
}

impl RelationKind {
    fn table(self) -> &'static str {
        match self {
            RelationKind::Favorite => "favorites",
            RelationKind::Basket => "basket_items",
            RelationKind::Subscription => "subscriptions",
        }
    }

    fn target_column(self) -> &'static str {
        match self {
            RelationKind::Favorite | RelationKind::Basket => "recipe_id",
            RelationKind::Subscription => "author_id",
        }
    }

    /// Table holding the target entity, for the existence precondition.
    fn target_table(self) -> &'static str {
        match self {
            RelationKind::Favorite | RelationKind::Basket => "recipes",
            RelationKind::Subscription => "users",
        }
    }

    fn target_noun(self) -> &'static str {
        match self {
            RelationKind::Favorite | RelationKind::Basket => "recipe",
            RelationKind::Subscription => "user",
        }
    }
}

fn already_exists_message(kind: RelationKind, target: Uuid) -> String {
    match kind {
        RelationKind::Favorite => format!("recipe {target} is already favorited"),
        RelationKind::Basket => format!("recipe {target} is already in the shopping cart"),
        RelationKind::Subscription => format!("already subscribed to user {target}"),
    }
}

fn missing_message(kind: RelationKind, target: Uuid) -> String {
    match kind {
        RelationKind::Favorite => format!("recipe {target} is not favorited"),
        RelationKind::Basket => format!("recipe {target} is not in the shopping cart"),
        RelationKind::Subscription => format!("not subscribed to user {target}"),
    }
}

async fn target_exists(db: &PgPool, kind: RelationKind, target: Uuid) -> Result<bool, ApiError> {
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)",
        kind.target_table()
    );
    let exists = sqlx::query_scalar::<_, bool>(&sql)
        .bind(target)
        .fetch_one(db)
        .await?;
    Ok(exists)
}

/// Creates the relation row for (actor, target).
///
/// The target must exist, and for subscriptions the actor may not follow
/// themselves. A pre-existing row fails with `AlreadyExists` naming the
/// target, whether detected here or by the unique constraint under a race.
#[instrument(skip(db))]
pub async fn add(
    db: &PgPool,
    kind: RelationKind,
    actor: Uuid,
    target: Uuid,
) -> Result<(), ApiError> {
    if kind == RelationKind::Subscription && actor == target {
        return Err(ApiError::Validation("cannot subscribe to yourself".into()));
    }

    if !target_exists(db, kind, target).await? {
        return Err(ApiError::NotFound(format!(
            "{} {target} not found",
            kind.target_noun()
        )));
    }

    let sql = format!(
        "INSERT INTO {} (user_id, {}) VALUES ($1, $2)",
        kind.table(),
        kind.target_column()
    );
    sqlx::query(&sql)
        .bind(actor)
        .bind(target)
        .execute(db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::AlreadyExists(already_exists_message(kind, target))
            } else {
                ApiError::Database(e)
            }
        })?;

    info!(%actor, %target, ?kind, "relation added");
    Ok(())
}

/// Deletes the relation row for (actor, target); absent rows fail with
/// `NotFound` naming the target.
#[instrument(skip(db))]
pub async fn remove(
    db: &PgPool,
    kind: RelationKind,
    actor: Uuid,
    target: Uuid,
) -> Result<(), ApiError> {
    let sql = format!(
        "DELETE FROM {} WHERE user_id = $1 AND {} = $2",
        kind.table(),
        kind.target_column()
    );
    let result = sqlx::query(&sql).bind(actor).bind(target).execute(db).await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(missing_message(kind, target)));
    }

    info!(%actor, %target, ?kind, "relation removed");
    Ok(())
}

/// Whether the relation row exists. Anonymous viewers hold no relations.
pub async fn exists(
    db: &PgPool,
    kind: RelationKind,
    actor: Option<Uuid>,
    target: Uuid,
) -> Result<bool, ApiError> {
    let Some(actor) = actor else {
        return Ok(false);
    };
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE user_id = $1 AND {} = $2)",
        kind.table(),
        kind.target_column()
    );
    let found = sqlx::query_scalar::<_, bool>(&sql)
        .bind(actor)
        .bind(target)
        .fetch_one(db)
        .await?;
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_maps_to_join_table() {
        assert_eq!(RelationKind::Favorite.table(), "favorites");
        assert_eq!(RelationKind::Basket.table(), "basket_items");
        assert_eq!(RelationKind::Subscription.table(), "subscriptions");
    }

    #[test]
    fn kind_maps_to_target() {
        assert_eq!(RelationKind::Favorite.target_column(), "recipe_id");
        assert_eq!(RelationKind::Basket.target_table(), "recipes");
        assert_eq!(RelationKind::Subscription.target_column(), "author_id");
        assert_eq!(RelationKind::Subscription.target_table(), "users");
    }

    #[test]
    fn duplicate_message_names_the_target() {
        let id = Uuid::new_v4();
        let msg = already_exists_message(RelationKind::Favorite, id);
        assert!(msg.contains(&id.to_string()));
        assert!(msg.contains("already"));
    }

    #[test]
    fn missing_message_names_the_target() {
        let id = Uuid::new_v4();
        for kind in [
            RelationKind::Favorite,
            RelationKind::Basket,
            RelationKind::Subscription,
        ] {
            assert!(missing_message(kind, id).contains(&id.to_string()));
        }
    }

    #[tokio::test]
    async fn anonymous_actor_holds_no_relations() {
        let state = crate::state::AppState::fake();
        let found = exists(&state.db, RelationKind::Favorite, None, Uuid::new_v4())
            .await
            .expect("no query is issued for anonymous actors");
        assert!(!found);
    }
}
