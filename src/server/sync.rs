//! Pull/push sync for offline-capable clients.
//!
//! The client holds a `lastPulledAt` cursor (epoch milliseconds). A pull
//! returns every active recipe of the caller whose `updated_at` is strictly
//! greater than the cursor, plus a fresh server timestamp to use as the next
//! cursor. A push applies the client's pending mutations with
//! last-write-wins semantics: `updated_at` is always stamped by the server.
//!
//! Soft-deleted recipes are never delivered by a pull, so deletions made on
//! one device are not propagated to another.
//!
//! # Push payloads
//!
//! `changes.recipes` is accepted in two shapes:
//!
//! ```text
//! [ { "id": 0, "title": "Soup", "sync_status": "created" }, ... ]
//!
//! { "created": [ {...} ], "updated": [ {...} ], "deleted": [ "12", ... ] }
//! ```
//!
//! The first is a flat mutation log applied in order. The second is the
//! grouped form emitted by WatermelonDB clients and is applied as created,
//! then updated, then deleted.

use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};

use super::auth::AuthUser;
use super::error::ApiError;
use super::{ApiJson, AppState};
use crate::db::RecipeRepository;
use crate::models::{Recipe, RecipeFields};

/// What a pending client change does to its recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Created,
    Updated,
    Deleted,
    /// Anything else. Skipped with a warning.
    #[serde(other)]
    Unknown,
}

/// A record id as sent by the client.
///
/// Records that came from the server carry its numeric id, either as a
/// number or as a string. Records created offline carry a client-local
/// string id that means nothing to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Server(i64),
    Client(String),
}

impl RecordId {
    /// The server id this refers to, if it is one.
    pub fn server_id(&self) -> Option<i64> {
        match self {
            RecordId::Server(id) => Some(*id),
            RecordId::Client(raw) => raw.parse().ok(),
        }
    }
}

fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A single pending mutation from the client.
///
/// Client-supplied `user_id` and `updated_at` values are not read: the owner
/// is always the authenticated caller and the timestamp is always server
/// time.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RecipeChange {
    pub id: Option<RecordId>,
    pub remote_id: Option<String>,
    #[serde(deserialize_with = "nullable_string")]
    pub title: String,
    #[serde(deserialize_with = "nullable_string")]
    pub description: String,
    #[serde(deserialize_with = "nullable_string")]
    pub ingredients: String,
    #[serde(deserialize_with = "nullable_string")]
    pub steps: String,
    #[serde(deserialize_with = "nullable_string")]
    pub cooking_time: String,
    pub sync_status: Option<SyncStatus>,
}

impl RecipeChange {
    /// The server row this change targets, from `id` or else `remote_id`.
    pub fn target_id(&self) -> Option<i64> {
        self.id
            .as_ref()
            .and_then(RecordId::server_id)
            .or_else(|| self.remote_id.as_deref().and_then(|r| r.parse().ok()))
    }

    fn fields(&self) -> RecipeFields {
        RecipeFields::new(self.title.clone())
            .with_description(self.description.clone())
            .with_ingredients(self.ingredients.clone())
            .with_steps(self.steps.clone())
            .with_cooking_time(self.cooking_time.clone())
    }
}

/// The recipe part of a push payload, in either accepted shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RecipeChangeSet {
    Log(Vec<RecipeChange>),
    Grouped {
        #[serde(default)]
        created: Vec<RecipeChange>,
        #[serde(default)]
        updated: Vec<RecipeChange>,
        #[serde(default)]
        deleted: Vec<RecordId>,
    },
}

impl Default for RecipeChangeSet {
    fn default() -> Self {
        RecipeChangeSet::Log(Vec::new())
    }
}

impl RecipeChangeSet {
    /// Flattens into the order changes are applied in.
    fn into_ops(self) -> Vec<(SyncStatus, RecipeChange)> {
        match self {
            RecipeChangeSet::Log(changes) => changes
                .into_iter()
                .map(|c| (c.sync_status.unwrap_or(SyncStatus::Unknown), c))
                .collect(),
            RecipeChangeSet::Grouped {
                created,
                updated,
                deleted,
            } => {
                let created = created.into_iter().map(|c| (SyncStatus::Created, c));
                let updated = updated.into_iter().map(|c| (SyncStatus::Updated, c));
                let deleted = deleted.into_iter().map(|id| {
                    let change = RecipeChange {
                        id: Some(id),
                        ..RecipeChange::default()
                    };
                    (SyncStatus::Deleted, change)
                });
                created.chain(updated).chain(deleted).collect()
            }
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PushChanges {
    pub recipes: RecipeChangeSet,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PushRequest {
    pub changes: PushChanges,
    /// Accepted for protocol compatibility; push does not use it.
    #[serde(rename = "lastPulledAt")]
    pub last_pulled_at: Option<i64>,
    pub is_logout: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PullRequest {
    /// `null` or absent on a client's first sync.
    #[serde(rename = "lastPulledAt")]
    pub last_pulled_at: Option<i64>,
}

/// Changes grouped by entity kind. Only recipes are synced today; the other
/// kinds are always empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Changeset {
    pub recipes: Vec<Recipe>,
    pub users: Vec<serde_json::Value>,
    pub tokens: Vec<serde_json::Value>,
    pub app_state: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullResponse {
    pub changes: Changeset,
    /// Server time in epoch milliseconds; the client's next cursor.
    pub timestamp: i64,
}

/// Client id to server id for a recipe created by a push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdMapping {
    pub client_id: Option<RecordId>,
    pub id: i64,
}

/// What a push did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushOutcome {
    pub created: Vec<IdMapping>,
    pub updated: u64,
    pub deleted: u64,
    /// Changes with an unknown status or no usable target id.
    pub skipped: usize,
    /// Recipes soft-deleted by a logout push.
    pub cleared: u64,
}

/// Reconciles client change logs with the recipe store.
#[derive(Clone)]
pub struct SyncReconciler {
    recipes: RecipeRepository,
}

impl SyncReconciler {
    pub fn new(recipes: RecipeRepository) -> Self {
        Self { recipes }
    }

    /// Returns the caller's active recipes changed after `last_pulled_at`.
    pub async fn pull(&self, user_id: i64, last_pulled_at: i64) -> Result<PullResponse, sqlx::Error> {
        // Pushes stamp `updated_at` before their transaction commits, so a
        // push still in flight when this pull queries can land behind the
        // returned cursor and is not delivered. Accepted last-write-wins
        // limitation of a wall-clock cursor.
        let timestamp = Utc::now().timestamp_millis();

        let recipes = self.recipes.changed_since(user_id, last_pulled_at).await?;

        Ok(PullResponse {
            changes: Changeset {
                recipes,
                ..Changeset::default()
            },
            timestamp,
        })
    }

    /// Applies a push for `user_id`.
    ///
    /// A logout push soft-deletes every active recipe of the caller and
    /// ignores `changes`. Otherwise all changes are applied in one
    /// transaction: any failure rolls back the whole batch.
    pub async fn push(&self, user_id: i64, req: PushRequest) -> Result<PushOutcome, sqlx::Error> {
        let now = Utc::now().timestamp_millis();
        let mut outcome = PushOutcome::default();

        if req.is_logout {
            outcome.cleared = self.recipes.soft_delete_all(user_id, now).await?;
            return Ok(outcome);
        }

        let mut tx = self.recipes.begin().await?;

        for (status, change) in req.changes.recipes.into_ops() {
            match status {
                SyncStatus::Created => {
                    let id =
                        RecipeRepository::insert(&mut tx, user_id, &change.fields(), now).await?;
                    outcome.created.push(IdMapping {
                        client_id: change.id,
                        id,
                    });
                }
                SyncStatus::Updated => match change.target_id() {
                    Some(id) => {
                        outcome.updated +=
                            RecipeRepository::overwrite(&mut tx, id, user_id, &change.fields(), now)
                                .await?;
                    }
                    None => outcome.skipped += 1,
                },
                SyncStatus::Deleted => match change.target_id() {
                    Some(id) => {
                        outcome.deleted +=
                            RecipeRepository::soft_delete(&mut tx, id, user_id, now).await?;
                    }
                    None => outcome.skipped += 1,
                },
                SyncStatus::Unknown => {
                    tracing::warn!("Skipping change with unknown sync status: {:?}", change.id);
                    outcome.skipped += 1;
                }
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }
}

pub async fn pull_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(req): ApiJson<PullRequest>,
) -> Result<Json<PullResponse>, ApiError> {
    let since = req.last_pulled_at.unwrap_or(0);
    let response = state
        .sync
        .pull(user.id, since)
        .await
        .map_err(ApiError::internal("Error fetching changes"))?;

    tracing::debug!(
        "Pull for user {} since {}: {} recipe(s)",
        user.id,
        since,
        response.changes.recipes.len()
    );
    Ok(Json(response))
}

pub async fn push_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(req): ApiJson<PushRequest>,
) -> Result<StatusCode, ApiError> {
    let is_logout = req.is_logout;
    let outcome = state
        .sync
        .push(user.id, req)
        .await
        .map_err(ApiError::internal("Error applying changes"))?;

    if is_logout {
        tracing::info!(
            "Logout push for user {}: cleared {} recipe(s)",
            user.id,
            outcome.cleared
        );
    } else {
        tracing::info!(
            "Push for user {}: {} created, {} updated, {} deleted, {} skipped",
            user.id,
            outcome.created.len(),
            outcome.updated,
            outcome.deleted,
            outcome.skipped
        );
        for mapping in &outcome.created {
            tracing::debug!("Created recipe {} from client id {:?}", mapping.id, mapping.client_id);
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;
    use crate::db::UserRepository;
    use serde_json::json;
    use tempfile::TempDir;

    struct TestContext {
        sync: SyncReconciler,
        recipes: RecipeRepository,
        alice: i64,
        bob: i64,
        _temp_dir: TempDir,
    }

    async fn setup() -> TestContext {
        let (pool, temp_dir) = test_pool().await;
        let users = UserRepository::new(pool.clone());
        let alice = users.create("alice@example.com", "h", "Alice").await.unwrap();
        let bob = users.create("bob@example.com", "h", "Bob").await.unwrap();
        let recipes = RecipeRepository::new(pool);
        TestContext {
            sync: SyncReconciler::new(recipes.clone()),
            recipes,
            alice: alice.id,
            bob: bob.id,
            _temp_dir: temp_dir,
        }
    }

    fn push(value: serde_json::Value) -> PushRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_record_id_server_id() {
        assert_eq!(RecordId::Server(5).server_id(), Some(5));
        assert_eq!(RecordId::Client("12".into()).server_id(), Some(12));
        assert_eq!(RecordId::Client("k3j9x".into()).server_id(), None);
    }

    #[test]
    fn test_target_id_falls_back_to_remote_id() {
        let change: RecipeChange =
            serde_json::from_value(json!({"id": "local-abc", "remote_id": "44"})).unwrap();
        assert_eq!(change.target_id(), Some(44));

        let change: RecipeChange = serde_json::from_value(json!({"id": 7, "remote_id": "44"})).unwrap();
        assert_eq!(change.target_id(), Some(7));

        let change: RecipeChange = serde_json::from_value(json!({"id": "local-abc"})).unwrap();
        assert_eq!(change.target_id(), None);
    }

    #[test]
    fn test_change_tolerates_nulls_and_unknown_status() {
        let change: RecipeChange = serde_json::from_value(json!({
            "id": 1,
            "title": null,
            "sync_status": "archived",
            "user_id": 99,
            "updated_at": "2020-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(change.title, "");
        assert_eq!(change.sync_status, Some(SyncStatus::Unknown));
    }

    #[test]
    fn test_grouped_ops_order() {
        let req = push(json!({
            "changes": {"recipes": {
                "deleted": ["3"],
                "updated": [{"id": "2", "title": "B"}],
                "created": [{"id": "tmp", "title": "A"}]
            }}
        }));

        let ops = req.changes.recipes.into_ops();
        let statuses: Vec<SyncStatus> = ops.iter().map(|(s, _)| *s).collect();
        assert_eq!(
            statuses,
            vec![SyncStatus::Created, SyncStatus::Updated, SyncStatus::Deleted]
        );
        assert_eq!(ops[2].1.target_id(), Some(3));
    }

    #[tokio::test]
    async fn test_pull_respects_cursor() {
        let ctx = setup().await;

        let old = ctx
            .recipes
            .create(ctx.alice, &RecipeFields::new("Old"))
            .await
            .unwrap();
        let cursor = old.updated_at.timestamp_millis();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        ctx.recipes
            .create(ctx.alice, &RecipeFields::new("New"))
            .await
            .unwrap();

        let response = ctx.sync.pull(ctx.alice, cursor).await.unwrap();
        let titles: Vec<&str> = response
            .changes
            .recipes
            .iter()
            .map(|r| r.title.as_str())
            .collect();
        assert_eq!(titles, vec!["New"]);

        let everything = ctx.sync.pull(ctx.alice, 0).await.unwrap();
        assert_eq!(everything.changes.recipes.len(), 2);
    }

    #[tokio::test]
    async fn test_pull_timestamp_is_server_now() {
        let ctx = setup().await;

        let before = Utc::now().timestamp_millis();
        let response = ctx.sync.pull(ctx.alice, 0).await.unwrap();
        let after = Utc::now().timestamp_millis();

        assert!(response.timestamp >= before && response.timestamp <= after);
        assert!(response.changes.users.is_empty());
        assert!(response.changes.tokens.is_empty());
        assert!(response.changes.app_state.is_empty());
    }

    #[tokio::test]
    async fn test_pull_excludes_soft_deleted() {
        let ctx = setup().await;

        let kept = ctx
            .recipes
            .create(ctx.alice, &RecipeFields::new("Kept"))
            .await
            .unwrap();
        let gone = ctx
            .recipes
            .create(ctx.alice, &RecipeFields::new("Gone"))
            .await
            .unwrap();

        ctx.sync
            .push(
                ctx.alice,
                push(json!({"changes": {"recipes": [{"id": gone.id, "sync_status": "deleted"}]}})),
            )
            .await
            .unwrap();

        let response = ctx.sync.pull(ctx.alice, 0).await.unwrap();
        let ids: Vec<i64> = response.changes.recipes.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![kept.id]);
    }

    #[tokio::test]
    async fn test_push_created_then_pull_scenario() {
        let ctx = setup().await;
        let before_push = Utc::now().timestamp_millis() - 1;

        let outcome = ctx
            .sync
            .push(
                ctx.alice,
                push(json!({
                    "changes": {"recipes": [
                        {"id": 0, "title": "Soup", "sync_status": "created", "user_id": ctx.bob}
                    ]},
                    "lastPulledAt": 0,
                    "is_logout": false
                })),
            )
            .await
            .unwrap();
        assert_eq!(outcome.created.len(), 1);
        assert_eq!(outcome.created[0].client_id, Some(RecordId::Server(0)));

        let alice_pull = ctx.sync.pull(ctx.alice, before_push).await.unwrap();
        assert_eq!(alice_pull.changes.recipes.len(), 1);
        let soup = &alice_pull.changes.recipes[0];
        assert_eq!(soup.title, "Soup");
        assert_eq!(soup.user_id, ctx.alice);
        assert_eq!(soup.id, outcome.created[0].id);
        assert_ne!(soup.id, 0);

        let bob_pull = ctx.sync.pull(ctx.bob, 0).await.unwrap();
        assert!(bob_pull.changes.recipes.is_empty());
    }

    #[tokio::test]
    async fn test_push_updated_overwrites_and_stamps_server_time() {
        let ctx = setup().await;

        let created = ctx
            .recipes
            .create(
                ctx.alice,
                &RecipeFields::new("Draft").with_image_url("keep.png"),
            )
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let outcome = ctx
            .sync
            .push(
                ctx.alice,
                push(json!({"changes": {"recipes": [{
                    "id": created.id,
                    "title": "Final",
                    "steps": "serve",
                    "updated_at": "1999-01-01T00:00:00Z",
                    "sync_status": "updated"
                }]}})),
            )
            .await
            .unwrap();
        assert_eq!(outcome.updated, 1);

        let stored = ctx
            .recipes
            .get_active(created.id, ctx.alice)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.title, "Final");
        assert_eq!(stored.steps, "serve");
        assert_eq!(stored.description, "");
        assert_eq!(stored.image_url.as_deref(), Some("keep.png"));
        assert!(stored.updated_at > created.updated_at);
    }

    #[tokio::test]
    async fn test_push_updated_on_deleted_row_is_noop() {
        let ctx = setup().await;

        let created = ctx
            .recipes
            .create(ctx.alice, &RecipeFields::new("Gone"))
            .await
            .unwrap();
        let now = Utc::now().timestamp_millis();
        ctx.recipes.soft_delete_all(ctx.alice, now).await.unwrap();

        let outcome = ctx
            .sync
            .push(
                ctx.alice,
                push(json!({"changes": {"recipes": [
                    {"id": created.id, "title": "Back", "sync_status": "updated"}
                ]}})),
            )
            .await
            .unwrap();
        assert_eq!(outcome.updated, 0);

        let stored = ctx.recipes.get_any(created.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Gone");
        assert!(stored.deleted_at.is_some());
    }

    #[tokio::test]
    async fn test_push_deleted_other_users_row_is_noop() {
        let ctx = setup().await;

        let bobs = ctx
            .recipes
            .create(ctx.bob, &RecipeFields::new("Bob's"))
            .await
            .unwrap();

        let outcome = ctx
            .sync
            .push(
                ctx.alice,
                push(json!({"changes": {"recipes": [{"id": bobs.id, "sync_status": "deleted"}]}})),
            )
            .await
            .unwrap();
        assert_eq!(outcome.deleted, 0);

        assert!(ctx
            .recipes
            .get_active(bobs.id, ctx.bob)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_push_deleted_is_idempotent() {
        let ctx = setup().await;

        let created = ctx
            .recipes
            .create(ctx.alice, &RecipeFields::new("Once"))
            .await
            .unwrap();
        let req = json!({"changes": {"recipes": [{"id": created.id, "sync_status": "deleted"}]}});

        let first = ctx.sync.push(ctx.alice, push(req.clone())).await.unwrap();
        let second = ctx.sync.push(ctx.alice, push(req)).await.unwrap();

        assert_eq!(first.deleted, 1);
        assert_eq!(second.deleted, 0);
        let stored = ctx.recipes.get_any(created.id).await.unwrap().unwrap();
        assert!(stored.deleted_at.is_some());
    }

    #[tokio::test]
    async fn test_logout_clears_all_and_ignores_changes() {
        let ctx = setup().await;

        ctx.recipes
            .create(ctx.alice, &RecipeFields::new("A"))
            .await
            .unwrap();
        ctx.recipes
            .create(ctx.alice, &RecipeFields::new("B"))
            .await
            .unwrap();
        let bobs = ctx
            .recipes
            .create(ctx.bob, &RecipeFields::new("C"))
            .await
            .unwrap();

        let outcome = ctx
            .sync
            .push(
                ctx.alice,
                push(json!({
                    "changes": {"recipes": [{"id": 0, "title": "Ignored", "sync_status": "created"}]},
                    "is_logout": true
                })),
            )
            .await
            .unwrap();
        assert_eq!(outcome.cleared, 2);
        assert!(outcome.created.is_empty());

        assert!(ctx.recipes.list_active(ctx.alice).await.unwrap().is_empty());
        assert!(ctx
            .recipes
            .get_active(bobs.id, ctx.bob)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_logout_with_no_recipes_succeeds() {
        let ctx = setup().await;

        let outcome = ctx
            .sync
            .push(ctx.alice, push(json!({"is_logout": true})))
            .await
            .unwrap();
        assert_eq!(outcome.cleared, 0);
    }

    #[tokio::test]
    async fn test_push_grouped_payload() {
        let ctx = setup().await;

        let existing = ctx
            .recipes
            .create(ctx.alice, &RecipeFields::new("Existing"))
            .await
            .unwrap();
        let doomed = ctx
            .recipes
            .create(ctx.alice, &RecipeFields::new("Doomed"))
            .await
            .unwrap();

        let outcome = ctx
            .sync
            .push(
                ctx.alice,
                push(json!({"changes": {"recipes": {
                    "created": [{"id": "wm-local-1", "title": "Offline"}],
                    "updated": [{"id": existing.id.to_string(), "remote_id": existing.id.to_string(), "title": "Edited"}],
                    "deleted": [doomed.id.to_string()]
                }}})),
            )
            .await
            .unwrap();

        assert_eq!(
            outcome.created[0].client_id,
            Some(RecordId::Client("wm-local-1".into()))
        );
        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.deleted, 1);

        let titles: Vec<String> = ctx
            .recipes
            .list_active(ctx.alice)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, vec!["Edited".to_string(), "Offline".to_string()]);
    }

    #[tokio::test]
    async fn test_push_skips_unknown_and_untargeted() {
        let ctx = setup().await;

        let outcome = ctx
            .sync
            .push(
                ctx.alice,
                push(json!({"changes": {"recipes": [
                    {"id": 1, "sync_status": "archived"},
                    {"id": "local-only", "sync_status": "updated"},
                    {"title": "no status"}
                ]}})),
            )
            .await
            .unwrap();

        assert_eq!(outcome.skipped, 3);
        assert!(ctx.recipes.list_active(ctx.alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_push_failure_rolls_back_batch() {
        let ctx = setup().await;

        let victim = ctx
            .recipes
            .create(ctx.alice, &RecipeFields::new("Survivor"))
            .await
            .unwrap();

        // Make any insert titled "boom" fail
        let mut tx = ctx.recipes.begin().await.unwrap();
        sqlx::query(
            "CREATE TRIGGER fail_boom BEFORE INSERT ON recipes WHEN NEW.title = 'boom' \
             BEGIN SELECT RAISE(ABORT, 'boom'); END",
        )
        .execute(&mut *tx)
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let result = ctx
            .sync
            .push(
                ctx.alice,
                push(json!({"changes": {"recipes": [
                    {"id": victim.id, "sync_status": "deleted"},
                    {"id": 0, "title": "fine", "sync_status": "created"},
                    {"id": 0, "title": "boom", "sync_status": "created"}
                ]}})),
            )
            .await;
        assert!(result.is_err());

        let active = ctx.recipes.list_active(ctx.alice).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, victim.id);
    }

    mod http {
        use super::*;
        use crate::server::test_support::TestServer;

        #[tokio::test]
        async fn test_pull_endpoint_shape() {
            let server = TestServer::new().await;
            let (token, _) = server.register("a@example.com", "pw", "A").await;

            server
                .post("/api/recipes", Some(&token), json!({"title": "Soup"}))
                .await;

            let response = server
                .post(
                    "/api/recipes/sync/pull",
                    Some(&token),
                    json!({"lastPulledAt": null}),
                )
                .await;

            assert_eq!(response.status, StatusCode::OK);
            assert_eq!(response.body["changes"]["recipes"][0]["title"], "Soup");
            assert_eq!(response.body["changes"]["users"], json!([]));
            assert_eq!(response.body["changes"]["tokens"], json!([]));
            assert_eq!(response.body["changes"]["app_state"], json!([]));
            assert!(response.body["timestamp"].is_i64());
        }

        #[tokio::test]
        async fn test_push_endpoint_then_pull() {
            let server = TestServer::new().await;
            let (alice, _) = server.register("a@example.com", "pw", "A").await;
            let (bob, _) = server.register("b@example.com", "pw", "B").await;

            let first = server
                .post("/api/recipes/sync/pull", Some(&alice), json!({"lastPulledAt": 0}))
                .await;
            let cursor = first.body["timestamp"].as_i64().unwrap() - 1;

            let pushed = server
                .post(
                    "/api/recipes/sync/push",
                    Some(&alice),
                    json!({
                        "changes": {"recipes": [{"id": 0, "title": "Soup", "sync_status": "created"}]},
                        "lastPulledAt": cursor,
                        "is_logout": false
                    }),
                )
                .await;
            assert_eq!(pushed.status, StatusCode::NO_CONTENT);
            assert!(pushed.body.is_null());

            let pulled = server
                .post(
                    "/api/recipes/sync/pull",
                    Some(&alice),
                    json!({"lastPulledAt": cursor}),
                )
                .await;
            assert_eq!(pulled.body["changes"]["recipes"][0]["title"], "Soup");

            let other = server
                .post("/api/recipes/sync/pull", Some(&bob), json!({"lastPulledAt": 0}))
                .await;
            assert_eq!(other.body["changes"]["recipes"], json!([]));
        }

        #[tokio::test]
        async fn test_logout_push_endpoint() {
            let server = TestServer::new().await;
            let (token, _) = server.register("a@example.com", "pw", "A").await;

            let response = server
                .post(
                    "/api/recipes/sync/push",
                    Some(&token),
                    json!({"changes": {}, "is_logout": true}),
                )
                .await;
            assert_eq!(response.status, StatusCode::NO_CONTENT);
        }

        #[tokio::test]
        async fn test_sync_requires_auth() {
            let server = TestServer::new().await;

            let response = server
                .post("/api/recipes/sync/pull", None, json!({"lastPulledAt": 0}))
                .await;
            assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        }
    }
}
