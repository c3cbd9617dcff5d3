//! Recipe CRUD handlers.
//!
//! Everything except delete is scoped to the authenticated caller.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use super::auth::AuthUser;
use super::error::ApiError;
use super::{ApiJson, AppState};
use crate::models::{Recipe, RecipeFields, RecipePatch};

fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id >= 0)
        .ok_or_else(|| ApiError::Validation("Invalid recipe ID".into()))
}

fn not_found() -> ApiError {
    ApiError::NotFound("Recipe not found".into())
}

pub async fn list_recipes(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Recipe>>, ApiError> {
    let recipes = state
        .recipes
        .list_active(user.id)
        .await
        .map_err(ApiError::internal("Error fetching recipes"))?;
    Ok(Json(recipes))
}

pub async fn create_recipe(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(fields): ApiJson<RecipeFields>,
) -> Result<(StatusCode, Json<Recipe>), ApiError> {
    let recipe = state
        .recipes
        .create(user.id, &fields)
        .await
        .map_err(ApiError::internal("Error creating recipe"))?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Recipe>, ApiError> {
    let id = parse_id(&id)?;
    state
        .recipes
        .get_active(id, user.id)
        .await
        .map_err(ApiError::internal("Error fetching recipe"))?
        .map(Json)
        .ok_or_else(not_found)
}

pub async fn update_recipe(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<RecipePatch>,
) -> Result<Json<Recipe>, ApiError> {
    let id = parse_id(&id)?;
    state
        .recipes
        .update(id, user.id, &patch)
        .await
        .map_err(ApiError::internal("Error updating recipe"))?
        .map(Json)
        .ok_or_else(not_found)
}

/// Physically deletes a recipe by id.
///
/// Unlike every other recipe operation this is not scoped to the caller:
/// any authenticated user can remove any recipe. Kept that way for client
/// compatibility until ownership semantics for this route are settled.
pub async fn delete_recipe(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    let removed = state
        .recipes
        .hard_delete(id)
        .await
        .map_err(ApiError::internal("Error deleting recipe"))?;

    tracing::warn!(
        "Unscoped hard delete of recipe {} by user {} ({} row(s))",
        id,
        user.id,
        removed
    );
    Ok(StatusCode::NO_CONTENT)
}
