use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored recipe as returned by reads and sync pulls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipe {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub ingredients: String,
    pub steps: String,
    pub cooking_time: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker. Reads never return rows where this is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// The user-editable content of a recipe.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecipeFields {
    pub title: String,
    pub description: String,
    pub ingredients: String,
    pub steps: String,
    pub cooking_time: String,
    pub image_url: Option<String>,
}

impl RecipeFields {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_ingredients(mut self, ingredients: impl Into<String>) -> Self {
        self.ingredients = ingredients.into();
        self
    }

    pub fn with_steps(mut self, steps: impl Into<String>) -> Self {
        self.steps = steps.into();
        self
    }

    pub fn with_cooking_time(mut self, cooking_time: impl Into<String>) -> Self {
        self.cooking_time = cooking_time.into();
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }
}

/// A partial update. Only fields that are present overwrite stored values.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RecipePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub ingredients: Option<String>,
    pub steps: Option<String>,
    pub cooking_time: Option<String>,
    pub image_url: Option<String>,
}
