//! Recipe generation through the Gemini `generateContent` API.
//!
//! The model is prompted to answer in JSON; the reply text is searched for
//! the outermost bracketed span, which is then parsed and returned as the
//! model wrote it. A reply with no bracketed span yields an empty result
//! rather than an error.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::ApiError;
use super::{ApiJson, AppState};
use crate::config::Config;

/// Errors from a generation round trip.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Gemini API key not set")]
    MissingApiKey,
    #[error("Failed to call Gemini API: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Gemini API returned {0}")]
    Upstream(reqwest::StatusCode),
    #[error("Failed to parse Gemini response: {0}")]
    Response(#[source] reqwest::Error),
    #[error("Failed to parse recipe JSON: {0}")]
    Payload(#[source] serde_json::Error),
}

impl GenerationError {
    fn client_message(&self) -> &'static str {
        match self {
            GenerationError::MissingApiKey => "Gemini API key not set",
            GenerationError::Transport(_) | GenerationError::Upstream(_) => {
                "Failed to call Gemini API"
            }
            GenerationError::Response(_) => "Failed to parse Gemini response",
            GenerationError::Payload(_) => "Failed to parse recipe JSON",
        }
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        tracing::error!("Recipe generation failed: {}", err);
        ApiError::Internal(err.client_message().to_string())
    }
}

/// A suggested recipe, normally `{recipe_name, description}`.
///
/// Kept as the model's JSON object: value types and extra keys pass through.
pub type RecipeIdea = Map<String, Value>;

/// Detailed instructions for one recipe, normally
/// `{ingredients, steps, description, cooking_time}`.
pub type RecipeProcess = Map<String, Value>;

/// The process returned when the reply carries no JSON object.
pub fn empty_process() -> RecipeProcess {
    let mut process = Map::new();
    process.insert("ingredients".into(), Value::Array(Vec::new()));
    process.insert("steps".into(), Value::Array(Vec::new()));
    process.insert("description".into(), Value::String(String::new()));
    process.insert("cooking_time".into(), Value::String(String::new()));
    process
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [GenerateContent<'a>; 1],
}

#[derive(Serialize)]
struct GenerateContent<'a> {
    parts: [GeneratePart<'a>; 1],
}

#[derive(Serialize)]
struct GeneratePart<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Text of the first part of the first candidate.
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

/// Slices `text` from the first `open` to the last `close`, inclusive.
pub fn extract_json(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end < start {
        return None;
    }
    Some(&text[start..end + close.len_utf8()])
}

fn ideas_prompt(ingredients: &[String]) -> String {
    format!(
        r#"What are the names of recipes that can be made using some or all of these ingredients? Given the following list of ingredients: {}, provide the recipe names and a short description (approximately 1-2 sentences) for each. Return the results in JSON format, using the structure shown in the example below:

[
  {{
    "recipe_name": "Recipe Name 1",
    "description": "Description of Recipe 1, including key characteristics, flavor profile, and main ingredients."
  }},
  {{
    "recipe_name": "Recipe Name 2",
    "description": "Description of Recipe 2, including key characteristics, flavor profile, and main ingredients."
  }}
]"#,
        ingredients.join(", ")
    )
}

fn process_prompt(recipe_name: &str) -> String {
    format!(
        r#"Provide the detailed recipe for {}. Include the following sections:

**Ingredients:** (A bulleted list of all necessary ingredients with quantities)

**Steps:** (A numbered list of sequential instructions for preparing the recipe)

**Description:** (Description of the recipe, including key characteristics, flavor profile, and main ingredients.)

**Cooking Time:** (The estimated total time required to prepare and cook the recipe, e.g., "30 minutes", "1 hour 15 minutes")

Return the response in JSON format with the following structure:
{{
  "ingredients": ["ingredient 1", "ingredient 2", ...],
  "steps": ["step 1", "step 2", ...],
  "description": "Description of the recipe, including key characteristics, flavor profile, and main ingredients.",
  "cooking_time": "total cooking time"
}}"#,
        recipe_name
    )
}

/// Client for the text-generation API.
#[derive(Clone)]
pub struct GenerationClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GenerationClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            api_key,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.gemini_base_url.clone(),
            config.gemini_model.clone(),
            config.gemini_api_key.clone(),
        )
    }

    /// Replaces the underlying HTTP client.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Sends one prompt and returns the reply text, if any.
    async fn generate(&self, prompt: &str) -> Result<Option<String>, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(GenerationError::MissingApiKey)?;

        let url = format!(
            "{}/v1/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let body = GenerateRequest {
            contents: [GenerateContent {
                parts: [GeneratePart { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(&url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(GenerationError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Upstream(status));
        }

        let reply: GenerateResponse = response.json().await.map_err(GenerationError::Response)?;
        Ok(reply.first_text())
    }

    /// Suggests recipes that use some or all of `ingredients`.
    pub async fn suggest_recipes(
        &self,
        ingredients: &[String],
    ) -> Result<Vec<RecipeIdea>, GenerationError> {
        let text = self.generate(&ideas_prompt(ingredients)).await?;

        match text.as_deref().and_then(|t| extract_json(t, '[', ']')) {
            Some(json) => serde_json::from_str(json).map_err(GenerationError::Payload),
            None => Ok(Vec::new()),
        }
    }

    /// Asks for ingredients, steps, description and cooking time of a recipe.
    pub async fn recipe_process(&self, recipe_name: &str) -> Result<RecipeProcess, GenerationError> {
        let text = self.generate(&process_prompt(recipe_name)).await?;

        match text.as_deref().and_then(|t| extract_json(t, '{', '}')) {
            Some(json) => serde_json::from_str(json).map_err(GenerationError::Payload),
            None => Ok(empty_process()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SuggestRequest {
    pub ingredients: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestResponse {
    pub recipes: Vec<RecipeIdea>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProcessRequest {
    pub recipe_name: String,
}

pub async fn suggest_handler(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SuggestRequest>,
) -> Result<Json<SuggestResponse>, ApiError> {
    let recipes = state.generator.suggest_recipes(&req.ingredients).await?;
    Ok(Json(SuggestResponse { recipes }))
}

pub async fn process_handler(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ProcessRequest>,
) -> Result<Json<RecipeProcess>, ApiError> {
    let process = state.generator.recipe_process(&req.recipe_name).await?;
    Ok(Json(process))
}
