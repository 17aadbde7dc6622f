//! Request and response shapes for Gemini's `generateContent` endpoint, and
//! decoding of the JSON text the model returns.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::TrackerError;
use crate::models::{Dish, NutrientProfile};

pub const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const ANALYZE_PROMPT: &str = "Analyze this image and identify every food item in it. For each \
    item estimate the calories, the macronutrients (protein, carbohydrates, fat) and give a short \
    description. Where you can, list the main ingredients with their estimated weight in grams. \
    Return the result as JSON following the provided schema.";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    /// Base64, standard alphabet.
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: Value,
}

impl GenerationConfig {
    fn json(schema: Value) -> Self {
        Self {
            response_mime_type: "application/json".to_string(),
            response_schema: schema,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    pub candidates: Option<Vec<Candidate>>,
    pub error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub message: String,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        let parts = &self.candidates.as_ref()?.first()?.content.as_ref()?.parts;
        let text: String = parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                Part::InlineData { .. } => None,
            })
            .collect();
        if text.trim().is_empty() { None } else { Some(text) }
    }
}

fn dish_list_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "name": {"type": "STRING", "description": "Name of the identified food."},
                "calories": {"type": "INTEGER", "description": "Estimated calories for the portion shown."},
                "macros": {
                    "type": "OBJECT",
                    "properties": {
                        "protein": {"type": "STRING", "description": "Estimated protein, e.g. '10g'."},
                        "carbohydrates": {"type": "STRING", "description": "Estimated carbohydrates, e.g. '25g'."},
                        "fat": {"type": "STRING", "description": "Estimated fat, e.g. '5g'."}
                    },
                    "required": ["protein", "carbohydrates", "fat"]
                },
                "description": {"type": "STRING", "description": "A short, friendly description or nutrition tip."},
                "ingredients": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "name": {"type": "STRING"},
                            "grams": {"type": "NUMBER"}
                        },
                        "required": ["name", "grams"]
                    }
                }
            },
            "required": ["name", "calories", "macros", "description"]
        }
    })
}

fn nutrient_profile_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "calories": {"type": "NUMBER", "description": "kcal per 100 g."},
            "protein": {"type": "NUMBER", "description": "Grams of protein per 100 g."},
            "carbohydrates": {"type": "NUMBER", "description": "Grams of carbohydrates per 100 g."},
            "fat": {"type": "NUMBER", "description": "Grams of fat per 100 g."}
        },
        "required": ["calories", "protein", "carbohydrates", "fat"]
    })
}

#[must_use]
pub fn analysis_request(image_base64: String, mime_type: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![
                Part::Text {
                    text: ANALYZE_PROMPT.to_string(),
                },
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: mime_type.to_string(),
                        data: image_base64,
                    },
                },
            ],
        }],
        generation_config: GenerationConfig::json(dish_list_schema()),
    }
}

#[must_use]
pub fn ingredient_request(name: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![Part::Text {
                text: format!(
                    "Give the nutrition of the ingredient \"{}\" per 100 g: calories (kcal), \
                     protein, carbohydrates and fat in grams. Return JSON following the provided schema.",
                    name.trim()
                ),
            }],
        }],
        generation_config: GenerationConfig::json(nutrient_profile_schema()),
    }
}

/// Decode the model's answer to an image analysis. Anything but a JSON array
/// of dishes is an analysis failure.
pub fn parse_dishes(text: &str) -> Result<Vec<Dish>> {
    let value: Value = serde_json::from_str(text.trim())
        .map_err(|e| TrackerError::Analysis(format!("response is not JSON: {e}")))?;
    if !value.is_array() {
        return Err(
            TrackerError::Analysis("response is not a list of food items".to_string()).into(),
        );
    }
    let dishes = serde_json::from_value(value)
        .map_err(|e| TrackerError::Analysis(format!("unexpected food item shape: {e}")))?;
    Ok(dishes)
}

pub fn parse_nutrient_profile(name: &str, text: &str) -> Result<NutrientProfile> {
    let profile: NutrientProfile =
        serde_json::from_str(text.trim()).map_err(|e| TrackerError::IngredientLookup {
            name: name.to_string(),
            reason: format!("unexpected response: {e}"),
        })?;
    let values = [
        profile.calories,
        profile.protein,
        profile.carbohydrates,
        profile.fat,
    ];
    if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(TrackerError::IngredientLookup {
            name: name.to_string(),
            reason: "negative or invalid values".to_string(),
        }
        .into());
    }
    Ok(profile)
}
