use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Dish, NutrientProfile};

/// The AI service that estimates nutrition.
///
/// The CLI implements this with reqwest against Gemini; tests use a mock.
/// Failures should come back as `TrackerError::Analysis` or
/// `TrackerError::IngredientLookup` wrapped in `anyhow`.
#[async_trait]
pub trait NutritionProvider: Send + Sync {
    /// Identify the dishes in a photo.
    async fn analyze_image(&self, image: &[u8], mime_type: &str) -> Result<Vec<Dish>>;

    /// Per-100 g nutrition for a single named ingredient.
    async fn lookup_ingredient(&self, name: &str) -> Result<NutrientProfile>;
}
