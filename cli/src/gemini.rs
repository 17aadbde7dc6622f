use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, error};

use platewise_core::error::TrackerError;
use platewise_core::gemini::{
    API_BASE_URL, GenerateContentRequest, GenerateContentResponse, analysis_request,
    ingredient_request, parse_dishes, parse_nutrient_profile,
};
use platewise_core::models::{Dish, NutrientProfile};
use platewise_core::provider::NutritionProvider;

const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "platewise/{} (nutrition tracker)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(std::time::Duration::from_secs(60))
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{API_BASE_URL}/models/{}:generateContent", self.model)
    }

    /// Send one request and return the text of the first candidate. Errors
    /// come back as plain reasons so callers can pick the error kind.
    async fn generate(&self, request: &GenerateContentRequest) -> Result<String, String> {
        let resp = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!(model = %self.model, error = %e, "Gemini request failed");
                format!("could not reach Gemini: {e}")
            })?;

        let status = resp.status();
        let body: GenerateContentResponse = resp.json().await.map_err(|e| {
            error!(%status, error = %e, "Gemini returned an unreadable body");
            format!("unreadable response (HTTP {status}): {e}")
        })?;

        if let Some(api_error) = body.error.as_ref() {
            error!(%status, message = %api_error.message, "Gemini API error");
            return Err(api_error.message.clone());
        }
        if !status.is_success() {
            return Err(format!("HTTP {status}"));
        }
        let text = body.text().ok_or_else(|| "empty response".to_string())?;
        debug!(bytes = text.len(), "Gemini response received");
        Ok(text)
    }
}

#[async_trait]
impl NutritionProvider for GeminiClient {
    async fn analyze_image(&self, image: &[u8], mime_type: &str) -> Result<Vec<Dish>> {
        debug!(bytes = image.len(), mime_type, "Analyzing image");
        let request = analysis_request(STANDARD.encode(image), mime_type);
        let text = self
            .generate(&request)
            .await
            .map_err(TrackerError::Analysis)?;
        parse_dishes(&text)
    }

    async fn lookup_ingredient(&self, name: &str) -> Result<NutrientProfile> {
        debug!(name, "Looking up ingredient");
        let request = ingredient_request(name);
        let text = self
            .generate(&request)
            .await
            .map_err(|reason| TrackerError::IngredientLookup {
                name: name.to_string(),
                reason,
            })?;
        parse_nutrient_profile(name, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_uses_model() {
        let client = GeminiClient::new("key", "gemini-2.5-flash").unwrap();
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_endpoint_custom_model() {
        let client = GeminiClient::new("key", "gemini-2.0-pro").unwrap();
        assert!(client.endpoint().ends_with("/models/gemini-2.0-pro:generateContent"));
    }
}
