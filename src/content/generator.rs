use super::gemini::{DEFAULT_MODEL, GeminiClient, GeneratedContent, ImageData};
use super::rotation::{KeyRotationClient, Rotation};
use crate::error::{AutofillError, Result};
use log::info;

/// Prompt used when none is configured
pub const DEFAULT_PROMPT: &str = "Write an Etsy listing title (under 140 characters) and 13 search tags \
(each under 20 characters) for the product in this photo.";

/// Generates listing content for an image, rotating over the configured API keys
#[derive(Debug, Clone)]
pub struct ContentGenerator {
    client: GeminiClient,
    rotation: KeyRotationClient,
    api_keys: Vec<String>,
    model: String,
    prompt: String,
}

impl ContentGenerator {
    pub fn new(client: GeminiClient, api_keys: Vec<String>) -> Self {
        Self {
            client,
            rotation: KeyRotationClient::new(),
            api_keys: api_keys.into_iter().map(|k| k.trim().to_string()).filter(|k| !k.is_empty()).collect(),
            model: DEFAULT_MODEL.to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.model = model;
        }
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        if !prompt.trim().is_empty() {
            self.prompt = prompt;
        }
        self
    }

    pub fn rotation(mut self, rotation: KeyRotationClient) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn has_credentials(&self) -> bool {
        !self.api_keys.is_empty()
    }

    /// Generate `{title, tags}` for an image.
    ///
    /// Missing keys or image data fail before any request is sent.
    pub async fn generate(&self, image: &ImageData) -> Result<Rotation<GeneratedContent>> {
        if self.api_keys.is_empty() {
            return Err(AutofillError::NoCredentials);
        }
        if image.data.is_empty() || image.mime_type.is_empty() {
            return Err(AutofillError::NoImageData);
        }

        info!("Generating listing content with model {} ({} keys)", self.model, self.api_keys.len());

        let rotation = self
            .rotation
            .invoke(&self.api_keys, |key| async move {
                self.client.generate(&key, &self.model, &self.prompt, image).await
            })
            .await?;

        if !rotation.failures.is_empty() {
            info!("Generated after {} failed key(s)", rotation.failures.len());
        }
        Ok(rotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(keys: &[&str]) -> ContentGenerator {
        let client = GeminiClient::with_base_url("http://127.0.0.1:9").unwrap();
        ContentGenerator::new(client, keys.iter().map(|k| k.to_string()).collect())
    }

    #[tokio::test]
    async fn test_no_keys_fails_fast() {
        let err = generator(&[" ", ""]).generate(&ImageData::from_bytes("image/jpeg", b"x")).await.unwrap_err();
        assert!(matches!(err, AutofillError::NoCredentials));
    }

    #[tokio::test]
    async fn test_empty_image_fails_fast() {
        let image = ImageData { mime_type: "image/jpeg".into(), data: String::new() };
        let err = generator(&["key"]).generate(&image).await.unwrap_err();
        assert!(matches!(err, AutofillError::NoImageData));
    }

    #[test]
    fn test_blank_overrides_keep_defaults() {
        let generator = generator(&["key"]).model("  ").prompt("");
        assert_eq!(generator.model, DEFAULT_MODEL);
        assert_eq!(generator.prompt, DEFAULT_PROMPT);
        assert!(generator.has_credentials());
    }
}
