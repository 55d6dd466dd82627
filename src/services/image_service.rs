// src/services/image_service.rs
use async_trait::async_trait;
use log::{error, info};
use reqwest::Client;
use serde::Serialize;

use crate::config::ImageProviderConfig;
use crate::errors::GenError;
use crate::models::*;

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Fails when the provider credential is not configured.
    fn ensure_credentials(&self) -> Result<(), GenError>;

    async fn generate_image(
        &self,
        prompt: &str,
        style: ImageStyle,
        size: ImageSize,
    ) -> Result<ImageResult, GenError>;
}

pub fn augment_image_prompt(prompt: &str, style: ImageStyle) -> String {
    format!("{}, {} style, high quality, detailed", prompt, style)
}

#[derive(Debug, Serialize)]
pub struct ImageGenerationBody<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub n: u32,
    pub size: ImageSize,
    pub quality: &'static str,
    pub response_format: &'static str,
}

pub struct OpenAiImageService {
    config: ImageProviderConfig,
    client: Client,
}

impl OpenAiImageService {
    pub fn new(config: ImageProviderConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    fn api_key(&self) -> Result<&str, GenError> {
        self.config.api_key.as_deref().ok_or_else(|| {
            GenError::Credential("Please configure the OPENAI_API_KEY environment variable".to_string())
        })
    }
}

#[async_trait]
impl ImageGenerator for OpenAiImageService {
    fn ensure_credentials(&self) -> Result<(), GenError> {
        self.api_key().map(|_| ())
    }

    async fn generate_image(
        &self,
        prompt: &str,
        style: ImageStyle,
        size: ImageSize,
    ) -> Result<ImageResult, GenError> {
        let prompt = require_prompt(Some(prompt), "image")?;
        let api_key = self.api_key()?;

        let optimized_prompt = augment_image_prompt(prompt, style);
        let body = ImageGenerationBody {
            model: &self.config.model,
            prompt: &optimized_prompt,
            n: 1,
            size,
            quality: "standard",
            response_format: "url",
        };

        info!("Requesting {} image ({}, {})", self.config.model, style, size);

        let response = self
            .client
            .post(format!("{}/images/generations", self.config.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body: serde_json::Value = response.json().await.unwrap_or_default();
            let message = error_body["error"]["message"]
                .as_str()
                .unwrap_or("Unknown error");
            error!("Image provider returned {}: {}", status, message);
            return Err(GenError::provider(
                Some(status.as_u16()),
                format!("Image generation failed: {}", message),
            ));
        }

        let result: serde_json::Value = response.json().await?;
        let image_url = result["data"][0]["url"]
            .as_str()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                GenError::provider(None, "Image generation returned no image, please retry")
            })?;

        Ok(ImageResult {
            image_url: image_url.to_string(),
            prompt: optimized_prompt,
            metadata: ImageMetadata {
                size,
                style,
                model: self.config.model.clone(),
                timestamp: chrono::Utc::now(),
            },
        })
    }
}
