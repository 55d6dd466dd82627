// src/services/video_service.rs
use async_trait::async_trait;
use log::{debug, error, info};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::config::VideoProviderConfig;
use crate::errors::GenError;
use crate::models::*;

pub const VIDEO_MODEL_NAME: &str = "stable-video-diffusion";

const NUM_INFERENCE_STEPS: u32 = 20;
const GUIDANCE_SCALE: f64 = 7.5;
const MOTION_BUCKET_ID: u32 = 127;
const NOISE_AUG_STRENGTH: f64 = 0.1;

#[async_trait]
pub trait VideoGenerator: Send + Sync {
    /// Fails when the provider credential is not configured.
    fn ensure_credentials(&self) -> Result<(), GenError>;

    async fn start_video_job(&self, request: &VideoRequest) -> Result<VideoJob, GenError>;

    async fn poll_video_job(&self, job_id: &str) -> Result<JobSnapshot, GenError>;
}

pub fn augment_video_prompt(prompt: &str) -> String {
    format!("{}, high quality video, smooth motion, detailed", prompt)
}

#[derive(Debug, Serialize)]
pub struct PredictionBody<'a> {
    pub version: &'a str,
    pub input: PredictionInput<'a>,
}

#[derive(Debug, Serialize)]
pub struct PredictionInput<'a> {
    pub prompt: &'a str,
    pub max_frames: u32,
    pub num_inference_steps: u32,
    pub guidance_scale: f64,
    pub fps: u32,
    pub motion_bucket_id: u32,
    pub noise_aug_strength: f64,
}

#[derive(Debug, Deserialize)]
struct PredictionCreated {
    id: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

pub struct ReplicateVideoService {
    config: VideoProviderConfig,
    client: Client,
}

impl ReplicateVideoService {
    pub fn new(config: VideoProviderConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    fn api_token(&self) -> Result<&str, GenError> {
        self.config.api_token.as_deref().ok_or_else(|| {
            GenError::Credential(
                "Please configure the REPLICATE_API_TOKEN environment variable".to_string(),
            )
        })
    }

    fn prediction_url(&self, job_id: &str) -> Result<Url, GenError> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| GenError::Unexpected(format!("Invalid provider URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| GenError::Unexpected("Invalid provider URL".to_string()))?
            .pop_if_empty()
            .push("predictions")
            .push(job_id);
        Ok(url)
    }
}

#[async_trait]
impl VideoGenerator for ReplicateVideoService {
    fn ensure_credentials(&self) -> Result<(), GenError> {
        self.api_token().map(|_| ())
    }

    async fn start_video_job(&self, request: &VideoRequest) -> Result<VideoJob, GenError> {
        let prompt = require_prompt(request.prompt.as_deref(), "video")?;
        request.validate_options()?;
        let api_token = self.api_token()?;

        let optimized_prompt = augment_video_prompt(prompt);
        let body = PredictionBody {
            version: &self.config.model_version,
            input: PredictionInput {
                prompt: &optimized_prompt,
                max_frames: request.frame_count(),
                num_inference_steps: NUM_INFERENCE_STEPS,
                guidance_scale: GUIDANCE_SCALE,
                fps: request.fps,
                motion_bucket_id: MOTION_BUCKET_ID,
                noise_aug_strength: NOISE_AUG_STRENGTH,
            },
        };

        info!(
            "Submitting video job ({}s at {} fps, {} frames)",
            request.duration,
            request.fps,
            request.frame_count()
        );

        let response = self
            .client
            .post(format!("{}/predictions", self.config.base_url))
            .header("Authorization", format!("Token {}", api_token))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body: serde_json::Value = response.json().await.unwrap_or_default();
            let message = error_body["error"]["message"]
                .as_str()
                .or_else(|| error_body["detail"].as_str())
                .unwrap_or("Unknown error");
            error!("Video provider returned {}: {}", status, message);
            return Err(GenError::provider(
                Some(status.as_u16()),
                format!("Video generation failed: {}", message),
            ));
        }

        let created: PredictionCreated = response.json().await?;
        let prediction_id = created
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| GenError::provider(None, "Video provider did not return a job id"))?;

        info!("Video job {} accepted", prediction_id);

        Ok(VideoJob {
            prediction_id,
            status: created.status.unwrap_or_else(|| "starting".to_string()),
            prompt: optimized_prompt,
            metadata: VideoMetadata {
                duration: request.duration,
                fps: request.fps,
                model: VIDEO_MODEL_NAME.to_string(),
                timestamp: chrono::Utc::now(),
            },
        })
    }

    async fn poll_video_job(&self, job_id: &str) -> Result<JobSnapshot, GenError> {
        let job_id = job_id.trim();
        if job_id.is_empty() {
            return Err(GenError::Validation(
                "Please provide a prediction id".to_string(),
            ));
        }
        let api_token = self.api_token()?;

        let response = self
            .client
            .get(self.prediction_url(job_id)?)
            .header("Authorization", format!("Token {}", api_token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!("Status check for video job {} returned {}", job_id, status);
            return Err(GenError::provider(
                Some(status.as_u16()),
                "Failed to fetch video status",
            ));
        }

        let snapshot: JobSnapshot = response.json().await?;
        debug!("Video job {} is {}", snapshot.id, snapshot.status);
        Ok(snapshot)
    }
}
