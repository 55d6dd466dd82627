// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::errors::GenError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStyle {
    #[default]
    Realistic,
    Artistic,
    Cartoon,
    Abstract,
}

impl ImageStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageStyle::Realistic => "realistic",
            ImageStyle::Artistic => "artistic",
            ImageStyle::Cartoon => "cartoon",
            ImageStyle::Abstract => "abstract",
        }
    }
}

impl fmt::Display for ImageStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageSize {
    #[default]
    #[serde(rename = "1024x1024")]
    Square,
    #[serde(rename = "1792x1024")]
    Landscape,
    #[serde(rename = "1024x1792")]
    Portrait,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::Square => "1024x1024",
            ImageSize::Landscape => "1792x1024",
            ImageSize::Portrait => "1024x1792",
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /api/generate-image`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub style: ImageStyle,
    #[serde(default)]
    pub size: ImageSize,
}

/// Body of `POST /api/generate-video`.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default = "default_duration")]
    pub duration: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
}

fn default_duration() -> u32 {
    3
}

fn default_fps() -> u32 {
    24
}

impl Default for VideoRequest {
    fn default() -> Self {
        Self {
            prompt: None,
            duration: default_duration(),
            fps: default_fps(),
        }
    }
}

impl VideoRequest {
    /// Number of frames the provider is asked to render.
    pub fn frame_count(&self) -> u32 {
        self.duration * self.fps
    }

    pub fn validate_options(&self) -> Result<(), GenError> {
        if self.duration == 0 {
            return Err(GenError::Validation(
                "Video duration must be a positive number of seconds".to_string(),
            ));
        }
        if self.fps == 0 {
            return Err(GenError::Validation(
                "Video fps must be a positive number".to_string(),
            ));
        }
        self.duration.checked_mul(self.fps).ok_or_else(|| {
            GenError::Validation("Video duration and fps are too large".to_string())
        })?;
        Ok(())
    }
}

/// Returns the trimmed prompt, or a validation error when it is absent or blank.
pub fn require_prompt<'a>(prompt: Option<&'a str>, what: &str) -> Result<&'a str, GenError> {
    match prompt.map(str::trim) {
        Some(p) if !p.is_empty() => Ok(p),
        _ => Err(GenError::Validation(format!(
            "Please provide a {} generation prompt",
            what
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageMetadata {
    pub size: ImageSize,
    pub style: ImageStyle,
    pub model: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResult {
    pub image_url: String,
    pub prompt: String,
    pub metadata: ImageMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoMetadata {
    pub duration: u32,
    pub fps: u32,
    pub model: String,
    pub timestamp: DateTime<Utc>,
}

/// A submitted video job as reported by the provider at submission time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoJob {
    pub prediction_id: String,
    pub status: String,
    pub prompt: String,
    pub metadata: VideoMetadata,
}

/// Success envelope: `{ "success": true, ...result }`.
#[derive(Debug, Serialize)]
pub struct Generated<T> {
    pub success: bool,
    #[serde(flatten)]
    pub result: T,
}

impl<T: Serialize> Generated<T> {
    pub fn new(result: T) -> Self {
        Self {
            success: true,
            result,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Starting,
    Processing,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// Anything the provider reports that we do not recognise is treated as queued.
    pub fn from_provider(status: &str) -> Self {
        match status {
            "starting" => JobStatus::Starting,
            "processing" => JobStatus::Processing,
            "succeeded" => JobStatus::Succeeded,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Queued,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

/// Raw status of a video job, recreated on every poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: String,
    pub status: String,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Option::is_none"
    )]
    pub output: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "text_or_json",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
}

impl JobSnapshot {
    pub fn job_status(&self) -> JobStatus {
        JobStatus::from_provider(&self.status)
    }

    pub fn first_output(&self) -> Option<&str> {
        self.output
            .as_deref()
            .and_then(|urls| urls.iter().find(|u| !u.is_empty()))
            .map(String::as_str)
    }
}

/// Accepts a single URL or a list. Entries that are not strings are skipped,
/// and any other shape is treated as no output.
fn one_or_many<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        match Option::<serde_json::Value>::deserialize(deserializer)? {
            Some(serde_json::Value::String(url)) => Some(vec![url]),
            Some(serde_json::Value::Array(items)) => Some(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        serde_json::Value::String(url) => Some(url),
                        _ => None,
                    })
                    .collect(),
            ),
            _ => None,
        },
    )
}

fn text_or_json<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        match Option::<serde_json::Value>::deserialize(deserializer)? {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
        },
    )
}
