// src/services/test_support.rs
//! Stand-ins for the upstream providers and for the gateways themselves.
use actix_web::dev::ServerHandle;
use actix_web::http::StatusCode;
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

use crate::errors::GenError;
use crate::models::*;
use crate::services::image_service::augment_image_prompt;
use crate::services::video_service::{VIDEO_MODEL_NAME, augment_video_prompt};
use crate::services::{ImageGenerator, VideoGenerator};

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Default)]
struct Script {
    responses: Mutex<VecDeque<(u16, Value)>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Replies with the scripted responses in order; the last one repeats.
pub struct FakeProvider {
    base_url: String,
    script: Arc<Script>,
    server: ServerHandle,
}

impl FakeProvider {
    pub fn start(responses: Vec<(u16, Value)>) -> Self {
        let script = Arc::new(Script {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        });
        let data = web::Data::from(script.clone());

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(data.clone())
                .default_service(web::to(respond))
        })
        .workers(1)
        .disable_signals()
        .listen(listener)
        .unwrap()
        .run();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            script,
            server: handle,
        }
    }

    pub fn base_url(&self) -> String {
        self.base_url.clone()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.script.requests.lock().unwrap().clone()
    }
}

impl Drop for FakeProvider {
    fn drop(&mut self) {
        let _ = self.server.stop(false);
    }
}

async fn respond(req: HttpRequest, body: web::Bytes, script: web::Data<Script>) -> HttpResponse {
    script.requests.lock().unwrap().push(RecordedRequest {
        method: req.method().to_string(),
        path: req.path().to_string(),
        authorization: req
            .headers()
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    let (status, reply) = {
        let mut responses = script.responses.lock().unwrap();
        if responses.len() > 1 {
            responses.pop_front().unwrap()
        } else {
            responses.front().cloned().unwrap_or((500, Value::Null))
        }
    };

    HttpResponse::build(StatusCode::from_u16(status).unwrap()).json(reply)
}

/// One scripted answer of [`FakeVideoGenerator::poll_video_job`].
#[derive(Debug, Clone)]
pub enum Scripted {
    Snapshot(JobSnapshot),
    HttpError(u16),
    /// The status query never answers.
    Hang,
}

impl Scripted {
    pub fn status(status: &str) -> Self {
        Scripted::Snapshot(JobSnapshot {
            id: "pred-1".to_string(),
            status: status.to_string(),
            output: None,
            error: None,
            logs: None,
        })
    }

    pub fn succeeded(url: &str) -> Self {
        Scripted::Snapshot(JobSnapshot {
            id: "pred-1".to_string(),
            status: "succeeded".to_string(),
            output: Some(vec![url.to_string()]),
            error: None,
            logs: Some("done".to_string()),
        })
    }

    pub fn failed(error: Option<&str>) -> Self {
        Scripted::Snapshot(JobSnapshot {
            id: "pred-1".to_string(),
            status: "failed".to_string(),
            output: None,
            error: error.map(str::to_string),
            logs: None,
        })
    }

    pub fn http_error(status: u16) -> Self {
        Scripted::HttpError(status)
    }
}

/// In-process video gateway; the last scripted answer repeats.
pub struct FakeVideoGenerator {
    configured: bool,
    script: Mutex<VecDeque<Scripted>>,
    submitted: Mutex<Vec<VideoRequest>>,
    poll_times: Mutex<Vec<Instant>>,
}

impl FakeVideoGenerator {
    pub fn with_script(script: Vec<Scripted>) -> Arc<Self> {
        Arc::new(Self {
            configured: true,
            script: Mutex::new(script.into()),
            submitted: Mutex::new(Vec::new()),
            poll_times: Mutex::new(Vec::new()),
        })
    }

    pub fn unconfigured() -> Arc<Self> {
        Arc::new(Self {
            configured: false,
            script: Mutex::new(VecDeque::new()),
            submitted: Mutex::new(Vec::new()),
            poll_times: Mutex::new(Vec::new()),
        })
    }

    pub fn poll_count(&self) -> usize {
        self.poll_times.lock().unwrap().len()
    }

    pub fn poll_times(&self) -> Vec<Instant> {
        self.poll_times.lock().unwrap().clone()
    }

    pub fn submitted(&self) -> Vec<VideoRequest> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl VideoGenerator for FakeVideoGenerator {
    fn ensure_credentials(&self) -> Result<(), GenError> {
        if self.configured {
            Ok(())
        } else {
            Err(GenError::Credential("REPLICATE_API_TOKEN is not set".to_string()))
        }
    }

    async fn start_video_job(&self, request: &VideoRequest) -> Result<VideoJob, GenError> {
        self.submitted.lock().unwrap().push(request.clone());
        Ok(VideoJob {
            prediction_id: "pred-1".to_string(),
            status: "starting".to_string(),
            prompt: augment_video_prompt(request.prompt.as_deref().unwrap_or_default()),
            metadata: VideoMetadata {
                duration: request.duration,
                fps: request.fps,
                model: VIDEO_MODEL_NAME.to_string(),
                timestamp: chrono::Utc::now(),
            },
        })
    }

    async fn poll_video_job(&self, _job_id: &str) -> Result<JobSnapshot, GenError> {
        self.poll_times.lock().unwrap().push(Instant::now());
        let next = {
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            }
        };
        match next {
            Some(Scripted::Snapshot(snapshot)) => Ok(snapshot),
            Some(Scripted::HttpError(status)) => Err(GenError::provider(
                Some(status),
                "Failed to fetch video status",
            )),
            Some(Scripted::Hang) => std::future::pending().await,
            None => Err(GenError::Unexpected("script exhausted".to_string())),
        }
    }
}

/// In-process image gateway that records every call.
pub struct FakeImageGenerator {
    configured: bool,
    failure: Option<(u16, String)>,
    calls: Mutex<Vec<(String, ImageStyle, ImageSize)>>,
}

impl FakeImageGenerator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            configured: true,
            failure: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn unconfigured() -> Arc<Self> {
        Arc::new(Self {
            configured: false,
            failure: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Every call fails as the provider would, with `status` and `message`.
    pub fn failing(status: u16, message: &str) -> Arc<Self> {
        Arc::new(Self {
            configured: true,
            failure: Some((status, message.to_string())),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(String, ImageStyle, ImageSize)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageGenerator for FakeImageGenerator {
    fn ensure_credentials(&self) -> Result<(), GenError> {
        if self.configured {
            Ok(())
        } else {
            Err(GenError::Credential("OPENAI_API_KEY is not set".to_string()))
        }
    }

    async fn generate_image(
        &self,
        prompt: &str,
        style: ImageStyle,
        size: ImageSize,
    ) -> Result<ImageResult, GenError> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), style, size));
        if let Some((status, message)) = &self.failure {
            return Err(GenError::provider(Some(*status), message.clone()));
        }
        Ok(ImageResult {
            image_url: "https://images.example/out.png".to_string(),
            prompt: augment_image_prompt(prompt, style),
            metadata: ImageMetadata {
                size,
                style,
                model: "dall-e-3".to_string(),
                timestamp: chrono::Utc::now(),
            },
        })
    }
}
