// src/handlers.rs
use crate::{AppState, errors::GenError, models::*, services::JobPoller};
use actix_web::{HttpResponse, web};
use log::info;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub id: Option<String>,
}

fn require_job_id(id: Option<&str>) -> Result<&str, GenError> {
    match id.map(str::trim) {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(GenError::Validation(
            "Please provide a prediction id".to_string(),
        )),
    }
}

/// Malformed bodies render like every other validation failure.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        GenError::Validation(format!("Invalid request body: {}", err)).into()
    })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        GenError::Validation(format!("Invalid query string: {}", err)).into()
    })
}

pub async fn generate_image(
    body: web::Json<ImageRequest>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, GenError> {
    let request = body.into_inner();
    let prompt = require_prompt(request.prompt.as_deref(), "image")?;
    data.images.ensure_credentials()?;

    let result = data
        .images
        .generate_image(prompt, request.style, request.size)
        .await?;

    Ok(HttpResponse::Ok().json(Generated::new(result)))
}

pub async fn generate_video(
    body: web::Json<VideoRequest>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, GenError> {
    let request = body.into_inner();
    require_prompt(request.prompt.as_deref(), "video")?;
    request.validate_options()?;
    data.videos.ensure_credentials()?;

    let job = data.videos.start_video_job(&request).await?;

    Ok(HttpResponse::Ok().json(Generated::new(job)))
}

pub async fn video_status(
    query: web::Query<StatusQuery>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, GenError> {
    let id = require_job_id(query.id.as_deref())?;
    data.videos.ensure_credentials()?;

    let snapshot = data.videos.poll_video_job(id).await?;

    Ok(HttpResponse::Ok().json(snapshot))
}

/// Polls the job server-side until it is terminal. A client disconnect drops
/// the handle, which stops the poll loop.
pub async fn wait_for_video(
    query: web::Query<StatusQuery>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, GenError> {
    let id = require_job_id(query.id.as_deref())?;
    data.videos.ensure_credentials()?;

    let poller = JobPoller::new(data.videos.clone(), id, data.poll_policy.clone());
    info!("Waiting for video job {}", poller.job_id());
    let snapshot = poller.spawn().join().await?;

    Ok(HttpResponse::Ok().json(snapshot))
}

pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "promptreel",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
