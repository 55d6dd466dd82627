// src/main.rs
use actix_web::{App, HttpServer, middleware, web};
use log::{error, info, warn};
use std::sync::Arc;

mod config;
mod errors;
mod handlers;
mod models;
mod services;

use crate::config::Config;
use crate::handlers::{generate_image, generate_video, health_check, video_status, wait_for_video};
use crate::services::{
    ImageGenerator, OpenAiImageService, PollPolicy, ReplicateVideoService, VideoGenerator,
};

#[derive(Clone)]
pub struct AppState {
    images: Arc<dyn ImageGenerator>,
    videos: Arc<dyn VideoGenerator>,
    poll_policy: PollPolicy,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(handlers::json_config())
        .app_data(handlers::query_config())
        .service(
            web::scope("/api")
                .route("/generate-image", web::post().to(generate_image))
                .service(
                    web::resource("/generate-video")
                        .route(web::post().to(generate_video))
                        .route(web::get().to(video_status)),
                )
                .route("/generate-video/wait", web::get().to(wait_for_video)),
        )
        .route("/health", web::get().to(health_check));
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting promptreel service...");

    let config = Config::from_env().map_err(|e| {
        error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;

    // Credentials are checked per request; a missing one only disables that route.
    if config.image.api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; image generation requests will be rejected");
    }
    if config.video.api_token.is_none() {
        warn!("REPLICATE_API_TOKEN is not set; video generation requests will be rejected");
    }

    let app_state = AppState {
        images: Arc::new(OpenAiImageService::new(config.image.clone())),
        videos: Arc::new(ReplicateVideoService::new(config.video.clone())),
        poll_policy: PollPolicy::from(&config.poll),
    };

    let (host, port) = config.bind_addr();
    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .configure(configure_routes)
    })
    .bind((host, port))?
    .run()
    .await
}
