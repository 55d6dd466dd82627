// src/services/mod.rs
pub mod image_service;
pub mod poller;
pub mod video_service;

#[cfg(test)]
pub(crate) mod test_support;

pub use image_service::{ImageGenerator, OpenAiImageService};
pub use poller::{JobPoller, PollPolicy};
pub use video_service::{ReplicateVideoService, VideoGenerator};
