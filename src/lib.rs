//! Image gallery enrichment service
//!
//! Uploaded images are annotated in the background by a vision model
//! (description, tags, dominant colors) through a single-flight FIFO worker,
//! and the gallery can then be searched by text, color, or tag/color
//! similarity to another image.

pub mod app_state;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
