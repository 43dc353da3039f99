//! Photo tagging service
//!
//! Scores photographs against a candidate label set through an external
//! zero-shot inference service and persists the ranked labels per image
//! path for lookup and tag search. Large directories are processed in
//! paced, bounded-width groups.

pub mod app_state;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
