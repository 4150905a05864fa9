//! Job-skill matching and AI career content.

pub mod advisor;
pub mod analyzer;
pub mod engine;
pub mod handlers;
pub mod prompts;
