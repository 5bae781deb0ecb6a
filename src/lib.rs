//! docsight - LLM-driven document analysis and insight pipeline.
//!
//! Core library exposing the analysis pipeline, completion client,
//! and document models for the CLI binary.

// Provider types use `from_str` methods that return Option<Self>,
// not Result<Self, Error> as std::str::FromStr requires.
#![allow(clippy::should_implement_trait)]

pub mod analysis;
pub mod config;
pub mod llm;
pub mod models;
pub mod utils;
