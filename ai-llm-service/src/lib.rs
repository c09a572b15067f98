//! Shared LLM service with three active profiles (`fast`, `slow`, `embedding`)
//! over Ollama, OpenAI, and Gemini backends, plus unified errors and health checks.

pub mod config;
pub mod error_handler;
pub mod health_service;
pub mod service_profiles;
pub mod services;
pub mod telemetry;

pub use config::{LlmModelConfig, LlmProvider};
pub use error_handler::AiLlmError;
pub use service_profiles::LlmServiceProfiles;
