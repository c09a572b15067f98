//! Configuration types and environment-driven constructors for LLM profiles.

pub mod default_config;
pub mod llm_model_config;
pub mod llm_provider;

pub use default_config::{
    config_gemini_embedding, config_gemini_fast, config_gemini_slow, config_ollama_embedding,
    config_ollama_fast, config_ollama_slow, config_openai_fast, config_openai_slow,
};
pub use llm_model_config::LlmModelConfig;
pub use llm_provider::LlmProvider;
