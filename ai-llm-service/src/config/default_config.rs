//! Default LLM configs loaded strictly from environment variables.
//!
//! This module provides convenience constructors for [`LlmModelConfig`],
//! grouped by provider and role:
//!
//! - **Slow**   → high-quality, slower model (refine/verify)
//! - **Fast**   → lower-quality, faster model (drafting)
//! - **Embedding** → embedding generator
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_MAX_TOKENS` = optional max tokens (u32)
//!
//! Ollama-specific:
//! - `OLLAMA_URL` or `OLLAMA_PORT` = endpoint (mandatory)
//! - `OLLAMA_MODEL`                = slow/quality model (mandatory)
//! - `OLLAMA_MODEL_FAST_MODEL` or `OLLAMA_MODEL_FAST` = fast/speed model (mandatory)
//! - `EMBEDDING_MODEL`             = embedding model (mandatory)
//!
//! OpenAI-specific:
//! - `OPENAI_API_KEY`   = API key (mandatory)
//! - `OPENAI_MODEL`     = slow/quality model (mandatory)
//! - `OPENAI_MODEL_FAST` = fast/speed model (mandatory)
//! - `OPENAI_ENDPOINT`  = optional override, defaults to `https://api.openai.com`
//!
//! Gemini-specific:
//! - `GEMINI_API_KEY`   = API key (mandatory; the primary provider credential)
//! - `GEMINI_MODEL`     = slow/quality model (mandatory)
//! - `GEMINI_MODEL_FAST` = fast/speed model (mandatory)
//! - `GEMINI_EMBEDDING_MODEL` = embedding model (mandatory)
//! - `GEMINI_ENDPOINT`  = optional override, defaults to `https://generativelanguage.googleapis.com`

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{AiLlmError, ConfigError, env_opt_u32, must_env},
};

const GEMINI_DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
const OPENAI_DEFAULT_ENDPOINT: &str = "https://api.openai.com";

/// Resolves the Ollama endpoint strictly from environment.
///
/// Precedence:
/// 1. `OLLAMA_URL` if present and non-empty
/// 2. `OLLAMA_PORT` → `http://localhost:{port}`
///
/// # Errors
///
/// - [`ConfigError::MissingVar`] if both are missing
/// - [`ConfigError::InvalidNumber`] if `OLLAMA_PORT` is invalid
fn ollama_endpoint() -> Result<String, AiLlmError> {
    if let Ok(url) = std::env::var("OLLAMA_URL") {
        if !url.trim().is_empty() {
            return Ok(url);
        }
    }
    if let Ok(port) = std::env::var("OLLAMA_PORT") {
        if !port.trim().is_empty() {
            let _ = port
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidNumber {
                    var: "OLLAMA_PORT",
                    reason: "expected u16 (1..=65535)",
                })?;
            return Ok(format!("http://localhost:{port}"));
        }
    }
    Err(AiLlmError::Config(ConfigError::MissingVar(
        "OLLAMA_URL or OLLAMA_PORT",
    )))
}

/// Constructs a config for the **slow/quality** Ollama model.
///
/// # Env
/// - `OLLAMA_MODEL` (required)
/// - `LLM_MAX_TOKENS` (optional)
pub fn config_ollama_slow() -> Result<LlmModelConfig, AiLlmError> {
    let endpoint = ollama_endpoint()?;
    let model = must_env("OLLAMA_MODEL")?;
    let max_tokens = env_opt_u32("LLM_MAX_TOKENS")?;

    Ok(LlmModelConfig {
        provider: LlmProvider::Ollama,
        model,
        endpoint,
        api_key: None,
        max_tokens,
        temperature: Some(0.2),
        top_p: None,
        timeout_secs: Some(600),
    })
}

/// Constructs a config for the **fast/speed** Ollama model.
///
/// # Env
/// - `OLLAMA_MODEL_FAST_MODEL` or `OLLAMA_MODEL_FAST` (required)
/// - `LLM_MAX_TOKENS` (optional)
pub fn config_ollama_fast() -> Result<LlmModelConfig, AiLlmError> {
    let endpoint = ollama_endpoint()?;
    let model = std::env::var("OLLAMA_MODEL_FAST_MODEL")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .or_else(|| std::env::var("OLLAMA_MODEL_FAST").ok())
        .ok_or(ConfigError::MissingVar(
            "OLLAMA_MODEL_FAST_MODEL or OLLAMA_MODEL_FAST",
        ))?;
    let max_tokens = env_opt_u32("LLM_MAX_TOKENS")?;

    Ok(LlmModelConfig {
        provider: LlmProvider::Ollama,
        model,
        endpoint,
        api_key: None,
        max_tokens,
        temperature: Some(0.7),
        top_p: Some(0.9),
        timeout_secs: Some(600),
    })
}

/// Constructs a config for the **embedding** Ollama model.
///
/// # Env
/// - `EMBEDDING_MODEL` (required)
pub fn config_ollama_embedding() -> Result<LlmModelConfig, AiLlmError> {
    let endpoint = ollama_endpoint()?;
    let model = must_env("EMBEDDING_MODEL")?;

    Ok(LlmModelConfig {
        provider: LlmProvider::Ollama,
        model,
        endpoint,
        api_key: None,
        max_tokens: None,
        temperature: Some(0.0),
        top_p: None,
        timeout_secs: Some(30),
    })
}

/// Constructs a config for the **slow/quality** OpenAI model.
///
/// # Env
/// - `OPENAI_API_KEY` (required)
/// - `OPENAI_MODEL` (required)
/// - `OPENAI_ENDPOINT` (optional, defaults to `https://api.openai.com`)
/// - `LLM_MAX_TOKENS` (optional)
pub fn config_openai_slow() -> Result<LlmModelConfig, AiLlmError> {
    let api_key = must_env("OPENAI_API_KEY")?;
    let model = must_env("OPENAI_MODEL")?;
    let endpoint = std::env::var("OPENAI_ENDPOINT")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| OPENAI_DEFAULT_ENDPOINT.to_string());
    let max_tokens = env_opt_u32("LLM_MAX_TOKENS")?;

    Ok(LlmModelConfig {
        provider: LlmProvider::OpenAI,
        model,
        endpoint,
        api_key: Some(api_key),
        max_tokens,
        temperature: Some(0.2),
        top_p: None,
        timeout_secs: Some(120),
    })
}

/// Constructs a config for the **fast/speed** OpenAI model.
///
/// # Env
/// - `OPENAI_API_KEY` (required)
/// - `OPENAI_MODEL_FAST` (required)
/// - `OPENAI_ENDPOINT` (optional)
pub fn config_openai_fast() -> Result<LlmModelConfig, AiLlmError> {
    let api_key = must_env("OPENAI_API_KEY")?;
    let model = must_env("OPENAI_MODEL_FAST")?;
    let endpoint = std::env::var("OPENAI_ENDPOINT")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| OPENAI_DEFAULT_ENDPOINT.to_string());
    let max_tokens = env_opt_u32("LLM_MAX_TOKENS")?;

    Ok(LlmModelConfig {
        provider: LlmProvider::OpenAI,
        model,
        endpoint,
        api_key: Some(api_key),
        max_tokens,
        temperature: Some(0.7),
        top_p: Some(0.9),
        timeout_secs: Some(60),
    })
}

fn gemini_endpoint() -> String {
    std::env::var("GEMINI_ENDPOINT")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| GEMINI_DEFAULT_ENDPOINT.to_string())
}

/// Constructs a config for the **slow/quality** Gemini model.
///
/// Gemini is the primary, required provider (spec: `GEMINI_API_KEY`).
///
/// # Env
/// - `GEMINI_API_KEY` (required)
/// - `GEMINI_MODEL` (required)
/// - `GEMINI_ENDPOINT` (optional, defaults to the public Gemini API)
pub fn config_gemini_slow() -> Result<LlmModelConfig, AiLlmError> {
    let api_key = must_env("GEMINI_API_KEY")?;
    let model = must_env("GEMINI_MODEL")?;
    let max_tokens = env_opt_u32("LLM_MAX_TOKENS")?;

    Ok(LlmModelConfig {
        provider: LlmProvider::Gemini,
        model,
        endpoint: gemini_endpoint(),
        api_key: Some(api_key),
        max_tokens,
        temperature: Some(0.2),
        top_p: None,
        timeout_secs: Some(120),
    })
}

/// Constructs a config for the **fast/speed** Gemini model.
///
/// # Env
/// - `GEMINI_API_KEY` (required)
/// - `GEMINI_MODEL_FAST` (required)
pub fn config_gemini_fast() -> Result<LlmModelConfig, AiLlmError> {
    let api_key = must_env("GEMINI_API_KEY")?;
    let model = must_env("GEMINI_MODEL_FAST")?;
    let max_tokens = env_opt_u32("LLM_MAX_TOKENS")?;

    Ok(LlmModelConfig {
        provider: LlmProvider::Gemini,
        model,
        endpoint: gemini_endpoint(),
        api_key: Some(api_key),
        max_tokens,
        temperature: Some(0.7),
        top_p: Some(0.9),
        timeout_secs: Some(60),
    })
}

/// Constructs a config for the **embedding** Gemini model.
///
/// # Env
/// - `GEMINI_API_KEY` (required)
/// - `GEMINI_EMBEDDING_MODEL` (required)
pub fn config_gemini_embedding() -> Result<LlmModelConfig, AiLlmError> {
    let api_key = must_env("GEMINI_API_KEY")?;
    let model = must_env("GEMINI_EMBEDDING_MODEL")?;

    Ok(LlmModelConfig {
        provider: LlmProvider::Gemini,
        model,
        endpoint: gemini_endpoint(),
        api_key: Some(api_key),
        max_tokens: None,
        temperature: Some(0.0),
        top_p: None,
        timeout_secs: Some(30),
    })
}
