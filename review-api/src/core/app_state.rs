//! Shared application state (spec §6 Configuration) built once at startup and
//! cloned (as an `Arc`) into every handler.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ai_llm_service::config::{config_gemini_embedding, config_gemini_fast, config_gemini_slow};
use ai_llm_service::{AiLlmError, LlmServiceProfiles};
use artifact_cache::ArtifactCache;
use provider_gateway::providers::ProviderConfig;
use provider_gateway::{Gateway, PRInfo, ProviderKind};
use rlm_controller::{Controller, LlmClient};
use sandbox_executor::{ResourceLimits, SandboxExecutor};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("llm configuration error: {0}")]
    Llm(#[from] AiLlmError),
}

/// Env-driven settings (spec §6): `GEMINI_API_KEY` plus its model vars are
/// read directly by `ai_llm_service::config::config_gemini_*`; everything
/// else is collected here.
pub struct AppConfig {
    pub github_token: Option<String>,
    pub github_api_base: String,
    pub gitlab_token: Option<String>,
    pub gitlab_api_base: String,
    pub rlm_max_iterations: u32,
    pub rlm_deadline: Duration,
    pub sandbox_timeout: Duration,
    pub cache_bytes: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            github_token: non_empty_env("GITHUB_TOKEN"),
            github_api_base: std::env::var("GITHUB_API_BASE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "https://api.github.com".to_string()),
            gitlab_token: non_empty_env("GITLAB_TOKEN"),
            gitlab_api_base: std::env::var("GITLAB_API_BASE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "https://gitlab.com/api/v4".to_string()),
            rlm_max_iterations: std::env::var("RLM_MAX_ITERATIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            rlm_deadline: Duration::from_secs(
                std::env::var("RLM_DEADLINE_SEC")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(600),
            ),
            sandbox_timeout: Duration::from_secs(
                std::env::var("SANDBOX_TIMEOUT_SEC")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            ),
            cache_bytes: std::env::var("CACHE_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(256 * 1024 * 1024),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

/// Shared state for handlers (spec §6 HTTP surface). The review engine is
/// assembled once here and every endpoint borrows from it through `Arc`.
pub struct AppState {
    pub config: AppConfig,
    pub gateway: Arc<Gateway>,
    pub controller: Arc<Controller>,
    pub llm: Arc<LlmClient>,
    /// `reviewId -> PRInfo` loaded by `/api/github/load_pr`; every later
    /// `reviewId`-addressed endpoint (file, review, ask/stream, suggestions)
    /// looks the session up here rather than re-fetching from the provider.
    pub sessions: RwLock<HashMap<String, PRInfo>>,
}

impl AppState {
    pub fn build(config: AppConfig) -> Result<Self, ConfigError> {
        let cache = Arc::new(ArtifactCache::new(config.cache_bytes));

        let provider_configs = vec![
            ProviderConfig {
                kind: ProviderKind::GitHub,
                base_api: config.github_api_base.clone(),
                token: config.github_token.clone(),
            },
            ProviderConfig {
                kind: ProviderKind::GitHubEnterprise,
                base_api: config.github_api_base.clone(),
                token: config.github_token.clone(),
            },
            ProviderConfig {
                kind: ProviderKind::GitLab,
                base_api: config.gitlab_api_base.clone(),
                token: config.gitlab_token.clone(),
            },
        ];

        // Enterprise hosts aren't part of §6's env surface for the API host
        // (only `GITHUB_API_BASE` is), so `parse_url` never resolves a URL to
        // `GitHubEnterprise` here; the variant is still wired so a caller
        // that extends enterprise-host detection doesn't also need to touch
        // client construction.
        let gateway = Arc::new(Gateway::new(provider_configs, Vec::new(), cache));

        let fast = config_gemini_fast()?;
        let slow = config_gemini_slow()?;
        let embedding = config_gemini_embedding()?;
        let profiles = Arc::new(LlmServiceProfiles::new(fast, Some(slow), embedding, Some(10))?);
        let llm = Arc::new(LlmClient::new(profiles));

        let sandbox = Arc::new(SandboxExecutor::new(
            "python3",
            ResourceLimits {
                wall_clock: config.sandbox_timeout,
                ..ResourceLimits::default()
            },
        ));

        let controller = Arc::new(Controller::new(Arc::clone(&gateway), Arc::clone(&llm), sandbox));

        Ok(Self {
            config,
            gateway,
            controller,
            llm,
            sessions: RwLock::new(HashMap::new()),
        })
    }
}
