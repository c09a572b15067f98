//! Wires `sandbox_executor::CapabilityHandler` to the provider gateway and a
//! single-shot LLM call (spec §4.3, §9).

use std::sync::Arc;

use futures::future::BoxFuture;
use provider_gateway::{Gateway, GatewayError, PRInfo};
use sandbox_executor::{CapabilityError, CapabilityHandler, SearchHitWire};

use crate::llm_client::LlmClient;

pub struct SessionCapabilities {
    gateway: Arc<Gateway>,
    llm: Arc<LlmClient>,
    pr: PRInfo,
}

impl SessionCapabilities {
    pub fn new(gateway: Arc<Gateway>, llm: Arc<LlmClient>, pr: PRInfo) -> Self {
        Self { gateway, llm, pr }
    }
}

fn map_gateway_error(e: GatewayError) -> CapabilityError {
    match e {
        GatewayError::NotFound => CapabilityError::not_found(e.to_string()),
        GatewayError::RateLimited { .. } | GatewayError::Transport(_) | GatewayError::Unauthorized => {
            CapabilityError::denied(e.to_string())
        }
        other => CapabilityError::denied(other.to_string()),
    }
}

impl CapabilityHandler for SessionCapabilities {
    fn fetch_file(&self, path: String, sha: Option<String>) -> BoxFuture<'_, Result<String, CapabilityError>> {
        Box::pin(async move {
            let (text, _cache_key) = self
                .gateway
                .fetch_file(&self.pr, &path, sha.as_deref())
                .await
                .map_err(map_gateway_error)?;
            Ok(text)
        })
    }

    fn search(&self, query: String, sha: Option<String>) -> BoxFuture<'_, Result<Vec<SearchHitWire>, CapabilityError>> {
        Box::pin(async move {
            let hits = self
                .gateway
                .search(&self.pr, &query, sha.as_deref())
                .await
                .map_err(map_gateway_error)?;
            Ok(hits
                .into_iter()
                .map(|h| SearchHitWire {
                    path: h.path,
                    line: h.line,
                    snippet: h.snippet,
                })
                .collect())
        })
    }

    fn llm_query(&self, prompt: String, system: Option<String>) -> BoxFuture<'_, Result<String, CapabilityError>> {
        Box::pin(async move {
            self.llm
                .single_shot(&prompt, system.as_deref())
                .await
                .map_err(|e| CapabilityError::denied(e.to_string()))
        })
    }
}
