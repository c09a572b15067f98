//! `execute(session, code) -> Observation` (spec §4.3).

use crate::errors::SandboxResult;
use crate::interceptor::{value_as_search_hits, CapabilityError, CapabilityHandler};
use crate::limits::{truncate_stdout, ResourceLimits};
use crate::process::GuestProcess;
use crate::protocol::{GuestFrame, HostFrame};
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct AnswerBlockWire {
    pub block_type: String,
    pub content: String,
    pub language: Option<String>,
}

/// Result of one guest execution (spec §3 `Iteration.output`/`error`, and the
/// `Observation` the interceptor returns to the controller).
#[derive(Debug, Clone, Default)]
pub struct Observation {
    pub stdout: String,
    pub return_value: Option<Value>,
    pub error: Option<String>,
    pub truncated: bool,
    /// Set when the guest called `answer(...)`; marks the iteration terminal
    /// (spec §4.4 step 4a). Not part of the literal `Observation` record in
    /// §3 but required for the controller to detect termination without
    /// re-parsing `return_value`.
    pub answer_blocks: Option<Vec<AnswerBlockWire>>,
}

pub struct SandboxExecutor {
    interpreter: String,
    limits: ResourceLimits,
}

impl SandboxExecutor {
    pub fn new(interpreter: impl Into<String>, limits: ResourceLimits) -> Self {
        Self {
            interpreter: interpreter.into(),
            limits,
        }
    }

    /// Runs `code` to completion or timeout, routing capability calls to
    /// `handler`. Invariant (4) of spec §3 holds because `env_clear()` strips
    /// the guest's environment and `runtime/supervisor.py` runs the guest's
    /// code against an explicit builtins/import allow-list that excludes
    /// `os`/`socket`/`subprocess`/`open` and blocks the dunder-attribute
    /// tricks that would otherwise reach them — every external effect must
    /// cross this interceptor instead.
    pub async fn execute(
        &self,
        code: &str,
        handler: &dyn CapabilityHandler,
    ) -> SandboxResult<Observation> {
        let run = self.run_inner(code, handler);
        match tokio::time::timeout(self.limits.wall_clock, run).await {
            Ok(result) => result,
            Err(_) => Ok(Observation {
                error: Some("timeout".to_string()),
                ..Default::default()
            }),
        }
    }

    async fn run_inner(
        &self,
        code: &str,
        handler: &dyn CapabilityHandler,
    ) -> SandboxResult<Observation> {
        let mut proc = GuestProcess::start(&self.interpreter, self.limits.max_memory_bytes)?;
        proc.send(&HostFrame::Execute {
            code: code.to_string(),
        })
        .await?;

        let mut llm_calls = 0u32;
        let mut answered: Option<Vec<AnswerBlockWire>> = None;

        loop {
            let frame = match proc.recv().await {
                Ok(f) => f,
                Err(e) => {
                    proc.kill().await;
                    return Err(e);
                }
            };

            match frame {
                GuestFrame::Done {
                    stdout,
                    return_value,
                    error,
                } => {
                    let (stdout, truncated) = truncate_stdout(&stdout, self.limits.stdout_cap_bytes);
                    return Ok(Observation {
                        stdout,
                        return_value,
                        error,
                        truncated,
                        answer_blocks: answered,
                    });
                }
                GuestFrame::Call { id, capability, args } => {
                    if capability == "answer" {
                        if answered.is_some() {
                            proc.send(&HostFrame::Error {
                                id,
                                kind: "AnswerAlreadyCalled".into(),
                                message: "answer() was already invoked in this iteration".into(),
                            })
                            .await?;
                            continue;
                        }
                        match parse_answer_blocks(&args) {
                            Ok(blocks) => {
                                answered = Some(blocks);
                                proc.send(&HostFrame::Result { id, value: Value::Null }).await?;
                            }
                            Err(msg) => {
                                proc.send(&HostFrame::Error {
                                    id,
                                    kind: "ValueError".into(),
                                    message: msg,
                                })
                                .await?;
                            }
                        }
                        continue;
                    }

                    if answered.is_some() {
                        // B1: calls after answer() are dropped silently.
                        proc.send(&HostFrame::Result { id, value: Value::Null }).await?;
                        continue;
                    }

                    self.dispatch(&mut proc, handler, id, &capability, args, &mut llm_calls)
                        .await?;
                }
            }
        }
    }

    async fn dispatch(
        &self,
        proc: &mut GuestProcess,
        handler: &dyn CapabilityHandler,
        id: u64,
        capability: &str,
        args: Value,
        llm_calls: &mut u32,
    ) -> SandboxResult<()> {
        match capability {
            "fetch_file" => {
                let path = args.get("path").and_then(Value::as_str).unwrap_or_default().to_string();
                let sha = args.get("sha").and_then(Value::as_str).map(str::to_string);
                match handler.fetch_file(path, sha).await {
                    Ok(text) => {
                        proc.send(&HostFrame::Result {
                            id,
                            value: Value::String(text),
                        })
                        .await
                    }
                    Err(e) => self.send_capability_error(proc, id, e).await,
                }
            }
            "search" => {
                let query = args.get("query").and_then(Value::as_str).unwrap_or_default().to_string();
                let sha = args.get("sha").and_then(Value::as_str).map(str::to_string);
                match handler.search(query, sha).await {
                    Ok(hits) => {
                        proc.send(&HostFrame::Result {
                            id,
                            value: value_as_search_hits(hits),
                        })
                        .await
                    }
                    Err(e) => self.send_capability_error(proc, id, e).await,
                }
            }
            "llm_query" => {
                if *llm_calls >= self.limits.max_llm_calls {
                    return self
                        .send_capability_error(
                            proc,
                            id,
                            CapabilityError::budget_exceeded("llm_query call budget exhausted for this iteration"),
                        )
                        .await;
                }
                *llm_calls += 1;
                let prompt = args.get("prompt").and_then(Value::as_str).unwrap_or_default().to_string();
                let system = args.get("system").and_then(Value::as_str).map(str::to_string);
                match handler.llm_query(prompt, system).await {
                    Ok(text) => {
                        proc.send(&HostFrame::Result {
                            id,
                            value: Value::String(text),
                        })
                        .await
                    }
                    Err(e) => self.send_capability_error(proc, id, e).await,
                }
            }
            other => {
                warn!(capability = other, "unknown capability requested by guest");
                self.send_capability_error(
                    proc,
                    id,
                    CapabilityError::denied(format!("unknown capability `{other}`")),
                )
                .await
            }
        }
    }

    async fn send_capability_error(&self, proc: &mut GuestProcess, id: u64, e: CapabilityError) -> SandboxResult<()> {
        debug!(kind = %e.kind, "capability call raised");
        proc.send(&HostFrame::Error {
            id,
            kind: e.kind,
            message: e.message,
        })
        .await
    }
}

fn parse_answer_blocks(args: &Value) -> Result<Vec<AnswerBlockWire>, String> {
    let blocks = args
        .get("blocks")
        .and_then(Value::as_array)
        .ok_or_else(|| "answer() requires a `blocks` array".to_string())?;

    blocks
        .iter()
        .map(|b| {
            let block_type = b
                .get("type")
                .and_then(Value::as_str)
                .ok_or_else(|| "answer block missing `type`".to_string())?
                .to_string();
            let content = b
                .get("content")
                .and_then(Value::as_str)
                .ok_or_else(|| "answer block missing `content`".to_string())?
                .to_string();
            let language = b.get("language").and_then(Value::as_str).map(str::to_string);
            Ok(AnswerBlockWire {
                block_type,
                content,
                language,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_well_formed_blocks() {
        let args = json!({"blocks": [{"type": "markdown", "content": "no issues"}]});
        let blocks = parse_answer_blocks(&args).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].block_type, "markdown");
        assert_eq!(blocks[0].content, "no issues");
        assert!(blocks[0].language.is_none());
    }

    #[test]
    fn rejects_missing_blocks_field() {
        let args = json!({});
        assert!(parse_answer_blocks(&args).is_err());
    }

    #[test]
    fn rejects_block_missing_content() {
        let args = json!({"blocks": [{"type": "markdown"}]});
        assert!(parse_answer_blocks(&args).is_err());
    }
}
