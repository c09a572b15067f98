//! The RLM loop itself (spec §4.4, C4): prompt assembly, one LLM call, one
//! sandbox execution, termination detection, repeated until the model calls
//! `answer(...)` or the iteration budget is exhausted.
//!
//! `NEW → RUNNING → {ANSWERING → DONE | TIMED_OUT → DONE | FAILED → DONE}`
//! is modeled as `SessionStatus` transitions applied once `run` returns,
//! rather than as an explicit state enum walked step by step — the
//! intermediate `RUNNING`/`ANSWERING` states are implicit in "still looping"
//! vs. "about to return".

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{info, warn};

use provider_gateway::Gateway;
use sandbox_executor::{AnswerBlockWire, SandboxExecutor};

use crate::capability_handler::SessionCapabilities;
use crate::errors::{ControllerError, ControllerResult};
use crate::llm_client::LlmClient;
use crate::prompt::{assemble_iteration_prompt, forced_synthesis_prompt, ConversationMessage};
use crate::types::{AnswerBlock, Event, Iteration, ReviewSession, Selection, SessionStatus};

/// Default per-session iteration budget (spec §4.4, `RLM_MAX_ITERATIONS`).
pub const DEFAULT_ITERATION_BUDGET: u32 = 10;
/// Hard cap no caller-supplied budget may exceed.
pub const HARD_ITERATION_CAP: u32 = 20;
/// Session-wide wall-clock deadline (`RLM_DEADLINE_SEC`).
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(600);

/// Rough chars-per-token ratio used to approximate the per-session LLM-token
/// ceiling (spec §4.4: "implementations should expose it as configuration
/// and document the default" — §9 Open Questions). The driver never reports
/// exact token counts, so usage is estimated from observed output length.
const CHARS_PER_TOKEN_ESTIMATE: u64 = 4;
const DEFAULT_TOKEN_CEILING: u64 = 200_000;

/// Cooperative cancellation flag checked at every suspension point (spec §5:
/// LLM request, sandbox execution boundary, provider HTTP request boundary).
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Controller {
    gateway: Arc<Gateway>,
    llm: Arc<LlmClient>,
    sandbox: Arc<SandboxExecutor>,
    token_ceiling: u64,
}

impl Controller {
    pub fn new(gateway: Arc<Gateway>, llm: Arc<LlmClient>, sandbox: Arc<SandboxExecutor>) -> Self {
        Self {
            gateway,
            llm,
            sandbox,
            token_ceiling: DEFAULT_TOKEN_CEILING,
        }
    }

    pub fn with_token_ceiling(mut self, ceiling: u64) -> Self {
        self.token_ceiling = ceiling;
        self
    }

    /// Streaming entry point (spec §4.4 `ask`). Runs the loop on a spawned
    /// task and hands back the receiving half of its event channel; the
    /// caller cancels by calling `cancel.cancel()` at any point (spec §5).
    pub fn ask(
        self: &Arc<Self>,
        mut session: ReviewSession,
        question: String,
        conversation: Vec<ConversationMessage>,
        selection: Option<Selection>,
        cancel: CancelToken,
        deadline: Duration,
    ) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            let _ = controller
                .run(
                    &mut session,
                    &question,
                    &conversation,
                    selection.as_ref(),
                    &cancel,
                    deadline,
                    Some(&tx),
                )
                .await;
        });
        rx
    }

    /// One-shot convenience used by `review-pipeline` (spec §4.4 `answer`):
    /// runs the loop to completion without streaming and returns both the
    /// finished session and the terminal answer blocks.
    pub async fn ask_to_completion(
        &self,
        mut session: ReviewSession,
        question: String,
        deadline: Duration,
    ) -> (ReviewSession, ControllerResult<Vec<AnswerBlock>>) {
        let cancel = CancelToken::new();
        let result = self
            .run(&mut session, &question, &[], None, &cancel, deadline, None)
            .await;
        (session, result)
    }

    async fn run(
        &self,
        session: &mut ReviewSession,
        question: &str,
        conversation: &[ConversationMessage],
        selection: Option<&Selection>,
        cancel: &CancelToken,
        deadline: Duration,
        events: Option<&mpsc::UnboundedSender<Event>>,
    ) -> ControllerResult<Vec<AnswerBlock>> {
        emit(events, Event::start());

        let deadline_at = Instant::now() + deadline;
        let result = self
            .run_iterations(session, question, conversation, selection, cancel, deadline_at, events)
            .await;

        session.status = match &result {
            Ok(_) => SessionStatus::Answered,
            Err(ControllerError::Cancelled) => SessionStatus::Aborted,
            Err(_) => SessionStatus::Failed,
        };

        if let Err(e) = &result {
            warn!(review_id = %session.review_id, error = %e, code = e.code(), "session ended with error");
            emit(events, Event::error(e.code(), &e.to_string()));
        }
        emit(events, Event::end());

        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_iterations(
        &self,
        session: &mut ReviewSession,
        question: &str,
        conversation: &[ConversationMessage],
        selection: Option<&Selection>,
        cancel: &CancelToken,
        deadline_at: Instant,
        events: Option<&mpsc::UnboundedSender<Event>>,
    ) -> ControllerResult<Vec<AnswerBlock>> {
        let capabilities = SessionCapabilities::new(
            Arc::clone(&self.gateway),
            Arc::clone(&self.llm),
            session.pr_info.clone(),
        );

        let budget = session.iteration_budget.min(HARD_ITERATION_CAP).max(1);
        let mut consecutive_parse_failures = 0u32;
        let mut estimated_tokens = 0u64;

        loop {
            if cancel.is_cancelled() {
                return Err(ControllerError::Cancelled);
            }
            if Instant::now() >= deadline_at {
                return Err(ControllerError::Deadline);
            }

            let index = session.transcript.len() as u32 + 1;
            let started = Instant::now();
            let prompt =
                assemble_iteration_prompt(&session.pr_info, conversation, &session.transcript, question, selection);

            let iteration_output = match self.llm.complete_iteration(&prompt).await {
                Ok(out) => {
                    consecutive_parse_failures = 0;
                    out
                }
                Err(ControllerError::Parse) => {
                    consecutive_parse_failures += 1;
                    let it = Iteration {
                        index,
                        max: budget,
                        reasoning: String::new(),
                        code: String::new(),
                        output: None,
                        error: Some("parse".to_string()),
                        duration_ms: started.elapsed().as_millis() as u64,
                    };
                    session.push_iteration(it.clone());
                    emit(events, Event::iteration(&it));
                    if consecutive_parse_failures >= 2 {
                        return Err(ControllerError::Parse);
                    }
                    continue;
                }
                Err(e) => return Err(e),
            };

            estimated_tokens += (iteration_output.reasoning.len() + iteration_output.code.len()) as u64
                / CHARS_PER_TOKEN_ESTIMATE;

            let observation = self.sandbox.execute(&iteration_output.code, &capabilities).await?;
            estimated_tokens += observation.stdout.len() as u64 / CHARS_PER_TOKEN_ESTIMATE;

            let it = Iteration {
                index,
                max: budget,
                reasoning: iteration_output.reasoning,
                code: iteration_output.code,
                output: (!observation.stdout.is_empty()).then(|| observation.stdout.clone()),
                error: observation.error.clone(),
                duration_ms: started.elapsed().as_millis() as u64,
            };
            session.push_iteration(it.clone());
            emit(events, Event::iteration(&it));

            if let Some(wire_blocks) = observation.answer_blocks {
                let blocks = to_answer_blocks(wire_blocks);
                for b in &blocks {
                    emit(events, Event::block(b));
                }
                return Ok(blocks);
            }

            let budget_hit = index >= budget;
            let token_ceiling_hit = estimated_tokens >= self.token_ceiling;

            if budget_hit || token_ceiling_hit {
                if token_ceiling_hit {
                    info!(review_id = %session.review_id, estimated_tokens, "token ceiling reached, forcing synthesis");
                }
                return self
                    .force_synthesis(session, question, conversation, &capabilities, budget, events)
                    .await;
            }
        }
    }

    /// Forced-synthesis step (spec §4.4 step 4b): one more LLM+sandbox round
    /// with a "must answer now" prompt. If the model still doesn't call
    /// `answer(...)`, a best-effort truncation block is synthesized locally
    /// so the session always terminates with *some* answer (spec §7
    /// `BudgetExceeded` policy: "graceful termination with a best-effort
    /// summary answer").
    async fn force_synthesis(
        &self,
        session: &mut ReviewSession,
        question: &str,
        conversation: &[ConversationMessage],
        capabilities: &SessionCapabilities,
        budget: u32,
        events: Option<&mpsc::UnboundedSender<Event>>,
    ) -> ControllerResult<Vec<AnswerBlock>> {
        let index = session.transcript.len() as u32 + 1;
        let started = Instant::now();
        let prompt = forced_synthesis_prompt(&session.pr_info, conversation, &session.transcript, question);
        let synthesis = self.llm.complete_iteration(&prompt).await?;
        let observation = self.sandbox.execute(&synthesis.code, capabilities).await?;

        let it = Iteration {
            index,
            max: budget,
            reasoning: synthesis.reasoning,
            code: synthesis.code,
            output: (!observation.stdout.is_empty()).then(|| observation.stdout.clone()),
            error: observation.error.clone(),
            duration_ms: started.elapsed().as_millis() as u64,
        };
        session.push_iteration(it.clone());
        emit(events, Event::iteration(&it));

        if let Some(wire_blocks) = observation.answer_blocks {
            let blocks = to_answer_blocks(wire_blocks);
            for b in &blocks {
                emit(events, Event::block(b));
            }
            return Ok(blocks);
        }

        let fallback = vec![AnswerBlock {
            block_type: "markdown".to_string(),
            content: format!(
                "Investigation truncated after {budget} iterations without a final answer from the model. \
                 Last observed output: {}",
                if observation.stdout.is_empty() {
                    "(none)".to_string()
                } else {
                    observation.stdout
                }
            ),
            language: None,
        }];
        for b in &fallback {
            emit(events, Event::block(b));
        }
        Ok(fallback)
    }
}

fn to_answer_blocks(wire: Vec<AnswerBlockWire>) -> Vec<AnswerBlock> {
    wire.into_iter()
        .map(|b| AnswerBlock {
            block_type: b.block_type,
            content: b.content,
            language: b.language,
        })
        .collect()
}

fn emit(events: Option<&mpsc::UnboundedSender<Event>>, event: Event) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_starts_uncancelled() {
        let c = CancelToken::new();
        assert!(!c.is_cancelled());
        c.cancel();
        assert!(c.is_cancelled());
    }
}
