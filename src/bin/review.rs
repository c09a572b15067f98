//! `review` — thin CLI wrapper over the review engine (spec §6 CLI surface).
//!
//! Parses `--url`/`--question` plus output formatting flags, asks the RLM
//! controller the question directly (no HTTP hop), and renders the terminal
//! answer blocks. Exit codes follow spec.md exactly: `0` success, `2`
//! `UrlInvalid`, `3` auth failure, `4` rate-limited, `1` anything else.

use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use provider_gateway::GatewayError;
use review_api::core::app_state::{AppConfig, AppState};
use rlm_controller::{AnswerBlock, ControllerError, ReviewSession};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Markdown,
    Json,
}

/// Ask a natural-language question about a pull/merge request.
#[derive(Parser)]
#[command(name = "review")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Pull/merge request URL (GitHub, GitHub Enterprise, or GitLab).
    #[arg(long)]
    url: String,

    /// Question to ask about the change.
    #[arg(long)]
    question: String,

    /// Output rendering.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Override the model used for the `slow`/`fast` Gemini profiles.
    #[arg(long)]
    model: Option<String>,

    /// Suppress progress output on stderr.
    #[arg(long)]
    quiet: bool,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Some(model) = &cli.model {
        if std::env::var("GEMINI_MODEL").is_err() {
            // SAFETY: single-threaded at this point, before any runtime starts.
            unsafe { std::env::set_var("GEMINI_MODEL", model) };
        }
        if std::env::var("GEMINI_MODEL_FAST").is_err() {
            unsafe { std::env::set_var("GEMINI_MODEL_FAST", model) };
        }
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to start async runtime: {e}");
            return ExitCode::from(1);
        }
    };
    rt.block_on(run(cli))
}

async fn run(cli: Cli) -> ExitCode {
    let config = AppConfig::from_env();
    let state = match AppState::build(config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(1);
        }
    };

    if !cli.quiet {
        eprintln!("Resolving {}...", cli.url);
    }

    let parsed = match state.gateway.parse_url(&cli.url) {
        Ok(p) => p,
        Err(e) => return report_gateway_error(&e),
    };

    let review_id = "review-cli".to_string();
    let pr_info = match state.gateway.load_pr(review_id.clone(), &parsed).await {
        Ok(p) => p,
        Err(e) => return report_gateway_error(&e),
    };

    if !cli.quiet {
        eprintln!("Asking: {}", cli.question);
    }

    let session = ReviewSession::new(review_id, pr_info, state.config.rlm_max_iterations);
    let (_, result) = state
        .controller
        .ask_to_completion(session, cli.question, state.config.rlm_deadline)
        .await;

    match result {
        Ok(blocks) => {
            render(&blocks, cli.output);
            ExitCode::SUCCESS
        }
        Err(e) => report_controller_error(&e),
    }
}

fn render(blocks: &[AnswerBlock], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let payload: Vec<_> = blocks
                .iter()
                .map(|b| {
                    serde_json::json!({
                        "type": b.block_type,
                        "content": b.content,
                        "language": b.language,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&payload).unwrap_or_default());
        }
        OutputFormat::Markdown | OutputFormat::Text => {
            for block in blocks {
                match block.block_type.as_str() {
                    "code" => {
                        let lang = block.language.as_deref().unwrap_or("");
                        println!("```{lang}\n{}\n```", block.content);
                    }
                    _ => println!("{}", block.content),
                }
            }
        }
    }
}

fn report_gateway_error(e: &GatewayError) -> ExitCode {
    eprintln!("error: {e}");
    ExitCode::from(match e {
        GatewayError::UrlInvalid(_) => 2,
        GatewayError::Unauthorized => 3,
        GatewayError::RateLimited { .. } => 4,
        _ => 1,
    })
}

fn report_controller_error(e: &ControllerError) -> ExitCode {
    eprintln!("error: {e}");
    ExitCode::from(match e {
        ControllerError::Gateway(inner) => match inner {
            GatewayError::UrlInvalid(_) => 2,
            GatewayError::Unauthorized => 3,
            GatewayError::RateLimited { .. } => 4,
            _ => 1,
        },
        _ => 1,
    })
}
