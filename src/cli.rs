//! Command-line interface for VexaRoute
//!
//! Provides argument parsing and subcommand handling for the VexaRoute binary.

use clap::{Parser, Subcommand};

/// LLM query dispatch server
#[derive(Parser)]
#[command(name = "vexaroute")]
#[command(version)]
#[command(about = "Classifies user queries and dispatches them to OpenAI or Anthropic models")]
#[command(
    long_about = "VexaRoute classifies each query by intent and length, picks a model with a \
    fixed selection policy, falls back to a cheap model when the primary provider fails, and \
    enforces per-user request windows and daily quotas."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# VexaRoute Configuration
# ========================

# ─────────────────────────────────────────────────────────────────────────────
# SERVER
# ─────────────────────────────────────────────────────────────────────────────

[server]
# IP address to bind to (0.0.0.0 for all interfaces, 127.0.0.1 for localhost only)
host = "0.0.0.0"

# Port to listen on
port = 3000

# Default provider call timeout in seconds (1-300)
request_timeout_seconds = 30

# ─────────────────────────────────────────────────────────────────────────────
# PROVIDERS
# ─────────────────────────────────────────────────────────────────────────────
#
# A provider without a section is not registered; queries routed to its models
# always take the fallback path. api_key may be omitted to read OPENAI_API_KEY /
# ANTHROPIC_API_KEY from the environment.

[providers.openai]
# api_key = "sk-..."
base_url = "https://api.openai.com/v1"
# organization = "org-..."
# timeout_seconds = 30

[providers.anthropic]
# api_key = "sk-ant-..."
base_url = "https://api.anthropic.com/v1"
# timeout_seconds = 60

# ─────────────────────────────────────────────────────────────────────────────
# ROUTING
# ─────────────────────────────────────────────────────────────────────────────

[routing]
# Category strategy:
#   - "llm": ask the classification model, fall back to keywords on failure
#   - "keyword": keyword matching only (no extra provider call)
classifier = "llm"

# Lightweight model used for classification:
#   "gpt-4o-mini" or "claude-3-haiku-20240307"
classification_model = "gpt-4o-mini"

# Lightweight model tried once when the selected model fails:
#   "gpt-4o-mini" or "claude-3-haiku-20240307"
fallback_model = "gpt-4o-mini"

# ─────────────────────────────────────────────────────────────────────────────
# LIMITS (free plan only; pro and expert are unlimited)
# ─────────────────────────────────────────────────────────────────────────────

[limits]
free_requests_per_window = 5
window_seconds = 60
free_daily_queries = 5

# ─────────────────────────────────────────────────────────────────────────────
# PRICING (USD per 1000 tokens)
# ─────────────────────────────────────────────────────────────────────────────

[pricing]
gpt_4o_mini = 0.00015
gpt_4o = 0.005
claude_sonnet = 0.003
claude_haiku = 0.00025

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error"
# RUST_LOG overrides this when set
log_level = "info"

# ─────────────────────────────────────────────────────────────────────────────
# ACCOUNTS
# ─────────────────────────────────────────────────────────────────────────────
#
# Seed users for the in-memory account store. plan: "free", "pro" or "expert"

[[accounts]]
user_id = 1
plan = "free"

[[accounts]]
user_id = 2
plan = "pro"
"#
}
