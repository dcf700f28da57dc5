//! VexaRoute - LLM query dispatch engine
//!
//! Classifies each user query by intent and length, selects an OpenAI or
//! Anthropic model with a fixed policy, dispatches with a single fallback,
//! and enforces per-user request windows and daily quotas.

pub mod accounts;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod limits;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod router;
pub mod service;
pub mod telemetry;
