//! LLM-backed column generation service: one derived string per table row.

pub mod cli;
pub mod config;
pub mod llm;
pub mod processor;
pub mod server;
