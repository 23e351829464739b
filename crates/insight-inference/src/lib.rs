//! # insight-inference
//!
//! Prompt construction and the LLM gateway for the sprint insight pipeline.
//!
//! This crate provides:
//! - Deterministic prompt templates for every insight type and ad-hoc questions
//! - An OpenAI-compatible [`LlmGateway`](insight_core::LlmGateway) implementation
//! - A scripted mock gateway (feature `mock`)

pub mod openai;
pub mod prompts;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use openai::{OpenAIConfig, OpenAIGateway};
pub use prompts::{build_ask_prompt, build_prompt};
