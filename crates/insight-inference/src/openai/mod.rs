//! OpenAI-compatible chat gateway.
//!
//! Works with any endpoint that implements `POST /chat/completions`
//! (OpenAI cloud, Azure OpenAI, vLLM, Ollama in compatibility mode).
//!
//! # Example
//!
//! ```rust,no_run
//! use insight_core::LlmGateway;
//! use insight_inference::openai::{OpenAIConfig, OpenAIGateway};
//!
//! #[tokio::main]
//! async fn main() {
//!     let gateway = OpenAIGateway::new(
//!         OpenAIConfig::default().with_base_url("http://localhost:11434/v1"),
//!     )
//!     .unwrap();
//!
//!     match gateway.chat(Some("sk-..."), "Summarize the sprint").await {
//!         Ok(text) => println!("{}", text),
//!         Err(e) => eprintln!("{}", e),
//!     }
//! }
//! ```

mod backend;
mod error;
mod types;

pub use backend::{OpenAIConfig, OpenAIGateway};
pub use error::OpenAIErrorCode;
pub use types::*;
