//! Generative backends used to write exploit plans.

pub mod anthropic;
pub mod catalog;
mod http;
pub mod openai;
pub mod provider;
pub mod router;
pub mod types;

pub use provider::LLMProvider;
pub use router::create_provider;
pub use types::LLMResponse;
