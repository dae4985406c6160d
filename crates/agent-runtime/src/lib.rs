//! # agent-runtime
//!
//! Runtime providers for the factory operations agent.
//!
//! ## Providers
//!
//! - **OpenRouter** (default): any OpenAI-compatible chat completions
//!   endpoint with native tool calling (OpenRouter, OpenAI, vLLM, ...)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::openrouter::OpenRouterProvider;
//!
//! let provider = OpenRouterProvider::from_env()?;
//! let agent = AgentBuilder::new()
//!     .provider(Arc::new(provider))
//!     .build()?;
//! ```

pub mod openrouter;

pub use openrouter::{OpenRouterConfig, OpenRouterProvider};

// Re-export core types for convenience
pub use agent_core::{
    Agent, AgentError, ChatProvider, Conversation, Message, Result, Role, Session, Tool,
    ToolRegistry,
};
