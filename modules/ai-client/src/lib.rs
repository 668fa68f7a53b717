//! Claude agent client.
//!
//! Wraps the Anthropic Messages API with a small agent layer: client-side
//! tools executed in a multi-turn loop, schemars-derived structured output via
//! forced tool use, and token usage reported on every reply so callers can
//! account for spend per invocation.

pub mod claude;
pub mod schema;
pub mod tool;
pub mod util;

pub use claude::{Claude, ClaudePromptBuilder, Reply, TokenUsage};
pub use schema::StructuredOutput;
pub use tool::{DynTool, Tool, ToolDefinition, ToolWrapper};
