//! Assistant runtime for Open Horizon.
//!
//! Three tools sit on top of an OpenAI-compatible completion endpoint:
//! - `brainstorm_project_ideas` turns an idea into scored project concepts
//! - `discover_erasmus_partners` ranks the partner catalog
//! - `generate_application_section` drafts and checks application text
//!
//! [`runtime::AgentRuntime`] wires them to one LLM client and one set of
//! repositories, and runs chat turns for the three assistants
//! (brainstorming, planning, application). In chat the model calls the
//! assistant's tools through OpenAI-style function calling.
//!
//! The model only writes prose and concepts. Partner ranking, word limits and
//! compliance checks are computed in `horizon-core`, never by the model.

pub mod agents;
pub mod llm;
pub mod prompts;
pub mod runtime;
pub mod tools;

pub use agents::AgentType;
pub use llm::{
    AssistantTurn, CompletionRequest, ConversationMessage, ConversationRequest, LlmClient,
    LlmError, OpenAiCompatibleClient, ScriptedLlmClient, ToolCall, ToolSpec,
};
pub use runtime::{AgentRuntime, ChatReply, RuntimeError};
pub use tools::{ToolContext, ToolRegistry};
