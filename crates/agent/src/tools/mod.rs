//! The three assistant tools and the registry that dispatches to them by name.
//!
//! Every tool hands back a [`ToolOutcome`]. Validation, LLM and lookup
//! failures become `success = false` outcomes; persistence failures after a
//! successful generation are logged and the generated data is returned anyway.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use horizon_core::domain::project::{Project, ProjectId};
use horizon_core::errors::{ApplicationError, ErrorCode, FieldError};
use horizon_core::outcome::ToolOutcome;
use horizon_db::Repositories;

use crate::llm::{LlmClient, ToolSpec};
use crate::prompts::PromptLibrary;

pub mod application;
pub mod brainstorm;
pub mod partners;

pub use application::{ApplicationContentResult, ApplicationContentTool, MAX_ALTERNATIVES};
pub use brainstorm::{BrainstormResult, BrainstormTool, NEXT_STEPS};
pub use partners::PartnerSearchTool;

pub const BRAINSTORM_TOOL: &str = "brainstorm_project_ideas";
pub const PARTNER_TOOL: &str = "discover_erasmus_partners";
pub const APPLICATION_TOOL: &str = "generate_application_section";

/// Who is calling. Every project lookup and write is scoped to `user_id`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolContext {
    pub user_id: String,
    pub session_id: Option<String>,
}

impl ToolContext {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), session_id: None }
    }
}

/// Shared handles the tools need. Cheap to clone.
#[derive(Clone)]
pub struct AgentDeps {
    pub llm: Arc<dyn LlmClient>,
    pub repositories: Repositories,
    pub prompts: Arc<PromptLibrary>,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON schema of the arguments `execute` accepts.
    fn parameters(&self) -> Value;
    /// Decodes `input`, runs the tool and returns the serialized outcome.
    async fn execute(&self, context: &ToolContext, input: Value) -> Value;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn with_standard_tools(deps: &AgentDeps) -> Self {
        let mut registry = Self::default();
        registry.register(BrainstormTool::new(deps.clone()));
        registry.register(PartnerSearchTool::new(deps.clone()));
        registry.register(ApplicationContentTool::new(deps.clone()));
        registry
    }

    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|tool| tool.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// One `- name: description` line per registered tool in `names`.
    pub fn describe(&self, names: &[&str]) -> String {
        names
            .iter()
            .filter_map(|name| self.get(name))
            .map(|tool| format!("- {}: {}", tool.name(), tool.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Function definitions offered to the model, in `names` order.
    pub fn specs(&self, names: &[&str]) -> Vec<ToolSpec> {
        names
            .iter()
            .filter_map(|name| self.get(name))
            .map(|tool| ToolSpec {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect()
    }

    pub async fn execute(&self, name: &str, context: &ToolContext, input: Value) -> Value {
        match self.get(name) {
            Some(tool) => tool.execute(context, input).await,
            None => encode_outcome(&ToolOutcome::<Value>::failure(
                ErrorCode::NotFound,
                format!("unknown tool `{name}`"),
            )),
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

pub(crate) fn decode_input<T: DeserializeOwned>(input: Value) -> Result<T, ApplicationError> {
    serde_json::from_value(input)
        .map_err(|error| ApplicationError::Validation(vec![FieldError::new("input", error.to_string())]))
}

pub(crate) fn check_request(errors: Vec<FieldError>) -> Result<(), ApplicationError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApplicationError::Validation(errors))
    }
}

/// Outcome for a failed run. Validation failures name every offending field.
pub(crate) fn failed<T>(error: &ApplicationError) -> ToolOutcome<T> {
    match error {
        ApplicationError::Validation(fields) => {
            let detail = fields
                .iter()
                .map(|field| format!("{} {}", field.field, field.message))
                .collect::<Vec<_>>()
                .join("; ");
            ToolOutcome::failure(ErrorCode::ValidationError, format!("invalid input: {detail}"))
        }
        other => ToolOutcome::from_error(other),
    }
}

pub(crate) fn encode_outcome<T: Serialize>(outcome: &ToolOutcome<T>) -> Value {
    serde_json::to_value(outcome).unwrap_or_else(|error| {
        json!({
            "success": false,
            "data": null,
            "error": format!("could not encode tool result: {error}"),
            "error_code": ErrorCode::InternalError,
        })
    })
}

pub(crate) fn log_outcome<T>(tool: &'static str, started: Instant, outcome: &ToolOutcome<T>) {
    let duration_ms = started.elapsed().as_millis() as u64;
    if outcome.success {
        tracing::info!(event_name = "agent.tool.completed", tool, duration_ms, "tool succeeded");
    } else {
        tracing::warn!(
            event_name = "agent.tool.failed",
            tool,
            duration_ms,
            error_code = outcome.error_code.map(|code| code.as_str()).unwrap_or("UNKNOWN"),
            error = outcome.error.as_deref().unwrap_or_default(),
            "tool failed"
        );
    }
}

/// Loads the caller's project when an id was given. An id that does not
/// belong to the caller is reported as not found.
pub(crate) async fn owned_project(
    deps: &AgentDeps,
    context: &ToolContext,
    project_id: Option<&ProjectId>,
) -> Result<Option<Project>, ApplicationError> {
    let Some(project_id) = project_id else {
        return Ok(None);
    };
    deps.repositories
        .projects
        .find_for_user(project_id, &context.user_id)
        .await?
        .map(Some)
        .ok_or_else(|| ApplicationError::NotFound { entity: "project", id: project_id.0.clone() })
}

/// Pulls a JSON document out of a model reply. Accepts bare JSON, JSON inside
/// a fenced code block, or JSON surrounded by prose.
pub(crate) fn extract_json(raw: &str) -> Option<Value> {
    parse_whole_reply(raw).or_else(|| embedded_json(strip_code_fence(raw)))
}

/// The reply parsed as a single JSON document, optionally fenced. Prose with
/// JSON somewhere inside it is not accepted here.
pub(crate) fn parse_whole_reply(raw: &str) -> Option<Value> {
    serde_json::from_str(strip_code_fence(raw)).ok()
}

/// Widest `{..}` or `[..]` span inside surrounding prose.
pub(crate) fn embedded_json(unfenced: &str) -> Option<Value> {
    let start = unfenced.find(['{', '['])?;
    let end = unfenced.rfind(['}', ']'])?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&unfenced[start..=end]).ok()
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match body.find('\n') {
        Some(newline) => &body[newline + 1..],
        None => body,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
