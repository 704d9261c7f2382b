use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use horizon_core::config::LlmConfig;
use horizon_core::domain::activity::UserSession;
use horizon_core::domain::project::Project;
use horizon_core::errors::{ApplicationError, ErrorCode};
use horizon_core::matching::PartnerMatches;
use horizon_core::outcome::ToolOutcome;
use horizon_core::requests::{
    ApplicationContentRequest, BrainstormRequest, ChatRequest, PartnerSearchRequest,
};
use horizon_db::Repositories;

use crate::agents::AgentType;
use crate::llm::{
    ConversationMessage, ConversationRequest, LlmClient, LlmError, OpenAiCompatibleClient, ToolCall,
};
use crate::prompts::{session_context, system_prompt, PromptError, PromptLibrary};
use crate::tools::{
    check_request, failed, log_outcome, AgentDeps, ApplicationContentResult,
    ApplicationContentTool, BrainstormResult, BrainstormTool, PartnerSearchTool, ToolContext,
    ToolRegistry,
};

/// Model turns allowed to end in tool calls before a chat turn is abandoned.
pub const MAX_TOOL_ROUNDS: usize = 4;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub agent_type: AgentType,
    pub response: String,
    pub session_id: String,
    /// Tools the model called while answering, in call order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools_used: Vec<String>,
}

/// Entry point shared by the HTTP server and the CLI. Owns one LLM client and
/// one set of repositories for the life of the process.
pub struct AgentRuntime {
    deps: AgentDeps,
    registry: ToolRegistry,
    brainstorm: BrainstormTool,
    partners: PartnerSearchTool,
    application: ApplicationContentTool,
}

impl AgentRuntime {
    pub fn new(llm: Arc<dyn LlmClient>, repositories: Repositories) -> Result<Self, RuntimeError> {
        let deps = AgentDeps { llm, repositories, prompts: Arc::new(PromptLibrary::embedded()?) };
        Ok(Self {
            registry: ToolRegistry::with_standard_tools(&deps),
            brainstorm: BrainstormTool::new(deps.clone()),
            partners: PartnerSearchTool::new(deps.clone()),
            application: ApplicationContentTool::new(deps.clone()),
            deps,
        })
    }

    pub fn from_config(config: &LlmConfig, repositories: Repositories) -> Result<Self, RuntimeError> {
        let client = OpenAiCompatibleClient::from_config(config)?;
        tracing::info!(
            event_name = "agent.runtime.ready",
            provider = ?config.provider,
            model = %config.model,
            "agent runtime initialised"
        );
        Self::new(Arc::new(client), repositories)
    }

    pub fn repositories(&self) -> &Repositories {
        &self.deps.repositories
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn model(&self) -> &str {
        self.deps.llm.model()
    }

    pub async fn brainstorm(
        &self,
        context: &ToolContext,
        request: BrainstormRequest,
    ) -> ToolOutcome<BrainstormResult> {
        self.brainstorm.run(context, request).await
    }

    pub async fn discover_partners(
        &self,
        context: &ToolContext,
        request: PartnerSearchRequest,
    ) -> ToolOutcome<PartnerMatches> {
        self.partners.run(context, request).await
    }

    pub async fn generate_application_content(
        &self,
        context: &ToolContext,
        request: ApplicationContentRequest,
    ) -> ToolOutcome<ApplicationContentResult> {
        self.application.run(context, request).await
    }

    /// One chat turn with the requested assistant. The session is recorded
    /// before the model is asked, so activity is tracked even when the model
    /// call fails. The model may call the assistant's tools; their results are
    /// fed back until it answers in text.
    pub async fn chat(&self, context: &ToolContext, request: ChatRequest) -> ToolOutcome<ChatReply> {
        let started = Instant::now();
        let outcome = match self.converse(context, &request).await {
            Ok(reply) => ToolOutcome::ok(reply),
            Err(error) => failed(&error),
        };
        log_outcome("chat", started, &outcome);
        outcome
    }

    async fn converse(
        &self,
        context: &ToolContext,
        request: &ChatRequest,
    ) -> Result<ChatReply, ApplicationError> {
        check_request(request.validate())?;
        let agent = AgentType::parse_lenient(&request.agent_type);
        let session_id = request
            .session_id
            .clone()
            .or_else(|| context.session_id.clone())
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let project = self.chat_project(context, request).await;
        self.touch_session(context, &session_id, agent, project.as_ref()).await;

        let system = format!(
            "{}\n\nAvailable tools:\n{}\n\nSession context: {}",
            system_prompt(agent, request.mode),
            self.registry.describe(agent.tool_names()),
            session_context(
                Some(&context.user_id),
                request.project_id.as_ref().map(|id| id.0.as_str()),
                project.as_ref(),
                Some(&session_id),
            )
        );
        let mut conversation = ConversationRequest {
            messages: vec![
                ConversationMessage::System(system),
                ConversationMessage::User(request.message.trim().to_string()),
            ],
            tools: self.registry.specs(agent.tool_names()),
        };
        let tool_context =
            ToolContext { user_id: context.user_id.clone(), session_id: Some(session_id.clone()) };
        let mut tools_used = Vec::new();

        for _ in 0..MAX_TOOL_ROUNDS {
            let turn = self.deps.llm.converse(&conversation).await?;
            if turn.tool_calls.is_empty() {
                let response = turn
                    .content
                    .map(|content| content.trim().to_string())
                    .filter(|content| !content.is_empty())
                    .ok_or_else(|| LlmError::Decode("assistant reply was empty".to_string()))?;
                return Ok(ChatReply { agent_type: agent, response, session_id, tools_used });
            }

            let calls = turn.tool_calls.clone();
            conversation.messages.push(ConversationMessage::Assistant {
                content: turn.content,
                tool_calls: turn.tool_calls,
            });
            for call in calls {
                let result = self.call_tool(agent, &tool_context, project.as_ref(), &call).await;
                tools_used.push(call.name);
                conversation
                    .messages
                    .push(ConversationMessage::Tool { call_id: call.id, content: result.to_string() });
            }
        }

        Err(LlmError::Decode(format!(
            "assistant was still calling tools after {MAX_TOOL_ROUNDS} rounds"
        ))
        .into())
    }

    /// Runs one tool call from the model. Tools outside the assistant's set
    /// and unparseable arguments come back to the model as failed outcomes.
    /// The chat's project is passed along when the model did not name one.
    async fn call_tool(
        &self,
        agent: AgentType,
        context: &ToolContext,
        project: Option<&Project>,
        call: &ToolCall,
    ) -> Value {
        if !agent.tool_names().contains(&call.name.as_str()) {
            return refused(format!("tool `{}` is not available to the {agent} assistant", call.name));
        }
        let mut arguments = match serde_json::from_str::<Value>(&call.arguments) {
            Ok(Value::Object(arguments)) => arguments,
            _ => {
                return refused(format!("arguments for `{}` must be a JSON object", call.name));
            }
        };
        if let Some(project) = project {
            arguments.entry("project_id").or_insert_with(|| json!(project.id));
        }

        tracing::info!(
            event_name = "agent.chat.tool_call",
            tool = %call.name,
            agent_type = %agent,
            "assistant called a tool"
        );
        self.registry.execute(&call.name, context, Value::Object(arguments)).await
    }
    async fn chat_project(&self, context: &ToolContext, request: &ChatRequest) -> Option<Project> {
        let project_id = request.project_id.as_ref()?;
        match self.deps.repositories.projects.find_for_user(project_id, &context.user_id).await {
            Ok(project) => project,
            Err(error) => {
                tracing::warn!(
                    event_name = "agent.chat.project_unavailable",
                    project_id = %project_id,
                    error = %error,
                    "continuing chat without project details"
                );
                None
            }
        }
    }

    async fn touch_session(
        &self,
        context: &ToolContext,
        session_id: &str,
        agent: AgentType,
        project: Option<&Project>,
    ) {
        let session = UserSession {
            id: session_id.to_string(),
            user_id: context.user_id.clone(),
            project_id: project.map(|project| project.id.clone()),
            agent_type: agent.as_str().to_string(),
            last_active_at: Utc::now(),
        };
        if let Err(error) = self.deps.repositories.sessions.touch(session).await {
            tracing::warn!(
                event_name = "agent.chat.session_failed",
                session_id,
                error = %error,
                "session activity not recorded"
            );
        }
    }
}

fn refused(message: String) -> Value {
    json!({
        "success": false,
        "data": null,
        "error": message,
        "error_code": ErrorCode::ValidationError,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{json, Value};

    use horizon_core::domain::project::{FocusArea, Project};
    use horizon_core::errors::ErrorCode;
    use horizon_core::requests::{ChatRequest, PromptMode};
    use horizon_db::{Repositories, SeedDataset};

    use super::{AgentRuntime, MAX_TOOL_ROUNDS};
    use crate::agents::AgentType;
    use crate::llm::{ConversationMessage, LlmError, ScriptedLlmClient};
    use crate::prompts::system_prompt;
    use crate::tools::{ToolContext, BRAINSTORM_TOOL, PARTNER_TOOL};

    fn tool_result(message: &ConversationMessage) -> Value {
        match message {
            ConversationMessage::Tool { content, .. } => {
                serde_json::from_str(content).expect("tool result is JSON")
            }
            other => panic!("expected a tool message, got {other:?}"),
        }
    }

    fn chat(message: &str, agent_type: &str) -> ChatRequest {
        ChatRequest {
            message: message.to_string(),
            agent_type: agent_type.to_string(),
            mode: PromptMode::Standard,
            project_id: None,
            session_id: None,
        }
    }

    #[tokio::test]
    async fn chat_uses_the_requested_assistant_and_records_the_session() {
        let llm = Arc::new(ScriptedLlmClient::with_reply("Let's look at partners in Finland."));
        let repositories = Repositories::in_memory();
        let runtime = AgentRuntime::new(llm.clone(), repositories.clone()).expect("runtime");

        let mut project = Project::new("user-1", "Green Futures");
        project.focus_area = Some(FocusArea::GreenTransition);
        repositories.projects.save(project.clone()).await.expect("save project");

        let mut request = chat("Who should we partner with?", "planning");
        request.project_id = Some(project.id.clone());
        request.session_id = Some("session-42".to_string());
        request.mode = PromptMode::Quick;

        let reply = runtime
            .chat(&ToolContext::for_user("user-1"), request)
            .await
            .data
            .expect("reply");
        assert_eq!(reply.agent_type, AgentType::Planning);
        assert_eq!(reply.session_id, "session-42");
        assert_eq!(reply.response, "Let's look at partners in Finland.");

        let sent = llm.requests().await;
        assert!(sent[0].system.starts_with(system_prompt(AgentType::Planning, PromptMode::Quick)));
        assert!(sent[0].system.contains("- discover_erasmus_partners"));
        assert!(!sent[0].system.contains("- brainstorm_project_ideas"));
        assert!(sent[0].system.contains("Project title: Green Futures"));
        assert!(sent[0].system.contains("Session ID: session-42"));
        assert!(!sent[0].json_mode);

        let session = repositories
            .sessions
            .find_by_id("session-42")
            .await
            .expect("lookup")
            .expect("session recorded");
        assert_eq!(session.agent_type, "planning");
        assert_eq!(session.project_id, Some(project.id));
    }

    #[tokio::test]
    async fn unknown_agent_type_falls_back_to_brainstorming() {
        let llm = Arc::new(ScriptedLlmClient::with_reply("Tell me about your idea."));
        let runtime = AgentRuntime::new(llm, Repositories::in_memory()).expect("runtime");

        let reply = runtime
            .chat(&ToolContext::for_user("user-1"), chat("Hello", "fundraising"))
            .await
            .data
            .expect("reply");
        assert_eq!(reply.agent_type, AgentType::Brainstorming);
        assert!(!reply.session_id.is_empty());
    }

    #[tokio::test]
    async fn chat_failures_keep_the_session_and_report_network_errors() {
        let llm = Arc::new(ScriptedLlmClient::new());
        llm.push_error(LlmError::Network("connection refused".to_string())).await;
        let repositories = Repositories::in_memory();
        let runtime = AgentRuntime::new(llm, repositories.clone()).expect("runtime");

        let mut request = chat("Hello", "application");
        request.session_id = Some("s-1".to_string());
        let outcome = runtime.chat(&ToolContext::for_user("user-1"), request).await;

        assert!(!outcome.success);
        assert_eq!(outcome.error_code, Some(ErrorCode::NetworkError));
        assert!(repositories.sessions.find_by_id("s-1").await.expect("lookup").is_some());
    }

    #[tokio::test]
    async fn blank_messages_are_rejected() {
        let llm = Arc::new(ScriptedLlmClient::new());
        let runtime = AgentRuntime::new(llm.clone(), Repositories::in_memory()).expect("runtime");

        let outcome = runtime.chat(&ToolContext::for_user("user-1"), chat("   ", "planning")).await;
        assert_eq!(outcome.error_code, Some(ErrorCode::ValidationError));
        assert!(llm.requests().await.is_empty());
    }

    #[tokio::test]
    async fn planning_chat_runs_partner_search_through_a_tool_call() {
        let llm = Arc::new(ScriptedLlmClient::new());
        llm.push_tool_call(
            PARTNER_TOOL,
            json!({
                "project_focus": "Youth Work",
                "required_countries": ["Germany", "Spain"],
                "expertise_areas": ["Youth Work"]
            }),
        )
        .await;
        llm.push_reply("Digital Youth Foundation in Germany is the strongest fit.").await;

        let repositories = Repositories::in_memory();
        SeedDataset::load(&repositories).await.expect("seed");
        let project = Project::new("user-1", "Youth voices");
        repositories.projects.save(project.clone()).await.expect("save project");
        let runtime = AgentRuntime::new(llm.clone(), repositories.clone()).expect("runtime");

        let mut request = chat("Which partners should we invite?", "planning");
        request.project_id = Some(project.id.clone());
        let reply =
            runtime.chat(&ToolContext::for_user("user-1"), request).await.data.expect("reply");

        assert_eq!(reply.response, "Digital Youth Foundation in Germany is the strongest fit.");
        assert_eq!(reply.tools_used, vec![PARTNER_TOOL.to_string()]);

        let conversations = llm.conversations().await;
        assert_eq!(conversations.len(), 2);
        let offered: Vec<&str> =
            conversations[0].tools.iter().map(|spec| spec.name.as_str()).collect();
        assert_eq!(offered, AgentType::Planning.tool_names());

        let follow_up = &conversations[1].messages;
        assert_eq!(follow_up.len(), 4);
        assert!(matches!(&follow_up[2], ConversationMessage::Assistant { tool_calls, .. }
            if tool_calls[0].name == PARTNER_TOOL));
        let result = tool_result(&follow_up[3]);
        assert_eq!(result["success"], json!(true));
        for partner in result["data"]["potential_partners"].as_array().expect("partners") {
            let country = partner["country"].as_str().expect("country");
            assert!(country == "Germany" || country == "Spain");
        }

        let logged = repositories.partner_searches.list_for_project(&project.id).await.expect("list");
        assert_eq!(logged.len(), 1);
    }

    #[tokio::test]
    async fn tools_outside_the_assistant_set_are_refused() {
        let llm = Arc::new(ScriptedLlmClient::new());
        llm.push_tool_call(BRAINSTORM_TOOL, json!({ "initial_concept": "Robots" })).await;
        llm.push_reply("I can only help with the application text.").await;
        let runtime = AgentRuntime::new(llm.clone(), Repositories::in_memory()).expect("runtime");

        let reply = runtime
            .chat(&ToolContext::for_user("user-1"), chat("Brainstorm for me", "application"))
            .await
            .data
            .expect("reply");
        assert_eq!(reply.tools_used, vec![BRAINSTORM_TOOL.to_string()]);

        let conversations = llm.conversations().await;
        let result = tool_result(&conversations[1].messages[3]);
        assert_eq!(result["success"], json!(false));
        assert_eq!(result["error_code"], json!("VALIDATION_ERROR"));
        assert_eq!(llm.requests().await.len(), 2);
    }

    #[tokio::test]
    async fn endless_tool_calls_end_the_turn_with_an_error() {
        let llm = Arc::new(ScriptedLlmClient::new());
        for _ in 0..MAX_TOOL_ROUNDS {
            llm.push_tool_call(PARTNER_TOOL, json!({ "project_focus": "Art", "expertise_areas": [] }))
                .await;
        }
        let runtime = AgentRuntime::new(llm.clone(), Repositories::in_memory()).expect("runtime");

        let outcome = runtime.chat(&ToolContext::for_user("user-1"), chat("Hi", "planning")).await;
        assert!(!outcome.success);
        assert_eq!(outcome.error_code, Some(ErrorCode::ApiFailure));
        assert_eq!(llm.conversations().await.len(), MAX_TOOL_ROUNDS);
    }
}
