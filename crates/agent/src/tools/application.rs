use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use horizon_core::compliance::{self, truncate_to_words, word_count, ComplianceReport};
use horizon_core::domain::application::{
    AlternativeVersion, ApplicationSection, GeneratedContent, SectionId,
};
use horizon_core::domain::project::Project;
use horizon_core::errors::ApplicationError;
use horizon_core::outcome::ToolOutcome;
use horizon_core::requests::{ApplicationContentRequest, PromptMode};

use super::{
    check_request, decode_input, embedded_json, encode_outcome, failed, log_outcome,
    owned_project, parse_whole_reply, AgentDeps, Tool, ToolContext, APPLICATION_TOOL,
};
use crate::agents::AgentType;
use crate::llm::{CompletionRequest, LlmError};
use crate::prompts::system_prompt;

pub const MAX_ALTERNATIVES: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationContentResult {
    pub generated_content: GeneratedContent,
    pub alternative_versions: Vec<AlternativeVersion>,
    /// Set when the draft was stored against a project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<SectionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

#[derive(Debug, PartialEq, Eq)]
struct Draft {
    content: String,
    alternatives: Vec<(String, String)>,
}

pub struct ApplicationContentTool {
    deps: AgentDeps,
}

impl ApplicationContentTool {
    pub fn new(deps: AgentDeps) -> Self {
        Self { deps }
    }

    pub async fn run(
        &self,
        context: &ToolContext,
        request: ApplicationContentRequest,
    ) -> ToolOutcome<ApplicationContentResult> {
        let started = Instant::now();
        let outcome = match self.generate(context, &request).await {
            Ok(result) => ToolOutcome::ok(result),
            Err(error) => failed(&error),
        };
        log_outcome(APPLICATION_TOOL, started, &outcome);
        outcome
    }

    async fn generate(
        &self,
        context: &ToolContext,
        request: &ApplicationContentRequest,
    ) -> Result<ApplicationContentResult, ApplicationError> {
        check_request(request.validate())?;
        let project = owned_project(&self.deps, context, request.project_id.as_ref()).await?;
        let project_context = merged_context(&request.project_context, project.as_ref());

        let prompt = self
            .deps
            .prompts
            .application_section(request, &project_context)
            .map_err(|error| ApplicationError::Configuration(error.to_string()))?;
        let reply = self
            .deps
            .llm
            .complete(&CompletionRequest::json(
                system_prompt(AgentType::Application, PromptMode::Standard),
                prompt,
            ))
            .await?;
        let draft = parse_draft(&reply)?;

        let limit = |text: String| match request.word_limit {
            Some(limit) => truncate_to_words(&text, limit),
            None => text.trim().to_string(),
        };

        let content = limit(draft.content);
        let report = compliance::check(&content);
        let generated_content = GeneratedContent {
            section_name: request.section_type.trim().to_string(),
            word_count: word_count(&content),
            content,
            compliance_status: report.compliant,
            compliance_details: report.details.clone(),
        };
        let alternative_versions = draft
            .alternatives
            .into_iter()
            .take(MAX_ALTERNATIVES)
            .map(|(focus, text)| {
                let content = limit(text);
                AlternativeVersion { focus, word_count: word_count(&content), content }
            })
            .collect();

        let stored = match project {
            Some(project) => self.store_section(&project, &generated_content, &report).await,
            None => None,
        };

        Ok(ApplicationContentResult {
            generated_content,
            alternative_versions,
            section_id: stored.as_ref().map(|section| section.id.clone()),
            version: stored.map(|section| section.version),
        })
    }

    async fn store_section(
        &self,
        project: &Project,
        generated: &GeneratedContent,
        report: &ComplianceReport,
    ) -> Option<ApplicationSection> {
        let section = ApplicationSection {
            id: SectionId::generate(),
            project_id: project.id.clone(),
            section_name: generated.section_name.clone(),
            content: generated.content.clone(),
            word_count: generated.word_count,
            compliance_status: generated.compliance_status,
            suggestions: report.suggestions(),
            version: 0,
            created_at: Utc::now(),
        };

        match self.deps.repositories.sections.append_version(section).await {
            Ok(stored) => {
                tracing::info!(
                    event_name = "agent.application.section_saved",
                    project_id = %project.id,
                    section = %stored.section_name,
                    version = stored.version,
                    "application section saved"
                );
                Some(stored)
            }
            Err(error) => {
                tracing::warn!(
                    event_name = "agent.application.save_failed",
                    project_id = %project.id,
                    error = %error,
                    "returning generated section without saving it"
                );
                None
            }
        }
    }
}

/// Caller-supplied context wins; gaps are filled from the stored project.
fn merged_context(supplied: &Map<String, Value>, project: Option<&Project>) -> Map<String, Value> {
    let mut merged = supplied.clone();
    let Some(project) = project else {
        return merged;
    };

    let mut fill = |key: &str, value: Option<Value>| {
        if let Some(value) = value {
            merged.entry(key.to_string()).or_insert(value);
        }
    };
    fill("title", Some(Value::String(project.title.clone())));
    fill("focus_area", project.focus_area.map(|area| Value::String(area.label().to_string())));
    fill("target_audience", project.target_audience.clone().map(Value::String));
    fill("innovation_angle", project.innovation_angle.clone().map(Value::String));
    fill("duration_months", project.duration_months.map(Value::from));
    if !project.countries_involved.is_empty() {
        fill(
            "countries_involved",
            Some(Value::from(project.countries_involved.iter().cloned().collect::<Vec<_>>())),
        );
    }
    merged
}

/// Reads `{content, alternatives}` out of a model reply. A reply that is JSON
/// by itself must be an object with content. Inside prose only an embedded
/// object carrying `content` counts; otherwise the whole reply is the content,
/// so citations like "[1]" stay part of the text.
fn parse_draft(reply: &str) -> Result<Draft, LlmError> {
    let document = match parse_whole_reply(reply) {
        Some(document) => document,
        None => match embedded_json(reply.trim()).filter(|value| value.get("content").is_some()) {
            Some(document) => document,
            None => return plain_draft(reply),
        },
    };

    let Value::Object(object) = document else {
        return Err(LlmError::Decode("application reply was not an object".to_string()));
    };
    let content = object
        .get("content")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .ok_or_else(|| LlmError::Decode("application reply had no content".to_string()))?;

    let alternatives = object
        .get("alternatives")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .enumerate()
                .filter_map(|(index, item)| alternative_of(index, item))
                .collect()
        })
        .unwrap_or_default();

    Ok(Draft { content: content.to_string(), alternatives })
}

fn plain_draft(reply: &str) -> Result<Draft, LlmError> {
    let content = reply.trim();
    if content.is_empty() {
        return Err(LlmError::Decode("application reply was empty".to_string()));
    }
    Ok(Draft { content: content.to_string(), alternatives: Vec::new() })
}

fn alternative_of(index: usize, item: &Value) -> Option<(String, String)> {
    let fallback_focus = || format!("alternative {}", index + 1);
    let (focus, content) = match item {
        Value::String(content) => (fallback_focus(), content.as_str()),
        Value::Object(object) => (
            object
                .get("focus")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|focus| !focus.is_empty())
                .map(ToString::to_string)
                .unwrap_or_else(fallback_focus),
            object.get("content").and_then(Value::as_str)?,
        ),
        _ => return None,
    };
    let content = content.trim();
    (!content.is_empty()).then(|| (focus, content.to_string()))
}

#[async_trait]
impl Tool for ApplicationContentTool {
    fn name(&self) -> &'static str {
        APPLICATION_TOOL
    }

    fn description(&self) -> &'static str {
        "Draft an Erasmus+ application section with a compliance check"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "section_type": {
                    "type": "string",
                    "description": "Section to write, e.g. project_description or impact"
                },
                "project_context": { "type": "object", "description": "Known project facts" },
                "word_limit": { "type": "integer", "minimum": 1, "maximum": 5000 }
            },
            "required": ["section_type"]
        })
    }

    async fn execute(&self, context: &ToolContext, input: Value) -> Value {
        match decode_input::<ApplicationContentRequest>(input) {
            Ok(request) => encode_outcome(&self.run(context, request).await),
            Err(error) => encode_outcome(&failed::<ApplicationContentResult>(&error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{json, Map};

    use horizon_core::compliance::word_count;
    use horizon_core::domain::project::{FocusArea, Project};
    use horizon_core::errors::ErrorCode;
    use horizon_core::requests::ApplicationContentRequest;
    use horizon_db::Repositories;

    use super::{merged_context, parse_draft, ApplicationContentTool, MAX_ALTERNATIVES};
    use crate::llm::ScriptedLlmClient;
    use crate::tools::tests::deps_with;
    use crate::tools::ToolContext;

    fn long_text(words: usize) -> String {
        let sentence = "European youth participants test an innovative new approach together";
        sentence.split(' ').cycle().take(words).collect::<Vec<_>>().join(" ")
    }

    fn reply_with(content: &str, alternatives: usize) -> String {
        let alternatives: Vec<_> = (0..alternatives)
            .map(|index| json!({ "focus": format!("variant {index}"), "content": long_text(120) }))
            .collect();
        json!({ "content": content, "alternatives": alternatives }).to_string()
    }

    fn request(word_limit: Option<usize>, project: Option<&Project>) -> ApplicationContentRequest {
        let mut context = Map::new();
        context.insert("title".to_string(), json!("Green Futures"));
        ApplicationContentRequest {
            section_type: "Project Description".to_string(),
            project_context: context,
            word_limit,
            project_id: project.map(|project| project.id.clone()),
        }
    }

    #[test]
    fn plain_text_reply_becomes_content() {
        let draft = parse_draft("  Our project connects young people.  ").expect("parse");
        assert_eq!(draft.content, "Our project connects young people.");
        assert!(draft.alternatives.is_empty());
    }

    #[test]
    fn prose_with_a_bracketed_citation_stays_plain_text() {
        let reply = "Young people across Europe build an innovative network, as shown in [1].";
        let draft = parse_draft(reply).expect("parse");
        assert_eq!(draft.content, reply);

        let braces = "Participants agree on {shared goals} and report in [month 6].";
        assert_eq!(parse_draft(braces).expect("parse").content, braces);
    }

    #[test]
    fn object_with_content_inside_prose_is_used() {
        let draft = parse_draft(r#"Sure! {"content": "Main text", "alternatives": []} Hope it helps."#)
            .expect("parse");
        assert_eq!(draft.content, "Main text");
    }

    #[test]
    fn json_reply_without_content_is_rejected() {
        assert!(parse_draft(r#"{"text": "misplaced"}"#).is_err());
        assert!(parse_draft("   ").is_err());
    }

    #[test]
    fn string_alternatives_get_numbered_focus_labels() {
        let draft = parse_draft(r#"{"content": "Main", "alternatives": ["One", {"content": "Two"}, 7]}"#)
            .expect("parse");
        assert_eq!(
            draft.alternatives,
            vec![
                ("alternative 1".to_string(), "One".to_string()),
                ("alternative 2".to_string(), "Two".to_string()),
            ]
        );
    }

    #[test]
    fn supplied_context_wins_over_project_fields() {
        let mut project = Project::new("user-1", "Stored title");
        project.focus_area = Some(FocusArea::GreenTransition);
        let merged = merged_context(&request(None, None).project_context, Some(&project));

        assert_eq!(merged["title"], json!("Green Futures"));
        assert_eq!(merged["focus_area"], json!("Green Transition"));
        assert!(!merged.contains_key("target_audience"));
    }

    #[tokio::test]
    async fn fifty_word_project_description_respects_the_limit() {
        let llm = Arc::new(ScriptedLlmClient::with_reply(reply_with(&long_text(200), 5)));
        let tool = ApplicationContentTool::new(deps_with(llm, Repositories::in_memory()));

        let outcome = tool.run(&ToolContext::for_user("user-1"), request(Some(50), None)).await;
        let result = outcome.data.expect("generated");

        assert!(result.generated_content.word_count <= 50);
        assert_eq!(word_count(&result.generated_content.content), result.generated_content.word_count);
        assert!(result.generated_content.content.ends_with("..."));
        assert_eq!(result.alternative_versions.len(), MAX_ALTERNATIVES);
        assert!(result.alternative_versions.iter().all(|alternative| alternative.word_count <= 50));
        assert!(result.generated_content.compliance_status);
        assert!(result.section_id.is_none());
    }

    #[tokio::test]
    async fn missing_elements_are_reported() {
        let llm = Arc::new(ScriptedLlmClient::with_reply(reply_with("A local gardening club.", 0)));
        let tool = ApplicationContentTool::new(deps_with(llm, Repositories::in_memory()));

        let result = tool
            .run(&ToolContext::for_user("user-1"), request(None, None))
            .await
            .data
            .expect("generated");
        let details = &result.generated_content.compliance_details;
        assert!(!result.generated_content.compliance_status);
        assert_eq!(details.missing_elements.len(), 3);
        assert!(details.strength_areas.is_empty());
        assert_eq!(details.improvement_suggestions.len(), 3);
    }

    #[tokio::test]
    async fn sections_for_a_project_are_versioned() {
        let llm = Arc::new(ScriptedLlmClient::with_reply(reply_with(&long_text(30), 1)));
        llm.push_reply(reply_with(&long_text(40), 0)).await;
        let repositories = Repositories::in_memory();
        let project = Project::new("user-1", "Green Futures");
        repositories.projects.save(project.clone()).await.expect("save project");
        let tool = ApplicationContentTool::new(deps_with(llm, repositories.clone()));
        let context = ToolContext::for_user("user-1");

        let first = tool.run(&context, request(None, Some(&project))).await.data.expect("first");
        let second = tool.run(&context, request(None, Some(&project))).await.data.expect("second");
        assert_eq!(first.version, Some(1));
        assert_eq!(second.version, Some(2));

        let stored = repositories.sections.list_for_project(&project.id).await.expect("list");
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].suggestions.len(), 3);
    }

    #[tokio::test]
    async fn word_limit_above_maximum_never_reaches_the_llm() {
        let llm = Arc::new(ScriptedLlmClient::with_reply("unused"));
        let tool = ApplicationContentTool::new(deps_with(llm.clone(), Repositories::in_memory()));

        let outcome = tool.run(&ToolContext::for_user("user-1"), request(Some(6000), None)).await;
        assert_eq!(outcome.error_code, Some(ErrorCode::ValidationError));
        assert!(llm.requests().await.is_empty());
    }
}
