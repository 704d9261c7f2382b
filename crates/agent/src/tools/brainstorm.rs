use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use horizon_core::domain::concept::{clamp_feasibility, ProjectConcept};
use horizon_core::domain::project::{FocusArea, Project, ProjectId};
use horizon_core::errors::ApplicationError;
use horizon_core::outcome::ToolOutcome;
use horizon_core::requests::{BrainstormRequest, PromptMode};

use super::{
    check_request, decode_input, encode_outcome, extract_json, failed, log_outcome,
    owned_project, AgentDeps, Tool, ToolContext, BRAINSTORM_TOOL,
};
use crate::agents::AgentType;
use crate::llm::{CompletionRequest, LlmError};
use crate::prompts::system_prompt;

pub const NEXT_STEPS: [&str; 4] = [
    "Select the most promising concept for further development",
    "Identify potential European partner organizations",
    "Define specific learning outcomes and impact metrics",
    "Estimate budget and timeline requirements",
];

const MAX_CONCEPTS: usize = 5;
const DEFAULT_FEASIBILITY: i64 = 5;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrainstormResult {
    /// The project the concepts were saved to. `None` when saving failed for
    /// a project this call would have created.
    pub project_id: Option<ProjectId>,
    pub project_concepts: Vec<ProjectConcept>,
    pub next_steps: Vec<String>,
}

pub struct BrainstormTool {
    deps: AgentDeps,
}

impl BrainstormTool {
    pub fn new(deps: AgentDeps) -> Self {
        Self { deps }
    }

    pub async fn run(
        &self,
        context: &ToolContext,
        request: BrainstormRequest,
    ) -> ToolOutcome<BrainstormResult> {
        let started = Instant::now();
        let outcome = match self.generate(context, &request).await {
            Ok(result) => ToolOutcome::ok(result),
            Err(error) => failed(&error),
        };
        log_outcome(BRAINSTORM_TOOL, started, &outcome);
        outcome
    }

    async fn generate(
        &self,
        context: &ToolContext,
        request: &BrainstormRequest,
    ) -> Result<BrainstormResult, ApplicationError> {
        check_request(request.validate())?;
        let existing = owned_project(&self.deps, context, request.project_id.as_ref()).await?;

        let prompt = self
            .deps
            .prompts
            .brainstorm(request)
            .map_err(|error| ApplicationError::Configuration(error.to_string()))?;
        let reply = self
            .deps
            .llm
            .complete(&CompletionRequest::json(
                system_prompt(AgentType::Brainstorming, PromptMode::Standard),
                prompt,
            ))
            .await?;
        let concepts = parse_concepts(&reply, request.focus_preference)?;
        let project_id = self.save_concepts(context, existing, &concepts).await;

        Ok(BrainstormResult {
            project_id,
            project_concepts: concepts,
            next_steps: NEXT_STEPS.iter().map(ToString::to_string).collect(),
        })
    }

    async fn save_concepts(
        &self,
        context: &ToolContext,
        existing: Option<Project>,
        concepts: &[ProjectConcept],
    ) -> Option<ProjectId> {
        let created = existing.is_none();
        let mut project = match existing {
            Some(project) => project,
            None => {
                let lead = concepts.first()?;
                let mut project = Project::new(&context.user_id, &lead.title);
                project.focus_area = Some(lead.focus_area);
                project.target_audience = Some(lead.target_audience.clone());
                project.innovation_angle = Some(lead.innovation_angle.clone());
                project
            }
        };
        project.brainstorm_results = serde_json::to_value(concepts).ok();
        project.touch();

        let project_id = project.id.clone();
        match self.deps.repositories.projects.save(project).await {
            Ok(()) => {
                tracing::info!(
                    event_name = "agent.brainstorm.saved",
                    project_id = %project_id,
                    created,
                    concepts = concepts.len(),
                    "brainstorm results saved"
                );
                Some(project_id)
            }
            Err(error) => {
                tracing::warn!(
                    event_name = "agent.brainstorm.save_failed",
                    project_id = %project_id,
                    error = %error,
                    "returning brainstorm results without saving them"
                );
                (!created).then_some(project_id)
            }
        }
    }
}

#[async_trait]
impl Tool for BrainstormTool {
    fn name(&self) -> &'static str {
        BRAINSTORM_TOOL
    }

    fn description(&self) -> &'static str {
        "Generate structured Erasmus+ project concepts from an initial idea"
    }

    fn parameters(&self) -> Value {
        let focus_areas: Vec<&str> = FocusArea::ALL.iter().map(FocusArea::label).collect();
        json!({
            "type": "object",
            "properties": {
                "initial_concept": { "type": "string", "description": "The idea to develop" },
                "focus_preference": { "type": "string", "enum": focus_areas },
                "organization_context": { "type": "string" }
            },
            "required": ["initial_concept"]
        })
    }

    async fn execute(&self, context: &ToolContext, input: Value) -> Value {
        match decode_input::<BrainstormRequest>(input) {
            Ok(request) => encode_outcome(&self.run(context, request).await),
            Err(error) => encode_outcome(&failed::<BrainstormResult>(&error)),
        }
    }
}

/// Reads the concept list out of a model reply. Accepts a bare array or an
/// object holding it under `concepts` or `project_concepts`. Entries without a
/// title are skipped.
pub fn parse_concepts(
    reply: &str,
    preference: Option<FocusArea>,
) -> Result<Vec<ProjectConcept>, LlmError> {
    let document = extract_json(reply)
        .ok_or_else(|| LlmError::Decode("brainstorm reply was not JSON".to_string()))?;

    let items = match document {
        Value::Array(items) => items,
        Value::Object(mut object) => ["concepts", "project_concepts"]
            .into_iter()
            .find_map(|key| match object.remove(key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or_else(|| LlmError::Decode("brainstorm reply had no concept list".to_string()))?,
        _ => return Err(LlmError::Decode("brainstorm reply was not a list".to_string())),
    };

    let concepts: Vec<ProjectConcept> = items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|object| concept_from_object(object, preference))
        .take(MAX_CONCEPTS)
        .collect();

    if concepts.is_empty() {
        return Err(LlmError::Decode("brainstorm reply held no usable concepts".to_string()));
    }
    Ok(concepts)
}

fn concept_from_object(
    object: &Map<String, Value>,
    preference: Option<FocusArea>,
) -> Option<ProjectConcept> {
    let text = |key: &str| {
        object
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToString::to_string)
    };

    let title = text("title")?;
    let focus_area = text("focus_area")
        .and_then(|label| FocusArea::from_label(&label))
        .or(preference)
        .unwrap_or(FocusArea::Participation);
    let feasibility = object.get("feasibility_score").and_then(score_of).unwrap_or(DEFAULT_FEASIBILITY);

    Some(ProjectConcept {
        title,
        focus_area,
        target_audience: text("target_audience").unwrap_or_else(|| "Young people".to_string()),
        innovation_angle: text("innovation_angle").unwrap_or_default(),
        feasibility_score: clamp_feasibility(feasibility),
        rationale: text("rationale").unwrap_or_default(),
    })
}

fn score_of(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => {
            number.as_i64().or_else(|| number.as_f64().map(|score| score.round() as i64))
        }
        Value::String(text) => text.trim().parse::<f64>().ok().map(|score| score.round() as i64),
        _ => None,
    }
}
