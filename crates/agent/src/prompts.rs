//! System prompts for the three assistants and the tera templates that render
//! the tool prompts.

use serde::Serialize;
use serde_json::{Map, Value};
use tera::{Context, Tera};
use thiserror::Error;

use horizon_core::domain::project::{FocusArea, Project};
use horizon_core::requests::{ApplicationContentRequest, BrainstormRequest, PromptMode};

use crate::agents::AgentType;

const BRAINSTORMING_STANDARD: &str = "\
You are an Erasmus+ project consultant working with the Swedish NGO Open Horizon. \
You turn rough ideas into structured, fundable Erasmus+ projects. \
You know the programme priorities well: digital transformation, the green transition, \
inclusion and diversity, participation and European values.

Ask focused questions to find out what the team cares about and what it is good at. \
Suggest the priority themes that fit, pin down the target audience and its needs, \
and look for an innovation angle that sets the project apart. \
Work on one concept at a time, keep the tone encouraging, and keep ambition \
in line with what a small organisation can deliver.";

const BRAINSTORMING_QUICK: &str = "\
You generate Erasmus+ project ideas fast. Help the user settle on a concept and a \
focus area in a few minutes. Answer briefly and end with a concrete next action.";

const BRAINSTORMING_EXPERT: &str = "\
You are a senior Erasmus+ strategy consultant. The user has run funded projects before; \
give detailed analysis of fit with programme priorities, competitive positioning and \
feasibility, and challenge weak assumptions.";

const PLANNING_STANDARD: &str = "\
You are an Erasmus+ planning specialist for the Swedish NGO Open Horizon. \
You help build consortia and shape project structure.

Work out the partner profiles a concept needs, evaluate candidate partners for \
complementary expertise rather than geography alone, and propose a balanced consortium. \
Outline work packages with deliverables, a realistic timeline with milestones, clear \
roles for every partner, and the main risks with their mitigation.";

const PLANNING_QUICK: &str = "\
You give fast partner recommendations and a skeleton project plan. Cover the essential \
partnerships and core deliverables only.";

const PLANNING_EXPERT: &str = "\
You design multi-stakeholder Erasmus+ consortia. Provide detailed risk analysis, \
timeline optimisation and strategic reasoning for every partnership you recommend.";

const APPLICATION_STANDARD: &str = "\
You are an experienced Erasmus+ application writer for the Swedish NGO Open Horizon. \
You write persuasive sections that still meet every formal requirement.

Open each section with why the project matters to evaluators. Support claims with \
evidence or clear reasoning, prefer specific and measurable outcomes, address likely \
concerns before they are raised, and link the Swedish context to European added value. \
Respect word limits strictly and write plain language an international panel can read.";

const APPLICATION_QUICK: &str = "\
You draft Erasmus+ application sections quickly. Meet the basic requirements and keep \
the quality acceptable; polish comes later.";

const APPLICATION_EXPERT: &str = "\
You write competition-level Erasmus+ applications. Use strong narrative structure, \
integrate evidence thoroughly and position every section against the award criteria.";

pub const NEW_SESSION_CONTEXT: &str = "New user session - provide comprehensive guidance.";

pub fn system_prompt(agent: AgentType, mode: PromptMode) -> &'static str {
    match (agent, mode) {
        (AgentType::Brainstorming, PromptMode::Standard) => BRAINSTORMING_STANDARD,
        (AgentType::Brainstorming, PromptMode::Quick) => BRAINSTORMING_QUICK,
        (AgentType::Brainstorming, PromptMode::Expert) => BRAINSTORMING_EXPERT,
        (AgentType::Planning, PromptMode::Standard) => PLANNING_STANDARD,
        (AgentType::Planning, PromptMode::Quick) => PLANNING_QUICK,
        (AgentType::Planning, PromptMode::Expert) => PLANNING_EXPERT,
        (AgentType::Application, PromptMode::Standard) => APPLICATION_STANDARD,
        (AgentType::Application, PromptMode::Quick) => APPLICATION_QUICK,
        (AgentType::Application, PromptMode::Expert) => APPLICATION_EXPERT,
    }
}

/// What the assistant is told about the caller. `project` is the loaded
/// project when `project_id` resolved for this user.
pub fn session_context(
    user_id: Option<&str>,
    project_id: Option<&str>,
    project: Option<&Project>,
    session_id: Option<&str>,
) -> String {
    let mut parts = Vec::new();

    if let Some(user_id) = user_id.filter(|value| !value.is_empty()) {
        parts.push(format!("User ID: {user_id}"));
    }
    if let Some(project_id) = project_id {
        parts.push(format!("Current project: {project_id}"));
        if let Some(project) = project {
            parts.push(format!("Project title: {}", project.title));
            parts.push(format!("Project status: {}", project.status.as_str()));
            parts.push(format!(
                "Focus area: {}",
                project.focus_area.map(|area| area.label()).unwrap_or("Unknown")
            ));
        }
    }
    if let Some(session_id) = session_id {
        parts.push(format!("Session ID: {session_id}"));
    }

    if parts.is_empty() {
        NEW_SESSION_CONTEXT.to_string()
    } else {
        parts.join(" | ")
    }
}

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt template error: {0}")]
    Template(String),
}

impl From<tera::Error> for PromptError {
    fn from(error: tera::Error) -> Self {
        Self::Template(error.to_string())
    }
}

/// Named application sections with their own guidance. Anything else uses the
/// generic template under the caller's section name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SectionTemplate {
    ProjectDescription,
    Methodology,
    Impact,
    ProjectManagement,
    Dissemination,
    BudgetJustification,
    Generic,
}

impl SectionTemplate {
    pub fn for_section(section_type: &str) -> Self {
        let normalized = section_type.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "project description" | "description" => Self::ProjectDescription,
            "methodology" => Self::Methodology,
            "impact" => Self::Impact,
            "project management" | "management" => Self::ProjectManagement,
            "dissemination" => Self::Dissemination,
            "budget justification" | "budget" => Self::BudgetJustification,
            _ => Self::Generic,
        }
    }

    fn template_name(&self) -> &'static str {
        match self {
            Self::ProjectDescription => "sections/project_description.tera",
            Self::Methodology => "sections/methodology.tera",
            Self::Impact => "sections/impact.tera",
            Self::ProjectManagement => "sections/project_management.tera",
            Self::Dissemination => "sections/dissemination.tera",
            Self::BudgetJustification => "sections/budget_justification.tera",
            Self::Generic => "sections/generic.tera",
        }
    }
}

#[derive(Serialize)]
struct ContextLine {
    key: String,
    value: String,
}

fn context_lines(project_context: &Map<String, Value>) -> Vec<ContextLine> {
    project_context
        .iter()
        .filter_map(|(key, value)| {
            let rendered = match value {
                Value::Null => return None,
                Value::String(text) => text.trim().to_string(),
                Value::Array(items) => items
                    .iter()
                    .map(|item| match item {
                        Value::String(text) => text.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(", "),
                other => other.to_string(),
            };
            (!rendered.is_empty()).then(|| ContextLine { key: key.clone(), value: rendered })
        })
        .collect()
}

/// Compiled prompt templates. Built once and shared by the tools.
pub struct PromptLibrary {
    tera: Tera,
}

impl PromptLibrary {
    pub fn embedded() -> Result<Self, PromptError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("brainstorm.tera", include_str!("../../../templates/prompts/brainstorm.tera")),
            ("sections/base.tera", include_str!("../../../templates/prompts/sections/base.tera")),
            (
                "sections/project_description.tera",
                include_str!("../../../templates/prompts/sections/project_description.tera"),
            ),
            (
                "sections/methodology.tera",
                include_str!("../../../templates/prompts/sections/methodology.tera"),
            ),
            ("sections/impact.tera", include_str!("../../../templates/prompts/sections/impact.tera")),
            (
                "sections/project_management.tera",
                include_str!("../../../templates/prompts/sections/project_management.tera"),
            ),
            (
                "sections/dissemination.tera",
                include_str!("../../../templates/prompts/sections/dissemination.tera"),
            ),
            (
                "sections/budget_justification.tera",
                include_str!("../../../templates/prompts/sections/budget_justification.tera"),
            ),
            (
                "sections/generic.tera",
                include_str!("../../../templates/prompts/sections/generic.tera"),
            ),
        ])?;
        Ok(Self { tera })
    }

    pub fn brainstorm(&self, request: &BrainstormRequest) -> Result<String, PromptError> {
        let mut context = Context::new();
        context.insert("initial_concept", request.initial_concept.trim());
        context.insert("organization_context", request.organization_context.trim());
        context.insert("focus_preference", &request.focus_preference.map(|area| area.label()));
        context.insert(
            "focus_areas",
            &FocusArea::ALL.iter().map(|area| area.label()).collect::<Vec<_>>(),
        );
        Ok(self.tera.render("brainstorm.tera", &context)?)
    }

    pub fn application_section(
        &self,
        request: &ApplicationContentRequest,
        project_context: &Map<String, Value>,
    ) -> Result<String, PromptError> {
        let template = SectionTemplate::for_section(&request.section_type);
        let mut context = Context::new();
        context.insert("section_name", request.section_type.trim());
        context.insert("context_lines", &context_lines(project_context));
        context.insert("word_limit", &request.word_limit);
        Ok(self.tera.render(template.template_name(), &context)?)
    }
}
