//! Inbound payloads for the tool layer and the project routes.
//!
//! Deserialization catches type errors and missing required fields. The
//! `validate` methods then catch what serde cannot: blank strings and out of
//! range numbers. Both kinds surface as `VALIDATION_ERROR` before any tool runs.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::project::{
    validate_budget, validate_duration, FocusArea, Project, ProjectId, ProjectStatus,
};
use crate::errors::FieldError;
use crate::matching::{PartnerCriteria, DEFAULT_MAX_RESULTS};

pub const DEFAULT_ORGANIZATION_CONTEXT: &str = "Swedish NGO";
pub const MAX_WORD_LIMIT: usize = 5000;
pub const MAX_PARTNER_RESULTS: usize = 50;
pub const DEFAULT_KNOWLEDGE_THRESHOLD: f32 = 0.78;
pub const DEFAULT_KNOWLEDGE_LIMIT: usize = 5;

fn default_organization_context() -> String {
    DEFAULT_ORGANIZATION_CONTEXT.to_string()
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

fn default_agent_type() -> String {
    "brainstorming".to_string()
}

fn default_threshold() -> f32 {
    DEFAULT_KNOWLEDGE_THRESHOLD
}

fn default_limit() -> usize {
    DEFAULT_KNOWLEDGE_LIMIT
}

fn require_text(errors: &mut Vec<FieldError>, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, "must not be empty"));
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrainstormRequest {
    pub initial_concept: String,
    #[serde(default)]
    pub focus_preference: Option<FocusArea>,
    #[serde(default = "default_organization_context")]
    pub organization_context: String,
    #[serde(default)]
    pub project_id: Option<ProjectId>,
}

impl BrainstormRequest {
    pub fn new(initial_concept: impl Into<String>) -> Self {
        Self {
            initial_concept: initial_concept.into(),
            focus_preference: None,
            organization_context: default_organization_context(),
            project_id: None,
        }
    }

    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        require_text(&mut errors, "initial_concept", &self.initial_concept);
        require_text(&mut errors, "organization_context", &self.organization_context);
        errors
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerSearchRequest {
    pub project_focus: String,
    #[serde(default)]
    pub required_countries: Option<Vec<String>>,
    /// Required on the wire; an empty list disables expertise filtering.
    pub expertise_areas: Vec<String>,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default)]
    pub project_id: Option<ProjectId>,
}

impl PartnerSearchRequest {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        require_text(&mut errors, "project_focus", &self.project_focus);
        if !(1..=MAX_PARTNER_RESULTS).contains(&self.max_results) {
            errors.push(FieldError::new(
                "max_results",
                format!("must be between 1 and {MAX_PARTNER_RESULTS}"),
            ));
        }
        if let Some(countries) = &self.required_countries {
            if countries.iter().any(|country| country.trim().is_empty()) {
                errors.push(FieldError::new("required_countries", "entries must not be empty"));
            }
        }
        errors
    }

    pub fn criteria(&self) -> PartnerCriteria {
        PartnerCriteria {
            project_focus: self.project_focus.trim().to_string(),
            required_countries: self.required_countries.clone().unwrap_or_default(),
            expertise_areas: self.expertise_areas.clone(),
            max_results: self.max_results,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApplicationContentRequest {
    pub section_type: String,
    #[serde(default)]
    pub project_context: Map<String, Value>,
    #[serde(default)]
    pub word_limit: Option<usize>,
    #[serde(default)]
    pub project_id: Option<ProjectId>,
}

impl ApplicationContentRequest {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        require_text(&mut errors, "section_type", &self.section_type);
        if let Some(limit) = self.word_limit {
            if !(1..=MAX_WORD_LIMIT).contains(&limit) {
                errors.push(FieldError::new(
                    "word_limit",
                    format!("must be between 1 and {MAX_WORD_LIMIT}"),
                ));
            }
        }
        errors
    }
}

/// How much the assistant should say. Selects the system prompt variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptMode {
    #[default]
    Standard,
    Quick,
    Expert,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default = "default_agent_type")]
    pub agent_type: String,
    #[serde(default)]
    pub mode: PromptMode,
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl ChatRequest {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        require_text(&mut errors, "message", &self.message);
        errors
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    pub title: String,
    #[serde(default)]
    pub focus_area: Option<FocusArea>,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub innovation_angle: Option<String>,
    #[serde(default)]
    pub duration_months: Option<u8>,
    #[serde(default)]
    pub budget_estimate_eur: Option<Decimal>,
    #[serde(default)]
    pub countries_involved: BTreeSet<String>,
}

impl CreateProjectRequest {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        require_text(&mut errors, "title", &self.title);
        errors.extend(validate_duration(self.duration_months));
        errors.extend(validate_budget(self.budget_estimate_eur));
        errors
    }

    pub fn into_project(self, user_id: impl Into<String>) -> Project {
        let mut project = Project::new(user_id, self.title.trim());
        project.focus_area = self.focus_area;
        project.target_audience = self.target_audience;
        project.innovation_angle = self.innovation_angle;
        project.duration_months = self.duration_months;
        project.budget_estimate_eur = self.budget_estimate_eur;
        project.countries_involved = self.countries_involved;
        project
    }
}

/// Partial update. Absent fields are left alone; status is taken as given.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProjectRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub focus_area: Option<FocusArea>,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub innovation_angle: Option<String>,
    #[serde(default)]
    pub status: Option<ProjectStatus>,
    #[serde(default)]
    pub duration_months: Option<u8>,
    #[serde(default)]
    pub budget_estimate_eur: Option<Decimal>,
    #[serde(default)]
    pub countries_involved: Option<BTreeSet<String>>,
}

impl UpdateProjectRequest {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if let Some(title) = &self.title {
            require_text(&mut errors, "title", title);
        }
        errors.extend(validate_duration(self.duration_months));
        errors.extend(validate_budget(self.budget_estimate_eur));
        errors
    }

    pub fn apply_to(self, project: &mut Project) {
        if let Some(title) = self.title {
            project.title = title.trim().to_string();
        }
        if let Some(focus_area) = self.focus_area {
            project.focus_area = Some(focus_area);
        }
        if let Some(target_audience) = self.target_audience {
            project.target_audience = Some(target_audience);
        }
        if let Some(innovation_angle) = self.innovation_angle {
            project.innovation_angle = Some(innovation_angle);
        }
        if let Some(status) = self.status {
            project.status = status;
        }
        if let Some(duration_months) = self.duration_months {
            project.duration_months = Some(duration_months);
        }
        if let Some(budget_estimate_eur) = self.budget_estimate_eur {
            project.budget_estimate_eur = Some(budget_estimate_eur);
        }
        if let Some(countries_involved) = self.countries_involved {
            project.countries_involved = countries_involved;
        }
        project.touch();
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeSearchRequest {
    pub embedding: Vec<f32>,
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl KnowledgeSearchRequest {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.embedding.is_empty() {
            errors.push(FieldError::new("embedding", "must not be empty"));
        }
        if !(-1.0..=1.0).contains(&self.threshold) {
            errors.push(FieldError::new("threshold", "must be between -1.0 and 1.0"));
        }
        if !(1..=50).contains(&self.limit) {
            errors.push(FieldError::new("limit", "must be between 1 and 50"));
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        ApplicationContentRequest, BrainstormRequest, ChatRequest, CreateProjectRequest,
        PartnerSearchRequest, PromptMode, UpdateProjectRequest, DEFAULT_ORGANIZATION_CONTEXT,
    };
    use crate::domain::project::{FocusArea, ProjectStatus};

    #[test]
    fn brainstorm_defaults_organization_context() {
        let request: BrainstormRequest = serde_json::from_value(json!({
            "initial_concept": "Digital skills for young refugees",
            "focus_preference": "Digital Transformation"
        }))
        .expect("decode brainstorm request");

        assert_eq!(request.organization_context, DEFAULT_ORGANIZATION_CONTEXT);
        assert_eq!(request.focus_preference, Some(FocusArea::DigitalTransformation));
        assert!(request.validate().is_empty());
    }

    #[test]
    fn brainstorm_without_concept_fails_to_decode() {
        let decoded = serde_json::from_value::<BrainstormRequest>(json!({
            "organization_context": "Swedish NGO"
        }));
        assert!(decoded.is_err());
    }

    #[test]
    fn blank_concept_is_a_field_error() {
        let errors = BrainstormRequest::new("   ").validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "initial_concept");
    }

    #[test]
    fn partner_search_criteria_flatten_optional_countries() {
        let request: PartnerSearchRequest = serde_json::from_value(json!({
            "project_focus": " Youth Work ",
            "expertise_areas": ["Youth Work"]
        }))
        .expect("decode partner request");

        assert!(request.validate().is_empty());
        let criteria = request.criteria();
        assert!(criteria.required_countries.is_empty());
        assert_eq!(criteria.project_focus, "Youth Work");
        assert_eq!(criteria.max_results, 10);
    }

    #[test]
    fn partner_search_without_expertise_list_fails_to_decode() {
        let decoded = serde_json::from_value::<PartnerSearchRequest>(json!({
            "project_focus": "Youth Work"
        }));
        assert!(decoded.is_err());

        let empty: PartnerSearchRequest = serde_json::from_value(json!({
            "project_focus": "Youth Work",
            "expertise_areas": []
        }))
        .expect("empty expertise list is accepted");
        assert!(empty.criteria().expertise_areas.is_empty());
    }

    #[test]
    fn word_limit_outside_range_is_rejected() {
        let mut request = ApplicationContentRequest {
            section_type: "Impact".to_string(),
            project_context: serde_json::Map::new(),
            word_limit: Some(0),
            project_id: None,
        };
        assert_eq!(request.validate()[0].field, "word_limit");

        request.word_limit = Some(5001);
        assert_eq!(request.validate().len(), 1);

        request.word_limit = Some(50);
        assert!(request.validate().is_empty());
    }

    #[test]
    fn chat_defaults_to_brainstorming_agent() {
        let request: ChatRequest =
            serde_json::from_value(json!({ "message": "hello" })).expect("decode chat request");
        assert_eq!(request.agent_type, "brainstorming");
        assert_eq!(request.mode, PromptMode::Standard);

        let expert: ChatRequest =
            serde_json::from_value(json!({ "message": "hello", "mode": "expert" }))
                .expect("decode expert chat request");
        assert_eq!(expert.mode, PromptMode::Expert);
    }

    #[test]
    fn project_update_accepts_any_status_and_checks_ranges() {
        let request: UpdateProjectRequest = serde_json::from_value(json!({
            "status": "approved",
            "duration_months": 2
        }))
        .expect("decode update");
        assert_eq!(request.status, Some(ProjectStatus::Approved));
        assert_eq!(request.validate()[0].field, "duration_months");
    }

    #[test]
    fn project_update_leaves_absent_fields_alone() {
        let mut project = CreateProjectRequest {
            title: "  Green Futures ".to_string(),
            focus_area: Some(FocusArea::GreenTransition),
            target_audience: Some("Rural youth".to_string()),
            innovation_angle: None,
            duration_months: Some(24),
            budget_estimate_eur: None,
            countries_involved: ["Sweden".to_string()].into_iter().collect(),
        }
        .into_project("user-1");
        assert_eq!(project.title, "Green Futures");

        UpdateProjectRequest {
            status: Some(ProjectStatus::Partnering),
            target_audience: Some("Young farmers".to_string()),
            ..UpdateProjectRequest::default()
        }
        .apply_to(&mut project);

        assert_eq!(project.status, ProjectStatus::Partnering);
        assert_eq!(project.target_audience.as_deref(), Some("Young farmers"));
        assert_eq!(project.focus_area, Some(FocusArea::GreenTransition));
        assert_eq!(project.duration_months, Some(24));
        assert!(project.countries_involved.contains("Sweden"));
    }
}
