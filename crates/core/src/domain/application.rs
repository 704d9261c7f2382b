use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::project::ProjectId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SectionId(pub String);

impl SectionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// A persisted draft of one application section. Each save of the same
/// project + section name produces a new row with the next version number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSection {
    pub id: SectionId,
    pub project_id: ProjectId,
    pub section_name: String,
    pub content: String,
    pub word_count: usize,
    pub compliance_status: bool,
    pub suggestions: Vec<String>,
    pub version: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceDetails {
    pub missing_elements: Vec<String>,
    pub strength_areas: Vec<String>,
    pub improvement_suggestions: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub section_name: String,
    pub content: String,
    pub word_count: usize,
    pub compliance_status: bool,
    pub compliance_details: ComplianceDetails,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativeVersion {
    pub focus: String,
    pub content: String,
    pub word_count: usize,
}
