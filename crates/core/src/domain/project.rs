use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{DomainError, FieldError};

pub const MIN_DURATION_MONTHS: u8 = 3;
pub const MAX_DURATION_MONTHS: u8 = 36;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectId(pub String);

impl ProjectId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Erasmus+ priority themes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FocusArea {
    DigitalTransformation,
    GreenTransition,
    InclusionAndDiversity,
    Participation,
    EuropeanValues,
    Innovation,
}

impl FocusArea {
    pub const ALL: [FocusArea; 6] = [
        FocusArea::DigitalTransformation,
        FocusArea::GreenTransition,
        FocusArea::InclusionAndDiversity,
        FocusArea::Participation,
        FocusArea::EuropeanValues,
        FocusArea::Innovation,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::DigitalTransformation => "Digital Transformation",
            Self::GreenTransition => "Green Transition",
            Self::InclusionAndDiversity => "Inclusion and Diversity",
            Self::Participation => "Participation",
            Self::EuropeanValues => "European Values",
            Self::Innovation => "Innovation",
        }
    }

    /// Resolves a free-form label, first by exact (case-insensitive) name and
    /// then by theme keyword. Model output rarely matches the taxonomy verbatim.
    pub fn from_label(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return None;
        }

        if let Some(exact) =
            Self::ALL.into_iter().find(|area| area.label().to_ascii_lowercase() == normalized)
        {
            return Some(exact);
        }

        const KEYWORDS: &[(&str, FocusArea)] = &[
            ("digital", FocusArea::DigitalTransformation),
            ("green", FocusArea::GreenTransition),
            ("environment", FocusArea::GreenTransition),
            ("climate", FocusArea::GreenTransition),
            ("sustainab", FocusArea::GreenTransition),
            ("inclusion", FocusArea::InclusionAndDiversity),
            ("diversity", FocusArea::InclusionAndDiversity),
            ("participation", FocusArea::Participation),
            ("civic", FocusArea::Participation),
            ("values", FocusArea::EuropeanValues),
            ("democra", FocusArea::EuropeanValues),
            ("innovat", FocusArea::Innovation),
        ];

        KEYWORDS.iter().find(|(keyword, _)| normalized.contains(keyword)).map(|(_, area)| *area)
    }
}

impl fmt::Display for FocusArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl TryFrom<String> for FocusArea {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_label(&value)
            .ok_or(DomainError::UnknownVariant { kind: "focus area", value })
    }
}

impl From<FocusArea> for String {
    fn from(value: FocusArea) -> Self {
        value.label().to_string()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Brainstorming,
    Planning,
    Partnering,
    Writing,
    Review,
    Submitted,
    Approved,
    Active,
}

impl ProjectStatus {
    pub const LIFECYCLE: [ProjectStatus; 8] = [
        ProjectStatus::Brainstorming,
        ProjectStatus::Planning,
        ProjectStatus::Partnering,
        ProjectStatus::Writing,
        ProjectStatus::Review,
        ProjectStatus::Submitted,
        ProjectStatus::Approved,
        ProjectStatus::Active,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Brainstorming => "brainstorming",
            Self::Planning => "planning",
            Self::Partnering => "partnering",
            Self::Writing => "writing",
            Self::Review => "review",
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Active => "active",
        }
    }

    /// Successor in the linear lifecycle. Callers decide when to move; nothing
    /// on the server rejects a jump.
    pub fn next(&self) -> Result<ProjectStatus, DomainError> {
        let position = Self::LIFECYCLE.iter().position(|status| status == self).unwrap_or(0);
        Self::LIFECYCLE
            .get(position + 1)
            .copied()
            .ok_or(DomainError::TerminalStatus { from: *self })
    }
}

impl FromStr for ProjectStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::LIFECYCLE
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| DomainError::UnknownVariant {
                kind: "project status",
                value: value.to_string(),
            })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub user_id: String,
    pub title: String,
    pub focus_area: Option<FocusArea>,
    pub target_audience: Option<String>,
    pub innovation_angle: Option<String>,
    pub status: ProjectStatus,
    pub duration_months: Option<u8>,
    pub budget_estimate_eur: Option<Decimal>,
    pub countries_involved: BTreeSet<String>,
    pub brainstorm_results: Option<Value>,
    pub partner_search_results: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(user_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ProjectId::generate(),
            user_id: user_id.into(),
            title: title.into(),
            focus_area: None,
            target_audience: None,
            innovation_angle: None,
            status: ProjectStatus::Brainstorming,
            duration_months: None,
            budget_estimate_eur: None,
            countries_involved: BTreeSet::new(),
            brainstorm_results: None,
            partner_search_results: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.title.trim().is_empty() {
            errors.push(FieldError::new("title", "must not be empty"));
        }
        errors.extend(validate_duration(self.duration_months));
        errors.extend(validate_budget(self.budget_estimate_eur));
        errors
    }
}

pub fn validate_duration(duration_months: Option<u8>) -> Option<FieldError> {
    duration_months
        .filter(|months| !(MIN_DURATION_MONTHS..=MAX_DURATION_MONTHS).contains(months))
        .map(|_| {
            FieldError::new(
                "duration_months",
                format!("must be between {MIN_DURATION_MONTHS} and {MAX_DURATION_MONTHS}"),
            )
        })
}

pub fn validate_budget(budget_estimate_eur: Option<Decimal>) -> Option<FieldError> {
    budget_estimate_eur
        .filter(|budget| budget.is_sign_negative() && !budget.is_zero())
        .map(|_| FieldError::new("budget_estimate_eur", "must be zero or greater"))
}
