use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

pub const MIN_COMPATIBILITY: u8 = 1;
pub const MAX_COMPATIBILITY: u8 = 10;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartnerId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrganizationType {
    #[serde(rename = "NGO")]
    Ngo,
    #[serde(rename = "Public Body")]
    PublicBody,
    #[serde(rename = "School")]
    School,
    #[serde(rename = "Higher Education Institution")]
    HigherEducationInstitution,
    #[serde(rename = "Company")]
    Company,
    #[serde(rename = "Other")]
    Other,
}

impl OrganizationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ngo => "NGO",
            Self::PublicBody => "Public Body",
            Self::School => "School",
            Self::HigherEducationInstitution => "Higher Education Institution",
            Self::Company => "Company",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for OrganizationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrganizationType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ngo" => Ok(Self::Ngo),
            "public body" | "public" => Ok(Self::PublicBody),
            "school" => Ok(Self::School),
            "higher education institution" | "hei" => Ok(Self::HigherEducationInstitution),
            "company" => Ok(Self::Company),
            "other" => Ok(Self::Other),
            _ => Err(DomainError::UnknownVariant {
                kind: "organization type",
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partner {
    pub id: PartnerId,
    pub name: String,
    pub country: String,
    pub organization_type: OrganizationType,
    pub expertise_areas: Vec<String>,
    #[serde(default)]
    pub contact_info: ContactInfo,
    pub erasmus_code: String,
    pub compatibility_score: u8,
    pub partnership_rationale: Option<String>,
}

impl Partner {
    pub fn has_expertise(&self, area: &str) -> bool {
        let needle = normalize_label(area);
        self.expertise_areas.iter().any(|expertise| normalize_label(expertise) == needle)
    }

    /// True when one expertise area and `focus` are the same phrase, or one
    /// contains the other word for word. "Art" does not match "Participation".
    pub fn matches_focus(&self, focus: &str) -> bool {
        let focus = label_words(focus);
        !focus.is_empty()
            && self.expertise_areas.iter().any(|area| {
                let area = label_words(area);
                contains_phrase(&area, &focus) || contains_phrase(&focus, &area)
            })
    }
}

/// Form used for every country and expertise comparison.
pub fn normalize_label(value: &str) -> String {
    value.trim().to_lowercase()
}

fn label_words(value: &str) -> Vec<String> {
    value
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn contains_phrase(haystack: &[String], needle: &[String]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|window| window == needle)
}

pub fn clamp_compatibility(score: i64) -> u8 {
    score.clamp(i64::from(MIN_COMPATIBILITY), i64::from(MAX_COMPATIBILITY)) as u8
}
