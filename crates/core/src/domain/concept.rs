use serde::{Deserialize, Serialize};

use crate::domain::project::FocusArea;

pub const MIN_FEASIBILITY: u8 = 1;
pub const MAX_FEASIBILITY: u8 = 10;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConcept {
    pub title: String,
    pub focus_area: FocusArea,
    pub target_audience: String,
    pub innovation_angle: String,
    pub feasibility_score: u8,
    pub rationale: String,
}

pub fn clamp_feasibility(score: i64) -> u8 {
    score.clamp(i64::from(MIN_FEASIBILITY), i64::from(MAX_FEASIBILITY)) as u8
}
