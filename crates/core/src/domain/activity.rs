use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::project::ProjectId;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartnerSearch {
    pub id: String,
    pub project_id: ProjectId,
    pub search_query: String,
    pub partners_found: Value,
    pub searched_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub id: String,
    pub user_id: String,
    pub project_id: Option<ProjectId>,
    pub agent_type: String,
    pub last_active_at: DateTime<Utc>,
}
