use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: String,
    pub source_type: String,
    pub title: String,
    pub content: String,
    pub url: Option<String>,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeMatch {
    pub id: String,
    pub source_type: String,
    pub title: String,
    pub content: String,
    pub url: Option<String>,
    pub similarity: f32,
}
