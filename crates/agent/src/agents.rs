use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tools::{APPLICATION_TOOL, BRAINSTORM_TOOL, PARTNER_TOOL};

/// The three assistants. Each one has its own system prompt and tool set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    Brainstorming,
    Planning,
    Application,
}

impl AgentType {
    pub const ALL: [AgentType; 3] =
        [AgentType::Brainstorming, AgentType::Planning, AgentType::Application];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Brainstorming => "brainstorming",
            Self::Planning => "planning",
            Self::Application => "application",
        }
    }

    /// Unknown names fall back to brainstorming.
    pub fn parse_lenient(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|agent| agent.as_str() == normalized).unwrap_or_else(|| {
            tracing::debug!(
                event_name = "agent.type.fallback",
                requested = raw,
                "unknown agent type, using brainstorming"
            );
            Self::Brainstorming
        })
    }

    pub fn tool_names(&self) -> &'static [&'static str] {
        match self {
            Self::Brainstorming => &[BRAINSTORM_TOOL, PARTNER_TOOL],
            Self::Planning => &[PARTNER_TOOL, APPLICATION_TOOL],
            Self::Application => &[APPLICATION_TOOL],
        }
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
