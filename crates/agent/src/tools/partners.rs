use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use horizon_core::domain::activity::PartnerSearch;
use horizon_core::domain::project::Project;
use horizon_core::errors::{ApplicationError, ErrorCode};
use horizon_core::matching::{rank_partners, PartnerCriteria, PartnerMatches};
use horizon_core::outcome::ToolOutcome;
use horizon_core::requests::PartnerSearchRequest;
use horizon_db::SeedDataset;

use super::{
    check_request, decode_input, encode_outcome, failed, log_outcome, owned_project, AgentDeps,
    Tool, ToolContext, PARTNER_TOOL,
};

/// Ranks the partner catalog against the request. No external partner
/// directory is queried; an empty catalog falls back to the built-in sample
/// organisations.
pub struct PartnerSearchTool {
    deps: AgentDeps,
}

impl PartnerSearchTool {
    pub fn new(deps: AgentDeps) -> Self {
        Self { deps }
    }

    pub async fn run(
        &self,
        context: &ToolContext,
        request: PartnerSearchRequest,
    ) -> ToolOutcome<PartnerMatches> {
        let started = Instant::now();
        let outcome = match self.search(context, &request).await {
            Ok(outcome) => outcome,
            Err(error) => failed(&error),
        };
        log_outcome(PARTNER_TOOL, started, &outcome);
        outcome
    }

    async fn search(
        &self,
        context: &ToolContext,
        request: &PartnerSearchRequest,
    ) -> Result<ToolOutcome<PartnerMatches>, ApplicationError> {
        check_request(request.validate())?;
        let project = owned_project(&self.deps, context, request.project_id.as_ref()).await?;
        let criteria = request.criteria();

        let catalog = match self.deps.repositories.partners.list_all().await {
            Ok(catalog) if !catalog.is_empty() => catalog,
            Ok(_) => {
                tracing::debug!(
                    event_name = "agent.partners.sample_catalog",
                    "partner table is empty, ranking the sample organisations"
                );
                SeedDataset::partners()
            }
            Err(error) => return Ok(unavailable_catalog(&error.to_string(), &criteria)),
        };

        let matches = rank_partners(&catalog, &criteria);
        if let Some(project) = project {
            self.record_search(project, request, &matches).await;
        }
        Ok(ToolOutcome::ok(matches))
    }

    async fn record_search(
        &self,
        mut project: Project,
        request: &PartnerSearchRequest,
        matches: &PartnerMatches,
    ) {
        let partners_found = match serde_json::to_value(&matches.potential_partners) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(event_name = "agent.partners.encode_failed", error = %error, "skipping search log");
                return;
            }
        };

        let search = PartnerSearch {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project.id.clone(),
            search_query: request.project_focus.trim().to_string(),
            partners_found,
            searched_at: Utc::now(),
        };
        if let Err(error) = self.deps.repositories.partner_searches.record(search).await {
            tracing::warn!(
                event_name = "agent.partners.log_failed",
                project_id = %project.id,
                error = %error,
                "partner search not logged"
            );
        }

        project.partner_search_results = serde_json::to_value(matches).ok();
        project.touch();
        let project_id = project.id.clone();
        if let Err(error) = self.deps.repositories.projects.save(project).await {
            tracing::warn!(
                event_name = "agent.partners.save_failed",
                project_id = %project_id,
                error = %error,
                "partner results not saved on project"
            );
        }
    }
}

fn unavailable_catalog(reason: &str, criteria: &PartnerCriteria) -> ToolOutcome<PartnerMatches> {
    tracing::warn!(event_name = "agent.partners.catalog_unavailable", error = reason, "partner catalog unavailable");
    let outcome = ToolOutcome::failure(
        ErrorCode::ApiFailure,
        format!("partner catalog unavailable: {reason}"),
    );
    match serde_json::to_value(rank_partners(&SeedDataset::partners(), criteria)) {
        Ok(fallback) => outcome.with_fallback(fallback),
        Err(_) => outcome,
    }
}

#[async_trait]
impl Tool for PartnerSearchTool {
    fn name(&self) -> &'static str {
        PARTNER_TOOL
    }

    fn description(&self) -> &'static str {
        "Find European partner organisations by focus, country and expertise"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "project_focus": { "type": "string", "description": "Theme of the project" },
                "required_countries": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Only partners based in these countries"
                },
                "expertise_areas": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Expertise a partner must offer; empty for any"
                },
                "max_results": { "type": "integer", "minimum": 1, "maximum": 50 }
            },
            "required": ["project_focus", "expertise_areas"]
        })
    }

    async fn execute(&self, context: &ToolContext, input: Value) -> Value {
        match decode_input::<PartnerSearchRequest>(input) {
            Ok(request) => encode_outcome(&self.run(context, request).await),
            Err(error) => encode_outcome(&failed::<PartnerMatches>(&error)),
        }
    }
}
