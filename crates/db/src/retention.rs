use chrono::{DateTime, Utc};
use serde::Serialize;

use horizon_core::retention::RetentionPolicy;

use crate::repositories::{Repositories, RepositoryError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    pub partner_searches_deleted: u64,
    pub sessions_deleted: u64,
}

/// Removes partner searches and user sessions that fall outside `policy`.
pub async fn prune_expired(
    repositories: &Repositories,
    policy: RetentionPolicy,
    now: DateTime<Utc>,
) -> Result<PruneReport, RepositoryError> {
    let cutoffs = policy.cutoffs(now);

    let partner_searches_deleted =
        repositories.partner_searches.delete_older_than(cutoffs.partner_searches_before).await?;
    let sessions_deleted =
        repositories.sessions.delete_idle_since(cutoffs.sessions_before).await?;

    tracing::info!(
        event_name = "db.retention.pruned",
        partner_searches_deleted,
        sessions_deleted,
        "retention prune complete"
    );

    Ok(PruneReport { partner_searches_deleted, sessions_deleted })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use serde_json::json;

    use horizon_core::domain::activity::{PartnerSearch, UserSession};
    use horizon_core::domain::project::ProjectId;
    use horizon_core::retention::RetentionPolicy;

    use super::prune_expired;
    use crate::repositories::Repositories;

    #[tokio::test]
    async fn prune_applies_both_windows() {
        let repositories = Repositories::in_memory();
        let now = Utc::now();

        for (id, age) in [("recent", 29), ("expired", 31)] {
            repositories
                .partner_searches
                .record(PartnerSearch {
                    id: id.to_string(),
                    project_id: ProjectId("p-1".to_string()),
                    search_query: "Youth Work".to_string(),
                    partners_found: json!([]),
                    searched_at: now - Duration::days(age),
                })
                .await
                .expect("record");
        }
        for (id, idle) in [("s-recent", 89), ("s-expired", 91)] {
            repositories
                .sessions
                .touch(UserSession {
                    id: id.to_string(),
                    user_id: "user-1".to_string(),
                    project_id: None,
                    agent_type: "brainstorming".to_string(),
                    last_active_at: now - Duration::days(idle),
                })
                .await
                .expect("touch");
        }

        let report =
            prune_expired(&repositories, RetentionPolicy::default(), now).await.expect("prune");
        assert_eq!(report.partner_searches_deleted, 1);
        assert_eq!(report.sessions_deleted, 1);

        let second =
            prune_expired(&repositories, RetentionPolicy::default(), now).await.expect("prune");
        assert_eq!(second.partner_searches_deleted + second.sessions_deleted, 0);
    }
}
