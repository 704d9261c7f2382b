use chrono::Utc;
use horizon_core::retention::RetentionPolicy;
use horizon_db::{prune_expired, PruneReport, Repositories};

use crate::commands::{block_on, finish, load_config, open_database, CommandResult};

/// Deletes partner searches and sessions older than the configured retention.
pub fn run() -> CommandResult {
    let config = match load_config("prune") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let policy = RetentionPolicy::from(&config.retention);

    let result = block_on("prune", async {
        let pool = open_database(&config).await?;
        let report = prune_expired(&Repositories::sql(pool.clone()), policy, Utc::now())
            .await
            .map_err(|error| ("prune_execution", error.to_string(), 5u8));
        pool.close().await;
        report
    });

    finish("prune", result, |report: PruneReport| {
        format!(
            "pruned {} partner searches older than {} days and {} sessions idle for {} days",
            report.partner_searches_deleted,
            policy.partner_search_days,
            report.sessions_deleted,
            policy.session_days
        )
    })
}
