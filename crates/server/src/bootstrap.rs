use horizon_agent::{AgentRuntime, RuntimeError};
use horizon_core::config::{AppConfig, ConfigError, LoadOptions};
use horizon_db::{connect_with_settings, migrations, DbPool, Repositories};
use thiserror::Error;
use tracing::info;

use crate::auth::{AuthError, JwtKeys};
use crate::state::AppState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub runtime: AgentRuntime,
    pub jwt: JwtKeys,
}

impl Application {
    pub fn into_state(self) -> (AppConfig, AppState) {
        let state = AppState::new(self.runtime, self.jwt, self.db_pool);
        (self.config, state)
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("assistant runtime could not start: {0}")]
    Runtime(#[from] RuntimeError),
    #[error("auth setup failed: {0}")]
    Auth(#[from] AuthError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    info!(event_name = "server.bootstrap.start", "starting application bootstrap");
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "server.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "server.bootstrap.migrations_applied", "database migrations applied");

    let runtime = AgentRuntime::from_config(&config.llm, Repositories::sql(db_pool.clone()))?;
    let jwt = JwtKeys::from_config(&config.auth)?;

    Ok(Application { config, db_pool, runtime, jwt })
}

#[cfg(test)]
mod tests {
    use horizon_core::config::{ConfigOverrides, LlmProvider, LoadOptions};

    use crate::bootstrap::{bootstrap, BootstrapError};

    fn options(jwt_secret: Option<&str>) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                llm_provider: Some(LlmProvider::Ollama),
                llm_base_url: Some("http://localhost:11434/v1".to_string()),
                jwt_secret: jwt_secret.map(str::to_string),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_a_jwt_secret() {
        let result = bootstrap(options(None)).await;

        let error = result.err().expect("bootstrap should fail");
        assert!(matches!(error, BootstrapError::Config(_)));
        assert!(error.to_string().contains("auth.jwt_secret"));
    }

    #[tokio::test]
    async fn bootstrap_applies_migrations_and_builds_the_runtime() {
        let app = bootstrap(options(Some("integration-secret")))
            .await
            .expect("bootstrap should succeed with valid overrides");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('projects', 'partners', 'application_sections')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("schema query");
        assert_eq!(table_count, 3);
        assert_eq!(app.runtime.model(), app.config.llm.model);
        assert_eq!(app.runtime.tools().len(), 3);

        let token = app.jwt.issue("user-1").expect("issue");
        assert_eq!(app.jwt.validate(&token).expect("validate").sub, "user-1");

        app.db_pool.close().await;
    }
}
