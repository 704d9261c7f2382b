use chrono::{DateTime, Utc};
use sqlx::Row;

use horizon_core::domain::activity::UserSession;
use horizon_core::domain::project::ProjectId;

use super::{decode_err, format_timestamp, parse_timestamp, RepositoryError, SessionRepository};
use crate::DbPool;

pub struct SqlSessionRepository {
    pool: DbPool,
}

impl SqlSessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> Result<UserSession, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let user_id: String = row.try_get("user_id").map_err(decode_err)?;
    let project_id: Option<String> = row.try_get("project_id").map_err(decode_err)?;
    let agent_type: String = row.try_get("agent_type").map_err(decode_err)?;
    let last_active_at: String = row.try_get("last_active_at").map_err(decode_err)?;

    Ok(UserSession {
        id,
        user_id,
        project_id: project_id.map(ProjectId),
        agent_type,
        last_active_at: parse_timestamp(&last_active_at)?,
    })
}

#[async_trait::async_trait]
impl SessionRepository for SqlSessionRepository {
    async fn touch(&self, session: UserSession) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO user_sessions (id, user_id, project_id, agent_type, last_active_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 project_id = COALESCE(excluded.project_id, user_sessions.project_id),
                 agent_type = excluded.agent_type,
                 last_active_at = excluded.last_active_at
             WHERE user_sessions.user_id = excluded.user_id",
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(session.project_id.as_ref().map(|id| id.0.as_str()))
        .bind(&session.agent_type)
        .bind(format_timestamp(session.last_active_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserSession>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, user_id, project_id, agent_type, last_active_at
             FROM user_sessions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_session).transpose()
    }

    async fn delete_idle_since(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM user_sessions WHERE last_active_at < ?")
            .bind(format_timestamp(cutoff))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use horizon_core::domain::activity::UserSession;

    use super::SqlSessionRepository;
    use crate::repositories::SessionRepository;
    use crate::{connect_with_settings, migrations};

    fn session(id: &str, agent_type: &str, idle_days: i64) -> UserSession {
        UserSession {
            id: id.to_string(),
            user_id: "user-1".to_string(),
            project_id: None,
            agent_type: agent_type.to_string(),
            last_active_at: Utc::now() - Duration::days(idle_days),
        }
    }

    #[tokio::test]
    async fn touch_refreshes_agent_and_activity() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repo = SqlSessionRepository::new(pool);

        repo.touch(session("s-1", "brainstorming", 10)).await.expect("first touch");
        repo.touch(session("s-1", "application", 0)).await.expect("second touch");

        let found = repo.find_by_id("s-1").await.expect("find").expect("session present");
        assert_eq!(found.agent_type, "application");
        assert!(Utc::now() - found.last_active_at < Duration::days(1));
    }

    #[tokio::test]
    async fn idle_sessions_are_pruned() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repo = SqlSessionRepository::new(pool);

        repo.touch(session("active", "planning", 5)).await.expect("touch");
        repo.touch(session("idle", "planning", 120)).await.expect("touch");

        let removed =
            repo.delete_idle_since(Utc::now() - Duration::days(90)).await.expect("prune");
        assert_eq!(removed, 1);
        assert!(repo.find_by_id("idle").await.expect("find").is_none());
        assert!(repo.find_by_id("active").await.expect("find").is_some());
    }
}
