use std::collections::BTreeSet;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::Row;

use horizon_core::domain::project::{FocusArea, Project, ProjectId, ProjectStatus};

use super::{
    decode_err, decode_json, encode_json, format_timestamp, parse_timestamp, ProjectRepository,
    RepositoryError,
};
use crate::DbPool;

const PROJECT_COLUMNS: &str = "id, user_id, title, focus_area, target_audience, innovation_angle,
     status, duration_months, budget_estimate_eur, countries_involved,
     brainstorm_results, partner_search_results, created_at, updated_at";

pub struct SqlProjectRepository {
    pool: DbPool,
}

impl SqlProjectRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_project(row: &sqlx::sqlite::SqliteRow) -> Result<Project, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let user_id: String = row.try_get("user_id").map_err(decode_err)?;
    let title: String = row.try_get("title").map_err(decode_err)?;
    let focus_area: Option<String> = row.try_get("focus_area").map_err(decode_err)?;
    let target_audience: Option<String> = row.try_get("target_audience").map_err(decode_err)?;
    let innovation_angle: Option<String> =
        row.try_get("innovation_angle").map_err(decode_err)?;
    let status: String = row.try_get("status").map_err(decode_err)?;
    let duration_months: Option<i64> = row.try_get("duration_months").map_err(decode_err)?;
    let budget: Option<String> = row.try_get("budget_estimate_eur").map_err(decode_err)?;
    let countries: String = row.try_get("countries_involved").map_err(decode_err)?;
    let brainstorm_results: Option<String> =
        row.try_get("brainstorm_results").map_err(decode_err)?;
    let partner_search_results: Option<String> =
        row.try_get("partner_search_results").map_err(decode_err)?;
    let created_at: String = row.try_get("created_at").map_err(decode_err)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode_err)?;

    let focus_area = focus_area
        .map(|label| {
            FocusArea::from_label(&label)
                .ok_or_else(|| RepositoryError::Decode(format!("unknown focus area `{label}`")))
        })
        .transpose()?;
    let duration_months = duration_months
        .map(|months| {
            u8::try_from(months)
                .map_err(|_| RepositoryError::Decode(format!("duration out of range: {months}")))
        })
        .transpose()?;
    let budget_estimate_eur = budget
        .map(|raw| Decimal::from_str(&raw).map_err(decode_err))
        .transpose()?;

    Ok(Project {
        id: ProjectId(id),
        user_id,
        title,
        focus_area,
        target_audience,
        innovation_angle,
        status: ProjectStatus::from_str(&status).map_err(decode_err)?,
        duration_months,
        budget_estimate_eur,
        countries_involved: decode_json::<BTreeSet<String>>("countries_involved", &countries)?,
        brainstorm_results: brainstorm_results
            .map(|raw| decode_json::<Value>("brainstorm_results", &raw))
            .transpose()?,
        partner_search_results: partner_search_results
            .map(|raw| decode_json::<Value>("partner_search_results", &raw))
            .transpose()?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

#[async_trait::async_trait]
impl ProjectRepository for SqlProjectRepository {
    async fn find_for_user(
        &self,
        id: &ProjectId,
        user_id: &str,
    ) -> Result<Option<Project>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ? AND user_id = ?"
        ))
        .bind(&id.0)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_project).transpose()
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Project>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE user_id = ?
             ORDER BY updated_at DESC, id ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_project).collect()
    }

    async fn save(&self, project: Project) -> Result<(), RepositoryError> {
        let countries = encode_json("countries_involved", &project.countries_involved)?;
        let brainstorm_results = project
            .brainstorm_results
            .as_ref()
            .map(|value| encode_json("brainstorm_results", value))
            .transpose()?;
        let partner_search_results = project
            .partner_search_results
            .as_ref()
            .map(|value| encode_json("partner_search_results", value))
            .transpose()?;

        // The owner is fixed at insert time; an update never moves a project
        // between users.
        sqlx::query(
            "INSERT INTO projects (id, user_id, title, focus_area, target_audience,
                                   innovation_angle, status, duration_months,
                                   budget_estimate_eur, countries_involved, brainstorm_results,
                                   partner_search_results, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title,
                 focus_area = excluded.focus_area,
                 target_audience = excluded.target_audience,
                 innovation_angle = excluded.innovation_angle,
                 status = excluded.status,
                 duration_months = excluded.duration_months,
                 budget_estimate_eur = excluded.budget_estimate_eur,
                 countries_involved = excluded.countries_involved,
                 brainstorm_results = excluded.brainstorm_results,
                 partner_search_results = excluded.partner_search_results,
                 updated_at = excluded.updated_at
             WHERE projects.user_id = excluded.user_id",
        )
        .bind(&project.id.0)
        .bind(&project.user_id)
        .bind(&project.title)
        .bind(project.focus_area.map(|area| area.label()))
        .bind(&project.target_audience)
        .bind(&project.innovation_angle)
        .bind(project.status.as_str())
        .bind(project.duration_months.map(i64::from))
        .bind(project.budget_estimate_eur.map(|budget| budget.to_string()))
        .bind(countries)
        .bind(brainstorm_results)
        .bind(partner_search_results)
        .bind(format_timestamp(project.created_at))
        .bind(format_timestamp(project.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use horizon_core::domain::project::{FocusArea, Project, ProjectStatus};

    use super::SqlProjectRepository;
    use crate::repositories::ProjectRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> SqlProjectRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlProjectRepository::new(pool)
    }

    fn sample_project(user_id: &str) -> Project {
        let mut project = Project::new(user_id, "Digital Bridges");
        project.focus_area = Some(FocusArea::DigitalTransformation);
        project.target_audience = Some("Young refugees aged 16-25".to_string());
        project.innovation_angle = Some("Peer-led coding circles".to_string());
        project.status = ProjectStatus::Partnering;
        project.duration_months = Some(24);
        project.budget_estimate_eur = Some(Decimal::new(25_000_050, 2));
        project.countries_involved =
            ["Sweden".to_string(), "Germany".to_string()].into_iter().collect();
        project.brainstorm_results = Some(json!([{ "title": "Digital Bridges" }]));
        project
    }

    #[tokio::test]
    async fn project_round_trip_preserves_every_field() {
        let repo = setup().await;
        let project = sample_project("user-1");

        repo.save(project.clone()).await.expect("save");
        let found = repo.find_for_user(&project.id, "user-1").await.expect("find");

        let found = found.expect("project present");
        assert_eq!(found.id, project.id);
        assert_eq!(found.focus_area, project.focus_area);
        assert_eq!(found.status, project.status);
        assert_eq!(found.duration_months, project.duration_months);
        assert_eq!(found.budget_estimate_eur, project.budget_estimate_eur);
        assert_eq!(found.countries_involved, project.countries_involved);
        assert_eq!(found.brainstorm_results, project.brainstorm_results);
        assert_eq!(found.partner_search_results, None);
        assert_eq!(found.created_at.timestamp_micros(), project.created_at.timestamp_micros());
    }

    #[tokio::test]
    async fn projects_are_invisible_to_other_users() {
        let repo = setup().await;
        let project = sample_project("owner");
        repo.save(project.clone()).await.expect("save");

        assert!(repo.find_for_user(&project.id, "intruder").await.expect("find").is_none());
        assert!(repo.list_for_user("intruder").await.expect("list").is_empty());
        assert_eq!(repo.list_for_user("owner").await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn save_from_another_user_does_not_take_over_project() {
        let repo = setup().await;
        let project = sample_project("owner");
        repo.save(project.clone()).await.expect("save");

        let mut hijack = project.clone();
        hijack.user_id = "intruder".to_string();
        hijack.title = "Hijacked".to_string();
        repo.save(hijack).await.expect("conflicting save is a no-op");

        let found = repo.find_for_user(&project.id, "owner").await.expect("find");
        assert_eq!(found.map(|project| project.title), Some("Digital Bridges".to_string()));
    }
}
