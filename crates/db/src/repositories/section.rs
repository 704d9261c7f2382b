use sqlx::Row;

use horizon_core::domain::application::{ApplicationSection, SectionId};
use horizon_core::domain::project::ProjectId;

use super::{
    decode_err, decode_json, encode_json, format_timestamp, parse_timestamp, RepositoryError,
    SectionRepository,
};
use crate::DbPool;

pub struct SqlSectionRepository {
    pool: DbPool,
}

impl SqlSectionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_section(row: &sqlx::sqlite::SqliteRow) -> Result<ApplicationSection, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let project_id: String = row.try_get("project_id").map_err(decode_err)?;
    let section_name: String = row.try_get("section_name").map_err(decode_err)?;
    let content: String = row.try_get("content").map_err(decode_err)?;
    let word_count: i64 = row.try_get("word_count").map_err(decode_err)?;
    let compliance_status: bool = row.try_get("compliance_status").map_err(decode_err)?;
    let suggestions: String = row.try_get("suggestions").map_err(decode_err)?;
    let version: i64 = row.try_get("version").map_err(decode_err)?;
    let created_at: String = row.try_get("created_at").map_err(decode_err)?;

    Ok(ApplicationSection {
        id: SectionId(id),
        project_id: ProjectId(project_id),
        section_name,
        content,
        word_count: usize::try_from(word_count).map_err(decode_err)?,
        compliance_status,
        suggestions: decode_json("suggestions", &suggestions)?,
        version: u32::try_from(version).map_err(decode_err)?,
        created_at: parse_timestamp(&created_at)?,
    })
}

#[async_trait::async_trait]
impl SectionRepository for SqlSectionRepository {
    async fn append_version(
        &self,
        section: ApplicationSection,
    ) -> Result<ApplicationSection, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(version) FROM application_sections
             WHERE project_id = ? AND section_name = ?",
        )
        .bind(&section.project_id.0)
        .bind(&section.section_name)
        .fetch_one(&mut *tx)
        .await?;
        let version = current.unwrap_or(0) + 1;

        sqlx::query(
            "INSERT INTO application_sections (id, project_id, section_name, content, word_count,
                                               compliance_status, suggestions, version, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&section.id.0)
        .bind(&section.project_id.0)
        .bind(&section.section_name)
        .bind(&section.content)
        .bind(i64::try_from(section.word_count).map_err(decode_err)?)
        .bind(section.compliance_status)
        .bind(encode_json("suggestions", &section.suggestions)?)
        .bind(version)
        .bind(format_timestamp(section.created_at))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ApplicationSection {
            version: u32::try_from(version).map_err(decode_err)?,
            ..section
        })
    }

    async fn list_for_project(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<ApplicationSection>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, project_id, section_name, content, word_count, compliance_status,
                    suggestions, version, created_at
             FROM application_sections WHERE project_id = ?
             ORDER BY section_name ASC, version ASC",
        )
        .bind(&project_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_section).collect()
    }
}
