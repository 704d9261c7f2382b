use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::Row;

use horizon_core::domain::activity::PartnerSearch;
use horizon_core::domain::partner::{
    clamp_compatibility, ContactInfo, OrganizationType, Partner, PartnerId,
};
use horizon_core::domain::project::ProjectId;

use super::{
    decode_err, decode_json, encode_json, format_timestamp, parse_timestamp, PartnerRepository,
    PartnerSearchRepository, RepositoryError,
};
use crate::DbPool;

pub struct SqlPartnerRepository {
    pool: DbPool,
}

impl SqlPartnerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_partner(row: &sqlx::sqlite::SqliteRow) -> Result<Partner, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let name: String = row.try_get("name").map_err(decode_err)?;
    let country: String = row.try_get("country").map_err(decode_err)?;
    let organization_type: String = row.try_get("organization_type").map_err(decode_err)?;
    let expertise_areas: String = row.try_get("expertise_areas").map_err(decode_err)?;
    let contact_info: String = row.try_get("contact_info").map_err(decode_err)?;
    let erasmus_code: String = row.try_get("erasmus_code").map_err(decode_err)?;
    let compatibility_score: i64 = row.try_get("compatibility_score").map_err(decode_err)?;
    let partnership_rationale: Option<String> =
        row.try_get("partnership_rationale").map_err(decode_err)?;

    Ok(Partner {
        id: PartnerId(id),
        name,
        country,
        organization_type: OrganizationType::from_str(&organization_type).map_err(decode_err)?,
        expertise_areas: decode_json("expertise_areas", &expertise_areas)?,
        contact_info: decode_json::<ContactInfo>("contact_info", &contact_info)?,
        erasmus_code,
        compatibility_score: clamp_compatibility(compatibility_score),
        partnership_rationale,
    })
}

#[async_trait::async_trait]
impl PartnerRepository for SqlPartnerRepository {
    async fn list_all(&self) -> Result<Vec<Partner>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, country, organization_type, expertise_areas, contact_info,
                    erasmus_code, compatibility_score, partnership_rationale
             FROM partners ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_partner).collect()
    }

    async fn save(&self, partner: Partner) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO partners (id, name, country, organization_type, expertise_areas,
                                   contact_info, erasmus_code, compatibility_score,
                                   partnership_rationale)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 country = excluded.country,
                 organization_type = excluded.organization_type,
                 expertise_areas = excluded.expertise_areas,
                 contact_info = excluded.contact_info,
                 erasmus_code = excluded.erasmus_code,
                 compatibility_score = excluded.compatibility_score,
                 partnership_rationale = excluded.partnership_rationale",
        )
        .bind(&partner.id.0)
        .bind(&partner.name)
        .bind(&partner.country)
        .bind(partner.organization_type.as_str())
        .bind(encode_json("expertise_areas", &partner.expertise_areas)?)
        .bind(encode_json("contact_info", &partner.contact_info)?)
        .bind(&partner.erasmus_code)
        .bind(i64::from(partner.compatibility_score))
        .bind(&partner.partnership_rationale)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

pub struct SqlPartnerSearchRepository {
    pool: DbPool,
}

impl SqlPartnerSearchRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_search(row: &sqlx::sqlite::SqliteRow) -> Result<PartnerSearch, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let project_id: String = row.try_get("project_id").map_err(decode_err)?;
    let search_query: String = row.try_get("search_query").map_err(decode_err)?;
    let partners_found: String = row.try_get("partners_found").map_err(decode_err)?;
    let searched_at: String = row.try_get("searched_at").map_err(decode_err)?;

    Ok(PartnerSearch {
        id,
        project_id: ProjectId(project_id),
        search_query,
        partners_found: decode_json::<Value>("partners_found", &partners_found)?,
        searched_at: parse_timestamp(&searched_at)?,
    })
}

#[async_trait::async_trait]
impl PartnerSearchRepository for SqlPartnerSearchRepository {
    async fn record(&self, search: PartnerSearch) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO partner_searches (id, project_id, search_query, partners_found, searched_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&search.id)
        .bind(&search.project_id.0)
        .bind(&search.search_query)
        .bind(encode_json("partners_found", &search.partners_found)?)
        .bind(format_timestamp(search.searched_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_project(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<PartnerSearch>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, project_id, search_query, partners_found, searched_at
             FROM partner_searches WHERE project_id = ? ORDER BY searched_at DESC",
        )
        .bind(&project_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_search).collect()
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        // RFC 3339 strings in UTC sort lexicographically.
        let result = sqlx::query("DELETE FROM partner_searches WHERE searched_at < ?")
            .bind(format_timestamp(cutoff))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
