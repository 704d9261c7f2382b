use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use horizon_core::domain::activity::{PartnerSearch, UserSession};
use horizon_core::domain::application::ApplicationSection;
use horizon_core::domain::knowledge::{KnowledgeEntry, KnowledgeMatch};
use horizon_core::domain::partner::Partner;
use horizon_core::domain::project::{Project, ProjectId};
use horizon_core::errors::ApplicationError;
use horizon_core::similarity::match_knowledge;

use crate::DbPool;

pub mod knowledge;
pub mod memory;
pub mod partner;
pub mod project;
pub mod section;
pub mod session;

pub use knowledge::SqlKnowledgeRepository;
pub use memory::{
    InMemoryKnowledgeRepository, InMemoryPartnerRepository, InMemoryPartnerSearchRepository,
    InMemoryProjectRepository, InMemorySectionRepository, InMemorySessionRepository,
};
pub use partner::{SqlPartnerRepository, SqlPartnerSearchRepository};
pub use project::SqlProjectRepository;
pub use section::SqlSectionRepository;
pub use session::SqlSessionRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        Self::Persistence(error.to_string())
    }
}

/// Projects are always addressed together with their owner. A project owned by
/// someone else is indistinguishable from a missing one.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn find_for_user(
        &self,
        id: &ProjectId,
        user_id: &str,
    ) -> Result<Option<Project>, RepositoryError>;
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Project>, RepositoryError>;
    async fn save(&self, project: Project) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait PartnerRepository: Send + Sync {
    async fn list_all(&self) -> Result<Vec<Partner>, RepositoryError>;
    async fn save(&self, partner: Partner) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait SectionRepository: Send + Sync {
    /// Stores `section` with the next free version for its project and
    /// section name, ignoring the version it carries. Returns the stored row.
    async fn append_version(
        &self,
        section: ApplicationSection,
    ) -> Result<ApplicationSection, RepositoryError>;
    async fn list_for_project(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<ApplicationSection>, RepositoryError>;
}

#[async_trait]
pub trait PartnerSearchRepository: Send + Sync {
    async fn record(&self, search: PartnerSearch) -> Result<(), RepositoryError>;
    async fn list_for_project(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<PartnerSearch>, RepositoryError>;
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn touch(&self, session: UserSession) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<UserSession>, RepositoryError>;
    async fn delete_idle_since(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait KnowledgeRepository: Send + Sync {
    async fn list_all(&self) -> Result<Vec<KnowledgeEntry>, RepositoryError>;
    async fn save(&self, entry: KnowledgeEntry) -> Result<(), RepositoryError>;

    async fn search(
        &self,
        embedding: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<KnowledgeMatch>, RepositoryError> {
        let entries = self.list_all().await?;
        Ok(match_knowledge(&entries, embedding, threshold, limit))
    }
}

/// Every store the tools and routes touch, behind trait objects so the SQL
/// and in-memory backends are interchangeable.
#[derive(Clone)]
pub struct Repositories {
    pub projects: Arc<dyn ProjectRepository>,
    pub partners: Arc<dyn PartnerRepository>,
    pub sections: Arc<dyn SectionRepository>,
    pub partner_searches: Arc<dyn PartnerSearchRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub knowledge: Arc<dyn KnowledgeRepository>,
}

impl Repositories {
    pub fn sql(pool: DbPool) -> Self {
        Self {
            projects: Arc::new(SqlProjectRepository::new(pool.clone())),
            partners: Arc::new(SqlPartnerRepository::new(pool.clone())),
            sections: Arc::new(SqlSectionRepository::new(pool.clone())),
            partner_searches: Arc::new(SqlPartnerSearchRepository::new(pool.clone())),
            sessions: Arc::new(SqlSessionRepository::new(pool.clone())),
            knowledge: Arc::new(SqlKnowledgeRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            projects: Arc::new(InMemoryProjectRepository::default()),
            partners: Arc::new(InMemoryPartnerRepository::default()),
            sections: Arc::new(InMemorySectionRepository::default()),
            partner_searches: Arc::new(InMemoryPartnerSearchRepository::default()),
            sessions: Arc::new(InMemorySessionRepository::default()),
            knowledge: Arc::new(InMemoryKnowledgeRepository::default()),
        }
    }
}

pub(crate) fn decode_err(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("invalid timestamp `{value}`: {error}")))
}

pub(crate) fn decode_json<T: serde::de::DeserializeOwned>(
    column: &str,
    raw: &str,
) -> Result<T, RepositoryError> {
    serde_json::from_str(raw)
        .map_err(|error| RepositoryError::Decode(format!("invalid json in `{column}`: {error}")))
}

pub(crate) fn encode_json<T: serde::Serialize>(
    column: &str,
    value: &T,
) -> Result<String, RepositoryError> {
    serde_json::to_string(value)
        .map_err(|error| RepositoryError::Decode(format!("cannot encode `{column}`: {error}")))
}

/// Fixed-width UTC timestamps so range predicates can compare the text column.
pub(crate) fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}
