use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use horizon_core::domain::activity::{PartnerSearch, UserSession};
use horizon_core::domain::application::ApplicationSection;
use horizon_core::domain::knowledge::KnowledgeEntry;
use horizon_core::domain::partner::Partner;
use horizon_core::domain::project::{Project, ProjectId};

use super::{
    KnowledgeRepository, PartnerRepository, PartnerSearchRepository, ProjectRepository,
    RepositoryError, SectionRepository, SessionRepository,
};

#[derive(Default)]
pub struct InMemoryProjectRepository {
    projects: RwLock<HashMap<String, Project>>,
}

#[async_trait::async_trait]
impl ProjectRepository for InMemoryProjectRepository {
    async fn find_for_user(
        &self,
        id: &ProjectId,
        user_id: &str,
    ) -> Result<Option<Project>, RepositoryError> {
        let projects = self.projects.read().await;
        Ok(projects.get(&id.0).filter(|project| project.user_id == user_id).cloned())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Project>, RepositoryError> {
        let projects = self.projects.read().await;
        let mut owned: Vec<Project> =
            projects.values().filter(|project| project.user_id == user_id).cloned().collect();
        owned.sort_by(|left, right| {
            right.updated_at.cmp(&left.updated_at).then_with(|| left.id.cmp(&right.id))
        });
        Ok(owned)
    }

    async fn save(&self, project: Project) -> Result<(), RepositoryError> {
        let mut projects = self.projects.write().await;
        if let Some(existing) = projects.get(&project.id.0) {
            if existing.user_id != project.user_id {
                return Ok(());
            }
        }
        projects.insert(project.id.0.clone(), project);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryPartnerRepository {
    partners: RwLock<HashMap<String, Partner>>,
}

#[async_trait::async_trait]
impl PartnerRepository for InMemoryPartnerRepository {
    async fn list_all(&self) -> Result<Vec<Partner>, RepositoryError> {
        let partners = self.partners.read().await;
        let mut all: Vec<Partner> = partners.values().cloned().collect();
        all.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(all)
    }

    async fn save(&self, partner: Partner) -> Result<(), RepositoryError> {
        let mut partners = self.partners.write().await;
        partners.insert(partner.id.0.clone(), partner);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySectionRepository {
    sections: RwLock<Vec<ApplicationSection>>,
}

#[async_trait::async_trait]
impl SectionRepository for InMemorySectionRepository {
    async fn append_version(
        &self,
        section: ApplicationSection,
    ) -> Result<ApplicationSection, RepositoryError> {
        let mut sections = self.sections.write().await;
        let version = sections
            .iter()
            .filter(|stored| {
                stored.project_id == section.project_id
                    && stored.section_name == section.section_name
            })
            .map(|stored| stored.version)
            .max()
            .unwrap_or(0)
            + 1;

        let stored = ApplicationSection { version, ..section };
        sections.push(stored.clone());
        Ok(stored)
    }

    async fn list_for_project(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<ApplicationSection>, RepositoryError> {
        let sections = self.sections.read().await;
        let mut found: Vec<ApplicationSection> =
            sections.iter().filter(|section| &section.project_id == project_id).cloned().collect();
        found.sort_by(|left, right| {
            left.section_name.cmp(&right.section_name).then_with(|| left.version.cmp(&right.version))
        });
        Ok(found)
    }
}

#[derive(Default)]
pub struct InMemoryPartnerSearchRepository {
    searches: RwLock<Vec<PartnerSearch>>,
}

#[async_trait::async_trait]
impl PartnerSearchRepository for InMemoryPartnerSearchRepository {
    async fn record(&self, search: PartnerSearch) -> Result<(), RepositoryError> {
        self.searches.write().await.push(search);
        Ok(())
    }

    async fn list_for_project(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<PartnerSearch>, RepositoryError> {
        let searches = self.searches.read().await;
        let mut found: Vec<PartnerSearch> =
            searches.iter().filter(|search| &search.project_id == project_id).cloned().collect();
        found.sort_by(|left, right| right.searched_at.cmp(&left.searched_at));
        Ok(found)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut searches = self.searches.write().await;
        let before = searches.len();
        searches.retain(|search| search.searched_at >= cutoff);
        Ok((before - searches.len()) as u64)
    }
}

#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<String, UserSession>>,
}

#[async_trait::async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn touch(&self, session: UserSession) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&session.id) {
            Some(existing) if existing.user_id != session.user_id => {}
            Some(existing) => {
                if session.project_id.is_some() {
                    existing.project_id = session.project_id;
                }
                existing.agent_type = session.agent_type;
                existing.last_active_at = session.last_active_at;
            }
            None => {
                sessions.insert(session.id.clone(), session);
            }
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserSession>, RepositoryError> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn delete_idle_since(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.last_active_at >= cutoff);
        Ok((before - sessions.len()) as u64)
    }
}

#[derive(Default)]
pub struct InMemoryKnowledgeRepository {
    entries: RwLock<HashMap<String, KnowledgeEntry>>,
}

#[async_trait::async_trait]
impl KnowledgeRepository for InMemoryKnowledgeRepository {
    async fn list_all(&self) -> Result<Vec<KnowledgeEntry>, RepositoryError> {
        let entries = self.entries.read().await;
        let mut all: Vec<KnowledgeEntry> = entries.values().cloned().collect();
        all.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(all)
    }

    async fn save(&self, entry: KnowledgeEntry) -> Result<(), RepositoryError> {
        self.entries.write().await.insert(entry.id.clone(), entry);
        Ok(())
    }
}
