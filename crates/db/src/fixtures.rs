use std::collections::HashSet;

use chrono::Utc;

use horizon_core::domain::knowledge::KnowledgeEntry;
use horizon_core::domain::partner::{ContactInfo, OrganizationType, Partner, PartnerId};

use crate::repositories::{Repositories, RepositoryError};

/// Sample partner organisations. Stable ids and Erasmus codes make seeding
/// idempotent.
const SEED_PARTNERS: &[PartnerSeed] = &[
    PartnerSeed {
        id: "partner-de-youth-001",
        name: "Digital Youth Foundation",
        country: "Germany",
        organization_type: OrganizationType::Ngo,
        expertise_areas: &["Digital Skills", "Youth Work", "Innovation"],
        email: "contact@digitalyouth.de",
        website: "https://digitalyouth.de",
        erasmus_code: "DE-YOUTH-001",
        compatibility_score: 9,
        rationale: "Strong digital expertise and proven track record in youth projects",
    },
    PartnerSeed {
        id: "partner-nl-green-002",
        name: "Green Action Network",
        country: "Netherlands",
        organization_type: OrganizationType::Ngo,
        expertise_areas: &["Environmental Education", "Sustainability", "Community Engagement"],
        email: "info@greenaction.nl",
        website: "https://greenaction.nl",
        erasmus_code: "NL-GREEN-002",
        compatibility_score: 8,
        rationale: "Excellent environmental programs and community outreach",
    },
    PartnerSeed {
        id: "partner-es-incl-003",
        name: "Inclusion Works",
        country: "Spain",
        organization_type: OrganizationType::PublicBody,
        expertise_areas: &["Social Inclusion", "Diversity Training", "Youth Support"],
        email: "hello@inclusionworks.es",
        website: "https://inclusionworks.es",
        erasmus_code: "ES-INCL-003",
        compatibility_score: 7,
        rationale: "Specialized in inclusion programs with strong local networks",
    },
    PartnerSeed {
        id: "partner-fi-innov-004",
        name: "Innovation Academy",
        country: "Finland",
        organization_type: OrganizationType::HigherEducationInstitution,
        expertise_areas: &["Innovation", "Entrepreneurship", "Technology"],
        email: "partnerships@innovacademy.fi",
        website: "https://innovacademy.fi",
        erasmus_code: "FI-INNOV-004",
        compatibility_score: 8,
        rationale: "Leading innovation methodologies and research capabilities",
    },
    PartnerSeed {
        id: "partner-de-jugend-005",
        name: "Jugendwerk Rhein",
        country: "Germany",
        organization_type: OrganizationType::Ngo,
        expertise_areas: &["Youth Work", "Non-formal Education", "Participation"],
        email: "kontakt@jugendwerk-rhein.de",
        website: "https://jugendwerk-rhein.de",
        erasmus_code: "DE-JUGEND-005",
        compatibility_score: 7,
        rationale: "Runs regional youth councils and hosts exchanges every summer",
    },
    PartnerSeed {
        id: "partner-es-escuela-006",
        name: "Escuela Abierta Valencia",
        country: "Spain",
        organization_type: OrganizationType::School,
        expertise_areas: &["Youth Work", "Digital Skills", "Teacher Training"],
        email: "erasmus@escuelaabierta.es",
        website: "https://escuelaabierta.es",
        erasmus_code: "ES-ESC-006",
        compatibility_score: 6,
        rationale: "Experienced school partner with a dedicated Erasmus+ coordinator",
    },
    PartnerSeed {
        id: "partner-it-civic-007",
        name: "Civica Lab",
        country: "Italy",
        organization_type: OrganizationType::Company,
        expertise_areas: &["Civic Tech", "European Values", "Media Literacy"],
        email: "info@civicalab.it",
        website: "https://civicalab.it",
        erasmus_code: "IT-CIVIC-007",
        compatibility_score: 6,
        rationale: "Builds civic participation tools with youth organisations",
    },
    PartnerSeed {
        id: "partner-pl-bridge-008",
        name: "Bridge Builders Krakow",
        country: "Poland",
        organization_type: OrganizationType::Ngo,
        expertise_areas: &["Social Inclusion", "Refugee Support", "Youth Work"],
        email: "team@bridgebuilders.pl",
        website: "https://bridgebuilders.pl",
        erasmus_code: "PL-BRIDGE-008",
        compatibility_score: 8,
        rationale: "Works directly with newly arrived young people and families",
    },
];

/// Knowledge base samples with small hand-assigned embeddings. Real
/// embeddings are produced outside this system.
const SEED_KNOWLEDGE: &[KnowledgeSeed] = &[
    KnowledgeSeed {
        id: "kb-guide-ka2",
        source_type: "programme_guide",
        title: "Cooperation partnerships in youth (KA220-YOU)",
        content: "Cooperation partnerships let organisations develop and share innovative practices \
                  with partners from at least three programme countries.",
        url: "https://erasmus-plus.ec.europa.eu/programme-guide",
        embedding: &[0.9, 0.1, 0.2, 0.0],
    },
    KnowledgeSeed {
        id: "kb-calls-2026",
        source_type: "calls",
        title: "Youth call priorities",
        content: "Priority is given to inclusion and diversity, the digital transformation, \
                  environment and fight against climate change, and participation in democratic life.",
        url: "https://erasmus-plus.ec.europa.eu/calls",
        embedding: &[0.3, 0.9, 0.1, 0.1],
    },
    KnowledgeSeed {
        id: "kb-practice-blended",
        source_type: "best_practices",
        title: "Blended youth exchanges",
        content: "Combining a short physical mobility with virtual preparation and follow-up \
                  widens access for participants with fewer opportunities.",
        url: "https://erasmus-plus.ec.europa.eu/projects",
        embedding: &[0.1, 0.2, 0.9, 0.3],
    },
    KnowledgeSeed {
        id: "kb-project-digital",
        source_type: "project_database",
        title: "Digital storytelling for newcomers",
        content: "A two-year partnership in which young refugees produced podcasts with local \
                  youth workers in four countries.",
        url: "https://erasmus-plus.ec.europa.eu/projects/search",
        embedding: &[0.2, 0.4, 0.3, 0.9],
    },
];

#[derive(Debug, Clone, Copy)]
struct PartnerSeed {
    id: &'static str,
    name: &'static str,
    country: &'static str,
    organization_type: OrganizationType,
    expertise_areas: &'static [&'static str],
    email: &'static str,
    website: &'static str,
    erasmus_code: &'static str,
    compatibility_score: u8,
    rationale: &'static str,
}

impl PartnerSeed {
    fn to_partner(self) -> Partner {
        Partner {
            id: PartnerId(self.id.to_string()),
            name: self.name.to_string(),
            country: self.country.to_string(),
            organization_type: self.organization_type,
            expertise_areas: self.expertise_areas.iter().map(ToString::to_string).collect(),
            contact_info: ContactInfo {
                email: Some(self.email.to_string()),
                website: Some(self.website.to_string()),
                phone: None,
            },
            erasmus_code: self.erasmus_code.to_string(),
            compatibility_score: self.compatibility_score,
            partnership_rationale: Some(self.rationale.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct KnowledgeSeed {
    id: &'static str,
    source_type: &'static str,
    title: &'static str,
    content: &'static str,
    url: &'static str,
    embedding: &'static [f32],
}

impl KnowledgeSeed {
    fn to_entry(self) -> KnowledgeEntry {
        KnowledgeEntry {
            id: self.id.to_string(),
            source_type: self.source_type.to_string(),
            title: self.title.to_string(),
            content: self.content.to_string(),
            url: Some(self.url.to_string()),
            embedding: self.embedding.to_vec(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedResult {
    pub partners_seeded: usize,
    pub knowledge_seeded: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(String, bool)>,
}

/// Static reference data: the partner catalog and the knowledge base samples.
pub struct SeedDataset;

impl SeedDataset {
    pub fn partners() -> Vec<Partner> {
        SEED_PARTNERS.iter().map(|seed| seed.to_partner()).collect()
    }

    pub fn knowledge() -> Vec<KnowledgeEntry> {
        SEED_KNOWLEDGE.iter().map(|seed| seed.to_entry()).collect()
    }

    pub async fn load(repositories: &Repositories) -> Result<SeedResult, RepositoryError> {
        for partner in Self::partners() {
            repositories.partners.save(partner).await?;
        }
        for entry in Self::knowledge() {
            repositories.knowledge.save(entry).await?;
        }

        tracing::info!(
            event_name = "db.seed.loaded",
            partners = SEED_PARTNERS.len(),
            knowledge_entries = SEED_KNOWLEDGE.len(),
            "seed dataset loaded"
        );

        Ok(SeedResult {
            partners_seeded: SEED_PARTNERS.len(),
            knowledge_seeded: SEED_KNOWLEDGE.len(),
        })
    }

    pub async fn verify(repositories: &Repositories) -> Result<VerificationResult, RepositoryError> {
        let stored_codes: HashSet<String> = repositories
            .partners
            .list_all()
            .await?
            .into_iter()
            .map(|partner| partner.erasmus_code)
            .collect();
        let stored_entries: HashSet<String> =
            repositories.knowledge.list_all().await?.into_iter().map(|entry| entry.id).collect();

        let mut checks = Vec::with_capacity(SEED_PARTNERS.len() + SEED_KNOWLEDGE.len());
        for seed in SEED_PARTNERS {
            let present = stored_codes.contains(seed.erasmus_code);
            checks.push((format!("partner:{}", seed.erasmus_code), present));
        }
        for seed in SEED_KNOWLEDGE {
            checks.push((format!("knowledge:{}", seed.id), stored_entries.contains(seed.id)));
        }

        let all_present = checks.iter().all(|(_, present)| *present);
        Ok(VerificationResult { all_present, checks })
    }
}
