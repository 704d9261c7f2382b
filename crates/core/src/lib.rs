pub mod compliance;
pub mod config;
pub mod domain;
pub mod errors;
pub mod matching;
pub mod outcome;
pub mod requests;
pub mod retention;
pub mod similarity;

pub use compliance::ComplianceReport;
pub use domain::application::{
    AlternativeVersion, ApplicationSection, ComplianceDetails, GeneratedContent, SectionId,
};
pub use domain::concept::ProjectConcept;
pub use domain::partner::{ContactInfo, OrganizationType, Partner, PartnerId};
pub use domain::project::{FocusArea, Project, ProjectId, ProjectStatus};
pub use errors::{ApplicationError, DomainError, ErrorCode, FieldError};
pub use matching::{PartnerCriteria, PartnerMatches, SearchMetadata};
pub use outcome::ToolOutcome;
pub use requests::PromptMode;
pub use retention::{RetentionCutoffs, RetentionPolicy};
