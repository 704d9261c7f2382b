pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;
pub mod retention;

pub use connection::{connect, connect_with_settings, DbPool};
pub use fixtures::{SeedDataset, SeedResult, VerificationResult};
pub use repositories::{Repositories, RepositoryError};
pub use retention::{prune_expired, PruneReport};
