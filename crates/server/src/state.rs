use std::sync::Arc;

use horizon_agent::AgentRuntime;
use horizon_db::{DbPool, Repositories};

use crate::auth::JwtKeys;

/// Shared by every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<AgentRuntime>,
    pub jwt: Arc<JwtKeys>,
    pub db_pool: DbPool,
}

impl AppState {
    pub fn new(runtime: AgentRuntime, jwt: JwtKeys, db_pool: DbPool) -> Self {
        Self { runtime: Arc::new(runtime), jwt: Arc::new(jwt), db_pool }
    }

    pub fn repositories(&self) -> &Repositories {
        self.runtime.repositories()
    }
}
