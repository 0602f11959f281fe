//! Document store backend selection.

use serde::{Deserialize, Serialize};

/// Which store adapter backs the repositories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local store; contents are lost on exit.
    #[default]
    Memory,
    /// PostgreSQL JSONB tables, one per collection.
    Postgres,
}

/// Store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// The backend to use.
    #[serde(default)]
    pub backend: StoreBackend,
    /// Create unique indexes for declared unique fields at startup.
    #[serde(default = "default_true")]
    pub sync_indexes: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            sync_indexes: true,
        }
    }
}

fn default_true() -> bool {
    true
}
