use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::cache::TEAMS_KEY;
use crate::error::StoreError;
use crate::store::{Store, StoreExt};
use crate::types::Team;

/// Persisted list of known teams.
///
/// Clones share one write lock, so concurrent `add` calls never drop a team.
#[derive(Clone)]
pub struct TeamRegistry {
    store: Arc<dyn Store>,
    write_lock: Arc<Mutex<()>>,
}

impl TeamRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// All registered teams; empty when nothing has been stored yet
    pub fn list(&self) -> Result<Vec<Team>, StoreError> {
        Ok(self.store.load(TEAMS_KEY)?.unwrap_or_default())
    }

    /// Register a team unless one with the same id exists.
    ///
    /// Returns whether the team was newly added.
    pub fn add(&self, team: &Team) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut teams = self.list()?;
        if teams.iter().any(|known| known.team_id == team.team_id) {
            debug!("Team {} already registered", team.team_id);
            return Ok(false);
        }
        teams.push(team.clone());
        self.store.save(TEAMS_KEY, &teams)?;
        Ok(true)
    }
}
