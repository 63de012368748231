//! [`RunStore`] over `PostgreSQL`.
//!
//! Bridges the core run loop to the `censere-db` stores. Ledger conflicts
//! keep their meaning across the seam; every other database failure is
//! carried as [`StoreError::Backend`].

use censere_core::store::{RunStore, StoreError};
use censere_db::{ColonyStore, DbError, PostgresPool, SimulationStore, SummaryStore};
use censere_types::{ColonySnapshot, SimulationId, SimulationRecord, SolSummary};

/// A [`RunStore`] backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgRunStore {
    pg: PostgresPool,
}

impl PgRunStore {
    /// Wrap a connected pool.
    pub const fn new(pg: PostgresPool) -> Self {
        Self { pg }
    }
}

fn store_error(err: DbError) -> StoreError {
    match err {
        DbError::DuplicateSimulation(simulation_id) => {
            StoreError::DuplicateSimulation { simulation_id }
        }
        DbError::UnknownSimulation(simulation_id) => StoreError::UnknownSimulation { simulation_id },
        other => StoreError::Backend {
            source: Box::new(other),
        },
    }
}

impl RunStore for PgRunStore {
    async fn insert_simulation(&self, record: &SimulationRecord) -> Result<(), StoreError> {
        SimulationStore::new(self.pg.pool())
            .insert(record)
            .await
            .map_err(store_error)
    }

    async fn update_simulation(&self, record: &SimulationRecord) -> Result<(), StoreError> {
        SimulationStore::new(self.pg.pool())
            .update(record)
            .await
            .map_err(store_error)
    }

    async fn load_simulation(
        &self,
        simulation_id: SimulationId,
    ) -> Result<Option<SimulationRecord>, StoreError> {
        SimulationStore::new(self.pg.pool())
            .get(simulation_id)
            .await
            .map_err(store_error)
    }

    async fn list_simulations(&self) -> Result<Vec<SimulationRecord>, StoreError> {
        SimulationStore::new(self.pg.pool())
            .list()
            .await
            .map_err(store_error)
    }

    async fn append_summary(&self, summary: &SolSummary) -> Result<(), StoreError> {
        SummaryStore::new(self.pg.pool())
            .append(summary)
            .await
            .map_err(store_error)
    }

    async fn load_summaries(
        &self,
        simulation_id: SimulationId,
    ) -> Result<Vec<SolSummary>, StoreError> {
        SummaryStore::new(self.pg.pool())
            .for_simulation(simulation_id)
            .await
            .map_err(store_error)
    }

    async fn save_snapshot(&self, snapshot: &ColonySnapshot) -> Result<(), StoreError> {
        ColonyStore::new(self.pg.pool())
            .save(snapshot)
            .await
            .map_err(store_error)
    }

    async fn load_snapshot(
        &self,
        simulation_id: SimulationId,
    ) -> Result<Option<ColonySnapshot>, StoreError> {
        ColonyStore::new(self.pg.pool())
            .load(simulation_id)
            .await
            .map_err(store_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_conflicts_keep_their_meaning() {
        let id = SimulationId::new();
        assert!(matches!(
            store_error(DbError::DuplicateSimulation(id)),
            StoreError::DuplicateSimulation { simulation_id } if simulation_id == id
        ));
        assert!(matches!(
            store_error(DbError::UnknownSimulation(id)),
            StoreError::UnknownSimulation { simulation_id } if simulation_id == id
        ));
        assert!(matches!(
            store_error(DbError::Config("bad url".to_owned())),
            StoreError::Backend { .. }
        ));
    }
}
