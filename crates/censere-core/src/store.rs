//! Run storage trait and in-memory implementation.
//!
//! A run writes three kinds of record: its Run Ledger row
//! ([`SimulationRecord`]), one time-series row per sol ([`SolSummary`]),
//! and a [`ColonySnapshot`] at every checkpoint. The [`RunStore`] trait
//! abstracts where they go. [`MemoryStore`] keeps everything in process
//! and is used by the tests and single-process tooling; the engine binary
//! implements the trait over `PostgreSQL`.

use std::collections::BTreeMap;

use tokio::sync::Mutex;

use censere_types::{ColonySnapshot, SimulationId, SimulationRecord, SolSummary};

/// Errors raised by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The ledger row to update does not exist.
    #[error("simulation {simulation_id} is not in the ledger")]
    UnknownSimulation {
        /// The missing run.
        simulation_id: SimulationId,
    },

    /// A ledger row with this ID already exists.
    #[error("simulation {simulation_id} is already in the ledger")]
    DuplicateSimulation {
        /// The clashing run.
        simulation_id: SimulationId,
    },

    /// The backend failed.
    #[error("storage backend error: {source}")]
    Backend {
        /// The underlying backend error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Errors raised while merging one store into another.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// The source holds a run the target already has. Nothing from the
    /// source was written.
    #[error("simulation {simulation_id} already exists in the target")]
    DuplicateSimulation {
        /// The clashing run.
        simulation_id: SimulationId,
    },

    /// Reading or writing failed.
    #[error("store error during merge: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },
}

/// What a merge copied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Ledger rows copied.
    pub simulations: u64,
    /// Time-series rows copied.
    pub summaries: u64,
    /// Snapshots copied.
    pub snapshots: u64,
}

/// Persistence for ledger rows, time series, and snapshots.
///
/// Methods return `Send` futures so a run can be driven from a spawned
/// task.
pub trait RunStore: Send + Sync {
    /// Insert a new ledger row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateSimulation`] if the ID exists.
    fn insert_simulation(
        &self,
        record: &SimulationRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Replace an existing ledger row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownSimulation`] if the row is missing.
    fn update_simulation(
        &self,
        record: &SimulationRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Fetch one ledger row.
    fn load_simulation(
        &self,
        simulation_id: SimulationId,
    ) -> impl Future<Output = Result<Option<SimulationRecord>, StoreError>> + Send;

    /// Fetch every ledger row, oldest first.
    fn list_simulations(
        &self,
    ) -> impl Future<Output = Result<Vec<SimulationRecord>, StoreError>> + Send;

    /// Append one time-series row. A row already stored for the same
    /// `(simulation_id, sol)` is left untouched.
    fn append_summary(
        &self,
        summary: &SolSummary,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Fetch a run's time series in sol order.
    fn load_summaries(
        &self,
        simulation_id: SimulationId,
    ) -> impl Future<Output = Result<Vec<SolSummary>, StoreError>> + Send;

    /// Store a run's snapshot, replacing any earlier one.
    fn save_snapshot(
        &self,
        snapshot: &ColonySnapshot,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Fetch a run's latest snapshot.
    fn load_snapshot(
        &self,
        simulation_id: SimulationId,
    ) -> impl Future<Output = Result<Option<ColonySnapshot>, StoreError>> + Send;
}

#[derive(Debug, Default)]
struct MemoryInner {
    simulations: BTreeMap<SimulationId, SimulationRecord>,
    summaries: BTreeMap<(SimulationId, i64), SolSummary>,
    snapshots: BTreeMap<SimulationId, ColonySnapshot>,
}

/// A [`RunStore`] held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total time-series rows across all runs.
    pub async fn summary_count(&self) -> usize {
        self.inner.lock().await.summaries.len()
    }

    /// Copy every run in `other` into this store.
    ///
    /// The merge is all-or-nothing: if any run in `other` already exists
    /// here, nothing is written.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::DuplicateSimulation`] on an ID collision.
    pub async fn merge_from(&self, other: &Self) -> Result<MergeReport, MergeError> {
        let source = {
            let theirs = other.inner.lock().await;
            (
                theirs.simulations.clone(),
                theirs.summaries.clone(),
                theirs.snapshots.clone(),
            )
        };
        let (simulations, summaries, snapshots) = source;

        let mut ours = self.inner.lock().await;
        if let Some(simulation_id) = simulations
            .keys()
            .find(|id| ours.simulations.contains_key(id))
        {
            return Err(MergeError::DuplicateSimulation {
                simulation_id: *simulation_id,
            });
        }

        let report = MergeReport {
            simulations: count(simulations.len()),
            summaries: count(summaries.len()),
            snapshots: count(snapshots.len()),
        };
        ours.simulations.extend(simulations);
        ours.summaries.extend(summaries);
        ours.snapshots.extend(snapshots);
        Ok(report)
    }
}

fn count(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}

impl RunStore for MemoryStore {
    async fn insert_simulation(&self, record: &SimulationRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.simulations.contains_key(&record.simulation_id) {
            return Err(StoreError::DuplicateSimulation {
                simulation_id: record.simulation_id,
            });
        }
        inner
            .simulations
            .insert(record.simulation_id, record.clone());
        Ok(())
    }

    async fn update_simulation(&self, record: &SimulationRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let slot = inner.simulations.get_mut(&record.simulation_id).ok_or(
            StoreError::UnknownSimulation {
                simulation_id: record.simulation_id,
            },
        )?;
        *slot = record.clone();
        Ok(())
    }

    async fn load_simulation(
        &self,
        simulation_id: SimulationId,
    ) -> Result<Option<SimulationRecord>, StoreError> {
        Ok(self.inner.lock().await.simulations.get(&simulation_id).cloned())
    }

    async fn list_simulations(&self) -> Result<Vec<SimulationRecord>, StoreError> {
        let inner = self.inner.lock().await;
        let mut records: Vec<SimulationRecord> = inner.simulations.values().cloned().collect();
        records.sort_by_key(|r| r.begin_datetime);
        Ok(records)
    }

    async fn append_summary(&self, summary: &SolSummary) -> Result<(), StoreError> {
        self.inner
            .lock()
            .await
            .summaries
            .entry((summary.simulation_id, summary.sol))
            .or_insert_with(|| summary.clone());
        Ok(())
    }

    async fn load_summaries(
        &self,
        simulation_id: SimulationId,
    ) -> Result<Vec<SolSummary>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .summaries
            .range((simulation_id, i64::MIN)..=(simulation_id, i64::MAX))
            .map(|(_, row)| row.clone())
            .collect())
    }

    async fn save_snapshot(&self, snapshot: &ColonySnapshot) -> Result<(), StoreError> {
        self.inner
            .lock()
            .await
            .snapshots
            .insert(snapshot.simulation_id, snapshot.clone());
        Ok(())
    }

    async fn load_snapshot(
        &self,
        simulation_id: SimulationId,
    ) -> Result<Option<ColonySnapshot>, StoreError> {
        Ok(self.inner.lock().await.snapshots.get(&simulation_id).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use censere_types::LimitKind;

    use super::*;

    fn record() -> SimulationRecord {
        SimulationRecord {
            simulation_id: SimulationId::new(),
            initial_mission_lands: Utc::now(),
            begin_datetime: Utc::now(),
            end_datetime: None,
            limit: LimitKind::Sols,
            limit_count: 10,
            mission_ends: None,
            final_soldays: None,
            final_population: None,
            args: "{}".to_owned(),
            notes: String::new(),
            random_seed: 1,
            random_state: None,
        }
    }

    fn summary(simulation_id: SimulationId, sol: i64, population: u32) -> SolSummary {
        SolSummary {
            simulation_id,
            sol,
            earth_datetime: Utc::now(),
            population,
            males: 0,
            females: population,
            arrivals: 0,
            births: 0,
            deaths: 0,
            new_relationships: 0,
            ended_relationships: 0,
            active_relationships: 0,
        }
    }

    #[tokio::test]
    async fn ledger_rows_insert_and_update() {
        let store = MemoryStore::new();
        let mut rec = record();
        store.insert_simulation(&rec).await.unwrap();
        assert!(matches!(
            store.insert_simulation(&rec).await,
            Err(StoreError::DuplicateSimulation { .. })
        ));

        rec.final_soldays = Some(10);
        store.update_simulation(&rec).await.unwrap();
        let loaded = store.load_simulation(rec.simulation_id).await.unwrap();
        assert_eq!(loaded, Some(rec));

        assert!(matches!(
            store.update_simulation(&record()).await,
            Err(StoreError::UnknownSimulation { .. })
        ));
    }

    #[tokio::test]
    async fn summaries_are_append_only_and_ordered() {
        let store = MemoryStore::new();
        let id = SimulationId::new();
        for sol in [2, 0, 1] {
            store.append_summary(&summary(id, sol, 20)).await.unwrap();
        }
        // A retried append does not overwrite.
        store.append_summary(&summary(id, 1, 99)).await.unwrap();
        store
            .append_summary(&summary(SimulationId::new(), 0, 5))
            .await
            .unwrap();

        let rows = store.load_summaries(id).await.unwrap();
        let sols: Vec<i64> = rows.iter().map(|r| r.sol).collect();
        assert_eq!(sols, vec![0, 1, 2]);
        assert!(rows.iter().all(|r| r.population == 20));
        assert_eq!(store.summary_count().await, 4);
    }

    #[tokio::test]
    async fn merge_sums_rows_and_rejects_duplicates() {
        let a = MemoryStore::new();
        let b = MemoryStore::new();
        let (ra, rb) = (record(), record());
        a.insert_simulation(&ra).await.unwrap();
        b.insert_simulation(&rb).await.unwrap();
        for sol in 0..3 {
            a.append_summary(&summary(ra.simulation_id, sol, 1)).await.unwrap();
        }
        for sol in 0..5 {
            b.append_summary(&summary(rb.simulation_id, sol, 1)).await.unwrap();
        }

        let target = MemoryStore::new();
        target.merge_from(&a).await.unwrap();
        let report = target.merge_from(&b).await.unwrap();
        assert_eq!(report.summaries, 5);
        assert_eq!(target.summary_count().await, 8);
        assert_eq!(target.list_simulations().await.unwrap().len(), 2);

        assert!(matches!(
            target.merge_from(&a).await,
            Err(MergeError::DuplicateSimulation { simulation_id }) if simulation_id == ra.simulation_id
        ));
        assert_eq!(target.summary_count().await, 8);
    }
}
