//! Merging runs from several databases into one.
//!
//! Independent generator processes may each write to their own database.
//! [`merge_databases`] copies ledger rows, time series, and snapshots from
//! each source into a target. Every source is copied in one transaction: a
//! source holding a simulation ID the target already has is rejected with
//! [`DbError::DuplicateSimulation`] and nothing from it is written. Sources
//! merged before the failing one stay merged.

use sqlx::PgPool;

use crate::colony_store::{ColonyStore, write_snapshot};
use crate::error::DbError;
use crate::simulation_store::{SimulationStore, insert_simulation};
use crate::summary_store::{SummaryStore, insert_summaries};

/// Rows copied by a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeCounts {
    /// Ledger rows copied.
    pub simulations: u64,
    /// Time-series rows copied.
    pub summaries: u64,
    /// Snapshots copied.
    pub snapshots: u64,
}

impl MergeCounts {
    const fn plus(self, other: Self) -> Self {
        Self {
            simulations: self.simulations.saturating_add(other.simulations),
            summaries: self.summaries.saturating_add(other.summaries),
            snapshots: self.snapshots.saturating_add(other.snapshots),
        }
    }
}

/// Copy every run of `source` into `target` in one transaction.
///
/// # Errors
///
/// Returns [`DbError::DuplicateSimulation`] if a run already exists in
/// `target`, or [`DbError`] if a read or write fails. The target is
/// unchanged on error.
pub async fn merge_database(target: &PgPool, source: &PgPool) -> Result<MergeCounts, DbError> {
    let records = SimulationStore::new(source).list().await?;
    let summaries = SummaryStore::new(source);
    let snapshots = ColonyStore::new(source);
    let mut counts = MergeCounts::default();

    let mut tx = target.begin().await?;
    for record in &records {
        // A duplicate aborts the transaction when `tx` drops.
        insert_simulation(&mut tx, record).await?;
        counts.simulations = counts.simulations.saturating_add(1);

        let rows = summaries.for_simulation(record.simulation_id).await?;
        let written = insert_summaries(&mut tx, &rows).await?;
        counts.summaries = counts.summaries.saturating_add(written);

        if let Some(snapshot) = snapshots.load(record.simulation_id).await? {
            write_snapshot(&mut tx, &snapshot).await?;
            counts.snapshots = counts.snapshots.saturating_add(1);
        }
    }
    tx.commit().await?;

    tracing::info!(
        simulations = counts.simulations,
        summaries = counts.summaries,
        snapshots = counts.snapshots,
        "Merged source database"
    );
    Ok(counts)
}

/// Merge each source into `target` in order and return the totals.
///
/// # Errors
///
/// Stops at the first failing source and returns its error.
pub async fn merge_databases(
    target: &PgPool,
    sources: &[PgPool],
) -> Result<MergeCounts, DbError> {
    let mut total = MergeCounts::default();
    for source in sources {
        total = total.plus(merge_database(target, source).await?);
    }
    Ok(total)
}
