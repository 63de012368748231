//! Run Ledger persistence.
//!
//! One row per run in the `simulations` table. The row is inserted when a
//! run starts and rewritten at every checkpoint; the engine never deletes
//! it.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use censere_types::{SimulationId, SimulationRecord};

use crate::error::{DbError, parse};

const SELECT_SIMULATION: &str = r"SELECT simulation_id, initial_mission_lands, begin_datetime,
       end_datetime, limit_kind, limit_count, mission_ends, final_soldays,
       final_population, args, notes, random_seed, random_state
  FROM simulations";

/// Operations on the `simulations` table.
pub struct SimulationStore<'a> {
    pool: &'a PgPool,
}

impl<'a> SimulationStore<'a> {
    /// Create a new simulation store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new ledger row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::DuplicateSimulation`] if the ID exists, or
    /// [`DbError::Postgres`] if the insert fails.
    pub async fn insert(&self, record: &SimulationRecord) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        insert_simulation(&mut conn, record).await
    }

    /// Replace every column of an existing ledger row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UnknownSimulation`] if the row is missing.
    pub async fn update(&self, record: &SimulationRecord) -> Result<(), DbError> {
        let result = sqlx::query(
            r"UPDATE simulations SET
                initial_mission_lands = $2,
                begin_datetime = $3,
                end_datetime = $4,
                limit_kind = $5,
                limit_count = $6,
                mission_ends = $7,
                final_soldays = $8,
                final_population = $9,
                args = $10,
                notes = $11,
                random_seed = $12,
                random_state = $13
              WHERE simulation_id = $1",
        )
        .bind(record.simulation_id.into_inner())
        .bind(record.initial_mission_lands)
        .bind(record.begin_datetime)
        .bind(record.end_datetime)
        .bind(record.limit.as_str())
        .bind(record.limit_count)
        .bind(record.mission_ends)
        .bind(record.final_soldays)
        .bind(record.final_population)
        .bind(&record.args)
        .bind(&record.notes)
        .bind(record.random_seed)
        .bind(record.random_state.as_deref())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::UnknownSimulation(record.simulation_id));
        }
        tracing::debug!(simulation_id = %record.simulation_id, "Updated ledger row");
        Ok(())
    }

    /// Fetch one ledger row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails or a column does not decode.
    pub async fn get(
        &self,
        simulation_id: SimulationId,
    ) -> Result<Option<SimulationRecord>, DbError> {
        let row = sqlx::query_as::<_, SimulationRow>(&format!(
            "{SELECT_SIMULATION} WHERE simulation_id = $1"
        ))
        .bind(simulation_id.into_inner())
        .fetch_optional(self.pool)
        .await?;

        row.map(SimulationRecord::try_from).transpose()
    }

    /// Fetch every ledger row, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails or a column does not decode.
    pub async fn list(&self) -> Result<Vec<SimulationRecord>, DbError> {
        let rows = sqlx::query_as::<_, SimulationRow>(&format!(
            "{SELECT_SIMULATION} ORDER BY begin_datetime, simulation_id"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(SimulationRecord::try_from).collect()
    }
}

/// Insert a ledger row on an open connection or transaction.
pub(crate) async fn insert_simulation(
    conn: &mut PgConnection,
    record: &SimulationRecord,
) -> Result<(), DbError> {
    let result = sqlx::query(
        r"INSERT INTO simulations
          (simulation_id, initial_mission_lands, begin_datetime, end_datetime,
           limit_kind, limit_count, mission_ends, final_soldays, final_population,
           args, notes, random_seed, random_state)
          VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
          ON CONFLICT (simulation_id) DO NOTHING",
    )
    .bind(record.simulation_id.into_inner())
    .bind(record.initial_mission_lands)
    .bind(record.begin_datetime)
    .bind(record.end_datetime)
    .bind(record.limit.as_str())
    .bind(record.limit_count)
    .bind(record.mission_ends)
    .bind(record.final_soldays)
    .bind(record.final_population)
    .bind(&record.args)
    .bind(&record.notes)
    .bind(record.random_seed)
    .bind(record.random_state.as_deref())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::DuplicateSimulation(record.simulation_id));
    }
    tracing::debug!(simulation_id = %record.simulation_id, "Inserted ledger row");
    Ok(())
}

/// A row from the `simulations` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SimulationRow {
    /// Run identifier.
    pub simulation_id: Uuid,
    /// Earth timestamp of sol 0.
    pub initial_mission_lands: DateTime<Utc>,
    /// Wall-clock start.
    pub begin_datetime: DateTime<Utc>,
    /// Wall-clock end, if the run reached its limit.
    pub end_datetime: Option<DateTime<Utc>>,
    /// `sols` or `population`.
    pub limit_kind: String,
    /// Limit count.
    pub limit_count: i64,
    /// Earth timestamp of the last simulated sol.
    pub mission_ends: Option<DateTime<Utc>>,
    /// Last simulated sol.
    pub final_soldays: Option<i64>,
    /// Final living population.
    pub final_population: Option<i64>,
    /// Resolved configuration as JSON text.
    pub args: String,
    /// Free-text notes.
    pub notes: String,
    /// Generator seed.
    pub random_seed: i64,
    /// Captured generator state.
    pub random_state: Option<String>,
}

impl TryFrom<SimulationRow> for SimulationRecord {
    type Error = DbError;

    fn try_from(row: SimulationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            simulation_id: SimulationId::from(row.simulation_id),
            initial_mission_lands: row.initial_mission_lands,
            begin_datetime: row.begin_datetime,
            end_datetime: row.end_datetime,
            limit: parse("limit_kind", &row.limit_kind)?,
            limit_count: row.limit_count,
            mission_ends: row.mission_ends,
            final_soldays: row.final_soldays,
            final_population: row.final_population,
            args: row.args,
            notes: row.notes,
            random_seed: row.random_seed,
            random_state: row.random_state,
        })
    }
}
