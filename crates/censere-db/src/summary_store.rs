//! Per-sol time-series persistence.
//!
//! The `summary` table is append-only and keyed by `(simulation_id, sol)`.
//! Inserts use `ON CONFLICT DO NOTHING`, so retrying a sol's append after a
//! transient failure leaves exactly one row.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use censere_types::{SimulationId, SolSummary};

use crate::BATCH_SIZE;
use crate::error::{DbError, count};

/// Operations on the `summary` table.
pub struct SummaryStore<'a> {
    pool: &'a PgPool,
}

impl<'a> SummaryStore<'a> {
    /// Create a new summary store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Append one sol's row. An existing row for the same sol is kept.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn append(&self, summary: &SolSummary) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        insert_summary(&mut conn, summary).await
    }

    /// Fetch a run's rows in sol order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails or a count is out of range.
    pub async fn for_simulation(
        &self,
        simulation_id: SimulationId,
    ) -> Result<Vec<SolSummary>, DbError> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            r"SELECT simulation_id, sol, earth_datetime, population, males, females,
                     arrivals, births, deaths, new_relationships, ended_relationships,
                     active_relationships
              FROM summary
              WHERE simulation_id = $1
              ORDER BY sol",
        )
        .bind(simulation_id.into_inner())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(SolSummary::try_from).collect()
    }

    /// Total rows across every run.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn count(&self) -> Result<i64, DbError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM summary")
            .fetch_one(self.pool)
            .await?;
        Ok(total)
    }
}

/// Insert one row on an open connection or transaction.
async fn insert_summary(
    conn: &mut PgConnection,
    summary: &SolSummary,
) -> Result<(), DbError> {
    sqlx::query(
        r"INSERT INTO summary
          (simulation_id, sol, earth_datetime, population, males, females,
           arrivals, births, deaths, new_relationships, ended_relationships,
           active_relationships)
          VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
          ON CONFLICT (simulation_id, sol) DO NOTHING",
    )
    .bind(summary.simulation_id.into_inner())
    .bind(summary.sol)
    .bind(summary.earth_datetime)
    .bind(i64::from(summary.population))
    .bind(i64::from(summary.males))
    .bind(i64::from(summary.females))
    .bind(i64::from(summary.arrivals))
    .bind(i64::from(summary.births))
    .bind(i64::from(summary.deaths))
    .bind(i64::from(summary.new_relationships))
    .bind(i64::from(summary.ended_relationships))
    .bind(i64::from(summary.active_relationships))
    .execute(&mut *conn)
    .await?;

    tracing::trace!(simulation_id = %summary.simulation_id, sol = summary.sol, "Appended summary row");
    Ok(())
}

/// Insert many rows on an open transaction, one `UNNEST` statement per
/// batch. Returns the rows written; rows already present are skipped.
pub(crate) async fn insert_summaries(
    conn: &mut PgConnection,
    rows: &[SolSummary],
) -> Result<u64, DbError> {
    let mut written = 0_u64;
    for chunk in rows.chunks(BATCH_SIZE) {
        let cols = SummaryColumns::from_chunk(chunk);
        let result = sqlx::query(
            r"INSERT INTO summary
              (simulation_id, sol, earth_datetime, population, males, females,
               arrivals, births, deaths, new_relationships, ended_relationships,
               active_relationships)
              SELECT * FROM UNNEST($1::UUID[], $2::BIGINT[], $3::TIMESTAMPTZ[],
                                   $4::BIGINT[], $5::BIGINT[], $6::BIGINT[], $7::BIGINT[],
                                   $8::BIGINT[], $9::BIGINT[], $10::BIGINT[], $11::BIGINT[],
                                   $12::BIGINT[])
              ON CONFLICT (simulation_id, sol) DO NOTHING",
        )
        .bind(&cols.simulation_ids)
        .bind(&cols.sols)
        .bind(&cols.earth_datetimes)
        .bind(&cols.populations)
        .bind(&cols.males)
        .bind(&cols.females)
        .bind(&cols.arrivals)
        .bind(&cols.births)
        .bind(&cols.deaths)
        .bind(&cols.new_relationships)
        .bind(&cols.ended_relationships)
        .bind(&cols.active_relationships)
        .execute(&mut *conn)
        .await?;
        written = written.saturating_add(result.rows_affected());
    }
    Ok(written)
}

/// Column arrays for one `UNNEST` insert into `summary`.
#[derive(Debug, Default)]
struct SummaryColumns {
    simulation_ids: Vec<Uuid>,
    sols: Vec<i64>,
    earth_datetimes: Vec<DateTime<Utc>>,
    populations: Vec<i64>,
    males: Vec<i64>,
    females: Vec<i64>,
    arrivals: Vec<i64>,
    births: Vec<i64>,
    deaths: Vec<i64>,
    new_relationships: Vec<i64>,
    ended_relationships: Vec<i64>,
    active_relationships: Vec<i64>,
}

impl SummaryColumns {
    fn from_chunk(chunk: &[SolSummary]) -> Self {
        let mut cols = Self::default();
        for row in chunk {
            cols.simulation_ids.push(row.simulation_id.into_inner());
            cols.sols.push(row.sol);
            cols.earth_datetimes.push(row.earth_datetime);
            cols.populations.push(i64::from(row.population));
            cols.males.push(i64::from(row.males));
            cols.females.push(i64::from(row.females));
            cols.arrivals.push(i64::from(row.arrivals));
            cols.births.push(i64::from(row.births));
            cols.deaths.push(i64::from(row.deaths));
            cols.new_relationships.push(i64::from(row.new_relationships));
            cols.ended_relationships.push(i64::from(row.ended_relationships));
            cols.active_relationships.push(i64::from(row.active_relationships));
        }
        cols
    }
}

/// A row from the `summary` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SummaryRow {
    /// Run identifier.
    pub simulation_id: Uuid,
    /// Sol number.
    pub sol: i64,
    /// Earth timestamp of the sol.
    pub earth_datetime: DateTime<Utc>,
    /// Living colonists.
    pub population: i64,
    /// Living males.
    pub males: i64,
    /// Living females.
    pub females: i64,
    /// Landings this sol.
    pub arrivals: i64,
    /// Births this sol.
    pub births: i64,
    /// Deaths this sol.
    pub deaths: i64,
    /// Relationships formed this sol.
    pub new_relationships: i64,
    /// Relationships ended this sol.
    pub ended_relationships: i64,
    /// Active relationships at the end of the sol.
    pub active_relationships: i64,
}

impl TryFrom<SummaryRow> for SolSummary {
    type Error = DbError;

    fn try_from(row: SummaryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            simulation_id: SimulationId::from(row.simulation_id),
            sol: row.sol,
            earth_datetime: row.earth_datetime,
            population: count("population", row.population)?,
            males: count("males", row.males)?,
            females: count("females", row.females)?,
            arrivals: count("arrivals", row.arrivals)?,
            births: count("births", row.births)?,
            deaths: count("deaths", row.deaths)?,
            new_relationships: count("new_relationships", row.new_relationships)?,
            ended_relationships: count("ended_relationships", row.ended_relationships)?,
            active_relationships: count("active_relationships", row.active_relationships)?,
        })
    }
}
