//! Colony snapshot persistence.
//!
//! A snapshot is the full population of a run at its last checkpoint:
//! every colonist and relationship, living or not, plus the sol and the
//! next mission sol. Only the latest snapshot is kept. Writing a new one
//! replaces the old one inside a single transaction, so a crash never
//! leaves a half-written population behind.
//!
//! Rows carry an `ordinal` column so the arena order survives the round
//! trip. Pairing iterates colonists in that order, and a resumed run must
//! see them in the order the checkpointed run did.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use censere_types::{
    Colonist, ColonistId, ColonySnapshot, Relationship, RelationshipId, SimulationId,
};

use crate::BATCH_SIZE;
use crate::error::{DbError, count, parse};

/// Operations on the `colony_snapshots`, `colonists`, and `relationships`
/// tables.
pub struct ColonyStore<'a> {
    pool: &'a PgPool,
}

impl<'a> ColonyStore<'a> {
    /// Create a new colony store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Replace the run's snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if any statement fails; nothing is
    /// written in that case.
    pub async fn save(&self, snapshot: &ColonySnapshot) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        write_snapshot(&mut tx, snapshot).await?;
        tx.commit().await?;

        tracing::debug!(
            simulation_id = %snapshot.simulation_id,
            sol = snapshot.sol,
            colonists = snapshot.colonists.len(),
            relationships = snapshot.relationships.len(),
            "Saved colony snapshot"
        );
        Ok(())
    }

    /// Load the run's snapshot, if one was saved.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a query fails or a column does not decode.
    pub async fn load(
        &self,
        simulation_id: SimulationId,
    ) -> Result<Option<ColonySnapshot>, DbError> {
        let id = simulation_id.into_inner();
        let Some((sol, next_mission_sol)) = sqlx::query_as::<_, (i64, i64)>(
            r"SELECT sol, next_mission_sol FROM colony_snapshots WHERE simulation_id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        else {
            return Ok(None);
        };

        let colonists = sqlx::query_as::<_, ColonistRow>(
            r"SELECT colonist_id, sex, orientation, origin, birth_sol, life_expectancy_sols,
                     parent_a, parent_b, relationship_id, died_on_sol, generation
              FROM colonists
              WHERE simulation_id = $1
              ORDER BY ordinal",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        let relationships = sqlx::query_as::<_, RelationshipRow>(
            r"SELECT relationship_id, partner_a, partner_b, kind, started_on_sol,
                     duration_sols, children, next_birth_sol, ended_on_sol, end_reason
              FROM relationships
              WHERE simulation_id = $1
              ORDER BY ordinal",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some(ColonySnapshot {
            simulation_id,
            sol,
            next_mission_sol,
            colonists: colonists
                .into_iter()
                .map(Colonist::try_from)
                .collect::<Result<_, _>>()?,
            relationships: relationships
                .into_iter()
                .map(Relationship::try_from)
                .collect::<Result<_, _>>()?,
        }))
    }
}

/// Write a snapshot on an open transaction, replacing any earlier one.
pub(crate) async fn write_snapshot(
    conn: &mut PgConnection,
    snapshot: &ColonySnapshot,
) -> Result<(), DbError> {
    let id = snapshot.simulation_id.into_inner();

    // Colonists and relationships cascade.
    sqlx::query("DELETE FROM colony_snapshots WHERE simulation_id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        r"INSERT INTO colony_snapshots (simulation_id, sol, next_mission_sol)
          VALUES ($1, $2, $3)",
    )
    .bind(id)
    .bind(snapshot.sol)
    .bind(snapshot.next_mission_sol)
    .execute(&mut *conn)
    .await?;

    let mut offset = 0_usize;
    for chunk in snapshot.colonists.chunks(BATCH_SIZE) {
        let cols = ColonistColumns::from_chunk(offset, chunk)?;
        sqlx::query(
            r"INSERT INTO colonists
              (simulation_id, colonist_id, ordinal, sex, orientation, origin, birth_sol,
               life_expectancy_sols, parent_a, parent_b, relationship_id, died_on_sol,
               generation)
              SELECT $1::UUID, u.*
              FROM UNNEST($2::UUID[], $3::BIGINT[], $4::TEXT[], $5::TEXT[], $6::TEXT[],
                          $7::BIGINT[], $8::BIGINT[], $9::UUID[], $10::UUID[], $11::UUID[],
                          $12::BIGINT[], $13::BIGINT[]) AS u",
        )
        .bind(id)
        .bind(&cols.ids)
        .bind(&cols.ordinals)
        .bind(&cols.sexes)
        .bind(&cols.orientations)
        .bind(&cols.origins)
        .bind(&cols.birth_sols)
        .bind(&cols.life_expectancies)
        .bind(&cols.parent_as)
        .bind(&cols.parent_bs)
        .bind(&cols.relationship_ids)
        .bind(&cols.died_on_sols)
        .bind(&cols.generations)
        .execute(&mut *conn)
        .await?;
        offset = offset.saturating_add(chunk.len());
    }

    let mut offset = 0_usize;
    for chunk in snapshot.relationships.chunks(BATCH_SIZE) {
        let cols = RelationshipColumns::from_chunk(offset, chunk)?;
        sqlx::query(
            r"INSERT INTO relationships
              (simulation_id, relationship_id, ordinal, partner_a, partner_b, kind,
               started_on_sol, duration_sols, children, next_birth_sol, ended_on_sol,
               end_reason)
              SELECT $1::UUID, u.*
              FROM UNNEST($2::UUID[], $3::BIGINT[], $4::UUID[], $5::UUID[], $6::TEXT[],
                          $7::BIGINT[], $8::BIGINT[], $9::BIGINT[], $10::BIGINT[],
                          $11::BIGINT[], $12::TEXT[]) AS u",
        )
        .bind(id)
        .bind(&cols.ids)
        .bind(&cols.ordinals)
        .bind(&cols.partner_as)
        .bind(&cols.partner_bs)
        .bind(&cols.kinds)
        .bind(&cols.started_on_sols)
        .bind(&cols.duration_sols)
        .bind(&cols.children)
        .bind(&cols.next_birth_sols)
        .bind(&cols.ended_on_sols)
        .bind(&cols.end_reasons)
        .execute(&mut *conn)
        .await?;
        offset = offset.saturating_add(chunk.len());
    }

    Ok(())
}

/// Position in the snapshot as a stored `BIGINT`.
fn ordinal(index: usize) -> Result<i64, DbError> {
    i64::try_from(index).or(Err(DbError::OrdinalOverflow { index }))
}

/// Column arrays for one `UNNEST` insert into `colonists`.
#[derive(Debug, Default)]
struct ColonistColumns {
    ids: Vec<Uuid>,
    ordinals: Vec<i64>,
    sexes: Vec<String>,
    orientations: Vec<String>,
    origins: Vec<String>,
    birth_sols: Vec<i64>,
    life_expectancies: Vec<i64>,
    parent_as: Vec<Option<Uuid>>,
    parent_bs: Vec<Option<Uuid>>,
    relationship_ids: Vec<Option<Uuid>>,
    died_on_sols: Vec<Option<i64>>,
    generations: Vec<i64>,
}

impl ColonistColumns {
    /// Split `chunk`, which starts at snapshot position `offset`, into
    /// columns.
    fn from_chunk(offset: usize, chunk: &[Colonist]) -> Result<Self, DbError> {
        let mut cols = Self::default();
        for (i, c) in chunk.iter().enumerate() {
            cols.ids.push(c.id.into_inner());
            cols.ordinals.push(ordinal(offset.saturating_add(i))?);
            cols.sexes.push(c.sex.as_str().to_owned());
            cols.orientations.push(c.orientation.as_str().to_owned());
            cols.origins.push(c.origin.as_str().to_owned());
            cols.birth_sols.push(c.birth_sol);
            cols.life_expectancies.push(c.life_expectancy_sols);
            cols.parent_as.push(c.parent_a.map(ColonistId::into_inner));
            cols.parent_bs.push(c.parent_b.map(ColonistId::into_inner));
            cols.relationship_ids
                .push(c.relationship.map(RelationshipId::into_inner));
            cols.died_on_sols.push(c.died_on_sol);
            cols.generations.push(i64::from(c.generation));
        }
        Ok(cols)
    }
}

/// Column arrays for one `UNNEST` insert into `relationships`.
#[derive(Debug, Default)]
struct RelationshipColumns {
    ids: Vec<Uuid>,
    ordinals: Vec<i64>,
    partner_as: Vec<Uuid>,
    partner_bs: Vec<Uuid>,
    kinds: Vec<String>,
    started_on_sols: Vec<i64>,
    duration_sols: Vec<i64>,
    children: Vec<i64>,
    next_birth_sols: Vec<i64>,
    ended_on_sols: Vec<Option<i64>>,
    end_reasons: Vec<Option<String>>,
}

impl RelationshipColumns {
    fn from_chunk(offset: usize, chunk: &[Relationship]) -> Result<Self, DbError> {
        let mut cols = Self::default();
        for (i, r) in chunk.iter().enumerate() {
            cols.ids.push(r.id.into_inner());
            cols.ordinals.push(ordinal(offset.saturating_add(i))?);
            cols.partner_as.push(r.partner_a.into_inner());
            cols.partner_bs.push(r.partner_b.into_inner());
            cols.kinds.push(r.kind.as_str().to_owned());
            cols.started_on_sols.push(r.started_on_sol);
            cols.duration_sols.push(r.duration_sols);
            cols.children.push(i64::from(r.children));
            cols.next_birth_sols.push(r.next_birth_sol);
            cols.ended_on_sols.push(r.ended_on_sol);
            cols.end_reasons
                .push(r.end_reason.map(|reason| reason.as_str().to_owned()));
        }
        Ok(cols)
    }
}

/// A row from the `colonists` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ColonistRow {
    /// Colonist identifier.
    pub colonist_id: Uuid,
    /// `male` or `female`.
    pub sex: String,
    /// Orientation text.
    pub orientation: String,
    /// `astronaut` or `martian`.
    pub origin: String,
    /// Sol of birth.
    pub birth_sol: i64,
    /// Lifespan in sols.
    pub life_expectancy_sols: i64,
    /// First parent.
    pub parent_a: Option<Uuid>,
    /// Second parent.
    pub parent_b: Option<Uuid>,
    /// Active relationship.
    pub relationship_id: Option<Uuid>,
    /// Sol of death.
    pub died_on_sol: Option<i64>,
    /// Generation number.
    pub generation: i64,
}

impl TryFrom<ColonistRow> for Colonist {
    type Error = DbError;

    fn try_from(row: ColonistRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ColonistId::from(row.colonist_id),
            sex: parse("sex", &row.sex)?,
            orientation: parse("orientation", &row.orientation)?,
            origin: parse("origin", &row.origin)?,
            birth_sol: row.birth_sol,
            life_expectancy_sols: row.life_expectancy_sols,
            parent_a: row.parent_a.map(ColonistId::from),
            parent_b: row.parent_b.map(ColonistId::from),
            relationship: row.relationship_id.map(RelationshipId::from),
            died_on_sol: row.died_on_sol,
            generation: count("generation", row.generation)?,
        })
    }
}

/// A row from the `relationships` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RelationshipRow {
    /// Relationship identifier.
    pub relationship_id: Uuid,
    /// Seeking member.
    pub partner_a: Uuid,
    /// Accepting member.
    pub partner_b: Uuid,
    /// Kind text.
    pub kind: String,
    /// Sol formed.
    pub started_on_sol: i64,
    /// Planned length in sols.
    pub duration_sols: i64,
    /// Children so far.
    pub children: i64,
    /// Earliest sol of the next birth.
    pub next_birth_sol: i64,
    /// Sol ended.
    pub ended_on_sol: Option<i64>,
    /// End reason text.
    pub end_reason: Option<String>,
}

impl TryFrom<RelationshipRow> for Relationship {
    type Error = DbError;

    fn try_from(row: RelationshipRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: RelationshipId::from(row.relationship_id),
            partner_a: ColonistId::from(row.partner_a),
            partner_b: ColonistId::from(row.partner_b),
            kind: parse("kind", &row.kind)?,
            started_on_sol: row.started_on_sol,
            duration_sols: row.duration_sols,
            children: count("children", row.children)?,
            next_birth_sol: row.next_birth_sol,
            ended_on_sol: row.ended_on_sol,
            end_reason: row
                .end_reason
                .as_deref()
                .map(|text| parse("end_reason", text))
                .transpose()?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use censere_types::{Orientation, Origin, RelationshipEnd, RelationshipKind, Sex};

    use super::*;

    #[test]
    fn colonist_row_decodes() {
        let parent = Uuid::now_v7();
        let row = ColonistRow {
            colonist_id: Uuid::now_v7(),
            sex: "female".to_owned(),
            orientation: "bisexual".to_owned(),
            origin: "martian".to_owned(),
            birth_sol: 400,
            life_expectancy_sols: 30_000,
            parent_a: Some(parent),
            parent_b: None,
            relationship_id: None,
            died_on_sol: None,
            generation: 1,
        };
        let colonist = Colonist::try_from(row).unwrap();
        assert_eq!(colonist.sex, Sex::Female);
        assert_eq!(colonist.origin, Origin::Martian);
        assert_eq!(colonist.parent_a, Some(ColonistId::from(parent)));
        assert_eq!(colonist.generation, 1);
    }

    #[test]
    fn relationship_row_decodes_end_reason() {
        let row = RelationshipRow {
            relationship_id: Uuid::now_v7(),
            partner_a: Uuid::now_v7(),
            partner_b: Uuid::now_v7(),
            kind: "heterosexual".to_owned(),
            started_on_sol: 10,
            duration_sols: 500,
            children: 2,
            next_birth_sol: 900,
            ended_on_sol: Some(300),
            end_reason: Some("death".to_owned()),
        };
        let relationship = Relationship::try_from(row).unwrap();
        assert_eq!(relationship.kind, RelationshipKind::Heterosexual);
        assert_eq!(relationship.end_reason, Some(RelationshipEnd::Death));
        assert!(!relationship.is_active());
    }

    #[test]
    fn bad_sex_names_the_column() {
        let row = ColonistRow {
            colonist_id: Uuid::now_v7(),
            sex: "Female".to_owned(),
            orientation: "heterosexual".to_owned(),
            origin: "astronaut".to_owned(),
            birth_sol: -9_000,
            life_expectancy_sols: 30_000,
            parent_a: None,
            parent_b: None,
            relationship_id: None,
            died_on_sol: None,
            generation: 0,
        };
        assert!(matches!(
            Colonist::try_from(row),
            Err(DbError::Decode { column: "sex", .. })
        ));
    }

    fn colonist(n: u8) -> Colonist {
        Colonist {
            id: ColonistId::from_random_bytes([n; 16]),
            sex: Sex::Male,
            orientation: Orientation::Heterosexual,
            origin: Origin::Astronaut,
            birth_sol: -12_000,
            life_expectancy_sols: 30_000,
            parent_a: None,
            parent_b: None,
            relationship: None,
            died_on_sol: None,
            generation: 0,
        }
    }

    #[test]
    fn colonist_columns_continue_the_ordinal() {
        let chunk = [colonist(1), colonist(2), colonist(3)];
        let cols = ColonistColumns::from_chunk(BATCH_SIZE, &chunk).unwrap();
        let expected: Vec<i64> = (BATCH_SIZE..BATCH_SIZE.saturating_add(3))
            .map(|i| i64::try_from(i).unwrap())
            .collect();
        assert_eq!(cols.ordinals, expected);
        assert_eq!(cols.ids.len(), 3);
        assert_eq!(cols.sexes, vec!["male"; 3]);
        assert_eq!(cols.parent_as, vec![None; 3]);
    }

    #[test]
    fn relationship_columns_keep_end_reasons() {
        let chunk = [Relationship {
            id: RelationshipId::from_random_bytes([9; 16]),
            partner_a: ColonistId::from_random_bytes([1; 16]),
            partner_b: ColonistId::from_random_bytes([2; 16]),
            kind: RelationshipKind::Heterosexual,
            started_on_sol: 10,
            duration_sols: 500,
            children: 1,
            next_birth_sol: 900,
            ended_on_sol: Some(300),
            end_reason: Some(RelationshipEnd::Death),
        }];
        let cols = RelationshipColumns::from_chunk(0, &chunk).unwrap();
        assert_eq!(cols.ordinals, vec![0]);
        assert_eq!(cols.end_reasons, vec![Some("death".to_owned())]);
        assert_eq!(cols.children, vec![1]);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn ordinal_overflow_is_an_error() {
        assert!(matches!(
            ordinal(usize::MAX),
            Err(DbError::OrdinalOverflow { index: usize::MAX })
        ));
        let cols = ColonistColumns::from_chunk(usize::MAX, &[colonist(1)]);
        assert!(matches!(cols, Err(DbError::OrdinalOverflow { .. })));
    }
}
