//! SQLite repository for blueprint aggregates
//!
//! The aggregate is stored as JSON next to its id, phase and
//! `resource_version`. Updates are a compare-and-swap on the version.

use async_trait::async_trait;
use reconciler_core::errors::ReconcileError;
use reconciler_core::model::BlueprintSpec;
use reconciler_core::ports::{BlueprintSpecRepository, ReconcileContext};
use rusqlite::{Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::db;
use crate::errors::{from_rusqlite, poisoned, serialization, Result};
use crate::migrations::apply_migrations;

/// One row of the spec table without its payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSummary {
    pub id: String,
    pub phase: String,
    pub resource_version: u64,
    pub updated_at: i64,
}

pub struct SqliteBlueprintSpecRepository {
    conn: Mutex<Connection>,
}

impl SqliteBlueprintSpecRepository {
    /// Wrap a connection, applying pending migrations
    pub fn new(mut conn: Connection) -> Result<Self> {
        apply_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = db::open(path)?;
        db::configure(&conn)?;
        Self::new(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::new(db::open_in_memory()?)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| poisoned("sqlite connection"))
    }

    /// All stored specs ordered by id
    pub fn list(&self) -> Result<Vec<SpecSummary>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, phase, resource_version, updated_at FROM blueprint_specs ORDER BY id",
            )
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(SpecSummary {
                    id: row.get(0)?,
                    phase: row.get(1)?,
                    resource_version: row.get::<_, i64>(2)? as u64,
                    updated_at: row.get(3)?,
                })
            })
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(rows)
    }

    fn load(&self, id: &str) -> Result<BlueprintSpec> {
        let conn = self.conn()?;
        let row: Option<(i64, String)> = conn
            .query_row(
                "SELECT resource_version, payload_json FROM blueprint_specs WHERE id = ?1",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(from_rusqlite)?;

        let (version, payload) = row.ok_or_else(|| {
            ReconcileError::not_found(id)
                .with_op("get_blueprint_spec")
                .with_message("blueprint spec not found")
        })?;

        let mut spec: BlueprintSpec =
            serde_json::from_str(&payload).map_err(|e| serialization("get_blueprint_spec", e))?;
        spec.resource_version = version as u64;
        Ok(spec)
    }

    fn store(&self, spec: &mut BlueprintSpec) -> Result<()> {
        let next_version = spec.resource_version + 1;
        let payload =
            serde_json::to_string(spec).map_err(|e| serialization("update_blueprint_spec", e))?;
        let now = chrono::Utc::now().timestamp();

        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE blueprint_specs
                 SET resource_version = ?1, phase = ?2, payload_json = ?3, updated_at = ?4
                 WHERE id = ?5 AND resource_version = ?6",
                rusqlite::params![
                    next_version as i64,
                    spec.phase.as_str(),
                    payload,
                    now,
                    spec.id,
                    spec.resource_version as i64,
                ],
            )
            .map_err(from_rusqlite)?;

        if changed == 0 {
            let exists: bool = conn
                .query_row(
                    "SELECT 1 FROM blueprint_specs WHERE id = ?1",
                    [&spec.id],
                    |_| Ok(true),
                )
                .optional()
                .map_err(from_rusqlite)?
                .unwrap_or(false);
            let err = if exists {
                ReconcileError::conflict(spec.id.clone()).with_message(format!(
                    "blueprint spec was modified concurrently (expected version {})",
                    spec.resource_version
                ))
            } else {
                ReconcileError::not_found(spec.id.clone()).with_message("blueprint spec not found")
            };
            return Err(err.with_op("update_blueprint_spec"));
        }

        spec.resource_version = next_version;
        Ok(())
    }

    fn insert(&self, spec: &mut BlueprintSpec) -> Result<()> {
        let version: u64 = 1;
        spec.resource_version = version;
        let payload =
            serde_json::to_string(spec).map_err(|e| serialization("create_blueprint_spec", e))?;
        let now = chrono::Utc::now().timestamp();

        let conn = self.conn()?;
        let result = conn.execute(
            "INSERT INTO blueprint_specs (id, resource_version, phase, payload_json, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            rusqlite::params![spec.id, version as i64, spec.phase.as_str(), payload, now],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                spec.resource_version = 0;
                Err(ReconcileError::conflict(spec.id.clone())
                    .with_op("create_blueprint_spec")
                    .with_message("blueprint spec already exists"))
            }
            Err(e) => {
                spec.resource_version = 0;
                Err(from_rusqlite(e))
            }
        }
    }
}

#[async_trait]
impl BlueprintSpecRepository for SqliteBlueprintSpecRepository {
    async fn get_by_id(&self, _ctx: &ReconcileContext, id: &str) -> Result<BlueprintSpec> {
        self.load(id)
    }

    async fn update(&self, _ctx: &ReconcileContext, spec: &mut BlueprintSpec) -> Result<()> {
        self.store(spec)
    }

    async fn create(&self, _ctx: &ReconcileContext, spec: &mut BlueprintSpec) -> Result<()> {
        self.insert(spec)
    }
}
