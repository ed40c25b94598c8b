//! [`SqliteStore`] — the SQLite implementation of [`ResourceRegistry`].

use std::path::Path;

use chrono::Utc;
use dataprod_core::{
  clients::Datastores,
  lifecycle::LifecycleState,
  registry::ResourceRegistry,
  resource::{
    Association, AssociationId, Predicate, Resource, ResourceFilter, ResourceId,
    ResourceType, Revision,
  },
};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Error, Result,
  datastore::SqliteDatastore,
  encode::{
    RawAssociation, RawResource, decode_resource_type, encode_body, encode_dt,
    encode_lcstate, encode_predicate, encode_resource_type,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A resource registry backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// Fresh registry id: a simple (unhyphenated) v4 UUID.
fn new_id() -> String { Uuid::new_v4().simple().to_string() }

// ─── ResourceRegistry impl ───────────────────────────────────────────────────

impl ResourceRegistry for SqliteStore {
  type Error = Error;

  // ── Resources ─────────────────────────────────────────────────────────────

  async fn create(&self, resource: Resource) -> Result<(ResourceId, Revision)> {
    let id_str   = new_id();
    let type_str = encode_resource_type(resource.resource_type());
    let name     = resource.name().to_owned();
    let lcstate  = encode_lcstate(resource.lcstate());
    let body     = encode_body(&resource)?;
    let now      = encode_dt(Utc::now());

    let insert_id = id_str.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO resources (
             resource_id, type_, name, lcstate, rev, created_at, updated_at, body_json
           ) VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5, ?6)",
          rusqlite::params![insert_id, type_str, name, lcstate, now, body],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(id = %id_str, type_ = type_str, "resource created");
    Ok((ResourceId::new(id_str), Revision(1)))
  }

  async fn read(&self, id: &ResourceId) -> Result<Option<Resource>> {
    let id_str = id.as_str().to_owned();

    let raw: Option<RawResource> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {} FROM resources WHERE resource_id = ?1", RawResource::COLUMNS),
            rusqlite::params![id_str],
            RawResource::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawResource::into_resource).transpose()
  }

  async fn update(&self, resource: Resource) -> Result<Revision> {
    let id  = resource.id().cloned().ok_or(Error::MissingIdentity("id"))?;
    let rev = resource.rev().ok_or(Error::MissingIdentity("revision"))?;
    let given_type = resource.resource_type();

    let id_str   = id.as_str().to_owned();
    let type_str = encode_resource_type(given_type);
    let rev_val  = rev.0 as i64;
    let name     = resource.name().to_owned();
    let body     = encode_body(&resource)?;
    let now      = encode_dt(Utc::now());

    // The row is only rewritten when both type and revision match; the
    // stored values are returned either way so the outcome can be reported.
    let stored: Option<(String, i64)> = self
      .conn
      .call(move |conn| {
        let stored: Option<(String, i64)> = conn
          .query_row(
            "SELECT type_, rev FROM resources WHERE resource_id = ?1",
            rusqlite::params![id_str],
            |row| Ok((row.get(0)?, row.get(1)?)),
          )
          .optional()?;

        if let Some((stored_type, stored_rev)) = &stored
          && stored_type == type_str
          && *stored_rev == rev_val
        {
          conn.execute(
            "UPDATE resources
             SET name = ?2, body_json = ?3, rev = rev + 1, updated_at = ?4
             WHERE resource_id = ?1 AND rev = ?5",
            rusqlite::params![id_str, name, body, now, rev_val],
          )?;
        }
        Ok(stored)
      })
      .await?;

    let (stored_type, stored_rev) = stored.ok_or_else(|| Error::ResourceNotFound(id.clone()))?;
    let stored_type = decode_resource_type(&stored_type)?;
    if stored_type != given_type {
      return Err(Error::TypeMismatch { id, stored: stored_type, given: given_type });
    }
    if stored_rev != rev_val {
      return Err(Error::RevisionConflict {
        id,
        expected: rev,
        actual: Revision(stored_rev as u64),
      });
    }
    Ok(Revision(rev.0 + 1))
  }

  async fn delete(&self, id: &ResourceId) -> Result<()> {
    let id_str = id.as_str().to_owned();

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM resources WHERE resource_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    if deleted == 0 {
      return Err(Error::ResourceNotFound(id.clone()));
    }
    tracing::debug!(%id, "resource deleted");
    Ok(())
  }

  async fn set_lifecycle_state(&self, id: &ResourceId, state: LifecycleState) -> Result<Revision> {
    let id_str  = id.as_str().to_owned();
    let lcstate = encode_lcstate(state);
    let now     = encode_dt(Utc::now());

    let rev: Option<i64> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "UPDATE resources SET lcstate = ?2, rev = rev + 1, updated_at = ?3
             WHERE resource_id = ?1
             RETURNING rev",
            rusqlite::params![id_str, lcstate, now],
            |row| row.get(0),
          )
          .optional()?)
      })
      .await?;

    rev
      .map(|r| Revision(r as u64))
      .ok_or_else(|| Error::ResourceNotFound(id.clone()))
  }

  async fn find_resources(
    &self,
    resource_type: ResourceType,
    filter:        &ResourceFilter,
  ) -> Result<Vec<Resource>> {
    let type_str   = encode_resource_type(resource_type);
    let name       = filter.name.clone();
    let lcstate    = filter.lcstate.map(encode_lcstate);
    let limit_val  = filter.limit.map(|l| l as i64).unwrap_or(-1);
    let offset_val = filter.offset.unwrap_or(0) as i64;

    let raws: Vec<RawResource> = self
      .conn
      .call(move |conn| {
        // Build WHERE clause dynamically; parameter numbers stay fixed.
        let mut conds = vec!["type_ = ?1"];
        if name.is_some() {
          conds.push("name = ?2");
        }
        if lcstate.is_some() {
          conds.push("lcstate = ?3");
        }

        let sql = format!(
          "SELECT {} FROM resources
           WHERE {}
           ORDER BY rowid
           LIMIT ?4 OFFSET ?5",
          RawResource::COLUMNS,
          conds.join(" AND "),
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![type_str, name.as_deref(), lcstate, limit_val, offset_val],
            RawResource::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawResource::into_resource).collect()
  }

  // ── Associations ──────────────────────────────────────────────────────────

  async fn create_association(
    &self,
    subject:   &ResourceId,
    predicate: Predicate,
    object:    &ResourceId,
  ) -> Result<AssociationId> {
    let assoc_id      = new_id();
    let insert_id     = assoc_id.clone();
    let subject_str   = subject.as_str().to_owned();
    let object_str    = object.as_str().to_owned();
    let predicate_str = encode_predicate(predicate);
    let now           = encode_dt(Utc::now());

    // Ok(Err(id)) reports which end of the edge does not exist.
    let outcome: std::result::Result<(), String> = self
      .conn
      .call(move |conn| {
        let subject_exists = conn
          .query_row(
            "SELECT 1 FROM resources WHERE resource_id = ?1",
            rusqlite::params![subject_str],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !subject_exists {
          return Ok(Err(subject_str));
        }

        let object_type: Option<String> = conn
          .query_row(
            "SELECT type_ FROM resources WHERE resource_id = ?1",
            rusqlite::params![object_str],
            |row| row.get(0),
          )
          .optional()?;
        let Some(object_type) = object_type else {
          return Ok(Err(object_str));
        };

        conn.execute(
          "INSERT INTO associations (
             association_id, subject_id, predicate, object_id, object_type, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![insert_id, subject_str, predicate_str, object_str, object_type, now],
        )?;
        Ok(Ok(()))
      })
      .await?;

    outcome.map_err(|missing| Error::ResourceNotFound(ResourceId::new(missing)))?;
    Ok(AssociationId::new(assoc_id))
  }

  async fn find_objects(
    &self,
    subject:     &ResourceId,
    predicate:   Predicate,
    object_type: Option<ResourceType>,
  ) -> Result<Vec<ResourceId>> {
    let subject_str   = subject.as_str().to_owned();
    let predicate_str = encode_predicate(predicate);
    let type_str      = object_type.map(encode_resource_type);

    let ids: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT object_id FROM associations
           WHERE subject_id = ?1 AND predicate = ?2
             AND (?3 IS NULL OR object_type = ?3)
           ORDER BY seq",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![subject_str, predicate_str, type_str], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(ids.into_iter().map(ResourceId::new).collect())
  }

  async fn find_associations(
    &self,
    subject:   &ResourceId,
    predicate: Predicate,
  ) -> Result<Vec<Association>> {
    let subject_str   = subject.as_str().to_owned();
    let predicate_str = encode_predicate(predicate);

    let raws: Vec<RawAssociation> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM associations
           WHERE subject_id = ?1 AND predicate = ?2
           ORDER BY seq",
          RawAssociation::COLUMNS,
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![subject_str, predicate_str], RawAssociation::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAssociation::into_association).collect()
  }

  async fn delete_association(&self, id: &AssociationId) -> Result<()> {
    let id_str = id.as_str().to_owned();

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM associations WHERE association_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    if deleted == 0 {
      return Err(Error::AssociationNotFound(id.clone()));
    }
    Ok(())
  }
}

// ─── Datastores impl ─────────────────────────────────────────────────────────

impl Datastores for SqliteStore {
  type Store = SqliteDatastore;

  async fn get_datastore(&self, name: &str) -> Result<SqliteDatastore> {
    Ok(SqliteDatastore::new(self.conn.clone(), name))
  }
}
