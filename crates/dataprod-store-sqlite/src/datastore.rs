//! [`SqliteDatastore`] — a named key-value datastore in the
//! `datastore_entries` table.

use chrono::Utc;
use dataprod_core::clients::Datastore;
use rusqlite::OptionalExtension as _;

use crate::{Error, Result, encode::encode_dt};

/// Handle on one named datastore. Obtained from
/// [`SqliteStore::get_datastore`](dataprod_core::clients::Datastores::get_datastore).
#[derive(Clone)]
pub struct SqliteDatastore {
  conn: tokio_rusqlite::Connection,
  name: String,
}

impl SqliteDatastore {
  pub(crate) fn new(conn: tokio_rusqlite::Connection, name: &str) -> Self {
    Self { conn, name: name.to_owned() }
  }

  pub fn name(&self) -> &str { &self.name }
}

impl Datastore for SqliteDatastore {
  type Error = Error;

  async fn read(&self, key: &str) -> Result<Option<serde_json::Value>> {
    let name = self.name.clone();
    let key  = key.to_owned();

    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT value_json FROM datastore_entries WHERE datastore = ?1 AND key = ?2",
            rusqlite::params![name, key],
            |row| row.get(0),
          )
          .optional()?)
      })
      .await?;

    raw
      .map(|s| serde_json::from_str(&s).map_err(Error::from))
      .transpose()
  }

  async fn write(&self, key: &str, value: serde_json::Value) -> Result<()> {
    let name       = self.name.clone();
    let key        = key.to_owned();
    let value_json = value.to_string();
    let now        = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO datastore_entries (datastore, key, value_json, updated_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (datastore, key)
           DO UPDATE SET value_json = excluded.value_json, updated_at = excluded.updated_at",
          rusqlite::params![name, key, value_json, now],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
