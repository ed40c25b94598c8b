//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings; enums are stored under their serde
//! names so the database reads the same as the JSON API.

use chrono::{DateTime, Utc};
use dataprod_core::{
  lifecycle::LifecycleState,
  resource::{
    Association, AssociationId, Predicate, Resource, ResourceId, ResourceType, Revision,
  },
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

// ─── ResourceType ────────────────────────────────────────────────────────────

pub fn encode_resource_type(t: ResourceType) -> &'static str {
  match t {
    ResourceType::DataProduct => "data_product",
    ResourceType::DataProductVersion => "data_product_version",
    ResourceType::Stream => "stream",
    ResourceType::StreamDefinition => "stream_definition",
    ResourceType::Dataset => "dataset",
    ResourceType::DataProducer => "data_producer",
    ResourceType::IngestionConfiguration => "ingestion_configuration",
  }
}

pub fn decode_resource_type(s: &str) -> Result<ResourceType> {
  match s {
    "data_product" => Ok(ResourceType::DataProduct),
    "data_product_version" => Ok(ResourceType::DataProductVersion),
    "stream" => Ok(ResourceType::Stream),
    "stream_definition" => Ok(ResourceType::StreamDefinition),
    "dataset" => Ok(ResourceType::Dataset),
    "data_producer" => Ok(ResourceType::DataProducer),
    "ingestion_configuration" => Ok(ResourceType::IngestionConfiguration),
    other => Err(Error::Decode { column: "type_", value: other.to_owned() }),
  }
}

// ─── LifecycleState ──────────────────────────────────────────────────────────

pub fn encode_lcstate(s: LifecycleState) -> &'static str { s.as_str() }

pub fn decode_lcstate(s: &str) -> Result<LifecycleState> {
  match s {
    "DRAFT" => Ok(LifecycleState::Draft),
    "PLANNED" => Ok(LifecycleState::Planned),
    "DEVELOPED" => Ok(LifecycleState::Developed),
    "INTEGRATED" => Ok(LifecycleState::Integrated),
    "DEPLOYED" => Ok(LifecycleState::Deployed),
    "ACTIVE" => Ok(LifecycleState::Active),
    "RETIRED" => Ok(LifecycleState::Retired),
    "DELETED" => Ok(LifecycleState::Deleted),
    other => Err(Error::Decode { column: "lcstate", value: other.to_owned() }),
  }
}

// ─── Predicate ───────────────────────────────────────────────────────────────

pub fn encode_predicate(p: Predicate) -> &'static str {
  match p {
    Predicate::HasVersion => "hasVersion",
    Predicate::HasStream => "hasStream",
    Predicate::HasStreamDefinition => "hasStreamDefinition",
    Predicate::HasOutputProduct => "hasOutputProduct",
    Predicate::HasInputProduct => "hasInputProduct",
    Predicate::HasDataset => "hasDataset",
    Predicate::HasDataProducer => "hasDataProducer",
    Predicate::PersistsStream => "persistsStream",
  }
}

pub fn decode_predicate(s: &str) -> Result<Predicate> {
  match s {
    "hasVersion" => Ok(Predicate::HasVersion),
    "hasStream" => Ok(Predicate::HasStream),
    "hasStreamDefinition" => Ok(Predicate::HasStreamDefinition),
    "hasOutputProduct" => Ok(Predicate::HasOutputProduct),
    "hasInputProduct" => Ok(Predicate::HasInputProduct),
    "hasDataset" => Ok(Predicate::HasDataset),
    "hasDataProducer" => Ok(Predicate::HasDataProducer),
    "persistsStream" => Ok(Predicate::PersistsStream),
    other => Err(Error::Decode { column: "predicate", value: other.to_owned() }),
  }
}

// ─── Resource body ───────────────────────────────────────────────────────────

pub fn encode_body(resource: &Resource) -> Result<String> {
  Ok(serde_json::to_string(resource)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `resources` row.
pub struct RawResource {
  pub resource_id: String,
  pub lcstate:     String,
  pub rev:         i64,
  pub body_json:   String,
}

impl RawResource {
  pub const COLUMNS: &'static str = "resource_id, lcstate, rev, body_json";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      resource_id: row.get(0)?,
      lcstate:     row.get(1)?,
      rev:         row.get(2)?,
      body_json:   row.get(3)?,
    })
  }

  /// Decode the body and overlay the authoritative id, revision and state
  /// columns.
  pub fn into_resource(self) -> Result<Resource> {
    let mut resource: Resource = serde_json::from_str(&self.body_json)?;
    let rev = u64::try_from(self.rev)
      .map_err(|_| Error::Decode { column: "rev", value: self.rev.to_string() })?;
    resource.set_identity(ResourceId::new(self.resource_id), Revision(rev));
    resource.set_lcstate(decode_lcstate(&self.lcstate)?);
    Ok(resource)
  }
}

/// Raw values read directly from an `associations` row.
pub struct RawAssociation {
  pub association_id: String,
  pub subject_id:     String,
  pub predicate:      String,
  pub object_id:      String,
  pub object_type:    String,
}

impl RawAssociation {
  pub const COLUMNS: &'static str =
    "association_id, subject_id, predicate, object_id, object_type";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      association_id: row.get(0)?,
      subject_id:     row.get(1)?,
      predicate:      row.get(2)?,
      object_id:      row.get(3)?,
      object_type:    row.get(4)?,
    })
  }

  pub fn into_association(self) -> Result<Association> {
    Ok(Association {
      id:          AssociationId::new(self.association_id),
      subject:     ResourceId::new(self.subject_id),
      predicate:   decode_predicate(&self.predicate)?,
      object:      ResourceId::new(self.object_id),
      object_type: decode_resource_type(&self.object_type)?,
    })
  }
}
