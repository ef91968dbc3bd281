use crate::entity::{EntityId, TrackedEntity};
use crate::protocol::PortConnection;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;


/// Validated contents of one inbound batch
#[derive(Clone, Debug, Default)]
pub struct ParsedBatch {
    pub entities: Vec<TrackedEntity>,

    /// Records dropped because they could not be keyed
    pub rejected: usize,
}

impl ParsedBatch {
    /// Validate raw wire records one by one.
    ///
    /// A record that cannot become an entity is counted and skipped; the rest
    /// of the batch is unaffected.
    pub fn from_records(records: &[Value], now: DateTime<Utc>) -> Self {
        let mut batch = ParsedBatch::default();

        for record in records {
            match TrackedEntity::from_record(record, now) {
                Ok(entity) => batch.entities.push(entity),
                Err(e) => {
                    debug!(error = %e, "Skipping vessel record");
                    batch.rejected += 1;
                }
            }
        }

        batch
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// What changed when a batch was applied
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Entities tracked after the replace
    pub total: usize,

    /// Entities that can be drawn
    pub renderable: usize,

    /// Entities new or changed compared to the previous snapshot
    pub changed: usize,

    /// Entities from the previous snapshot that are gone
    pub removed: usize,
}

impl BatchOutcome {
    /// Tracked entities without usable coordinates
    pub fn unmappable(&self) -> usize {
        self.total - self.renderable
    }
}

/// The authoritative set of currently-known entities
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    entities: HashMap<EntityId, TrackedEntity>,
    port_connections: Vec<PortConnection>,
    last_updated: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole entity set with `batch`.
    ///
    /// Entities whose fields did not change keep their previous
    /// `last_updated`. Duplicate ids within a batch resolve to the last one.
    pub fn replace_with(&mut self, batch: ParsedBatch, now: DateTime<Utc>) -> BatchOutcome {
        let mut next: HashMap<EntityId, TrackedEntity> =
            HashMap::with_capacity(batch.entities.len());
        for entity in batch.entities {
            next.insert(entity.id.clone(), entity);
        }

        let mut changed = 0;
        for entity in next.values_mut() {
            match self.entities.get(&entity.id) {
                Some(previous) if previous.same_fields(entity) => {
                    entity.last_updated = previous.last_updated;
                }
                _ => {
                    entity.last_updated = now;
                    changed += 1;
                }
            }
        }

        let removed = self
            .entities
            .keys()
            .filter(|id| !next.contains_key(*id))
            .count();

        self.entities = next;
        self.last_updated = Some(now);

        BatchOutcome {
            total: self.entities.len(),
            renderable: self.entities.values().filter(|e| e.is_mappable()).count(),
            changed,
            removed,
        }
    }

    pub fn set_port_connections(&mut self, connections: Vec<PortConnection>) {
        self.port_connections = connections;
    }

    /// Mappable entities, ordered by id
    pub fn renderable(&self) -> Vec<TrackedEntity> {
        let mut vessels: Vec<TrackedEntity> = self
            .entities
            .values()
            .filter(|e| e.is_mappable())
            .cloned()
            .collect();
        vessels.sort_by(|a, b| a.id.cmp(&b.id));
        vessels
    }

    /// Every tracked entity, mappable or not
    pub fn raw_count(&self) -> usize {
        self.entities.len()
    }

    pub fn get(&self, id: &EntityId) -> Option<&TrackedEntity> {
        self.entities.get(id)
    }

    pub fn port_connections(&self) -> &[PortConnection] {
        &self.port_connections
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// Read-only copy for consumers
    pub fn view(&self) -> SnapshotView {
        SnapshotView {
            vessels: self.renderable(),
            port_connections: self.port_connections.clone(),
            raw_count: self.raw_count(),
            last_updated: self.last_updated,
        }
    }
}

/// Consumer copy of the snapshot
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotView {
    /// Renderable entities only
    pub vessels: Vec<TrackedEntity>,
    pub port_connections: Vec<PortConnection>,
    pub raw_count: usize,
    pub last_updated: Option<DateTime<Utc>>,
}
