use crate::entity::{EntityId, TrackedEntity};
use anyhow::{Context, Result};
use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Mutation notification sent to push sessions
#[derive(Clone, Debug, PartialEq)]
pub enum FleetChange {
    Upserted(EntityId),
    Removed(EntityId),
}

/// Result of ingesting a batch of raw records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestOutcome {
    pub accepted: usize,
    pub rejected: usize,
}

/// Which slice of the fleet a reader wants
#[derive(Debug, Clone, PartialEq)]
pub struct VesselQuery {
    pub region: String,
    pub page: u32,
    pub page_size: u32,
    pub load_all: bool,
}

impl VesselQuery {
    pub fn region(region: impl Into<String>, page_size: u32) -> Self {
        Self {
            region: region.into(),
            page: 1,
            page_size,
            load_all: false,
        }
    }
}

/// Whether `region` selects everything
pub fn is_global(region: &str) -> bool {
    let region = region.trim();
    region.is_empty() || region.eq_ignore_ascii_case("global")
}

/// In-memory fleet backing the reference server
pub struct FleetStore {
    /// Lock-free concurrent map for fast reads
    vessels: Arc<DashMap<EntityId, TrackedEntity>>,

    /// Broadcast channel for fleet mutations
    change_tx: broadcast::Sender<FleetChange>,
}

impl FleetStore {
    pub fn new() -> Self {
        let (change_tx, _) = broadcast::channel(1000);
        Self {
            vessels: Arc::new(DashMap::new()),
            change_tx,
        }
    }

    /// Insert or replace a vessel.
    ///
    /// Returns false (and broadcasts nothing) when nothing changed.
    pub fn upsert(&self, mut entity: TrackedEntity) -> bool {
        let id = entity.id.clone();

        if let Some(existing) = self.vessels.get(&id) {
            if existing.same_fields(&entity) {
                return false;
            }
        }

        entity.last_updated = Utc::now();
        self.vessels.insert(id.clone(), entity);
        let _ = self.change_tx.send(FleetChange::Upserted(id));
        true
    }

    /// Validate and upsert raw wire records
    pub fn ingest(&self, records: &[Value]) -> IngestOutcome {
        let now = Utc::now();
        let mut outcome = IngestOutcome::default();

        for record in records {
            match TrackedEntity::from_record(record, now) {
                Ok(entity) => {
                    self.upsert(entity);
                    outcome.accepted += 1;
                }
                Err(e) => {
                    debug!(error = %e, "Rejected vessel record");
                    outcome.rejected += 1;
                }
            }
        }

        outcome
    }

    pub fn remove(&self, id: &EntityId) -> Option<TrackedEntity> {
        let removed = self.vessels.remove(id).map(|(_, entity)| entity);

        if removed.is_some() {
            let _ = self.change_tx.send(FleetChange::Removed(id.clone()));
            info!(vessel_id = %id, "Vessel removed");
        }

        removed
    }

    pub fn get(&self, id: &EntityId) -> Option<TrackedEntity> {
        self.vessels.get(id).map(|e| e.clone())
    }

    /// All vessels, ordered by id
    pub fn all(&self) -> Vec<TrackedEntity> {
        let mut vessels: Vec<TrackedEntity> =
            self.vessels.iter().map(|e| e.value().clone()).collect();
        vessels.sort_by(|a, b| a.id.cmp(&b.id));
        vessels
    }

    pub fn len(&self) -> usize {
        self.vessels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vessels.is_empty()
    }

    /// Vessels matching the query's region, one page of them unless
    /// `load_all` is set. Pages are 1-based over id order.
    pub fn query(&self, query: &VesselQuery) -> Vec<TrackedEntity> {
        let matching = self.all().into_iter().filter(|vessel| {
            is_global(&query.region)
                || vessel
                    .region
                    .as_deref()
                    .is_some_and(|r| r.eq_ignore_ascii_case(query.region.trim()))
        });

        if query.load_all {
            return matching.collect();
        }

        let page_size = query.page_size as usize;
        let skip = (query.page.max(1) as usize - 1).saturating_mul(page_size);
        matching.skip(skip).take(page_size).collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FleetChange> {
        self.change_tx.subscribe()
    }

    /// Load a JSON array of vessel records (or `{ "vessels": [...] }`)
    pub fn load_seed_file(&self, path: &Path) -> Result<IngestOutcome> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed file {}", path.display()))?;
        let value: Value = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse seed file {}", path.display()))?;

        let records = match value {
            Value::Array(records) => records,
            Value::Object(mut map) => match map.remove("vessels") {
                Some(Value::Array(records)) => records,
                _ => anyhow::bail!("Seed file {} has no vessels array", path.display()),
            },
            _ => anyhow::bail!("Seed file {} must contain an array", path.display()),
        };

        let outcome = self.ingest(&records);
        info!(
            path = %path.display(),
            accepted = outcome.accepted,
            rejected = outcome.rejected,
            "Loaded seed vessels"
        );
        Ok(outcome)
    }
}

impl Default for FleetStore {
    fn default() -> Self {
        Self::new()
    }
}
