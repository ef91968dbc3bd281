use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub mod validation;

pub use validation::{is_mappable, parse_heading, parse_number, parse_speed};


/// Stable identifier of a tracked entity.
///
/// Upstream systems use either numeric database ids or string keys (MMSI,
/// IMO, slugs). Both are kept as-is; `1` and `"1"` are different ids.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Number(i64),
    Text(String),
}

impl EntityId {
    /// Extract an id from a JSON value. Empty strings and non-scalar values
    /// are not ids.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(EntityId::Number(i)),
                None => Some(EntityId::Text(n.to_string())),
            },
            Value::String(s) if !s.trim().is_empty() => Some(EntityId::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Number(n) => write!(f, "{}", n),
            EntityId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        EntityId::Number(id)
    }
}

impl From<i32> for EntityId {
    fn from(id: i32) -> Self {
        EntityId::Number(i64::from(id))
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        EntityId::Text(id.to_string())
    }
}

/// Fields consumed into typed attributes. Everything else lands in `extra`.
const KNOWN_FIELDS: &[&str] = &[
    "id",
    "currentLat",
    "lat",
    "latitude",
    "currentLng",
    "lng",
    "lon",
    "longitude",
    "speed",
    "heading",
    "course",
    "status",
    "name",
    "region",
    "lastUpdated",
];

/// One live-tracked object (a vessel).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedEntity {
    pub id: EntityId,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Latitude in decimal degrees
    #[serde(rename = "currentLat")]
    pub lat: Option<f64>,

    /// Longitude in decimal degrees
    #[serde(rename = "currentLng")]
    pub lng: Option<f64>,

    /// Speed over ground, never negative
    pub speed: Option<f64>,

    /// Heading in degrees, normalised into [0, 360)
    pub heading: Option<f64>,

    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Non-positional attributes passed through verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,

    pub last_updated: DateTime<Utc>,
}

/// Why an inbound record could not become a [`TrackedEntity`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordError {
    NotAnObject,
    MissingId,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::NotAnObject => write!(f, "record must be a JSON object"),
            RecordError::MissingId => write!(f, "record has no usable id"),
        }
    }
}

impl std::error::Error for RecordError {}

impl TrackedEntity {
    /// Create an entity with a position and nothing else.
    pub fn new(id: impl Into<EntityId>, lat: Option<f64>, lng: Option<f64>) -> Self {
        Self {
            id: id.into(),
            name: None,
            lat,
            lng,
            speed: None,
            heading: None,
            status: None,
            region: None,
            extra: Map::new(),
            last_updated: Utc::now(),
        }
    }

    /// Build an entity from a loosely-typed wire record.
    ///
    /// Coordinates may be numbers or numeric strings under several common
    /// names. Values that do not parse are stored as `None`; the record is
    /// kept so it still counts toward the raw total.
    pub fn from_record(record: &Value, now: DateTime<Utc>) -> Result<Self, RecordError> {
        let fields = record.as_object().ok_or(RecordError::NotAnObject)?;

        let id = fields
            .get("id")
            .and_then(EntityId::from_value)
            .ok_or(RecordError::MissingId)?;

        let lat = validation::first_present(fields, &["currentLat", "lat", "latitude"])
            .and_then(parse_number);
        let lng = validation::first_present(fields, &["currentLng", "lng", "lon", "longitude"])
            .and_then(parse_number);
        let speed = fields.get("speed").and_then(parse_speed);
        let heading = validation::first_present(fields, &["heading", "course"])
            .and_then(parse_heading);

        let extra = fields
            .iter()
            .filter(|(key, _)| !KNOWN_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(Self {
            id,
            name: string_field(fields, "name"),
            lat,
            lng,
            speed,
            heading,
            status: string_field(fields, "status"),
            region: string_field(fields, "region"),
            extra,
            last_updated: now,
        })
    }

    /// Whether this entity can be placed on a map.
    pub fn is_mappable(&self) -> bool {
        is_mappable(self.lat, self.lng)
    }

    /// Field-wise equality ignoring the freshness timestamp.
    pub fn same_fields(&self, other: &TrackedEntity) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.lat == other.lat
            && self.lng == other.lng
            && self.speed == other.speed
            && self.heading == other.heading
            && self.status == other.status
            && self.region == other.region
            && self.extra == other.extra
    }
}

fn string_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
}
