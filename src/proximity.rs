//! Ports and nearest-port lookups for proximity tracking.

use crate::entity::{EntityId, TrackedEntity};
use crate::protocol::PortConnection;
use serde::{Deserialize, Serialize};
use serde_json::Map;

/// Mean Earth radius in nautical miles
const EARTH_RADIUS_NM: f64 = 3440.065;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub id: EntityId,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

/// Great-circle distance between two points, in nautical miles.
pub fn haversine_nm(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_NM * a.sqrt().min(1.0).asin()
}

#[derive(Debug, Clone, Default)]
pub struct PortRegistry {
    ports: Vec<Port>,
}

impl PortRegistry {
    pub fn new(ports: Vec<Port>) -> Self {
        Self { ports }
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Closest port within `radius_nm`, with its distance
    pub fn nearest(&self, lat: f64, lng: f64, radius_nm: f64) -> Option<(&Port, f64)> {
        self.ports
            .iter()
            .map(|port| (port, haversine_nm(lat, lng, port.lat, port.lng)))
            .filter(|(_, distance)| *distance <= radius_nm)
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// One connection per mappable vessel that has a port within `radius_nm`
    pub fn connections_for(&self, vessels: &[TrackedEntity], radius_nm: f64) -> Vec<PortConnection> {
        if self.ports.is_empty() || !radius_nm.is_finite() || radius_nm < 0.0 {
            return Vec::new();
        }

        vessels
            .iter()
            .filter_map(|vessel| match (vessel.lat, vessel.lng) {
                (Some(lat), Some(lng)) if vessel.is_mappable() => {
                    self.nearest(lat, lng, radius_nm).map(|(port, distance)| PortConnection {
                        vessel_id: vessel.id.clone(),
                        port_id: Some(port.id.clone()),
                        port_name: Some(port.name.clone()),
                        distance: Some((distance * 100.0).round() / 100.0),
                        extra: Map::new(),
                    })
                }
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> PortRegistry {
        PortRegistry::new(vec![
            Port {
                id: EntityId::Number(1),
                name: "Rotterdam".to_string(),
                lat: 51.95,
                lng: 4.14,
            },
            Port {
                id: EntityId::from("DEHAM"),
                name: "Hamburg".to_string(),
                lat: 53.54,
                lng: 9.98,
            },
        ])
    }

    #[test]
    fn test_haversine_known_distance() {
        // One degree of latitude is 60 nautical miles
        let d = haversine_nm(0.0, 0.0, 1.0, 0.0);
        assert!((d - 60.04).abs() < 0.1, "got {}", d);
        assert_eq!(haversine_nm(10.0, 20.0, 10.0, 20.0), 0.0);
    }

    #[test]
    fn test_nearest_within_radius() {
        let registry = registry();
        let (port, distance) = registry.nearest(52.0, 4.0, 50.0).unwrap();
        assert_eq!(port.name, "Rotterdam");
        assert!(distance < 10.0);

        assert!(registry.nearest(0.0, 0.0, 50.0).is_none());
    }

    #[test]
    fn test_connections_only_for_mappable_vessels_in_range() {
        let registry = registry();
        let vessels = vec![
            TrackedEntity::new(10, Some(53.5), Some(9.9)),
            TrackedEntity::new(11, Some(0.0), Some(0.0)),
            TrackedEntity::new(12, None, None),
        ];

        let connections = registry.connections_for(&vessels, 50.0);
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].vessel_id, EntityId::Number(10));
        assert_eq!(connections[0].port_name.as_deref(), Some("Hamburg"));
        assert_eq!(connections[0].port_id, Some(EntityId::from("DEHAM")));

        assert!(registry.connections_for(&vessels, -1.0).is_empty());
        assert!(PortRegistry::default().connections_for(&vessels, 50.0).is_empty());
    }
}
