use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A priced directed pair of waypoints.
///
/// Legs with `joins_neighbors` connect chain-adjacent waypoints and carry the
/// base segment prices; manual legs are explicit overrides (or cached derived
/// prices) for any ordered pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leg {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub from_waypoint_id: Uuid,
    pub to_waypoint_id: Uuid,
    /// Whole rubles
    pub price_rub: i64,
    pub is_manual: bool,
    pub joins_neighbors: bool,
}

impl Leg {
    /// Base segment between two adjacent waypoints.
    pub fn neighbor(ride_id: Uuid, from: Uuid, to: Uuid, price_rub: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            ride_id,
            from_waypoint_id: from,
            to_waypoint_id: to,
            price_rub,
            is_manual: false,
            joins_neighbors: true,
        }
    }

    /// Explicit price for an arbitrary ordered pair.
    pub fn manual(ride_id: Uuid, from: Uuid, to: Uuid, price_rub: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            ride_id,
            from_waypoint_id: from,
            to_waypoint_id: to,
            price_rub,
            is_manual: true,
            joins_neighbors: false,
        }
    }
}
