use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;

/// A stop on a ride's route.
///
/// Waypoints of one ride are totally ordered by `(arrives_at, departs_at)`;
/// exactly one waypoint per ride has `departs_at == None` and it is the
/// terminus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waypoint {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub point: GeoPoint,
    pub full_name: String,
    pub arrives_at: DateTime<Utc>,
    pub departs_at: Option<DateTime<Utc>>,
}

impl Waypoint {
    pub fn new(
        ride_id: Uuid,
        point: GeoPoint,
        full_name: String,
        arrives_at: DateTime<Utc>,
        departs_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            ride_id,
            point,
            full_name,
            arrives_at,
            departs_at,
        }
    }

    pub fn is_terminus(&self) -> bool {
        self.departs_at.is_none()
    }
}
