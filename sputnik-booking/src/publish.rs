use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use sputnik_core::events::{EventSink, RidePublishedEvent};
use sputnik_core::repository::{RideBundle, RideRepository};
use sputnik_core::{CoreError, Leg, Ride, RideStatus, Waypoint};
use sputnik_route::RouteChain;

/// Validates and persists a new ride with its chain, all-or-nothing.
///
/// A ride, its waypoints and its neighbor legs are created together and are
/// immutable afterwards; a chain that fails validation never reaches storage.
pub struct RidePublisher {
    rides: Arc<dyn RideRepository>,
    events: Arc<dyn EventSink>,
    max_waypoints_per_ride: usize,
}

impl RidePublisher {
    pub fn new(
        rides: Arc<dyn RideRepository>,
        events: Arc<dyn EventSink>,
        max_waypoints_per_ride: usize,
    ) -> Self {
        Self {
            rides,
            events,
            max_waypoints_per_ride,
        }
    }

    pub async fn publish(
        &self,
        mut ride: Ride,
        waypoints: Vec<Waypoint>,
        neighbor_legs: Vec<Leg>,
    ) -> Result<Ride, CoreError> {
        ride.status = RideStatus::Published;

        // Validation also normalizes the waypoint order for storage.
        let chain = RouteChain::new(
            ride.clone(),
            waypoints,
            neighbor_legs,
            self.max_waypoints_per_ride,
        )
        .map_err(|e| CoreError::ValidationError(e.to_string()))?;

        let bundle = RideBundle {
            ride: ride.clone(),
            waypoints: chain.waypoints().to_vec(),
            legs: chain.neighbor_legs().to_vec(),
        };
        self.rides
            .create_ride(&bundle)
            .await
            .map_err(|e| CoreError::InternalError(e.to_string()))?;

        info!(ride_id = %ride.id, waypoints = bundle.waypoints.len(), "ride published");

        let event = RidePublishedEvent {
            ride_id: ride.id,
            author_id: ride.author_id,
            waypoint_count: bundle.waypoints.len(),
            published_at: Utc::now().timestamp(),
        };
        if let Ok(payload) = serde_json::to_string(&event) {
            let _ = self
                .events
                .publish("rides.published", &ride.id.to_string(), &payload)
                .await;
        }

        Ok(ride)
    }
}
