use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::ReservationError;
use crate::leg::Leg;
use crate::reservation::Reservation;
use crate::ride::Ride;
use crate::search::RouteQuery;
use crate::waypoint::Waypoint;

/// A ride together with its waypoint chain and priced legs, as stored.
#[derive(Debug, Clone)]
pub struct RideBundle {
    pub ride: Ride,
    pub waypoints: Vec<Waypoint>,
    pub legs: Vec<Leg>,
}

/// Repository trait for ride/chain data access
#[async_trait]
pub trait RideRepository: Send + Sync {
    /// Persist a ride with its waypoints and neighbor legs, all-or-nothing.
    async fn create_ride(
        &self,
        bundle: &RideBundle,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn fetch_ride(
        &self,
        ride_id: Uuid,
    ) -> Result<Option<RideBundle>, Box<dyn std::error::Error + Send + Sync>>;

    /// Add a manual leg caching a derived price for an arbitrary pair.
    async fn insert_leg(
        &self,
        leg: &Leg,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Repository trait for the cheap pre-reconstruction search phase
#[async_trait]
pub trait RouteSearchRepository: Send + Sync {
    /// Rides passing the geography and ride-flag filters of `query`.
    ///
    /// Implementations prune with the seed-and-extend walk (a departure-side
    /// waypoint must reach an arrival-side waypoint through neighbor legs);
    /// price and time filtering happen after reconstruction.
    async fn search_candidates(
        &self,
        query: &RouteQuery,
    ) -> Result<Vec<RideBundle>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Storage half of the booking path.
///
/// `insert_reserved` is the atomic check-then-write: implementations must
/// re-check remaining capacity on every claimed leg and insert the
/// reservation plus its claim rows inside one isolated unit, or fail
/// without writing anything.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn insert_reserved(
        &self,
        reservation: &Reservation,
        claimed_leg_ids: &[Uuid],
    ) -> Result<(), ReservationError>;

    /// Flip to Canceled; returns the updated reservation.
    async fn cancel(&self, reservation_id: Uuid) -> Result<Reservation, ReservationError>;

    async fn fetch_reservation(
        &self,
        reservation_id: Uuid,
    ) -> Result<Option<Reservation>, ReservationError>;

    /// Active seats currently claimed per leg, for the given legs.
    ///
    /// Legs with no active claims may be absent from the map.
    async fn seats_claimed(
        &self,
        leg_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, i32>, ReservationError>;
}
