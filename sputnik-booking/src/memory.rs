use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use sputnik_core::repository::{
    ReservationStore, RideBundle, RideRepository, RouteSearchRepository,
};
use sputnik_core::{Leg, Reservation, ReservationError, RouteQuery, SegmentClaim};

#[derive(Default)]
struct State {
    rides: HashMap<Uuid, RideBundle>,
    reservations: HashMap<Uuid, Reservation>,
    claims: Vec<SegmentClaim>,
}

impl State {
    fn active_seats_on(&self, leg_id: Uuid) -> i32 {
        self.claims
            .iter()
            .filter(|claim| claim.leg_id == leg_id)
            .filter_map(|claim| self.reservations.get(&claim.reservation_id))
            .filter(|reservation| reservation.is_active())
            .map(|reservation| reservation.seats)
            .sum()
    }
}

/// In-memory backend implementing all three storage traits.
///
/// Booking takes a per-ride advisory lock for the whole check-then-write, so
/// two overlapping bookings on one ride are serialized while other rides
/// proceed. Doubles as the unit-test store.
pub struct MemoryStore {
    state: Mutex<State>,
    ride_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            ride_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn ride_lock(&self, ride_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.ride_locks.lock().await;
        locks
            .entry(ride_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RideRepository for MemoryStore {
    async fn create_ride(
        &self,
        bundle: &RideBundle,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut state = self.state.lock().await;
        state.rides.insert(bundle.ride.id, bundle.clone());
        Ok(())
    }

    async fn fetch_ride(
        &self,
        ride_id: Uuid,
    ) -> Result<Option<RideBundle>, Box<dyn std::error::Error + Send + Sync>> {
        let state = self.state.lock().await;
        Ok(state.rides.get(&ride_id).cloned())
    }

    async fn insert_leg(
        &self,
        leg: &Leg,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut state = self.state.lock().await;
        let bundle = state
            .rides
            .get_mut(&leg.ride_id)
            .ok_or_else(|| format!("ride {} not found", leg.ride_id))?;
        bundle.legs.push(leg.clone());
        Ok(())
    }
}

#[async_trait]
impl RouteSearchRepository for MemoryStore {
    async fn search_candidates(
        &self,
        query: &RouteQuery,
    ) -> Result<Vec<RideBundle>, Box<dyn std::error::Error + Send + Sync>> {
        let state = self.state.lock().await;
        let mut candidates = Vec::new();

        for bundle in state.rides.values() {
            let ride = &bundle.ride;
            if !query.statuses.is_empty() && !query.statuses.contains(&ride.status) {
                continue;
            }
            if !query.payment_methods.is_empty()
                && !ride
                    .payment_methods
                    .iter()
                    .any(|m| query.payment_methods.contains(m))
            {
                continue;
            }
            if !query.validation_methods.is_empty()
                && !query.validation_methods.contains(&ride.validation)
            {
                continue;
            }

            // Seed and extend over arrival order: some departure-side stop
            // must reach a later arrival-side stop.
            let mut ordered: Vec<_> = bundle.waypoints.iter().collect();
            ordered.sort_by_key(|w| w.arrives_at);
            let seed = ordered.iter().position(|w| match &query.departure {
                Some(filter) => filter.contains(&w.point),
                None => true,
            });
            let reachable = match seed {
                Some(start) => ordered.iter().skip(start + 1).any(|w| match &query.arrival {
                    Some(filter) => filter.contains(&w.point),
                    None => true,
                }),
                None => false,
            };
            if reachable {
                candidates.push(bundle.clone());
            }
        }

        Ok(candidates)
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn insert_reserved(
        &self,
        reservation: &Reservation,
        claimed_leg_ids: &[Uuid],
    ) -> Result<(), ReservationError> {
        let lock = self.ride_lock(reservation.ride_id).await;
        let _guard = lock.lock().await;

        let mut state = self.state.lock().await;
        let seats_total = state
            .rides
            .get(&reservation.ride_id)
            .map(|bundle| bundle.ride.seats_total)
            .ok_or_else(|| {
                ReservationError::NotFound(format!("ride {}", reservation.ride_id))
            })?;

        for leg_id in claimed_leg_ids {
            let available = seats_total - state.active_seats_on(*leg_id);
            if available < reservation.seats {
                return Err(ReservationError::Capacity {
                    leg_id: *leg_id,
                    requested: reservation.seats,
                    available,
                });
            }
        }

        state
            .reservations
            .insert(reservation.id, reservation.clone());
        state.claims.extend(claimed_leg_ids.iter().map(|leg_id| SegmentClaim {
            reservation_id: reservation.id,
            leg_id: *leg_id,
        }));
        Ok(())
    }

    async fn cancel(&self, reservation_id: Uuid) -> Result<Reservation, ReservationError> {
        let mut state = self.state.lock().await;
        let reservation = state
            .reservations
            .get_mut(&reservation_id)
            .ok_or_else(|| {
                ReservationError::NotFound(format!("reservation {}", reservation_id))
            })?;
        reservation.cancel();
        Ok(reservation.clone())
    }

    async fn fetch_reservation(
        &self,
        reservation_id: Uuid,
    ) -> Result<Option<Reservation>, ReservationError> {
        let state = self.state.lock().await;
        Ok(state.reservations.get(&reservation_id).cloned())
    }

    async fn seats_claimed(
        &self,
        leg_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, i32>, ReservationError> {
        let state = self.state.lock().await;
        let mut map = HashMap::new();
        for leg_id in leg_ids {
            let seats = state.active_seats_on(*leg_id);
            if seats > 0 {
                map.insert(*leg_id, seats);
            }
        }
        Ok(map)
    }
}
