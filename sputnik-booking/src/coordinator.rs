use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use sputnik_core::events::{EventSink, ReservationCanceledEvent, ReservationCreatedEvent};
use sputnik_core::repository::{ReservationStore, RideRepository};
use sputnik_core::{Leg, Reservation, ReservationError};
use sputnik_route::{derived_price, RouteChain};

use crate::capacity::claimed_segments;

/// Knobs for the booking write path.
#[derive(Debug, Clone)]
pub struct BookingRules {
    /// Upper bound on chain length, bounding the reconstruction walk
    pub max_waypoints_per_ride: usize,
    /// How many times a conflicted booking transaction is re-run
    pub retry_attempts: u32,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            max_waypoints_per_ride: 32,
            retry_attempts: 3,
        }
    }
}

/// Orchestrates booking and cancellation against the capacity accounting.
///
/// The coordinator validates and prices; the store executes the capacity
/// re-check and the reservation insert as one isolated unit.
pub struct ReservationCoordinator {
    rides: Arc<dyn RideRepository>,
    store: Arc<dyn ReservationStore>,
    events: Arc<dyn EventSink>,
    rules: BookingRules,
}

impl ReservationCoordinator {
    pub fn new(
        rides: Arc<dyn RideRepository>,
        store: Arc<dyn ReservationStore>,
        events: Arc<dyn EventSink>,
        rules: BookingRules,
    ) -> Self {
        Self {
            rides,
            store,
            events,
            rules,
        }
    }

    /// Book `seats` between two waypoints of a ride.
    pub async fn book(
        &self,
        ride_id: Uuid,
        passenger_id: Uuid,
        from_waypoint_id: Uuid,
        to_waypoint_id: Uuid,
        seats: i32,
    ) -> Result<Reservation, ReservationError> {
        if seats <= 0 {
            return Err(ReservationError::InvalidSpan(
                "seat count must be positive".into(),
            ));
        }

        let bundle = self
            .rides
            .fetch_ride(ride_id)
            .await
            .map_err(|e| ReservationError::Storage(e.to_string()))?
            .ok_or_else(|| ReservationError::NotFound(format!("ride {}", ride_id)))?;

        if !bundle.ride.is_bookable() {
            return Err(ReservationError::Unavailable(format!(
                "ride {} is {:?}",
                ride_id, bundle.ride.status
            )));
        }

        let chain = RouteChain::new(
            bundle.ride,
            bundle.waypoints,
            bundle.legs,
            self.rules.max_waypoints_per_ride,
        )
        .map_err(|e| ReservationError::Storage(format!("stored route is invalid: {}", e)))?;

        let from = chain.position(from_waypoint_id).ok_or_else(|| {
            ReservationError::InvalidSpan(format!(
                "waypoint {} is not on ride {}",
                from_waypoint_id, ride_id
            ))
        })?;
        let to = chain.position(to_waypoint_id).ok_or_else(|| {
            ReservationError::InvalidSpan(format!(
                "waypoint {} is not on ride {}",
                to_waypoint_id, ride_id
            ))
        })?;
        if from >= to {
            return Err(ReservationError::InvalidSpan(
                "departure must precede arrival".into(),
            ));
        }

        let leg = self.resolve_span_leg(&chain, from, to).await?;
        let claimed: Vec<Uuid> = claimed_segments(&chain, (from, to))
            .iter()
            .map(|segment| segment.id)
            .collect();

        let mut attempt = 0;
        loop {
            let reservation = Reservation::new(ride_id, passenger_id, seats, leg.id);
            match self.store.insert_reserved(&reservation, &claimed).await {
                Ok(()) => {
                    info!(
                        reservation_id = %reservation.id,
                        ride_id = %ride_id,
                        seats,
                        "reservation committed"
                    );
                    self.emit_created(&reservation).await;
                    return Ok(reservation);
                }
                Err(err) if err.is_retryable() && attempt < self.rules.retry_attempts => {
                    attempt += 1;
                    warn!(ride_id = %ride_id, attempt, "booking conflict, retrying");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Cancel a reservation; its segment claims stop counting immediately.
    pub async fn cancel(&self, reservation_id: Uuid) -> Result<(), ReservationError> {
        let reservation = self.store.cancel(reservation_id).await?;
        info!(reservation_id = %reservation_id, ride_id = %reservation.ride_id, "reservation canceled");

        let event = ReservationCanceledEvent {
            reservation_id: reservation.id,
            ride_id: reservation.ride_id,
            canceled_at: Utc::now().timestamp(),
        };
        if let Ok(payload) = serde_json::to_string(&event) {
            let _ = self
                .events
                .publish("reservations.canceled", &reservation.ride_id.to_string(), &payload)
                .await;
        }
        Ok(())
    }

    /// Reuse the stored leg for the exact span, or materialize a manual leg
    /// priced at the derived segment sum.
    async fn resolve_span_leg(
        &self,
        chain: &RouteChain,
        from: usize,
        to: usize,
    ) -> Result<Leg, ReservationError> {
        if let Some(existing) = chain.leg_for_span(from, to) {
            return Ok(existing.clone());
        }

        let leg = Leg::manual(
            chain.ride().id,
            chain.waypoint(from).id,
            chain.waypoint(to).id,
            derived_price(chain, from, to),
        );
        self.rides
            .insert_leg(&leg)
            .await
            .map_err(|e| ReservationError::Storage(e.to_string()))?;
        Ok(leg)
    }

    async fn emit_created(&self, reservation: &Reservation) {
        let event = ReservationCreatedEvent {
            reservation_id: reservation.id,
            ride_id: reservation.ride_id,
            passenger_id: reservation.passenger_id,
            leg_id: reservation.leg_id,
            seats: reservation.seats,
            created_at: reservation.created_at.timestamp(),
        };
        if let Ok(payload) = serde_json::to_string(&event) {
            let _ = self
                .events
                .publish("reservations.created", &reservation.ride_id.to_string(), &payload)
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use sputnik_core::repository::RideBundle;
    use sputnik_core::{GeoPoint, LogSink, Ride, RideStatus, Waypoint};

    use crate::memory::MemoryStore;

    struct Fixture {
        coordinator: ReservationCoordinator,
        store: Arc<MemoryStore>,
        ride_id: Uuid,
        waypoint_ids: Vec<Uuid>,
        neighbor_leg_ids: Vec<Uuid>,
    }

    /// Four stops A-B-C-D, capacity 3, neighbor prices 100/150/200.
    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());

        let mut ride = Ride::new(Uuid::new_v4(), 3);
        ride.status = RideStatus::Published;
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        let waypoints: Vec<Waypoint> = (0..4)
            .map(|i| {
                let arrives = start + Duration::hours(i as i64);
                let departs = if i == 3 { None } else { Some(arrives) };
                Waypoint::new(
                    ride.id,
                    GeoPoint::new(55.0 + i as f64, 37.0),
                    format!("stop {}", i),
                    arrives,
                    departs,
                )
            })
            .collect();
        let legs = vec![
            Leg::neighbor(ride.id, waypoints[0].id, waypoints[1].id, 100),
            Leg::neighbor(ride.id, waypoints[1].id, waypoints[2].id, 150),
            Leg::neighbor(ride.id, waypoints[2].id, waypoints[3].id, 200),
        ];

        let bundle = RideBundle {
            ride: ride.clone(),
            waypoints: waypoints.clone(),
            legs: legs.clone(),
        };
        RideRepository::create_ride(store.as_ref(), &bundle)
            .await
            .unwrap();

        let coordinator = ReservationCoordinator::new(
            store.clone(),
            store.clone(),
            Arc::new(LogSink),
            BookingRules::default(),
        );

        Fixture {
            coordinator,
            store,
            ride_id: ride.id,
            waypoint_ids: waypoints.iter().map(|w| w.id).collect(),
            neighbor_leg_ids: legs.iter().map(|l| l.id).collect(),
        }
    }

    #[tokio::test]
    async fn test_overlapping_bookings_respect_capacity() {
        let fx = fixture().await;
        let passenger_x = Uuid::new_v4();
        let passenger_y = Uuid::new_v4();

        // X takes two seats A -> C.
        fx.coordinator
            .book(fx.ride_id, passenger_x, fx.waypoint_ids[0], fx.waypoint_ids[2], 2)
            .await
            .unwrap();

        // Y wants two seats B -> D; segment B-C only has one left.
        let err = fx
            .coordinator
            .book(fx.ride_id, passenger_y, fx.waypoint_ids[1], fx.waypoint_ids[3], 2)
            .await
            .unwrap_err();
        match err {
            ReservationError::Capacity {
                leg_id,
                requested,
                available,
            } => {
                assert_eq!(leg_id, fx.neighbor_leg_ids[1]);
                assert_eq!(requested, 2);
                assert_eq!(available, 1);
            }
            other => panic!("unexpected error: {other}"),
        }

        // One seat still fits everywhere.
        fx.coordinator
            .book(fx.ride_id, passenger_y, fx.waypoint_ids[1], fx.waypoint_ids[3], 1)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_non_adjacent_booking_materializes_manual_leg() {
        let fx = fixture().await;
        let reservation = fx
            .coordinator
            .book(fx.ride_id, Uuid::new_v4(), fx.waypoint_ids[0], fx.waypoint_ids[3], 1)
            .await
            .unwrap();

        let bundle = RideRepository::fetch_ride(fx.store.as_ref(), fx.ride_id)
            .await
            .unwrap()
            .unwrap();
        let leg = bundle
            .legs
            .iter()
            .find(|l| l.id == reservation.leg_id)
            .unwrap();
        assert!(leg.is_manual);
        assert!(!leg.joins_neighbors);
        assert_eq!(leg.price_rub, 450);
    }

    #[tokio::test]
    async fn test_adjacent_booking_reuses_neighbor_leg() {
        let fx = fixture().await;
        let reservation = fx
            .coordinator
            .book(fx.ride_id, Uuid::new_v4(), fx.waypoint_ids[1], fx.waypoint_ids[2], 1)
            .await
            .unwrap();
        assert_eq!(reservation.leg_id, fx.neighbor_leg_ids[1]);
    }

    #[tokio::test]
    async fn test_cancellation_releases_capacity() {
        let fx = fixture().await;
        let passenger = Uuid::new_v4();

        let reservation = fx
            .coordinator
            .book(fx.ride_id, passenger, fx.waypoint_ids[0], fx.waypoint_ids[2], 3)
            .await
            .unwrap();

        // Fully booked on A-B and B-C.
        let err = fx
            .coordinator
            .book(fx.ride_id, passenger, fx.waypoint_ids[1], fx.waypoint_ids[3], 3)
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::Capacity { .. }));

        fx.coordinator.cancel(reservation.id).await.unwrap();
        let stored = fx
            .store
            .fetch_reservation(reservation.id)
            .await
            .unwrap()
            .unwrap();
        assert!(!stored.is_active());

        fx.coordinator
            .book(fx.ride_id, passenger, fx.waypoint_ids[1], fx.waypoint_ids[3], 3)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_invalid_span_rejected() {
        let fx = fixture().await;
        let passenger = Uuid::new_v4();

        // Backwards.
        let err = fx
            .coordinator
            .book(fx.ride_id, passenger, fx.waypoint_ids[2], fx.waypoint_ids[0], 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::InvalidSpan(_)));

        // Foreign waypoint.
        let err = fx
            .coordinator
            .book(fx.ride_id, passenger, Uuid::new_v4(), fx.waypoint_ids[3], 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::InvalidSpan(_)));

        // Zero seats.
        let err = fx
            .coordinator
            .book(fx.ride_id, passenger, fx.waypoint_ids[0], fx.waypoint_ids[1], 0)
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::InvalidSpan(_)));
    }

    #[tokio::test]
    async fn test_unknown_ride_rejected() {
        let fx = fixture().await;
        let err = fx
            .coordinator
            .book(Uuid::new_v4(), Uuid::new_v4(), fx.waypoint_ids[0], fx.waypoint_ids[1], 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_concurrent_bookings_never_oversell() {
        let fx = fixture().await;
        let coordinator = Arc::new(fx.coordinator);

        let mut handles = Vec::new();
        for _ in 0..10 {
            let coordinator = coordinator.clone();
            let ride_id = fx.ride_id;
            let from = fx.waypoint_ids[0];
            let to = fx.waypoint_ids[3];
            handles.push(tokio::spawn(async move {
                coordinator
                    .book(ride_id, Uuid::new_v4(), from, to, 1)
                    .await
            }));
        }

        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }
        assert_eq!(succeeded, 3);

        let claimed = fx
            .store
            .seats_claimed(&fx.neighbor_leg_ids)
            .await
            .unwrap();
        for leg_id in &fx.neighbor_leg_ids {
            assert!(claimed.get(leg_id).copied().unwrap_or(0) <= 3);
        }
    }
}
