use std::collections::HashMap;

use uuid::Uuid;

use sputnik_core::{Leg, ReservationError};
use sputnik_route::RouteChain;

/// Whether two ordered chain spans share at least one physical segment.
///
/// Spans are half-open position intervals `[from, to)` over segments, so
/// back-to-back spans (one ends where the other starts) do not intersect.
/// Covers the contained, containing and partial-overlap cases alike.
pub fn spans_intersect(a: (usize, usize), b: (usize, usize)) -> bool {
    a.0 < b.1 && b.0 < a.1
}

/// The neighbor legs a reservation over `span` physically occupies.
///
/// Only neighbor legs are tracked for capacity; a manual leg spanning
/// several stops is represented here by the base segments under it.
pub fn claimed_segments<'a>(chain: &'a RouteChain, span: (usize, usize)) -> Vec<&'a Leg> {
    chain
        .neighbor_legs()
        .iter()
        .enumerate()
        .filter(|(index, _)| spans_intersect((*index, *index + 1), span))
        .map(|(_, leg)| leg)
        .collect()
}

/// Seats-per-segment accounting for one ride.
///
/// Fed exclusively by active reservations; canceled reservations keep their
/// claim rows but are filtered out before this ledger is built.
#[derive(Debug, Default)]
pub struct CapacityLedger {
    claimed: HashMap<Uuid, i32>,
}

impl CapacityLedger {
    pub fn new(claimed: HashMap<Uuid, i32>) -> Self {
        Self { claimed }
    }

    /// Active seats claimed on a leg.
    pub fn seats_claimed(&self, leg_id: Uuid) -> i32 {
        self.claimed.get(&leg_id).copied().unwrap_or(0)
    }

    /// Seats still available on a leg against the advertised capacity.
    pub fn remaining(&self, seats_total: i32, leg_id: Uuid) -> i32 {
        seats_total - self.seats_claimed(leg_id)
    }

    /// Check every claimed leg and record the seats, or fail on the first
    /// leg that cannot take the requested count.
    pub fn try_claim(
        &mut self,
        seats_total: i32,
        leg_ids: &[Uuid],
        seats: i32,
    ) -> Result<(), ReservationError> {
        for leg_id in leg_ids {
            let available = self.remaining(seats_total, *leg_id);
            if available < seats {
                return Err(ReservationError::Capacity {
                    leg_id: *leg_id,
                    requested: seats,
                    available,
                });
            }
        }
        for leg_id in leg_ids {
            *self.claimed.entry(*leg_id).or_insert(0) += seats;
        }
        Ok(())
    }

    /// Give seats back after a cancellation.
    pub fn release(&mut self, leg_ids: &[Uuid], seats: i32) {
        for leg_id in leg_ids {
            if let Some(claimed) = self.claimed.get_mut(leg_id) {
                *claimed = (*claimed - seats).max(0);
            }
        }
    }
}

/// Free seats over a whole span: the tightest segment bounds the booking.
pub fn span_seats_left(chain: &RouteChain, span: (usize, usize), ledger: &CapacityLedger) -> i32 {
    let seats_total = chain.ride().seats_total;
    claimed_segments(chain, span)
        .iter()
        .map(|leg| ledger.remaining(seats_total, leg.id))
        .min()
        .unwrap_or(seats_total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use sputnik_core::{GeoPoint, Ride, Waypoint};

    fn four_stop_chain() -> RouteChain {
        let ride = Ride::new(Uuid::new_v4(), 3);
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
        RouteChain::new(ride, waypoints, legs, 10).unwrap()
    }

    #[test]
    fn test_span_intersection_cases() {
        // Contained, containing, partial overlap, disjoint, back-to-back.
        assert!(spans_intersect((1, 2), (0, 3)));
        assert!(spans_intersect((0, 3), (1, 2)));
        assert!(spans_intersect((0, 2), (1, 3)));
        assert!(!spans_intersect((0, 1), (2, 3)));
        assert!(!spans_intersect((0, 2), (2, 3)));
    }

    #[test]
    fn test_claimed_segments_for_prefix_span() {
        let chain = four_stop_chain();
        let claimed = claimed_segments(&chain, (0, 2));
        let prices: Vec<i64> = claimed.iter().map(|l| l.price_rub).collect();
        assert_eq!(prices, vec![100, 150]);
    }

    #[test]
    fn test_claimed_segments_for_full_span() {
        let chain = four_stop_chain();
        assert_eq!(claimed_segments(&chain, (0, 3)).len(), 3);
    }

    #[test]
    fn test_try_claim_reports_first_short_leg() {
        let chain = four_stop_chain();
        let mut ledger = CapacityLedger::default();
        let ab_bc: Vec<Uuid> = claimed_segments(&chain, (0, 2)).iter().map(|l| l.id).collect();
        let bc_cd: Vec<Uuid> = claimed_segments(&chain, (1, 3)).iter().map(|l| l.id).collect();

        ledger.try_claim(3, &ab_bc, 2).unwrap();
        let err = ledger.try_claim(3, &bc_cd, 2).unwrap_err();
        match err {
            ReservationError::Capacity {
                leg_id,
                requested,
                available,
            } => {
                assert_eq!(leg_id, chain.neighbor_leg(1).id);
                assert_eq!(requested, 2);
                assert_eq!(available, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_release_restores_capacity() {
        let chain = four_stop_chain();
        let mut ledger = CapacityLedger::default();
        let span: Vec<Uuid> = claimed_segments(&chain, (0, 3)).iter().map(|l| l.id).collect();

        ledger.try_claim(3, &span, 3).unwrap();
        assert_eq!(span_seats_left(&chain, (0, 3), &ledger), 0);
        ledger.release(&span, 3);
        assert_eq!(span_seats_left(&chain, (0, 3), &ledger), 3);
    }

    #[test]
    fn test_span_seats_left_takes_tightest_segment() {
        let chain = four_stop_chain();
        let mut ledger = CapacityLedger::default();
        let bc = vec![chain.neighbor_leg(1).id];
        ledger.try_claim(3, &bc, 2).unwrap();

        assert_eq!(span_seats_left(&chain, (0, 3), &ledger), 1);
        assert_eq!(span_seats_left(&chain, (2, 3), &ledger), 3);
    }
}
