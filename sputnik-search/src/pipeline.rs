use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use sputnik_booking::{span_seats_left, CapacityLedger};
use sputnik_core::repository::{ReservationStore, RouteSearchRepository};
use sputnik_core::{RouteMatch, RouteQuery};
use sputnik_route::{reconstruct, RouteChain};

use crate::filter;
use crate::rank;

/// Knobs for the read path.
#[derive(Debug, Clone)]
pub struct SearchRules {
    pub max_waypoints_per_ride: usize,
    pub max_page_size: i64,
}

impl Default for SearchRules {
    fn default() -> Self {
        Self {
            max_waypoints_per_ride: 32,
            max_page_size: 50,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Invalid search filter: {0}")]
    InvalidFilter(String),

    #[error("Storage failure: {0}")]
    Storage(String),
}

/// The sub-route search pipeline.
///
/// Phase one (geography and ride flags) runs in the repository before
/// reconstruction; phase two (price, time windows, free seats) runs here,
/// after each candidate chain has been walked.
pub struct SearchService {
    routes: Arc<dyn RouteSearchRepository>,
    reservations: Arc<dyn ReservationStore>,
    rules: SearchRules,
}

impl SearchService {
    pub fn new(
        routes: Arc<dyn RouteSearchRepository>,
        reservations: Arc<dyn ReservationStore>,
        rules: SearchRules,
    ) -> Self {
        Self {
            routes,
            reservations,
            rules,
        }
    }

    pub async fn search(&self, query: &RouteQuery) -> Result<Vec<RouteMatch>, SearchError> {
        query
            .validate()
            .map_err(|e| SearchError::InvalidFilter(e.to_string()))?;

        let candidates = self
            .routes
            .search_candidates(query)
            .await
            .map_err(|e| SearchError::Storage(e.to_string()))?;

        let mut matches = Vec::new();
        for bundle in candidates {
            let ride_created_at = bundle.ride.created_at;
            let chain = match RouteChain::new(
                bundle.ride,
                bundle.waypoints,
                bundle.legs,
                self.rules.max_waypoints_per_ride,
            ) {
                Ok(chain) => chain,
                Err(e) => {
                    warn!(error = %e, "skipping ride with invalid stored route");
                    continue;
                }
            };

            let sub_routes = reconstruct(&chain, query.departure.as_ref());
            if sub_routes.is_empty() {
                continue;
            }

            let leg_ids: Vec<Uuid> = chain.neighbor_legs().iter().map(|leg| leg.id).collect();
            let claimed = self
                .reservations
                .seats_claimed(&leg_ids)
                .await
                .map_err(|e| SearchError::Storage(e.to_string()))?;
            let ledger = CapacityLedger::new(claimed);

            for sub in sub_routes {
                let from = chain.waypoint(sub.from_index);
                let to = chain.waypoint(sub.to_index);

                if let Some(arrival) = &query.arrival {
                    if !arrival.contains(&to.point) {
                        continue;
                    }
                }
                if !filter::price_in_bounds(query, sub.price_rub) {
                    continue;
                }
                if !filter::times_in_bounds(query, from, to) {
                    continue;
                }

                let span = (sub.from_index, sub.to_index);
                let seats_left = span_seats_left(&chain, span, &ledger);
                if seats_left < query.min_free_seats {
                    continue;
                }

                matches.push(RouteMatch {
                    ride_id: sub.ride_id,
                    from_waypoint: from.clone(),
                    to_waypoint: to.clone(),
                    price_rub: sub.price_rub,
                    priced_manually: sub.priced_manually,
                    seats_left,
                    departure_distance_km: query
                        .departure
                        .as_ref()
                        .map(|f| f.point.distance_km(&from.point)),
                    arrival_distance_km: query
                        .arrival
                        .as_ref()
                        .map(|f| f.point.distance_km(&to.point)),
                    ride_created_at,
                });
            }
        }

        rank::rank(&mut matches, query.sort);
        Ok(rank::paginate(
            matches,
            query.offset,
            query.limit,
            self.rules.max_page_size,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use sputnik_booking::MemoryStore;
    use sputnik_core::repository::{RideBundle, RideRepository};
    use sputnik_core::{
        GeoFilter, GeoPoint, Leg, Reservation, Ride, RideStatus, Waypoint,
    };

    const ORIGIN: GeoPoint = GeoPoint { lat: 55.0, lng: 37.0 };
    const DEST: GeoPoint = GeoPoint { lat: 56.0, lng: 37.0 };

    async fn seed_ride(store: &MemoryStore, prices: &[i64], created_offset_min: i64) -> RideBundle {
        let mut ride = Ride::new(Uuid::new_v4(), 3);
        ride.status = RideStatus::Published;
        ride.created_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
            + Duration::minutes(created_offset_min);

        let start = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        let count = prices.len() + 1;
        let step_lat = (DEST.lat - ORIGIN.lat) / (count - 1) as f64;
        let waypoints: Vec<Waypoint> = (0..count)
            .map(|i| {
                let arrives = start + Duration::hours(i as i64);
                let departs = if i == count - 1 { None } else { Some(arrives) };
                Waypoint::new(
                    ride.id,
                    GeoPoint::new(ORIGIN.lat + step_lat * i as f64, ORIGIN.lng),
                    format!("stop {}", i),
                    arrives,
                    departs,
                )
            })
            .collect();
        let legs: Vec<Leg> = prices
            .iter()
            .enumerate()
            .map(|(i, price)| Leg::neighbor(ride.id, waypoints[i].id, waypoints[i + 1].id, *price))
            .collect();

        let bundle = RideBundle {
            ride,
            waypoints,
            legs,
        };
        store.create_ride(&bundle).await.unwrap();
        bundle
    }

    fn service(store: Arc<MemoryStore>) -> SearchService {
        SearchService::new(store.clone(), store, SearchRules::default())
    }

    fn dest_query() -> RouteQuery {
        RouteQuery::anywhere_to(GeoFilter::new(DEST, 30.0))
    }

    #[tokio::test]
    async fn test_results_ranked_by_price() {
        let store = Arc::new(MemoryStore::new());
        seed_ride(&store, &[300], 0).await;
        seed_ride(&store, &[100], 1).await;
        seed_ride(&store, &[200], 2).await;

        let results = service(store).search(&dest_query()).await.unwrap();
        let prices: Vec<i64> = results.iter().map(|m| m.price_rub).collect();
        assert_eq!(prices, vec![100, 200, 300]);
    }

    #[tokio::test]
    async fn test_pagination_slices_after_ranking() {
        let store = Arc::new(MemoryStore::new());
        seed_ride(&store, &[300], 0).await;
        seed_ride(&store, &[100], 1).await;
        seed_ride(&store, &[200], 2).await;

        let mut query = dest_query();
        query.offset = 1;
        query.limit = 1;
        let results = service(store).search(&query).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].price_rub, 200);
    }

    #[tokio::test]
    async fn test_multi_stop_ride_yields_sub_routes() {
        let store = Arc::new(MemoryStore::new());
        seed_ride(&store, &[100, 150], 0).await;

        // A wide arrival radius admits every stop as an arrival.
        let mut query = dest_query();
        query.arrival = Some(GeoFilter::new(DEST, 200.0));
        let results = service(store).search(&query).await.unwrap();
        assert_eq!(results.len(), 3);

        let full: Vec<_> = results.iter().filter(|m| m.price_rub == 250).collect();
        assert_eq!(full.len(), 1);
    }

    #[tokio::test]
    async fn test_booked_out_span_filtered_by_free_seats() {
        let store = Arc::new(MemoryStore::new());
        let bundle = seed_ride(&store, &[100], 0).await;

        // Claim every seat on the only segment.
        let reservation = Reservation::new(
            bundle.ride.id,
            Uuid::new_v4(),
            bundle.ride.seats_total,
            bundle.legs[0].id,
        );
        store
            .insert_reserved(&reservation, &[bundle.legs[0].id])
            .await
            .unwrap();

        let results = service(store).search(&dest_query()).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_price_window_applies_to_derived_price() {
        let store = Arc::new(MemoryStore::new());
        seed_ride(&store, &[100, 150], 0).await;

        let mut query = dest_query();
        query.arrival = Some(GeoFilter::new(DEST, 200.0));
        query.price_min = Some(150);
        query.price_max = Some(250);
        let results = service(store).search(&query).await.unwrap();
        let prices: Vec<i64> = results.iter().map(|m| m.price_rub).collect();
        assert_eq!(prices, vec![150, 250]);
    }

    #[tokio::test]
    async fn test_invalid_filter_rejected_before_storage() {
        let store = Arc::new(MemoryStore::new());
        let mut query = dest_query();
        query.arrival = None;
        let err = service(store).search(&query).await.unwrap_err();
        assert!(matches!(err, SearchError::InvalidFilter(_)));
    }

    #[tokio::test]
    async fn test_departure_filter_constrains_start() {
        let store = Arc::new(MemoryStore::new());
        seed_ride(&store, &[100, 150], 0).await;

        let mut query = dest_query();
        query.arrival = Some(GeoFilter::new(DEST, 200.0));
        // Departure pinned to the middle stop.
        query.departure = Some(GeoFilter::new(GeoPoint::new(55.5, 37.0), 10.0));
        let results = service(store).search(&query).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].price_rub, 150);
        assert!(results[0].departure_distance_km.unwrap() < 10.0);
    }
}
