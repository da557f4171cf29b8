use std::cmp::Ordering;

use sputnik_core::{RouteMatch, SortKey};

/// Order matches by the caller's key, best first.
///
/// Ties always fall back to ride creation time descending, so paging over
/// equal-priced results stays stable.
pub fn rank(matches: &mut [RouteMatch], sort: SortKey) {
    matches.sort_by(|a, b| {
        let primary = match sort {
            SortKey::Price => a.price_rub.cmp(&b.price_rub),
            SortKey::DepartureDistance => compare_distance(a.departure_distance_km, b.departure_distance_km),
            SortKey::ArrivalDistance => compare_distance(a.arrival_distance_km, b.arrival_distance_km),
            SortKey::DepartsAt => a
                .from_waypoint
                .departs_at
                .cmp(&b.from_waypoint.departs_at),
            SortKey::ArrivesAt => a.to_waypoint.arrives_at.cmp(&b.to_waypoint.arrives_at),
        };
        primary.then_with(|| b.ride_created_at.cmp(&a.ride_created_at))
    });
}

fn compare_distance(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Offset/limit slice over ranked matches; limit is clamped to the
/// configured page size to keep scans bounded.
pub fn paginate(
    matches: Vec<RouteMatch>,
    offset: i64,
    limit: i64,
    max_page_size: i64,
) -> Vec<RouteMatch> {
    let limit = limit.min(max_page_size).max(0) as usize;
    let offset = offset.max(0) as usize;
    matches.into_iter().skip(offset).take(limit).collect()
}
