use serde::Serialize;
use uuid::Uuid;

use sputnik_core::search::GeoFilter;

use crate::chain::RouteChain;

/// One reachable (departure, arrival) pair with its effective price.
#[derive(Debug, Clone, Serialize)]
pub struct SubRoute {
    pub ride_id: Uuid,
    pub from_index: usize,
    pub to_index: usize,
    pub from_waypoint_id: Uuid,
    pub to_waypoint_id: Uuid,
    pub price_rub: i64,
    /// True when a manual leg supplied the price instead of the running sum
    pub priced_manually: bool,
}

/// Materialize every sub-route reachable from seed waypoints.
///
/// Seeds are the waypoints inside the departure filter, or every
/// non-terminal waypoint when the filter is unset. From each seed the walk
/// extends one neighbor leg at a time, so the cost is one pass over the
/// remaining chain per seed.
pub fn reconstruct(chain: &RouteChain, departure: Option<&GeoFilter>) -> Vec<SubRoute> {
    let mut results = Vec::new();
    for start in 0..chain.len() - 1 {
        if let Some(filter) = departure {
            if !filter.contains(&chain.waypoint(start).point) {
                continue;
            }
        }
        results.extend(reconstruct_from(chain, start));
    }
    results
}

/// Walk forward from one start position, accumulating neighbor prices.
///
/// A manual leg for the exact pair overrides the accumulated sum
/// unconditionally; drivers use that for promotional pricing and no
/// consistency with the neighbor sums is enforced.
pub fn reconstruct_from(chain: &RouteChain, start: usize) -> Vec<SubRoute> {
    let mut results = Vec::with_capacity(chain.len() - start - 1);
    let from = chain.waypoint(start);
    let mut running_total = 0i64;

    for end in start + 1..chain.len() {
        running_total += chain.neighbor_leg(end - 1).price_rub;
        let to = chain.waypoint(end);

        let (price_rub, priced_manually) = match chain.manual_leg(from.id, to.id) {
            Some(leg) => (leg.price_rub, true),
            None => (running_total, false),
        };

        results.push(SubRoute {
            ride_id: chain.ride().id,
            from_index: start,
            to_index: end,
            from_waypoint_id: from.id,
            to_waypoint_id: to.id,
            price_rub,
            priced_manually,
        });
    }
    results
}

/// Plain neighbor-leg sum for a span, ignoring manual overrides.
///
/// This is the price a freshly materialized leg gets when a booking spans a
/// pair with no stored leg.
pub fn derived_price(chain: &RouteChain, from: usize, to: usize) -> i64 {
    (from..to).map(|i| chain.neighbor_leg(i).price_rub).sum()
}
