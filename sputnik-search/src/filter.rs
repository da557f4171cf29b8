use sputnik_core::{RouteQuery, Waypoint};

/// Price bounds, applied after reconstruction since derived prices only
/// exist once the walk has run.
pub fn price_in_bounds(query: &RouteQuery, price_rub: i64) -> bool {
    if let Some(min) = query.price_min {
        if price_rub < min {
            return false;
        }
    }
    if let Some(max) = query.price_max {
        if price_rub > max {
            return false;
        }
    }
    true
}

/// Departure/arrival windows for a concrete sub-route.
///
/// The departure window tests the start waypoint's departure time; the
/// arrival window tests the end waypoint's arrival time.
pub fn times_in_bounds(query: &RouteQuery, from: &Waypoint, to: &Waypoint) -> bool {
    // A start waypoint is never the terminus, so it has a departure time.
    let departs_at = match from.departs_at {
        Some(t) => t,
        None => return false,
    };

    if let Some(after) = query.departs_after {
        if departs_at < after {
            return false;
        }
    }
    if let Some(before) = query.departs_before {
        if departs_at > before {
            return false;
        }
    }
    if let Some(after) = query.arrives_after {
        if to.arrives_at < after {
            return false;
        }
    }
    if let Some(before) = query.arrives_before {
        if to.arrives_at > before {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use sputnik_core::{GeoFilter, GeoPoint};
    use uuid::Uuid;

    fn query() -> RouteQuery {
        RouteQuery::anywhere_to(GeoFilter::new(GeoPoint::new(55.0, 37.0), 10.0))
    }

    fn waypoint(offset_hours: i64, departs: bool) -> Waypoint {
        let arrives = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
            + Duration::hours(offset_hours);
        Waypoint::new(
            Uuid::new_v4(),
            GeoPoint::new(55.0, 37.0),
            "stop".into(),
            arrives,
            departs.then_some(arrives),
        )
    }

    #[test]
    fn test_price_bounds() {
        let mut q = query();
        q.price_min = Some(100);
        q.price_max = Some(300);
        assert!(!price_in_bounds(&q, 99));
        assert!(price_in_bounds(&q, 100));
        assert!(price_in_bounds(&q, 300));
        assert!(!price_in_bounds(&q, 301));
    }

    #[test]
    fn test_departure_window() {
        let mut q = query();
        let from = waypoint(0, true);
        let to = waypoint(3, false);

        q.departs_after = Some(from.departs_at.unwrap() + Duration::minutes(1));
        assert!(!times_in_bounds(&q, &from, &to));

        q.departs_after = Some(from.departs_at.unwrap() - Duration::minutes(1));
        assert!(times_in_bounds(&q, &from, &to));
    }

    #[test]
    fn test_arrival_window() {
        let mut q = query();
        let from = waypoint(0, true);
        let to = waypoint(3, false);

        q.arrives_before = Some(to.arrives_at - Duration::minutes(1));
        assert!(!times_in_bounds(&q, &from, &to));

        q.arrives_before = Some(to.arrives_at);
        assert!(times_in_bounds(&q, &from, &to));
    }
}
