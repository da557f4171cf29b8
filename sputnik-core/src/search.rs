use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::geo::GeoPoint;
use crate::ride::{PaymentMethod, RideStatus, ValidationMethod};
use crate::waypoint::Waypoint;

/// A search endpoint: a point plus its own radius.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoFilter {
    pub point: GeoPoint,
    pub radius_km: f64,
}

impl GeoFilter {
    pub fn new(point: GeoPoint, radius_km: f64) -> Self {
        Self { point, radius_km }
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        self.point.distance_km(point) <= self.radius_km
    }
}

/// Result ordering selected by the caller.
///
/// Every key gets a stable secondary sort by ride creation time descending.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortKey {
    Price,
    DepartureDistance,
    ArrivalDistance,
    DepartsAt,
    ArrivesAt,
}

/// Sub-route search filter.
///
/// `None` bounds mean "any". The empty method/status vectors also mean "any",
/// except `statuses`, which defaults to published rides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteQuery {
    pub departure: Option<GeoFilter>,
    pub arrival: Option<GeoFilter>,
    pub departs_after: Option<DateTime<Utc>>,
    pub departs_before: Option<DateTime<Utc>>,
    pub arrives_after: Option<DateTime<Utc>>,
    pub arrives_before: Option<DateTime<Utc>>,
    pub price_min: Option<i64>,
    pub price_max: Option<i64>,
    pub min_free_seats: i32,
    pub payment_methods: Vec<PaymentMethod>,
    pub validation_methods: Vec<ValidationMethod>,
    pub statuses: Vec<RideStatus>,
    pub sort: SortKey,
    pub offset: i64,
    pub limit: i64,
}

impl RouteQuery {
    pub fn anywhere_to(arrival: GeoFilter) -> Self {
        Self {
            departure: None,
            arrival: Some(arrival),
            departs_after: None,
            departs_before: None,
            arrives_after: None,
            arrives_before: None,
            price_min: None,
            price_max: None,
            min_free_seats: 1,
            payment_methods: Vec::new(),
            validation_methods: Vec::new(),
            statuses: vec![RideStatus::Published],
            sort: SortKey::Price,
            offset: 0,
            limit: 20,
        }
    }

    /// Reject malformed filters before any storage is touched.
    pub fn validate(&self) -> CoreResult<()> {
        if self.arrival.is_none() {
            return Err(CoreError::ValidationError(
                "arrival point is required".into(),
            ));
        }
        for (name, filter) in [("departure", &self.departure), ("arrival", &self.arrival)] {
            if let Some(f) = filter {
                if !(f.radius_km > 0.0) {
                    return Err(CoreError::ValidationError(format!(
                        "{} radius must be positive",
                        name
                    )));
                }
            }
        }
        if let (Some(min), Some(max)) = (self.price_min, self.price_max) {
            if max < min {
                return Err(CoreError::ValidationError(
                    "price range is inverted".into(),
                ));
            }
        }
        if let (Some(after), Some(before)) = (self.departs_after, self.departs_before) {
            if before < after {
                return Err(CoreError::ValidationError(
                    "departure window is inverted".into(),
                ));
            }
        }
        if let (Some(after), Some(before)) = (self.arrives_after, self.arrives_before) {
            if before < after {
                return Err(CoreError::ValidationError(
                    "arrival window is inverted".into(),
                ));
            }
        }
        if self.min_free_seats < 1 {
            return Err(CoreError::ValidationError(
                "min_free_seats must be at least 1".into(),
            ));
        }
        if self.offset < 0 || self.limit <= 0 {
            return Err(CoreError::ValidationError(
                "offset/limit must be non-negative/positive".into(),
            ));
        }
        Ok(())
    }
}

/// A ranked sub-route returned by search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteMatch {
    pub ride_id: Uuid,
    pub from_waypoint: Waypoint,
    pub to_waypoint: Waypoint,
    /// Manual override price if one exists for the pair, else derived sum
    pub price_rub: i64,
    pub priced_manually: bool,
    pub seats_left: i32,
    pub departure_distance_km: Option<f64>,
    pub arrival_distance_km: Option<f64>,
    pub ride_created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_query() -> RouteQuery {
        RouteQuery::anywhere_to(GeoFilter::new(GeoPoint::new(55.75, 37.61), 10.0))
    }

    #[test]
    fn test_missing_arrival_rejected() {
        let mut q = base_query();
        q.arrival = None;
        assert!(q.validate().is_err());
    }

    #[test]
    fn test_inverted_price_range_rejected() {
        let mut q = base_query();
        q.price_min = Some(500);
        q.price_max = Some(100);
        assert!(q.validate().is_err());
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(base_query().validate().is_ok());
    }

    #[test]
    fn test_zero_radius_rejected() {
        let mut q = base_query();
        q.arrival = Some(GeoFilter::new(GeoPoint::new(55.75, 37.61), 0.0));
        assert!(q.validate().is_err());
    }
}
