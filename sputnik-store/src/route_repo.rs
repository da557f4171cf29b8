use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use sputnik_core::repository::{RideBundle, RouteSearchRepository};
use sputnik_core::RouteQuery;

use crate::app_config::MarketplaceRules;
use crate::ride_repo::{LegRow, RideRow, WaypointRow, LEG_COLUMNS, RIDE_COLUMNS, WAYPOINT_COLUMNS};

pub struct PgRouteRepository {
    pool: PgPool,
    rules: MarketplaceRules,
}

impl PgRouteRepository {
    pub fn new(pool: PgPool, rules: MarketplaceRules) -> Self {
        Self { pool, rules }
    }
}

/// Seed-and-extend candidate query.
///
/// Seeds are waypoints of flag-matching rides inside the departure radius
/// (or all of them when no departure is given); the recursive step extends
/// each seed one neighbor leg at a time, so a ride qualifies exactly when
/// some seeded waypoint reaches a later waypoint inside the arrival radius.
/// Cost is bounded by chain length, not by all waypoint pairs.
const CANDIDATE_SQL: &str = r#"
WITH RECURSIVE seeds AS (
    SELECT w.id, w.ride_id
    FROM waypoints w
    JOIN rides r ON r.id = w.ride_id
    WHERE (cardinality($1::text[]) = 0 OR r.status = ANY($1))
      AND (cardinality($2::text[]) = 0 OR r.payment_methods && $2::text[])
      AND (cardinality($3::text[]) = 0 OR r.validation = ANY($3))
      AND ($4 OR ST_DWithin(w.point, ST_SetSRID(ST_MakePoint($5, $6), 4326)::geography, $7))
),
walk AS (
    SELECT l.ride_id, l.to_waypoint_id AS reached_id
    FROM seeds s
    JOIN legs l ON l.from_waypoint_id = s.id AND l.joins_neighbors
  UNION ALL
    SELECT wk.ride_id, l.to_waypoint_id
    FROM walk wk
    JOIN legs l ON l.from_waypoint_id = wk.reached_id AND l.joins_neighbors
)
SELECT DISTINCT wk.ride_id
FROM walk wk
JOIN waypoints wt ON wt.id = wk.reached_id
WHERE ($8 OR ST_DWithin(wt.point, ST_SetSRID(ST_MakePoint($9, $10), 4326)::geography, $11))
LIMIT $12
"#;

#[async_trait]
impl RouteSearchRepository for PgRouteRepository {
    async fn search_candidates(
        &self,
        query: &RouteQuery,
    ) -> Result<Vec<RideBundle>, Box<dyn std::error::Error + Send + Sync>> {
        let statuses: Vec<String> = query
            .statuses
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();
        let payment_methods: Vec<String> = query
            .payment_methods
            .iter()
            .map(|m| m.as_str().to_string())
            .collect();
        let validation_methods: Vec<String> = query
            .validation_methods
            .iter()
            .map(|m| m.as_str().to_string())
            .collect();

        let (dep_lng, dep_lat, dep_radius_m) = match &query.departure {
            Some(f) => (f.point.lng, f.point.lat, f.radius_km * 1000.0),
            None => (0.0, 0.0, 0.0),
        };
        let (arr_lng, arr_lat, arr_radius_m) = match &query.arrival {
            Some(f) => (f.point.lng, f.point.lat, f.radius_km * 1000.0),
            None => (0.0, 0.0, 0.0),
        };

        let ride_ids: Vec<Uuid> = sqlx::query_scalar(CANDIDATE_SQL)
            .bind(&statuses)
            .bind(&payment_methods)
            .bind(&validation_methods)
            .bind(query.departure.is_none())
            .bind(dep_lng)
            .bind(dep_lat)
            .bind(dep_radius_m)
            .bind(query.arrival.is_none())
            .bind(arr_lng)
            .bind(arr_lat)
            .bind(arr_radius_m)
            .bind(self.rules.max_candidate_rides)
            .fetch_all(&self.pool)
            .await?;

        if ride_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ride_rows = sqlx::query_as::<_, RideRow>(&format!(
            "SELECT {} FROM rides WHERE id = ANY($1)",
            RIDE_COLUMNS
        ))
        .bind(&ride_ids)
        .fetch_all(&self.pool)
        .await?;

        let waypoint_rows = sqlx::query_as::<_, WaypointRow>(&format!(
            "SELECT {} FROM waypoints WHERE ride_id = ANY($1) ORDER BY arrives_at",
            WAYPOINT_COLUMNS
        ))
        .bind(&ride_ids)
        .fetch_all(&self.pool)
        .await?;

        let leg_rows = sqlx::query_as::<_, LegRow>(&format!(
            "SELECT {} FROM legs WHERE ride_id = ANY($1)",
            LEG_COLUMNS
        ))
        .bind(&ride_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut waypoints_by_ride: HashMap<Uuid, Vec<_>> = HashMap::new();
        for row in waypoint_rows {
            let waypoint = row.into_waypoint();
            waypoints_by_ride
                .entry(waypoint.ride_id)
                .or_default()
                .push(waypoint);
        }
        let mut legs_by_ride: HashMap<Uuid, Vec<_>> = HashMap::new();
        for row in leg_rows {
            let leg = row.into_leg();
            legs_by_ride.entry(leg.ride_id).or_default().push(leg);
        }

        let mut bundles = Vec::with_capacity(ride_rows.len());
        for row in ride_rows {
            let ride = row.into_ride()?;
            bundles.push(RideBundle {
                waypoints: waypoints_by_ride.remove(&ride.id).unwrap_or_default(),
                legs: legs_by_ride.remove(&ride.id).unwrap_or_default(),
                ride,
            });
        }

        Ok(bundles)
    }
}
