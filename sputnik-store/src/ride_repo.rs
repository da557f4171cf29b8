use async_trait::async_trait;
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

use sputnik_core::repository::{RideBundle, RideRepository};
use sputnik_core::{
    GeoPoint, Leg, PaymentMethod, Ride, RideStatus, ValidationMethod, Waypoint,
};

pub struct PgRideRepository {
    pool: PgPool,
}

impl PgRideRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
pub(crate) struct RideRow {
    id: Uuid,
    author_id: Uuid,
    driver_id: Option<Uuid>,
    car_id: Option<Uuid>,
    status: String,
    seats_total: i32,
    payment_methods: Vec<String>,
    validation: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl RideRow {
    pub(crate) fn into_ride(self) -> Result<Ride, String> {
        let payment_methods = self
            .payment_methods
            .iter()
            .map(|m| PaymentMethod::from_str(m))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Ride {
            id: self.id,
            author_id: self.author_id,
            driver_id: self.driver_id,
            car_id: self.car_id,
            status: RideStatus::from_str(&self.status)?,
            seats_total: self.seats_total,
            payment_methods,
            validation: ValidationMethod::from_str(&self.validation)?,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct WaypointRow {
    id: Uuid,
    ride_id: Uuid,
    lat: f64,
    lng: f64,
    full_name: String,
    arrives_at: chrono::DateTime<chrono::Utc>,
    departs_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl WaypointRow {
    pub(crate) fn into_waypoint(self) -> Waypoint {
        Waypoint {
            id: self.id,
            ride_id: self.ride_id,
            point: GeoPoint::new(self.lat, self.lng),
            full_name: self.full_name,
            arrives_at: self.arrives_at,
            departs_at: self.departs_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct LegRow {
    id: Uuid,
    ride_id: Uuid,
    from_waypoint_id: Uuid,
    to_waypoint_id: Uuid,
    price_rub: i64,
    is_manual: bool,
    joins_neighbors: bool,
}

impl LegRow {
    pub(crate) fn into_leg(self) -> Leg {
        Leg {
            id: self.id,
            ride_id: self.ride_id,
            from_waypoint_id: self.from_waypoint_id,
            to_waypoint_id: self.to_waypoint_id,
            price_rub: self.price_rub,
            is_manual: self.is_manual,
            joins_neighbors: self.joins_neighbors,
        }
    }
}

pub(crate) const RIDE_COLUMNS: &str =
    "id, author_id, driver_id, car_id, status, seats_total, payment_methods, validation, created_at";

pub(crate) const WAYPOINT_COLUMNS: &str =
    "id, ride_id, ST_Y(point::geometry) AS lat, ST_X(point::geometry) AS lng, full_name, arrives_at, departs_at";

pub(crate) const LEG_COLUMNS: &str =
    "id, ride_id, from_waypoint_id, to_waypoint_id, price_rub, is_manual, joins_neighbors";

#[async_trait]
impl RideRepository for PgRideRepository {
    async fn create_ride(
        &self,
        bundle: &RideBundle,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let ride = &bundle.ride;
        let mut tx = self.pool.begin().await?;

        let payment_methods: Vec<String> = ride
            .payment_methods
            .iter()
            .map(|m| m.as_str().to_string())
            .collect();

        sqlx::query(
            r#"
            INSERT INTO rides (id, author_id, driver_id, car_id, status, seats_total, payment_methods, validation, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(ride.id)
        .bind(ride.author_id)
        .bind(ride.driver_id)
        .bind(ride.car_id)
        .bind(ride.status.as_str())
        .bind(ride.seats_total)
        .bind(&payment_methods)
        .bind(ride.validation.as_str())
        .bind(ride.created_at)
        .execute(&mut *tx)
        .await?;

        for waypoint in &bundle.waypoints {
            sqlx::query(
                r#"
                INSERT INTO waypoints (id, ride_id, point, full_name, arrives_at, departs_at)
                VALUES ($1, $2, ST_SetSRID(ST_MakePoint($3, $4), 4326)::geography, $5, $6, $7)
                "#,
            )
            .bind(waypoint.id)
            .bind(waypoint.ride_id)
            .bind(waypoint.point.lng)
            .bind(waypoint.point.lat)
            .bind(&waypoint.full_name)
            .bind(waypoint.arrives_at)
            .bind(waypoint.departs_at)
            .execute(&mut *tx)
            .await?;
        }

        for leg in &bundle.legs {
            sqlx::query(
                r#"
                INSERT INTO legs (id, ride_id, from_waypoint_id, to_waypoint_id, price_rub, is_manual, joins_neighbors)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(leg.id)
            .bind(leg.ride_id)
            .bind(leg.from_waypoint_id)
            .bind(leg.to_waypoint_id)
            .bind(leg.price_rub)
            .bind(leg.is_manual)
            .bind(leg.joins_neighbors)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(ride_id = %ride.id, waypoints = bundle.waypoints.len(), "ride stored");
        Ok(())
    }

    async fn fetch_ride(
        &self,
        ride_id: Uuid,
    ) -> Result<Option<RideBundle>, Box<dyn std::error::Error + Send + Sync>> {
        let ride_row = sqlx::query_as::<_, RideRow>(&format!(
            "SELECT {} FROM rides WHERE id = $1",
            RIDE_COLUMNS
        ))
        .bind(ride_id)
        .fetch_optional(&self.pool)
        .await?;

        let ride = match ride_row {
            Some(row) => row.into_ride()?,
            None => return Ok(None),
        };

        let waypoints = sqlx::query_as::<_, WaypointRow>(&format!(
            "SELECT {} FROM waypoints WHERE ride_id = $1 ORDER BY arrives_at",
            WAYPOINT_COLUMNS
        ))
        .bind(ride_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(WaypointRow::into_waypoint)
        .collect();

        let legs = sqlx::query_as::<_, LegRow>(&format!(
            "SELECT {} FROM legs WHERE ride_id = $1",
            LEG_COLUMNS
        ))
        .bind(ride_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(LegRow::into_leg)
        .collect();

        Ok(Some(RideBundle {
            ride,
            waypoints,
            legs,
        }))
    }

    async fn insert_leg(
        &self,
        leg: &Leg,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            r#"
            INSERT INTO legs (id, ride_id, from_waypoint_id, to_waypoint_id, price_rub, is_manual, joins_neighbors)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(leg.id)
        .bind(leg.ride_id)
        .bind(leg.from_waypoint_id)
        .bind(leg.to_waypoint_id)
        .bind(leg.price_rub)
        .bind(leg.is_manual)
        .bind(leg.joins_neighbors)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
