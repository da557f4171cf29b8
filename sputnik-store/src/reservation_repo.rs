use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use sputnik_core::repository::ReservationStore;
use sputnik_core::{Reservation, ReservationError, ReservationStatus, RideStatus};

pub struct PgReservationStore {
    pool: PgPool,
}

impl PgReservationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: Uuid,
    ride_id: Uuid,
    passenger_id: Uuid,
    seats: i32,
    leg_id: Uuid,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl ReservationRow {
    fn into_reservation(self) -> Result<Reservation, ReservationError> {
        Ok(Reservation {
            id: self.id,
            ride_id: self.ride_id,
            passenger_id: self.passenger_id,
            seats: self.seats,
            leg_id: self.leg_id,
            status: ReservationStatus::from_str(&self.status)
                .map_err(ReservationError::Storage)?,
            created_at: self.created_at,
        })
    }
}

const RESERVATION_COLUMNS: &str =
    "id, ride_id, passenger_id, seats, leg_id, status, created_at";

/// Serialization/deadlock failures are the retryable conflicts.
fn map_db_error(err: sqlx::Error) -> ReservationError {
    if let sqlx::Error::Database(ref db) = err {
        if let Some(code) = db.code() {
            if code == "40001" || code == "40P01" {
                return ReservationError::Conflict(db.message().to_string());
            }
        }
    }
    ReservationError::Storage(err.to_string())
}

#[async_trait]
impl ReservationStore for PgReservationStore {
    async fn insert_reserved(
        &self,
        reservation: &Reservation,
        claimed_leg_ids: &[Uuid],
    ) -> Result<(), ReservationError> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        // Per-ride advisory lock, released at commit/rollback. Competing
        // bookings on one ride serialize here; other rides are untouched.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
            .bind(reservation.ride_id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        let ride: Option<(i32, String)> =
            sqlx::query_as("SELECT seats_total, status FROM rides WHERE id = $1")
                .bind(reservation.ride_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_db_error)?;
        let (seats_total, status) = ride.ok_or_else(|| {
            ReservationError::NotFound(format!("ride {}", reservation.ride_id))
        })?;
        if RideStatus::from_str(&status).map_err(ReservationError::Storage)?
            != RideStatus::Published
        {
            return Err(ReservationError::Unavailable(format!(
                "ride {} is {}",
                reservation.ride_id, status
            )));
        }

        // Re-check every claimed leg under the lock before writing.
        for leg_id in claimed_leg_ids {
            let claimed: i64 = sqlx::query_scalar(
                r#"
                SELECT COALESCE(SUM(r.seats), 0)
                FROM reservations r
                JOIN reservation_claims c ON c.reservation_id = r.id
                WHERE c.leg_id = $1 AND r.status = 'ACTIVE'
                "#,
            )
            .bind(leg_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_db_error)?;

            let available = seats_total - claimed as i32;
            if available < reservation.seats {
                warn!(
                    ride_id = %reservation.ride_id,
                    leg_id = %leg_id,
                    requested = reservation.seats,
                    available,
                    "booking rejected, segment full"
                );
                return Err(ReservationError::Capacity {
                    leg_id: *leg_id,
                    requested: reservation.seats,
                    available,
                });
            }
        }

        sqlx::query(
            r#"
            INSERT INTO reservations (id, ride_id, passenger_id, seats, leg_id, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(reservation.id)
        .bind(reservation.ride_id)
        .bind(reservation.passenger_id)
        .bind(reservation.seats)
        .bind(reservation.leg_id)
        .bind(reservation.status.as_str())
        .bind(reservation.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        for leg_id in claimed_leg_ids {
            sqlx::query("INSERT INTO reservation_claims (reservation_id, leg_id) VALUES ($1, $2)")
                .bind(reservation.id)
                .bind(leg_id)
                .execute(&mut *tx)
                .await
                .map_err(map_db_error)?;
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }

    async fn cancel(&self, reservation_id: Uuid) -> Result<Reservation, ReservationError> {
        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "UPDATE reservations SET status = 'CANCELED' WHERE id = $1 RETURNING {}",
            RESERVATION_COLUMNS
        ))
        .bind(reservation_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        row.ok_or_else(|| ReservationError::NotFound(format!("reservation {}", reservation_id)))?
            .into_reservation()
    }

    async fn fetch_reservation(
        &self,
        reservation_id: Uuid,
    ) -> Result<Option<Reservation>, ReservationError> {
        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {} FROM reservations WHERE id = $1",
            RESERVATION_COLUMNS
        ))
        .bind(reservation_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        row.map(ReservationRow::into_reservation).transpose()
    }

    async fn seats_claimed(
        &self,
        leg_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, i32>, ReservationError> {
        let rows: Vec<(Uuid, i64)> = sqlx::query_as(
            r#"
            SELECT c.leg_id, COALESCE(SUM(r.seats), 0)
            FROM reservation_claims c
            JOIN reservations r ON r.id = c.reservation_id
            WHERE c.leg_id = ANY($1) AND r.status = 'ACTIVE'
            GROUP BY c.leg_id
            "#,
        )
        .bind(leg_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows
            .into_iter()
            .map(|(leg_id, seats)| (leg_id, seats as i32))
            .collect())
    }
}
