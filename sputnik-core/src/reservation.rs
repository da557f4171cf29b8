use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reservation lifecycle: Active → Canceled, nothing else.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Active,
    Canceled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Active => "ACTIVE",
            ReservationStatus::Canceled => "CANCELED",
        }
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(ReservationStatus::Active),
            "CANCELED" => Ok(ReservationStatus::Canceled),
            other => Err(format!("unknown reservation status: {}", other)),
        }
    }
}

/// A passenger's booked span on a ride.
///
/// `leg_id` references the leg for the exact booked span; the set of neighbor
/// legs it occupies is recorded separately as [`SegmentClaim`] rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub passenger_id: Uuid,
    pub seats: i32,
    pub leg_id: Uuid,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub fn new(ride_id: Uuid, passenger_id: Uuid, seats: i32, leg_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            ride_id,
            passenger_id,
            seats,
            leg_id,
            status: ReservationStatus::Active,
            created_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ReservationStatus::Active
    }

    /// Soft delete; the claims stay in place but stop counting.
    pub fn cancel(&mut self) {
        self.status = ReservationStatus::Canceled;
    }
}

/// Join row marking a neighbor leg occupied by a reservation.
///
/// Written atomically with the reservation, never edited afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SegmentClaim {
    pub reservation_id: Uuid,
    pub leg_id: Uuid,
}
