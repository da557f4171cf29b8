use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ride lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RideStatus {
    Draft,
    Published,
    Canceled,
    Departed,
    Deleted,
}

impl RideStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Draft => "DRAFT",
            RideStatus::Published => "PUBLISHED",
            RideStatus::Canceled => "CANCELED",
            RideStatus::Departed => "DEPARTED",
            RideStatus::Deleted => "DELETED",
        }
    }
}

impl std::str::FromStr for RideStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(RideStatus::Draft),
            "PUBLISHED" => Ok(RideStatus::Published),
            "CANCELED" => Ok(RideStatus::Canceled),
            "DEPARTED" => Ok(RideStatus::Departed),
            "DELETED" => Ok(RideStatus::Deleted),
            other => Err(format!("unknown ride status: {}", other)),
        }
    }
}

/// Payment methods a driver accepts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Card => "CARD",
            PaymentMethod::Transfer => "TRANSFER",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CASH" => Ok(PaymentMethod::Cash),
            "CARD" => Ok(PaymentMethod::Card),
            "TRANSFER" => Ok(PaymentMethod::Transfer),
            other => Err(format!("unknown payment method: {}", other)),
        }
    }
}

/// How a driver admits passengers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationMethod {
    /// Booking is confirmed immediately
    Automatic,
    /// Driver confirms each passenger
    Manual,
}

impl ValidationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationMethod::Automatic => "AUTOMATIC",
            ValidationMethod::Manual => "MANUAL",
        }
    }
}

impl std::str::FromStr for ValidationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AUTOMATIC" => Ok(ValidationMethod::Automatic),
            "MANUAL" => Ok(ValidationMethod::Manual),
            other => Err(format!("unknown validation method: {}", other)),
        }
    }
}

/// A published multi-stop ride. Owns its waypoint chain and priced legs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ride {
    pub id: Uuid,
    pub author_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub car_id: Option<Uuid>,
    pub status: RideStatus,
    /// Advertised seat capacity, the hard ceiling for every segment
    pub seats_total: i32,
    pub payment_methods: Vec<PaymentMethod>,
    pub validation: ValidationMethod,
    pub created_at: DateTime<Utc>,
}

impl Ride {
    pub fn new(author_id: Uuid, seats_total: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            author_id,
            driver_id: None,
            car_id: None,
            status: RideStatus::Draft,
            seats_total,
            payment_methods: vec![PaymentMethod::Cash],
            validation: ValidationMethod::Automatic,
            created_at: Utc::now(),
        }
    }

    /// Whether new reservations may be taken against this ride.
    pub fn is_bookable(&self) -> bool {
        self.status == RideStatus::Published
    }
}
