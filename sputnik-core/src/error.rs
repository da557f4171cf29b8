use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Booking failures surfaced by the reservation path.
///
/// `Conflict` is the only variant callers may retry; everything else is
/// either a caller mistake or a definitive rejection.
#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("Invalid span: {0}")]
    InvalidSpan(String),

    #[error("Leg {leg_id}: requested {requested} seats, {available} available")]
    Capacity {
        leg_id: Uuid,
        requested: i32,
        available: i32,
    },

    #[error("Concurrent booking conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Ride not open for booking: {0}")]
    Unavailable(String),

    #[error("Storage failure: {0}")]
    Storage(String),
}

impl ReservationError {
    /// Whether the whole booking transaction can be re-run safely.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReservationError::Conflict(_))
    }
}
