use async_trait::async_trait;
use uuid::Uuid;

use crate::error::CoreError;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct RidePublishedEvent {
    pub ride_id: Uuid,
    pub author_id: Uuid,
    pub waypoint_count: usize,
    pub published_at: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct ReservationCreatedEvent {
    pub reservation_id: Uuid,
    pub ride_id: Uuid,
    pub passenger_id: Uuid,
    pub leg_id: Uuid,
    pub seats: i32,
    pub created_at: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct ReservationCanceledEvent {
    pub reservation_id: Uuid,
    pub ride_id: Uuid,
    pub canceled_at: i64,
}

/// Outbound event seam. The booking path publishes on commit and cancel.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<(), CoreError>;
}

/// Default sink: structured log lines, no broker.
pub struct LogSink;

#[async_trait]
impl EventSink for LogSink {
    async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<(), CoreError> {
        tracing::info!(topic, key, payload, "domain event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_sink_accepts_events() {
        let sink = LogSink;
        let event = ReservationCanceledEvent {
            reservation_id: Uuid::new_v4(),
            ride_id: Uuid::new_v4(),
            canceled_at: 0,
        };
        let payload = serde_json::to_string(&event).unwrap();
        assert!(sink
            .publish("reservations.canceled", &event.ride_id.to_string(), &payload)
            .await
            .is_ok());
    }
}
