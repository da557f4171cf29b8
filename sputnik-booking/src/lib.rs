pub mod capacity;
pub mod coordinator;
pub mod memory;
pub mod publish;

pub use capacity::{claimed_segments, span_seats_left, spans_intersect, CapacityLedger};
pub use coordinator::{BookingRules, ReservationCoordinator};
pub use memory::MemoryStore;
pub use publish::RidePublisher;
