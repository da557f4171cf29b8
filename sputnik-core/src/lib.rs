pub mod error;
pub mod events;
pub mod geo;
pub mod leg;
pub mod repository;
pub mod reservation;
pub mod ride;
pub mod search;
pub mod waypoint;

pub use error::{CoreError, CoreResult, ReservationError};
pub use events::{EventSink, LogSink};
pub use geo::GeoPoint;
pub use repository::{ReservationStore, RideBundle, RideRepository, RouteSearchRepository};
pub use leg::Leg;
pub use reservation::{Reservation, ReservationStatus, SegmentClaim};
pub use ride::{PaymentMethod, Ride, RideStatus, ValidationMethod};
pub use search::{GeoFilter, RouteMatch, RouteQuery, SortKey};
pub use waypoint::Waypoint;
