pub mod app_config;
pub mod database;
pub mod reservation_repo;
pub mod ride_repo;
pub mod route_repo;

pub use database::DbClient;
pub use reservation_repo::PgReservationStore;
pub use ride_repo::PgRideRepository;
pub use route_repo::PgRouteRepository;
