pub mod chain;
pub mod reconstruct;

pub use chain::{ChainError, RouteChain};
pub use reconstruct::{derived_price, reconstruct, reconstruct_from, SubRoute};
