pub mod filter;
pub mod pipeline;
pub mod rank;

pub use pipeline::{SearchError, SearchRules, SearchService};
