pub mod costing;

pub use costing::{CostingError, CostingService};
