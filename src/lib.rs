pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod store;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    ComputationStatus, CurrencyCode, Decimal, GroupTag, IncidentalExpense, LineItem,
    ProrationMethod, Shipment, ShipmentId, ShipmentRecord,
};
pub use engine::{
    compute_shipment, preview_consolidation, ComputationResult, ComputationWarning,
    ConsolidationPreview, CostingPolicy, OverflowError, Rounding, RoundingMode,
};
pub use error::AppError;
pub use orchestration::{CostingError, CostingService};
pub use store::{MemoryStore, ShipmentStore, StoreError};
