//! `dayrecon-recon`: two-source daily metric reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded tables, returns aligned rows,
//! per-day deviations and a summary. No CLI dependencies.

pub mod align;
pub mod config;
pub mod deviation;
pub mod engine;
pub mod error;
pub mod export;
pub mod model;
pub mod normalize;
pub mod report;
pub mod summary;
pub mod table;

pub use config::ReconConfig;
pub use engine::{run, ReconOptions};
pub use error::ReconError;
pub use model::{CanonicalRecord, Metric, ReconInput, ReconResult, Source};
pub use table::{CellValue, RawTable};
