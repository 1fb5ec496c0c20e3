//! `tierwise-recon`: customer payment reconciliation and loyalty tiering.
//!
//! Pure engine crate: resolves identities across payment, spend, CRM and
//! signup records, computes tenure and spend rate per customer, assigns a
//! loyalty tier, and builds the report and tier summary. Reading sources
//! and writing CSV live in `load` and `export`; no CLI dependencies.

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod identity;
pub mod load;
pub mod merge;
pub mod model;
pub mod summary;
pub mod tenure;

pub use classify::Tier;
pub use config::TierConfig;
pub use engine::run;
pub use error::ReconError;
pub use model::{FinalReportRow, TierInput, TierResult, TierSummaryRow};
