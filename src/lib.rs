//! Composite scoring and ranking for evaluation sessions.
//!
//! Raw per-factor measurements are combined into weighted composites,
//! rater columns are checked against a calibration band, composites are
//! ranked and graded into tiers, and alternative weightings can be compared
//! to surface subjects a baseline strategy overlooks.

pub mod config;
pub mod error;
pub mod input;
pub mod output;
pub mod report;
pub mod scoring;
pub mod session;

pub use error::{EngineError, Result};
pub use session::{Evaluation, Session};
