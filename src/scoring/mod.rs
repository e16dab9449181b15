pub mod calculator;
pub mod distribution;
pub mod ranker;
pub mod scenario;
pub mod tiers;
pub mod types;

pub use types::*;
pub use calculator::{compute, Composite, FactorContribution};
pub use distribution::{validate, validate_all, DistributionTarget, GateReport, GateResult, RaterAssignment};
pub use ranker::{rank, rank_with_rule, TieBreak, TieBreakRule};
pub use scenario::{compare, run_scenario, ScenarioDiff, ScenarioRun, Strategy};
pub use tiers::{classify, classify_rank, validate_tiers};
