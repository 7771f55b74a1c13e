pub mod config;
pub mod constants;
pub mod error;
pub mod idempotency;
pub mod logging;
pub mod observability;
pub mod pipeline;

// Domain data shapes shared across stages
pub mod domain;

pub use config::EngineConfig;
pub use domain::{
    Decision, DecisionEntry, DuplicatePolicy, ExtractionMethod, ExtractionReport, QualityGrade,
    ReconciliationResult, SecurityRecord,
};
pub use error::{ExtractorError, Result};
pub use pipeline::processing::{CorrectionAction, CorrectionRule, RuleSet};
pub use pipeline::ExtractionPipeline;
