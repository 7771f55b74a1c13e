// Pipeline processing: locate, generate, select, correct, assemble, reconcile

pub mod assemble;
pub mod candidates;
pub mod correction;
pub mod locator;
pub mod numeric;
pub mod reconcile;
pub mod scoring;

pub use assemble::{Deduplicator, RecordBuilder};
pub use candidates::{CandidateGenerator, ExtractionStrategy};
pub use correction::{CorrectionAction, CorrectionLayer, CorrectionRule, RuleSet, ValidationOutcome};
pub use locator::IdentifierLocator;
pub use reconcile::Reconciler;
pub use scoring::{CandidateSelector, ScoringWeights};
