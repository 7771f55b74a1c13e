//! Candidate value generation.
//!
//! Each strategy scans a context window independently and reports the numbers
//! it considers plausible monetary values, tagged with the strategy name and
//! the contextual features the scorer needs. No strategy short-circuits another.

pub mod registry;
pub mod scan;
pub mod strategies;

pub use registry::CandidateGenerator;
pub use scan::{record_span, NumberToken, ScanContext};

use crate::domain::{Candidate, ContextWindow, ExtractionMethod};

/// Trait for pluggable extraction strategies
pub trait ExtractionStrategy: Send + Sync {
    /// The method tag attached to every candidate this strategy produces
    fn method(&self) -> ExtractionMethod;

    /// Human-readable strategy name
    fn name(&self) -> &str;

    /// Produce candidates from one window. Absence of a match yields an empty list.
    fn extract(&self, window: &ContextWindow, ctx: &ScanContext) -> Vec<Candidate>;
}

/// Build a candidate from an admissible token with freshly computed features
pub(crate) fn candidate_from_token(
    window: &ContextWindow,
    ctx: &ScanContext,
    token: &NumberToken,
    method: ExtractionMethod,
) -> Candidate {
    Candidate {
        value: token.literal.value,
        confidence: 0.0,
        method,
        source_identifier: window.identifier.clone(),
        offset: window.start_offset + token.start,
        features: ctx.features_for(window, token),
    }
}
