//! Confidence scoring and candidate selection.
//!
//! Scoring is a pure function of a candidate's method, its contextual
//! features and how many strategies agree on its value. Selection then takes
//! the best-scored candidate, preferring the larger value among candidates
//! whose confidence is within `tie_epsilon` of the best.

use std::collections::{BTreeMap, BTreeSet};
use std::cmp::Ordering;

use rust_decimal::Decimal;
use tracing::debug;

use crate::domain::{Candidate, CandidateFeatures, ExtractionMethod};

/// Additive weights of the scoring function
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringWeights {
    pub labeled_prior: f64,
    pub same_line_prior: f64,
    pub next_lines_prior: f64,
    pub aggressive_prior: f64,
    /// Both a value label and a currency token nearby
    pub label_and_currency_bonus: f64,
    /// Only one of the two cues nearby
    pub single_cue_bonus: f64,
    pub exclusion_penalty: f64,
    pub short_digit_penalty: f64,
    pub reference_penalty: f64,
    pub crossing_penalty: f64,
    /// Per additional strategy agreeing on the same value
    pub agreement_bonus: f64,
    pub max_agreement_bonus: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            labeled_prior: 0.75,
            same_line_prior: 0.65,
            next_lines_prior: 0.5,
            aggressive_prior: 0.25,
            label_and_currency_bonus: 0.15,
            single_cue_bonus: 0.1,
            exclusion_penalty: 0.3,
            short_digit_penalty: 0.2,
            reference_penalty: 0.2,
            crossing_penalty: 0.25,
            agreement_bonus: 0.05,
            max_agreement_bonus: 0.1,
        }
    }
}

impl ScoringWeights {
    pub fn prior(&self, method: ExtractionMethod) -> f64 {
        match method {
            ExtractionMethod::LabeledPattern => self.labeled_prior,
            ExtractionMethod::SameLine => self.same_line_prior,
            ExtractionMethod::NextLines => self.next_lines_prior,
            ExtractionMethod::Aggressive => self.aggressive_prior,
        }
    }
}

/// Score one candidate, clamped into `[0, 1]`.
///
/// `agreeing_methods` counts the distinct strategies (including this one)
/// that produced the same value.
pub fn score(
    weights: &ScoringWeights,
    method: ExtractionMethod,
    features: &CandidateFeatures,
    agreeing_methods: usize,
) -> f64 {
    let mut confidence = weights.prior(method);

    match (features.value_label_nearby, features.currency_nearby) {
        (true, true) => confidence += weights.label_and_currency_bonus,
        (true, false) | (false, true) => confidence += weights.single_cue_bonus,
        (false, false) => {}
    }

    if features.exclusion_nearby {
        confidence -= weights.exclusion_penalty;
    }
    if features.short_digit_run {
        confidence -= weights.short_digit_penalty;
    }
    if features.reference_like {
        confidence -= weights.reference_penalty;
    }
    if features.crosses_identifier {
        confidence -= weights.crossing_penalty;
    }

    let extra_agreement = agreeing_methods.saturating_sub(1) as f64 * weights.agreement_bonus;
    confidence += extra_agreement.min(weights.max_agreement_bonus);

    confidence.clamp(0.0, 1.0)
}

/// Scores candidates and picks one value per record
#[derive(Debug, Clone)]
pub struct CandidateSelector {
    weights: ScoringWeights,
    tie_epsilon: f64,
}

impl CandidateSelector {
    pub fn new(tie_epsilon: f64) -> Self {
        Self::with_weights(ScoringWeights::default(), tie_epsilon)
    }

    pub fn with_weights(weights: ScoringWeights, tie_epsilon: f64) -> Self {
        Self { weights, tie_epsilon }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Assign confidences in place
    pub fn score_all(&self, candidates: &mut [Candidate]) {
        let mut agreement: BTreeMap<Decimal, BTreeSet<ExtractionMethod>> = BTreeMap::new();
        for candidate in candidates.iter() {
            agreement.entry(candidate.value).or_default().insert(candidate.method);
        }
        for candidate in candidates.iter_mut() {
            let agreeing = agreement.get(&candidate.value).map_or(1, BTreeSet::len);
            candidate.confidence = score(&self.weights, candidate.method, &candidate.features, agreeing);
        }
    }

    /// Score and choose. Returns `None` only for an empty candidate list.
    ///
    /// Among candidates within `tie_epsilon` of the best confidence the larger
    /// value wins; remaining ties go to the higher confidence, then the
    /// earlier offset, then the stronger method.
    pub fn select(&self, mut candidates: Vec<Candidate>) -> Option<Candidate> {
        if candidates.is_empty() {
            return None;
        }
        self.score_all(&mut candidates);

        let best = candidates
            .iter()
            .map(|c| c.confidence)
            .fold(f64::NEG_INFINITY, f64::max);
        let floor = best - self.tie_epsilon;

        let contenders = candidates.len();
        let chosen = candidates
            .into_iter()
            .filter(|c| c.confidence >= floor)
            .min_by(|a, b| {
                b.value
                    .cmp(&a.value)
                    .then_with(|| b.confidence.partial_cmp(&a.confidence).unwrap_or(Ordering::Equal))
                    .then_with(|| a.offset.cmp(&b.offset))
                    .then_with(|| method_rank(a.method).cmp(&method_rank(b.method)))
            });

        if let Some(ref c) = chosen {
            debug!(
                "CandidateSelector: identifier={} chose value={} method={} confidence={:.2} of {} candidates",
                c.source_identifier, c.value, c.method, c.confidence, contenders
            );
        }
        chosen
    }
}

impl Default for CandidateSelector {
    fn default() -> Self {
        Self::new(0.05)
    }
}

fn method_rank(method: ExtractionMethod) -> u8 {
    match method {
        ExtractionMethod::LabeledPattern => 0,
        ExtractionMethod::SameLine => 1,
        ExtractionMethod::NextLines => 2,
        ExtractionMethod::Aggressive => 3,
    }
}
