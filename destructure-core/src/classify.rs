//! Call-site classification
//!
//! Every candidate lands in exactly one bucket: SAFE calls are rewritten
//! without asking, REVIEW calls are rewritten only when the reviewer accepts
//! them, SKIP calls already pass an object and are left alone. INCOMPATIBLE
//! aborts the attempt.

use crate::error::{AbortReason, IndirectForm};
use crate::scan::CallCandidate;
use serde::Serialize;
use std::fmt;

/// Outcome bucket of one call site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    Safe,
    Review,
    Skip,
    Incompatible,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Classification::Safe => "SAFE",
            Classification::Review => "REVIEW",
            Classification::Skip => "SKIP",
            Classification::Incompatible => "INCOMPATIBLE",
        };
        f.write_str(label)
    }
}

/// Why a call was not classified SAFE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReasonCode {
    /// The only argument is already an object literal
    AlreadyConverted,
    /// Receiver of a property access could not be proven to be the target's owner
    UnresolvedPropertyAccess,
    /// More arguments than parameters; the extras are dropped
    TooManyArgs,
    /// A spread argument cannot be mapped to named properties
    SpreadArgument,
}

impl ReasonCode {
    pub fn code(&self) -> &'static str {
        match self {
            ReasonCode::AlreadyConverted => "already-converted",
            ReasonCode::UnresolvedPropertyAccess => "unresolved-property-access",
            ReasonCode::TooManyArgs => "too-many-args",
            ReasonCode::SpreadArgument => "spread-argument",
        }
    }

    /// Higher scores are reviewed first
    pub fn review_score(&self) -> u8 {
        match self {
            ReasonCode::UnresolvedPropertyAccess => 2,
            ReasonCode::TooManyArgs => 1,
            ReasonCode::AlreadyConverted | ReasonCode::SpreadArgument => 0,
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Classify a single candidate against the target's parameter count
///
/// Rules apply in order; the first match wins.
pub fn classify(candidate: &CallCandidate, parameter_count: usize) -> (Classification, Option<ReasonCode>) {
    if candidate.arguments.iter().any(|a| a.spread) {
        return (Classification::Incompatible, Some(ReasonCode::SpreadArgument));
    }
    if let [only] = candidate.arguments.as_slice() {
        if only.object_literal {
            return (Classification::Skip, Some(ReasonCode::AlreadyConverted));
        }
    }
    if !candidate.resolved && candidate.property_access {
        return (
            Classification::Review,
            Some(ReasonCode::UnresolvedPropertyAccess),
        );
    }
    if candidate.arguments.len() > parameter_count {
        return (Classification::Review, Some(ReasonCode::TooManyArgs));
    }
    (Classification::Safe, None)
}

/// Candidates partitioned by classification
#[derive(Debug, Clone, Default)]
pub struct ClassifiedCalls {
    /// In scan order
    pub safe: Vec<CallCandidate>,
    /// Ordered for review: highest score first, then path, then offset
    pub review: Vec<CallCandidate>,
    pub skipped: Vec<CallCandidate>,
}

impl ClassifiedCalls {
    pub fn len(&self) -> usize {
        self.safe.len() + self.review.len() + self.skipped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Classify every candidate, aborting on the first incompatible one
pub fn classify_candidates(
    target_name: &str,
    candidates: Vec<CallCandidate>,
    parameter_count: usize,
) -> Result<ClassifiedCalls, AbortReason> {
    let mut classified = ClassifiedCalls::default();
    for mut candidate in candidates {
        let (class, reason) = classify(&candidate, parameter_count);
        candidate.classification = Some(class);
        candidate.reason = reason;
        match class {
            Classification::Incompatible => {
                return Err(AbortReason::IncompatibleUsage {
                    name: target_name.to_string(),
                    location: candidate.position,
                    form: IndirectForm::SpreadArgument,
                });
            }
            Classification::Safe => classified.safe.push(candidate),
            Classification::Review => classified.review.push(candidate),
            Classification::Skip => classified.skipped.push(candidate),
        }
    }

    classified.review.sort_by(|a, b| {
        let score = |c: &CallCandidate| c.reason.map(|r| r.review_score()).unwrap_or(0);
        score(b)
            .cmp(&score(a))
            .then_with(|| a.file.cmp(&b.file))
            .then_with(|| a.location.start().cmp(&b.location.start()))
    });
    Ok(classified)
}
