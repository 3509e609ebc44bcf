//! Review decisions for REVIEW calls
//!
//! The driver asks one [`DecisionProvider`] per REVIEW candidate, in the
//! classifier's order, before any edit is computed.

use crate::scan::CallCandidate;
use std::collections::VecDeque;

/// Answer to one review question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Rewrite this call
    Accept,
    /// Leave this call as it is; the attempt continues
    Reject,
    /// Abandon the whole attempt
    AbortAll,
}

/// One review question
#[derive(Debug, Clone, Copy)]
pub struct ReviewRequest<'a> {
    pub candidate: &'a CallCandidate,
    /// Original call text
    pub original: &'a str,
    /// Call text after the rewrite
    pub replacement: &'a str,
    /// 1-based position in the review queue
    pub index: usize,
    pub total: usize,
}

/// Source of review answers
pub trait DecisionProvider {
    fn review_candidate(&mut self, request: &ReviewRequest<'_>) -> Decision;
}

/// Accepts every call
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl DecisionProvider for AcceptAll {
    fn review_candidate(&mut self, _request: &ReviewRequest<'_>) -> Decision {
        Decision::Accept
    }
}

/// Rejects every call; only SAFE calls are rewritten
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectAll;

impl DecisionProvider for RejectAll {
    fn review_candidate(&mut self, _request: &ReviewRequest<'_>) -> Decision {
        Decision::Reject
    }
}

/// Pre-recorded answers, consumed in order
///
/// Running out of answers aborts, so a test never silently accepts a
/// question it did not expect.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDecisions {
    answers: VecDeque<Decision>,
    /// `file:line:col` of every call asked about
    pub asked: Vec<String>,
}

impl ScriptedDecisions {
    pub fn new(answers: impl IntoIterator<Item = Decision>) -> Self {
        ScriptedDecisions {
            answers: answers.into_iter().collect(),
            asked: Vec::new(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl DecisionProvider for ScriptedDecisions {
    fn review_candidate(&mut self, request: &ReviewRequest<'_>) -> Decision {
        self.asked.push(request.candidate.position.to_string());
        self.answers.pop_front().unwrap_or(Decision::AbortAll)
    }
}
