//! Destructure core library - converts a function's positional parameters into one destructured object and rewrites its call sites

#![deny(warnings)]

// Global invariants enforced in this crate:
// - One attempt works against one immutable snapshot of parsed files
// - Every abort leaves every file untouched
// - No global mutable state; per-attempt caches die with the attempt
// - Candidate and review order are deterministic for a given snapshot
// - Identical input yields byte-for-byte identical edits

pub mod ast;
pub mod classify;
pub mod config;
pub mod edit;
pub mod error;
pub mod language;
pub mod locate;
pub mod params;
pub mod parser;
pub mod plan;
pub mod project;
pub mod report;
pub mod resolve;
pub mod review;
pub mod rewrite;
pub mod scan;

pub use config::ResolvedConfig;
pub use edit::{EditSink, FileEdits, FsEditSink, MemoryEditSink};
pub use error::{AbortReason, Refusal};
pub use plan::ConversionPlan;
pub use project::{FileProvider, FsFileProvider, MemoryFileProvider};
pub use report::{render_json, render_text};
pub use review::{AcceptAll, Decision, DecisionProvider, RejectAll, ScriptedDecisions};

use crate::classify::classify_candidates;
use crate::language::SourceLocation;
use crate::locate::locate_target;
use crate::params::analyze_parameters;
use crate::plan::{plan_edits, AcceptedCall, PlannedCall, TargetSummary};
use crate::project::ProjectSnapshot;
use crate::resolve::{target_identity, DeclarationResolver, SyntacticResolver};
use crate::review::ReviewRequest;
use crate::rewrite::{call_arguments, rewrite_signature, RewriteOptions};
use crate::scan::scan_project;
use anyhow::anyhow;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Where conversion was requested
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertRequest {
    /// Project-relative path of the file holding the target
    pub file: PathBuf,
    /// Byte offset inside the target function
    pub offset: usize,
}

/// Options of one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    pub preserve_types: bool,
    /// Non-blank: bind the object to this name and destructure in the body
    pub object_variable: Option<String>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            preserve_types: true,
            object_variable: None,
        }
    }
}

impl ConvertOptions {
    pub fn from_config(config: &ResolvedConfig) -> Self {
        ConvertOptions {
            preserve_types: config.preserve_types,
            object_variable: config.object_variable_name.clone(),
        }
    }
}

/// Why an attempt had nothing to do
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum NoOpReason {
    /// The position is not inside any function-like construct
    NoFunction { location: SourceLocation },
    /// The function takes no parameters
    NoParameters { name: String },
    /// The parameter list is already one destructured object
    AlreadyDestructured { name: String },
}

impl std::fmt::Display for NoOpReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoOpReason::NoFunction { location } => {
                write!(f, "no function encloses {}", location)
            }
            NoOpReason::NoParameters { name } => write!(f, "`{}` takes no parameters", name),
            NoOpReason::AlreadyDestructured { name } => {
                write!(f, "`{}` already takes a single destructured object", name)
            }
        }
    }
}

/// Result of one conversion attempt
#[derive(Debug)]
pub enum Outcome {
    NoOp(NoOpReason),
    Abort(AbortReason),
    Plan(Box<ConversionPlan>),
}

impl Outcome {
    pub fn plan(&self) -> Option<&ConversionPlan> {
        match self {
            Outcome::Plan(plan) => Some(&**plan),
            _ => None,
        }
    }

    pub fn abort(&self) -> Option<&AbortReason> {
        match self {
            Outcome::Abort(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Run one conversion attempt up to a committed-ready plan
///
/// Nothing is written here; pass the plan to [`commit`].
#[tracing::instrument(
    skip_all,
    fields(file = %request.file.display(), offset = request.offset)
)]
pub fn convert(
    provider: &dyn FileProvider,
    decisions: &mut dyn DecisionProvider,
    request: &ConvertRequest,
    options: &ConvertOptions,
) -> Outcome {
    match attempt(provider, decisions, request, options) {
        Ok(outcome) => outcome,
        Err(reason) => {
            warn!(rule = reason.rule(), "{}", reason.user_message());
            Outcome::Abort(reason)
        }
    }
}

fn attempt(
    provider: &dyn FileProvider,
    decisions: &mut dyn DecisionProvider,
    request: &ConvertRequest,
    options: &ConvertOptions,
) -> Result<Outcome, AbortReason> {
    let target_file = provider.parse(&request.file)?;
    let Some(target) = locate_target(&target_file, request.offset) else {
        return Ok(Outcome::NoOp(NoOpReason::NoFunction {
            location: target_file.location(request.offset),
        }));
    };
    let name = target.display_name().to_string();
    if target.function.params.is_empty() {
        return Ok(Outcome::NoOp(NoOpReason::NoParameters { name }));
    }
    if target.already_destructured {
        return Ok(Outcome::NoOp(NoOpReason::AlreadyDestructured { name }));
    }

    // Refusals happen before any other file is read
    let specs = analyze_parameters(&target.function).map_err(|refusal| AbortReason::Refused {
        target: name.clone(),
        refusal,
    })?;

    let typed = target_file
        .script_at(target.span().start)
        .is_some_and(|script| script.language.is_typescript());
    let summary = TargetSummary {
        name: name.clone(),
        kind: target.function.kind,
        location: target_file.location(target.span().start),
        original_parameters: target
            .function
            .params_span
            .map(|span| target_file.slice(span).to_string())
            .unwrap_or_default(),
    };

    let snapshot = ProjectSnapshot::load(provider, target_file)?;
    let resolver = SyntacticResolver::new(&snapshot);
    let identity = target_identity(&target);
    let candidates = scan_project(&snapshot, &resolver, &target, &identity)?;
    let classified = classify_candidates(&name, candidates, specs.len())?;
    info!(
        target = %name,
        files = snapshot.len(),
        safe = classified.safe.len(),
        review = classified.review.len(),
        skipped = classified.skipped.len(),
        "call sites classified"
    );

    let signature = rewrite_signature(
        &specs,
        &RewriteOptions {
            preserve_types: options.preserve_types,
            typed,
            object_variable: options.object_variable.clone(),
        },
    );

    let file_of = |path: &std::path::Path| {
        snapshot.file(path).ok_or_else(|| {
            AbortReason::Provider(anyhow!("{} is not part of the project snapshot", path.display()))
        })
    };

    let mut accepted: Vec<AcceptedCall> = classified
        .safe
        .into_iter()
        .map(|candidate| AcceptedCall {
            arguments: call_arguments(&specs, &candidate.arguments),
            candidate,
        })
        .collect();

    let mut rejected = Vec::new();
    let total = classified.review.len();
    for (i, candidate) in classified.review.into_iter().enumerate() {
        let file = file_of(&candidate.file)?;
        let arguments = call_arguments(&specs, &candidate.arguments);
        let replacement = candidate.rewritten_text(file, &arguments);
        let decision = decisions.review_candidate(&ReviewRequest {
            candidate: &candidate,
            original: candidate.text(file),
            replacement: &replacement,
            index: i + 1,
            total,
        });
        debug!(location = %candidate.position, ?decision, "review answered");
        match decision {
            Decision::Accept => accepted.push(AcceptedCall {
                candidate,
                arguments,
            }),
            Decision::Reject => rejected.push(PlannedCall::new(&candidate, file, None)),
            Decision::AbortAll => {
                return Err(AbortReason::UserCancellation {
                    location: candidate.position,
                })
            }
        }
    }
    accepted.sort_by(|a, b| {
        a.candidate
            .file
            .cmp(&b.candidate.file)
            .then(a.candidate.location.start().cmp(&b.candidate.location.start()))
    });

    let planned = plan_edits(&target, &snapshot, &signature, accepted)?;

    let report_calls = |calls: &[AcceptedCall]| -> Result<Vec<PlannedCall>, AbortReason> {
        calls
            .iter()
            .map(|call| {
                let file = file_of(&call.candidate.file)?;
                Ok(PlannedCall::new(&call.candidate, file, Some(&call.arguments)))
            })
            .collect()
    };
    let internal = report_calls(&planned.internal)?;
    let external = report_calls(&planned.external)?;
    let skipped = classified
        .skipped
        .iter()
        .map(|candidate| Ok(PlannedCall::new(candidate, file_of(&candidate.file)?, None)))
        .collect::<Result<Vec<_>, AbortReason>>()?;

    Ok(Outcome::Plan(Box::new(ConversionPlan {
        target: summary,
        parameters: specs,
        signature: signature.params_text,
        body_prelude: signature.body_prelude,
        internal,
        external,
        already_converted: skipped.len(),
        skipped,
        rejected,
        heuristic: resolver.is_heuristic(),
        edits: planned.edits,
    })))
}

/// Commit a plan through an edit sink
pub fn commit(plan: &ConversionPlan, sink: &mut dyn EditSink) -> Result<(), AbortReason> {
    sink.apply_atomic(&plan.edits)
        .map_err(|e| AbortReason::CommitFailed {
            message: format!("{:#}", e),
        })?;
    info!(
        files = plan.files_touched(),
        calls = plan.calls_rewritten(),
        "conversion committed"
    );
    Ok(())
}
