//! Conversion planning
//!
//! Turns the signature rewrite and the accepted calls into one edit set.
//! Calls inside the target's own declaration are patched into the old
//! declaration text together with the signature edits, and the result replaces
//! the declaration as a single edit. Every other call is patched in place.
//!
//! Global invariants enforced:
//! - Internal edits are computed against the unmodified declaration text
//! - Edits are pairwise disjoint per file; an overlap aborts before commit
//! - Only the target's parameter list, its body prelude, and call argument
//!   lists change

use crate::ast::{FunctionBody, FunctionKind, FunctionLike};
use crate::classify::{Classification, ReasonCode};
use crate::edit::{apply_edits, first_conflict, FileEdits, FilePatch, TextEdit};
use crate::error::AbortReason;
use crate::language::SourceLocation;
use crate::locate::FunctionTarget;
use crate::params::ParameterSpec;
use crate::project::{ProjectFile, ProjectSnapshot};
use crate::rewrite::SignatureRewrite;
use crate::scan::CallCandidate;
use anyhow::anyhow;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

/// A call the plan rewrites, with its new argument list
#[derive(Debug, Clone)]
pub struct AcceptedCall {
    pub candidate: CallCandidate,
    /// Replacement for `candidate.args_span`
    pub arguments: String,
}

/// One call site as reported
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedCall {
    pub location: SourceLocation,
    pub classification: Classification,
    pub reason: Option<ReasonCode>,
    /// Found by text search in template markup
    pub template: bool,
    pub original: String,
    /// New call text; absent for calls left alone
    pub replacement: Option<String>,
}

impl PlannedCall {
    pub fn new(candidate: &CallCandidate, file: &ProjectFile, arguments: Option<&str>) -> Self {
        PlannedCall {
            location: candidate.position.clone(),
            classification: candidate.classification.unwrap_or(Classification::Safe),
            reason: candidate.reason,
            template: candidate.location.is_text(),
            original: candidate.text(file).to_string(),
            replacement: arguments.map(|args| candidate.rewritten_text(file, args)),
        }
    }
}

/// The conversion target as reported
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetSummary {
    pub name: String,
    pub kind: FunctionKind,
    pub location: SourceLocation,
    pub original_parameters: String,
}

/// Complete result of a successful attempt
#[derive(Debug, Clone, Serialize)]
pub struct ConversionPlan {
    pub target: TargetSummary,
    pub parameters: Vec<ParameterSpec>,
    /// New parameter list text
    pub signature: String,
    pub body_prelude: Option<String>,
    /// Rewritten calls inside the target's own declaration
    pub internal: Vec<PlannedCall>,
    /// Rewritten calls everywhere else
    pub external: Vec<PlannedCall>,
    /// SKIP calls, already passing an object
    pub skipped: Vec<PlannedCall>,
    /// REVIEW calls the reviewer rejected
    pub rejected: Vec<PlannedCall>,
    pub already_converted: usize,
    /// Call identity was established syntactically rather than proven
    pub heuristic: bool,
    #[serde(skip)]
    pub edits: FileEdits,
}

impl ConversionPlan {
    pub fn files_touched(&self) -> usize {
        self.edits.len()
    }

    pub fn calls_rewritten(&self) -> usize {
        self.internal.len() + self.external.len()
    }
}

/// Edits of a plan, split by where the calls live
#[derive(Debug, Clone)]
pub struct PlannedEdits {
    pub edits: FileEdits,
    pub internal: Vec<AcceptedCall>,
    pub external: Vec<AcceptedCall>,
}

/// Build the edit set for a conversion
pub fn plan_edits(
    target: &FunctionTarget,
    snapshot: &ProjectSnapshot,
    signature: &SignatureRewrite,
    accepted: Vec<AcceptedCall>,
) -> Result<PlannedEdits, AbortReason> {
    let file = snapshot.file(&target.file).ok_or_else(|| {
        AbortReason::Provider(anyhow!(
            "{} is not part of the project snapshot",
            target.file.display()
        ))
    })?;
    let declaration = target.span();

    let (internal, external): (Vec<_>, Vec<_>) = accepted.into_iter().partition(|call| {
        call.candidate.file == target.file && declaration.contains(&call.candidate.location.span())
    });

    // Signature and internal calls, in file coordinates
    let mut labelled = structural_edits(file, &target.function, signature)?;
    labelled.extend(internal.iter().map(|call| {
        (
            TextEdit::new(call.candidate.args_span, call.arguments.clone()),
            call.candidate.position.to_string(),
        )
    }));
    check_disjoint(&target.file, &labelled)?;

    let relative: Vec<TextEdit> = labelled
        .iter()
        .map(|(edit, _)| TextEdit::new(edit.span.relative_to(declaration.start), edit.new_text.clone()))
        .collect();
    let new_declaration =
        apply_edits(file.slice(declaration), &relative).map_err(AbortReason::Provider)?;

    let mut by_file: BTreeMap<PathBuf, Vec<(TextEdit, String)>> = BTreeMap::new();
    by_file.entry(target.file.clone()).or_default().push((
        TextEdit::new(declaration, new_declaration),
        format!("declaration of {}", target.display_name()),
    ));
    for call in &external {
        by_file.entry(call.candidate.file.clone()).or_default().push((
            TextEdit::new(call.candidate.args_span, call.arguments.clone()),
            call.candidate.position.to_string(),
        ));
    }

    let mut edits = FileEdits::new();
    for (path, labelled) in by_file {
        check_disjoint(&path, &labelled)?;
        let original = snapshot
            .file(&path)
            .map(|f| f.text.clone())
            .ok_or_else(|| {
                AbortReason::Provider(anyhow!("{} is not part of the project snapshot", path.display()))
            })?;
        edits.insert(
            path,
            FilePatch {
                original,
                edits: labelled.into_iter().map(|(edit, _)| edit).collect(),
            },
        );
    }

    debug!(
        files = edits.len(),
        internal = internal.len(),
        external = external.len(),
        "edit set planned"
    );
    Ok(PlannedEdits {
        edits,
        internal,
        external,
    })
}

fn check_disjoint(path: &std::path::Path, labelled: &[(TextEdit, String)]) -> Result<(), AbortReason> {
    let edits: Vec<TextEdit> = labelled.iter().map(|(edit, _)| edit.clone()).collect();
    match first_conflict(&edits) {
        Some((a, b)) => Err(AbortReason::OverlappingEdits {
            file: path.to_path_buf(),
            first: labelled[a].1.clone(),
            second: labelled[b].1.clone(),
        }),
        None => Ok(()),
    }
}

/// Parameter-list replacement plus any body prelude insertion
fn structural_edits(
    file: &ProjectFile,
    function: &FunctionLike,
    signature: &SignatureRewrite,
) -> Result<Vec<(TextEdit, String)>, AbortReason> {
    let name = function.name.as_deref().unwrap_or("<anonymous>");
    let params = function.params_span.ok_or_else(|| {
        AbortReason::Provider(anyhow!("{} has no parameter list to rewrite", name))
    })?;
    let params_text = if function.parenthesized {
        signature.params_text.clone()
    } else {
        format!("({})", signature.params_text)
    };
    let mut edits = vec![(
        TextEdit::new(params, params_text),
        format!("parameter list of {}", name),
    )];

    if let Some(statement) = &signature.body_prelude {
        let label = format!("body of {}", name);
        for edit in prelude_edits(&file.text, function, statement)? {
            edits.push((edit, label.clone()));
        }
    }
    Ok(edits)
}

/// Insert `statement` as the first statement of the body
fn prelude_edits(
    text: &str,
    function: &FunctionLike,
    statement: &str,
) -> Result<Vec<TextEdit>, AbortReason> {
    let body = function.body.as_ref().ok_or_else(|| {
        AbortReason::Provider(anyhow!("function without a body cannot take a prelude"))
    })?;
    let edits = match *body {
        FunctionBody::Block {
            open_brace,
            first_statement: Some(first),
        } => {
            if text[open_brace + 1..first].contains('\n') {
                vec![TextEdit::insert(
                    first,
                    format!("{}\n{}", statement, line_indent(text, first)),
                )]
            } else {
                vec![TextEdit::insert(first, format!("{} ", statement))]
            }
        }
        FunctionBody::Block {
            open_brace,
            first_statement: None,
        } => {
            let indent = line_indent(text, open_brace);
            vec![TextEdit::insert(
                open_brace + 1,
                format!("\n{}  {}\n{}", indent, statement, indent),
            )]
        }
        FunctionBody::Expr { span } => {
            let indent = line_indent(text, function.span.start);
            vec![
                TextEdit::insert(
                    span.start,
                    format!("{{\n{}  {}\n{}  return ", indent, statement, indent),
                ),
                TextEdit::insert(span.end, format!(";\n{}}}", indent)),
            ]
        }
    };
    Ok(edits)
}

/// Leading whitespace of the line containing `offset`
fn line_indent(text: &str, offset: usize) -> &str {
    let line_start = text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line = &text[line_start..];
    let width = line
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(line.len());
    &line[..width]
}
