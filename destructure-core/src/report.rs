//! Reporting and output generation
//!
//! Global invariants enforced:
//! - Deterministic output ordering
//! - Byte-for-byte identical output across runs

use crate::plan::{ConversionPlan, PlannedCall};
use crate::{NoOpReason, Outcome};
use serde::Serialize;

/// JSON shape of an outcome
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum OutcomeReport<'a> {
    NoOp {
        #[serde(flatten)]
        reason: &'a NoOpReason,
    },
    Aborted {
        rule: &'static str,
        message: String,
    },
    Planned {
        #[serde(flatten)]
        plan: &'a ConversionPlan,
        files: Vec<String>,
    },
}

/// Render an outcome as human-readable text
pub fn render_text(outcome: &Outcome) -> String {
    match outcome {
        Outcome::NoOp(reason) => format!("Nothing to do: {}\n", reason),
        Outcome::Abort(reason) => format!("Aborted {}\n", reason.user_message()),
        Outcome::Plan(plan) => render_plan(plan),
    }
}

fn render_plan(plan: &ConversionPlan) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "Converting {} ({}) at {}\n",
        plan.target.name,
        serde_json::to_value(plan.target.kind)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default(),
        plan.target.location
    ));
    output.push_str(&format!("  before: ({})\n", plan.target.original_parameters));
    output.push_str(&format!("  after:  ({})\n", plan.signature));
    if let Some(prelude) = &plan.body_prelude {
        output.push_str(&format!("  body:   {}\n", prelude));
    }
    if plan.heuristic {
        output.push_str("  note:   call identity checked by name and scope only\n");
    }

    // Calls
    let sections: [(&str, &[PlannedCall]); 4] = [
        ("Internal calls", &plan.internal),
        ("Calls", &plan.external),
        ("Rejected in review", &plan.rejected),
        ("Skipped", &plan.skipped),
    ];
    for (title, calls) in sections {
        if calls.is_empty() {
            continue;
        }
        output.push_str(&format!("\n{} ({}):\n", title, calls.len()));
        output.push_str(&format!(
            "{:<8} {:<28} {:<26} {}\n",
            "STATE", "LOCATION", "REASON", "CALL"
        ));
        for call in calls {
            output.push_str(&render_call(call));
        }
    }

    output.push_str(&format!(
        "\n{} call(s) rewritten in {} file(s); {} already converted\n",
        plan.calls_rewritten(),
        plan.files_touched(),
        plan.already_converted
    ));
    output
}

fn render_call(call: &PlannedCall) -> String {
    let reason = call.reason.map(|r| r.code()).unwrap_or("-");
    let mut line = format!(
        "{:<8} {:<28} {:<26} {}\n",
        call.classification.to_string(),
        truncate_or_pad(&call.location.to_string(), 28),
        reason,
        one_line(&call.original)
    );
    if let Some(replacement) = &call.replacement {
        line.push_str(&format!(
            "{:<8} {:<28} {:<26} {}\n",
            "",
            "",
            "->",
            one_line(replacement)
        ));
    }
    line
}

/// Render an outcome as JSON
pub fn render_json(outcome: &Outcome) -> String {
    let report = match outcome {
        Outcome::NoOp(reason) => OutcomeReport::NoOp { reason },
        Outcome::Abort(reason) => OutcomeReport::Aborted {
            rule: reason.rule(),
            message: reason.user_message(),
        },
        Outcome::Plan(plan) => OutcomeReport::Planned {
            plan,
            files: plan
                .edits
                .keys()
                .map(|p| p.to_string_lossy().to_string())
                .collect(),
        },
    };
    serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
}

/// Collapse whitespace runs so multi-line calls fit one row
fn one_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate or pad string to fixed width
fn truncate_or_pad(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let kept: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        format!("{:<width$}", s, width = width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AbortReason;
    use crate::language::SourceLocation;
    use std::path::PathBuf;

    #[test]
    fn test_render_abort_names_rule() {
        let outcome = Outcome::Abort(AbortReason::UserCancellation {
            location: SourceLocation {
                file: PathBuf::from("a.ts"),
                line: 4,
                column: 2,
            },
        });
        let text = render_text(&outcome);
        assert!(text.contains("[user-cancellation]"));
        assert!(text.contains("no files were modified"));

        let json: serde_json::Value = serde_json::from_str(&render_json(&outcome)).unwrap();
        assert_eq!(json["status"], "aborted");
        assert_eq!(json["rule"], "user-cancellation");
    }

    #[test]
    fn test_render_noop_json() {
        let outcome = Outcome::NoOp(NoOpReason::NoParameters {
            name: "tick".to_string(),
        });
        let json: serde_json::Value = serde_json::from_str(&render_json(&outcome)).unwrap();
        assert_eq!(json["status"], "no_op");
        assert_eq!(json["reason"], "no-parameters");
        assert_eq!(json["name"], "tick");
    }

    #[test]
    fn test_one_line_and_truncate() {
        assert_eq!(one_line("f(\n  a,\n  b\n)"), "f( a, b )");
        assert_eq!(truncate_or_pad("abc", 5), "abc  ");
        assert_eq!(truncate_or_pad("abcdefgh", 6), "abc...");
    }
}
