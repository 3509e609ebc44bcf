//! Attempt-level failures
//!
//! Every variant aborts the whole conversion attempt; none of them leaves a
//! file modified. Candidate-level outcomes (a rejected REVIEW call) are not
//! errors and never appear here.

use crate::language::SourceLocation;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Why a parameter list cannot be converted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Refusal {
    #[error("parameter `{name}` is a constructor parameter property; converting it would drop the field assignment")]
    ParameterProperty { name: String },

    #[error("`{name}` has overload signatures; converting only the implementation would desynchronize them")]
    Overloaded { name: String },

    #[error("the parameter list is already a single destructured object")]
    AlreadyDestructured,

    #[error("rest parameter `{name}` has no named tuple elements to map call arguments onto")]
    UnnamedRest { name: String },

    #[error("rest parameter `{name}` must be the only parameter")]
    RestNotSole { name: String },

    #[error("parameter {position} is a destructuring pattern without a property name")]
    DestructuringPattern { position: usize },

    #[error("parameter `{name}` is decorated; the decorator would be lost")]
    Decorated { name: String },

    #[error("the `this` parameter cannot become an object property")]
    ThisParameter,

    #[error("parameter name `{name}` appears more than once")]
    DuplicateName { name: String },

    #[error("the function has no name, so its call sites cannot be found")]
    Anonymous,
}

/// An indirect-invocation form that rebinds the receiver or spreads positional arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndirectForm {
    /// `fn.call(thisArg, ...)`
    Call,
    /// `fn.apply(thisArg, args)`
    Apply,
    /// `fn.bind(thisArg, ...)`
    Bind,
    /// `Reflect.apply(fn, thisArg, args)`
    ReflectApply,
    /// `fn(...args)`
    SpreadArgument,
}

impl IndirectForm {
    /// Recognize a `.call` / `.apply` / `.bind` property name
    pub fn from_property(name: &str) -> Option<Self> {
        match name {
            "call" => Some(IndirectForm::Call),
            "apply" => Some(IndirectForm::Apply),
            "bind" => Some(IndirectForm::Bind),
            _ => None,
        }
    }
}

impl fmt::Display for IndirectForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            IndirectForm::Call => ".call(...)",
            IndirectForm::Apply => ".apply(...)",
            IndirectForm::Bind => ".bind(...)",
            IndirectForm::ReflectApply => "Reflect.apply(...)",
            IndirectForm::SpreadArgument => "spread argument",
        };
        f.write_str(text)
    }
}

/// A fatal condition that ends the attempt with zero edits
#[derive(Debug, Error)]
pub enum AbortReason {
    #[error("cannot convert `{target}`: {refusal}")]
    Refused { target: String, refusal: Refusal },

    #[error("failed to parse {}: {message}", file.display())]
    ParseFailure { file: PathBuf, message: String },

    #[error("name collision: the call at {call} refers to a different `{name}` declared at {declaration}, not the target at {target}")]
    NameCollision {
        name: String,
        call: SourceLocation,
        declaration: SourceLocation,
        target: SourceLocation,
    },

    #[error("incompatible usage at {location}: `{name}` is invoked through {form}")]
    IncompatibleUsage {
        name: String,
        location: SourceLocation,
        form: IndirectForm,
    },

    #[error("cancelled during review of the call at {location}")]
    UserCancellation { location: SourceLocation },

    #[error("overlapping edits in {}: {first} and {second}", file.display())]
    OverlappingEdits {
        file: PathBuf,
        first: String,
        second: String,
    },

    #[error("edits could not be committed: {message}")]
    CommitFailed { message: String },

    #[error(transparent)]
    Provider(#[from] anyhow::Error),
}

impl AbortReason {
    /// Short identifier of the rule that fired
    pub fn rule(&self) -> &'static str {
        match self {
            AbortReason::Refused { .. } => "validation-refusal",
            AbortReason::ParseFailure { .. } => "parse-failure",
            AbortReason::NameCollision { .. } => "name-collision",
            AbortReason::IncompatibleUsage { .. } => "incompatible-usage",
            AbortReason::UserCancellation { .. } => "user-cancellation",
            AbortReason::OverlappingEdits { .. } => "overlapping-edits",
            AbortReason::CommitFailed { .. } => "commit-failed",
            AbortReason::Provider(_) => "file-provider",
        }
    }

    /// Message shown to users on every abort path
    pub fn user_message(&self) -> String {
        format!("[{}] {:#}; no files were modified", self.rule(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_names_rule_and_no_edits() {
        let reason = AbortReason::IncompatibleUsage {
            name: "send".to_string(),
            location: SourceLocation {
                file: PathBuf::from("src/b.ts"),
                line: 3,
                column: 5,
            },
            form: IndirectForm::Apply,
        };
        let message = reason.user_message();
        assert!(message.starts_with("[incompatible-usage]"));
        assert!(message.contains("src/b.ts:3:5"));
        assert!(message.contains(".apply(...)"));
        assert!(message.ends_with("no files were modified"));
    }

    #[test]
    fn test_refusal_message() {
        let reason = AbortReason::Refused {
            target: "createUser".to_string(),
            refusal: Refusal::UnnamedRest {
                name: "args".to_string(),
            },
        };
        assert_eq!(reason.rule(), "validation-refusal");
        assert!(reason.to_string().contains("no named tuple elements"));
    }
}
