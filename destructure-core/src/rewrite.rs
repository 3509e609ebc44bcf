//! Rewrite text generation
//!
//! Pure string production from the parameter specs: the new parameter list,
//! the optional destructuring statement for object-variable mode, and the
//! argument list for each accepted call. Nothing here knows about offsets.

use crate::ast::{is_undefined_equivalent, Argument};
use crate::params::ParameterSpec;

/// Options that shape the generated text
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RewriteOptions {
    /// Keep original types; `false` annotates the object as `any`
    pub preserve_types: bool,
    /// The declaring file accepts type annotations
    pub typed: bool,
    /// Bind the whole object to this name and destructure in the body
    pub object_variable: Option<String>,
}

/// New signature text for one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureRewrite {
    /// Replacement for the parameter list, without surrounding parentheses
    pub params_text: String,
    /// Statement inserted first in the body in object-variable mode
    pub body_prelude: Option<String>,
}

/// Build the new parameter list
pub fn rewrite_signature(specs: &[ParameterSpec], options: &RewriteOptions) -> SignatureRewrite {
    let pattern = binding_pattern(specs);
    let annotation = options.typed.then(|| {
        if options.preserve_types {
            type_literal(specs)
        } else {
            "any".to_string()
        }
    });
    let initializer = if specs.iter().all(|s| s.optional) {
        " = {}"
    } else {
        ""
    };

    let annotate = |binding: &str| match &annotation {
        Some(t) => format!("{}: {}{}", binding, t, initializer),
        None => format!("{}{}", binding, initializer),
    };

    match &options.object_variable {
        Some(variable) => SignatureRewrite {
            params_text: annotate(variable),
            body_prelude: Some(format!("let {} = {};", pattern, variable)),
        },
        None => SignatureRewrite {
            params_text: annotate(&pattern),
            body_prelude: None,
        },
    }
}

/// `{ a, b = 1 }`
fn binding_pattern(specs: &[ParameterSpec]) -> String {
    let entries: Vec<String> = specs
        .iter()
        .map(|spec| match &spec.default_text {
            Some(default) => format!("{} = {}", spec.name, default),
            None => spec.name.clone(),
        })
        .collect();
    braced(&entries, ", ")
}

/// `{ a: string; b?: number }`
fn type_literal(specs: &[ParameterSpec]) -> String {
    let members: Vec<String> = specs
        .iter()
        .map(|spec| {
            format!(
                "{}{}: {}",
                spec.name,
                if spec.optional { "?" } else { "" },
                spec.effective_type()
            )
        })
        .collect();
    braced(&members, "; ")
}

fn braced(entries: &[String], separator: &str) -> String {
    if entries.is_empty() {
        "{}".to_string()
    } else {
        format!("{{ {} }}", entries.join(separator))
    }
}

/// Object literal passed in place of the positional arguments
///
/// Arguments past the last parameter are dropped; the classifier routes such
/// calls through review first.
pub fn call_object(specs: &[ParameterSpec], arguments: &[Argument]) -> String {
    let mut properties = Vec::with_capacity(specs.len());
    for spec in specs {
        let argument = arguments.get(spec.index).map(|a| a.text.trim());
        match argument {
            None if spec.optional => {}
            Some(text) if spec.optional && is_undefined_equivalent(text) => {}
            None => properties.push(format!("{}: undefined", spec.name)),
            Some(text) if text == spec.name => properties.push(spec.name.clone()),
            Some(text) => properties.push(format!("{}: {}", spec.name, text)),
        }
    }
    braced(&properties, ", ")
}

/// Replacement for a call's parenthesized argument list
pub fn call_arguments(specs: &[ParameterSpec], arguments: &[Argument]) -> String {
    format!("({})", call_object(specs, arguments))
}
