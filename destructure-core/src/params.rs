//! Parameter analysis
//!
//! Turns a target's formal parameters into the ordered [`ParameterSpec`] list
//! every later stage works from, or refuses the conversion.
//!
//! Global invariants enforced:
//! - Order is preserved: `index` is the argument position a spec maps from
//! - At most one tuple-rest expansion exists, and only for a sole rest parameter
//! - A spec is optional when it carries an optional marker or a default value

use crate::ast::{FunctionLike, ParamPattern, Parameter};
use crate::error::Refusal;
use serde::Serialize;
use std::collections::HashSet;

/// One property of the destructured object, in argument order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterSpec {
    pub name: String,
    pub index: usize,
    pub optional: bool,
    pub default_text: Option<String>,
    pub type_text: Option<String>,
    pub is_tuple_rest: bool,
}

impl ParameterSpec {
    /// Type text to emit in a type literal
    ///
    /// Falls back to the type of a literal default value, then to `any`.
    pub fn effective_type(&self) -> String {
        if let Some(t) = &self.type_text {
            return t.clone();
        }
        self.default_text
            .as_deref()
            .and_then(literal_type)
            .unwrap_or("any")
            .to_string()
    }
}

/// Type of a literal expression, if it is one
fn literal_type(text: &str) -> Option<&'static str> {
    let text = text.trim();
    let first = text.chars().next()?;
    if text == "true" || text == "false" {
        Some("boolean")
    } else if matches!(first, '"' | '\'' | '`') {
        Some("string")
    } else if is_numeric_start(text) {
        let unsigned = text.strip_prefix('-').unwrap_or(text);
        if text.ends_with('n') && !unsigned.starts_with("0x") {
            Some("bigint")
        } else if unsigned
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
        {
            Some("number")
        } else {
            None
        }
    } else {
        None
    }
}

/// `1`, `.5`, `-1`, `-.5`; not `-foo`
fn is_numeric_start(text: &str) -> bool {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    unsigned
        .strip_prefix('.')
        .unwrap_or(unsigned)
        .starts_with(|c: char| c.is_ascii_digit())
}

/// Analyze the parameter list of a function
///
/// Callers handle the empty and already-destructured lists before calling;
/// both are no-ops rather than refusals.
pub fn analyze_parameters(function: &FunctionLike) -> Result<Vec<ParameterSpec>, Refusal> {
    if function.name.is_none() {
        return Err(Refusal::Anonymous);
    }
    if function.overloaded {
        return Err(Refusal::Overloaded {
            name: function.name.clone().unwrap_or_default(),
        });
    }
    if let [Parameter {
        pattern: ParamPattern::Object,
        ..
    }] = function.params.as_slice()
    {
        return Err(Refusal::AlreadyDestructured);
    }

    let mut specs = Vec::with_capacity(function.params.len());
    for (position, param) in function.params.iter().enumerate() {
        if param.property {
            return Err(Refusal::ParameterProperty {
                name: param.display_name(),
            });
        }
        if param.decorated {
            return Err(Refusal::Decorated {
                name: param.display_name(),
            });
        }
        match &param.pattern {
            ParamPattern::Ident { name, optional } => specs.push(ParameterSpec {
                name: name.clone(),
                index: position,
                optional: *optional || param.default_text.is_some(),
                default_text: param.default_text.clone(),
                type_text: param.type_text.clone(),
                is_tuple_rest: false,
            }),
            ParamPattern::Rest { name, tuple } => {
                let rest_name = name.clone().unwrap_or_default();
                if function.params.len() != 1 {
                    return Err(Refusal::RestNotSole { name: rest_name });
                }
                return expand_tuple_rest(&rest_name, tuple.as_deref());
            }
            ParamPattern::This => return Err(Refusal::ThisParameter),
            ParamPattern::Object | ParamPattern::Array | ParamPattern::Invalid => {
                return Err(Refusal::DestructuringPattern {
                    position: position + 1,
                })
            }
        }
    }

    let mut seen = HashSet::new();
    for spec in &specs {
        if !seen.insert(spec.name.as_str()) {
            return Err(Refusal::DuplicateName {
                name: spec.name.clone(),
            });
        }
    }

    Ok(specs)
}

/// Expand `...args: [a: A, b?: B]` into one spec per labelled element
fn expand_tuple_rest(
    rest_name: &str,
    tuple: Option<&[crate::ast::TupleElement]>,
) -> Result<Vec<ParameterSpec>, Refusal> {
    let unnamed = || Refusal::UnnamedRest {
        name: rest_name.to_string(),
    };
    let elements = tuple.filter(|t| !t.is_empty()).ok_or_else(unnamed)?;

    let mut specs = Vec::with_capacity(elements.len());
    let mut seen = HashSet::new();
    for (index, element) in elements.iter().enumerate() {
        let name = element.name.clone().ok_or_else(unnamed)?;
        if element.variadic {
            return Err(unnamed());
        }
        if !seen.insert(name.clone()) {
            return Err(Refusal::DuplicateName { name });
        }
        specs.push(ParameterSpec {
            name,
            index,
            optional: element.optional,
            default_text: None,
            type_text: Some(element.type_text.clone()),
            is_tuple_rest: true,
        });
    }
    Ok(specs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locate::locate_function;
    use crate::project::ProjectFile;

    fn analyze(path: &str, src: &str) -> Result<Vec<ParameterSpec>, Refusal> {
        let file = ProjectFile::parse(path, src.to_string()).unwrap();
        let offset = src.rfind("{}").unwrap();
        let function = locate_function(&file, offset).expect("source must contain a function");
        analyze_parameters(&function)
    }

    #[test]
    fn test_optional_from_marker_or_default() {
        let specs = analyze(
            "a.ts",
            "function f(name: string, age = 30, email?: string) {}",
        )
        .unwrap();
        let names: Vec<_> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["name", "age", "email"]);
        assert!(!specs[0].optional);
        assert!(specs[1].optional, "A default value makes a parameter optional");
        assert_eq!(specs[1].default_text.as_deref(), Some("30"));
        assert_eq!(specs[1].effective_type(), "number");
        assert!(specs[2].optional);
        assert_eq!(specs[2].index, 2);
    }

    #[test]
    fn test_tuple_rest_expands_named_elements() {
        let specs = analyze(
            "a.ts",
            "function f(...args: [host: string, port?: number]) {}",
        )
        .unwrap();
        assert_eq!(specs.len(), 2);
        assert!(specs.iter().all(|s| s.is_tuple_rest));
        assert_eq!(specs[1].name, "port");
        assert!(specs[1].optional);
        assert_eq!(specs[1].type_text.as_deref(), Some("number"));
    }

    #[test]
    fn test_refuse_unnamed_rest() {
        assert_eq!(
            analyze("a.ts", "function f(...args: string[]) {}"),
            Err(Refusal::UnnamedRest {
                name: "args".to_string()
            })
        );
        assert!(matches!(
            analyze("a.ts", "function f(...args: [string, number]) {}"),
            Err(Refusal::UnnamedRest { .. })
        ));
    }

    #[test]
    fn test_refuse_rest_with_siblings() {
        assert_eq!(
            analyze("a.js", "function f(a, ...rest) {}"),
            Err(Refusal::RestNotSole {
                name: "rest".to_string()
            })
        );
    }

    #[test]
    fn test_refuse_parameter_property() {
        let src = "class A { constructor(private readonly db: Db, name: string) {} }";
        assert_eq!(
            analyze("a.ts", src),
            Err(Refusal::ParameterProperty {
                name: "db".to_string()
            })
        );
    }

    #[test]
    fn test_refuse_overloads() {
        let src = "function f(a: string): void;\nfunction f(a: any, b?: any) {}";
        assert!(matches!(
            analyze("a.ts", src),
            Err(Refusal::Overloaded { .. })
        ));
    }

    #[test]
    fn test_already_destructured() {
        assert_eq!(
            analyze("a.js", "function f({ a, b }) {}"),
            Err(Refusal::AlreadyDestructured)
        );
    }

    #[test]
    fn test_refuse_patterns_and_this() {
        assert!(matches!(
            analyze("a.js", "function f(a, [b, c]) {}"),
            Err(Refusal::DestructuringPattern { position: 2 })
        ));
        assert_eq!(
            analyze("a.ts", "function f(this: Window, a: number) {}"),
            Err(Refusal::ThisParameter)
        );
    }

    #[test]
    fn test_refuse_decorated_parameter() {
        let src = "class C { handle(@Body() dto: Dto) {} }";
        assert!(matches!(
            analyze("a.ts", src),
            Err(Refusal::Decorated { .. })
        ));
    }

    #[test]
    fn test_literal_types() {
        assert_eq!(literal_type("'x'"), Some("string"));
        assert_eq!(literal_type("false"), Some("boolean"));
        assert_eq!(literal_type("-1.5"), Some("number"));
        assert_eq!(literal_type("10n"), Some("bigint"));
        assert_eq!(literal_type("0xff"), Some("number"));
        assert_eq!(literal_type("makeDefault()"), None);
        assert_eq!(literal_type("-foo"), None);
        assert_eq!(literal_type("-min"), None);
        assert_eq!(literal_type("-.5"), Some("number"));
    }
}
