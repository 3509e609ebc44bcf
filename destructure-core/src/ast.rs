//! AST facade shared by every component
//!
//! The SWC tree never leaves the modules that walk it. Walkers lower what they
//! find into the types below, which carry file-relative spans and the source
//! text the rewrite needs.
//!
//! Global invariants enforced:
//! - All spans are byte offsets into the owning file's text
//! - Text fields are verbatim slices of that file

use crate::language::SourceSpan;
use serde::Serialize;

/// Which kind of construct declared a function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FunctionKind {
    /// `function name(...) {}`
    Declaration,
    /// `function (...) {}` used as a value
    Expression,
    /// `(...) => ...`
    Arrow,
    /// Class method, class field holding a function, or object-literal method
    Method,
    /// Class constructor; its name is the class name
    Constructor,
}

/// Shape of one formal parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamPattern {
    /// Plain binding, `name` or `name?`
    Ident { name: String, optional: bool },
    /// `{ a, b }` pattern
    Object,
    /// `[a, b]` pattern
    Array,
    /// `...name`, with the positional tuple annotation when one is present
    Rest {
        name: Option<String>,
        tuple: Option<Vec<TupleElement>>,
    },
    /// TypeScript `this` pseudo-parameter
    This,
    /// Anything the parser recovered into an unusable pattern
    Invalid,
}

/// One element of a tuple type annotating a rest parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleElement {
    /// Element label (`[name: string]`), if any
    pub name: Option<String>,
    pub optional: bool,
    /// Element type text with any optional marker removed
    pub type_text: String,
    /// `...rest` element inside the tuple
    pub variadic: bool,
}

/// One formal parameter as written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Full extent including decorators, annotation and default value
    pub span: SourceSpan,
    pub pattern: ParamPattern,
    /// Annotation text without the leading colon
    pub type_text: Option<String>,
    /// Default value expression text
    pub default_text: Option<String>,
    pub decorated: bool,
    /// Constructor parameter property (`private x: T`), which assigns a field
    pub property: bool,
}

impl Parameter {
    /// Display name used in messages
    pub fn display_name(&self) -> String {
        match &self.pattern {
            ParamPattern::Ident { name, .. } => name.clone(),
            ParamPattern::Rest { name: Some(n), .. } => format!("...{}", n),
            ParamPattern::Rest { name: None, .. } => "...".to_string(),
            ParamPattern::Object => "{...}".to_string(),
            ParamPattern::Array => "[...]".to_string(),
            ParamPattern::This => "this".to_string(),
            ParamPattern::Invalid => "<invalid>".to_string(),
        }
    }
}

/// Where a function body lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionBody {
    /// Braced body
    Block {
        /// Offset of the opening brace
        open_brace: usize,
        /// Start of the first statement, if the body has one
        first_statement: Option<usize>,
    },
    /// Expression body of an arrow function
    Expr { span: SourceSpan },
}

/// A function-like construct the cursor can select
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionLike {
    pub kind: FunctionKind,
    /// Declared name, or the name of the variable/property it is bound to
    pub name: Option<String>,
    /// Declaration range: the construct itself, or the whole declarator for
    /// variable-bound expressions
    pub span: SourceSpan,
    /// Range of the binding that names this function; two references name the
    /// same function when they resolve to the same binding range
    pub identity_span: SourceSpan,
    pub params: Vec<Parameter>,
    /// From the first parameter's start to the last parameter's end
    pub params_span: Option<SourceSpan>,
    /// Whether the parameter list is wrapped in parentheses
    pub parenthesized: bool,
    pub body: Option<FunctionBody>,
    /// Other body-less declarations of the same name share this scope
    pub overloaded: bool,
    /// Class body range for methods and constructors
    pub class_span: Option<SourceSpan>,
}

/// How a call reaches its callee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallForm {
    /// `name(...)`, `obj.name(...)`, `obj?.name(...)`
    Call,
    /// `new Name(...)`
    New,
    /// `super(...)` inside a subclass constructor
    Super,
}

/// A qualified reference to a callee, as far as it can be resolved syntactically
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameRef {
    /// Bare identifier at `offset`
    Bare { name: String, offset: usize },
    /// `this.name` at `offset`
    This { name: String, offset: usize },
    /// `object.name` where `object` is a plain identifier
    Qualified {
        object: String,
        name: String,
        offset: usize,
    },
    /// Any other receiver expression; never resolvable
    Opaque,
}

/// One argument of a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub span: SourceSpan,
    pub text: String,
    pub spread: bool,
    pub object_literal: bool,
}

/// A call-shaped expression whose callee names the target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallExpr {
    pub form: CallForm,
    /// Whole call expression
    pub span: SourceSpan,
    pub callee_text: String,
    pub callee: NameRef,
    /// Callee is a property or bracket access
    pub property_access: bool,
    pub args: Vec<Argument>,
    /// Range replaced by the rewritten argument list: from `(` through `)`,
    /// or an insertion point for `new Name` without parentheses
    pub args_span: SourceSpan,
}

/// How a declared name is bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingKind {
    Function,
    Class,
    Variable,
    Parameter,
    Import { source: String, imported: ImportedName },
}

/// Which export an import binding refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportedName {
    Named(String),
    Default,
    Namespace,
}

/// A name declared in some lexical scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableDecl {
    pub name: String,
    pub kind: BindingKind,
    /// Range of the declaring construct
    pub span: SourceSpan,
}

/// Expression text that evaluates to `undefined` without side effects
pub fn is_undefined_equivalent(text: &str) -> bool {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let inner = compact
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(&compact);
    inner == "undefined" || inner.strip_prefix("void").is_some_and(is_numeric_literal)
}

fn is_numeric_literal(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_equivalents() {
        assert!(is_undefined_equivalent("undefined"));
        assert!(is_undefined_equivalent(" undefined "));
        assert!(is_undefined_equivalent("void 0"));
        assert!(is_undefined_equivalent("(void 0)"));
        assert!(!is_undefined_equivalent("undefinedValue"));
        assert!(!is_undefined_equivalent("null"));
        assert!(!is_undefined_equivalent("void fire()"));
    }

    #[test]
    fn test_parameter_display_name() {
        let param = Parameter {
            span: SourceSpan::new(0, 7),
            pattern: ParamPattern::Rest {
                name: Some("args".to_string()),
                tuple: None,
            },
            type_text: None,
            default_text: None,
            decorated: false,
            property: false,
        };
        assert_eq!(param.display_name(), "...args");
    }
}
