//! Project-wide call-site scanning
//!
//! Produces the unclassified list of calls to the target, from two producers
//! merged into one candidate shape: an AST walk over every parsed script, and
//! a text search over template markup that has no syntax tree.
//!
//! Global invariants enforced:
//! - Candidates come out in file enumeration order, then source order
//! - A call resolving to a different declaration of the same file aborts the
//!   attempt (name collision)
//! - Any indirect invocation of the target aborts the attempt
//! - A template match within `DEDUP_TOLERANCE` bytes of a parsed call is the
//!   same call and is dropped
//! - A call through a renamed import counts only when it resolves to the target

use crate::ast::{Argument, CallExpr, CallForm, FunctionKind, NameRef};
use crate::classify::{Classification, ReasonCode};
use crate::error::{AbortReason, IndirectForm};
use crate::language::ecmascript::{member_name, Lowering};
use crate::language::{SourceLocation, SourceSpan};
use crate::locate::FunctionTarget;
use crate::project::{ProjectFile, ProjectSnapshot};
use crate::resolve::{resolve_reference, DeclarationId, DeclarationResolver, Resolution};
use regex::Regex;
use serde::Serialize;
use std::path::PathBuf;
use swc_common::{Span, Spanned};
use swc_ecma_ast::*;
use swc_ecma_visit::{Visit, VisitWith};
use tracing::{debug, warn};

/// Distance in bytes under which a text match and a parsed call are the same call
pub const DEDUP_TOLERANCE: usize = 2;

/// Where a candidate was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CandidateLocation {
    /// Exact range of a parsed call expression
    Node { span: SourceSpan },
    /// Range of a text match in template markup
    Text { span: SourceSpan },
}

impl CandidateLocation {
    pub fn span(&self) -> SourceSpan {
        match self {
            CandidateLocation::Node { span } | CandidateLocation::Text { span } => *span,
        }
    }

    pub fn start(&self) -> usize {
        self.span().start
    }

    pub fn is_text(&self) -> bool {
        matches!(self, CandidateLocation::Text { .. })
    }
}

/// One detected invocation of the target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallCandidate {
    pub file: PathBuf,
    pub location: CandidateLocation,
    /// Line and column of the call start
    pub position: SourceLocation,
    pub form: CallForm,
    pub callee_text: String,
    pub callee: NameRef,
    pub property_access: bool,
    /// Arguments as written; absent arguments are absent entries
    pub arguments: Vec<Argument>,
    /// Range the rewritten argument list replaces
    pub args_span: SourceSpan,
    /// The callee was proven to be the target
    pub resolved: bool,
    pub classification: Option<Classification>,
    pub reason: Option<ReasonCode>,
}

impl CallCandidate {
    pub fn argument_texts(&self) -> Vec<&str> {
        self.arguments.iter().map(|a| a.text.as_str()).collect()
    }

    /// Original text of the call
    pub fn text<'a>(&self, file: &'a ProjectFile) -> &'a str {
        file.slice(self.location.span())
    }

    /// Text of the call with its argument list replaced by `arguments`
    pub fn rewritten_text(&self, file: &ProjectFile, arguments: &str) -> String {
        let call = self.location.span();
        let args = self.args_span;
        format!(
            "{}{}{}",
            &file.text[call.start..args.start],
            arguments,
            &file.text[args.end..call.end]
        )
    }
}

/// Something the AST walk or text search found, with the name it was called by
#[derive(Debug)]
enum Found {
    Call {
        name: String,
        call: CallExpr,
    },
    Indirect {
        name: String,
        form: IndirectForm,
        callee: NameRef,
        offset: usize,
    },
}

/// Scan every snapshot file for calls to `target`
pub fn scan_project(
    snapshot: &ProjectSnapshot,
    resolver: &dyn DeclarationResolver,
    target: &FunctionTarget,
    identity: &DeclarationId,
) -> Result<Vec<CallCandidate>, AbortReason> {
    let scanner = Scanner::new(snapshot, resolver, target, identity)?;
    let mut candidates = Vec::new();
    for file in snapshot.files() {
        candidates.extend(scanner.scan_file(file)?);
    }
    debug!(
        target = target.display_name(),
        candidates = candidates.len(),
        files = snapshot.len(),
        "scan complete"
    );
    Ok(candidates)
}

/// Template searches for a set of callee names
struct TemplatePatterns {
    call_re: Regex,
    indirect_re: Regex,
    reflect_re: Regex,
}

impl TemplatePatterns {
    fn new(names: &[String]) -> Result<Self, AbortReason> {
        let alternatives = names
            .iter()
            .map(|name| regex::escape(name))
            .collect::<Vec<_>>()
            .join("|");
        let compile = |pattern: String| {
            Regex::new(&pattern).map_err(|e| AbortReason::Provider(anyhow::Error::new(e)))
        };
        Ok(TemplatePatterns {
            call_re: compile(format!(
                r"(?P<prefix>[\w$]+(?:\??\.[\w$]+)*\??\.)?(?P<name>{})\s*(?:\?\.\s*)?\(",
                alternatives
            ))?,
            indirect_re: compile(format!(
                r"(?P<name>{})\s*\??\.\s*(?P<form>call|apply|bind)\s*\(",
                alternatives
            ))?,
            reflect_re: compile(format!(
                r"Reflect\s*\.\s*apply\s*\(\s*(?:[\w$]+\s*\??\.\s*)*(?P<name>{})\s*[,)]",
                alternatives
            ))?,
        })
    }
}

struct Scanner<'a> {
    snapshot: &'a ProjectSnapshot,
    resolver: &'a dyn DeclarationResolver,
    target: &'a FunctionTarget,
    identity: &'a DeclarationId,
    name: &'a str,
    /// Patterns for the target's own name; files with aliases compile their own
    patterns: TemplatePatterns,
}

impl<'a> Scanner<'a> {
    fn new(
        snapshot: &'a ProjectSnapshot,
        resolver: &'a dyn DeclarationResolver,
        target: &'a FunctionTarget,
        identity: &'a DeclarationId,
    ) -> Result<Self, AbortReason> {
        let name = target.name().unwrap_or_default();
        Ok(Scanner {
            snapshot,
            resolver,
            target,
            identity,
            name,
            patterns: TemplatePatterns::new(&[name.to_string()])?,
        })
    }

    /// The target's name plus every alias `file` can call it by
    fn callee_names(&self, file: &ProjectFile) -> Vec<String> {
        let mut names = vec![self.name.to_string()];
        if !self.identity.member {
            let aliases = self.resolver.aliases(&file.path, self.identity);
            if !aliases.is_empty() {
                debug!(file = %file.path.display(), ?aliases, "target is imported under other names");
            }
            names.extend(aliases);
        }
        names
    }

    fn scan_file(&self, file: &ProjectFile) -> Result<Vec<CallCandidate>, AbortReason> {
        let names = self.callee_names(file);
        let mut parsed = Vec::new();

        for script in &file.scripts {
            let mut collector = CallCollector {
                lowering: Lowering::new(script, &file.text),
                names: &names,
                super_classes: Vec::new(),
                found: Vec::new(),
            };
            script.module.visit_with(&mut collector);
            for found in collector.found {
                if let Some(candidate) = self.admit(file, found, false)? {
                    parsed.push(candidate);
                }
            }
        }

        let mut template = Vec::new();
        if file.language.is_markup() {
            let aliased;
            let patterns = if names.len() == 1 {
                &self.patterns
            } else {
                aliased = TemplatePatterns::new(&names)?;
                &aliased
            };
            for found in search_template(file, patterns) {
                if let Some(candidate) = self.admit(file, found, true)? {
                    template.push(candidate);
                }
            }
        }

        Ok(merge_candidates(parsed, template))
    }

    /// Whether a call of this shape can invoke the target at all
    fn accepts(&self, call: &CallExpr, from_template: bool) -> bool {
        let function = &self.target.function;
        match function.kind {
            FunctionKind::Constructor => matches!(call.form, CallForm::New | CallForm::Super),
            FunctionKind::Method => {
                call.form == CallForm::Call
                    && (call.property_access
                        // Object-literal methods are called bare from component templates
                        || (from_template && function.class_span.is_none()))
            }
            FunctionKind::Arrow => call.form == CallForm::Call,
            FunctionKind::Declaration | FunctionKind::Expression => call.form != CallForm::Super,
        }
    }

    fn admit(
        &self,
        file: &ProjectFile,
        found: Found,
        from_template: bool,
    ) -> Result<Option<CallCandidate>, AbortReason> {
        let (name, call) = match found {
            Found::Call { name, call } => (name, call),
            Found::Indirect {
                name,
                form,
                callee,
                offset,
            } => {
                let alias = name != self.name;
                return match resolve_reference(self.resolver, self.identity, &file.path, &callee) {
                    Resolution::Other { declaration, .. } => {
                        debug!(
                            file = %file.path.display(),
                            declaration = %declaration.file.display(),
                            "indirect use of a homonym ignored"
                        );
                        Ok(None)
                    }
                    Resolution::Unresolved if alias => Ok(None),
                    _ => Err(AbortReason::IncompatibleUsage {
                        name,
                        location: file.location(offset),
                        form,
                    }),
                };
            }
        };

        if !self.accepts(&call, from_template) {
            return Ok(None);
        }

        let resolution = resolve_reference(self.resolver, self.identity, &file.path, &call.callee);
        if name != self.name && resolution != Resolution::Target {
            // An alias only names the target where it resolves to it
            debug!(call = %file.location(call.span.start), alias = %name, "alias call not proven; skipped");
            return Ok(None);
        }
        let resolved = match resolution {
            Resolution::Target => true,
            Resolution::Unresolved => false,
            Resolution::Other {
                declaration,
                local: true,
            } => {
                let declared_at = self
                    .snapshot
                    .file(&declaration.file)
                    .map(|f| f.location(declaration.span.map(|s| s.start).unwrap_or(0)))
                    .unwrap_or_else(|| SourceLocation {
                        file: declaration.file.clone(),
                        line: 0,
                        column: 0,
                    });
                let target_at = self
                    .snapshot
                    .file(&self.target.file)
                    .map(|f| f.location(self.target.span().start))
                    .unwrap_or_else(|| declared_at.clone());
                return Err(AbortReason::NameCollision {
                    name: self.name.to_string(),
                    call: file.location(call.span.start),
                    declaration: declared_at,
                    target: target_at,
                });
            }
            Resolution::Other {
                declaration,
                local: false,
            } => {
                debug!(
                    call = %file.location(call.span.start),
                    declaration = %declaration.file.display(),
                    "call resolves to another module's declaration; not a target call"
                );
                return Ok(None);
            }
        };

        let location = if from_template {
            CandidateLocation::Text { span: call.span }
        } else {
            CandidateLocation::Node { span: call.span }
        };
        Ok(Some(CallCandidate {
            file: file.path.clone(),
            location,
            position: file.location(call.span.start),
            form: call.form,
            callee_text: call.callee_text,
            callee: call.callee,
            property_access: call.property_access,
            arguments: call.args,
            args_span: call.args_span,
            resolved,
            classification: None,
            reason: None,
        }))
    }
}

/// Merge parsed calls with template matches, in source order
///
/// A template match starting within `DEDUP_TOLERANCE` bytes of a parsed call
/// is that call seen twice, and is dropped.
pub fn merge_candidates(
    parsed: Vec<CallCandidate>,
    template: Vec<CallCandidate>,
) -> Vec<CallCandidate> {
    let mut candidates = parsed;
    for candidate in template {
        let duplicate = candidates.iter().any(|existing| {
            !existing.location.is_text()
                && existing.file == candidate.file
                && existing.location.start().abs_diff(candidate.location.start()) <= DEDUP_TOLERANCE
        });
        if duplicate {
            debug!(location = %candidate.position, "dropping duplicate template match");
        } else {
            candidates.push(candidate);
        }
    }
    candidates.sort_by_key(|c| (c.location.start(), c.location.span().end));
    candidates
}

/// Text search over the template regions of a markup file
fn search_template(file: &ProjectFile, patterns: &TemplatePatterns) -> Vec<Found> {
    let mut found = Vec::new();
    for region in &file.template {
        let text = &file.text[region.start..region.end];

        for caps in patterns.indirect_re.captures_iter(text) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.name("name")) else {
                continue;
            };
            if preceded_by_identifier(text, whole.start()) {
                continue;
            }
            let form = caps
                .name("form")
                .and_then(|m| IndirectForm::from_property(m.as_str()))
                .unwrap_or(IndirectForm::Call);
            let offset = region.start + whole.start();
            found.push(Found::Indirect {
                name: name.as_str().to_string(),
                form,
                callee: NameRef::Bare {
                    name: name.as_str().to_string(),
                    offset,
                },
                offset,
            });
        }

        for caps in patterns.reflect_re.captures_iter(text) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.name("name")) else {
                continue;
            };
            let offset = region.start + whole.start();
            found.push(Found::Indirect {
                name: name.as_str().to_string(),
                form: IndirectForm::ReflectApply,
                callee: NameRef::Opaque,
                offset,
            });
        }

        for caps in patterns.call_re.captures_iter(text) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.name("name")) else {
                continue;
            };
            if preceded_by_identifier(text, whole.start()) {
                continue;
            }
            let name = name.as_str().to_string();
            let start = region.start + whole.start();
            let open = region.start + whole.end() - 1;
            let Some(close) = matching_paren(&file.text[..region.end], open) else {
                warn!(
                    location = %file.location(start),
                    "unbalanced parentheses after template match; skipped"
                );
                continue;
            };

            let prefix = caps.name("prefix").map(|m| m.as_str());
            let callee = match prefix {
                None => NameRef::Bare {
                    name: name.clone(),
                    offset: start,
                },
                Some(p) => match p.trim_end_matches('.').trim_end_matches('?') {
                    "this" => NameRef::This {
                        name: name.clone(),
                        offset: start,
                    },
                    object if is_plain_identifier(object) => NameRef::Qualified {
                        object: object.to_string(),
                        name: name.clone(),
                        offset: start,
                    },
                    _ => NameRef::Opaque,
                },
            };
            let form = if preceded_by_new(text, whole.start()) {
                CallForm::New
            } else {
                CallForm::Call
            };
            let callee_end = region.start + whole.end() - 1;
            found.push(Found::Call {
                name,
                call: CallExpr {
                    form,
                    span: SourceSpan::new(start, close + 1),
                    callee_text: file.text[start..callee_end].trim_end().to_string(),
                    callee,
                    property_access: prefix.is_some(),
                    args: split_arguments(&file.text, open, close),
                    args_span: SourceSpan::new(open, close + 1),
                },
            });
        }
    }
    found
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn is_plain_identifier(text: &str) -> bool {
    !text.is_empty() && text.chars().all(is_identifier_char)
}

/// Whether the match at `start` continues a longer identifier or member chain
fn preceded_by_identifier(text: &str, start: usize) -> bool {
    text[..start]
        .chars()
        .next_back()
        .is_some_and(|c| is_identifier_char(c) || c == '.')
}

fn preceded_by_new(text: &str, start: usize) -> bool {
    let before = text[..start].trim_end();
    before.ends_with("new")
        && !before[..before.len() - 3]
            .chars()
            .next_back()
            .is_some_and(is_identifier_char)
        && before.len() < text[..start].len()
}

/// Offset of the `)` closing the `(` at `open`, skipping nested brackets and strings
pub fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = open;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(_) if b == b'\\' => i += 1,
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'"' | b'\'' | b'`' => quote = Some(b),
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return (b == b')').then_some(i);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}

/// Split the text between `open` and `close` on top-level commas
pub fn split_arguments(text: &str, open: usize, close: usize) -> Vec<Argument> {
    let mut pieces = Vec::new();
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut piece_start = open + 1;
    let mut i = open + 1;
    while i < close {
        let b = bytes[i];
        match quote {
            Some(_) if b == b'\\' => i += 1,
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'"' | b'\'' | b'`' => quote = Some(b),
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => depth = depth.saturating_sub(1),
                b',' if depth == 0 => {
                    pieces.push(SourceSpan::new(piece_start, i));
                    piece_start = i + 1;
                }
                _ => {}
            },
        }
        i += 1;
    }
    pieces.push(SourceSpan::new(piece_start, close));

    let mut args: Vec<Argument> = pieces
        .into_iter()
        .map(|piece| {
            let raw = &text[piece.start..piece.end];
            let start = piece.start + (raw.len() - raw.trim_start().len());
            let end = piece.end - (raw.len() - raw.trim_end().len());
            let arg_text = text[start..end.max(start)].to_string();
            let spread = arg_text.starts_with("...");
            let object_literal = !spread && is_object_literal_text(&arg_text);
            Argument {
                span: SourceSpan::new(start, end.max(start)),
                text: arg_text,
                spread,
                object_literal,
            }
        })
        .collect();

    // `f()` has no arguments and `f(a, b,)` has two
    if args.last().is_some_and(|a| a.text.is_empty()) {
        args.pop();
    }
    args
}

fn is_object_literal_text(text: &str) -> bool {
    let inner = text
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .map(str::trim)
        .unwrap_or(text);
    inner.starts_with('{')
        && inner.ends_with('}')
        && matching_paren(&format!("({})", inner), 0) == Some(inner.len() + 1)
}

/// Visitor collecting calls whose callee names the target
struct CallCollector<'a> {
    lowering: Lowering<'a>,
    /// Target name and its aliases in this file
    names: &'a [String],
    /// `extends` identifier of each enclosing class
    super_classes: Vec<Option<(String, usize)>>,
    found: Vec<Found>,
}

impl CallCollector<'_> {
    fn names_target(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    fn member_of(expr: &Expr) -> Option<&MemberExpr> {
        match expr {
            Expr::Member(member) => Some(member),
            Expr::OptChain(chain) => match &*chain.base {
                OptChainBase::Member(member) => Some(member),
                OptChainBase::Call(_) => None,
            },
            Expr::Paren(paren) => Self::member_of(&paren.expr),
            _ => None,
        }
    }

    /// `target.call(...)`, `target.apply(...)`, `target.bind(...)`, `Reflect.apply(target, ...)`
    fn indirect(&self, callee: &Expr, args: &[ExprOrSpread]) -> Option<Found> {
        let member = Self::member_of(callee)?;
        let property = member_name(&member.prop)?;

        if let Some(form) = IndirectForm::from_property(&property) {
            let (name, reference, _) = self.lowering.callee(&member.obj)?;
            if self.names_target(&name) {
                return Some(Found::Indirect {
                    name,
                    form,
                    callee: reference,
                    offset: self.lowering.span(callee.span()).start,
                });
            }
        }

        let reflect = matches!(&*member.obj, Expr::Ident(id) if &*id.sym == "Reflect");
        if reflect && property == "apply" {
            let first = args.first()?;
            let (name, reference, _) = self.lowering.callee(&first.expr)?;
            if self.names_target(&name) {
                return Some(Found::Indirect {
                    name,
                    form: IndirectForm::ReflectApply,
                    callee: reference,
                    offset: self.lowering.span(callee.span()).start,
                });
            }
        }
        None
    }

    /// Range from the opening parenthesis through the end of the call
    fn args_span(&self, after: usize, call: SourceSpan) -> SourceSpan {
        let from = after.clamp(call.start, call.end);
        let open = self.lowering.text[from..call.end]
            .find('(')
            .map(|i| from + i)
            .unwrap_or(call.end);
        SourceSpan::new(open, call.end)
    }

    fn record_call(
        &mut self,
        form: CallForm,
        span: Span,
        callee: &Expr,
        type_args: Option<&TsTypeParamInstantiation>,
        args: &[ExprOrSpread],
    ) {
        let Some((name, reference, property_access)) = self.lowering.callee(callee) else {
            return;
        };
        if !self.names_target(&name) {
            return;
        }
        let span = self.lowering.span(span);
        let callee_end = type_args
            .map(|t| self.lowering.span(t.span).end)
            .unwrap_or_else(|| self.lowering.span(callee.span()).end);
        self.found.push(Found::Call {
            name,
            call: CallExpr {
                form,
                span,
                callee_text: self.lowering.slice(callee.span()).to_string(),
                callee: reference,
                property_access,
                args: self.lowering.arguments(args),
                args_span: self.args_span(callee_end, span),
            },
        });
    }
}

impl Visit for CallCollector<'_> {
    fn visit_call_expr(&mut self, call: &swc_ecma_ast::CallExpr) {
        match &call.callee {
            Callee::Expr(callee) => {
                if let Some(indirect) = self.indirect(callee, &call.args) {
                    self.found.push(indirect);
                } else {
                    self.record_call(
                        CallForm::Call,
                        call.span,
                        callee,
                        call.type_args.as_deref(),
                        &call.args,
                    );
                }
            }
            Callee::Super(sup) => {
                if let Some(Some((class, offset))) = self.super_classes.last() {
                    if self.names_target(class) {
                        let span = self.lowering.span(call.span);
                        let keyword = self.lowering.span(sup.span);
                        self.found.push(Found::Call {
                            name: class.clone(),
                            call: CallExpr {
                                form: CallForm::Super,
                                span,
                                callee_text: "super".to_string(),
                                callee: NameRef::Bare {
                                    name: class.clone(),
                                    offset: *offset,
                                },
                                property_access: false,
                                args: self.lowering.arguments(&call.args),
                                args_span: self.args_span(keyword.end, span),
                            },
                        });
                    }
                }
            }
            Callee::Import(_) => {}
        }
        call.visit_children_with(self);
    }

    fn visit_opt_call(&mut self, call: &OptCall) {
        if let Some(indirect) = self.indirect(&call.callee, &call.args) {
            self.found.push(indirect);
        } else {
            self.record_call(
                CallForm::Call,
                call.span,
                &call.callee,
                call.type_args.as_deref(),
                &call.args,
            );
        }
        call.visit_children_with(self);
    }

    fn visit_new_expr(&mut self, new: &NewExpr) {
        match &new.args {
            Some(args) => self.record_call(
                CallForm::New,
                new.span,
                &new.callee,
                new.type_args.as_deref(),
                args,
            ),
            None => {
                if let Some((name, reference, property_access)) = self.lowering.callee(&new.callee) {
                    if self.names_target(&name) {
                        let span = self.lowering.span(new.span);
                        self.found.push(Found::Call {
                            call: CallExpr {
                                form: CallForm::New,
                                span,
                                callee_text: self.lowering.slice(new.callee.span()).to_string(),
                                callee: reference,
                                property_access,
                                args: Vec::new(),
                                args_span: SourceSpan::empty_at(span.end),
                            },
                            name,
                        });
                    }
                }
            }
        }
        new.visit_children_with(self);
    }

    fn visit_class(&mut self, class: &Class) {
        let super_class = class.super_class.as_deref().and_then(|expr| match expr {
            Expr::Ident(id) => Some((id.sym.to_string(), self.lowering.span(id.span).start)),
            _ => None,
        });
        self.super_classes.push(super_class);
        class.visit_children_with(self);
        self.super_classes.pop();
    }
}
