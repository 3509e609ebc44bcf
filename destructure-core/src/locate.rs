//! Target location: the innermost function-like construct around a position
//!
//! Global invariants enforced:
//! - Declarations, variable-bound expressions, methods and constructors are
//!   searched uniformly
//! - The smallest enclosing range wins over any outer match
//!
//! Supported constructs:
//! - Function declarations (`FnDecl`) and function expressions (`FnExpr`)
//! - Arrow functions (`ArrowExpr`), named after the variable they are bound to
//! - Class methods, class fields holding a function, and constructors
//! - Object literal methods (`MethodProp`) and `key: function/arrow` properties
//!
//! Ignored constructs:
//! - Getters and setters (their call sites are property reads and writes)
//! - Overload signatures without bodies (recorded only to flag overloads)

use crate::ast::{FunctionBody, FunctionKind, FunctionLike, ParamPattern, Parameter};
use crate::language::ecmascript::{params_span, prop_name, Lowering};
use crate::language::SourceSpan;
use crate::project::ProjectFile;
use std::collections::HashSet;
use std::path::PathBuf;
use swc_common::Spanned;
use swc_ecma_ast::*;
use swc_ecma_visit::{Visit, VisitWith};

/// The function selected for conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionTarget {
    /// Declaring file, project-relative
    pub file: PathBuf,
    pub function: FunctionLike,
    /// The parameter list is already one destructured object
    pub already_destructured: bool,
}

impl FunctionTarget {
    pub fn name(&self) -> Option<&str> {
        self.function.name.as_deref()
    }

    /// Name used in messages, even for anonymous constructs
    pub fn display_name(&self) -> &str {
        self.name().unwrap_or("<anonymous>")
    }

    /// Declaration range the target is identified by
    pub fn span(&self) -> SourceSpan {
        self.function.span
    }
}

/// Locate the conversion target around `offset` of `file`
pub fn locate_target(file: &ProjectFile, offset: usize) -> Option<FunctionTarget> {
    let function = locate_function(file, offset)?;
    let already_destructured = matches!(
        function.params.as_slice(),
        [Parameter {
            pattern: ParamPattern::Object,
            ..
        }]
    );
    Some(FunctionTarget {
        file: file.path.clone(),
        function,
        already_destructured,
    })
}

/// Find the innermost function-like construct whose range contains `offset`
///
/// Returns `None` when the position is not inside any function.
pub fn locate_function(file: &ProjectFile, offset: usize) -> Option<FunctionLike> {
    file.scripts
        .iter()
        .filter(|script| script.range.contains_offset(offset))
        .flat_map(|script| collect_functions(Lowering::new(script, &file.text)))
        .filter(|function| function.span.contains_offset(offset))
        .min_by(|a, b| {
            a.span
                .len()
                .cmp(&b.span.len())
                .then(b.span.start.cmp(&a.span.start))
        })
}

/// Collect every function-like construct of one script, in source order
pub fn collect_functions(lowering: Lowering<'_>) -> Vec<FunctionLike> {
    let mut collector = FunctionCollector {
        lowering,
        functions: Vec::new(),
        overload_scopes: Vec::new(),
        classes: Vec::new(),
        pending_class_name: None,
    };
    lowering.script.module.visit_with(&mut collector);
    collector.functions.sort_by_key(|f| (f.span.start, f.span.end));
    collector.functions
}

struct ClassContext {
    name: Option<String>,
    span: SourceSpan,
}

/// Visitor to collect function-like constructs from the AST
struct FunctionCollector<'a> {
    lowering: Lowering<'a>,
    functions: Vec<FunctionLike>,
    /// Names declared without a body, per enclosing statement list or class body
    overload_scopes: Vec<HashSet<String>>,
    classes: Vec<ClassContext>,
    /// Variable name a class expression is being bound to
    pending_class_name: Option<String>,
}

impl FunctionCollector<'_> {
    fn record(
        &mut self,
        kind: FunctionKind,
        name: Option<String>,
        span: SourceSpan,
        identity_span: SourceSpan,
        params: Vec<Parameter>,
        body: Option<FunctionBody>,
    ) {
        let params_span = params_span(&params);
        let overloaded = match (&name, self.overload_scopes.last()) {
            (Some(n), Some(scope)) => scope.contains(n),
            _ => false,
        };
        let class_span = match kind {
            FunctionKind::Method | FunctionKind::Constructor => {
                self.classes.last().map(|c| c.span)
            }
            _ => None,
        };
        self.functions.push(FunctionLike {
            kind,
            name,
            span,
            identity_span,
            params,
            params_span,
            parenthesized: true,
            body,
            overloaded,
            class_span,
        });
    }

    /// Arrows are the only construct whose parameter list may lack parentheses
    fn record_arrow(
        &mut self,
        kind: FunctionKind,
        name: Option<String>,
        span: SourceSpan,
        arrow: &ArrowExpr,
    ) {
        let params = self.lowering.arrow_params(&arrow.params);
        let body = self.lowering.arrow_body(&arrow.body);
        let parenthesized = self.lowering.arrow_parenthesized(arrow);
        self.record(kind, name, span, span, params, Some(body));
        if let Some(function) = self.functions.last_mut() {
            function.parenthesized = parenthesized;
        }
    }

    /// Record a function or arrow expression under a name it is bound to
    fn record_bound_expr(
        &mut self,
        name: Option<String>,
        kind: FunctionKind,
        span: SourceSpan,
        expr: &Expr,
    ) -> bool {
        match expr {
            Expr::Arrow(arrow) => {
                let kind = if kind == FunctionKind::Method {
                    kind
                } else {
                    FunctionKind::Arrow
                };
                self.record_arrow(kind, name, span, arrow);
                arrow.visit_children_with(self);
                true
            }
            Expr::Fn(fn_expr) => {
                if let Some(body) = &fn_expr.function.body {
                    let params = self.lowering.params(&fn_expr.function.params);
                    let body = self.lowering.block_body(body);
                    let kind = if kind == FunctionKind::Method {
                        kind
                    } else {
                        FunctionKind::Expression
                    };
                    self.record(kind, name, span, span, params, Some(body));
                }
                fn_expr.visit_children_with(self);
                true
            }
            Expr::Paren(paren) => self.record_bound_expr(name, kind, span, &paren.expr),
            _ => false,
        }
    }

    fn visit_class_body(&mut self, name: Option<String>, class: &Class) {
        let bodiless: HashSet<String> = class
            .body
            .iter()
            .filter_map(|member| match member {
                ClassMember::Method(m) if m.function.body.is_none() => prop_name(&m.key),
                ClassMember::Constructor(c) if c.body.is_none() => Some(constructor_key(&name)),
                _ => None,
            })
            .collect();
        self.classes.push(ClassContext {
            name,
            span: self.lowering.span(class.span),
        });
        self.overload_scopes.push(bodiless);
        class.visit_children_with(self);
        self.overload_scopes.pop();
        self.classes.pop();
    }
}

/// Key a constructor is recorded under in a class overload scope
fn constructor_key(class_name: &Option<String>) -> String {
    class_name.clone().unwrap_or_else(|| "constructor".to_string())
}

fn bodiless_fn_name(decl: &Decl) -> Option<String> {
    match decl {
        Decl::Fn(f) if f.function.body.is_none() => Some(f.ident.sym.to_string()),
        _ => None,
    }
}

impl Visit for FunctionCollector<'_> {
    fn visit_module_items(&mut self, items: &[ModuleItem]) {
        let bodiless = items
            .iter()
            .filter_map(|item| match item {
                ModuleItem::Stmt(Stmt::Decl(decl)) => bodiless_fn_name(decl),
                ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => {
                    bodiless_fn_name(&export.decl)
                }
                _ => None,
            })
            .collect();
        self.overload_scopes.push(bodiless);
        items.visit_children_with(self);
        self.overload_scopes.pop();
    }

    fn visit_stmts(&mut self, stmts: &[Stmt]) {
        let bodiless = stmts
            .iter()
            .filter_map(|stmt| match stmt {
                Stmt::Decl(decl) => bodiless_fn_name(decl),
                _ => None,
            })
            .collect();
        self.overload_scopes.push(bodiless);
        stmts.visit_children_with(self);
        self.overload_scopes.pop();
    }

    fn visit_fn_decl(&mut self, decl: &FnDecl) {
        if let Some(body) = &decl.function.body {
            let span = self.lowering.span(decl.function.span);
            let params = self.lowering.params(&decl.function.params);
            let body = self.lowering.block_body(body);
            self.record(
                FunctionKind::Declaration,
                Some(decl.ident.sym.to_string()),
                span,
                span,
                params,
                Some(body),
            );
        }
        decl.visit_children_with(self);
    }

    fn visit_fn_expr(&mut self, expr: &FnExpr) {
        if let Some(body) = &expr.function.body {
            let span = self.lowering.span(expr.function.span);
            let params = self.lowering.params(&expr.function.params);
            let body = self.lowering.block_body(body);
            self.record(
                FunctionKind::Expression,
                expr.ident.as_ref().map(|id| id.sym.to_string()),
                span,
                span,
                params,
                Some(body),
            );
        }
        expr.visit_children_with(self);
    }

    fn visit_arrow_expr(&mut self, arrow: &ArrowExpr) {
        // Unbound arrow (callback, IIFE): no name to search call sites by
        let span = self.lowering.span(arrow.span);
        self.record_arrow(FunctionKind::Arrow, None, span, arrow);
        arrow.visit_children_with(self);
    }

    fn visit_var_declarator(&mut self, declarator: &VarDeclarator) {
        if let (Pat::Ident(binding), Some(init)) = (&declarator.name, &declarator.init) {
            let name = binding.id.sym.to_string();
            let span = self.lowering.span(declarator.span);
            if self.record_bound_expr(Some(name.clone()), FunctionKind::Expression, span, init) {
                return;
            }
            if matches!(&**init, Expr::Class(_)) {
                self.pending_class_name = Some(name);
            }
        }
        declarator.visit_children_with(self);
    }

    fn visit_class_decl(&mut self, decl: &ClassDecl) {
        self.visit_class_body(Some(decl.ident.sym.to_string()), &decl.class);
    }

    fn visit_class_expr(&mut self, expr: &ClassExpr) {
        let pending = self.pending_class_name.take();
        let name = expr.ident.as_ref().map(|id| id.sym.to_string()).or(pending);
        self.visit_class_body(name, &expr.class);
    }

    fn visit_class_method(&mut self, method: &ClassMethod) {
        if method.kind == MethodKind::Method {
            if let Some(body) = &method.function.body {
                let span = self.lowering.span(method.span);
                let params = self.lowering.params(&method.function.params);
                let body = self.lowering.block_body(body);
                self.record(
                    FunctionKind::Method,
                    prop_name(&method.key),
                    span,
                    span,
                    params,
                    Some(body),
                );
            }
        }
        method.function.visit_with(self);
    }

    fn visit_class_prop(&mut self, prop: &ClassProp) {
        if let Some(value) = &prop.value {
            let span = self.lowering.span(prop.span);
            if self.record_bound_expr(prop_name(&prop.key), FunctionKind::Method, span, value) {
                return;
            }
        }
        prop.visit_children_with(self);
    }

    fn visit_constructor(&mut self, ctor: &Constructor) {
        if let Some(body) = &ctor.body {
            let class = self.classes.last();
            let name = class.and_then(|c| c.name.clone());
            let identity = class
                .map(|c| c.span)
                .unwrap_or_else(|| self.lowering.span(ctor.span));
            let span = self.lowering.span(ctor.span);
            let params = self.lowering.constructor_params(&ctor.params);
            let body = self.lowering.block_body(body);
            self.record(FunctionKind::Constructor, name, span, identity, params, Some(body));
        }
        ctor.visit_children_with(self);
    }

    fn visit_method_prop(&mut self, method: &MethodProp) {
        if let Some(body) = &method.function.body {
            let span = self
                .lowering
                .span(method.key.span())
                .cover(&self.lowering.span(method.function.span));
            let params = self.lowering.params(&method.function.params);
            let body = self.lowering.block_body(body);
            self.record(
                FunctionKind::Method,
                prop_name(&method.key),
                span,
                span,
                params,
                Some(body),
            );
        }
        method.function.visit_with(self);
    }

    fn visit_key_value_prop(&mut self, prop: &KeyValueProp) {
        let span = self
            .lowering
            .span(prop.key.span())
            .cover(&self.lowering.span(prop.value.span()));
        if !self.record_bound_expr(prop_name(&prop.key), FunctionKind::Method, span, &prop.value) {
            prop.visit_children_with(self);
        }
    }
}
