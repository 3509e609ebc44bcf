//! Declaration resolution
//!
//! Decides which declaration a callee refers to, so that calls to the target
//! can be told apart from calls to same-named but unrelated functions.
//!
//! Global invariants enforced:
//! - Resolution is best-effort and syntactic: an unresolvable reference is
//!   reported as such, never guessed
//! - Two identities are compared by declaration site when both carry one,
//!   and by (file, name) otherwise
//! - Caches live inside one resolver, which lives for one attempt
//!
//! Supported references:
//! - Bare identifiers, through lexical scopes (module, function, arrow,
//!   block, loop and catch scopes)
//! - Named, default and namespace imports of project files, following
//!   re-exports (`export { a as b } from`, `export * from`)
//! - `this.name` inside a class declaring `name`
//! - `ns.name` through a namespace import, `Class.name` for static members

use crate::ast::{BindingKind, FunctionKind, ImportedName, NameRef, VariableDecl};
use crate::language::ecmascript::{
    binding_names, export_name, module_specifier, prop_name, Lowering,
};
use crate::language::SourceSpan;
use crate::locate::FunctionTarget;
use crate::parser::ParsedScript;
use crate::project::{ProjectFile, ProjectSnapshot};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use swc_ecma_ast::*;
use swc_ecma_visit::{Visit, VisitWith};

/// Maximum number of import/re-export hops followed for one reference
const MAX_REEXPORT_DEPTH: usize = 8;

/// Extensions tried when resolving a relative module specifier
const MODULE_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "mts", "cts", "mjs", "cjs", "vue", "svelte",
];

/// Stable identity of a declaration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeclarationId {
    /// Project file declaring it, or the bare specifier of an external package
    pub file: PathBuf,
    pub name: String,
    /// Declaration site, when known
    pub span: Option<SourceSpan>,
    /// Class member rather than a lexical binding
    pub member: bool,
}

/// How a call's callee relates to the target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Proven to be the target declaration
    Target,
    /// A different declaration; `local` when it is a lexical binding of the
    /// file containing the call
    Other { declaration: DeclarationId, local: bool },
    /// Nothing to resolve against (globals, opaque receivers, unknown members)
    Unresolved,
}

/// Maps references to declarations
pub trait DeclarationResolver {
    /// Resolve a callee reference appearing in `file`
    fn resolve_declaration(&self, file: &Path, name: &NameRef) -> Option<DeclarationId>;

    /// Names other than `target.name` under which `file` can call the target:
    /// renamed imports, and renamed exports reached through a namespace import
    fn aliases(&self, file: &Path, target: &DeclarationId) -> Vec<String>;

    /// Whether identities are name-based guesses rather than semantic facts
    fn is_heuristic(&self) -> bool;

    fn same_declaration(&self, a: &DeclarationId, b: &DeclarationId) -> bool {
        match (a.span, b.span) {
            (Some(x), Some(y)) => a.file == b.file && x == y,
            _ => a.file == b.file && a.name == b.name,
        }
    }
}

/// Identity of the conversion target itself
pub fn target_identity(target: &FunctionTarget) -> DeclarationId {
    let function = &target.function;
    DeclarationId {
        file: target.file.clone(),
        name: function.name.clone().unwrap_or_default(),
        span: Some(function.identity_span),
        member: function.kind == FunctionKind::Method,
    }
}

/// Compare a callee against the target identity
pub fn resolve_reference(
    resolver: &dyn DeclarationResolver,
    target: &DeclarationId,
    file: &Path,
    callee: &NameRef,
) -> Resolution {
    match resolver.resolve_declaration(file, callee) {
        None => Resolution::Unresolved,
        Some(declaration) if resolver.same_declaration(&declaration, target) => Resolution::Target,
        Some(declaration) => {
            let local = declaration.file == file && !declaration.member;
            Resolution::Other { declaration, local }
        }
    }
}

/// What an exported name refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportTarget {
    /// A module-scope binding of the exporting file
    Local(String),
    /// Forwarded from another module
    ReExport { source: String, imported: ImportedName },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportEntry {
    /// Exported name; `default` for the default export
    pub exported: String,
    pub target: ExportTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMemberInfo {
    pub name: String,
    pub span: SourceSpan,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    pub name: Option<String>,
    pub span: SourceSpan,
    /// `extends` clause when it is a plain identifier, with its offset
    pub super_class: Option<(String, usize)>,
    pub methods: Vec<ClassMemberInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Scope {
    span: SourceSpan,
    bindings: Vec<VariableDecl>,
}

/// Per-file index of lexical bindings, exports and classes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModuleIndex {
    /// `scopes[0]` is the module scope
    scopes: Vec<Scope>,
    exports: Vec<ExportEntry>,
    star_exports: Vec<String>,
    classes: Vec<ClassInfo>,
}

impl ModuleIndex {
    /// Index every script of a file into one module scope
    pub fn build(scripts: &[ParsedScript], text: &str) -> Self {
        let mut index = ModuleIndex {
            scopes: vec![Scope {
                span: SourceSpan::new(0, text.len()),
                bindings: Vec::new(),
            }],
            ..Default::default()
        };
        for script in scripts {
            let mut builder = IndexBuilder {
                lowering: Lowering::new(script, text),
                index: &mut index,
                stack: vec![0],
                function_stack: vec![0],
                pending_class_name: None,
            };
            script.module.visit_with(&mut builder);
        }
        index
    }

    /// Innermost binding of `name` visible at `offset`
    pub fn lookup(&self, name: &str, offset: usize) -> Option<&VariableDecl> {
        self.scopes
            .iter()
            .filter(|scope| scope.span.contains_offset(offset))
            .filter_map(|scope| {
                scope
                    .bindings
                    .iter()
                    .find(|b| b.name == name)
                    .map(|b| (scope.span.len(), b))
            })
            .min_by_key(|(len, _)| *len)
            .map(|(_, binding)| binding)
    }

    /// Binding of `name` in the module scope
    pub fn module_binding(&self, name: &str) -> Option<&VariableDecl> {
        self.scopes
            .first()
            .and_then(|scope| scope.bindings.iter().find(|b| b.name == name))
    }

    /// Bindings declared in the module scope, imports included
    pub fn module_bindings(&self) -> &[VariableDecl] {
        self.scopes
            .first()
            .map(|scope| scope.bindings.as_slice())
            .unwrap_or_default()
    }

    pub fn exports(&self) -> &[ExportEntry] {
        &self.exports
    }

    pub fn star_exports(&self) -> &[String] {
        &self.star_exports
    }

    pub fn classes(&self) -> &[ClassInfo] {
        &self.classes
    }

    /// Innermost class whose range contains `offset`
    pub fn class_at(&self, offset: usize) -> Option<&ClassInfo> {
        self.classes
            .iter()
            .filter(|class| class.span.contains_offset(offset))
            .min_by_key(|class| class.span.len())
    }

    fn class_with_span(&self, span: SourceSpan) -> Option<&ClassInfo> {
        self.classes.iter().find(|class| class.span == span)
    }
}

/// Visitor that records scopes, bindings, exports and classes
struct IndexBuilder<'a> {
    lowering: Lowering<'a>,
    index: &'a mut ModuleIndex,
    /// Scope indices, innermost last
    stack: Vec<usize>,
    /// Scopes `var` declarations hoist to
    function_stack: Vec<usize>,
    pending_class_name: Option<String>,
}

impl IndexBuilder<'_> {
    fn push_scope(&mut self, span: SourceSpan, function: bool) {
        self.index.scopes.push(Scope {
            span,
            bindings: Vec::new(),
        });
        let id = self.index.scopes.len() - 1;
        self.stack.push(id);
        if function {
            self.function_stack.push(id);
        }
    }

    fn pop_scope(&mut self, function: bool) {
        self.stack.pop();
        if function {
            self.function_stack.pop();
        }
    }

    fn declare_in(&mut self, scope: usize, name: String, kind: BindingKind, span: SourceSpan) {
        self.index.scopes[scope]
            .bindings
            .push(VariableDecl { name, kind, span });
    }

    fn declare(&mut self, name: String, kind: BindingKind, span: SourceSpan) {
        let scope = self.stack.last().copied().unwrap_or(0);
        self.declare_in(scope, name, kind, span);
    }

    fn declare_pattern(&mut self, pat: &Pat, kind: BindingKind) {
        let mut names = Vec::new();
        binding_names(pat, &mut names);
        for (name, span) in names {
            let span = self.lowering.span(span);
            self.declare(name, kind.clone(), span);
        }
    }

    fn export(&mut self, exported: String, target: ExportTarget) {
        self.index.exports.push(ExportEntry { exported, target });
    }

    fn record_class(&mut self, name: Option<String>, class: &Class) {
        let super_class = class.super_class.as_deref().and_then(|expr| match expr {
            Expr::Ident(id) => Some((id.sym.to_string(), self.lowering.span(id.span).start)),
            _ => None,
        });
        let methods = class
            .body
            .iter()
            .filter_map(|member| match member {
                ClassMember::Method(m) if m.kind == MethodKind::Method => {
                    Some(ClassMemberInfo {
                        name: prop_name(&m.key)?,
                        span: self.lowering.span(m.span),
                        is_static: m.is_static,
                    })
                }
                ClassMember::ClassProp(p) if p.value.as_deref().is_some_and(is_function_value) => {
                    Some(ClassMemberInfo {
                        name: prop_name(&p.key)?,
                        span: self.lowering.span(p.span),
                        is_static: p.is_static,
                    })
                }
                _ => None,
            })
            .collect();
        self.index.classes.push(ClassInfo {
            name,
            span: self.lowering.span(class.span),
            super_class,
            methods,
        });
    }

    fn export_decl_names(&mut self, decl: &Decl) {
        match decl {
            Decl::Fn(f) => {
                let name = f.ident.sym.to_string();
                self.export(name.clone(), ExportTarget::Local(name));
            }
            Decl::Class(c) => {
                let name = c.ident.sym.to_string();
                self.export(name.clone(), ExportTarget::Local(name));
            }
            Decl::Var(var) => {
                let mut names = Vec::new();
                for declarator in &var.decls {
                    binding_names(&declarator.name, &mut names);
                }
                for (name, _) in names {
                    self.export(name.clone(), ExportTarget::Local(name));
                }
            }
            _ => {}
        }
    }

    fn import(&mut self, import: &ImportDecl) {
        let source = module_specifier(&import.src);
        for specifier in &import.specifiers {
            let (local, imported, span) = match specifier {
                ImportSpecifier::Named(named) => {
                    let imported = match named.imported.as_ref().map(export_name) {
                        Some(name) if name == "default" => ImportedName::Default,
                        Some(name) => ImportedName::Named(name),
                        None => ImportedName::Named(named.local.sym.to_string()),
                    };
                    (&named.local, imported, named.span)
                }
                ImportSpecifier::Default(default) => {
                    (&default.local, ImportedName::Default, default.span)
                }
                ImportSpecifier::Namespace(ns) => (&ns.local, ImportedName::Namespace, ns.span),
            };
            let kind = BindingKind::Import {
                source: source.clone(),
                imported,
            };
            let span = self.lowering.span(span);
            self.declare_in(0, local.sym.to_string(), kind, span);
        }
    }

    fn named_export(&mut self, export: &NamedExport) {
        let source = export.src.as_deref().map(module_specifier);
        for specifier in &export.specifiers {
            let (exported, imported) = match specifier {
                ExportSpecifier::Named(named) => {
                    let orig = export_name(&named.orig);
                    let exported = named.exported.as_ref().map(export_name);
                    let imported = if orig == "default" {
                        ImportedName::Default
                    } else {
                        ImportedName::Named(orig.clone())
                    };
                    (exported.unwrap_or_else(|| orig.clone()), (orig, imported))
                }
                ExportSpecifier::Default(default) => {
                    let name = default.exported.sym.to_string();
                    (name.clone(), (name, ImportedName::Default))
                }
                ExportSpecifier::Namespace(ns) => {
                    let name = export_name(&ns.name);
                    (name.clone(), (name, ImportedName::Namespace))
                }
            };
            let target = match &source {
                Some(source) => ExportTarget::ReExport {
                    source: source.clone(),
                    imported: imported.1,
                },
                None => ExportTarget::Local(imported.0),
            };
            self.export(exported, target);
        }
    }
}

fn is_function_value(expr: &Expr) -> bool {
    match expr {
        Expr::Arrow(_) | Expr::Fn(_) => true,
        Expr::Paren(paren) => is_function_value(&paren.expr),
        _ => false,
    }
}

impl Visit for IndexBuilder<'_> {
    fn visit_module_decl(&mut self, decl: &ModuleDecl) {
        match decl {
            ModuleDecl::Import(import) => self.import(import),
            ModuleDecl::ExportDecl(export) => self.export_decl_names(&export.decl),
            ModuleDecl::ExportNamed(export) => self.named_export(export),
            ModuleDecl::ExportDefaultDecl(export) => match &export.decl {
                DefaultDecl::Fn(f) => {
                    if let Some(ident) = &f.ident {
                        let name = ident.sym.to_string();
                        let span = self.lowering.span(f.function.span);
                        self.declare_in(0, name.clone(), BindingKind::Function, span);
                        self.export("default".to_string(), ExportTarget::Local(name));
                    }
                }
                DefaultDecl::Class(c) => {
                    if let Some(ident) = &c.ident {
                        let name = ident.sym.to_string();
                        let span = self.lowering.span(c.class.span);
                        self.declare_in(0, name.clone(), BindingKind::Class, span);
                        self.export("default".to_string(), ExportTarget::Local(name));
                    }
                }
                _ => {}
            },
            ModuleDecl::ExportDefaultExpr(export) => {
                if let Expr::Ident(ident) = &*export.expr {
                    self.export(
                        "default".to_string(),
                        ExportTarget::Local(ident.sym.to_string()),
                    );
                }
            }
            ModuleDecl::ExportAll(all) => {
                self.index.star_exports.push(module_specifier(&all.src));
            }
            _ => {}
        }
        decl.visit_children_with(self);
    }

    fn visit_fn_decl(&mut self, decl: &FnDecl) {
        if decl.function.body.is_some() {
            let span = self.lowering.span(decl.function.span);
            self.declare(decl.ident.sym.to_string(), BindingKind::Function, span);
        }
        decl.function.visit_with(self);
    }

    fn visit_fn_expr(&mut self, expr: &FnExpr) {
        // A named function expression binds its own name inside itself
        let span = self.lowering.span(expr.function.span);
        self.push_scope(span, true);
        if let Some(ident) = &expr.ident {
            self.declare(ident.sym.to_string(), BindingKind::Function, span);
        }
        expr.function.visit_with(self);
        self.pop_scope(true);
    }

    fn visit_function(&mut self, function: &Function) {
        self.push_scope(self.lowering.span(function.span), true);
        for param in &function.params {
            self.declare_pattern(&param.pat, BindingKind::Parameter);
        }
        function.visit_children_with(self);
        self.pop_scope(true);
    }

    fn visit_arrow_expr(&mut self, arrow: &ArrowExpr) {
        self.push_scope(self.lowering.span(arrow.span), true);
        for pat in &arrow.params {
            self.declare_pattern(pat, BindingKind::Parameter);
        }
        arrow.visit_children_with(self);
        self.pop_scope(true);
    }

    fn visit_constructor(&mut self, ctor: &Constructor) {
        self.push_scope(self.lowering.span(ctor.span), true);
        for param in &ctor.params {
            match param {
                ParamOrTsParamProp::Param(p) => {
                    self.declare_pattern(&p.pat, BindingKind::Parameter)
                }
                ParamOrTsParamProp::TsParamProp(prop) => match &prop.param {
                    TsParamPropParam::Ident(binding) => {
                        let span = self.lowering.span(binding.id.span);
                        self.declare(binding.id.sym.to_string(), BindingKind::Parameter, span);
                    }
                    TsParamPropParam::Assign(assign) => {
                        self.declare_pattern(&assign.left, BindingKind::Parameter)
                    }
                },
            }
        }
        ctor.visit_children_with(self);
        self.pop_scope(true);
    }

    fn visit_block_stmt(&mut self, block: &BlockStmt) {
        self.push_scope(self.lowering.span(block.span), false);
        block.visit_children_with(self);
        self.pop_scope(false);
    }

    fn visit_for_stmt(&mut self, stmt: &ForStmt) {
        self.push_scope(self.lowering.span(stmt.span), false);
        stmt.visit_children_with(self);
        self.pop_scope(false);
    }

    fn visit_for_in_stmt(&mut self, stmt: &ForInStmt) {
        self.push_scope(self.lowering.span(stmt.span), false);
        stmt.visit_children_with(self);
        self.pop_scope(false);
    }

    fn visit_for_of_stmt(&mut self, stmt: &ForOfStmt) {
        self.push_scope(self.lowering.span(stmt.span), false);
        stmt.visit_children_with(self);
        self.pop_scope(false);
    }

    fn visit_catch_clause(&mut self, clause: &CatchClause) {
        self.push_scope(self.lowering.span(clause.span), false);
        if let Some(param) = &clause.param {
            self.declare_pattern(param, BindingKind::Variable);
        }
        clause.visit_children_with(self);
        self.pop_scope(false);
    }

    fn visit_var_decl(&mut self, decl: &VarDecl) {
        let scope = if decl.kind == VarDeclKind::Var {
            self.function_stack.last().copied().unwrap_or(0)
        } else {
            self.stack.last().copied().unwrap_or(0)
        };
        for declarator in &decl.decls {
            match (&declarator.name, declarator.init.as_deref()) {
                (Pat::Ident(binding), Some(Expr::Class(class))) => {
                    // Constructor identity is the class range
                    let span = self.lowering.span(class.class.span);
                    self.declare_in(scope, binding.id.sym.to_string(), BindingKind::Class, span);
                    self.pending_class_name = Some(binding.id.sym.to_string());
                }
                (Pat::Ident(binding), _) => {
                    let span = self.lowering.span(declarator.span);
                    self.declare_in(
                        scope,
                        binding.id.sym.to_string(),
                        BindingKind::Variable,
                        span,
                    );
                }
                (pat, _) => {
                    let mut names = Vec::new();
                    binding_names(pat, &mut names);
                    for (name, span) in names {
                        let span = self.lowering.span(span);
                        self.declare_in(scope, name, BindingKind::Variable, span);
                    }
                }
            }
            declarator.visit_with(self);
        }
    }

    fn visit_class_decl(&mut self, decl: &ClassDecl) {
        let span = self.lowering.span(decl.class.span);
        self.declare(decl.ident.sym.to_string(), BindingKind::Class, span);
        self.record_class(Some(decl.ident.sym.to_string()), &decl.class);
        decl.class.visit_with(self);
    }

    fn visit_class_expr(&mut self, expr: &ClassExpr) {
        let pending = self.pending_class_name.take();
        let name = expr.ident.as_ref().map(|id| id.sym.to_string()).or(pending);
        self.record_class(name, &expr.class);
        expr.class.visit_with(self);
    }
}

/// Syntax-only resolver over a project snapshot
pub struct SyntacticResolver<'a> {
    snapshot: &'a ProjectSnapshot,
    /// (module, exported name) -> declaration, memoized for this attempt
    export_cache: RefCell<HashMap<(PathBuf, String), Option<DeclarationId>>>,
}

impl<'a> SyntacticResolver<'a> {
    pub fn new(snapshot: &'a ProjectSnapshot) -> Self {
        SyntacticResolver {
            snapshot,
            export_cache: RefCell::new(HashMap::new()),
        }
    }

    fn binding_identity(file: &ProjectFile, binding: &VariableDecl) -> DeclarationId {
        DeclarationId {
            file: file.path.clone(),
            name: binding.name.clone(),
            span: Some(binding.span),
            member: false,
        }
    }

    /// Follow a binding to the declaration it names
    fn resolve_binding(
        &self,
        file: &ProjectFile,
        binding: &VariableDecl,
        depth: usize,
    ) -> Option<DeclarationId> {
        match &binding.kind {
            BindingKind::Import { source, imported } => {
                self.resolve_import(&file.path, source, imported, depth)
            }
            _ => Some(Self::binding_identity(file, binding)),
        }
    }

    /// Resolve `imported` of module `source` as seen from `from`
    fn resolve_import(
        &self,
        from: &Path,
        source: &str,
        imported: &ImportedName,
        depth: usize,
    ) -> Option<DeclarationId> {
        let exported = match imported {
            ImportedName::Named(name) => name.clone(),
            ImportedName::Default => "default".to_string(),
            ImportedName::Namespace => return None,
        };
        if !is_relative_specifier(source) {
            // Declared by an external package
            return Some(DeclarationId {
                file: PathBuf::from(source),
                name: exported,
                span: None,
                member: false,
            });
        }
        let module = resolve_module_path(from, source, |p| self.snapshot.contains(p))?;
        self.resolve_export(&module, &exported, depth + 1)
    }

    /// Declaration behind an exported name of a project module
    fn resolve_export(&self, module: &Path, exported: &str, depth: usize) -> Option<DeclarationId> {
        if depth > MAX_REEXPORT_DEPTH {
            return None;
        }
        let key = (module.to_path_buf(), exported.to_string());
        if let Some(hit) = self.export_cache.borrow().get(&key) {
            return hit.clone();
        }
        let resolved = self.resolve_export_uncached(module, exported, depth);
        self.export_cache.borrow_mut().insert(key, resolved.clone());
        resolved
    }

    fn resolve_export_uncached(
        &self,
        module: &Path,
        exported: &str,
        depth: usize,
    ) -> Option<DeclarationId> {
        let file = self.snapshot.file(module)?;
        if let Some(entry) = file.index.exports().iter().find(|e| e.exported == exported) {
            return match &entry.target {
                ExportTarget::Local(local) => {
                    let binding = file.index.module_binding(local)?;
                    self.resolve_binding(file, binding, depth)
                }
                ExportTarget::ReExport { source, imported } => {
                    self.resolve_import(module, source, imported, depth)
                }
            };
        }
        if exported == "default" {
            return None;
        }
        file.index.star_exports().iter().find_map(|source| {
            self.resolve_import(module, source, &ImportedName::Named(exported.to_string()), depth)
        })
    }

    /// Static member `name` of the class identified by `class`
    fn static_member(&self, class: &DeclarationId, name: &str) -> Option<DeclarationId> {
        let file = self.snapshot.file(&class.file)?;
        let info = file.index.class_with_span(class.span?)?;
        info.methods
            .iter()
            .find(|m| m.is_static && m.name == name)
            .map(|m| DeclarationId {
                file: file.path.clone(),
                name: m.name.clone(),
                span: Some(m.span),
                member: true,
            })
    }
}

impl DeclarationResolver for SyntacticResolver<'_> {
    fn resolve_declaration(&self, path: &Path, name: &NameRef) -> Option<DeclarationId> {
        let file = self.snapshot.file(path)?;
        match name {
            NameRef::Bare { name, offset } => {
                let binding = file.index.lookup(name, *offset)?;
                self.resolve_binding(file, binding, 0)
            }
            NameRef::This { name, offset } => {
                let class = file.index.class_at(*offset)?;
                let member = class.methods.iter().find(|m| &m.name == name)?;
                Some(DeclarationId {
                    file: file.path.clone(),
                    name: member.name.clone(),
                    span: Some(member.span),
                    member: true,
                })
            }
            NameRef::Qualified {
                object,
                name,
                offset,
            } => {
                let binding = file.index.lookup(object, *offset)?;
                match &binding.kind {
                    BindingKind::Import {
                        source,
                        imported: ImportedName::Namespace,
                    } => {
                        let named = ImportedName::Named(name.clone());
                        self.resolve_import(&file.path, source, &named, 0)
                    }
                    BindingKind::Class | BindingKind::Import { .. } => {
                        let class = self.resolve_binding(file, binding, 0)?;
                        self.static_member(&class, name)
                    }
                    _ => None,
                }
            }
            NameRef::Opaque => None,
        }
    }

    fn aliases(&self, path: &Path, target: &DeclarationId) -> Vec<String> {
        let Some(file) = self.snapshot.file(path) else {
            return Vec::new();
        };
        let is_target = |declaration: Option<DeclarationId>| {
            declaration.is_some_and(|d| self.same_declaration(&d, target))
        };
        let mut aliases: Vec<String> = Vec::new();
        for binding in file.index.module_bindings() {
            let BindingKind::Import { source, imported } = &binding.kind else {
                continue;
            };
            if *imported != ImportedName::Namespace {
                if binding.name != target.name && is_target(self.resolve_binding(file, binding, 0)) {
                    aliases.push(binding.name.clone());
                }
                continue;
            }
            let Some(module) = is_relative_specifier(source)
                .then(|| resolve_module_path(&file.path, source, |p| self.snapshot.contains(p)))
                .flatten()
            else {
                continue;
            };
            let Some(exporter) = self.snapshot.file(&module) else {
                continue;
            };
            for entry in exporter.index.exports() {
                if entry.exported != target.name
                    && entry.exported != "default"
                    && is_target(self.resolve_export(&module, &entry.exported, 1))
                {
                    aliases.push(entry.exported.clone());
                }
            }
        }
        aliases.sort();
        aliases.dedup();
        aliases
    }

    fn is_heuristic(&self) -> bool {
        true
    }
}

fn is_relative_specifier(source: &str) -> bool {
    source.starts_with("./") || source.starts_with("../")
}

/// Resolve a relative module specifier to a project-relative file path
///
/// Tries the specifier as written, then with each known extension, then as a
/// directory with an `index.*` file.
pub fn resolve_module_path(
    from: &Path,
    source: &str,
    exists: impl Fn(&Path) -> bool,
) -> Option<PathBuf> {
    let parent = from.parent().unwrap_or(Path::new(""));
    let base = normalize_path_lexically(&parent.join(source));

    if Path::new(source).extension().is_some() && exists(&base) {
        return Some(base);
    }

    for ext in MODULE_EXTENSIONS {
        let mut name = base.clone().into_os_string();
        name.push(".");
        name.push(ext);
        let candidate = PathBuf::from(name);
        if exists(&candidate) {
            return Some(candidate);
        }
    }

    // ESM-style `./a.js` pointing at `a.ts`
    if let Some(ext) = base.extension().and_then(|e| e.to_str()) {
        if matches!(ext, "js" | "jsx" | "mjs" | "cjs") {
            for ext in ["ts", "tsx", "mts", "cts"] {
                let candidate = base.with_extension(ext);
                if exists(&candidate) {
                    return Some(candidate);
                }
            }
        }
    }

    for ext in ["ts", "js", "tsx", "jsx"] {
        let candidate = base.join(format!("index.{}", ext));
        if exists(&candidate) {
            return Some(candidate);
        }
    }

    None
}

fn normalize_path_lexically(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for c in path.components() {
        match c {
            Component::ParentDir => {
                if matches!(components.last(), Some(Component::Normal(_))) {
                    components.pop();
                } else {
                    components.push(c);
                }
            }
            Component::CurDir => {}
            other => components.push(other),
        }
    }
    components.iter().collect()
}
