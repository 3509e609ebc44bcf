//! Lowering of SWC nodes into the AST facade
//!
//! Every walker over an ECMAScript module goes through [`Lowering`], which
//! owns the span conversion for one script and slices verbatim text out of
//! the file.

use crate::ast::{
    Argument, FunctionBody, NameRef, ParamPattern, Parameter, TupleElement,
};
use crate::language::SourceSpan;
use crate::parser::ParsedScript;
use swc_common::{Span, Spanned};
use swc_ecma_ast::*;

/// Span and text access for one parsed script of a file
#[derive(Clone, Copy)]
pub struct Lowering<'a> {
    pub script: &'a ParsedScript,
    /// Text of the whole file the script belongs to
    pub text: &'a str,
}

impl<'a> Lowering<'a> {
    pub fn new(script: &'a ParsedScript, text: &'a str) -> Self {
        Lowering { script, text }
    }

    /// File-relative range of an SWC span
    pub fn span(&self, span: Span) -> SourceSpan {
        self.script.span(span)
    }

    /// Verbatim file text under an SWC span
    pub fn slice(&self, span: Span) -> &'a str {
        let s = self.span(span);
        self.text.get(s.start..s.end).unwrap_or("")
    }

    /// Lower the parameters of a `function`, method, or function expression
    pub fn params(&self, params: &[Param]) -> Vec<Parameter> {
        params
            .iter()
            .map(|param| {
                let mut lowered = self.pattern(&param.pat);
                lowered.span = lowered.span.cover(&self.span(param.span));
                for decorator in &param.decorators {
                    lowered.span = lowered.span.cover(&self.span(decorator.span));
                }
                lowered.decorated = !param.decorators.is_empty();
                lowered
            })
            .collect()
    }

    /// Lower the parameters of an arrow function
    pub fn arrow_params(&self, pats: &[Pat]) -> Vec<Parameter> {
        pats.iter().map(|pat| self.pattern(pat)).collect()
    }

    /// Lower constructor parameters, flagging parameter properties
    pub fn constructor_params(&self, params: &[ParamOrTsParamProp]) -> Vec<Parameter> {
        params
            .iter()
            .map(|param| match param {
                ParamOrTsParamProp::Param(p) => self
                    .params(std::slice::from_ref(p))
                    .pop()
                    .unwrap_or_else(|| self.invalid(p.span)),
                ParamOrTsParamProp::TsParamProp(prop) => {
                    let mut lowered = match &prop.param {
                        TsParamPropParam::Ident(binding) => {
                            self.pattern(&Pat::Ident(binding.clone()))
                        }
                        TsParamPropParam::Assign(assign) => {
                            self.pattern(&Pat::Assign(assign.clone()))
                        }
                    };
                    lowered.span = lowered.span.cover(&self.span(prop.span));
                    lowered.decorated = !prop.decorators.is_empty();
                    lowered.property = true;
                    lowered
                }
            })
            .collect()
    }

    fn invalid(&self, span: Span) -> Parameter {
        Parameter {
            span: self.span(span),
            pattern: ParamPattern::Invalid,
            type_text: None,
            default_text: None,
            decorated: false,
            property: false,
        }
    }

    fn annotation(&self, type_ann: Option<&TsTypeAnn>) -> Option<String> {
        type_ann.map(|t| self.slice(t.type_ann.span()).to_string())
    }

    fn pattern(&self, pat: &Pat) -> Parameter {
        let mut param = self.invalid(pat.span());
        match pat {
            Pat::Ident(binding) => {
                param.pattern = if &*binding.id.sym == "this" {
                    ParamPattern::This
                } else {
                    ParamPattern::Ident {
                        name: binding.id.sym.to_string(),
                        optional: binding.id.optional,
                    }
                };
                param.type_text = self.annotation(binding.type_ann.as_deref());
                if let Some(type_ann) = &binding.type_ann {
                    param.span = param.span.cover(&self.span(type_ann.span));
                }
            }
            Pat::Assign(assign) => {
                let left = self.pattern(&assign.left);
                param.pattern = left.pattern;
                param.type_text = left.type_text;
                param.default_text = Some(self.slice(assign.right.span()).to_string());
                param.span = param
                    .span
                    .cover(&left.span)
                    .cover(&self.span(assign.right.span()));
            }
            Pat::Rest(rest) => {
                let (name, inner_ann) = match &*rest.arg {
                    Pat::Ident(binding) => {
                        (Some(binding.id.sym.to_string()), binding.type_ann.as_deref())
                    }
                    _ => (None, None),
                };
                let type_ann = rest.type_ann.as_deref().or(inner_ann);
                let tuple = type_ann.and_then(|t| match &*t.type_ann {
                    TsType::TsTupleType(tuple) => Some(self.tuple(tuple)),
                    _ => None,
                });
                if let Some(t) = type_ann {
                    param.span = param.span.cover(&self.span(t.span));
                }
                param.pattern = ParamPattern::Rest { name, tuple };
                param.type_text = self.annotation(type_ann);
            }
            Pat::Object(object) => {
                param.pattern = ParamPattern::Object;
                param.type_text = self.annotation(object.type_ann.as_deref());
            }
            Pat::Array(array) => {
                param.pattern = ParamPattern::Array;
                param.type_text = self.annotation(array.type_ann.as_deref());
            }
            _ => {}
        }
        param
    }

    fn tuple(&self, tuple: &TsTupleType) -> Vec<TupleElement> {
        tuple
            .elem_types
            .iter()
            .map(|element| {
                let (name, label_optional, label_rest) = match &element.label {
                    Some(Pat::Ident(binding)) => {
                        (Some(binding.id.sym.to_string()), binding.id.optional, false)
                    }
                    Some(Pat::Rest(rest)) => match &*rest.arg {
                        Pat::Ident(binding) => (Some(binding.id.sym.to_string()), false, true),
                        _ => (None, false, true),
                    },
                    _ => (None, false, false),
                };
                let (type_text, optional, variadic) = match &*element.ty {
                    TsType::TsOptionalType(opt) => (self.slice(opt.type_ann.span()), true, false),
                    TsType::TsRestType(rest) => (self.slice(rest.type_ann.span()), false, true),
                    other => (self.slice(other.span()), false, false),
                };
                TupleElement {
                    name,
                    optional: optional || label_optional,
                    type_text: type_text.to_string(),
                    variadic: variadic || label_rest,
                }
            })
            .collect()
    }

    /// Whether an arrow's parameter list is wrapped in `(`
    ///
    /// `x => ..` and `async x => ..` are the only unwrapped forms: a single
    /// identifier that starts the arrow, or follows only `async`.
    pub fn arrow_parenthesized(&self, arrow: &ArrowExpr) -> bool {
        let [Pat::Ident(param)] = arrow.params.as_slice() else {
            return true;
        };
        if param.type_ann.is_some() {
            return true;
        }
        let start = self.span(arrow.span).start;
        let param_start = self.span(param.span()).start;
        if param_start < start {
            return true;
        }
        let prefix = self.text[start..param_start].trim();
        !(prefix.is_empty() || prefix == "async")
    }

    pub fn block_body(&self, block: &BlockStmt) -> FunctionBody {
        FunctionBody::Block {
            open_brace: self.span(block.span).start,
            first_statement: block.stmts.first().map(|s| self.span(s.span()).start),
        }
    }

    pub fn arrow_body(&self, body: &BlockStmtOrExpr) -> FunctionBody {
        match body {
            BlockStmtOrExpr::BlockStmt(block) => self.block_body(block),
            BlockStmtOrExpr::Expr(expr) => FunctionBody::Expr {
                span: self.span(expr.span()),
            },
        }
    }

    /// Name a callee expression refers to, with its receiver and whether it is a property access
    pub fn callee(&self, expr: &Expr) -> Option<(String, NameRef, bool)> {
        match expr {
            Expr::Ident(id) => Some((
                id.sym.to_string(),
                NameRef::Bare {
                    name: id.sym.to_string(),
                    offset: self.span(id.span).start,
                },
                false,
            )),
            Expr::Member(member) => self.member(member),
            Expr::OptChain(chain) => match &*chain.base {
                OptChainBase::Member(member) => self.member(member),
                OptChainBase::Call(_) => None,
            },
            Expr::TsNonNull(non_null) => self.callee(&non_null.expr),
            _ => None,
        }
    }

    fn member(&self, member: &MemberExpr) -> Option<(String, NameRef, bool)> {
        let name = member_name(&member.prop)?;
        let receiver = match &*member.obj {
            Expr::This(this) => NameRef::This {
                name: name.clone(),
                offset: self.span(this.span).start,
            },
            Expr::Ident(object) => NameRef::Qualified {
                object: object.sym.to_string(),
                name: name.clone(),
                offset: self.span(object.span).start,
            },
            _ => NameRef::Opaque,
        };
        Some((name, receiver, true))
    }

    pub fn arguments(&self, args: &[ExprOrSpread]) -> Vec<Argument> {
        args.iter()
            .map(|arg| {
                let mut span = self.span(arg.expr.span());
                if let Some(spread) = arg.spread {
                    span = span.cover(&self.span(spread));
                }
                Argument {
                    span,
                    text: self.slice(arg.expr.span()).to_string(),
                    spread: arg.spread.is_some(),
                    object_literal: arg.spread.is_none() && is_object_literal(&arg.expr),
                }
            })
            .collect()
    }
}

/// Smallest span covering every parameter
pub fn params_span(params: &[Parameter]) -> Option<SourceSpan> {
    let first = params.first()?;
    Some(
        params
            .iter()
            .fold(first.span, |acc, param| acc.cover(&param.span)),
    )
}

fn is_object_literal(expr: &Expr) -> bool {
    match expr {
        Expr::Object(_) => true,
        Expr::Paren(paren) => is_object_literal(&paren.expr),
        _ => false,
    }
}

/// Static property name of a member access (`.name` or `["name"]`)
pub fn member_name(prop: &MemberProp) -> Option<String> {
    match prop {
        MemberProp::Ident(ident) => Some(ident.sym.to_string()),
        MemberProp::Computed(computed) => match &*computed.expr {
            Expr::Lit(Lit::Str(s)) => Some(s.value.to_atom_lossy().to_string()),
            _ => None,
        },
        MemberProp::PrivateName(_) => None,
    }
}

/// Static name of a property key
pub fn prop_name(key: &PropName) -> Option<String> {
    match key {
        PropName::Ident(ident) => Some(ident.sym.to_string()),
        // Wtf8Atom to String via to_atom_lossy (borrows when possible)
        PropName::Str(str_lit) => Some(str_lit.value.to_atom_lossy().to_string()),
        PropName::Num(num) => Some(num.to_string()),
        _ => None,
    }
}

/// Collect every identifier bound by a pattern, with its span
pub fn binding_names(pat: &Pat, out: &mut Vec<(String, Span)>) {
    match pat {
        Pat::Ident(binding) => out.push((binding.id.sym.to_string(), binding.id.span)),
        Pat::Array(array) => {
            for elem in array.elems.iter().flatten() {
                binding_names(elem, out);
            }
        }
        Pat::Rest(rest) => binding_names(&rest.arg, out),
        Pat::Object(object) => {
            for prop in &object.props {
                match prop {
                    ObjectPatProp::KeyValue(kv) => binding_names(&kv.value, out),
                    ObjectPatProp::Assign(assign) => {
                        out.push((assign.key.id.sym.to_string(), assign.key.id.span))
                    }
                    ObjectPatProp::Rest(rest) => binding_names(&rest.arg, out),
                }
            }
        }
        Pat::Assign(assign) => binding_names(&assign.left, out),
        _ => {}
    }
}

/// Module specifier string of an import or re-export
pub fn module_specifier(src: &Str) -> String {
    src.value.to_atom_lossy().to_string()
}

/// Name carried by an import/export specifier
pub fn export_name(name: &ModuleExportName) -> String {
    match name {
        ModuleExportName::Ident(ident) => ident.sym.to_string(),
        ModuleExportName::Str(s) => s.value.to_atom_lossy().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use crate::parser::parse_script;

    fn first_fn_params(src: &str) -> Vec<Parameter> {
        let script =
            parse_script(src, Language::TypeScript, SourceSpan::new(0, src.len()), "t.ts").unwrap();
        let lowering = Lowering::new(&script, src);
        let ModuleItem::Stmt(Stmt::Decl(Decl::Fn(decl))) = &script.module.body[0] else {
            panic!("expected a function declaration");
        };
        lowering.params(&decl.function.params)
    }

    #[test]
    fn test_lower_typed_params_with_default() {
        let src = "function f(name: string, age: number = 30, email?: string) {}";
        let params = first_fn_params(src);
        assert_eq!(params.len(), 3);
        assert_eq!(params[0].type_text.as_deref(), Some("string"));
        assert_eq!(params[1].default_text.as_deref(), Some("30"));
        assert_eq!(
            params[2].pattern,
            ParamPattern::Ident {
                name: "email".to_string(),
                optional: true
            }
        );

        let span = params_span(&params).unwrap();
        assert_eq!(
            &src[span.start..span.end],
            "name: string, age: number = 30, email?: string"
        );
    }

    #[test]
    fn test_lower_tuple_rest() {
        let src = "function f(...args: [name: string, age: number]) {}";
        let params = first_fn_params(src);
        let ParamPattern::Rest { name, tuple } = &params[0].pattern else {
            panic!("expected a rest parameter");
        };
        assert_eq!(name.as_deref(), Some("args"));
        let tuple = tuple.as_ref().unwrap();
        assert_eq!(tuple.len(), 2);
        assert_eq!(tuple[0].name.as_deref(), Some("name"));
        assert_eq!(tuple[1].type_text, "number");
    }

    #[test]
    fn test_lower_decorated_param() {
        let src = "class A { m(@Body() dto: Dto) {} }";
        let script =
            parse_script(src, Language::TypeScript, SourceSpan::new(0, src.len()), "t.ts").unwrap();
        let lowering = Lowering::new(&script, src);
        let ModuleItem::Stmt(Stmt::Decl(Decl::Class(class))) = &script.module.body[0] else {
            panic!("expected a class");
        };
        let ClassMember::Method(method) = &class.class.body[0] else {
            panic!("expected a method");
        };
        let params = lowering.params(&method.function.params);
        assert!(params[0].decorated);
        assert_eq!(&src[params[0].span.start..params[0].span.end], "@Body() dto: Dto");
    }
}
