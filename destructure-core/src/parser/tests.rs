//! Tests for TypeScript and JavaScript parser

#[cfg(test)]
mod parser_tests {
    use crate::language::{Language, SourceSpan};
    use crate::parser::{self, ParsedScript};
    use swc_common::Spanned;
    use swc_ecma_ast::{Decl, ModuleItem, Stmt};

    fn parse_test(src: &str, language: Language) -> Result<ParsedScript, anyhow::Error> {
        parser::parse_script(src, language, SourceSpan::new(0, src.len()), "test")
    }

    #[test]
    fn test_parse_typescript_types() {
        let src = "function foo(x: number, y?: string): number { return x * 2; }";
        let result = parse_test(src, Language::TypeScript);
        assert!(result.is_ok(), "Should parse TypeScript types");
    }

    #[test]
    fn test_parse_rejects_jsx_in_plain_typescript() {
        let src = "function foo() { return <div>hello</div>; }";
        let result = parse_test(src, Language::TypeScript);
        assert!(
            result.is_err(),
            "JSX syntax should cause parse error in .ts files (use .tsx instead)"
        );
    }

    #[test]
    fn test_parse_accepts_jsx_in_tsx_files() {
        let src = "function foo() { return <div>hello</div>; }";
        let result = parse_test(src, Language::TypeScriptReact);
        assert!(result.is_ok(), "JSX syntax should parse in .tsx files");
    }

    #[test]
    fn test_parse_accepts_parameter_decorators() {
        let src = "class A { constructor(@Inject(TOKEN) private svc: Service) {} }";
        let result = parse_test(src, Language::TypeScript);
        assert!(result.is_ok(), "Parameter decorators should parse");
    }

    #[test]
    fn test_parse_error_is_reported() {
        let src = "function foo( { return }}}";
        let err = parse_test(src, Language::JavaScript)
            .err()
            .expect("invalid syntax must fail");
        assert!(format!("{:#}", err).contains("Failed to parse source file"));
    }

    #[test]
    fn test_spans_are_file_relative() {
        let file = "<script>\nfunction foo() {}\n</script>";
        let start = file.find("function").unwrap() - 1;
        let end = file.find("</script>").unwrap();
        let script = &file[start..end];
        let parsed =
            parser::parse_script(script, Language::JavaScript, SourceSpan::new(start, end), "c.vue")
                .unwrap();

        let ModuleItem::Stmt(Stmt::Decl(Decl::Fn(decl))) = &parsed.module.body[0] else {
            panic!("expected a function declaration");
        };
        let span = parsed.span(decl.ident.span());
        assert_eq!(&file[span.start..span.end], "foo");
    }
}
