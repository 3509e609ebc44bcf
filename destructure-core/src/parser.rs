//! TypeScript and JavaScript parser using SWC
//!
//! Global invariants enforced:
//! - Every script is parsed with its own source map, so spans convert to
//!   file offsets by subtracting the script's base position
//! - Recovered syntax errors are failures: nothing is rewritten in a file
//!   the parser only partially understood

use crate::language::{Language, SourceSpan};
use anyhow::Result;
use swc_common::{sync::Lrc, BytePos, FileName, SourceFile, SourceMap, Span};
use swc_ecma_ast::{EsVersion, Module};
use swc_ecma_parser::{lexer::Lexer, Parser, StringInput, Syntax};

/// Determine the appropriate syntax configuration for a script language
fn syntax_for(language: Language) -> Syntax {
    match language {
        Language::TypeScript | Language::TypeScriptReact => {
            Syntax::Typescript(swc_ecma_parser::TsSyntax {
                tsx: language.is_jsx(),
                decorators: true, // Parameter decorators must parse so they can be refused
                dts: false,
                ..Default::default()
            })
        }
        _ => Syntax::Es(swc_ecma_parser::EsSyntax {
            jsx: language.is_jsx(),
            decorators: true,
            ..Default::default()
        }),
    }
}

/// A parsed script together with what is needed to map its spans back onto the file
pub struct ParsedScript {
    pub module: Module,
    pub language: Language,
    /// Range of the script text inside the file
    pub range: SourceSpan,
    base: BytePos,
}

impl ParsedScript {
    /// Convert an SWC span of this script into file offsets
    pub fn span(&self, span: Span) -> SourceSpan {
        let lo = span.lo.0.saturating_sub(self.base.0) as usize;
        let hi = span.hi.0.saturating_sub(self.base.0) as usize;
        SourceSpan::new(self.range.start + lo, self.range.start + hi)
    }
}

/// Parse TypeScript, JavaScript, JSX, or TSX source code into an AST module
///
/// `range` locates `src` inside its file; plain source files pass the whole file.
/// Returns an error if any parse error occurs, recovered or not.
pub fn parse_script(
    src: &str,
    language: Language,
    range: SourceSpan,
    filename: &str,
) -> Result<ParsedScript> {
    let source_map: Lrc<SourceMap> = Default::default();
    let source_file: Lrc<SourceFile> = source_map.new_source_file(
        FileName::Custom(filename.into()).into(),
        src.to_string(),
    );
    let base = source_file.start_pos;

    let input = StringInput::from(&*source_file);
    let lexer = Lexer::new(syntax_for(language), EsVersion::Es2022, input, None);
    let mut parser = Parser::new_from(lexer);

    let module = parser.parse_module().map_err(|e| {
        anyhow::anyhow!("Parse error: {}", e.kind().msg())
            .context(format!("Failed to parse source file: {}", filename))
    })?;

    if let Some(e) = parser.take_errors().into_iter().next() {
        return Err(anyhow::anyhow!("Parse error: {}", e.kind().msg())
            .context(format!("Failed to parse source file: {}", filename)));
    }

    Ok(ParsedScript {
        module,
        language,
        range,
        base,
    })
}

#[cfg(test)]
#[path = "parser/tests.rs"]
mod tests;
