//! Template markup layout: embedded `<script>` blocks versus template text
//!
//! Script contents are handed to the ECMAScript parser with their file offset;
//! everything outside them is template text that can only be searched.

use super::{Language, SourceSpan};
use regex::Regex;
use std::sync::OnceLock;

/// One embedded script block, by the range of its contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptBlock {
    pub span: SourceSpan,
    pub language: Language,
}

/// How a markup file splits into parsed and searched regions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkupLayout {
    /// Script block contents, in source order
    pub scripts: Vec<ScriptBlock>,
    /// Template text between script blocks (tags included), in source order
    pub template: Vec<SourceSpan>,
}

fn script_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<script\b([^>]*)>(.*?)</script\s*>").expect("script block regex")
    })
}

fn lang_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\blang\s*=\s*["']?(tsx|ts|typescript|jsx)\b"#).expect("lang attribute regex")
    })
}

/// Pick the script language from a `<script ...>` attribute string
fn script_language(attrs: &str) -> Language {
    match lang_re()
        .captures(attrs)
        .map(|c| c[1].to_ascii_lowercase())
        .as_deref()
    {
        Some("ts") | Some("typescript") => Language::TypeScript,
        Some("tsx") => Language::TypeScriptReact,
        Some("jsx") => Language::JavaScriptReact,
        _ => Language::JavaScript,
    }
}

/// Split a markup file into script blocks and template regions
pub fn split_markup(text: &str) -> MarkupLayout {
    let mut layout = MarkupLayout::default();
    let mut cursor = 0usize;

    for caps in script_re().captures_iter(text) {
        let (Some(attrs), Some(body)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        if body.start() > cursor {
            layout.template.push(SourceSpan::new(cursor, body.start()));
        }
        layout.scripts.push(ScriptBlock {
            span: SourceSpan::new(body.start(), body.end()),
            language: script_language(attrs.as_str()),
        });
        cursor = body.end();
    }

    if cursor < text.len() {
        layout.template.push(SourceSpan::new(cursor, text.len()));
    }

    layout
}
