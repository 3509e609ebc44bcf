//! Language detection and source layout
//!
//! This module decides how each project file is read: fully parsed
//! TypeScript/JavaScript, or template markup whose embedded scripts are parsed
//! and whose remaining text is only searched.

pub mod ecmascript;
pub mod markup;
pub mod span;

use std::path::Path;

pub use markup::{split_markup, MarkupLayout, ScriptBlock};
pub use span::{line_col, offset_at, SourceLocation, SourceSpan};

/// Supported source languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    /// TypeScript (.ts, .mts, .cts)
    TypeScript,
    /// TypeScript with JSX (.tsx)
    TypeScriptReact,
    /// JavaScript (.js, .mjs, .cjs)
    JavaScript,
    /// JavaScript with JSX (.jsx)
    JavaScriptReact,
    /// Vue single-file component (.vue)
    Vue,
    /// Svelte component (.svelte)
    Svelte,
    /// HTML page with inline scripts (.html, .htm)
    Html,
}

impl Language {
    /// Detect language from file extension
    ///
    /// Returns `None` if the extension is not recognized.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "ts" | "mts" | "cts" => Some(Language::TypeScript),
            "tsx" => Some(Language::TypeScriptReact),
            "js" | "mjs" | "cjs" => Some(Language::JavaScript),
            "jsx" => Some(Language::JavaScriptReact),
            "vue" => Some(Language::Vue),
            "svelte" => Some(Language::Svelte),
            "html" | "htm" => Some(Language::Html),
            _ => None,
        }
    }

    /// Detect language from file path
    ///
    /// TypeScript declaration files (`.d.ts`) are never treated as sources:
    /// they carry signatures only and are not rewritten.
    pub fn from_path(path: &Path) -> Option<Self> {
        let file_name = path.file_name().and_then(|n| n.to_str())?;
        if file_name.ends_with(".d.ts") {
            return None;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Get the canonical name of the language
    pub fn name(&self) -> &'static str {
        match self {
            Language::TypeScript => "TypeScript",
            Language::TypeScriptReact => "TypeScript React",
            Language::JavaScript => "JavaScript",
            Language::JavaScriptReact => "JavaScript React",
            Language::Vue => "Vue",
            Language::Svelte => "Svelte",
            Language::Html => "HTML",
        }
    }

    /// Check if this is a TypeScript variant
    pub fn is_typescript(&self) -> bool {
        matches!(self, Language::TypeScript | Language::TypeScriptReact)
    }

    /// Check if this language accepts JSX
    pub fn is_jsx(&self) -> bool {
        matches!(self, Language::TypeScriptReact | Language::JavaScriptReact)
    }

    /// Check if this is template markup with embedded scripts
    pub fn is_markup(&self) -> bool {
        matches!(self, Language::Vue | Language::Svelte | Language::Html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension_typescript() {
        assert_eq!(Language::from_extension("ts"), Some(Language::TypeScript));
        assert_eq!(Language::from_extension("mts"), Some(Language::TypeScript));
        assert_eq!(
            Language::from_extension("tsx"),
            Some(Language::TypeScriptReact)
        );
    }

    #[test]
    fn test_from_extension_markup() {
        assert_eq!(Language::from_extension("vue"), Some(Language::Vue));
        assert_eq!(Language::from_extension("svelte"), Some(Language::Svelte));
        assert_eq!(Language::from_extension("htm"), Some(Language::Html));
        assert_eq!(Language::from_extension("py"), None);
        assert_eq!(Language::from_extension("mtsx"), None);
        assert_eq!(Language::from_extension("cjsx"), None);
        assert_eq!(Language::from_extension(""), None);
    }

    #[test]
    fn test_from_path_skips_declaration_files() {
        assert_eq!(
            Language::from_path(Path::new("src/api.ts")),
            Some(Language::TypeScript)
        );
        assert_eq!(Language::from_path(Path::new("src/api.d.ts")), None);
        assert_eq!(Language::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn test_predicates() {
        assert!(Language::TypeScriptReact.is_typescript());
        assert!(Language::TypeScriptReact.is_jsx());
        assert!(!Language::JavaScript.is_typescript());
        assert!(Language::Vue.is_markup());
        assert!(!Language::JavaScriptReact.is_markup());
    }
}
