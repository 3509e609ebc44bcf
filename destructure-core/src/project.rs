//! Project files and the per-attempt snapshot
//!
//! Global invariants enforced:
//! - Paths handed to the engine are relative to the project root
//! - Every file is parsed once per attempt; offsets computed against a
//!   snapshot stay valid until the attempt ends
//! - File enumeration order is sorted and therefore deterministic

use crate::config::ResolvedConfig;
use crate::error::AbortReason;
use crate::language::{split_markup, Language, SourceLocation, SourceSpan};
use crate::parser::{parse_script, ParsedScript};
use crate::resolve::ModuleIndex;
use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// One parsed project file
pub struct ProjectFile {
    /// Project-relative path
    pub path: PathBuf,
    pub text: String,
    pub language: Language,
    /// Parsed scripts: the whole file, or each embedded `<script>` block
    pub scripts: Vec<ParsedScript>,
    /// Template regions of a markup file, searched textually
    pub template: Vec<SourceSpan>,
    /// Lexical bindings, imports and exports of the file
    pub index: ModuleIndex,
}

impl ProjectFile {
    /// Parse a file's text according to its extension
    pub fn parse(path: impl Into<PathBuf>, text: String) -> Result<Self, AbortReason> {
        let path = path.into();
        let language = Language::from_path(&path).ok_or_else(|| AbortReason::ParseFailure {
            file: path.clone(),
            message: "unsupported file type".to_string(),
        })?;
        let filename = path.to_string_lossy().to_string();

        let (blocks, template) = if language.is_markup() {
            let layout = split_markup(&text);
            let blocks = layout
                .scripts
                .into_iter()
                .map(|block| (block.span, block.language))
                .collect();
            (blocks, layout.template)
        } else {
            (vec![(SourceSpan::new(0, text.len()), language)], Vec::new())
        };

        let mut scripts = Vec::with_capacity(blocks.len());
        for (range, script_language) in blocks {
            let source = &text[range.start..range.end];
            let script = parse_script(source, script_language, range, &filename).map_err(|e| {
                AbortReason::ParseFailure {
                    file: path.clone(),
                    message: format!("{:#}", e),
                }
            })?;
            scripts.push(script);
        }

        let index = ModuleIndex::build(&scripts, &text);
        Ok(ProjectFile {
            path,
            text,
            language,
            scripts,
            template,
            index,
        })
    }

    /// User-facing location of a byte offset in this file
    pub fn location(&self, offset: usize) -> SourceLocation {
        SourceLocation::at(&self.path, &self.text, offset)
    }

    /// Verbatim text under a span
    pub fn slice(&self, span: SourceSpan) -> &str {
        self.text.get(span.start..span.end).unwrap_or("")
    }

    /// The parsed script containing `offset`, if any
    pub fn script_at(&self, offset: usize) -> Option<&ParsedScript> {
        self.scripts
            .iter()
            .find(|script| script.range.contains_offset(offset))
    }
}

/// Source of the files one attempt works on
pub trait FileProvider {
    /// Project-relative paths in scope, honoring include/exclude configuration
    fn list_scoped_files(&self) -> Result<Vec<PathBuf>>;

    /// Current text of a project-relative path
    fn read(&self, path: &Path) -> Result<String>;

    /// Read and parse one file
    fn parse(&self, path: &Path) -> Result<ProjectFile, AbortReason> {
        let text = self.read(path)?;
        ProjectFile::parse(path, text)
    }
}

/// Files under a directory on disk
pub struct FsFileProvider {
    root: PathBuf,
    config: ResolvedConfig,
}

impl FsFileProvider {
    pub fn new(root: impl Into<PathBuf>, config: ResolvedConfig) -> Self {
        FsFileProvider {
            root: root.into(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Express `path` relative to the project root
    pub fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

impl FileProvider for FsFileProvider {
    fn list_scoped_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        collect_source_files_recursive(&self.root, &mut files)?;

        let mut scoped: Vec<PathBuf> = files
            .iter()
            .map(|path| self.relative(path))
            .filter(|path| self.config.should_include(path))
            .collect();

        // Sort files for deterministic order
        scoped.sort();
        Ok(scoped)
    }

    fn read(&self, path: &Path) -> Result<String> {
        let full = self.root.join(path);
        std::fs::read_to_string(&full)
            .with_context(|| format!("Failed to read file: {}", full.display()))
    }
}

/// Returns true for directory names that should not be traversed
fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('.')
        || name == "node_modules"
        || name == "dist"
        || name == "build"
        || name == "out"
        || name == "coverage"
}

/// Recursively collect supported source files from a directory
fn collect_source_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry_result in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
    {
        let entry = entry_result?;
        let path = entry.path();
        let metadata = std::fs::symlink_metadata(&path)
            .with_context(|| format!("Failed to read metadata: {}", path.display()))?;

        if metadata.is_symlink() {
            continue;
        }
        if metadata.is_dir() {
            let skipped = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(is_skipped_dir);
            if !skipped {
                collect_source_files_recursive(&path, files)?;
            }
        } else if metadata.is_file() && Language::from_path(&path).is_some() {
            files.push(path);
        }
    }

    Ok(())
}

/// In-memory project, keyed by project-relative path
#[derive(Debug, Clone, Default)]
pub struct MemoryFileProvider {
    files: BTreeMap<PathBuf, String>,
}

impl MemoryFileProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.files.insert(path.into(), text.into());
    }
}

impl FileProvider for MemoryFileProvider {
    fn list_scoped_files(&self) -> Result<Vec<PathBuf>> {
        Ok(self
            .files
            .keys()
            .filter(|path| Language::from_path(path).is_some())
            .cloned()
            .collect())
    }

    fn read(&self, path: &Path) -> Result<String> {
        self.files
            .get(path)
            .cloned()
            .with_context(|| format!("no such file in project: {}", path.display()))
    }
}

/// Immutable set of parsed files for one conversion attempt
pub struct ProjectSnapshot {
    files: Vec<ProjectFile>,
    by_path: HashMap<PathBuf, usize>,
}

impl ProjectSnapshot {
    /// Parse every scoped file, reusing the already parsed target file
    ///
    /// The target file is part of the snapshot even when the include/exclude
    /// configuration would leave it out.
    pub fn load(provider: &dyn FileProvider, target: ProjectFile) -> Result<Self, AbortReason> {
        let mut paths = provider.list_scoped_files()?;
        if !paths.contains(&target.path) {
            paths.push(target.path.clone());
        }
        paths.sort();
        paths.dedup();

        let mut target = Some(target);
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let file = match target.take() {
                Some(t) if t.path == path => t,
                other => {
                    target = other;
                    provider.parse(&path)?
                }
            };
            files.push(file);
        }

        Ok(Self::from_files(files))
    }

    /// Build a snapshot from already parsed files, kept in path order
    pub fn from_files(mut files: Vec<ProjectFile>) -> Self {
        files.sort_by(|a, b| a.path.cmp(&b.path));
        let by_path = files
            .iter()
            .enumerate()
            .map(|(i, file)| (file.path.clone(), i))
            .collect();
        ProjectSnapshot { files, by_path }
    }

    /// Files in enumeration order
    pub fn files(&self) -> &[ProjectFile] {
        &self.files
    }

    pub fn file(&self, path: &Path) -> Option<&ProjectFile> {
        self.by_path.get(path).map(|&i| &self.files[i])
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.by_path.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_markup_file_offsets() {
        let text = "<template><b @click=\"go(1)\"/></template>\n<script>\nexport function go(n) {}\n</script>\n";
        let file = ProjectFile::parse("src/App.vue", text.to_string()).unwrap();
        assert_eq!(file.language, Language::Vue);
        assert_eq!(file.scripts.len(), 1);
        assert_eq!(file.template.len(), 2);

        let offset = text.find("export").unwrap();
        assert!(file.script_at(offset).is_some());
        assert!(file.script_at(text.find("go(1)").unwrap()).is_none());
        assert_eq!(file.location(offset).line, 3);
    }

    #[test]
    fn test_parse_failure_names_file() {
        let err = ProjectFile::parse("src/bad.ts", "function (".to_string())
            .err()
            .expect("invalid source must fail");
        match err {
            AbortReason::ParseFailure { file, .. } => assert_eq!(file, PathBuf::from("src/bad.ts")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_memory_provider_lists_supported_files_only() {
        let provider = MemoryFileProvider::new()
            .with_file("src/b.ts", "")
            .with_file("README.md", "# readme")
            .with_file("src/a.js", "");
        let files = provider.list_scoped_files().unwrap();
        assert_eq!(files, vec![PathBuf::from("src/a.js"), PathBuf::from("src/b.ts")]);
    }

    #[test]
    fn test_snapshot_keeps_target_outside_scope() {
        let provider = MemoryFileProvider::new().with_file("src/a.ts", "a();");
        let target = ProjectFile::parse("scratch/t.ts", "function a() {}".to_string()).unwrap();
        let snapshot = ProjectSnapshot::load(&provider, target).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.contains(Path::new("scratch/t.ts")));
        assert_eq!(snapshot.files()[0].path, PathBuf::from("scratch/t.ts"));
    }

    #[test]
    fn test_fs_provider_applies_config_and_skips_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        std::fs::write(dir.path().join("src/a.ts"), "").unwrap();
        std::fs::write(dir.path().join("src/a.d.ts"), "").unwrap();
        std::fs::write(dir.path().join("node_modules/pkg/index.js"), "").unwrap();

        let provider = FsFileProvider::new(dir.path(), ResolvedConfig::defaults().unwrap());
        let files = provider.list_scoped_files().unwrap();
        assert_eq!(files, vec![PathBuf::from("src/a.ts")]);
        assert_eq!(provider.read(Path::new("src/a.ts")).unwrap(), "");
    }
}
