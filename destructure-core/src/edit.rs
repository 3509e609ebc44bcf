//! Text edits and atomic commit
//!
//! Global invariants enforced:
//! - Edits within one file are pairwise disjoint before anything is applied
//! - A sink either commits every file of a plan or leaves every file untouched
//! - Files that changed since the snapshot was taken are never overwritten

use crate::language::SourceSpan;
use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Replace `span` with `new_text`; an empty span inserts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub span: SourceSpan,
    pub new_text: String,
}

impl TextEdit {
    pub fn new(span: SourceSpan, new_text: impl Into<String>) -> Self {
        TextEdit {
            span,
            new_text: new_text.into(),
        }
    }

    pub fn insert(offset: usize, new_text: impl Into<String>) -> Self {
        TextEdit::new(SourceSpan::empty_at(offset), new_text)
    }
}

/// Edits for one file, with the text they were computed against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePatch {
    pub original: String,
    pub edits: Vec<TextEdit>,
}

impl FilePatch {
    /// New file contents
    pub fn apply(&self) -> Result<String> {
        apply_edits(&self.original, &self.edits)
    }
}

/// Every file a plan touches, in deterministic commit order
pub type FileEdits = BTreeMap<PathBuf, FilePatch>;

/// Indices of the first two conflicting edits, if any
pub fn first_conflict(edits: &[TextEdit]) -> Option<(usize, usize)> {
    for (i, a) in edits.iter().enumerate() {
        for (j, b) in edits.iter().enumerate().skip(i + 1) {
            if a.span.conflicts_with(&b.span) {
                return Some((i, j));
            }
        }
    }
    None
}

/// Apply disjoint edits to `text`
///
/// Edits are applied from the end of the text backwards so earlier offsets
/// stay valid.
pub fn apply_edits(text: &str, edits: &[TextEdit]) -> Result<String> {
    if let Some((a, b)) = first_conflict(edits) {
        bail!(
            "overlapping edits at {} and {}",
            edits[a].span,
            edits[b].span
        );
    }

    let mut ordered: Vec<&TextEdit> = edits.iter().collect();
    ordered.sort_by(|a, b| {
        b.span
            .start
            .cmp(&a.span.start)
            .then(b.span.end.cmp(&a.span.end))
    });

    let mut out = text.to_string();
    for edit in ordered {
        let SourceSpan { start, end } = edit.span;
        if start > end
            || end > out.len()
            || !out.is_char_boundary(start)
            || !out.is_char_boundary(end)
        {
            bail!("edit {} is outside the text", edit.span);
        }
        out.replace_range(start..end, &edit.new_text);
    }
    Ok(out)
}

/// Receiver of a complete edit set
pub trait EditSink {
    /// Commit every patch, or none of them
    fn apply_atomic(&mut self, edits: &FileEdits) -> Result<()>;
}

/// Writes patches to files under a project root
pub struct FsEditSink {
    root: PathBuf,
}

impl FsEditSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsEditSink { root: root.into() }
    }

    fn replace(path: &Path, contents: &str) -> Result<()> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("failed to create temporary file in {}", dir.display()))?;
        tmp.write_all(contents.as_bytes())
            .with_context(|| format!("failed to write temporary file for {}", path.display()))?;
        if let Ok(metadata) = fs::metadata(path) {
            // Keep the original mode bits
            if let Err(e) = fs::set_permissions(tmp.path(), metadata.permissions()) {
                warn!(file = %path.display(), error = %e, "failed to copy permissions");
            }
        }
        tmp.persist(path)
            .map_err(|e| e.error)
            .with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }
}

impl EditSink for FsEditSink {
    fn apply_atomic(&mut self, edits: &FileEdits) -> Result<()> {
        let mut staged = Vec::with_capacity(edits.len());
        for (path, patch) in edits {
            let full = self.root.join(path);
            let current = fs::read_to_string(&full)
                .with_context(|| format!("failed to read {}", full.display()))?;
            if current != patch.original {
                bail!("{} changed since it was read", path.display());
            }
            let updated = patch
                .apply()
                .with_context(|| format!("failed to compute new contents of {}", path.display()))?;
            staged.push((full, patch.original.as_str(), updated));
        }

        let mut written: Vec<(&Path, &str)> = Vec::new();
        for (full, original, updated) in &staged {
            if let Err(err) = Self::replace(full, updated) {
                for (done, before) in written.iter().rev() {
                    if let Err(restore) = Self::replace(done, before) {
                        warn!(file = %done.display(), error = %restore, "failed to restore file");
                    }
                }
                return Err(err);
            }
            debug!(file = %full.display(), "file rewritten");
            written.push((full.as_path(), *original));
        }
        Ok(())
    }
}

/// In-memory file contents; the sink for tests and dry runs
#[derive(Debug, Clone, Default)]
pub struct MemoryEditSink {
    files: BTreeMap<PathBuf, String>,
}

impl MemoryEditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink seeded with the original text of every patched file
    pub fn from_patches(edits: &FileEdits) -> Self {
        MemoryEditSink {
            files: edits
                .iter()
                .map(|(path, patch)| (path.clone(), patch.original.clone()))
                .collect(),
        }
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        self.files.insert(path.into(), text.into());
        self
    }

    pub fn file(&self, path: &Path) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn files(&self) -> &BTreeMap<PathBuf, String> {
        &self.files
    }
}

impl EditSink for MemoryEditSink {
    fn apply_atomic(&mut self, edits: &FileEdits) -> Result<()> {
        let mut staged = Vec::with_capacity(edits.len());
        for (path, patch) in edits {
            match self.files.get(path) {
                Some(current) if *current == patch.original => {}
                Some(_) => bail!("{} changed since it was read", path.display()),
                None => bail!("{} does not exist", path.display()),
            }
            staged.push((path.clone(), patch.apply()?));
        }
        self.files.extend(staged);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch(original: &str, edits: Vec<TextEdit>) -> FilePatch {
        FilePatch {
            original: original.to_string(),
            edits,
        }
    }

    #[test]
    fn test_apply_edits_back_to_front() {
        let text = "f(a, b); f(c, d);";
        let edits = vec![
            TextEdit::new(SourceSpan::new(1, 7), "({ x: a })"),
            TextEdit::new(SourceSpan::new(10, 16), "({ x: c })"),
            TextEdit::insert(0, "// x\n"),
        ];
        assert_eq!(
            apply_edits(text, &edits).unwrap(),
            "// x\nf({ x: a }); f({ x: c });"
        );
    }

    #[test]
    fn test_apply_edits_rejects_overlap() {
        let edits = vec![
            TextEdit::new(SourceSpan::new(0, 10), "a"),
            TextEdit::new(SourceSpan::new(5, 12), "b"),
        ];
        assert_eq!(first_conflict(&edits), Some((0, 1)));
        assert!(apply_edits("0123456789abcdef", &edits).is_err());
    }

    #[test]
    fn test_adjacent_edits_do_not_conflict() {
        let edits = vec![
            TextEdit::new(SourceSpan::new(0, 3), "x"),
            TextEdit::new(SourceSpan::new(3, 6), "y"),
            TextEdit::insert(6, "z"),
        ];
        assert_eq!(first_conflict(&edits), None);
        assert_eq!(apply_edits("aaabbb", &edits).unwrap(), "xyz");
    }

    #[test]
    fn test_memory_sink_is_all_or_nothing() {
        let mut sink = MemoryEditSink::new()
            .with_file("a.ts", "one")
            .with_file("b.ts", "two");
        let mut edits = FileEdits::new();
        edits.insert(
            PathBuf::from("a.ts"),
            patch("one", vec![TextEdit::new(SourceSpan::new(0, 3), "1")]),
        );
        edits.insert(
            PathBuf::from("b.ts"),
            patch("stale", vec![TextEdit::new(SourceSpan::new(0, 3), "2")]),
        );
        assert!(sink.apply_atomic(&edits).is_err());
        assert_eq!(sink.file(Path::new("a.ts")), Some("one"));
    }

    #[test]
    fn test_fs_sink_writes_and_refuses_stale_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/a.ts"), "send(1, 2);\n").unwrap();
        fs::write(dir.path().join("src/b.ts"), "send(3, 4);\n").unwrap();

        let mut edits = FileEdits::new();
        edits.insert(
            PathBuf::from("src/a.ts"),
            patch(
                "send(1, 2);\n",
                vec![TextEdit::new(SourceSpan::new(4, 10), "({ a: 1, b: 2 })")],
            ),
        );
        edits.insert(
            PathBuf::from("src/b.ts"),
            patch(
                "send(9, 9);\n",
                vec![TextEdit::new(SourceSpan::new(4, 10), "({ a: 9, b: 9 })")],
            ),
        );

        let mut sink = FsEditSink::new(dir.path());
        assert!(sink.apply_atomic(&edits).is_err());
        assert_eq!(
            fs::read_to_string(dir.path().join("src/a.ts")).unwrap(),
            "send(1, 2);\n",
            "No file may change when any file is stale"
        );

        edits.remove(Path::new("src/b.ts"));
        sink.apply_atomic(&edits).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("src/a.ts")).unwrap(),
            "send({ a: 1, b: 2 });\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_replace_keeps_mode_bits() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("run.js");
        fs::write(&script, "main(1, 2);\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        FsEditSink::replace(&script, "main({ a: 1, b: 2 });\n").unwrap();
        let mode = fs::metadata(&script).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
        assert_eq!(fs::read_to_string(&script).unwrap(), "main({ a: 1, b: 2 });\n");
    }
}
