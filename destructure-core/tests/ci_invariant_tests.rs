//! CI Invariant Tests
//!
//! These tests explicitly validate the guarantees every attempt must keep:
//! no partial writes, and identical input yielding identical edits.

use destructure_core::config::ResolvedConfig;
use destructure_core::{
    commit, convert, AbortReason, AcceptAll, ConvertOptions, ConvertRequest, FsEditSink,
    FsFileProvider, MemoryEditSink, MemoryFileProvider, Outcome,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write `files` into a fresh project directory
fn create_project(files: &[(&str, &str)]) -> TempDir {
    let temp = TempDir::new().expect("failed to create temp directory");
    for (path, text) in files {
        let full = temp.path().join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, text).unwrap();
    }
    temp
}

/// Every file of a project directory, by relative path
fn read_tree(root: &Path) -> BTreeMap<PathBuf, String> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let relative = e.path().strip_prefix(root).unwrap().to_path_buf();
            (relative, fs::read_to_string(e.path()).unwrap())
        })
        .collect()
}

fn convert_on_disk(root: &Path, file: &str, needle: &str) -> Outcome {
    let provider = FsFileProvider::new(root, ResolvedConfig::defaults().unwrap());
    let text = fs::read_to_string(root.join(file)).unwrap();
    let request = ConvertRequest {
        file: PathBuf::from(file),
        offset: text.find(needle).unwrap(),
    };
    convert(&provider, &mut AcceptAll, &request, &ConvertOptions::default())
}

const LIB: &str = "export function area(width: number, height: number) {\n  return width * height;\n}\n";
const USE_A: &str = "import { area } from \"./lib\";\n\nexport const a = area(2, 3);\n";
const USE_B: &str = "import { area } from \"./lib\";\n\nexport const b = area(4, 5);\n";

#[test]
fn test_abort_leaves_every_file_untouched() {
    let project = create_project(&[
        ("src/lib.ts", LIB),
        ("src/a.ts", USE_A),
        (
            "src/b.ts",
            "import { area } from \"./lib\";\n\nexport const bound = area.bind(null, 2);\n",
        ),
    ]);
    let before = read_tree(project.path());

    let outcome = convert_on_disk(project.path(), "src/lib.ts", "return width");
    assert!(
        matches!(outcome.abort(), Some(AbortReason::IncompatibleUsage { .. })),
        "unexpected outcome {:?}",
        outcome
    );
    assert_eq!(read_tree(project.path()), before);
}

#[test]
fn test_stale_file_fails_commit_without_partial_writes() {
    let project = create_project(&[
        ("src/lib.ts", LIB),
        ("src/a.ts", USE_A),
        ("src/b.ts", USE_B),
    ]);

    let outcome = convert_on_disk(project.path(), "src/lib.ts", "return width");
    let plan = outcome.plan().expect("conversion should produce a plan");
    assert_eq!(plan.files_touched(), 3);

    // Someone edits a caller between planning and committing
    fs::write(
        project.path().join("src/b.ts"),
        "import { area } from \"./lib\";\n\nexport const b = area(40, 50);\n",
    )
    .unwrap();
    let before = read_tree(project.path());

    let mut sink = FsEditSink::new(project.path());
    let result = commit(plan, &mut sink);
    assert!(matches!(result, Err(AbortReason::CommitFailed { .. })));
    assert_eq!(
        read_tree(project.path()),
        before,
        "A failed commit must not leave any file modified"
    );
}

#[test]
fn test_commit_writes_all_files() {
    let project = create_project(&[
        ("src/lib.ts", LIB),
        ("src/a.ts", USE_A),
        ("src/b.ts", USE_B),
    ]);

    let outcome = convert_on_disk(project.path(), "src/lib.ts", "return width");
    let plan = outcome.plan().unwrap();
    commit(plan, &mut FsEditSink::new(project.path())).unwrap();

    let tree = read_tree(project.path());
    assert_eq!(
        tree[Path::new("src/lib.ts")],
        "export function area({ width, height }: { width: number; height: number }) {\n  return width * height;\n}\n"
    );
    assert!(tree[Path::new("src/a.ts")].contains("area({ width: 2, height: 3 })"));
    assert!(tree[Path::new("src/b.ts")].contains("area({ width: 4, height: 5 })"));
}

#[test]
fn test_identical_input_yields_identical_edits() {
    let files = [
        ("src/lib.ts", LIB),
        ("src/a.ts", USE_A),
        ("src/b.ts", USE_B),
    ];
    let run = || {
        let mut provider = MemoryFileProvider::new();
        for (path, text) in files {
            provider.insert(path, text);
        }
        let request = ConvertRequest {
            file: PathBuf::from("src/lib.ts"),
            offset: LIB.find("return width").unwrap(),
        };
        let outcome = convert(&provider, &mut AcceptAll, &request, &ConvertOptions::default());
        let plan = outcome.plan().unwrap();
        let mut sink = MemoryEditSink::from_patches(&plan.edits);
        commit(plan, &mut sink).unwrap();
        sink.files().clone()
    };

    let first = run();
    for _ in 0..5 {
        assert_eq!(run(), first, "Edits must be byte-for-byte identical across runs");
    }
}

#[test]
fn test_no_global_state_between_attempts() {
    // A second attempt on another project must not see the first one's files
    let first = create_project(&[("src/lib.ts", LIB), ("src/a.ts", USE_A)]);
    let second = create_project(&[("src/lib.ts", LIB)]);

    let outcome = convert_on_disk(first.path(), "src/lib.ts", "return width");
    assert_eq!(outcome.plan().unwrap().calls_rewritten(), 1);

    let outcome = convert_on_disk(second.path(), "src/lib.ts", "return width");
    assert_eq!(outcome.plan().unwrap().calls_rewritten(), 0);
}
