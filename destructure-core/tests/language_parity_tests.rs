//! Tests to verify every supported file type converts the same way
//!
//! Critical invariant: a function with identical parameters and identical
//! call sites yields identical call rewrites regardless of the file type it
//! lives in. Only the parameter type literal depends on the language.

use destructure_core::{convert, AcceptAll, ConvertOptions, ConvertRequest, MemoryFileProvider};
use std::path::PathBuf;

const PLAIN: &str = "function scale(value, factor) {\n  return value * factor;\n}\nscale(2, 3);\n";
const TYPED: &str =
    "function scale(value: number, factor: number) {\n  return value * factor;\n}\nscale(2, 3);\n";

/// Convert `scale` in a single-file project and return the edited file
fn convert_single(path: &str, text: &str) -> String {
    let provider = MemoryFileProvider::new().with_file(path, text);
    let request = ConvertRequest {
        file: PathBuf::from(path),
        offset: text.find("return value").unwrap(),
    };
    let outcome = convert(&provider, &mut AcceptAll, &request, &ConvertOptions::default());
    let plan = outcome
        .plan()
        .unwrap_or_else(|| panic!("{} did not produce a plan: {:?}", path, outcome));
    plan.edits[&PathBuf::from(path)]
        .apply()
        .unwrap_or_else(|e| panic!("Failed to apply edits to {}: {}", path, e))
}

#[test]
fn test_javascript_variants_parity() {
    let expected = "function scale({ value, factor }) {\n  return value * factor;\n}\nscale({ value: 2, factor: 3 });\n";
    for path in ["a.js", "a.mjs", "a.cjs", "a.jsx"] {
        assert_eq!(convert_single(path, PLAIN), expected, "mismatch for {}", path);
    }
}

#[test]
fn test_typescript_variants_parity() {
    let expected = "function scale({ value, factor }: { value: number; factor: number }) {\n  return value * factor;\n}\nscale({ value: 2, factor: 3 });\n";
    for path in ["a.ts", "a.mts", "a.cts", "a.tsx"] {
        assert_eq!(convert_single(path, TYPED), expected, "mismatch for {}", path);
    }
}

#[test]
fn test_jsx_attribute_calls() {
    let src = "function scale(value, factor) {\n  return value * factor;\n}\nexport const Zoom = () => <button onClick={() => scale(1, 2)}>+</button>;\n";
    let edited = convert_single("zoom.jsx", src);
    assert!(edited.contains("onClick={() => scale({ value: 1, factor: 2 })}"));
}

#[test]
fn test_markup_template_parity() {
    let files = [
        (
            "Zoom.svelte",
            "<script>\n  function scale(value, factor) {\n    return value * factor;\n  }\n</script>\n\n<button on:click={() => scale(1, 2)}>+</button>\n",
        ),
        (
            "zoom.html",
            "<button onclick=\"scale(1, 2)\">+</button>\n<script>\n  function scale(value, factor) {\n    return value * factor;\n  }\n</script>\n",
        ),
        (
            "Zoom.vue",
            "<template>\n  <button @click=\"scale(1, 2)\">+</button>\n</template>\n<script>\n  function scale(value, factor) {\n    return value * factor;\n  }\n</script>\n",
        ),
    ];
    for (path, text) in files {
        let edited = convert_single(path, text);
        assert!(
            edited.contains("function scale({ value, factor })"),
            "signature not rewritten in {}",
            path
        );
        assert!(
            edited.contains("scale({ value: 1, factor: 2 })"),
            "template call not rewritten in {}",
            path
        );
    }
}
