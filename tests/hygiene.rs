//! Hygiene checks over the production sources in `src/`.
//!
//! Each antipattern has a budget of zero. Sibling `*_test.rs` files are
//! exempt; everything else is scanned line by line.

use std::fs;
use std::path::Path;

/// (pattern, what it costs)
const BANNED: &[(&str, &str)] = &[
    (".unwrap()", "panics on failure"),
    (".expect(", "panics on failure"),
    ("panic!(", "crashes the process"),
    ("unreachable!(", "crashes the process"),
    ("todo!(", "unfinished stub"),
    ("unimplemented!(", "unfinished stub"),
    ("let _ =", "discards a result without inspecting it"),
    (".ok()", "discards an error without inspecting it"),
    ("map_or(None, Some)", "discards an error without inspecting it"),
    ("#[allow(dead_code)]", "hides unused code"),
];

struct SourceFile {
    path: String,
    content: String,
}

fn source_files() -> Vec<SourceFile> {
    let mut files = Vec::new();
    collect_rs_files(Path::new("src"), &mut files);
    files
}

fn collect_rs_files(dir: &Path, out: &mut Vec<SourceFile>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_rs_files(&path, out);
            continue;
        }
        if path.extension().is_none_or(|e| e != "rs") {
            continue;
        }
        let path_str = path.to_string_lossy().to_string();
        if path_str.ends_with("_test.rs") {
            continue;
        }
        if let Ok(content) = fs::read_to_string(&path) {
            out.push(SourceFile { path: path_str, content });
        }
    }
}

fn hits(files: &[SourceFile], pattern: &str) -> Vec<String> {
    files
        .iter()
        .flat_map(|file| {
            file.content
                .lines()
                .enumerate()
                .filter(|(_, line)| line.contains(pattern))
                .map(|(idx, line)| format!("  {}:{}: {}", file.path, idx + 1, line.trim()))
        })
        .collect()
}

#[test]
fn sources_are_found() {
    let files = source_files();
    assert!(files.iter().any(|f| f.path.ends_with("machine.rs")), "hygiene scan found no sources; run from the crate root");
}

#[test]
fn banned_patterns_stay_at_zero() {
    let files = source_files();
    let mut report = Vec::new();
    for (pattern, cost) in BANNED {
        let found = hits(&files, pattern);
        if !found.is_empty() {
            report.push(format!("`{pattern}` ({cost}): {} hit(s)\n{}", found.len(), found.join("\n")));
        }
    }
    assert!(report.is_empty(), "hygiene budget exceeded:\n{}", report.join("\n"));
}
