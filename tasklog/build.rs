// Fails the build when a lint-suppression attribute ("#[" + "allow" + ...) appears
// in the engine or the domain crate. Set TASKLOG_ALLOW_CHECK=0 to skip.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const SCANNED: [&str; 4] = ["src", "tests", "../tasklog-domain/src", "../tasklog-domain/tests"];

fn main() {
    println!("cargo:rerun-if-env-changed=TASKLOG_ALLOW_CHECK");

    if env::var("TASKLOG_ALLOW_CHECK").is_ok_and(|value| value == "0") {
        return;
    }

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("manifest dir"));

    let mut violations = Vec::new();
    for relative in SCANNED {
        let root = manifest_dir.join(relative);
        if root.exists() {
            println!("cargo:rerun-if-changed={}", root.display());
            collect_violations(&root, &mut violations);
        }
    }

    if violations.is_empty() {
        return;
    }

    for (file, line, content) in &violations {
        eprintln!("{}:{}: {}", file.display(), line, content.trim());
    }
    panic!(
        "{} lint suppression attribute(s) found; fix the lint instead",
        violations.len()
    );
}

fn collect_violations(path: &Path, violations: &mut Vec<(PathBuf, usize, String)>) {
    if path.is_dir() {
        for entry in fs::read_dir(path).expect("read dir") {
            collect_violations(&entry.expect("dir entry").path(), violations);
        }
        return;
    }

    if path.extension().is_none_or(|ext| ext != "rs") {
        return;
    }

    let Ok(content) = fs::read_to_string(path) else {
        return;
    };

    violations.extend(
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| line.contains("#[allow") || line.contains("#![allow"))
            .map(|(index, line)| (path.to_path_buf(), index + 1, line.to_string())),
    );
}
