use std::fs;
use std::path::{Path, PathBuf};

// Library code reports through tracing; only the command surface prints.
const ALLOWED_STDOUT_WRITERS: &[&str] = &["src/cli.rs", "src/main.rs"];

fn collect_rust_files(root: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(root) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_rust_files(&path, out);
            continue;
        }
        if path.extension().and_then(|s| s.to_str()) == Some("rs") {
            out.push(path);
        }
    }
}

#[test]
fn stdout_writes_are_limited_to_the_command_surface() {
    let repo_root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let src_root = repo_root.join("src");
    let mut files = Vec::new();
    collect_rust_files(&src_root, &mut files);
    assert!(!files.is_empty());

    let mut offenders = Vec::new();
    for file in files {
        let rel = file
            .strip_prefix(repo_root)
            .unwrap_or(&file)
            .to_string_lossy()
            .replace('\\', "/");
        if ALLOWED_STDOUT_WRITERS.iter().any(|allowed| *allowed == rel) {
            continue;
        }
        let content = fs::read_to_string(&file).unwrap_or_default();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.starts_with("//") {
                continue;
            }
            if trimmed.contains("println!(") || trimmed.contains("print!(") {
                offenders.push(format!("{rel}:{}: {}", idx + 1, trimmed));
            }
        }
    }

    assert!(
        offenders.is_empty(),
        "stdout writes detected outside the command surface:\n{}",
        offenders.join("\n")
    );
}

#[test]
fn library_code_does_not_unwrap() {
    let repo_root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let mut files = Vec::new();
    collect_rust_files(&repo_root.join("src"), &mut files);

    let mut offenders = Vec::new();
    for file in files {
        let content = fs::read_to_string(&file).unwrap_or_default();
        // unit tests live at the bottom of each file
        let body = content.split("#[cfg(test)]").next().unwrap_or_default();
        for (idx, line) in body.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.starts_with("//") {
                continue;
            }
            if trimmed.contains(".unwrap()") || trimmed.contains(".expect(") {
                offenders.push(format!("{}:{}: {}", file.display(), idx + 1, trimmed));
            }
        }
    }

    assert!(offenders.is_empty(), "unwrap in library code:\n{}", offenders.join("\n"));
}
