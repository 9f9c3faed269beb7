//! Architecture enforcement tests.
//!
//! The HTTP layer reaches providers only through the `Scm` trait and the
//! clients the access gate hands it. These tests fail when a web module
//! names a concrete adapter or builds a client itself.

use std::fs;
use std::path::Path;

/// Identifiers that only `scm` itself may use.
const ADAPTER_REFERENCES: &[&str] = &[
    "scm::github",
    "scm::gitlab",
    "GitHubScm",
    "GitLabScm",
    "create_scm",
    "ProviderScmFactory",
];

fn web_sources() -> Vec<(String, String)> {
    let dir = Path::new("src/web");
    let mut sources = Vec::new();
    for entry in fs::read_dir(dir).expect("Failed to read web directory") {
        let path = entry.expect("Failed to read entry").path();
        if path.extension().map(|e| e == "rs").unwrap_or(false) {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            let content =
                fs::read_to_string(&path).unwrap_or_else(|_| panic!("Failed to read {}", name));
            sources.push((name, content));
        }
    }
    sources
}

/// Strip the `#[cfg(test)]` tail so test fixtures may build what they need.
fn non_test_part(content: &str) -> &str {
    match content.find("#[cfg(test)]") {
        Some(idx) => &content[..idx],
        None => content,
    }
}

#[test]
fn web_does_not_name_concrete_adapters() {
    let mut violations = Vec::new();
    for (name, content) in web_sources() {
        for reference in ADAPTER_REFERENCES {
            if non_test_part(&content).contains(reference) {
                violations.push(format!("{}: references {}", name, reference));
            }
        }
    }
    assert!(
        violations.is_empty(),
        "web modules must use Scm clients from the gate:\n{}",
        violations.join("\n")
    );
}

#[test]
fn provider_calls_in_handlers_are_bounded() {
    let mut violations = Vec::new();
    for (name, content) in web_sources() {
        let code = non_test_part(&content);
        for call in [".get_directory(", ".list_directories(", ".create_directory("] {
            for (idx, _) in code.match_indices(call) {
                let line_start = code[..idx].rfind('\n').map(|i| i + 1).unwrap_or(0);
                if !code[line_start..idx].contains("bounded(") {
                    violations.push(format!("{}: unbounded {}", name, call.trim_matches('.')));
                }
            }
        }
    }
    assert!(
        violations.is_empty(),
        "provider calls must run under scm::bounded:\n{}",
        violations.join("\n")
    );
}

#[test]
fn web_modules_exist() {
    let names: Vec<String> = web_sources().into_iter().map(|(n, _)| n).collect();
    for expected in ["gate.rs", "oauth.rs", "courses.rs", "error.rs"] {
        assert!(names.iter().any(|n| n == expected), "missing src/web/{}", expected);
    }
}
