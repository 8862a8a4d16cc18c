//! Cross-file near-duplicate code detection.

use std::sync::OnceLock;

use regex::Regex;

use crate::model::{FileInput, Severity, Violation, ViolationCategory};

const DEFAULT_THRESHOLD: f64 = 0.85;

struct FunctionUnit<'a> {
    file: &'a str,
    name: String,
    code: String,
    start_line: u32,
    fingerprint: String,
}

fn function_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)(?:def|function|const|let|var)\s+(\w+)\s*[(\[]").unwrap()
    })
}

fn comment_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)(#.*$|//.*$)").unwrap())
}

fn block_comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)/\*.*?\*/").unwrap())
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[a-z_][a-z0-9_]*\b").unwrap())
}

fn normalize_code(code: &str) -> String {
    let no_line_comments = comment_line_re().replace_all(code, "");
    let no_block_comments = block_comment_re().replace_all(&no_line_comments, "");
    let collapsed = whitespace_re().replace_all(&no_block_comments, " ");
    let normalized = identifier_re().replace_all(&collapsed, "VAR");
    normalized.trim().to_string()
}

fn fingerprint(code: &str) -> String {
    let normalized = normalize_code(code);
    format!("{:x}", md5::compute(normalized.as_bytes()))
}

fn similarity(fp1: &str, fp2: &str) -> f64 {
    if fp1 == fp2 {
        return 1.0;
    }
    let matches = fp1
        .chars()
        .zip(fp2.chars())
        .filter(|(a, b)| a == b)
        .count();
    matches as f64 / fp1.len().max(fp2.len()) as f64
}

fn extract_functions(file: &FileInput) -> Vec<FunctionUnit<'_>> {
    let lines: Vec<&str> = file.content.split('\n').collect();
    let mut units = Vec::new();

    for m in function_re().captures_iter(&file.content) {
        let whole = m.get(0).unwrap();
        let name = m[1].to_string();
        let start_pos = whole.start();
        let start_line = file.content[..start_pos].matches('\n').count() + 1;
        let end_line = (start_line + 20).min(lines.len());
        if start_line == 0 || start_line > lines.len() {
            continue;
        }
        let code = lines[start_line - 1..end_line].join("\n");
        let fp = fingerprint(&code);
        units.push(FunctionUnit {
            file: &file.path,
            name,
            code,
            start_line: start_line as u32,
            fingerprint: fp,
        });
    }

    units
}

/// Detect near-duplicate function-like units across different files in
/// the batch. Runs once per scan, not per file.
pub fn detect_duplicates(files: &[FileInput], _repository: &str) -> Vec<Violation> {
    detect_duplicates_with_threshold(files, DEFAULT_THRESHOLD)
}

pub fn detect_duplicates_with_threshold(
    files: &[FileInput],
    threshold: f64,
) -> Vec<Violation> {
    let mut units = Vec::new();
    for file in files {
        if file.content.is_empty() {
            continue;
        }
        units.extend(extract_functions(file));
    }

    let mut violations = Vec::new();
    for i in 0..units.len() {
        for j in (i + 1)..units.len() {
            let a = &units[i];
            let b = &units[j];
            if a.file == b.file {
                continue;
            }
            let sim = similarity(&a.fingerprint, &b.fingerprint);
            if sim >= threshold {
                let snippet = if a.code.len() > 200 {
                    format!("{}...", &a.code[..200])
                } else {
                    a.code.clone()
                };
                violations.push(Violation {
                    rule_id: "IP001".into(),
                    rule_name: "Near-Duplicate Code Detected".into(),
                    category: ViolationCategory::IpRisk,
                    severity: Severity::Medium,
                    file_path: a.file.to_string(),
                    line_number: a.start_line,
                    column_number: None,
                    message: format!(
                        "Code in '{}' is similar to '{}' in {}",
                        a.name, b.name, b.file
                    ),
                    explanation: format!(
                        "Near-duplicate code detected ({:.0}% similarity). This may indicate code copying, potential IP risks, or need for refactoring into shared utilities.",
                        sim * 100.0
                    ),
                    fix_suggestion: Some(
                        "Consider refactoring common code into a shared utility function or module to reduce duplication and potential IP risks.".into(),
                    ),
                    standard_mappings: vec!["CWE-1049".into(), "CWE-1050".into()],
                    code_snippet: Some(snippet),
                    is_copilot_generated: false,
                    ai_confidence: None,
                });
            }
        }
    }

    violations
}
