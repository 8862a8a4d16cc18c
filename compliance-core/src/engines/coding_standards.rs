//! Coding-standards analyzer: naming conventions, logging requirements,
//! and error-handling patterns.

use std::sync::OnceLock;

use regex::Regex;

use crate::model::{Severity, Violation, ViolationCategory};

fn function_def_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"def\s+([a-zA-Z_][a-zA-Z0-9_]*)").unwrap())
}

fn class_def_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"class\s+([a-zA-Z_][a-zA-Z0-9_]*)").unwrap())
}

fn const_assign_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Z_][A-Z0-9_]*)\s*=").unwrap())
}

fn snake_case_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z_][a-z0-9_]*$").unwrap())
}

fn pascal_case_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z][A-Za-z0-9]*$").unwrap())
}

fn upper_snake_case_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").unwrap())
}

fn function_trigger_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*def\s+\w+").unwrap())
}

fn raise_except_trigger_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(raise|except)\b").unwrap())
}

fn bare_except_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"except\s*:\s*$").unwrap())
}

fn except_exception_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"except\s+Exception\s*:\s*$").unwrap())
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::new();
    let chars: Vec<char> = name.chars().collect();
    for (i, c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            out.push('_');
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}

fn to_pascal_case(name: &str) -> String {
    name.split('_')
        .filter(|p| !p.is_empty())
        .map(|p| {
            let mut c = p.chars();
            match c.next() {
                Some(first) => first.to_uppercase().collect::<String>() + c.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

fn context_has_logging(lines: &[&str], line_num: usize) -> bool {
    let start = line_num.saturating_sub(3);
    let end = (line_num + 3).min(lines.len());
    let context = lines[start..end].join("\n").to_lowercase();
    context.contains("logger") || context.contains("log") || context.contains("logging")
}

/// Analyze one file's content for coding-standards violations.
/// `custom_standards` is accepted but intentionally ignored for now; the
/// hook exists so a future rule-driven override can plug in without
/// changing the call signature.
pub fn analyze_file(
    file_path: &str,
    content: &str,
    is_copilot: bool,
    _custom_standards: Option<&[serde_json::Value]>,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    let lines: Vec<&str> = content.split('\n').collect();

    check_naming_conventions(file_path, &lines, is_copilot, &mut violations);
    check_logging_requirements(file_path, &lines, is_copilot, &mut violations);
    check_error_handling(file_path, &lines, is_copilot, &mut violations);

    violations
}

fn check_naming_conventions(
    file_path: &str,
    lines: &[&str],
    is_copilot: bool,
    out: &mut Vec<Violation>,
) {
    for (idx, line) in lines.iter().enumerate() {
        let line_number = (idx + 1) as u32;

        if let Some(cap) = function_def_re().captures(line) {
            let name = &cap[1];
            if !snake_case_re().is_match(name) {
                out.push(Violation {
                    rule_id: "STD005".into(),
                    rule_name: "Function Naming Convention Violation".into(),
                    category: ViolationCategory::Standard,
                    severity: Severity::Low,
                    file_path: file_path.to_string(),
                    line_number,
                    column_number: None,
                    message: format!("Function '{name}' does not follow snake_case convention"),
                    explanation: format!(
                        "Functions should use snake_case naming (e.g., 'get_user_data' not '{name}')"
                    ),
                    fix_suggestion: Some(format!(
                        "Rename function to follow snake_case: '{}'",
                        to_snake_case(name)
                    )),
                    standard_mappings: vec![],
                    code_snippet: Some(line.trim().to_string()),
                    is_copilot_generated: is_copilot,
                    ai_confidence: None,
                });
            }
        }

        if let Some(cap) = class_def_re().captures(line) {
            let name = &cap[1];
            if !pascal_case_re().is_match(name) {
                out.push(Violation {
                    rule_id: "STD006".into(),
                    rule_name: "Class Naming Convention Violation".into(),
                    category: ViolationCategory::Standard,
                    severity: Severity::Low,
                    file_path: file_path.to_string(),
                    line_number,
                    column_number: None,
                    message: format!("Class '{name}' does not follow PascalCase convention"),
                    explanation: format!(
                        "Classes should use PascalCase naming (e.g., 'UserService' not '{name}')"
                    ),
                    fix_suggestion: Some(format!(
                        "Rename class to follow PascalCase: '{}'",
                        to_pascal_case(name)
                    )),
                    standard_mappings: vec![],
                    code_snippet: Some(line.trim().to_string()),
                    is_copilot_generated: is_copilot,
                    ai_confidence: None,
                });
            }
        }

        if let Some(cap) = const_assign_re().captures(line) {
            let name = &cap[1];
            if !upper_snake_case_re().is_match(name) {
                out.push(Violation {
                    rule_id: "STD007".into(),
                    rule_name: "Constant Naming Convention Violation".into(),
                    category: ViolationCategory::Standard,
                    severity: Severity::Low,
                    file_path: file_path.to_string(),
                    line_number,
                    column_number: None,
                    message: format!(
                        "Constant '{name}' does not follow UPPER_SNAKE_CASE convention"
                    ),
                    explanation: format!(
                        "Constants should use UPPER_SNAKE_CASE naming (e.g., 'MAX_RETRIES' not '{name}')"
                    ),
                    fix_suggestion: Some(format!(
                        "Rename constant to follow UPPER_SNAKE_CASE: '{}'",
                        name.to_uppercase()
                    )),
                    standard_mappings: vec![],
                    code_snippet: Some(line.trim().to_string()),
                    is_copilot_generated: is_copilot,
                    ai_confidence: None,
                });
            }
        }
    }
}

fn check_logging_requirements(
    file_path: &str,
    lines: &[&str],
    is_copilot: bool,
    out: &mut Vec<Violation>,
) {
    for (idx, line) in lines.iter().enumerate() {
        let line_number = (idx + 1) as u32;

        if function_trigger_re().is_match(line) && !context_has_logging(lines, idx) {
            out.push(Violation {
                rule_id: "STD001".into(),
                rule_name: "Missing Logging in Function".into(),
                category: ViolationCategory::Standard,
                severity: Severity::Medium,
                file_path: file_path.to_string(),
                line_number,
                column_number: None,
                message: "Missing Logging in Function".into(),
                explanation: "Functions should include logging for debugging and monitoring"
                    .into(),
                fix_suggestion: Some(
                    "Add appropriate logging: logger.info('Operation started') or logger.error('Operation failed', exc_info=True)".into(),
                ),
                standard_mappings: vec![],
                code_snippet: Some(line.trim().to_string()),
                is_copilot_generated: is_copilot,
                ai_confidence: None,
            });
        }

        if raise_except_trigger_re().is_match(line) && !context_has_logging(lines, idx) {
            out.push(Violation {
                rule_id: "STD002".into(),
                rule_name: "Missing Error Logging".into(),
                category: ViolationCategory::Standard,
                severity: Severity::High,
                file_path: file_path.to_string(),
                line_number,
                column_number: None,
                message: "Missing Error Logging".into(),
                explanation: "Error handling should include logging for troubleshooting".into(),
                fix_suggestion: Some(
                    "Add appropriate logging: logger.info('Operation started') or logger.error('Operation failed', exc_info=True)".into(),
                ),
                standard_mappings: vec![],
                code_snippet: Some(line.trim().to_string()),
                is_copilot_generated: is_copilot,
                ai_confidence: None,
            });
        }
    }
}

fn check_error_handling(
    file_path: &str,
    lines: &[&str],
    is_copilot: bool,
    out: &mut Vec<Violation>,
) {
    for (idx, line) in lines.iter().enumerate() {
        let line_number = (idx + 1) as u32;

        if bare_except_re().is_match(line) {
            out.push(Violation {
                rule_id: "STD003".into(),
                rule_name: "Bare Except Clause".into(),
                category: ViolationCategory::CodeQuality,
                severity: Severity::High,
                file_path: file_path.to_string(),
                line_number,
                column_number: None,
                message: "Bare Except Clause".into(),
                explanation: "Bare except clauses catch all exceptions including system exits"
                    .into(),
                fix_suggestion: Some(
                    "Use specific exception types: except ValueError as e: logger.error('Error occurred', exc_info=True)".into(),
                ),
                standard_mappings: vec![],
                code_snippet: Some(line.trim().to_string()),
                is_copilot_generated: is_copilot,
                ai_confidence: None,
            });
        }

        if except_exception_re().is_match(line) {
            if let Some(next) = lines.get(idx + 1) {
                if next.trim() == "pass" {
                    out.push(Violation {
                        rule_id: "STD004".into(),
                        rule_name: "Silent Exception Handling".into(),
                        category: ViolationCategory::CodeQuality,
                        severity: Severity::Medium,
                        file_path: file_path.to_string(),
                        line_number,
                        column_number: None,
                        message: "Silent Exception Handling".into(),
                        explanation:
                            "Silently catching exceptions hides errors and makes debugging difficult"
                                .into(),
                        fix_suggestion: Some(
                            "Use specific exception types: except ValueError as e: logger.error('Error occurred', exc_info=True)".into(),
                        ),
                        standard_mappings: vec![],
                        code_snippet: Some(line.trim().to_string()),
                        is_copilot_generated: is_copilot,
                        ai_confidence: None,
                    });
                }
            }
        }
    }
}
