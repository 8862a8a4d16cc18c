//! License and IP-risk analyzer.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::model::{Severity, Violation, ViolationCategory};

/// First-match-wins license detection patterns. Order matters: the first
/// pattern to match within the first 50 lines decides the license.
const LICENSE_PATTERNS: &[(&str, &str)] = &[
    ("MIT", r"(?i)MIT License"),
    ("Apache", r"(?i)Apache License"),
    ("GPL-3.0", r"(?i)GNU General Public License.*v(ersion)?\s*3"),
    ("GPL-2.0", r"(?i)GNU General Public License.*v(ersion)?\s*2"),
    ("AGPL-3.0", r"(?i)GNU Affero General Public License"),
    ("LGPL-3.0", r"(?i)GNU Lesser General Public License.*v(ersion)?\s*3"),
    ("LGPL-2.1", r"(?i)GNU Lesser General Public License.*v(ersion)?\s*2\.1"),
    ("BSD", r"(?i)BSD License"),
    ("Proprietary", r"(?i)Proprietary|All Rights Reserved"),
];

const RESTRICTED_LICENSES: &[&str] =
    &["GPL-2.0", "GPL-3.0", "AGPL-3.0", "LGPL-2.1", "LGPL-3.0"];

/// Registered third-party libraries requiring attribution.
const THIRD_PARTY_LIBS: &[&str] =
    &["requests", "numpy", "pandas", "django", "flask", "tensorflow", "pytorch"];

fn license_regexes() -> &'static Vec<(&'static str, Regex)> {
    static CACHE: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    CACHE.get_or_init(|| {
        LICENSE_PATTERNS
            .iter()
            .map(|(name, pat)| (*name, Regex::new(pat).expect("license pattern compiles")))
            .collect()
    })
}

fn import_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*(?:import|from)\s+(\w+)").unwrap())
}

fn detect_license(lines: &[&str]) -> Option<&'static str> {
    let window = &lines[..lines.len().min(50)];
    let header = window.join("\n");
    for (name, re) in license_regexes().iter() {
        if re.is_match(&header) {
            return Some(name);
        }
    }
    None
}

/// An "attribution string elsewhere in the file" means a
/// sentence naming the library in an attribution/license context, not
/// merely the import statement itself (which always contains the bare
/// library name and would otherwise trivially satisfy any check).
fn has_attribution(content_lower: &str, lib: &str) -> bool {
    let escaped = regex::escape(lib);
    let patterns = [
        format!(r"attribution.*{escaped}"),
        format!(r"{escaped}.*attribution"),
        format!(r"uses.*{escaped}"),
        format!(r"license.*{escaped}"),
        format!(r"{escaped}.*license"),
    ];
    patterns.iter().any(|p| {
        Regex::new(p)
            .map(|re| re.is_match(content_lower))
            .unwrap_or(false)
    })
}

/// Check one file for license-header and attribution issues.
pub fn check_file(file_path: &str, content: &str) -> Vec<Violation> {
    let mut violations = Vec::new();
    let lines: Vec<&str> = content.split('\n').collect();

    if let Some(license) = detect_license(&lines) {
        if RESTRICTED_LICENSES.contains(&license) {
            violations.push(Violation {
                rule_id: "LIC001".into(),
                rule_name: "Restricted License Detected".into(),
                category: ViolationCategory::License,
                severity: Severity::High,
                file_path: file_path.to_string(),
                line_number: 1,
                column_number: None,
                message: format!("File is licensed under {license}, which is restricted"),
                explanation: format!(
                    "{license} imposes copyleft obligations that may conflict with proprietary distribution requirements."
                ),
                fix_suggestion: Some(
                    "Confirm with legal/compliance before distributing code under this license."
                        .into(),
                ),
                standard_mappings: vec![],
                code_snippet: lines.first().map(|l| l.trim().to_string()),
                is_copilot_generated: false,
                ai_confidence: None,
            });
        }
    }

    let content_lower = content.to_lowercase();
    let mut seen_libs = std::collections::HashSet::new();
    for (idx, line) in lines.iter().enumerate() {
        if let Some(cap) = import_regex().captures(line) {
            let lib = cap[1].to_lowercase();
            if THIRD_PARTY_LIBS.contains(&lib.as_str())
                && seen_libs.insert(lib.clone())
                && !has_attribution(&content_lower, &lib)
            {
                violations.push(Violation {
                    rule_id: "LIC002".into(),
                    rule_name: "Missing Third-Party Attribution".into(),
                    category: ViolationCategory::License,
                    severity: Severity::Medium,
                    file_path: file_path.to_string(),
                    line_number: (idx + 1) as u32,
                    column_number: None,
                    message: format!("Third-party library '{lib}' imported without attribution"),
                    explanation: format!(
                        "'{lib}' is a registered third-party dependency; its license/attribution should be noted in the file or NOTICE."
                    ),
                    fix_suggestion: Some(format!(
                        "Add an attribution comment noting use of '{lib}' and its license."
                    )),
                    standard_mappings: vec![],
                    code_snippet: Some(line.trim().to_string()),
                    is_copilot_generated: false,
                    ai_confidence: None,
                });
            }
        }
    }

    violations
}

/// Optional duplicate-code check by fingerprint lookup, superseded by the
/// dedicated duplicate detector when present in the pipeline.
pub fn check_duplicate_code(
    file_path: &str,
    fingerprint: &str,
    known_fingerprints: &HashMap<String, String>,
) -> Option<Violation> {
    known_fingerprints
        .get(fingerprint)
        .filter(|existing_path| existing_path.as_str() != file_path)
        .map(|existing_path| Violation {
            rule_id: "IP001".into(),
            rule_name: "Duplicate Code Fingerprint".into(),
            category: ViolationCategory::IpRisk,
            severity: Severity::Low,
            file_path: file_path.to_string(),
            line_number: 1,
            column_number: None,
            message: format!("Content fingerprint matches existing file {existing_path}"),
            explanation: "Identical normalized content was already seen in another file; this may indicate copied code.".into(),
            fix_suggestion: Some("Consider extracting shared logic into a common module.".into()),
            standard_mappings: vec![],
            code_snippet: None,
            is_copilot_generated: false,
            ai_confidence: None,
        })
}
