//! Copilot-origin detector: a per-file heuristic tag that is
//! propagated into every violation found for that file.

use std::sync::OnceLock;

use regex::Regex;

/// Heuristic score threshold above which content is classified as
/// likely AI-generated.
const HEURISTIC_THRESHOLD: f64 = 0.6;

fn generic_comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?im)^\s*(#|//)\s*(this function|this method|helper function|todo:?\s*implement)").unwrap()
    })
}

fn metadata_marker(metadata: &serde_json::Value) -> Option<bool> {
    for key in ["is_copilot", "copilot_generated", "ai_generated", "source"] {
        if let Some(value) = metadata.get(key) {
            match value {
                serde_json::Value::Bool(b) => return Some(*b),
                serde_json::Value::String(s) => {
                    let lower = s.to_lowercase();
                    if lower.contains("copilot") {
                        return Some(true);
                    }
                    if lower == "human" {
                        return Some(false);
                    }
                }
                _ => {}
            }
        }
    }
    None
}

fn heuristic_score(content: &str) -> f64 {
    let lines: Vec<&str> = content.split('\n').collect();
    if lines.is_empty() {
        return 0.0;
    }

    let comment_lines = lines
        .iter()
        .filter(|l| {
            let t = l.trim_start();
            t.starts_with('#') || t.starts_with("//")
        })
        .count();
    let comment_density = comment_lines as f64 / lines.len() as f64;

    let generic_comment_hits = generic_comment_re().find_iter(content).count();

    let mut score = 0.0;
    if comment_density > 0.25 {
        score += 0.4;
    }
    if generic_comment_hits > 0 {
        score += 0.4;
    }
    if content.contains("def ") && comment_density > 0.15 {
        score += 0.2;
    }

    score.min(1.0)
}

/// Decide whether `content` looks Copilot-generated. Deterministic for
/// identical `(content, metadata)` input.
pub fn detect(content: &str, metadata: &serde_json::Value) -> bool {
    if let Some(flagged) = metadata_marker(metadata) {
        return flagged;
    }
    heuristic_score(content) >= HEURISTIC_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn explicit_metadata_marker_wins() {
        assert!(detect("plain code", &json!({"is_copilot": true})));
        assert!(!detect("plain code", &json!({"is_copilot": false})));
    }

    #[test]
    fn source_string_marker() {
        assert!(detect("plain code", &json!({"source": "github-copilot"})));
        assert!(!detect("plain code", &json!({"source": "human"})));
    }

    #[test]
    fn heuristic_flags_dense_generic_comments() {
        let content = "# This function adds two numbers\n# TODO: implement validation\ndef add(a, b):\n    # this function does the math\n    return a + b\n";
        assert!(detect(content, &json!({})));
    }

    #[test]
    fn heuristic_does_not_flag_normal_code() {
        let content = "def add(a, b):\n    return a + b\n";
        assert!(!detect(content, &json!({})));
    }

    #[test]
    fn deterministic_for_identical_input() {
        let content = "# This function adds two numbers\ndef add(a, b):\n    return a + b\n";
        let meta = json!({});
        assert_eq!(detect(content, &meta), detect(content, &meta));
    }
}
