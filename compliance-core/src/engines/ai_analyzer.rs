//! AI-powered code analysis adapter, calling Google's Gemini
//! generative-language API. Enabled only when `GEMINI_API_KEY` is set.
//!
//! This is a bounded, cancellable side channel: every public method
//! returns "something, possibly empty" rather than propagating failures
//! into the scan's enforcement verdict (AI failures never
//! change `can_merge`, they only suppress AI contributions).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Severity, Violation, ViolationCategory};

const MAX_PROMPT_CHARS: usize = 8_000;
const COPILOT_PROMPT_CHARS: usize = 2_000;
const MAX_RETRIES: u32 = 3;
const MAX_RETRY_DELAY_SECS: u64 = 300;
const QUOTA_COOLDOWN_SECS: u64 = 3_600;
const GEMINI_MODEL: &str = "gemini-2.5-flash";

fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Tracks whether the AI adapter's quota has been exhausted, clearing
/// itself after `QUOTA_COOLDOWN_SECS`.
struct QuotaState {
    exceeded_at: AtomicU64,
}

impl QuotaState {
    fn new() -> Self {
        QuotaState { exceeded_at: AtomicU64::new(0) }
    }

    fn is_blocked(&self) -> bool {
        let at = self.exceeded_at.load(Ordering::Relaxed);
        if at == 0 {
            return false;
        }
        if now_epoch_secs().saturating_sub(at) >= QUOTA_COOLDOWN_SECS {
            self.exceeded_at.store(0, Ordering::Relaxed);
            false
        } else {
            true
        }
    }

    fn mark_exceeded(&self) {
        self.exceeded_at.store(now_epoch_secs(), Ordering::Relaxed);
    }
}

pub struct AiAnalyzer {
    api_key: Option<String>,
    client: reqwest::Client,
    quota: QuotaState,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiResponseContent,
}

#[derive(Deserialize)]
struct GeminiResponseContent {
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: String,
}

fn json_array_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\[.*\]").unwrap())
}

fn fenced_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:\w+)?\n(.*?)```").unwrap())
}

fn retry_delay_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""retryDelay"\s*:\s*"(\d+)s""#).unwrap())
}

impl AiAnalyzer {
    pub fn new(api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        AiAnalyzer {
            api_key,
            client,
            quota: QuotaState::new(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.api_key.is_some()
    }

    /// Analyze code using AI for contextual, beyond-pattern-matching review.
    pub async fn analyze_code(
        &self,
        file_path: &str,
        content: &str,
        context: &Value,
        is_copilot: bool,
    ) -> Vec<Violation> {
        if !self.enabled() || self.quota.is_blocked() {
            return Vec::new();
        }

        let prompt = self.build_analysis_prompt(file_path, content, context, is_copilot);
        match self.call_with_retry(&prompt).await {
            Ok(response) => self.parse_ai_response(&response, file_path, is_copilot),
            Err(e) => {
                tracing::warn!(file = file_path, error = %e, "AI analysis failed");
                Vec::new()
            }
        }
    }

    /// Ask for a concise fix suggestion for an existing violation.
    pub async fn suggest_fix(&self, violation: &Violation, code_context: &str) -> Option<String> {
        if !self.enabled() || self.quota.is_blocked() {
            return None;
        }

        let prompt = format!(
            "Provide a specific code fix for this issue:\n\n\
             Issue: {}\nExplanation: {}\nFile: {}\nLine: {}\n\n\
             Code context:\n```\n{}\n```\n\n\
             Provide only the fixed code snippet, not explanations.",
            violation.message,
            violation.explanation,
            violation.file_path,
            violation.line_number,
            code_context
        );

        let response = match self.call_with_retry(&prompt).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "AI fix suggestion failed");
                return None;
            }
        };

        let cleaned = clean_fix_response(&response);
        if cleaned.chars().count() < 20 {
            None
        } else {
            Some(cleaned)
        }
    }

    /// Classify whether content looks AI/Copilot-generated via the model
    /// itself (a heavier alternative to the heuristic in `copilot_detector`).
    pub async fn detect_copilot_code(&self, content: &str, _metadata: &Value) -> bool {
        if !self.enabled() || self.quota.is_blocked() {
            return false;
        }

        let truncated: String = content.chars().take(COPILOT_PROMPT_CHARS).collect();
        let prompt = format!(
            "Analyze this code and determine if it was likely generated by GitHub Copilot \
             or a similar AI coding assistant.\n\nConsider:\n\
             - Code style patterns typical of AI generation\n\
             - Comment style\n- Variable naming patterns\n- Code structure\n\n\
             Code:\n```\n{truncated}\n```\n\nRespond with only \"true\" or \"false\"."
        );

        match self.call_with_retry(&prompt).await {
            Ok(response) => response.to_lowercase().contains("true"),
            Err(e) => {
                tracing::warn!(error = %e, "AI copilot detection failed");
                false
            }
        }
    }

    fn build_analysis_prompt(
        &self,
        file_path: &str,
        content: &str,
        context: &Value,
        is_copilot: bool,
    ) -> String {
        let copilot_note = if is_copilot {
            "NOTE: This code is suspected to be AI-generated (GitHub Copilot). Apply stricter security standards.\n\n"
        } else {
            ""
        };
        let truncated: String = content.chars().take(MAX_PROMPT_CHARS).collect();
        let context_str = if context.is_null() {
            "No additional context".to_string()
        } else {
            context.to_string()
        };

        format!(
            "You are an expert enterprise code reviewer analyzing code for production systems. \
             Your analysis must be thorough, covering security, performance, maintainability, and compliance.\n\n\
             {copilot_note}File: {file_path}\nContext: {context_str}\n\n\
             Code to analyze:\n```\n{truncated}\n```\n\n\
             Identify security vulnerabilities (OWASP/CWE), performance issues, maintainability \
             concerns, standards violations, and compliance/IP risks.\n\n\
             Respond with ONLY a JSON array, one object per finding:\n\
             [{{\"rule_id\": \"AI001\", \"rule_name\": \"...\", \"category\": \"security\", \
             \"severity\": \"high\", \"line_number\": 1, \"message\": \"...\", \
             \"explanation\": \"...\", \"fix_suggestion\": \"...\", \"standard_mappings\": []}}]\n\n\
             Severities: critical, high, medium, low. \
             Categories: security, compliance, code_quality, license, ip_risk, standard.\n\
             If no issues found, return []."
        )
    }

    fn parse_ai_response(
        &self,
        response: &str,
        file_path: &str,
        is_copilot: bool,
    ) -> Vec<Violation> {
        let Some(m) = json_array_re().find(response) else {
            return Vec::new();
        };

        let parsed: Result<Vec<Value>, _> = serde_json::from_str(m.as_str());
        let items = match parsed {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse AI response JSON array");
                return Vec::new();
            }
        };

        let mut violations = Vec::new();
        for item in items {
            match violation_from_ai_json(&item, file_path, is_copilot) {
                Some(v) => violations.push(v),
                None => tracing::warn!("dropped malformed AI violation element"),
            }
        }
        violations
    }

    async fn call_with_retry(&self, prompt: &str) -> Result<String, String> {
        let mut delay = Duration::from_secs(1);
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                tokio::time::sleep(delay).await;
            }

            match self.call_gemini(prompt).await {
                Ok(text) => return Ok(text),
                Err(GeminiError::Quota(body)) => {
                    self.quota.mark_exceeded();
                    return Err(format!("quota exceeded: {body}"));
                }
                Err(GeminiError::Retryable { body, retry_after }) => {
                    delay = retry_after.unwrap_or_else(|| {
                        Duration::from_secs(2u64.saturating_pow(attempt + 1).min(MAX_RETRY_DELAY_SECS))
                    });
                    last_error = Some(body);
                }
                Err(GeminiError::Fatal(body)) => return Err(body),
            }
        }

        Err(last_error.unwrap_or_else(|| "all retry attempts failed".to_string()))
    }

    async fn call_gemini(&self, prompt: &str) -> Result<String, GeminiError> {
        let api_key = self.api_key.as_ref().ok_or(GeminiError::Fatal("AI analyzer disabled".into()))?;
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{GEMINI_MODEL}:generateContent?key={api_key}"
        );
        let request = GeminiRequest {
            contents: vec![GeminiContent { parts: vec![GeminiPart { text: prompt }] }],
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| GeminiError::Retryable { body: e.to_string(), retry_after: None })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let lowered = body.to_lowercase();
            if status.as_u16() == 429 || lowered.contains("quota") || lowered.contains("resource_exhausted") {
                return Err(GeminiError::Quota(body));
            }
            if status.is_server_error() {
                let retry_after = retry_delay_re()
                    .captures(&body)
                    .and_then(|c| c[1].parse::<u64>().ok())
                    .map(|s| Duration::from_secs(s.min(MAX_RETRY_DELAY_SECS)));
                return Err(GeminiError::Retryable { body, retry_after });
            }
            return Err(GeminiError::Fatal(format!("Gemini API error {status}: {body}")));
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| GeminiError::Fatal(e.to_string()))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| GeminiError::Fatal("empty response from Gemini".into()))
    }
}

enum GeminiError {
    Quota(String),
    Retryable { body: String, retry_after: Option<Duration> },
    Fatal(String),
}

impl std::fmt::Display for GeminiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeminiError::Quota(b) => write!(f, "quota: {b}"),
            GeminiError::Retryable { body, .. } => write!(f, "retryable: {body}"),
            GeminiError::Fatal(b) => write!(f, "fatal: {b}"),
        }
    }
}

fn violation_from_ai_json(item: &Value, file_path: &str, is_copilot: bool) -> Option<Violation> {
    let severity = match item.get("severity").and_then(Value::as_str).unwrap_or("medium") {
        "low" => Severity::Low,
        "medium" => Severity::Medium,
        "high" => Severity::High,
        "critical" => Severity::Critical,
        _ => return None,
    };
    let category = match item.get("category").and_then(Value::as_str).unwrap_or("code_quality") {
        "security" => ViolationCategory::Security,
        "compliance" => ViolationCategory::Compliance,
        "code_quality" => ViolationCategory::CodeQuality,
        "license" => ViolationCategory::License,
        "ip_risk" => ViolationCategory::IpRisk,
        "standard" => ViolationCategory::Standard,
        _ => return None,
    };
    let line_number = item.get("line_number").and_then(Value::as_u64).unwrap_or(1) as u32;
    let standard_mappings = item
        .get("standard_mappings")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();

    Some(Violation {
        rule_id: item.get("rule_id").and_then(Value::as_str).unwrap_or("AI000").to_string(),
        rule_name: item.get("rule_name").and_then(Value::as_str).unwrap_or("AI Detected Issue").to_string(),
        category,
        severity,
        file_path: file_path.to_string(),
        line_number,
        column_number: None,
        message: item.get("message").and_then(Value::as_str).unwrap_or("").to_string(),
        explanation: item.get("explanation").and_then(Value::as_str).unwrap_or("").to_string(),
        fix_suggestion: item.get("fix_suggestion").and_then(Value::as_str).map(str::to_string),
        standard_mappings,
        code_snippet: None,
        is_copilot_generated: is_copilot,
        ai_confidence: Some(0.85),
    })
}

fn clean_fix_response(response: &str) -> String {
    if let Some(caps) = fenced_code_re().captures(response) {
        return caps[1].trim().chars().take(500).collect();
    }

    let mut s = response.trim();
    for prefix in ["here's the fix:", "here's", "the fix:", "the fix is:", "solution:"] {
        let lower = s.to_lowercase();
        if lower.starts_with(prefix) {
            s = s[prefix.len()..].trim_start();
            break;
        }
    }
    s.chars().take(500).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn disabled_without_api_key() {
        let analyzer = AiAnalyzer::new(None);
        assert!(!analyzer.enabled());
    }

    #[test]
    fn enabled_with_api_key() {
        let analyzer = AiAnalyzer::new(Some("key".into()));
        assert!(analyzer.enabled());
    }

    #[test]
    fn quota_state_blocks_until_cooldown() {
        let q = QuotaState::new();
        assert!(!q.is_blocked());
        q.mark_exceeded();
        assert!(q.is_blocked());
    }

    #[test]
    fn parses_ai_response_array() {
        let analyzer = AiAnalyzer::new(Some("key".into()));
        let response = "Here you go:\n```json\n[{\"rule_id\":\"AI001\",\"rule_name\":\"x\",\"category\":\"security\",\"severity\":\"high\",\"line_number\":3,\"message\":\"m\",\"explanation\":\"e\"}]\n```";
        let violations = analyzer.parse_ai_response(response, "f.py", false);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].ai_confidence, Some(0.85));
        assert_eq!(violations[0].line_number, 3);
    }

    #[test]
    fn malformed_element_is_dropped_not_fatal() {
        let analyzer = AiAnalyzer::new(Some("key".into()));
        let response = r#"[{"severity":"not-a-real-severity","category":"security"},{"rule_id":"AI002","rule_name":"y","category":"security","severity":"low","line_number":1,"message":"m","explanation":"e"}]"#;
        let violations = analyzer.parse_ai_response(response, "f.py", false);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule_id, "AI002");
    }

    #[test]
    fn missing_array_returns_empty() {
        let analyzer = AiAnalyzer::new(Some("key".into()));
        let violations = analyzer.parse_ai_response("no findings here", "f.py", false);
        assert!(violations.is_empty());
    }

    #[test]
    fn clean_fix_prefers_fenced_block() {
        let response = "explanation\n```python\nx = 1\n```\ntrailing";
        assert_eq!(clean_fix_response(response), "x = 1");
    }

    #[test]
    fn clean_fix_strips_known_prefix() {
        let response = "Here's the fix: x = sanitize(x)";
        assert_eq!(clean_fix_response(response), "x = sanitize(x)");
    }

    #[test]
    fn build_prompt_truncates_to_8000_chars() {
        let analyzer = AiAnalyzer::new(Some("key".into()));
        let content = "a".repeat(20_000);
        let prompt = analyzer.build_analysis_prompt("f.py", &content, &json!(null), false);
        assert!(prompt.matches('a').count() <= MAX_PROMPT_CHARS + 50);
    }
}
