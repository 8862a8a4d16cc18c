//! Core data model: violations, policy configuration, rule packs, and
//! scan request/result shapes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Issue severity, ordered low < medium < high < critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Violation category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCategory {
    Security,
    Compliance,
    CodeQuality,
    License,
    IpRisk,
    Standard,
}

impl ViolationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationCategory::Security => "security",
            ViolationCategory::Compliance => "compliance",
            ViolationCategory::CodeQuality => "code_quality",
            ViolationCategory::License => "license",
            ViolationCategory::IpRisk => "ip_risk",
            ViolationCategory::Standard => "standard",
        }
    }
}

/// Policy enforcement mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnforcementMode {
    Advisory,
    Warning,
    Blocking,
}

/// A single finding produced by one of the analysis engines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: String,
    pub rule_name: String,
    pub category: ViolationCategory,
    pub severity: Severity,
    pub file_path: String,
    pub line_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_number: Option<u32>,
    pub message: String,
    pub explanation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_suggestion: Option<String>,
    #[serde(default)]
    pub standard_mappings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<String>,
    #[serde(default)]
    pub is_copilot_generated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_confidence: Option<f64>,
}

impl Violation {
    /// The key that must be unique per (engine/rule-pack pass).
    pub fn identity_key(&self) -> (String, String, u32) {
        (self.rule_id.clone(), self.file_path.clone(), self.line_number)
    }

    pub fn is_copilot_critical(&self) -> bool {
        self.is_copilot_generated && self.severity == Severity::Critical
    }
}

/// A single rule within a rule pack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSpec {
    pub id: String,
    pub name: String,
    pub pattern: String,
    #[serde(default = "default_pack_category")]
    pub category: ViolationCategory,
    #[serde(default = "default_pack_severity")]
    pub severity: Severity,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub standard_mappings: Vec<String>,
}

fn default_pack_category() -> ViolationCategory {
    ViolationCategory::Compliance
}

fn default_pack_severity() -> Severity {
    Severity::Medium
}

/// A named, versioned collection of declarative rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulePack {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

/// Policy configuration resolved for a repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub enforcement_mode: EnforcementMode,
    pub enabled_rules: Vec<String>,
    pub disabled_rules: Vec<String>,
    pub severity_threshold: Severity,
    pub custom_rules: Vec<serde_json::Value>,
    pub rule_packs: Vec<String>,
    pub allow_blocking_override: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        PolicyConfig {
            enforcement_mode: EnforcementMode::Warning,
            enabled_rules: Vec::new(),
            disabled_rules: Vec::new(),
            severity_threshold: Severity::Medium,
            custom_rules: Vec::new(),
            rule_packs: Vec::new(),
            allow_blocking_override: true,
        }
    }
}

/// A partial override applied on top of a resolved policy. Any field
/// present is set verbatim on the base policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyOverride {
    pub enforcement_mode: Option<EnforcementMode>,
    pub enabled_rules: Option<Vec<String>>,
    pub disabled_rules: Option<Vec<String>>,
    pub severity_threshold: Option<Severity>,
    pub custom_rules: Option<Vec<serde_json::Value>>,
    pub rule_packs: Option<Vec<String>>,
    pub allow_blocking_override: Option<bool>,
}

impl PolicyConfig {
    pub fn apply_override(mut self, over: &PolicyOverride) -> Self {
        if let Some(v) = &over.enforcement_mode {
            self.enforcement_mode = *v;
        }
        if let Some(v) = &over.enabled_rules {
            self.enabled_rules = v.clone();
        }
        if let Some(v) = &over.disabled_rules {
            self.disabled_rules = v.clone();
        }
        if let Some(v) = &over.severity_threshold {
            self.severity_threshold = *v;
        }
        if let Some(v) = &over.custom_rules {
            self.custom_rules = v.clone();
        }
        if let Some(v) = &over.rule_packs {
            self.rule_packs = v.clone();
        }
        if let Some(v) = over.allow_blocking_override {
            self.allow_blocking_override = v;
        }
        self
    }
}

/// One file submitted for scanning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInput {
    pub path: String,
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// A scan request submitted to the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRequest {
    pub repository: String,
    #[serde(default)]
    pub pull_request_number: Option<u64>,
    #[serde(default)]
    pub commit_sha: Option<String>,
    pub files: Vec<FileInput>,
    #[serde(default)]
    pub base_sha: Option<String>,
    #[serde(default)]
    pub policy_config: Option<PolicyOverride>,
    #[serde(default = "default_true")]
    pub detect_copilot: bool,
    #[serde(default)]
    pub override_blocking: bool,
}

fn default_true() -> bool {
    true
}

/// Aggregate counts over a scan's violations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSummary {
    pub total_violations: usize,
    pub by_severity: HashMap<String, usize>,
    pub by_category: HashMap<String, usize>,
    pub copilot_violations: usize,
    pub files_affected: usize,
}

impl ScanSummary {
    pub fn from_violations(violations: &[Violation]) -> Self {
        let mut by_severity = HashMap::new();
        for s in ["critical", "high", "medium", "low"] {
            by_severity.insert(s.to_string(), 0usize);
        }
        let mut by_category = HashMap::new();
        let mut files = std::collections::HashSet::new();
        let mut copilot_violations = 0usize;

        for v in violations {
            *by_severity.entry(v.severity.as_str().to_string()).or_insert(0) += 1;
            *by_category.entry(v.category.as_str().to_string()).or_insert(0) += 1;
            files.insert(v.file_path.clone());
            if v.is_copilot_generated {
                copilot_violations += 1;
            }
        }

        ScanSummary {
            total_violations: violations.len(),
            by_severity,
            by_category,
            copilot_violations,
            files_affected: files.len(),
        }
    }
}

/// The result of a completed scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub scan_id: String,
    pub repository: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub violations: Vec<Violation>,
    pub summary: ScanSummary,
    pub enforcement_action: EnforcementMode,
    pub can_merge: bool,
    pub copilot_detected: bool,
    pub processing_time_ms: f64,
}

/// Entry recorded by the (out-of-core-scope) audit log collaborator. Defined
/// here only as a data shape so a collaborator can serialize one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub log_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub repository: String,
    pub action: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub details: serde_json::Value,
    pub violations_count: usize,
    pub enforcement_action: EnforcementMode,
    #[serde(default)]
    pub resolved: bool,
}
