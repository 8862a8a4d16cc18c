//! Policy engine: policy resolution, violation filtering,
//! rule-pack application, and the enforcement decision table.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use regex::RegexBuilder;

use crate::error::{ScanError, ScanOutcome};
use crate::model::{EnforcementMode, PolicyConfig, PolicyOverride, RulePack, Severity, Violation};

/// Reader-writer-protected registry of per-repository/organization policies
/// and installed rule packs, constructed once at startup and passed into
/// the orchestrator so callers never reach for a process-wide singleton.
pub struct PolicyStore {
    config_dir: PathBuf,
    overrides: RwLock<HashMap<String, PolicyConfig>>,
    rule_packs: RwLock<HashMap<String, RulePack>>,
}

impl PolicyStore {
    /// Load every `<config_dir>/rule_packs/*.yaml` pack at construction.
    /// A directory that doesn't exist yet is treated as "no packs", not
    /// an error.
    pub fn new(config_dir: PathBuf) -> Self {
        let rule_packs = load_rule_packs_dir(&config_dir.join("rule_packs"));
        PolicyStore {
            config_dir,
            overrides: RwLock::new(HashMap::new()),
            rule_packs: RwLock::new(rule_packs),
        }
    }

    /// Resolve the effective policy for `repository`, applying `override_`
    /// on top. In-memory writes via [`PolicyStore::put_policy`]
    /// take priority over the on-disk YAML for the same key.
    pub fn get_policy(&self, repository: &str, override_: Option<&PolicyOverride>) -> PolicyConfig {
        let base = self
            .overrides
            .read()
            .unwrap()
            .get(repository)
            .cloned()
            .unwrap_or_else(|| self.load_from_disk(repository));

        match override_ {
            Some(o) => base.apply_override(o),
            None => base,
        }
    }

    /// Store a policy in memory for `repository` (the `PUT /policies/...`
    /// management endpoint), taking an exclusive write lock.
    pub fn put_policy(&self, repository: &str, policy: PolicyConfig) {
        self.overrides
            .write()
            .unwrap()
            .insert(repository.to_string(), policy);
    }

    /// Resolve the effective policy for an organization directly (the
    /// `/policies/organizations/{org}` endpoints), bypassing the
    /// org-from-repository-name inference in [`PolicyStore::get_policy`].
    pub fn get_org_policy(&self, org: &str) -> PolicyConfig {
        let key = org_key(org);
        self.overrides.read().unwrap().get(&key).cloned().unwrap_or_else(|| {
            let path = self.config_dir.join("organizations").join(format!("{org}.yaml"));
            match load_policy_file(&path) {
                Ok(Some(policy)) => policy,
                Ok(None) => PolicyConfig::default(),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "org policy file load failed, using defaults");
                    PolicyConfig::default()
                }
            }
        })
    }

    pub fn put_org_policy(&self, org: &str, policy: PolicyConfig) {
        self.overrides.write().unwrap().insert(org_key(org), policy);
    }

    fn load_from_disk(&self, repository: &str) -> PolicyConfig {
        let path = if let Some((org, _)) = repository.split_once('/') {
            self.config_dir.join("organizations").join(format!("{org}.yaml"))
        } else {
            self.config_dir.join(format!("{repository}.yaml"))
        };

        match load_policy_file(&path) {
            Ok(Some(policy)) => policy,
            Ok(None) => PolicyConfig::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "policy file load failed, using defaults");
                PolicyConfig::default()
            }
        }
    }

    pub fn rule_pack(&self, name: &str) -> Option<RulePack> {
        self.rule_packs.read().unwrap().get(name).cloned()
    }

    pub fn list_rule_packs(&self) -> Vec<RulePack> {
        self.rule_packs.read().unwrap().values().cloned().collect()
    }

    /// Install or replace a rule pack in memory (the rule-pack upload
    /// endpoint), under an exclusive write lock.
    pub fn install_rule_pack(&self, name: String, pack: RulePack) {
        self.rule_packs.write().unwrap().insert(name, pack);
    }
}

fn org_key(org: &str) -> String {
    format!("org::{org}")
}

fn load_policy_file(path: &Path) -> ScanOutcome<Option<PolicyConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path).map_err(|e| ScanError::Config(e.to_string()))?;
    let policy: PolicyConfig = serde_yml::from_str(&raw).map_err(|e| ScanError::Config(e.to_string()))?;
    Ok(Some(policy))
}

fn load_rule_packs_dir(dir: &Path) -> HashMap<String, RulePack> {
    let mut packs = HashMap::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return packs;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let parsed = std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|raw| serde_yml::from_str::<RulePack>(&raw).map_err(|e| e.to_string()));
        match parsed {
            Ok(pack) => {
                packs.insert(stem.to_string(), pack);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "rule pack load failed, skipping");
            }
        }
    }
    packs
}

/// Drop violations absent from a non-empty `enabled_rules`, present in
/// `disabled_rules`, or below `severity_threshold`. Preserves order.
pub fn filter_violations(violations: Vec<Violation>, policy: &PolicyConfig) -> Vec<Violation> {
    violations
        .into_iter()
        .filter(|v| {
            if !policy.enabled_rules.is_empty() && !policy.enabled_rules.contains(&v.rule_id) {
                return false;
            }
            if policy.disabled_rules.contains(&v.rule_id) {
                return false;
            }
            if v.severity < policy.severity_threshold {
                return false;
            }
            true
        })
        .collect()
}

fn pack_rule_regex(pattern: &str) -> Option<regex::Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .multi_line(true)
        .build()
        .ok()
}

/// Apply one named rule pack's rules against `content`, returning only the
/// *new* violations to append to `existing` (idempotent on
/// `(rule_id, line_number)`). Unknown packs return an empty vec; rules that
/// fail to compile are skipped individually.
pub fn apply_rule_pack(
    pack: Option<&RulePack>,
    file_path: &str,
    content: &str,
    existing: &[Violation],
) -> Vec<Violation> {
    let Some(pack) = pack else {
        tracing::warn!(pack = "unknown", "rule pack not found, skipping");
        return Vec::new();
    };

    let mut seen: std::collections::HashSet<(String, u32)> = existing
        .iter()
        .map(|v| (v.rule_id.clone(), v.line_number))
        .collect();
    let mut new_violations = Vec::new();
    let lines: Vec<&str> = content.split('\n').collect();

    for rule in &pack.rules {
        let Some(re) = pack_rule_regex(&rule.pattern) else {
            tracing::warn!(rule_id = %rule.id, "rule pack entry failed to compile, skipping");
            continue;
        };

        for (idx, line) in lines.iter().enumerate() {
            if !re.is_match(line) {
                continue;
            }
            let line_number = (idx + 1) as u32;
            let key = (rule.id.clone(), line_number);
            if !seen.insert(key) {
                continue;
            }
            new_violations.push(Violation {
                rule_id: rule.id.clone(),
                rule_name: rule.name.clone(),
                category: rule.category,
                severity: rule.severity,
                file_path: file_path.to_string(),
                line_number,
                column_number: None,
                message: rule.name.clone(),
                explanation: rule.explanation.clone(),
                fix_suggestion: None,
                standard_mappings: rule.standard_mappings.clone(),
                code_snippet: Some(line.trim().to_string()),
                is_copilot_generated: false,
                ai_confidence: None,
            });
        }
    }

    new_violations
}

fn has_severity(violations: &[Violation], severity: Severity) -> bool {
    violations.iter().any(|v| v.severity == severity)
}

fn has_copilot_critical(violations: &[Violation]) -> bool {
    violations.iter().any(|v| v.is_copilot_critical())
}

/// Compute `(enforcement_action, can_merge)` per the enforcement decision
/// table, evaluated top-down; the first matching row wins.
pub fn determine_enforcement(
    violations: &[Violation],
    policy: &PolicyConfig,
    override_requested: bool,
) -> (EnforcementMode, bool) {
    if violations.is_empty() {
        return (EnforcementMode::Advisory, true);
    }

    match policy.enforcement_mode {
        EnforcementMode::Advisory => (EnforcementMode::Advisory, true),
        EnforcementMode::Warning => {
            if has_severity(violations, Severity::Critical) || has_copilot_critical(violations) {
                (EnforcementMode::Warning, true)
            } else {
                (EnforcementMode::Advisory, true)
            }
        }
        EnforcementMode::Blocking => {
            if override_requested && policy.allow_blocking_override {
                return if has_severity(violations, Severity::High)
                    || has_severity(violations, Severity::Critical)
                {
                    (EnforcementMode::Warning, true)
                } else {
                    (EnforcementMode::Advisory, true)
                };
            }
            if has_copilot_critical(violations) {
                (EnforcementMode::Blocking, false)
            } else if has_severity(violations, Severity::Critical) || has_severity(violations, Severity::High) {
                (EnforcementMode::Blocking, false)
            } else {
                (EnforcementMode::Advisory, true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ViolationCategory;

    fn violation(rule_id: &str, severity: Severity, copilot: bool) -> Violation {
        Violation {
            rule_id: rule_id.into(),
            rule_name: rule_id.into(),
            category: ViolationCategory::Security,
            severity,
            file_path: "f.py".into(),
            line_number: 1,
            column_number: None,
            message: String::new(),
            explanation: String::new(),
            fix_suggestion: None,
            standard_mappings: vec![],
            code_snippet: None,
            is_copilot_generated: copilot,
            ai_confidence: None,
        }
    }

    #[test]
    fn filter_drops_below_threshold() {
        let policy = PolicyConfig {
            severity_threshold: Severity::High,
            ..Default::default()
        };
        let violations = vec![
            violation("A", Severity::Low, false),
            violation("B", Severity::High, false),
        ];
        let filtered = filter_violations(violations, &policy);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].rule_id, "B");
    }

    #[test]
    fn filter_respects_enabled_and_disabled_lists() {
        let policy = PolicyConfig {
            enabled_rules: vec!["A".into()],
            disabled_rules: vec![],
            ..Default::default()
        };
        let violations = vec![
            violation("A", Severity::Low, false),
            violation("B", Severity::Low, false),
        ];
        let filtered = filter_violations(violations, &policy);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].rule_id, "A");
    }

    #[test]
    fn severity_monotonicity() {
        let violations = vec![
            violation("A", Severity::Low, false),
            violation("B", Severity::Medium, false),
            violation("C", Severity::High, false),
        ];
        let low_threshold = PolicyConfig { severity_threshold: Severity::Low, ..Default::default() };
        let high_threshold = PolicyConfig { severity_threshold: Severity::High, ..Default::default() };
        let at_low = filter_violations(violations.clone(), &low_threshold);
        let at_high = filter_violations(violations, &high_threshold);
        assert!(at_high.len() <= at_low.len());
    }

    #[test]
    fn empty_violations_is_advisory() {
        let policy = PolicyConfig { enforcement_mode: EnforcementMode::Blocking, ..Default::default() };
        assert_eq!(determine_enforcement(&[], &policy, false), (EnforcementMode::Advisory, true));
    }

    #[test]
    fn blocking_with_critical_blocks() {
        let policy = PolicyConfig { enforcement_mode: EnforcementMode::Blocking, ..Default::default() };
        let violations = vec![violation("A", Severity::Critical, false)];
        assert_eq!(determine_enforcement(&violations, &policy, false), (EnforcementMode::Blocking, false));
    }

    #[test]
    fn blocking_override_downgrades_to_warning_when_high_present() {
        let policy = PolicyConfig {
            enforcement_mode: EnforcementMode::Blocking,
            allow_blocking_override: true,
            ..Default::default()
        };
        let violations = vec![violation("A", Severity::Critical, false)];
        assert_eq!(determine_enforcement(&violations, &policy, true), (EnforcementMode::Warning, true));
    }

    #[test]
    fn blocking_override_disallowed_is_unchanged() {
        let policy = PolicyConfig {
            enforcement_mode: EnforcementMode::Blocking,
            allow_blocking_override: false,
            ..Default::default()
        };
        let violations = vec![violation("A", Severity::Critical, false)];
        assert_eq!(determine_enforcement(&violations, &policy, true), (EnforcementMode::Blocking, false));
    }

    #[test]
    fn copilot_critical_escalates_under_blocking() {
        let policy = PolicyConfig { enforcement_mode: EnforcementMode::Blocking, ..Default::default() };
        let violations = vec![violation("A", Severity::Critical, true)];
        assert_eq!(determine_enforcement(&violations, &policy, false), (EnforcementMode::Blocking, false));
    }

    #[test]
    fn warning_mode_with_only_medium_is_advisory() {
        let policy = PolicyConfig { enforcement_mode: EnforcementMode::Warning, ..Default::default() };
        let violations = vec![violation("A", Severity::Medium, false)];
        assert_eq!(determine_enforcement(&violations, &policy, false), (EnforcementMode::Advisory, true));
    }

    #[test]
    fn apply_rule_pack_is_idempotent() {
        let pack = RulePack {
            name: "pack".into(),
            description: String::new(),
            version: "1".into(),
            rules: vec![crate::model::RuleSpec {
                id: "RP001".into(),
                name: "Forbidden token".into(),
                pattern: "forbidden".into(),
                category: ViolationCategory::Compliance,
                severity: Severity::Medium,
                explanation: String::new(),
                standard_mappings: vec![],
            }],
        };
        let content = "line one\nforbidden here\nline three\nforbidden again\n";
        let first_pass = apply_rule_pack(Some(&pack), "f.py", content, &[]);
        assert_eq!(first_pass.len(), 2);

        let second_pass = apply_rule_pack(Some(&pack), "f.py", content, &first_pass);
        assert!(second_pass.is_empty());
    }

    #[test]
    fn apply_rule_pack_unknown_pack_returns_empty() {
        let result = apply_rule_pack(None, "f.py", "content", &[]);
        assert!(result.is_empty());
    }

    #[test]
    fn get_policy_falls_back_to_defaults_when_no_file() {
        let store = PolicyStore::new(PathBuf::from("/nonexistent/compliance-config"));
        let policy = store.get_policy("org/repo", None);
        assert_eq!(policy.enforcement_mode, EnforcementMode::Warning);
    }

    #[test]
    fn put_policy_then_get_policy_round_trips() {
        let store = PolicyStore::new(PathBuf::from("/nonexistent/compliance-config"));
        let custom = PolicyConfig { enforcement_mode: EnforcementMode::Blocking, ..Default::default() };
        store.put_policy("org/repo", custom);
        let fetched = store.get_policy("org/repo", None);
        assert_eq!(fetched.enforcement_mode, EnforcementMode::Blocking);
    }

    #[test]
    fn org_policy_is_independent_of_repo_policy() {
        let store = PolicyStore::new(PathBuf::from("/nonexistent/compliance-config"));
        store.put_policy("acme/repo", PolicyConfig { enforcement_mode: EnforcementMode::Blocking, ..Default::default() });
        store.put_org_policy("acme", PolicyConfig { enforcement_mode: EnforcementMode::Advisory, ..Default::default() });

        assert_eq!(store.get_policy("acme/repo", None).enforcement_mode, EnforcementMode::Blocking);
        assert_eq!(store.get_org_policy("acme").enforcement_mode, EnforcementMode::Advisory);
    }
}
