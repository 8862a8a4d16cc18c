//! Core scanning library: data model, analysis engines, policy resolution,
//! and the scan orchestrator. Consumed by `compliance-server` and usable
//! standalone (e.g. from a CLI or CI job).

pub mod engines;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod policy;

pub use error::{ScanError, ScanOutcome};
pub use model::{
    AuditLog, EnforcementMode, FileInput, PolicyConfig, PolicyOverride, RulePack, RuleSpec,
    ScanRequest, ScanResult, ScanSummary, Severity, Violation, ViolationCategory,
};
pub use orchestrator::Orchestrator;
