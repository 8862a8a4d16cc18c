//! Analysis engines: each takes file content and produces
//! `Violation`s independently of the others.

pub mod ai_analyzer;
pub mod coding_standards;
pub mod copilot_detector;
pub mod duplicate_detector;
pub mod license_checker;
pub mod static_analyzer;
