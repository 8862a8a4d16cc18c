mod health;
mod policies;
mod scan;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;

use compliance_core::Orchestrator;
use compliance_core::policy::PolicyStore;

use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub policy_store: Arc<PolicyStore>,
    pub config: ServerConfig,
}

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/scan/", post(scan::scan))
        .route("/scan/pr/{owner}/{repo}/{pr}", post(scan::scan_pr_not_implemented))
        .route("/scan/commit/{owner}/{repo}/{sha}", post(scan::scan_commit_not_implemented))
        .route("/policies/rule-packs", get(policies::list_rule_packs))
        .route("/policies/rule-packs/upload", post(policies::upload_rule_pack))
        .route("/policies/organizations/{org}", get(policies::get_org_policy).put(policies::put_org_policy))
        .route("/policies/{*repository}", get(policies::get_repo_policy).put(policies::put_repo_policy));

    Router::new()
        .nest("/api/v1", api)
        .route("/health", get(health::health))
        .with_state(state)
}

/// Normalize a repository identifier that may arrive as `owner/name` or as
/// a URL: strip scheme, strip a leading `github.com/`, keep the last two
/// path segments.
pub fn normalize_repository(raw: &str) -> String {
    let without_scheme = raw
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let without_host = without_scheme
        .strip_prefix("github.com/")
        .unwrap_or(without_scheme);
    let segments: Vec<&str> = without_host.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() >= 2 {
        let n = segments.len();
        format!("{}/{}", segments[n - 2], segments[n - 1])
    } else {
        without_host.trim_matches('/').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_through_owner_name() {
        assert_eq!(normalize_repository("acme/widgets"), "acme/widgets");
    }

    #[test]
    fn strips_scheme_and_host() {
        assert_eq!(normalize_repository("https://github.com/acme/widgets"), "acme/widgets");
    }

    #[test]
    fn strips_trailing_slash_and_extra_segments() {
        assert_eq!(normalize_repository("http://github.com/acme/widgets/"), "acme/widgets");
    }
}
