use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use compliance_core::{PolicyConfig, RulePack};

use super::AppState;
use crate::error::AppError;

pub async fn get_repo_policy(
    State(state): State<AppState>,
    Path(repository): Path<String>,
) -> Json<PolicyConfig> {
    let repository = super::normalize_repository(&repository);
    Json(state.policy_store.get_policy(&repository, None))
}

pub async fn put_repo_policy(
    State(state): State<AppState>,
    Path(repository): Path<String>,
    Json(policy): Json<PolicyConfig>,
) -> Json<PolicyConfig> {
    let repository = super::normalize_repository(&repository);
    state.policy_store.put_policy(&repository, policy.clone());
    Json(policy)
}

pub async fn get_org_policy(State(state): State<AppState>, Path(org): Path<String>) -> Json<PolicyConfig> {
    Json(state.policy_store.get_org_policy(&org))
}

pub async fn put_org_policy(
    State(state): State<AppState>,
    Path(org): Path<String>,
    Json(policy): Json<PolicyConfig>,
) -> Json<PolicyConfig> {
    state.policy_store.put_org_policy(&org, policy.clone());
    Json(policy)
}

#[derive(Debug, Serialize)]
pub struct RulePackSummary {
    pub name: String,
    pub description: String,
    pub rules_count: usize,
    pub version: String,
}

pub async fn list_rule_packs(State(state): State<AppState>) -> Json<Vec<RulePackSummary>> {
    let summaries = state
        .policy_store
        .list_rule_packs()
        .into_iter()
        .map(|p| RulePackSummary {
            name: p.name,
            description: p.description,
            rules_count: p.rules.len(),
            version: p.version,
        })
        .collect();
    Json(summaries)
}

#[derive(Debug, Deserialize)]
pub struct RulePackUpload {
    pub pack_name: String,
    pub pack_data: String,
}

#[derive(Debug, Serialize)]
pub struct UploadStatus {
    pub status: String,
    pub pack_name: String,
    pub rules_count: usize,
}

pub async fn upload_rule_pack(
    State(state): State<AppState>,
    Json(upload): Json<RulePackUpload>,
) -> Result<Json<UploadStatus>, AppError> {
    let pack: RulePack = serde_yml::from_str(&upload.pack_data)?;
    let rules_count = pack.rules.len();
    state.policy_store.install_rule_pack(upload.pack_name.clone(), pack);
    Ok(Json(UploadStatus {
        status: "installed".to_string(),
        pack_name: upload.pack_name,
        rules_count,
    }))
}
