use std::path::PathBuf;

/// Server configuration loaded from environment variables.
///
/// Only `gemini_api_key`, `data_residency_region`, and
/// `enable_code_retention` affect `compliance-core` behavior; the rest are
/// recognized and stored for out-of-scope collaborators (GitHub app auth,
/// database/redis-backed audit persistence) that this crate does not
/// implement.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub gemini_api_key: Option<String>,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub github_app_id: Option<String>,
    pub github_app_private_key_path: Option<PathBuf>,
    pub github_webhook_secret: Option<String>,
    pub secret_key: Option<String>,
    pub allowed_origins: Vec<String>,
    pub data_residency_region: String,
    pub enable_code_retention: bool,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub audit_log_file: Option<PathBuf>,
    pub config_dir: PathBuf,
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| v != "0" && v.to_lowercase() != "false")
        .unwrap_or(default)
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            debug: env_flag("DEBUG", false),
            gemini_api_key: std::env::var("GEMINI_API_KEY").ok(),
            database_url: std::env::var("DATABASE_URL").ok(),
            redis_url: std::env::var("REDIS_URL").ok(),
            github_app_id: std::env::var("GITHUB_APP_ID").ok(),
            github_app_private_key_path: std::env::var("GITHUB_APP_PRIVATE_KEY_PATH").ok().map(PathBuf::from),
            github_webhook_secret: std::env::var("GITHUB_WEBHOOK_SECRET").ok(),
            secret_key: std::env::var("SECRET_KEY").ok(),
            allowed_origins: std::env::var("ALLOWED_ORIGINS")
                .map(|s| s.split(',').map(|o| o.trim().to_string()).collect())
                .unwrap_or_else(|_| vec!["http://localhost:3000".into()]),
            data_residency_region: std::env::var("DATA_RESIDENCY_REGION").unwrap_or_else(|_| "us".into()),
            enable_code_retention: env_flag("ENABLE_CODE_RETENTION", false),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_file: std::env::var("LOG_FILE").ok().map(PathBuf::from),
            audit_log_file: std::env::var("AUDIT_LOG_FILE").ok().map(PathBuf::from),
            config_dir: std::env::var("COMPLIANCE_CONFIG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("config")),
        }
    }
}
