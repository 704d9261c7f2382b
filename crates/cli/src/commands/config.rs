use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use horizon_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

/// One printed setting: dotted key, display value and the env var that can
/// override it.
struct Setting {
    key: &'static str,
    value: String,
    env_key: &'static str,
}

impl Setting {
    fn new(key: &'static str, value: impl Into<String>, env_key: &'static str) -> Self {
        Self { key, value: value.into(), env_key }
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for setting in settings(&config) {
        let source = field_source(
            setting.key,
            setting.env_key,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(format!("- {} = {} (source: {source})", setting.key, setting.value));
    }
    lines.join("\n")
}

fn settings(config: &AppConfig) -> Vec<Setting> {
    let api_key = match &config.llm.api_key {
        Some(key) => redact_secret(key.expose_secret()),
        None => "<unset>".to_string(),
    };

    vec![
        Setting::new("database.url", &config.database.url, "HORIZON_DATABASE_URL"),
        Setting::new(
            "database.max_connections",
            config.database.max_connections.to_string(),
            "HORIZON_DATABASE_MAX_CONNECTIONS",
        ),
        Setting::new(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            "HORIZON_DATABASE_TIMEOUT_SECS",
        ),
        Setting::new("llm.provider", format!("{:?}", config.llm.provider), "HORIZON_LLM_PROVIDER"),
        Setting::new("llm.model", &config.llm.model, "HORIZON_LLM_MODEL"),
        Setting::new("llm.base_url", &config.llm.base_url, "HORIZON_LLM_BASE_URL"),
        Setting::new("llm.api_key", api_key, "HORIZON_LLM_API_KEY"),
        Setting::new(
            "llm.timeout_secs",
            config.llm.timeout_secs.to_string(),
            "HORIZON_LLM_TIMEOUT_SECS",
        ),
        Setting::new(
            "auth.jwt_secret",
            redact_secret(config.auth.jwt_secret.expose_secret()),
            "HORIZON_JWT_SECRET",
        ),
        Setting::new("auth.jwt_algorithm", &config.auth.jwt_algorithm, "HORIZON_JWT_ALGORITHM"),
        Setting::new(
            "auth.jwt_expiration_hours",
            config.auth.jwt_expiration_hours.to_string(),
            "HORIZON_JWT_EXPIRATION_HOURS",
        ),
        Setting::new(
            "server.bind_address",
            &config.server.bind_address,
            "HORIZON_SERVER_BIND_ADDRESS",
        ),
        Setting::new("server.port", config.server.port.to_string(), "HORIZON_SERVER_PORT"),
        Setting::new(
            "server.allowed_origins",
            config.server.allowed_origins.join(","),
            "HORIZON_ALLOWED_ORIGINS",
        ),
        Setting::new(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            "HORIZON_SERVER_GRACEFUL_SHUTDOWN_SECS",
        ),
        Setting::new(
            "retention.partner_search_days",
            config.retention.partner_search_days.to_string(),
            "HORIZON_RETENTION_PARTNER_SEARCH_DAYS",
        ),
        Setting::new(
            "retention.session_days",
            config.retention.session_days.to_string(),
            "HORIZON_RETENTION_SESSION_DAYS",
        ),
        Setting::new("logging.level", &config.logging.level, "HORIZON_LOGGING_LEVEL"),
        Setting::new(
            "logging.format",
            format!("{:?}", config.logging.format),
            "HORIZON_LOGGING_FORMAT",
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("horizon.toml"), PathBuf::from("config/horizon.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

/// Keeps the first four characters of long secrets so operators can tell
/// keys apart.
fn redact_secret(secret: &str) -> String {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }
    if trimmed.chars().count() < 12 {
        return "<redacted>".to_string();
    }
    let prefix: String = trimmed.chars().take(4).collect();
    format!("{prefix}***")
}

#[cfg(test)]
mod tests {
    use super::{contains_path, redact_secret};

    #[test]
    fn secrets_are_never_printed_in_full() {
        assert_eq!(redact_secret("  "), "<empty>");
        assert_eq!(redact_secret("short"), "<redacted>");
        assert_eq!(redact_secret("sk-live-0123456789"), "sk-l***");
    }

    #[test]
    fn dotted_paths_resolve_against_the_toml_document() {
        let doc: toml::Value = "[llm]\nmodel = \"gpt-4o\"\n".parse().expect("toml");
        assert!(contains_path(&doc, "llm.model"));
        assert!(!contains_path(&doc, "llm.base_url"));
        assert!(!contains_path(&doc, "server.port"));
    }
}
