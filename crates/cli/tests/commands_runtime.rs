use std::env;
use std::io::Cursor;
use std::sync::{Arc, Mutex, OnceLock};

use horizon_agent::{AgentRuntime, ScriptedLlmClient};
use horizon_cli::commands::menu::MenuSession;
use horizon_cli::commands::{config, doctor, migrate, prune, seed};
use horizon_db::Repositories;
use serde_json::Value;

const VALID_ENV: &[(&str, &str)] = &[
    ("HORIZON_LLM_API_KEY", "sk-test-key-0123456789"),
    ("HORIZON_JWT_SECRET", "cli-test-secret"),
    ("HORIZON_DATABASE_URL", "sqlite::memory:"),
];

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(VALID_ENV, || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_without_secrets() {
    with_env(&[("HORIZON_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_reports_catalog_sizes_and_is_repeatable() {
    with_env(VALID_ENV, || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        let first_payload = parse_payload(&first.output);
        assert_eq!(first_payload["command"], "seed");
        assert_eq!(first_payload["status"], "ok");
        let message = first_payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("partner organizations"));
        assert!(message.contains("knowledge entries"));

        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");
        assert_eq!(first_payload["message"], parse_payload(&second.output)["message"]);
    });
}

#[test]
fn prune_on_an_empty_database_deletes_nothing() {
    with_env(VALID_ENV, || {
        let result = prune::run();
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "prune");
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.starts_with("pruned 0 partner searches older than 30 days"));
    });
}

#[test]
fn config_redacts_secrets_and_attributes_sources() {
    with_env(VALID_ENV, || {
        let output = config::run();

        assert!(output.contains("- database.url = sqlite::memory: (source: env (HORIZON_DATABASE_URL))"));
        assert!(output.contains("- llm.api_key = sk-t*** (source: env (HORIZON_LLM_API_KEY))"));
        assert!(output.contains("- auth.jwt_secret = cli-***"));
        assert!(!output.contains("cli-test-secret"));
        assert!(output.contains("- server.port = 8000 (source: default)"));
    });
}

#[test]
fn doctor_json_passes_with_valid_env() {
    with_env(VALID_ENV, || {
        let report: Value =
            serde_json::from_str(&doctor::run(true)).expect("doctor output should be JSON");

        assert_eq!(report["overall_status"], "pass");
        let names: Vec<&str> =
            report["checks"].as_array().expect("checks").iter().filter_map(|c| c["name"].as_str()).collect();
        assert_eq!(names, ["config_validation", "llm_settings", "database_connectivity"]);
    });
}

#[test]
fn doctor_skips_dependent_checks_when_config_fails() {
    with_env(&[], || {
        let report: Value =
            serde_json::from_str(&doctor::run(true)).expect("doctor output should be JSON");

        assert_eq!(report["overall_status"], "fail");
        assert_eq!(report["checks"][0]["status"], "fail");
        assert_eq!(report["checks"][1]["status"], "skipped");
        assert_eq!(report["checks"][2]["status"], "skipped");

        assert!(doctor::run(false).contains("- [skip] database_connectivity"));
    });
}

#[tokio::test]
async fn menu_session_runs_partner_search_and_chat_in_process() {
    let llm = Arc::new(ScriptedLlmClient::with_reply("Consider a youth exchange in Spain."));
    let runtime = AgentRuntime::new(llm.clone(), Repositories::in_memory()).expect("runtime");
    let script = "2\ndigital inclusion\nGermany, Spain\n\n4\n2\nWho should we invite?\nquit\n5\n9\n6\n";

    let mut session =
        MenuSession::new(&runtime, "cli-user", Cursor::new(script.as_bytes()), Vec::new());
    session.run().await.expect("menu session");
    let output = String::from_utf8(session.into_output()).expect("utf8");

    assert!(output.contains("potential partners:"));
    assert!(!output.contains("(Finland,"));
    assert!(output.contains("Connected to the planning assistant"));
    assert!(output.contains("Assistant: Consider a youth exchange in Spain."));
    assert!(output.contains("Focus areas: Digital Transformation"));
    assert!(output.contains("Unknown option `9`"));
    assert!(output.trim_end().ends_with("Goodbye."));

    let sent = llm.requests().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].user, "Who should we invite?");
}

#[tokio::test]
async fn menu_stops_cleanly_when_input_ends() {
    let runtime =
        AgentRuntime::new(Arc::new(ScriptedLlmClient::new()), Repositories::in_memory()).expect("runtime");

    let mut session = MenuSession::new(&runtime, "cli-user", Cursor::new("1\n\n".as_bytes()), Vec::new());
    session.run().await.expect("menu session");
    let output = String::from_utf8(session.into_output()).expect("utf8");

    assert!(output.contains("Please provide an initial concept to get started."));
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "HORIZON_DATABASE_URL",
        "HORIZON_DATABASE_MAX_CONNECTIONS",
        "HORIZON_DATABASE_TIMEOUT_SECS",
        "HORIZON_LLM_PROVIDER",
        "HORIZON_LLM_API_KEY",
        "HORIZON_LLM_BASE_URL",
        "HORIZON_LLM_MODEL",
        "HORIZON_LLM_TIMEOUT_SECS",
        "HORIZON_JWT_SECRET",
        "HORIZON_JWT_ALGORITHM",
        "HORIZON_JWT_EXPIRATION_HOURS",
        "HORIZON_SERVER_BIND_ADDRESS",
        "HORIZON_SERVER_PORT",
        "HORIZON_ALLOWED_ORIGINS",
        "HORIZON_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "HORIZON_RETENTION_PARTNER_SEARCH_DAYS",
        "HORIZON_RETENTION_SESSION_DAYS",
        "HORIZON_LOGGING_LEVEL",
        "HORIZON_LOGGING_FORMAT",
        "HORIZON_LOG_LEVEL",
        "HORIZON_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
