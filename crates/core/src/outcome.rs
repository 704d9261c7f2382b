use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ApplicationError, ErrorCode};

/// Uniform result envelope of every tool. Failures are values, not errors:
/// the HTTP layer returns them with a 200 status.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub error_code: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_data: Option<Value>,
}

impl<T> ToolOutcome<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None, error_code: None, fallback_data: None }
    }

    pub fn failure(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            error_code: Some(code),
            fallback_data: None,
        }
    }

    pub fn from_error(error: &ApplicationError) -> Self {
        Self::failure(error.code(), error.to_string())
    }

    pub fn with_fallback(mut self, fallback: Value) -> Self {
        self.fallback_data = Some(fallback);
        self
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ToolOutcome<U> {
        ToolOutcome {
            success: self.success,
            data: self.data.map(f),
            error: self.error,
            error_code: self.error_code,
            fallback_data: self.fallback_data,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::ToolOutcome;
    use crate::errors::{ApplicationError, ErrorCode};

    #[test]
    fn failure_serializes_without_data() {
        let outcome: ToolOutcome<u8> =
            ToolOutcome::from_error(&ApplicationError::Network("timed out".to_string()));
        let encoded = serde_json::to_value(&outcome).expect("encode");
        assert_eq!(
            encoded,
            json!({
                "success": false,
                "data": null,
                "error": "network failure: timed out",
                "error_code": "NETWORK_ERROR"
            })
        );
    }

    #[test]
    fn fallback_is_only_emitted_when_present() {
        let outcome: ToolOutcome<u8> =
            ToolOutcome::failure(ErrorCode::ApiFailure, "bad json").with_fallback(json!([]));
        let encoded = serde_json::to_value(&outcome).expect("encode");
        assert_eq!(encoded["fallback_data"], json!([]));

        let ok = serde_json::to_value(ToolOutcome::ok(3u8)).expect("encode");
        assert!(ok.get("fallback_data").is_none());
        assert_eq!(ok["data"], json!(3));
    }
}
