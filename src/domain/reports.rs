use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-kind result of a fan-out fetch. Failures are data here, not errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FetchOutcome {
    pub fn success(data: Value) -> Self {
        let count = data.as_array().map(Vec::len);
        Self {
            success: true,
            data: Some(data),
            count,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            count: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Reachability of the upstream API as observed by a minimal list request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: HealthStatus,
    pub response_time_ms: u64,
    /// HTTP status of the check request; 0 when no response was received.
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_counts_array_payloads() {
        let outcome = FetchOutcome::success(json!([{"id": "a"}, {"id": "b"}]));
        assert!(outcome.success);
        assert_eq!(outcome.count, Some(2));

        let object = FetchOutcome::success(json!({"id": "a"}));
        assert_eq!(object.count, None);
    }

    #[test]
    fn test_health_report_serializes_lowercase_status() {
        let report = HealthReport {
            status: HealthStatus::Unhealthy,
            response_time_ms: 12,
            status_code: 500,
            error: Some("boom".to_string()),
            checked_at: Utc::now(),
        };

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["status"], "unhealthy");
        assert_eq!(value["statusCode"], 500);
        assert_eq!(value["responseTimeMs"], 12);
    }

    #[test]
    fn test_failure_omits_data() {
        let value = serde_json::to_value(FetchOutcome::failure("nope")).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "nope");
        assert!(value.get("data").is_none());
    }
}
