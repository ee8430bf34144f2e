//! `health/check` result. The wire carries `uptimeSeconds`; the domain type
//! exposes `uptime` as a `Duration` so callers don't re-derive it themselves.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerHealth {
    #[serde(rename = "isRunning")]
    pub is_running: bool,
    #[serde(rename = "connectedSessions")]
    pub connected_sessions: u64,
    #[serde(rename = "registeredTools")]
    pub registered_tools: u64,
    #[serde(rename = "registeredResources")]
    pub registered_resources: u64,
    #[serde(rename = "registeredPrompts")]
    pub registered_prompts: u64,
    #[serde(rename = "startTime")]
    pub start_time: String,
    #[serde(rename = "uptimeSeconds", serialize_with = "serialize_uptime", deserialize_with = "deserialize_uptime")]
    pub uptime: Duration,
    pub metrics: Value,
}

fn serialize_uptime<S>(uptime: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(uptime.as_secs_f64())
}

fn deserialize_uptime<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let seconds = f64::deserialize(deserializer)?;
    Ok(Duration::from_secs_f64(seconds.max(0.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ServerHealth {
        ServerHealth {
            is_running: true,
            connected_sessions: 2,
            registered_tools: 5,
            registered_resources: 1,
            registered_prompts: 0,
            start_time: "2026-07-31T00:00:00Z".to_string(),
            uptime: Duration::from_secs(3661),
            metrics: json!({"requests": 42}),
        }
    }

    #[test]
    fn decodes_uptime_seconds_into_duration() {
        let raw = json!({
            "isRunning": true,
            "connectedSessions": 2,
            "registeredTools": 5,
            "registeredResources": 1,
            "registeredPrompts": 0,
            "startTime": "2026-07-31T00:00:00Z",
            "uptimeSeconds": 3661.0,
            "metrics": {"requests": 42}
        });
        let health: ServerHealth = serde_json::from_value(raw).unwrap();
        assert_eq!(health.uptime, Duration::from_secs(3661));
    }

    #[test]
    fn round_trips_server_health() {
        let health = sample();
        let encoded = serde_json::to_value(&health).unwrap();
        assert!(encoded.get("uptimeSeconds").is_some());
        let decoded: ServerHealth = serde_json::from_value(encoded).unwrap();
        assert_eq!(health, decoded);
    }
}
