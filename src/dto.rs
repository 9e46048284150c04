use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Body of `POST /send`. Every field is optional at the wire level so that
/// a partial body still decodes and is rejected by validation instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionRequest {
    #[serde(deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub email: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub phone: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub remark: Option<String>,
}

/// Accepts strings, numbers and booleans as text. `false`, zero, `null`,
/// arrays and objects count as not supplied.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) if n.as_f64().is_some_and(|f| f != 0.0) => Some(n.to_string()),
        Some(Value::Bool(true)) => Some("true".to_string()),
        _ => None,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendResponse {
    pub fn sent(message_id: String) -> Self {
        Self {
            success: true,
            message: "Email sent successfully".to_string(),
            message_id: Some(message_id),
            error: None,
        }
    }

    pub fn rejected(message: String) -> Self {
        Self {
            success: false,
            message,
            message_id: None,
            error: None,
        }
    }

    pub fn failed(error: String) -> Self {
        Self {
            success: false,
            message: "Email sending failed".to_string(),
            message_id: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            message: "Service is running".to_string(),
        }
    }
}
