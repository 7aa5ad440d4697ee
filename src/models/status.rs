use serde::{Deserialize, Serialize};

/// Body of every status reply: exactly one of `error` or `success` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<String>,
}

impl StatusMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            success: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            error: None,
            success: Some(message.into()),
        }
    }
}
