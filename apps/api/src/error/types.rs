use serde::Serialize;

/// API error payload.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    required_capabilities: Option<Vec<String>>,
}

impl ErrorResponse {
    pub(super) fn new(message: String, required_capabilities: Option<Vec<String>>) -> Self {
        Self {
            message,
            required_capabilities,
        }
    }
}
