use serde::{Deserialize, Serialize};

/// Standard response envelope wrapping every gateway API result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    /// Whether the call succeeded
    #[serde(default)]
    pub success: bool,

    /// Error entries reported by the API
    #[serde(default)]
    pub errors: Vec<ApiMessage>,

    /// Informational messages
    #[serde(default)]
    pub messages: Vec<ApiMessage>,

    /// The payload; `null` or absent for empty collections and deletes
    pub result: Option<T>,

    /// Pagination details for collection endpoints
    #[serde(default)]
    pub result_info: Option<ResultInfo>,
}

impl<T> ApiEnvelope<T> {
    /// Joined error messages, or `None` if the API reported none
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        Some(
            self.errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// An error or informational message from the API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiMessage {
    /// Numeric API error code
    #[serde(default)]
    pub code: i64,

    /// Human-readable message
    #[serde(default)]
    pub message: String,
}

impl std::fmt::Display for ApiMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

/// Pagination info for collection responses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultInfo {
    /// Current page (1-indexed)
    #[serde(default)]
    pub page: Option<u32>,

    /// Page size used by the server
    #[serde(default)]
    pub per_page: Option<u32>,

    /// Items in this page
    #[serde(default)]
    pub count: Option<u32>,

    /// Total items across all pages
    #[serde(default)]
    pub total_count: Option<u32>,
}
