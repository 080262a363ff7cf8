//! API endpoint paths

/// Endpoint builder rooted at a versioned API base URL
#[derive(Debug, Clone)]
pub struct Endpoints {
    base_url: String,
}

impl Endpoints {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `GET /gateway` (no credential)
    #[must_use]
    pub fn gateway(&self) -> String {
        format!("{}/gateway", self.base_url)
    }

    /// `GET /gateway/bot` (bot credential)
    #[must_use]
    pub fn gateway_bot(&self) -> String {
        format!("{}/gateway/bot", self.base_url)
    }
}
