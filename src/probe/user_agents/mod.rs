//! Browser header profile attached to every probe request.
//!
//! Storefronts behind bot filters answer non-browser clients with 403/406, so
//! the probe always presents itself as a desktop Chrome. The user agent can be
//! overridden from configuration; the remaining headers stay fixed.

use std::collections::HashMap;

use http::header::{HeaderMap, HeaderName, HeaderValue};

/// Desktop Chrome on Windows.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Headers sent with each probe.
#[derive(Debug, Clone)]
pub struct UserAgentProfile {
    pub headers: HashMap<String, String>,
}

impl UserAgentProfile {
    /// Desktop browser profile, optionally with a custom user agent.
    pub fn desktop(custom: Option<&str>) -> Self {
        let user_agent = custom
            .map(str::trim)
            .filter(|ua| !ua.is_empty())
            .unwrap_or(DEFAULT_USER_AGENT);
        Self {
            headers: default_headers(user_agent),
        }
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.headers.get("User-Agent").map(String::as_str)
    }

    /// Convert into a typed header map for the HTTP client.
    pub fn to_header_map(&self) -> Result<HeaderMap, UserAgentError> {
        let mut map = HeaderMap::new();
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| UserAgentError::InvalidHeader(name.clone()))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| UserAgentError::InvalidHeader(name.clone()))?;
            map.insert(header_name, header_value);
        }
        Ok(map)
    }
}

impl Default for UserAgentProfile {
    fn default() -> Self {
        Self::desktop(None)
    }
}

// Accept-Encoding is left to reqwest so it keeps decompressing bodies.
fn default_headers(user_agent: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    map.insert("User-Agent".into(), user_agent.to_string());
    map.insert(
        "Accept".into(),
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8"
            .into(),
    );
    map.insert("Accept-Language".into(), "en-US,en;q=0.9".into());
    map
}

#[derive(Debug, thiserror::Error)]
pub enum UserAgentError {
    #[error("header '{0}' has an invalid value")]
    InvalidHeader(String),
}
