//! Capability API client configuration.

/// Default base URL of the capability API.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:3100/api";

/// Configuration for talking to the capability API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL the `capability/...` paths are appended to.
    pub base_url: String,
    /// Bearer token sent with every request, when set.
    pub token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            token: None,
        }
    }
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable         | Default                      |
    /// |------------------|------------------------------|
    /// | `CAPA_API_URL`   | `http://127.0.0.1:3100/api`  |
    /// | `CAPA_API_TOKEN` | none                         |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            base_url: lookup("CAPA_API_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            token: lookup("CAPA_API_TOKEN").filter(|v| !v.trim().is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        let config = ApiConfig::from_lookup(|_| None);
        assert_eq!(config, ApiConfig::default());
    }

    #[test]
    fn values_come_from_lookup() {
        let config = ApiConfig::from_lookup(|key| match key {
            "CAPA_API_URL" => Some("https://capa.example.com/api".into()),
            "CAPA_API_TOKEN" => Some("tok".into()),
            _ => None,
        });
        assert_eq!(config.base_url, "https://capa.example.com/api");
        assert_eq!(config.token.as_deref(), Some("tok"));
    }

    #[test]
    fn blank_values_are_ignored() {
        let config = ApiConfig::from_lookup(|_| Some("  ".into()));
        assert_eq!(config, ApiConfig::default());
    }
}
