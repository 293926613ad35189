use url::Url;

use crate::KnowledgeFetchError;

/// Builder for search endpoint URLs with properly encoded query parameters.
#[derive(Debug, Clone)]
pub struct SearchURL(Url);

impl AsRef<str> for SearchURL {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl SearchURL {
    pub fn parse(base: &str) -> Result<Self, KnowledgeFetchError> {
        Url::parse(base)
            .map(Self)
            .map_err(|e| KnowledgeFetchError::Other(format!("Invalid base URL '{base}': {e}")))
    }

    /// Append the given path to the URL.
    pub fn append_path(mut self, path: &str) -> Self {
        let trimmed_url = self.0.path().trim_end_matches('/').to_string();
        let trimmed_path = path.trim_start_matches('/');
        self.0.set_path(&format!("{}/{}", trimmed_url, trimmed_path));
        self
    }

    pub fn with_param(mut self, key: &str, value: impl AsRef<str>) -> Self {
        self.0.query_pairs_mut().append_pair(key, value.as_ref());
        self
    }

    pub fn with_optional_param(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.with_param(key, value),
            None => self,
        }
    }
}
