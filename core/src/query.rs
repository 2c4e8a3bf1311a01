//! Caller-side description of an API call: endpoint path plus parameters.

use url::Url;

use crate::error::ApiError;

/// Endpoint path and ordered query parameters.
///
/// Queries are owned by the caller and only borrowed while a request is
/// built; the service keeps nothing from them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    path: String,
    params: Vec<(String, String)>,
}

impl Query {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// 1-based offset into a feed.
    pub fn start_index(self, index: u32) -> Self {
        self.param("start-index", index)
    }

    pub fn max_results(self, count: u32) -> Self {
        self.param("max-results", count)
    }

    /// Response representation requested from the server, e.g. `json`.
    pub fn alt(self, format: &str) -> Self {
        self.param("alt", format)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Absolute URL for this query under `base`, with parameters encoded.
    pub fn url(&self, base: &str) -> Result<String, ApiError> {
        let joined = format!(
            "{}/{}",
            base.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        );
        let mut url = Url::parse(&joined).map_err(|e| ApiError::InvalidUrl(format!("{joined}: {e}")))?;
        if !self.params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_path_with_single_slash() {
        let q = Query::new("/entries");
        assert_eq!(q.url("http://localhost:3000/").unwrap(), "http://localhost:3000/entries");
        let q = Query::new("entries");
        assert_eq!(q.url("http://localhost:3000").unwrap(), "http://localhost:3000/entries");
    }

    #[test]
    fn params_keep_insertion_order() {
        let q = Query::new("/people/@me/miniblog").start_index(1).max_results(20).alt("json");
        assert_eq!(
            q.url("http://api.example.com").unwrap(),
            "http://api.example.com/people/@me/miniblog?start-index=1&max-results=20&alt=json"
        );
    }

    #[test]
    fn param_values_are_encoded() {
        let q = Query::new("/search").param("q", "rust & c");
        assert_eq!(q.url("http://api.example.com").unwrap(), "http://api.example.com/search?q=rust+%26+c");
    }

    #[test]
    fn invalid_base_is_rejected() {
        let err = Query::new("/entries").url("not a url").unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }
}
