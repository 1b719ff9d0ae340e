// Static file URLs for the `static` global and filter.

/// Maps a static file path to the URL it is served from.
pub trait StaticStorage: Send + Sync {
    fn url(&self, path: &str) -> String;
}

/// Serves every static file under one base URL, like Django's
/// `StaticFilesStorage` with `STATIC_URL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFilesStorage {
    base_url: String,
}

impl StaticFilesStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into() }
    }
}

impl Default for StaticFilesStorage {
    fn default() -> Self {
        Self::new("/static/")
    }
}

impl StaticStorage for StaticFilesStorage {
    fn url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, crate::utils::urlquote(path))
    }
}
