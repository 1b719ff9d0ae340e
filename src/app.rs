// Installed components.
use std::path::{Path, PathBuf};

use crate::library::Library;

pub trait App: Send + Sync {
    fn name(&self) -> &str;

    /// Root directory of the app.
    fn path(&self) -> &Path;

    fn template_dir(&self) -> PathBuf {
        self.path().join("templates")
    }

    /// Adds the app's template helpers. Apps without any keep the default.
    fn register(&self, _library: &mut Library) {}
}

/// An app that only contributes templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    name: String,
    path: PathBuf,
}

impl AppConfig {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self { name: name.into(), path: path.into() }
    }
}

impl App for AppConfig {
    fn name(&self) -> &str {
        &self.name
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_dir_is_under_the_app() {
        let app = AppConfig::new("blog", "/srv/site/blog");
        assert_eq!(app.name(), "blog");
        assert_eq!(app.template_dir(), PathBuf::from("/srv/site/blog/templates"));
    }
}
