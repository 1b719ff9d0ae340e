// The host framework's services the backend talks to.
use std::fmt;
use std::sync::Arc;

use crate::app::App;
use crate::cache::{CacheBackend, LocMemCache};
use crate::config::Settings;
use crate::i18n::{NullTranslations, Translations};
use crate::library::Library;
use crate::plugins::Plugins;
use crate::staticfiles::{StaticFilesStorage, StaticStorage};
use crate::urls::{UrlConf, UrlResolver};

/// Installed apps plus the URL, static files, cache and translation services.
///
/// [`Host::new`] fills every service with the in-crate default so the
/// backend works on its own; swap them out with the `with_*` methods.
#[derive(Clone)]
pub struct Host {
    pub apps: Vec<Arc<dyn App>>,
    pub urls: Arc<dyn UrlResolver>,
    pub static_storage: Arc<dyn StaticStorage>,
    pub cache: Arc<dyn CacheBackend>,
    pub translations: Arc<dyn Translations>,
    pub plugins: Plugins,
}

impl Host {
    pub fn new(settings: &Settings) -> Self {
        Self {
            apps: Vec::new(),
            urls: Arc::new(UrlConf::new()),
            static_storage: Arc::new(StaticFilesStorage::new(settings.static_url.clone())),
            cache: Arc::new(LocMemCache::new()),
            translations: Arc::new(NullTranslations),
            plugins: Plugins::with_builtins(),
        }
    }

    pub fn with_app<A: App + 'static>(mut self, app: A) -> Self {
        self.apps.push(Arc::new(app));
        self
    }

    pub fn with_urls<U: UrlResolver + 'static>(mut self, urls: U) -> Self {
        self.urls = Arc::new(urls);
        self
    }

    pub fn with_static_storage<S: StaticStorage + 'static>(mut self, storage: S) -> Self {
        self.static_storage = Arc::new(storage);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheBackend>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_translations<T: Translations + 'static>(mut self, translations: T) -> Self {
        self.translations = Arc::new(translations);
        self
    }

    pub fn with_plugins(mut self, plugins: Plugins) -> Self {
        self.plugins = plugins;
        self
    }

    /// The template library of every installed app.
    pub fn library(&self) -> Library {
        Library::discover(&self.apps)
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Host")
            .field("apps", &self.apps.iter().map(|a| a.name()).collect::<Vec<_>>())
            .field("plugins", &self.plugins)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppConfig;

    #[test]
    fn defaults_follow_the_settings() {
        let settings = Settings { static_url: "/assets/".to_string(), ..Settings::default() };
        let host = Host::new(&settings).with_app(AppConfig::new("blog", "blog"));
        assert_eq!(host.static_storage.url("css/site.css"), "/assets/css/site.css");
        assert_eq!(host.apps.len(), 1);
        assert!(host.library().is_empty());
    }
}
