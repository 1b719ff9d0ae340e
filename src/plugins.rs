// Named plugins the settings can refer to.
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::builtins::filters::{common, html, number, string, Escaping, Filter, KeepSafe, Safe};
use crate::builtins::functions::{self, Function};
use crate::builtins::testers::{self, Test};
use crate::config::Settings;
use crate::errors::{Error, Result};
use crate::extensions::{
    CacheExtension, CsrfExtension, DjangoExtraFiltersExtension, DjangoFiltersExtension, Extension,
    I18nExtension, StaticFilesExtension, TimezoneExtension, UrlsExtension,
};
use crate::processors::{
    ContextProcessor, CsrfProcessor, DebugProcessor, I18nProcessor, MediaProcessor, RequestProcessor,
    StaticProcessor, TzProcessor,
};

/// Builds a context processor from the host settings.
pub type ProcessorFactory = dyn Fn(&Settings) -> Arc<dyn ContextProcessor> + Send + Sync;

#[derive(Clone, Default)]
pub struct Plugins {
    filters: HashMap<String, Arc<dyn Filter>>,
    tests: HashMap<String, Arc<dyn Test>>,
    functions: HashMap<String, Arc<dyn Function>>,
    processors: HashMap<String, Arc<ProcessorFactory>>,
    extensions: HashMap<String, Arc<dyn Extension>>,
}

fn unknown(kind: &str, name: &str) -> Error {
    Error::improperly_configured(format!("Unknown {} `{}`", kind, name))
}

impl Plugins {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every extension, context processor, filter, test and
    /// function this crate ships.
    pub fn with_builtins() -> Self {
        let mut plugins = Self::new();
        plugins.register_builtin_extensions();
        plugins.register_builtin_processors();
        plugins.register_builtin_helpers();
        plugins
    }

    fn register_builtin_extensions(&mut self) {
        let builtins: [(&str, &str, Arc<dyn Extension>); 8] = [
            ("i18n", "jinja2.ext.i18n", Arc::new(I18nExtension)),
            ("csrf", "django_jinja.builtins.extensions.CsrfExtension", Arc::new(CsrfExtension)),
            ("cache", "django_jinja.builtins.extensions.CacheExtension", Arc::new(CacheExtension)),
            ("timezone", "django_jinja.builtins.extensions.TimezoneExtension", Arc::new(TimezoneExtension)),
            ("urls", "django_jinja.builtins.extensions.UrlsExtension", Arc::new(UrlsExtension)),
            (
                "staticfiles",
                "django_jinja.builtins.extensions.StaticFilesExtension",
                Arc::new(StaticFilesExtension),
            ),
            (
                "django_filters",
                "django_jinja.builtins.extensions.DjangoFiltersExtension",
                Arc::new(DjangoFiltersExtension),
            ),
            (
                "django_extra_filters",
                "django_jinja.builtins.extensions.DjangoExtraFiltersExtension",
                Arc::new(DjangoExtraFiltersExtension),
            ),
        ];
        for (name, path, extension) in builtins {
            self.extensions.insert(name.to_string(), extension.clone());
            self.extensions.insert(path.to_string(), extension);
        }
    }

    fn register_builtin_processors(&mut self) {
        const PREFIX: &str = "django.template.context_processors.";
        self.context_processor_factory(&format!("{}debug", PREFIX), |s: &Settings| {
            Arc::new(DebugProcessor { debug: s.debug }) as Arc<dyn ContextProcessor>
        });
        self.context_processor_factory(&format!("{}request", PREFIX), |_: &Settings| {
            Arc::new(RequestProcessor) as Arc<dyn ContextProcessor>
        });
        self.context_processor_factory(&format!("{}static", PREFIX), |s: &Settings| {
            Arc::new(StaticProcessor { static_url: s.static_url.clone() }) as Arc<dyn ContextProcessor>
        });
        self.context_processor_factory(&format!("{}media", PREFIX), |s: &Settings| {
            Arc::new(MediaProcessor { media_url: s.media_url.clone() }) as Arc<dyn ContextProcessor>
        });
        self.context_processor_factory(&format!("{}i18n", PREFIX), |s: &Settings| {
            Arc::new(I18nProcessor { language_code: s.language_code.clone() }) as Arc<dyn ContextProcessor>
        });
        self.context_processor_factory(&format!("{}tz", PREFIX), |s: &Settings| {
            Arc::new(TzProcessor { time_zone: s.time_zone.clone() }) as Arc<dyn ContextProcessor>
        });
        self.context_processor_factory(&format!("{}csrf", PREFIX), |_: &Settings| {
            Arc::new(CsrfProcessor) as Arc<dyn ContextProcessor>
        });
    }

    // Filters are reachable as `django_jinja.filters.<name>`, tests and
    // functions under `django_jinja.tests.` and `django_jinja.functions.`.
    fn register_builtin_helpers(&mut self) {
        const FILTERS: &str = "django_jinja.filters.";
        self.filter(&format!("{}addslashes", FILTERS), KeepSafe(string::addslashes));
        self.filter(&format!("{}capfirst", FILTERS), KeepSafe(string::capfirst));
        self.filter(&format!("{}cut", FILTERS), string::cut);
        self.filter(&format!("{}date", FILTERS), common::date);
        self.filter(&format!("{}escapejs", FILTERS), Safe(string::escapejs));
        self.filter(&format!("{}floatformat", FILTERS), KeepSafe(number::floatformat));
        self.filter(&format!("{}linebreaksbr", FILTERS), Escaping(html::linebreaksbr));
        self.filter(&format!("{}linebreaks", FILTERS), Escaping(html::linebreaks));
        self.filter(&format!("{}pluralize", FILTERS), number::pluralize);
        self.filter(&format!("{}striptags", FILTERS), KeepSafe(html::striptags));
        self.filter(&format!("{}time", FILTERS), common::time);
        self.filter(&format!("{}truncatechars", FILTERS), KeepSafe(string::truncatechars));
        self.filter(&format!("{}yesno", FILTERS), common::yesno);
        #[cfg(feature = "slug")]
        self.filter(&format!("{}slugify", FILTERS), KeepSafe(string::slugify));

        self.test("django_jinja.tests.matching", testers::matching);
        self.test("django_jinja.tests.divisibleby", testers::divisible_by);
        self.function("django_jinja.functions.now", functions::common::now);
    }

    pub fn filter<F: Filter + 'static>(&mut self, name: &str, filter: F) -> &mut Self {
        self.filters.insert(name.to_string(), Arc::new(filter));
        self
    }

    pub fn test<T: Test + 'static>(&mut self, name: &str, test: T) -> &mut Self {
        self.tests.insert(name.to_string(), Arc::new(test));
        self
    }

    pub fn function<F: Function + 'static>(&mut self, name: &str, function: F) -> &mut Self {
        self.functions.insert(name.to_string(), Arc::new(function));
        self
    }

    /// Registers a context processor that doesn't depend on the settings.
    pub fn context_processor<P: ContextProcessor + 'static>(&mut self, name: &str, processor: P) -> &mut Self {
        let processor: Arc<dyn ContextProcessor> = Arc::new(processor);
        self.context_processor_factory(name, move |_: &Settings| processor.clone())
    }

    pub fn context_processor_factory<F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        F: Fn(&Settings) -> Arc<dyn ContextProcessor> + Send + Sync + 'static,
    {
        self.processors.insert(name.to_string(), Arc::new(factory));
        self
    }

    pub fn extension<E: Extension + 'static>(&mut self, name: &str, extension: E) -> &mut Self {
        self.extensions.insert(name.to_string(), Arc::new(extension));
        self
    }

    pub fn resolve_filter(&self, name: &str) -> Result<Arc<dyn Filter>> {
        self.filters.get(name).cloned().ok_or_else(|| unknown("filter", name))
    }

    pub fn resolve_test(&self, name: &str) -> Result<Arc<dyn Test>> {
        self.tests.get(name).cloned().ok_or_else(|| unknown("test", name))
    }

    pub fn resolve_function(&self, name: &str) -> Result<Arc<dyn Function>> {
        self.functions.get(name).cloned().ok_or_else(|| unknown("global function", name))
    }

    pub fn resolve_context_processor(&self, name: &str, settings: &Settings) -> Result<Arc<dyn ContextProcessor>> {
        self.processors.get(name).map(|factory| factory(settings)).ok_or_else(|| unknown("context processor", name))
    }

    pub fn resolve_extension(&self, name: &str) -> Result<Arc<dyn Extension>> {
        self.extensions.get(name).cloned().ok_or_else(|| unknown("extension", name))
    }
}

impl fmt::Debug for Plugins {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fn names<'a>(mut map: Vec<&'a String>) -> Vec<&'a String> {
            map.sort();
            map
        }
        f.debug_struct("Plugins")
            .field("filters", &names(self.filters.keys().collect()))
            .field("tests", &names(self.tests.keys().collect()))
            .field("functions", &names(self.functions.keys().collect()))
            .field("context_processors", &names(self.processors.keys().collect()))
            .field("extensions", &names(self.extensions.keys().collect()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::request::Request;
    use serde_json::json;

    #[test]
    fn builtins_resolve_by_short_name_and_path() {
        let plugins = Plugins::with_builtins();
        assert_eq!(plugins.resolve_extension("csrf").unwrap().name(), "csrf");
        assert_eq!(
            plugins.resolve_extension("django_jinja.builtins.extensions.CacheExtension").unwrap().name(),
            "cache"
        );
        assert!(plugins.resolve_test("django_jinja.tests.matching").is_ok());
        assert!(plugins.resolve_function("django_jinja.functions.now").is_ok());
    }

    #[test]
    fn processors_are_built_from_settings() {
        let plugins = Plugins::with_builtins();
        let settings = Settings { static_url: "/assets/".to_string(), ..Settings::default() };
        let processor = plugins
            .resolve_context_processor("django.template.context_processors.static", &settings)
            .unwrap();
        assert_eq!(processor.process(&Request::get("/"))["STATIC_URL"].as_str(), Some("/assets/"));
    }

    #[test]
    fn unknown_names_are_improperly_configured() {
        let plugins = Plugins::new();
        for err in [
            plugins.resolve_filter("nope").err(),
            plugins.resolve_test("nope").err(),
            plugins.resolve_function("nope").err(),
            plugins.resolve_extension("nope").err(),
            plugins.resolve_context_processor("nope", &Settings::default()).err(),
        ] {
            assert!(matches!(err.map(|e| e.kind), Some(ErrorKind::ImproperlyConfigured(_))));
        }
    }

    #[test]
    fn user_registrations() {
        let mut plugins = Plugins::new();
        plugins.filter("myapp.shout", |v: &serde_json::Value, _: &crate::Args| -> Result<serde_json::Value> {
            Ok(json!(v.as_str().unwrap_or_default().to_uppercase()))
        });
        let filter = plugins.resolve_filter("myapp.shout").unwrap();
        assert_eq!(filter.filter(&json!("hi"), &crate::Args::default()).unwrap(), json!("HI"));
    }

    #[test]
    fn debug_lists_sorted_names() {
        let mut plugins = Plugins::new();
        plugins.test("b.even", testers::divisible_by).test("a.matching", testers::matching);
        let debug = format!("{:?}", plugins);
        assert!(debug.contains(r#"tests: ["a.matching", "b.even"]"#), "{}", debug);
        assert!(debug.contains("filters: []"), "{}", debug);
    }
}
