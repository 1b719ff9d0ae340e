#[macro_use]
mod macros;
mod app;
mod backend;
mod builtins;
mod cache;
mod config;
mod context;
pub mod contrib;
mod environment;
mod errors;
pub mod extensions;
mod host;
mod i18n;
mod library;
mod loader;
mod markup;
mod plugins;
mod processors;
mod request;
mod staticfiles;
mod urls;
mod utils;
pub mod views;

pub use crate::app::{App, AppConfig};
pub use crate::backend::{match_template, Backend, Engines, Template};
pub use crate::builtins::filters::{Escaping, Filter, KeepSafe, Safe};
pub use crate::builtins::functions::{Function, SafeFunction};
pub use crate::builtins::testers::Test;
pub use crate::builtins::Args;
pub use crate::cache::{CacheBackend, DummyCache, LocMemCache};
pub use crate::config::{Options, Settings, TemplateSettings, UndefinedPolicy, BACKEND_PATH};
pub use crate::context::Context;
pub use crate::environment::Environment;
pub use crate::errors::{Error, ErrorKind, Result};
pub use crate::host::Host;
pub use crate::i18n::{Catalog, NullTranslations, Translations};
pub use crate::library::{Library, RenderWithFn};
pub use crate::loader::TemplateLoader;
pub use crate::markup::{mark_safe, safe, HtmlSafe, SafeString};
pub use crate::plugins::{Plugins, ProcessorFactory};
pub use crate::processors::ContextProcessor;
pub use crate::request::Request;
pub use crate::staticfiles::{StaticFilesStorage, StaticStorage};
pub use crate::urls::{UrlConf, UrlResolver};
pub use crate::utils::escape_html;
// Re-export Value and other useful things from serde
// so apps can build filter arguments and results
pub use serde_json::value::{from_value, to_value, Map, Number, Value};
// The engine itself, for context processors and globals building engine values
pub use minijinja;

// Re-export some helper fns useful to write filters/fns/tests
pub mod helpers {
    // Functions helping writing tests
    pub mod tests {
        pub use crate::builtins::testers::{extract_string, number_args_allowed, value_defined};
    }
}
