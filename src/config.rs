// Host settings and the `TEMPLATES` entries read by the backend.
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::{Error, Result};

/// The only backend path this crate answers to.
pub const BACKEND_PATH: &str = "django_jinja.backend.Jinja2";

/// Host-level settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(alias = "DEBUG")]
    pub debug: bool,
    #[serde(alias = "USE_I18N")]
    pub use_i18n: bool,
    #[serde(alias = "USE_TZ")]
    pub use_tz: bool,
    #[serde(alias = "TIME_ZONE")]
    pub time_zone: String,
    #[serde(alias = "LANGUAGE_CODE")]
    pub language_code: String,
    #[serde(alias = "STATIC_URL")]
    pub static_url: String,
    #[serde(alias = "MEDIA_URL")]
    pub media_url: String,
    #[serde(alias = "DATE_FORMAT")]
    pub date_format: String,
    #[serde(alias = "TIME_FORMAT")]
    pub time_format: String,
    #[serde(alias = "TEMPLATES")]
    pub templates: Vec<TemplateSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            use_i18n: true,
            use_tz: false,
            time_zone: "America/Chicago".to_string(),
            language_code: "en-us".to_string(),
            static_url: "/static/".to_string(),
            media_url: "/media/".to_string(),
            date_format: crate::builtins::filters::dateformat::DEFAULT_DATE_FORMAT.to_string(),
            time_format: crate::builtins::filters::dateformat::DEFAULT_TIME_FORMAT.to_string(),
            templates: vec![TemplateSettings::default()],
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::improperly_configured(format!("Invalid settings: {}", e)).with_source(e))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::chain(format!("Couldn't read settings file `{}`", path.display()), e))?;
        Self::from_json(&json)
    }
}

/// One entry of the `TEMPLATES` list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TemplateSettings {
    #[serde(alias = "BACKEND")]
    pub backend: String,
    #[serde(alias = "NAME")]
    pub name: String,
    #[serde(alias = "DIRS")]
    pub dirs: Vec<PathBuf>,
    #[serde(alias = "APP_DIRS")]
    pub app_dirs: bool,
    #[serde(alias = "OPTIONS")]
    pub options: Options,
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            backend: BACKEND_PATH.to_string(),
            name: "jinja2".to_string(),
            dirs: Vec::new(),
            app_dirs: false,
            options: Options::default(),
        }
    }
}

/// How undefined variables behave while rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UndefinedPolicy {
    /// Prints as empty, iterates as empty, attribute access fails
    #[default]
    Lenient,
    /// Like lenient, and attribute access on undefined is undefined as well
    Chainable,
    /// Any use other than a test fails
    Strict,
}

/// The backend's `OPTIONS`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Suffix a template name must end with; `null` disables the check
    pub match_extension: Option<String>,
    /// Pattern a template name must match from its start
    pub match_regex: Option<String>,
    pub autoescape: bool,
    /// Extension names; `None` installs the default list
    pub extensions: Option<Vec<String>>,
    pub undefined: UndefinedPolicy,
    pub newstyle_gettext: bool,
    pub context_processors: Vec<String>,
    /// Template name to plugin name
    pub filters: HashMap<String, String>,
    pub tests: HashMap<String, String>,
    pub globals: HashMap<String, String>,
    pub constants: HashMap<String, serde_json::Value>,
    pub replace_filters_from_django: bool,
    pub translation_engine: Option<String>,
    pub mute_urlresolve_exceptions: bool,
    pub trim_blocks: bool,
    pub lstrip_blocks: bool,
    pub keep_trailing_newline: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            match_extension: Some(".jinja".to_string()),
            match_regex: None,
            autoescape: true,
            extensions: None,
            undefined: UndefinedPolicy::default(),
            newstyle_gettext: true,
            context_processors: Vec::new(),
            filters: HashMap::new(),
            tests: HashMap::new(),
            globals: HashMap::new(),
            constants: HashMap::new(),
            replace_filters_from_django: true,
            translation_engine: None,
            mute_urlresolve_exceptions: false,
            trim_blocks: false,
            lstrip_blocks: false,
            keep_trailing_newline: false,
        }
    }
}
