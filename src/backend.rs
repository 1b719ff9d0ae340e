// The template backend the host framework talks to.
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::config::{Settings, TemplateSettings, BACKEND_PATH};
use crate::context::Context;
use crate::environment::Environment;
use crate::errors::{Error, ErrorKind, Result};
use crate::host::Host;
use crate::library::Library;
use crate::processors::{csrf_input, ContextProcessor};
use crate::request::Request;

/// `extension` only: suffix test. `regex` only: match from the start of the
/// name. Both: both must hold. Neither: every name matches.
pub fn match_template(name: &str, extension: Option<&str>, regex: Option<&Regex>) -> bool {
    let extension_matches = extension.map_or(true, |ext| name.ends_with(ext));
    let regex_matches = regex.map_or(true, |re| re.find(name).is_some_and(|m| m.start() == 0));
    extension_matches && regex_matches
}

struct Inner {
    name: String,
    env: Environment,
    processors: Vec<Arc<dyn ContextProcessor>>,
    match_extension: Option<String>,
    match_regex: Option<Regex>,
}

/// Cheap to clone, every clone shares the same environment.
#[derive(Clone)]
pub struct Backend {
    inner: Arc<Inner>,
}

impl Backend {
    pub fn new(settings: &Settings, template_settings: &TemplateSettings, host: &Host) -> Result<Self> {
        Self::with_library(settings, template_settings, host, &host.library())
    }

    /// Builds the backend with an explicit library instead of the one
    /// discovered from the host's apps.
    pub fn with_library(
        settings: &Settings,
        template_settings: &TemplateSettings,
        host: &Host,
        library: &Library,
    ) -> Result<Self> {
        let options = &template_settings.options;
        let env = Environment::with_library(settings, template_settings, host, library)?;

        let processors = options
            .context_processors
            .iter()
            .map(|name| host.plugins.resolve_context_processor(name, settings))
            .collect::<Result<Vec<_>>>()?;

        let match_regex = match &options.match_regex {
            Some(pattern) => Some(Regex::new(pattern).map_err(|e| {
                Error::improperly_configured(format!("Invalid match_regex `{}`", pattern)).with_source(e)
            })?),
            None => None,
        };

        tracing::debug!(
            "template backend `{}` ready with {} context processors",
            template_settings.name,
            processors.len()
        );
        Ok(Self {
            inner: Arc::new(Inner {
                name: template_settings.name.clone(),
                env,
                processors,
                match_extension: options.match_extension.clone(),
                match_regex,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn env(&self) -> &Environment {
        &self.inner.env
    }

    /// Whether this backend claims `name`.
    pub fn match_template(&self, name: &str) -> bool {
        match_template(name, self.inner.match_extension.as_deref(), self.inner.match_regex.as_ref())
    }

    pub fn get_template(&self, name: &str) -> Result<Template> {
        if !self.match_template(name) {
            return Err(Error::template_does_not_exist(name));
        }
        self.inner.env.get_template(name)?;
        Ok(Template { name: name.to_string(), backend: self.clone() })
    }

    /// Compiles `source` as an anonymous template. The name matching rules
    /// don't apply. Every distinct source stays compiled for the backend's
    /// lifetime, repeated sources are reused.
    pub fn from_string(&self, source: &str) -> Result<Template> {
        let name = self.inner.env.loader().add_string(source)?;
        self.inner.env.get_template(&name)?;
        Ok(Template { name, backend: self.clone() })
    }

    /// Compiles every template this backend claims and reports every failure
    /// at once.
    pub fn check_templates(&self) -> Result<()> {
        let mut errors = String::new();

        for name in self.inner.env.list_templates()? {
            if !self.match_template(&name) {
                continue;
            }
            if let Err(e) = self.inner.env.get_template(&name) {
                use std::error::Error as StdError;

                errors += &format!("\n- {}", e);
                let mut cause = e.source();
                while let Some(e) = cause {
                    errors += &format!("\n{}", e);
                    cause = e.source();
                }
            }
        }

        if !errors.is_empty() {
            return Err(Error::template_syntax(format!("Invalid templates in `{}`:{}", self.name(), errors)));
        }
        Ok(())
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Backend")
            .field("name", &self.inner.name)
            .field("match_extension", &self.inner.match_extension)
            .field("match_regex", &self.inner.match_regex.as_ref().map(Regex::as_str))
            .field("env", &self.inner.env)
            .finish()
    }
}

/// A compiled template bound to its backend.
#[derive(Clone, Debug)]
pub struct Template {
    name: String,
    backend: Backend,
}

impl Template {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Renders with `context`. With a request, `request`, `csrf_input` and
    /// `csrf_token` are added on top, then the context processors' output.
    pub fn render(&self, context: Option<Context>, request: Option<&Request>) -> Result<String> {
        let mut context = context.unwrap_or_default();

        if let Some(request) = request {
            context.push();
            context.insert("request", request);
            context.insert_safe("csrf_input", &csrf_input(request));
            if let Some(token) = request.csrf_token() {
                context.insert("csrf_token", token);
            }
            for processor in &self.backend.inner.processors {
                context.update(processor.process(request));
            }
        }

        tracing::trace!("rendering `{}`", self.name);
        self.backend.inner.env.render(&self.name, &context.flatten())
    }
}

/// Every configured backend, in settings order.
#[derive(Clone, Debug)]
pub struct Engines {
    backends: Vec<Backend>,
}

impl Engines {
    pub fn new(settings: &Settings, host: &Host) -> Result<Self> {
        let library = host.library();
        let mut backends = Vec::with_capacity(settings.templates.len());

        for template_settings in &settings.templates {
            if template_settings.backend != BACKEND_PATH {
                return Err(Error::improperly_configured(format!(
                    "Unknown template backend `{}`",
                    template_settings.backend
                )));
            }
            if backends.iter().any(|b: &Backend| b.name() == template_settings.name) {
                return Err(Error::improperly_configured(format!(
                    "Template engine aliases aren't unique, duplicates: {}",
                    template_settings.name
                )));
            }
            backends.push(Backend::with_library(settings, template_settings, host, &library)?);
        }
        Ok(Self { backends })
    }

    pub fn backends(&self) -> &[Backend] {
        &self.backends
    }

    pub fn get(&self, name: &str) -> Option<&Backend> {
        self.backends.iter().find(|b| b.name() == name)
    }

    /// The first backend providing `name`. Not-found errors are skipped,
    /// the last one is returned if no backend has the template.
    pub fn get_template(&self, name: &str) -> Result<Template> {
        let mut last_error = None;
        for backend in &self.backends {
            match backend.get_template(name) {
                Ok(template) => return Ok(template),
                Err(e) if matches!(e.kind, ErrorKind::TemplateDoesNotExist(_)) => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }
        Err(last_error.unwrap_or_else(|| Error::template_does_not_exist(name)))
    }

    pub fn render_to_string(&self, name: &str, context: Option<Context>, request: Option<&Request>) -> Result<String> {
        self.get_template(name)?.render(context, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_template_grid() {
        let regex = Regex::new(r"site/").unwrap();
        let cases = [
            ("test.jinja", Some(".jinja"), None, true),
            ("test.html", Some(".jinja"), None, false),
            ("admin/test.html", None, Some(&regex), false),
            ("site/test.html", None, Some(&regex), true),
            ("site/test.jinja", Some(".jinja"), Some(&regex), true),
            ("admin/test.jinja", Some(".jinja"), Some(&regex), false),
            ("site/test.html", Some(".jinja"), Some(&regex), false),
            ("anything.txt", None, None, true),
        ];
        for (name, extension, regex, expected) in cases {
            assert_eq!(match_template(name, extension, regex), expected, "{}", name);
        }
    }

    #[test]
    fn regex_is_anchored_at_the_start() {
        let regex = Regex::new("foo").unwrap();
        assert!(match_template("foo/bar.html", None, Some(&regex)));
        assert!(!match_template("bar/foo.html", None, Some(&regex)));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let settings = Settings {
            templates: vec![TemplateSettings {
                backend: "django.template.backends.django.DjangoTemplates".to_string(),
                ..TemplateSettings::default()
            }],
            ..Settings::default()
        };
        let err = Engines::new(&settings, &Host::new(&settings)).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ImproperlyConfigured(_)));
    }

    #[test]
    fn invalid_match_regex_is_rejected() {
        let mut template_settings = TemplateSettings::default();
        template_settings.options.match_regex = Some("(".to_string());
        let settings = Settings::default();
        let err = Backend::new(&settings, &template_settings, &Host::new(&settings)).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ImproperlyConfigured(_)));
    }
}
