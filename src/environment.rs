// The configured template engine.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use minijinja::value::{Kwargs, Rest};
use minijinja::{AutoEscape, State, UndefinedBehavior, Value};

use crate::builtins::filters::Filter;
use crate::builtins::functions::{self, Function};
use crate::builtins::testers::{self, Test};
use crate::builtins::Args;
use crate::config::{Settings, TemplateSettings, UndefinedPolicy};
use crate::errors::{Error, Result};
use crate::extensions::{Extension, InstallContext, DEFAULT_EXTENSIONS, EXTRA_FILTERS_EXTENSION};
use crate::host::Host;
use crate::library::{Library, RenderWith};
use crate::loader::TemplateLoader;
use crate::markup::format_html;
use crate::utils::escape_html;

type EngineResult<T> = std::result::Result<T, minijinja::Error>;

// Undefined and none both become JSON null.
fn to_json(value: &Value) -> EngineResult<serde_json::Value> {
    if value.is_undefined() {
        return Ok(serde_json::Value::Null);
    }
    serde_json::to_value(value).map_err(|e| Error::json(e).into_engine())
}

fn from_json(value: serde_json::Value, safe: bool) -> Value {
    match value {
        serde_json::Value::String(s) if safe => Value::from_safe_string(s),
        other => Value::from_serialize(&other),
    }
}

fn collect_args(positional: &[Value], kwargs: &Kwargs) -> EngineResult<Args> {
    let positional = positional.iter().map(to_json).collect::<EngineResult<Vec<_>>>()?;
    let mut named = BTreeMap::new();
    for key in kwargs.args() {
        let value: Value = kwargs.get(key)?;
        named.insert(key.to_string(), to_json(&value)?);
    }
    Ok(Args::new(positional, named))
}

fn call_filter(
    filter: &dyn Filter,
    state: &State<'_, '_>,
    value: &Value,
    args: &[Value],
    kwargs: &Kwargs,
) -> EngineResult<Value> {
    let input_safe = value.is_safe();
    let autoescape = !matches!(state.auto_escape(), AutoEscape::None);
    let input = if filter.escapes_input() && autoescape && !input_safe && !value.is_undefined() && !value.is_none() {
        serde_json::Value::String(escape_html(&value.to_string()))
    } else {
        to_json(value)?
    };

    let args = collect_args(args, kwargs)?;
    let output = filter.filter(&input, &args).map_err(Error::into_engine)?;
    Ok(from_json(output, filter.is_safe() || (filter.keeps_safety() && input_safe)))
}

fn call_test(test: &dyn Test, value: &Value, args: &[Value], kwargs: &Kwargs) -> EngineResult<bool> {
    let value = if value.is_undefined() { None } else { Some(to_json(value)?) };
    let args = collect_args(args, kwargs)?;
    test.test(value.as_ref(), &args).map_err(Error::into_engine)
}

fn call_function(function: &dyn Function, args: &[Value], kwargs: &Kwargs) -> EngineResult<Value> {
    let args = collect_args(args, kwargs)?;
    let output = function.call(&args).map_err(Error::into_engine)?;
    Ok(from_json(output, function.is_safe()))
}

fn undefined_behavior(policy: UndefinedPolicy) -> UndefinedBehavior {
    match policy {
        UndefinedPolicy::Lenient => UndefinedBehavior::Lenient,
        UndefinedPolicy::Chainable => UndefinedBehavior::Chainable,
        UndefinedPolicy::Strict => UndefinedBehavior::Strict,
    }
}

pub struct Environment {
    engine: minijinja::Environment<'static>,
    loader: Arc<TemplateLoader>,
    extensions: Vec<String>,
    autoescape: bool,
    filters: BTreeSet<String>,
    tests: BTreeSet<String>,
    globals: BTreeSet<String>,
}

impl Environment {
    /// Builds the engine for one `TEMPLATES` entry.
    pub fn from_settings(settings: &Settings, template_settings: &TemplateSettings, host: &Host) -> Result<Self> {
        Self::with_library(settings, template_settings, host, &host.library())
    }

    /// Same as [`Environment::from_settings`] with an explicit library instead
    /// of the one discovered from the host's apps.
    pub fn with_library(
        settings: &Settings,
        template_settings: &TemplateSettings,
        host: &Host,
        library: &Library,
    ) -> Result<Self> {
        let options = &template_settings.options;

        let mut extension_names: Vec<String> = match &options.extensions {
            Some(names) => names.clone(),
            None => DEFAULT_EXTENSIONS.iter().map(|n| n.to_string()).collect(),
        };
        if options.replace_filters_from_django {
            extension_names.push(EXTRA_FILTERS_EXTENSION.to_string());
        }
        let extensions = extension_names
            .iter()
            .map(|name| host.plugins.resolve_extension(name))
            .collect::<Result<Vec<Arc<dyn Extension>>>>()?;

        let mut dirs = template_settings.dirs.clone();
        if template_settings.app_dirs {
            dirs.extend(host.apps.iter().map(|app| app.template_dir()));
        }
        let tag_extensions = extensions.iter().filter(|e| !e.tags().is_empty()).cloned().collect();
        let loader = Arc::new(TemplateLoader::new(dirs, tag_extensions));

        let mut engine = minijinja::Environment::new();
        let engine_loader = loader.clone();
        engine.set_loader(move |name| engine_loader.load_for_engine(name));
        let autoescape = options.autoescape;
        engine.set_auto_escape_callback(move |_| if autoescape { AutoEscape::Html } else { AutoEscape::None });
        engine.set_formatter(format_html);
        engine.set_undefined_behavior(undefined_behavior(options.undefined));
        engine.set_trim_blocks(options.trim_blocks);
        engine.set_lstrip_blocks(options.lstrip_blocks);
        engine.set_keep_trailing_newline(options.keep_trailing_newline);
        engine.set_debug(settings.debug);

        let mut env = Self {
            engine,
            loader,
            extensions: extensions.iter().map(|e| e.name().to_string()).collect(),
            autoescape,
            filters: BTreeSet::new(),
            tests: BTreeSet::new(),
            globals: BTreeSet::new(),
        };
        env.register_builtins();

        let cx = InstallContext { settings, options, host };
        for extension in &extensions {
            extension.install(&mut env, &cx)?;
        }

        for (name, plugin) in &options.filters {
            let filter = host.plugins.resolve_filter(plugin)?;
            env.insert_filter(name, filter);
        }
        for (name, plugin) in &options.tests {
            let test = host.plugins.resolve_test(plugin)?;
            env.insert_test(name, test);
        }
        for (name, plugin) in &options.globals {
            let function = host.plugins.resolve_function(plugin)?;
            env.insert_function(name, function);
        }
        for (name, value) in &options.constants {
            env.add_global(name, Value::from_serialize(value));
        }

        library.apply_to(&mut env);

        tracing::debug!(
            "built template environment `{}` with extensions {:?}, {} filters, {} tests, {} globals",
            template_settings.name,
            env.extensions,
            env.filters.len(),
            env.tests.len(),
            env.globals.len()
        );
        Ok(env)
    }

    fn register_builtins(&mut self) {
        self.register_function("now", functions::common::now);
        self.register_test("matching", testers::matching);
        self.register_test("divisibleby", testers::divisible_by);
    }

    pub fn register_filter<F: Filter + 'static>(&mut self, name: &str, filter: F) {
        self.insert_filter(name, Arc::new(filter));
    }

    pub fn register_test<T: Test + 'static>(&mut self, name: &str, test: T) {
        self.insert_test(name, Arc::new(test));
    }

    pub fn register_function<F: Function + 'static>(&mut self, name: &str, function: F) {
        self.insert_function(name, Arc::new(function));
    }

    pub(crate) fn insert_filter(&mut self, name: &str, filter: Arc<dyn Filter>) {
        self.filters.insert(name.to_string());
        self.engine.add_filter(
            name.to_string(),
            move |state: &State, value: Value, args: Rest<Value>, kwargs: Kwargs| {
                call_filter(&*filter, state, &value, &args, &kwargs)
            },
        );
    }

    pub(crate) fn insert_test(&mut self, name: &str, test: Arc<dyn Test>) {
        self.tests.insert(name.to_string());
        self.engine.add_test(name.to_string(), move |value: Value, args: Rest<Value>, kwargs: Kwargs| {
            call_test(&*test, &value, &args, &kwargs)
        });
    }

    pub(crate) fn insert_function(&mut self, name: &str, function: Arc<dyn Function>) {
        self.globals.insert(name.to_string());
        self.engine.add_function(name.to_string(), move |args: Rest<Value>, kwargs: Kwargs| {
            call_function(&*function, &args, &kwargs)
        });
    }

    /// Sets a plain global value.
    pub fn add_global(&mut self, name: &str, value: Value) {
        self.globals.insert(name.to_string());
        self.engine.add_global(name.to_string(), value);
    }

    // Renders the template of an inclusion-style global in the calling
    // template's environment and returns the output as safe markup.
    pub(crate) fn insert_render_with(&mut self, name: &str, render_with: RenderWith) {
        self.globals.insert(name.to_string());
        self.engine.add_function(
            name.to_string(),
            move |state: &State, args: Rest<Value>, kwargs: Kwargs| -> EngineResult<Value> {
                let args = collect_args(&args, &kwargs)?;
                let context = (render_with.context)(&args).map_err(Error::into_engine)?;
                let template = state.env().get_template(&render_with.template)?;
                let rendered = template.render(Value::from_serialize(&context))?;
                Ok(Value::from_safe_string(rendered))
            },
        );
    }

    // Helpers installed by tag extensions talk to the engine directly since
    // they need the render state. They are not listed as globals.
    pub(crate) fn add_native_function<F, Rv, A>(&mut self, name: &str, function: F)
    where
        F: minijinja::functions::Function<Rv, A>
            + for<'a> minijinja::functions::Function<Rv, <A as minijinja::value::FunctionArgs<'a>>::Output>,
        Rv: minijinja::value::FunctionResult,
        A: for<'a> minijinja::value::FunctionArgs<'a>,
    {
        self.engine.add_function::<String, F, Rv, A>(name.to_string(), function);
    }

    /// Compiles `name`, or fetches it from the engine's cache.
    pub fn get_template(&self, name: &str) -> Result<minijinja::Template<'_, '_>> {
        self.engine.get_template(name).map_err(Error::from)
    }

    /// Registers `source` as an anonymous template and compiles it. The
    /// source is kept for the environment's lifetime, see
    /// [`TemplateLoader::add_string`].
    pub fn template_from_string(&self, source: &str) -> Result<minijinja::Template<'_, '_>> {
        let name = self.loader.add_string(source)?;
        self.get_template(&name)
    }

    pub fn render(&self, name: &str, context: &BTreeMap<String, Value>) -> Result<String> {
        self.get_template(name)?.render(context).map_err(Error::from)
    }

    /// Every template under the loader's directories.
    pub fn list_templates(&self) -> Result<Vec<String>> {
        self.loader.list_templates()
    }

    pub fn loader(&self) -> &TemplateLoader {
        &self.loader
    }

    pub fn autoescape(&self) -> bool {
        self.autoescape
    }

    /// Names of the installed extensions, in installation order.
    pub fn extension_names(&self) -> &[String] {
        &self.extensions
    }

    pub fn filter_names(&self) -> impl Iterator<Item = &str> {
        self.filters.iter().map(String::as_str)
    }

    pub fn test_names(&self) -> impl Iterator<Item = &str> {
        self.tests.iter().map(String::as_str)
    }

    pub fn global_names(&self) -> impl Iterator<Item = &str> {
        self.globals.iter().map(String::as_str)
    }

    pub fn has_filter(&self, name: &str) -> bool {
        self.filters.contains(name)
    }

    pub fn has_test(&self, name: &str) -> bool {
        self.tests.contains(name)
    }

    pub fn has_global(&self, name: &str) -> bool {
        self.globals.contains(name)
    }
}

// Needs a manual implementation since the engine's callbacks don't implement Debug.
impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Environment {{")?;
        writeln!(f, "\n\textensions: [")?;
        for extension in &self.extensions {
            writeln!(f, "\t\t{},", extension)?;
        }
        write!(f, "\t]")?;
        writeln!(f, "\n\tfilters: [")?;
        for filter in &self.filters {
            writeln!(f, "\t\t{},", filter)?;
        }
        write!(f, "\t]")?;
        writeln!(f, "\n\ttests: [")?;
        for test in &self.tests {
            writeln!(f, "\t\t{},", test)?;
        }
        write!(f, "\t]")?;
        writeln!(f, "\n\tglobals: [")?;
        for global in &self.globals {
            writeln!(f, "\t\t{},", global)?;
        }
        writeln!(f, "\t]")?;
        writeln!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::filters::{Escaping, KeepSafe};
    use crate::config::Options;
    use crate::errors::ErrorKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashMap;

    fn template_settings(options: Options) -> TemplateSettings {
        TemplateSettings { options, ..TemplateSettings::default() }
    }

    fn build(options: Options) -> Result<Environment> {
        let settings = Settings::default();
        Environment::from_settings(&settings, &template_settings(options), &Host::new(&settings))
    }

    fn render_str(env: &Environment, source: &str, context: serde_json::Value) -> Result<String> {
        env.template_from_string(source)?.render(Value::from_serialize(&context)).map_err(Error::from)
    }

    fn shout(value: &serde_json::Value, _: &Args) -> Result<serde_json::Value> {
        Ok(json!(format!("{}!", value.as_str().unwrap_or_default())))
    }

    #[test]
    fn default_extensions_and_builtins_are_registered() {
        let env = build(Options::default()).unwrap();
        assert_eq!(
            env.extension_names(),
            &["i18n", "csrf", "cache", "timezone", "urls", "staticfiles", "django_filters", "django_extra_filters"]
        );
        for name in ["truncatechars", "floatformat", "localtime", "reverseurl", "static", "title"] {
            assert!(env.has_filter(name), "missing filter {}", name);
        }
        for name in ["now", "url", "static", "_", "gettext", "ngettext"] {
            assert!(env.has_global(name), "missing global {}", name);
        }
        assert!(env.has_test("matching"));
        assert!(!env.has_global("__csrf_token_tag"));
    }

    #[test]
    fn extra_filters_can_be_left_out() {
        let env = build(Options { replace_filters_from_django: false, ..Options::default() }).unwrap();
        assert!(!env.has_filter("title"));
        assert!(env.has_filter("truncatechars"));
    }

    #[test]
    fn unknown_plugins_fail_construction() {
        let options = Options { extensions: Some(vec!["nope".to_string()]), ..Options::default() };
        assert!(matches!(build(options).unwrap_err().kind, ErrorKind::ImproperlyConfigured(_)));

        let mut filters = HashMap::new();
        filters.insert("x".to_string(), "nope.filter".to_string());
        let options = Options { filters, ..Options::default() };
        assert!(matches!(build(options).unwrap_err().kind, ErrorKind::ImproperlyConfigured(_)));
    }

    #[test]
    fn settings_overrides_and_constants() {
        let mut tests = HashMap::new();
        tests.insert("re".to_string(), "django_jinja.tests.matching".to_string());
        let mut constants = HashMap::new();
        constants.insert("foo".to_string(), json!("bar"));
        let env = build(Options { tests, constants, ..Options::default() }).unwrap();
        assert_eq!(
            render_str(&env, "{{ foo }} {{ 'abc' is re('^a') }}", json!({})).unwrap(),
            "bar true"
        );
    }

    #[test]
    fn filters_receive_positional_and_keyword_arguments() {
        let env = build(Options::default()).unwrap();
        assert_eq!(
            render_str(&env, "{{ s|truncatechars(5) }}|{{ s|truncatechars(length=5) }}", json!({"s": "hola mundo"}))
                .unwrap(),
            "ho...|ho..."
        );
    }

    #[test]
    fn filter_safety_rules() {
        let mut env = build(Options::default()).unwrap();
        env.register_filter("plain", shout);
        env.register_filter("keep", KeepSafe(shout));
        env.register_filter("esc", Escaping(shout));

        let context = json!({"s": "<b>"});
        assert_eq!(render_str(&env, "{{ s|plain }}", context.clone()).unwrap(), "&lt;b&gt;!");
        assert_eq!(render_str(&env, "{{ s|safe|plain }}", context.clone()).unwrap(), "&lt;b&gt;!");
        assert_eq!(render_str(&env, "{{ s|safe|keep }}", context.clone()).unwrap(), "<b>!");
        assert_eq!(render_str(&env, "{{ s|keep }}", context.clone()).unwrap(), "&lt;b&gt;!");
        assert_eq!(render_str(&env, "{{ s|esc }}", context.clone()).unwrap(), "&lt;b&gt;!");
        assert_eq!(render_str(&env, "{{ s|safe|esc }}", context).unwrap(), "<b>!");
    }

    #[test]
    fn autoescape_can_be_turned_off() {
        let env = build(Options { autoescape: false, ..Options::default() }).unwrap();
        assert!(!env.autoescape());
        assert_eq!(render_str(&env, "{{ s }}", json!({"s": "<b>"})).unwrap(), "<b>");
    }

    #[test]
    fn strict_undefined() {
        let env = build(Options { undefined: UndefinedPolicy::Strict, ..Options::default() }).unwrap();
        assert!(render_str(&env, "{{ missing }}", json!({})).is_err());
        let env = build(Options::default()).unwrap();
        assert_eq!(render_str(&env, "[{{ missing }}]", json!({})).unwrap(), "[]");
    }

    #[test]
    fn library_is_applied_last() {
        let settings = Settings::default();
        let mut constants = HashMap::new();
        constants.insert("foo".to_string(), json!("from settings"));
        let template_settings = template_settings(Options { constants, ..Options::default() });
        let mut library = Library::new();
        library.set_global("foo", "from library");
        let env = Environment::with_library(&settings, &template_settings, &Host::new(&settings), &library).unwrap();
        assert_eq!(render_str(&env, "{{ foo }}", json!({})).unwrap(), "from library");
    }

    #[test]
    fn render_with_globals_are_safe() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("strong.jinja"), "<strong>{{ value }}</strong>").unwrap();
        let settings = Settings::default();
        let template_settings = TemplateSettings { dirs: vec![dir.path().into()], ..TemplateSettings::default() };
        let mut library = Library::new();
        library.render_with("strong", "strong.jinja", |args: &Args| {
            Ok(json!({"value": args.get(0, "value").cloned().unwrap_or_default()}))
        });
        let env = Environment::with_library(&settings, &template_settings, &Host::new(&settings), &library).unwrap();
        assert_eq!(render_str(&env, "{{ strong('Foo') }}", json!({})).unwrap(), "<strong>Foo</strong>");
    }

    #[test]
    fn debug_output_lists_names() {
        let env = build(Options::default()).unwrap();
        let debug = format!("{:?}", env);
        assert!(debug.contains("truncatechars"));
        assert!(debug.contains("django_filters"));
    }
}
