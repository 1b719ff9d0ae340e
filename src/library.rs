// The registry components use to contribute template helpers.
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::app::App;
use crate::builtins::filters::Filter;
use crate::builtins::functions::Function;
use crate::builtins::testers::Test;
use crate::builtins::Args;
use crate::environment::Environment;
use crate::errors::Result;

/// Builds the context of an inclusion-style global from its call arguments.
pub type RenderWithFn = dyn Fn(&Args) -> Result<Value> + Send + Sync;

#[derive(Clone)]
pub(crate) struct RenderWith {
    pub(crate) template: String,
    pub(crate) context: Arc<RenderWithFn>,
}

// A global is either a callable, a plain value, or a template rendered with
// the output of a callable. They share one namespace.
#[derive(Clone)]
enum Global {
    Function(Arc<dyn Function>),
    Value(minijinja::Value),
    RenderWith(RenderWith),
}

// The last path segment of the innermost type: `my_filter` and
// `Safe<my_filter>` both give `my_filter`. Closures have no usable name.
fn derived_name<F>() -> Option<&'static str> {
    let full = std::any::type_name::<F>();
    let inner = full.trim_end_matches('>');
    let inner = inner.rsplit('<').next().unwrap_or(inner);
    let name = inner.rsplit("::").next().unwrap_or(inner);

    let mut chars = name.chars();
    let is_identifier = chars.next().is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_');
    is_identifier.then_some(name)
}

fn unnamed<F>(kind: &str) {
    tracing::warn!(
        "Can't derive a {} name from `{}`, it was not registered. Use the `_as` variant to name it.",
        kind,
        std::any::type_name::<F>()
    );
}

#[derive(Clone, Default)]
pub struct Library {
    filters: BTreeMap<String, Arc<dyn Filter>>,
    tests: BTreeMap<String, Arc<dyn Test>>,
    globals: BTreeMap<String, Global>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds one library from every installed app, in installation order.
    pub fn discover(apps: &[Arc<dyn App>]) -> Self {
        let mut library = Self::new();
        for app in apps {
            app.register(&mut library);
            tracing::trace!("app `{}` registered its template library", app.name());
        }
        library
    }

    /// Registers a filter under its function name. Closures have none and
    /// need [`Library::register_filter_as`].
    pub fn register_filter<F: Filter + 'static>(&mut self, filter: F) -> &mut Self {
        match derived_name::<F>() {
            Some(name) => self.register_filter_as(name, filter),
            None => {
                unnamed::<F>("filter");
                self
            }
        }
    }

    pub fn register_filter_as<F: Filter + 'static>(&mut self, name: &str, filter: F) -> &mut Self {
        self.filters.insert(name.to_string(), Arc::new(filter));
        self
    }

    /// Registers a test under its function name.
    pub fn register_test<T: Test + 'static>(&mut self, test: T) -> &mut Self {
        match derived_name::<T>() {
            Some(name) => self.register_test_as(name, test),
            None => {
                unnamed::<T>("test");
                self
            }
        }
    }

    pub fn register_test_as<T: Test + 'static>(&mut self, name: &str, test: T) -> &mut Self {
        self.tests.insert(name.to_string(), Arc::new(test));
        self
    }

    /// Registers a global function under its function name.
    pub fn register_global<F: Function + 'static>(&mut self, function: F) -> &mut Self {
        match derived_name::<F>() {
            Some(name) => self.register_global_as(name, function),
            None => {
                unnamed::<F>("global");
                self
            }
        }
    }

    pub fn register_global_as<F: Function + 'static>(&mut self, name: &str, function: F) -> &mut Self {
        self.globals.insert(name.to_string(), Global::Function(Arc::new(function)));
        self
    }

    /// Sets a plain global value.
    pub fn set_global<T: serde::Serialize + ?Sized>(&mut self, name: &str, value: &T) -> &mut Self {
        self.set_global_value(name, minijinja::Value::from_serialize(value))
    }

    /// Sets a global engine value as-is, safe markup included.
    pub fn set_global_value(&mut self, name: &str, value: minijinja::Value) -> &mut Self {
        self.globals.insert(name.to_string(), Global::Value(value));
        self
    }

    /// Registers a global that renders `template` with the context `context`
    /// builds from the call arguments, and returns the result as safe markup.
    pub fn render_with<F>(&mut self, name: &str, template: &str, context: F) -> &mut Self
    where
        F: Fn(&Args) -> Result<Value> + Send + Sync + 'static,
    {
        let render_with = RenderWith { template: template.to_string(), context: Arc::new(context) };
        self.globals.insert(name.to_string(), Global::RenderWith(render_with));
        self
    }

    /// Copies every entry of `other`, its entries winning.
    pub fn extend(&mut self, other: &Library) -> &mut Self {
        for (name, filter) in &other.filters {
            self.filters.insert(name.clone(), filter.clone());
        }
        for (name, test) in &other.tests {
            self.tests.insert(name.clone(), test.clone());
        }
        for (name, global) in &other.globals {
            self.globals.insert(name.clone(), global.clone());
        }
        self
    }

    /// Copies every entry into the environment, replacing same-named ones.
    /// Applying the same library again changes nothing.
    pub fn apply_to(&self, env: &mut Environment) {
        for (name, filter) in &self.filters {
            env.insert_filter(name, filter.clone());
        }
        for (name, test) in &self.tests {
            env.insert_test(name, test.clone());
        }
        for (name, global) in &self.globals {
            match global {
                Global::Function(function) => env.insert_function(name, function.clone()),
                Global::Value(value) => env.add_global(name, value.clone()),
                Global::RenderWith(render_with) => env.insert_render_with(name, render_with.clone()),
            }
        }
    }

    pub fn filter_names(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }

    pub fn test_names(&self) -> impl Iterator<Item = &str> {
        self.tests.keys().map(String::as_str)
    }

    pub fn global_names(&self) -> impl Iterator<Item = &str> {
        self.globals.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty() && self.tests.is_empty() && self.globals.is_empty()
    }
}

impl fmt::Debug for Library {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Library")
            .field("filters", &self.filters.keys().collect::<Vec<_>>())
            .field("tests", &self.tests.keys().collect::<Vec<_>>())
            .field("globals", &self.globals.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppConfig;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::path::Path;

    fn shout(value: &Value, _: &Args) -> Result<Value> {
        Ok(json!(value.as_str().unwrap_or_default().to_uppercase()))
    }

    fn is_one(value: Option<&Value>, _: &Args) -> Result<bool> {
        Ok(value == Some(&json!(1)))
    }

    fn myecho(args: &Args) -> Result<Value> {
        Ok(args.get(0, "data").cloned().unwrap_or(Value::Null))
    }

    #[test]
    fn names_come_from_the_function() {
        let mut library = Library::new();
        library.register_filter(shout).register_test(is_one).register_global(myecho);
        assert_eq!(library.filter_names().collect::<Vec<_>>(), vec!["shout"]);
        assert_eq!(library.test_names().collect::<Vec<_>>(), vec!["is_one"]);
        assert_eq!(library.global_names().collect::<Vec<_>>(), vec!["myecho"]);
    }

    #[test]
    fn wrapped_functions_keep_their_name() {
        let mut library = Library::new();
        library
            .register_filter(crate::builtins::filters::Safe(shout))
            .register_global(crate::builtins::functions::SafeFunction(myecho));
        assert_eq!(library.filter_names().collect::<Vec<_>>(), vec!["shout"]);
        assert_eq!(library.global_names().collect::<Vec<_>>(), vec!["myecho"]);
    }

    #[test]
    fn closures_need_a_name() {
        let mut library = Library::new();
        library.register_filter(|v: &Value, _: &Args| -> Result<Value> { Ok(v.clone()) });
        library.register_test(|_: Option<&Value>, _: &Args| -> Result<bool> { Ok(true) });
        assert!(library.is_empty());

        library.register_filter_as("same", |v: &Value, _: &Args| -> Result<Value> { Ok(v.clone()) });
        assert_eq!(library.filter_names().collect::<Vec<_>>(), vec!["same"]);
    }

    #[test]
    fn explicit_names_and_last_write_wins() {
        let mut library = Library::new();
        library.register_test_as("one", is_one);
        library.register_global_as("thing", myecho);
        library.set_global("thing", "value");
        assert_eq!(library.test_names().collect::<Vec<_>>(), vec!["one"]);
        assert!(matches!(library.globals["thing"], Global::Value(_)));
    }

    #[test]
    fn extend_merges_later_wins() {
        let mut first = Library::new();
        first.set_global("a", &1).set_global("b", &1);
        let mut second = Library::new();
        second.set_global("b", &2);
        first.extend(&second);
        assert_eq!(first.global_names().collect::<Vec<_>>(), vec!["a", "b"]);
        match &first.globals["b"] {
            Global::Value(v) => assert_eq!(v, &minijinja::Value::from(2)),
            _ => panic!("expected a plain value"),
        }
    }

    struct Blog;

    impl App for Blog {
        fn name(&self) -> &str {
            "blog"
        }

        fn path(&self) -> &Path {
            Path::new("blog")
        }

        fn register(&self, library: &mut Library) {
            library.register_filter(shout);
        }
    }

    #[test]
    fn discover_calls_every_app() {
        let apps: Vec<Arc<dyn App>> = vec![Arc::new(AppConfig::new("static", "s")), Arc::new(Blog)];
        let library = Library::discover(&apps);
        assert_eq!(library.filter_names().collect::<Vec<_>>(), vec!["shout"]);
        assert!(!library.is_empty());
    }
}
