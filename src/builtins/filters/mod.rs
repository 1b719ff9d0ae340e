use serde_json::Value;

use crate::builtins::Args;
use crate::errors::Result;

pub mod common;
pub mod dateformat;
pub mod html;
pub mod number;
pub mod string;
pub mod timezone;

// The filter function type definition
pub trait Filter: Sync + Send {
    // The filter function type definition
    fn filter(&self, value: &Value, args: &Args) -> Result<Value>;

    // Whether the current filter's output should be treated as safe, defaults to `false`
    fn is_safe(&self) -> bool {
        false
    }

    // Whether an unsafe string input is HTML-escaped before the filter runs when
    // autoescaping is on, the way Django's `needs_autoescape` filters behave.
    fn escapes_input(&self) -> bool {
        false
    }

    // Whether the output stays safe when the input was safe, like Django's
    // `is_safe=True` filters
    fn keeps_safety(&self) -> bool {
        false
    }
}

impl<F> Filter for F
where
    F: Fn(&Value, &Args) -> Result<Value> + Sync + Send,
{
    fn filter(&self, value: &Value, args: &Args) -> Result<Value> {
        self(value, args)
    }
}

/// Marks the string output of a filter as safe markup.
pub struct Safe<F>(pub F);

impl<F> Filter for Safe<F>
where
    F: Fn(&Value, &Args) -> Result<Value> + Sync + Send,
{
    fn filter(&self, value: &Value, args: &Args) -> Result<Value> {
        (self.0)(value, args)
    }

    fn is_safe(&self) -> bool {
        true
    }
}

/// Escapes unsafe input under autoescape, then marks the output as safe.
pub struct Escaping<F>(pub F);

impl<F> Filter for Escaping<F>
where
    F: Fn(&Value, &Args) -> Result<Value> + Sync + Send,
{
    fn filter(&self, value: &Value, args: &Args) -> Result<Value> {
        (self.0)(value, args)
    }

    fn is_safe(&self) -> bool {
        true
    }

    fn escapes_input(&self) -> bool {
        true
    }
}

/// Output is safe only when the input already was.
pub struct KeepSafe<F>(pub F);

impl<F> Filter for KeepSafe<F>
where
    F: Fn(&Value, &Args) -> Result<Value> + Sync + Send,
{
    fn filter(&self, value: &Value, args: &Args) -> Result<Value> {
        (self.0)(value, args)
    }

    fn keeps_safety(&self) -> bool {
        true
    }
}

// Renders a value the way the template engine prints it.
pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
