// Safe-markup handling at the boundary between host values and the engine.
use std::fmt;

use minijinja::{AutoEscape, Output, State, Value};

use crate::utils::escape_html;

/// A host value whose string form is already safe HTML.
pub trait HtmlSafe {
    fn html(&self) -> String;
}

/// A string that is already safe HTML.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SafeString(String);

impl SafeString {
    pub fn new(markup: impl Into<String>) -> Self {
        Self(markup.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl HtmlSafe for SafeString {
    fn html(&self) -> String {
        self.0.clone()
    }
}

impl<T: HtmlSafe + ?Sized> HtmlSafe for &T {
    fn html(&self) -> String {
        (**self).html()
    }
}

impl fmt::Display for SafeString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<SafeString> for Value {
    fn from(value: SafeString) -> Self {
        Value::from_safe_string(value.0)
    }
}

/// Turns an [`HtmlSafe`] host value into an engine value that is not escaped again.
pub fn safe<T: HtmlSafe + ?Sized>(value: &T) -> Value {
    Value::from_safe_string(value.html())
}

/// Marks an engine value as safe. Already-safe values, `none` and undefined
/// are returned unchanged, so applying it repeatedly is harmless.
pub fn mark_safe(value: Value) -> Value {
    if value.is_safe() || value.is_undefined() || value.is_none() {
        return value;
    }
    match value.as_str() {
        Some(s) => Value::from_safe_string(s.to_string()),
        None => Value::from_safe_string(value.to_string()),
    }
}

// The engine's formatter, escaping unsafe values the way markupsafe does
// when the template autoescapes to HTML.
pub(crate) fn format_html(
    out: &mut Output<'_>,
    state: &State<'_, '_>,
    value: &Value,
) -> Result<(), minijinja::Error> {
    match state.auto_escape() {
        AutoEscape::Html if !value.is_safe() && !value.is_undefined() && !value.is_none() => {
            let escaped = match value.as_str() {
                Some(s) => escape_html(s),
                None => escape_html(&value.to_string()),
            };
            out.write_str(&escaped).map_err(|_| {
                minijinja::Error::new(minijinja::ErrorKind::WriteFailure, "formatting failed")
            })
        }
        _ => minijinja::escape_formatter(out, state, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Widget;

    impl HtmlSafe for Widget {
        fn html(&self) -> String {
            "<input name='q'>".to_string()
        }
    }

    #[test]
    fn safe_values_are_flagged() {
        let value = safe(&Widget);
        assert!(value.is_safe());
        assert_eq!(value.as_str(), Some("<input name='q'>"));
    }

    #[test]
    fn mark_safe_is_idempotent() {
        let once = mark_safe(Value::from("<b>x</b>"));
        let twice = mark_safe(once.clone());
        assert!(once.is_safe());
        assert_eq!(once, twice);
        assert_eq!(twice.as_str(), Some("<b>x</b>"));
    }

    #[test]
    fn mark_safe_leaves_none_alone() {
        assert!(mark_safe(Value::from(())).is_none());
    }

    #[test]
    fn safe_string_converts() {
        let value: Value = SafeString::new("<i>a</i>").into();
        assert!(value.is_safe());
    }
}
