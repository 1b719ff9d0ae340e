// URL reversal used by the `url` global and the `reverseurl` filter.
use std::collections::{BTreeMap, BTreeSet};

use crate::errors::{Error, Result};
use crate::utils::urlquote;

/// Reverses a named route into a path, like Django's `reverse()`.
pub trait UrlResolver: Send + Sync {
    fn reverse(&self, name: &str, args: &[String], kwargs: &BTreeMap<String, String>) -> Result<String>;
}

// One `<name>` or `<converter:name>` placeholder.
#[derive(Debug, Clone, PartialEq)]
struct Param {
    name: String,
    converter: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Param(Param),
}

#[derive(Debug, Clone, PartialEq)]
struct Route {
    name: String,
    segments: Vec<Segment>,
}

impl Route {
    fn parse(name: &str, route: &str) -> Result<Route> {
        let mut segments = Vec::new();
        let mut rest = route;
        while let Some(start) = rest.find('<') {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }
            let end = rest[start..].find('>').map(|i| i + start).ok_or_else(|| {
                Error::improperly_configured(format!("Unclosed angle bracket in route `{}`", route))
            })?;
            let inner = &rest[start + 1..end];
            let param = match inner.split_once(':') {
                Some((converter, name)) => {
                    Param { name: name.to_string(), converter: Some(converter.to_string()) }
                }
                None => Param { name: inner.to_string(), converter: None },
            };
            segments.push(Segment::Param(param));
            rest = &rest[end + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }
        Ok(Route { name: name.to_string(), segments })
    }

    fn params(&self) -> impl Iterator<Item = &Param> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(p) => Some(p),
            Segment::Literal(_) => None,
        })
    }

    // Substitutes the arguments, or returns `None` when they don't fit this route.
    fn substitute(&self, args: &[String], kwargs: &BTreeMap<String, String>) -> Option<String> {
        let names: BTreeSet<&str> = self.params().map(|p| p.name.as_str()).collect();
        if !kwargs.is_empty() {
            if !args.is_empty() || names != kwargs.keys().map(String::as_str).collect::<BTreeSet<&str>>() {
                return None;
            }
        } else if args.len() != names.len() {
            return None;
        }

        let mut positional = args.iter();
        let mut url = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => url.push_str(text),
                Segment::Param(param) => {
                    let value = match kwargs.get(&param.name) {
                        Some(value) => value,
                        None => positional.next()?,
                    };
                    if !converts(param.converter.as_deref(), value) {
                        return None;
                    }
                    url.push_str(&urlquote(value));
                }
            }
        }
        if !url.starts_with('/') {
            url.insert(0, '/');
        }
        Some(url)
    }
}

fn converts(converter: Option<&str>, value: &str) -> bool {
    match converter {
        Some("int") => !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()),
        Some("slug") => {
            !value.is_empty() && value.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        }
        Some("path") => !value.is_empty(),
        _ => !value.is_empty() && !value.contains('/'),
    }
}

/// A flat table of named routes. Several routes may share a name; reversal
/// picks the first one whose parameters fit the given arguments.
#[derive(Debug, Clone, Default)]
pub struct UrlConf {
    routes: Vec<Route>,
}

impl UrlConf {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a route such as `articles/<int:year>/` under `name`.
    pub fn route(mut self, route: &str, name: &str) -> Result<Self> {
        self.routes.push(Route::parse(name, route)?);
        Ok(self)
    }
}

impl UrlResolver for UrlConf {
    fn reverse(&self, name: &str, args: &[String], kwargs: &BTreeMap<String, String>) -> Result<String> {
        self.routes
            .iter()
            .filter(|route| route.name == name)
            .find_map(|route| route.substitute(args, kwargs))
            .ok_or_else(|| {
                Error::no_reverse_match(format!(
                    "Reverse for '{}' with arguments '{:?}' and keyword arguments '{:?}' not found.",
                    name, args, kwargs
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use pretty_assertions::assert_eq;

    fn urlconf() -> UrlConf {
        UrlConf::new()
            .route("test1/", "test-1")
            .and_then(|u| u.route("test1/<int:data>/", "test-1"))
            .and_then(|u| u.route("articles/<slug:slug>/<int:page>/", "article"))
            .unwrap()
    }

    #[test]
    fn reverses_without_arguments() {
        assert_eq!(urlconf().reverse("test-1", &[], &BTreeMap::new()).unwrap(), "/test1/");
    }

    #[test]
    fn picks_the_route_matching_the_arguments() {
        let mut kwargs = BTreeMap::new();
        kwargs.insert("data".to_string(), "2".to_string());
        assert_eq!(urlconf().reverse("test-1", &[], &kwargs).unwrap(), "/test1/2/");
        assert_eq!(urlconf().reverse("test-1", &["3".to_string()], &BTreeMap::new()).unwrap(), "/test1/3/");
    }

    #[test]
    fn positional_arguments_fill_in_order() {
        let args = vec!["hello-world".to_string(), "4".to_string()];
        assert_eq!(urlconf().reverse("article", &args, &BTreeMap::new()).unwrap(), "/articles/hello-world/4/");
    }

    #[test]
    fn unknown_name_or_bad_arguments_fail() {
        let err = urlconf().reverse("adads", &[], &BTreeMap::new()).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::NoReverseMatch(_)));
        let err = urlconf().reverse("test-1", &["x".to_string()], &BTreeMap::new()).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::NoReverseMatch(_)));
    }

    #[test]
    fn unclosed_placeholder_is_a_configuration_error() {
        let err = UrlConf::new().route("a/<id/", "a").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ImproperlyConfigured(_)));
    }
}
