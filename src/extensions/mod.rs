// Extensions add template helpers and, for the tag extensions, custom
// `{% ... %}` tags.
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::{Options, Settings};
use crate::environment::Environment;
use crate::errors::{Error, Result};
use crate::host::Host;

mod args;
pub mod cache;
pub mod csrf;
pub mod filters;
pub mod i18n;
pub mod staticfiles;
pub mod timezone;
pub mod urls;

pub use self::cache::CacheExtension;
pub use self::csrf::CsrfExtension;
pub use self::filters::{DjangoExtraFiltersExtension, DjangoFiltersExtension};
pub use self::i18n::I18nExtension;
pub use self::staticfiles::StaticFilesExtension;
pub use self::timezone::TimezoneExtension;
pub use self::urls::UrlsExtension;

pub(crate) use self::args::split_expressions;

/// Extensions installed when the options don't list any.
pub const DEFAULT_EXTENSIONS: [&str; 7] =
    ["i18n", "csrf", "cache", "timezone", "urls", "staticfiles", "django_filters"];

/// Added after the others when `replace_filters_from_django` is on.
pub const EXTRA_FILTERS_EXTENSION: &str = "django_extra_filters";

lazy_static! {
    static ref RAW_END_RE: Regex = Regex::new(r"\{%[-+]?\s*endraw\s*[-+]?%\}").unwrap();
}

/// What an extension sees while it is installed.
pub struct InstallContext<'a> {
    pub settings: &'a Settings,
    pub options: &'a Options,
    pub host: &'a Host,
}

/// A custom tag found in a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag<'a> {
    pub name: &'a str,
    /// Everything after the tag name, trimmed
    pub args: &'a str,
    pub line: usize,
}

/// The engine syntax a custom tag is rewritten into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lowered {
    /// Printed as `{{ expression }}`
    Expression(String),
    /// Opened as `{% open %}`, and the matching `end_tag` becomes `{% close %}`
    Block { open: String, end_tag: &'static str, close: String },
}

pub trait Extension: Send + Sync {
    fn name(&self) -> &str;

    /// Tags this extension handles.
    fn tags(&self) -> &[&'static str] {
        &[]
    }

    /// Tags closing the blocks this extension opens.
    fn end_tags(&self) -> &[&'static str] {
        &[]
    }

    fn parse(&self, tag: &Tag<'_>) -> Result<Lowered> {
        Err(Error::template_syntax(format!(
            "Extension '{}' does not handle the '{}' tag (line {})",
            self.name(),
            tag.name,
            tag.line
        )))
    }

    /// Registers the extension's filters, tests and globals.
    fn install(&self, env: &mut Environment, cx: &InstallContext<'_>) -> Result<()>;
}

// A block tag waiting for its end tag.
struct OpenBlock {
    tag: String,
    end_tag: &'static str,
    close: String,
    line: usize,
}

// Returns the index right after `delim`, skipping over quoted strings.
fn find_close(source: &str, from: usize, delim: &str) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = from;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(_) if b == b'\\' => i += 1,
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if bytes[i..].starts_with(delim.as_bytes()) => return Some(i + delim.len()),
            None => {}
        }
        i += 1;
    }
    None
}

fn line_of(source: &str, index: usize) -> usize {
    source[..index].matches('\n').count() + 1
}

// Splits `- body +` into its whitespace control markers and the body.
fn split_markers(inner: &str) -> (&str, &str, &str) {
    let (left, rest) = match inner.chars().next() {
        Some(c @ ('-' | '+')) => inner.split_at(c.len_utf8()),
        _ => ("", inner),
    };
    let (body, right) = match rest.chars().last() {
        Some('-' | '+') => rest.split_at(rest.len() - 1),
        _ => (rest, ""),
    };
    (left, body, right)
}

fn statement(left: &str, body: &str, newlines: usize, right: &str) -> String {
    format!("{{%{} {}{} {}%}}", left, body, "\n".repeat(newlines), right)
}

/// Rewrites the custom tags of `source` into engine syntax.
pub fn lower(source: &str, extensions: &[Arc<dyn Extension>]) -> Result<String> {
    if extensions.iter().all(|e| e.tags().is_empty()) {
        return Ok(source.to_string());
    }

    let mut out = String::with_capacity(source.len());
    let mut stack: Vec<OpenBlock> = Vec::new();
    let mut pos = 0;

    while let Some(offset) = source[pos..].find('{') {
        let start = pos + offset;
        let rest = &source[start..];

        let end = if rest.starts_with("{#") {
            rest.find("#}").map(|i| start + i + 2)
        } else if rest.starts_with("{{") {
            find_close(source, start + 2, "}}")
        } else if rest.starts_with("{%") {
            find_close(source, start + 2, "%}")
        } else {
            out.push_str(&source[pos..=start]);
            pos = start + 1;
            continue;
        };
        // unterminated: let the engine report it
        let Some(end) = end else { break };

        if !rest.starts_with("{%") {
            out.push_str(&source[pos..end]);
            pos = end;
            continue;
        }

        let inner = &source[start + 2..end - 2];
        let (left, body, right) = split_markers(inner);
        let body = body.trim();
        let name = body.split_whitespace().next().unwrap_or_default();
        let line = line_of(source, start);
        let newlines = inner.matches('\n').count();

        out.push_str(&source[pos..start]);
        pos = end;

        if name == "raw" {
            let raw_end = RAW_END_RE.find(&source[end..]).map_or(source.len(), |m| end + m.end());
            out.push_str(&source[start..raw_end]);
            pos = raw_end;
            continue;
        }

        if let Some(extension) = extensions.iter().find(|e| e.tags().contains(&name)) {
            let tag = Tag { name, args: body[name.len()..].trim(), line };
            match extension.parse(&tag)? {
                Lowered::Expression(expr) => {
                    out.push_str(&format!("{{{{{} {}{} {}}}}}", left, expr, "\n".repeat(newlines), right));
                }
                Lowered::Block { open, end_tag, close } => {
                    out.push_str(&statement(left, &open, newlines, right));
                    stack.push(OpenBlock { tag: name.to_string(), end_tag, close, line });
                }
            }
        } else if stack.last().is_some_and(|open| open.end_tag == name) {
            if !body[name.len()..].trim().is_empty() {
                return Err(Error::template_syntax(format!(
                    "'{}' takes no arguments (line {})",
                    name, line
                )));
            }
            if let Some(open) = stack.pop() {
                out.push_str(&statement(left, &open.close, newlines, right));
            }
        } else if extensions.iter().any(|e| e.end_tags().contains(&name)) {
            let expected = match stack.last() {
                Some(open) => format!(
                    " Jinja was looking for '{}' to close '{}' from line {}.",
                    open.end_tag, open.tag, open.line
                ),
                None => String::new(),
            };
            return Err(Error::template_syntax(format!(
                "Encountered unexpected tag '{}' on line {}.{}",
                name, line, expected
            )));
        } else {
            out.push_str(&source[start..end]);
        }
    }
    out.push_str(&source[pos..]);

    if let Some(open) = stack.pop() {
        return Err(Error::template_syntax(format!(
            "Unexpected end of template. Jinja was looking for the following tags: '{}'. \
             The innermost block that needs to be closed is '{}' (line {})",
            open.end_tag, open.tag, open.line
        )));
    }
    Ok(out)
}
