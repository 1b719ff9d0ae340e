// Translation catalogs for the `_`, `gettext` and `ngettext` globals.
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::Deserialize;
use serde_json::Value;

use crate::builtins::filters::value_to_string;
use crate::errors::{Error, Result};

lazy_static! {
    static ref NAMED_PLACEHOLDER_RE: Regex = Regex::new(r"%\((\w+)\)s|%%").unwrap();
}

pub trait Translations: Send + Sync {
    fn gettext(&self, message: &str) -> String;

    fn ngettext(&self, singular: &str, plural: &str, n: i64) -> String;
}

/// Returns every message untranslated.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTranslations;

impl Translations for NullTranslations {
    fn gettext(&self, message: &str) -> String {
        message.to_string()
    }

    fn ngettext(&self, singular: &str, plural: &str, n: i64) -> String {
        if n == 1 { singular } else { plural }.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
struct PluralForms {
    singular: String,
    plural: String,
}

/// The translations of one language.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Catalog {
    messages: HashMap<String, String>,
    plurals: HashMap<String, PluralForms>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::chain(format!("Couldn't read translation catalog `{}`", path.display()), e)
        })?;
        Self::from_json(&json)
    }

    pub fn message(mut self, message: &str, translated: &str) -> Self {
        self.messages.insert(message.to_string(), translated.to_string());
        self
    }

    pub fn plural(mut self, singular: &str, translated_singular: &str, translated_plural: &str) -> Self {
        self.plurals.insert(
            singular.to_string(),
            PluralForms { singular: translated_singular.to_string(), plural: translated_plural.to_string() },
        );
        self
    }
}

impl Translations for Catalog {
    fn gettext(&self, message: &str) -> String {
        self.messages.get(message).cloned().unwrap_or_else(|| message.to_string())
    }

    fn ngettext(&self, singular: &str, plural: &str, n: i64) -> String {
        match self.plurals.get(singular) {
            Some(forms) if n == 1 => forms.singular.clone(),
            Some(forms) => forms.plural.clone(),
            None => NullTranslations.ngettext(singular, plural, n),
        }
    }
}

// Python-style `%(name)s` interpolation used by newstyle gettext. Unknown
// names are left in place, `%%` becomes `%`.
pub(crate) fn interpolate(message: &str, variables: &BTreeMap<String, Value>) -> String {
    NAMED_PLACEHOLDER_RE
        .replace_all(message, |caps: &Captures| match caps.get(1) {
            Some(name) => match variables.get(name.as_str()) {
                Some(value) => value_to_string(value),
                None => caps[0].to_string(),
            },
            None => "%".to_string(),
        })
        .into_owned()
}
