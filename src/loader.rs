// Template sources: the configured directories, plus the sources handed to
// `from_string`. Every source goes through the tag extensions' lowering pass
// before the engine parses it.
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, RwLock};

use globwalk::GlobWalkerBuilder;

use crate::errors::{Error, Result};
use crate::extensions::{lower, Extension};

// Synthetic names of string templates.
const STRING_TEMPLATE_PREFIX: &str = "__from_string_";

#[derive(Debug, Default)]
struct StringTemplates {
    by_name: HashMap<String, String>,
    by_source: HashMap<String, String>,
}

fn poisoned<T>(_: T) -> Error {
    Error::msg("string template lock was poisoned")
}

pub struct TemplateLoader {
    dirs: Vec<PathBuf>,
    strings: RwLock<StringTemplates>,
    extensions: Vec<Arc<dyn Extension>>,
}

// A name may not escape its search directory.
fn is_safe_name(name: &str) -> bool {
    let path = Path::new(name);
    !name.is_empty()
        && path.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

impl TemplateLoader {
    /// `dirs` are searched in order. `extensions` lower their tags in every
    /// loaded source.
    pub fn new(dirs: Vec<PathBuf>, extensions: Vec<Arc<dyn Extension>>) -> Self {
        Self { dirs, strings: RwLock::new(StringTemplates::default()), extensions }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Registers a template source and returns the name it is loaded under.
    /// The same source always gets the same name. Sources are kept, and
    /// compiled, for the loader's lifetime like file templates, so this is
    /// meant for a fixed set of sources rather than per-request text.
    pub fn add_string(&self, source: &str) -> Result<String> {
        if let Some(name) = self.strings.read().map_err(poisoned)?.by_source.get(source) {
            return Ok(name.clone());
        }

        let mut strings = self.strings.write().map_err(poisoned)?;
        if let Some(name) = strings.by_source.get(source) {
            return Ok(name.clone());
        }
        let name = format!("{}{}", STRING_TEMPLATE_PREFIX, strings.by_name.len());
        strings.by_name.insert(name.clone(), source.to_string());
        strings.by_source.insert(source.to_string(), name.clone());
        tracing::trace!("registered string template `{}`", name);
        Ok(name)
    }

    /// How many distinct string templates have been registered.
    pub fn string_count(&self) -> Result<usize> {
        Ok(self.strings.read().map_err(poisoned)?.by_name.len())
    }

    /// The raw source of `name`, `None` when no directory or string template
    /// provides it.
    pub fn get_source(&self, name: &str) -> Result<Option<String>> {
        if name.starts_with(STRING_TEMPLATE_PREFIX) {
            let strings = self.strings.read().map_err(poisoned)?;
            if let Some(source) = strings.by_name.get(name) {
                return Ok(Some(source.clone()));
            }
        }

        if !is_safe_name(name) {
            return Ok(None);
        }

        for dir in &self.dirs {
            let path = dir.join(name);
            match std::fs::read_to_string(&path) {
                Ok(source) => {
                    tracing::trace!("loaded template `{}` from {}", name, path.display());
                    return Ok(Some(source));
                }
                Err(e) if e.kind() == IoErrorKind::NotFound => continue,
                Err(_) if path.is_dir() => continue,
                Err(e) => {
                    return Err(Error::chain(format!("Couldn't read template '{:?}'", path), e));
                }
            }
        }
        Ok(None)
    }

    /// Loads `name` and lowers its custom tags.
    pub fn load(&self, name: &str) -> Result<Option<String>> {
        match self.get_source(name)? {
            Some(source) => lower(&source, &self.extensions)
                .map(Some)
                .map_err(|e| Error::template_syntax(format!("{} (in {})", e, name)).with_source(e)),
            None => Ok(None),
        }
    }

    // The engine's loader callback.
    pub(crate) fn load_for_engine(&self, name: &str) -> std::result::Result<Option<String>, minijinja::Error> {
        self.load(name).map_err(Error::into_engine)
    }

    /// Every template file under the search directories, as sorted,
    /// deduplicated, `/`-separated names.
    pub fn list_templates(&self) -> Result<Vec<String>> {
        let mut names = BTreeSet::new();

        for dir in &self.dirs {
            if !dir.is_dir() {
                continue;
            }
            // globwalk returns nothing for paths starting with `./`
            let root = std::fs::canonicalize(dir).unwrap_or_else(|_| dir.clone());
            let walker = GlobWalkerBuilder::from_patterns(&root, &["**/*"])
                .follow_links(true)
                .build()
                .map_err(|e| Error::chain(format!("Couldn't list templates in {:?}", dir), e))?;

            for entry in walker.filter_map(std::result::Result::ok) {
                let path = entry.into_path();
                if !path.is_file() {
                    continue;
                }
                if let Ok(relative) = path.strip_prefix(&root) {
                    // unify on forward slash
                    names.insert(relative.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        Ok(names.into_iter().collect())
    }
}

impl fmt::Debug for TemplateLoader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TemplateLoader")
            .field("dirs", &self.dirs)
            .field("extensions", &self.extensions.iter().map(|e| e.name()).collect::<Vec<_>>())
            .finish()
    }
}
