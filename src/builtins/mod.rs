use std::collections::BTreeMap;

use serde_json::Value;

pub mod filters;
pub mod functions;
pub mod testers;

/// Arguments passed to a filter, test or function from a template.
///
/// Django filters take their arguments positionally (`truncatechars(5)`), the
/// engine also allows keywords (`truncatechars(length=5)`). [`Args::get`]
/// accepts both shapes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Args {
    positional: Vec<Value>,
    named: BTreeMap<String, Value>,
}

impl Args {
    pub fn new(positional: Vec<Value>, named: BTreeMap<String, Value>) -> Self {
        Self { positional, named }
    }

    /// Looks the argument up by keyword first, then by position.
    pub fn get(&self, pos: usize, name: &str) -> Option<&Value> {
        self.named.get(name).or_else(|| self.positional.get(pos))
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn named(&self) -> &BTreeMap<String, Value> {
        &self.named
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<Value>> for Args {
    fn from(positional: Vec<Value>) -> Self {
        Self { positional, named: BTreeMap::new() }
    }
}
