use std::collections::BTreeMap;

use minijinja::Value;
use serde::Serialize;

use crate::markup::{safe, HtmlSafe};

/// A layered render context.
///
/// Layers are pushed and popped like Django's context stack; [`Context::flatten`]
/// merges them into the single mapping handed to the engine, later layers
/// overriding earlier ones.
#[derive(Clone, Debug, PartialEq)]
pub struct Context {
    layers: Vec<BTreeMap<String, Value>>,
}

impl Context {
    pub fn new() -> Self {
        Self { layers: vec![BTreeMap::new()] }
    }

    /// Builds a context from any serializable map-like value.
    pub fn from_serialize<T: Serialize>(value: &T) -> Self {
        let mut context = Self::new();
        context.extend_from(&Value::from_serialize(value));
        context
    }

    fn extend_from(&mut self, value: &Value) {
        let Ok(keys) = value.try_iter() else { return };
        for key in keys {
            if let (Some(name), Ok(item)) = (key.as_str(), value.get_item(&key)) {
                self.insert_value(name, item);
            }
        }
    }

    /// Pushes a new empty layer.
    pub fn push(&mut self) {
        self.layers.push(BTreeMap::new());
    }

    /// Pops the top layer. The bottom layer is never removed.
    pub fn pop(&mut self) -> Option<BTreeMap<String, Value>> {
        if self.layers.len() > 1 {
            self.layers.pop()
        } else {
            None
        }
    }

    /// Inserts a serializable value in the top layer.
    pub fn insert<T: Serialize + ?Sized>(&mut self, key: impl Into<String>, value: &T) {
        self.insert_value(key, Value::from_serialize(value));
    }

    /// Inserts an engine value as-is in the top layer.
    pub fn insert_value(&mut self, key: impl Into<String>, value: Value) {
        if let Some(top) = self.layers.last_mut() {
            top.insert(key.into(), value);
        }
    }

    /// Inserts a host value that is already safe HTML.
    pub fn insert_safe<T: HtmlSafe + ?Sized>(&mut self, key: impl Into<String>, value: &T) {
        self.insert_value(key, safe(value));
    }

    /// Inserts every pair in the top layer.
    pub fn update<I, K>(&mut self, values: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        for (key, value) in values {
            self.insert_value(key, value);
        }
    }

    /// Looks a name up from the top layer down.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.layers.iter().rev().find_map(|layer| layer.get(key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Merges every layer into one mapping, later layers winning.
    pub fn flatten(&self) -> BTreeMap<String, Value> {
        let mut flat = BTreeMap::new();
        for layer in &self.layers {
            for (key, value) in layer {
                flat.insert(key.clone(), value.clone());
            }
        }
        flat
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl From<BTreeMap<String, Value>> for Context {
    fn from(layer: BTreeMap<String, Value>) -> Self {
        Self { layers: vec![layer] }
    }
}
