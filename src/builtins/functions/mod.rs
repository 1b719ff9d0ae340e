use serde_json::Value;

use crate::builtins::Args;
use crate::errors::Result;

pub mod common;

// The global function type definition
pub trait Function: Sync + Send {
    // The global function type definition
    fn call(&self, args: &Args) -> Result<Value>;

    // Whether the current function's output should be treated as safe, defaults to `false`
    fn is_safe(&self) -> bool {
        false
    }
}

impl<F> Function for F
where
    F: Fn(&Args) -> Result<Value> + Sync + Send,
{
    fn call(&self, args: &Args) -> Result<Value> {
        self(args)
    }
}

/// Marks the string output of a function as safe markup.
pub struct SafeFunction<F>(pub F);

impl<F> Function for SafeFunction<F>
where
    F: Fn(&Args) -> Result<Value> + Sync + Send,
{
    fn call(&self, args: &Args) -> Result<Value> {
        (self.0)(args)
    }

    fn is_safe(&self) -> bool {
        true
    }
}
