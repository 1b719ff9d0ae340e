use regex::Regex;
use serde_json::value::Value;

use crate::builtins::Args;
use crate::errors::{Error, Result};

// The tester function type definition
pub trait Test: Sync + Send {
    // `value` is `None` when the tested variable is undefined
    fn test(&self, value: Option<&Value>, args: &Args) -> Result<bool>;
}

impl<F> Test for F
where
    F: Fn(Option<&Value>, &Args) -> Result<bool> + Sync + Send,
{
    fn test(&self, value: Option<&Value>, args: &Args) -> Result<bool> {
        self(value, args)
    }
}

// Check that the number of args match what was expected
pub fn number_args_allowed(tester_name: &str, max: usize, args_len: usize) -> Result<()> {
    if max == 0 && args_len > max {
        return Err(Error::msg(format!(
            "Tester `{}` was called with some args but this test doesn't take args",
            tester_name
        )));
    }

    if args_len > max {
        return Err(Error::msg(format!(
            "Tester `{}` was called with {} args, the max number is {}",
            tester_name, args_len, max
        )));
    }

    Ok(())
}

// Called to check if the Value is defined and return an Err if not
pub fn value_defined(tester_name: &str, value: Option<&Value>) -> Result<()> {
    if value.is_none() {
        return Err(Error::msg(format!(
            "Tester `{}` was called on an undefined variable",
            tester_name
        )));
    }

    Ok(())
}

// Helper function to extract string from an [`Option<Value>`] to remove boilerplate
// with tester error handling
pub fn extract_string<'a>(
    tester_name: &str,
    part: &str,
    value: Option<&'a Value>,
) -> Result<&'a str> {
    match value.and_then(Value::as_str) {
        Some(s) => Ok(s),
        None => Err(Error::msg(format!(
            "Tester `{}` was called {} that isn't a string",
            tester_name, part
        ))),
    }
}

// Returns true if `value` is a string and matches the regex in the argument. Otherwise, returns false.
pub fn matching(value: Option<&Value>, args: &Args) -> Result<bool> {
    number_args_allowed("matching", 1, args.len())?;
    value_defined("matching", value)?;

    let value = extract_string("matching", "on a variable", value)?;
    let regex = extract_string("matching", "with a parameter", args.get(0, "pattern"))?;

    let regex = match Regex::new(regex) {
        Ok(regex) => regex,
        Err(err) => {
            return Err(Error::msg(format!(
                "Tester `matching`: Invalid regular expression: {}",
                err
            )));
        }
    };

    Ok(regex.is_match(value))
}

// Django's `divisibleby` filter, usable as a test too.
pub fn divisible_by(value: Option<&Value>, args: &Args) -> Result<bool> {
    number_args_allowed("divisibleby", 1, args.len())?;
    value_defined("divisibleby", value)?;

    match value.and_then(Value::as_i64) {
        Some(val) => match args.get(0, "num").and_then(Value::as_i64) {
            Some(0) => Err(Error::msg("Tester `divisibleby` was called with 0")),
            Some(p) => Ok(val.checked_rem(p).map_or(true, |r| r == 0)),
            None => Err(Error::msg(
                "Tester `divisibleby` was called with a parameter that isn't an integer",
            )),
        },
        None => {
            Err(Error::msg("Tester `divisibleby` was called on a variable that isn't an integer"))
        }
    }
}
