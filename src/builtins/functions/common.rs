use chrono::prelude::*;
use serde_json::value::Value;

use crate::builtins::filters::dateformat;
use crate::builtins::Args;
use crate::errors::Result;

// Current date and time. With a format argument it renders like the `date`
// filter, otherwise it returns an RFC 3339 string or a timestamp.
pub fn now(args: &Args) -> Result<Value> {
    let utc = try_get_arg!("now", args, 1, "utc", bool, false);
    let timestamp = try_get_arg!("now", args, 2, "timestamp", bool, false);
    let format = try_get_arg!("now", args, 0, "format", Option<String>, None);

    let datetime = if utc { Utc::now().fixed_offset() } else { Local::now().fixed_offset() };
    if timestamp {
        return Ok(Value::from(datetime.timestamp()));
    }

    match format {
        Some(format) => Ok(Value::String(dateformat::format(&datetime, &format))),
        None => Ok(Value::String(datetime.to_rfc3339())),
    }
}
