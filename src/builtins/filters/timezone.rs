// Timezone conversion filters
use chrono::{DateTime, FixedOffset, SecondsFormat};
use chrono_tz::Tz;
use serde_json::value::Value;

use crate::builtins::filters::dateformat;
use crate::builtins::Args;
use crate::errors::{Error, Result};

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>().map_err(|_| Error::msg(format!("Error parsing `{}` as a timezone", name)))
}

fn render(dt: DateTime<FixedOffset>) -> Value {
    Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, false))
}

// Converts a datetime to the given timezone. Values that can't be read as a
// datetime are returned unchanged.
pub fn to_timezone(value: &Value, tz: Tz) -> Value {
    match dateformat::parse_datetime(value) {
        Some(dt) => render(dt.with_timezone(&tz).fixed_offset()),
        None => value.clone(),
    }
}

// Converts a datetime to UTC.
pub fn utc(value: &Value, _: &Args) -> Result<Value> {
    Ok(to_timezone(value, Tz::UTC))
}

// Converts a datetime to the timezone named by the argument.
pub fn timezone(value: &Value, args: &Args) -> Result<Value> {
    let name = try_get_arg!("timezone", args, 0, "tz", String);
    Ok(to_timezone(value, parse_timezone(&name)?))
}

// Converts a datetime to `default`, or to the timezone given as argument.
pub fn localtime_in(value: &Value, args: &Args, default: Tz) -> Result<Value> {
    let tz = match args.get(0, "tz") {
        Some(Value::String(name)) => parse_timezone(name)?,
        _ => default,
    };
    Ok(to_timezone(value, tz))
}
