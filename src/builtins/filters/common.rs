// Filters operating on multiple types
use chrono::{DateTime, FixedOffset, Utc};
use serde_json::value::Value;

use crate::builtins::filters::{dateformat, value_to_string};
use crate::builtins::Args;
use crate::errors::{Error, Result};

// Formats a date according to the given format string, or `default_format`
// when none is given. Values that can't be read as a date render as nothing.
pub fn date_with_default(value: &Value, args: &Args, default_format: &str) -> Result<Value> {
    if value.is_null() || value == "" {
        return Ok(Value::String(String::new()));
    }
    let format = try_get_arg!("date", args, 0, "format", String, default_format.to_string());

    match dateformat::parse_datetime(value) {
        Some(dt) => Ok(Value::String(dateformat::format(&dt, &format))),
        None => Ok(Value::String(String::new())),
    }
}

// Formats a date with Django's default `N j, Y` format.
pub fn date(value: &Value, args: &Args) -> Result<Value> {
    date_with_default(value, args, dateformat::DEFAULT_DATE_FORMAT)
}

// Formats a time with Django's default `P` format.
pub fn time(value: &Value, args: &Args) -> Result<Value> {
    date_with_default(value, args, dateformat::DEFAULT_TIME_FORMAT)
}

const TIMESINCE_CHUNKS: [(i64, &str, &str); 6] = [
    (60 * 60 * 24 * 365, "year", "years"),
    (60 * 60 * 24 * 30, "month", "months"),
    (60 * 60 * 24 * 7, "week", "weeks"),
    (60 * 60 * 24, "day", "days"),
    (60 * 60, "hour", "hours"),
    (60, "minute", "minutes"),
];

fn chunk(count: i64, singular: &str, plural: &str) -> String {
    format!("{}\u{a0}{}", count, if count == 1 { singular } else { plural })
}

// Describes the time between `from` and `to` as at most two adjacent units,
// e.g. "4 days, 6 hours". Zero or negative spans read "0 minutes".
pub fn timesince_between(from: &DateTime<FixedOffset>, to: &DateTime<FixedOffset>) -> String {
    let since = (*to - *from).num_seconds();
    if since <= 0 {
        return chunk(0, "minute", "minutes");
    }

    for (i, &(seconds, singular, plural)) in TIMESINCE_CHUNKS.iter().enumerate() {
        let count = since / seconds;
        if count == 0 {
            continue;
        }
        let mut result = chunk(count, singular, plural);
        if let Some(&(seconds2, singular2, plural2)) = TIMESINCE_CHUNKS.get(i + 1) {
            let count2 = (since - seconds * count) / seconds2;
            if count2 != 0 {
                result.push_str(", ");
                result.push_str(&chunk(count2, singular2, plural2));
            }
        }
        return result;
    }
    chunk(0, "minute", "minutes")
}

fn reference_point(callable: &str, args: &Args) -> Result<DateTime<FixedOffset>> {
    match args.get(0, "arg") {
        Some(v) if !v.is_null() => dateformat::parse_datetime(v).ok_or_else(|| {
            Error::msg(format!("`{}` received an argument that isn't a date: `{}`", callable, v))
        }),
        _ => Ok(Utc::now().fixed_offset()),
    }
}

// Time elapsed since the value, relative to now or to the given date.
pub fn timesince(value: &Value, args: &Args) -> Result<Value> {
    let Some(dt) = dateformat::parse_datetime(value) else {
        return Ok(Value::String(String::new()));
    };
    let now = reference_point("timesince", args)?;
    Ok(Value::String(timesince_between(&dt, &now)))
}

// Time remaining until the value, relative to now or to the given date.
pub fn timeuntil(value: &Value, args: &Args) -> Result<Value> {
    let Some(dt) = dateformat::parse_datetime(value) else {
        return Ok(Value::String(String::new()));
    };
    let now = reference_point("timeuntil", args)?;
    Ok(Value::String(timesince_between(&now, &dt)))
}

// Returns the argument when the value is null, the value otherwise.
pub fn default_if_none(value: &Value, args: &Args) -> Result<Value> {
    if value.is_null() {
        return Ok(args.get(0, "default").cloned().unwrap_or_else(|| Value::String(String::new())));
    }
    Ok(value.clone())
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

// Maps true, false and null to "yes", "no", "maybe" or the comma separated
// strings passed as argument.
pub fn yesno(value: &Value, args: &Args) -> Result<Value> {
    let mapping = try_get_arg!("yesno", args, 0, "arg", String, "yes,no,maybe".to_string());
    let bits: Vec<&str> = mapping.split(',').collect();
    let (yes, no, maybe) = match bits.as_slice() {
        [yes, no, maybe] => (*yes, *no, *maybe),
        [yes, no] => (*yes, *no, *no),
        // Invalid arg
        _ => return Ok(value.clone()),
    };

    let out = if value.is_null() {
        maybe
    } else if truthy(value) {
        yes
    } else {
        no
    };
    Ok(Value::String(out.to_string()))
}

// Returns the value turned into a list of characters, or of digits for an integer.
pub fn make_list(value: &Value, _: &Args) -> Result<Value> {
    let s = value_to_string(value);
    Ok(Value::Array(s.chars().map(|c| Value::String(c.to_string())).collect()))
}

// Returns the digit at position `arg`, counting from the right starting at 1.
pub fn get_digit(value: &Value, args: &Args) -> Result<Value> {
    let position = try_get_arg!("get_digit", args, 0, "arg", i64);
    let Some(number) = value.as_i64() else {
        return Ok(value.clone());
    };
    if position < 1 {
        return Ok(value.clone());
    }
    let digits = number.unsigned_abs().to_string();
    let len = digits.len() as i64;
    if position > len {
        return Ok(Value::from(0));
    }
    let idx = (len - position) as usize;
    Ok(Value::from(i64::from(digits.as_bytes()[idx] - b'0')))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn date_default_format() {
        let result = date(&json!("2012-12-20"), &Args::default()).unwrap();
        assert_eq!(result, json!("Dec. 20, 2012"));
    }

    #[test]
    fn date_custom_format() {
        let result = date(&json!("2012-12-20"), &Args::from(vec![json!("n Y")])).unwrap();
        assert_eq!(result, json!("12 2012"));
    }

    #[test]
    fn date_of_garbage_is_empty() {
        let result = date(&json!("not a date"), &Args::default()).unwrap();
        assert_eq!(result, json!(""));
        assert_eq!(date(&Value::Null, &Args::default()).unwrap(), json!(""));
    }

    #[test]
    fn time_default_format() {
        let result = time(&json!("2012-12-20 13:30:00"), &Args::default()).unwrap();
        assert_eq!(result, json!("1:30 p.m."));
    }

    #[test]
    fn timesince_two_units() {
        let args = Args::from(vec![json!("2012-12-24 06:00:00")]);
        let result = timesince(&json!("2012-12-20 00:00:00"), &args).unwrap();
        assert_eq!(result, json!("4\u{a0}days, 6\u{a0}hours"));
    }

    #[test]
    fn timesince_future_is_zero() {
        let args = Args::from(vec![json!("2012-12-20 00:00:00")]);
        let result = timesince(&json!("2012-12-24 00:00:00"), &args).unwrap();
        assert_eq!(result, json!("0\u{a0}minutes"));
    }

    #[test]
    fn timeuntil_counts_forward() {
        let args = Args::from(vec![json!("2012-12-20 00:00:00")]);
        let result = timeuntil(&json!("2012-12-27 00:00:00"), &args).unwrap();
        assert_eq!(result, json!("1\u{a0}week"));
    }

    #[test]
    fn default_if_none_only_replaces_null() {
        let args = Args::from(vec![json!("nothing")]);
        assert_eq!(default_if_none(&Value::Null, &args).unwrap(), json!("nothing"));
        assert_eq!(default_if_none(&json!(""), &args).unwrap(), json!(""));
    }

    #[test]
    fn yesno_mappings() {
        assert_eq!(yesno(&json!(true), &Args::default()).unwrap(), json!("yes"));
        assert_eq!(yesno(&json!(false), &Args::default()).unwrap(), json!("no"));
        assert_eq!(yesno(&Value::Null, &Args::default()).unwrap(), json!("maybe"));
        let args = Args::from(vec![json!("si,no")]);
        assert_eq!(yesno(&Value::Null, &args).unwrap(), json!("no"));
    }

    #[test]
    fn make_list_splits_chars() {
        assert_eq!(make_list(&json!("abc"), &Args::default()).unwrap(), json!(["a", "b", "c"]));
        assert_eq!(make_list(&json!(123), &Args::default()).unwrap(), json!(["1", "2", "3"]));
    }

    #[test]
    fn get_digit_from_the_right() {
        let args = Args::from(vec![json!(2)]);
        assert_eq!(get_digit(&json!(123456789), &args).unwrap(), json!(8));
        let args = Args::from(vec![json!(12)]);
        assert_eq!(get_digit(&json!(123), &args).unwrap(), json!(0));
        // 9223372036854775808
        assert_eq!(get_digit(&json!(i64::MIN), &Args::from(vec![json!(1)])).unwrap(), json!(8));
    }
}
