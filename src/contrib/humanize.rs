// Django's `humanize` filters as an installable app.
use std::path::Path;

use chrono::{DateTime, FixedOffset, Utc};
use serde_json::Value;

use crate::app::App;
use crate::builtins::filters::common::timesince_between;
use crate::builtins::filters::dateformat::{self, DEFAULT_DATE_FORMAT};
use crate::builtins::Args;
use crate::errors::Result;
use crate::library::Library;

const AP_NUMBERS: [&str; 9] = ["one", "two", "three", "four", "five", "six", "seven", "eight", "nine"];

const LARGE_NUMBERS: [(i32, &str); 10] = [
    (6, "million"),
    (9, "billion"),
    (12, "trillion"),
    (15, "quadrillion"),
    (18, "quintillion"),
    (21, "sextillion"),
    (24, "septillion"),
    (27, "octillion"),
    (30, "nonillion"),
    (33, "decillion"),
];

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// 1 -> "1st", 2 -> "2nd", 11 -> "11th". Non integers are returned unchanged.
pub fn ordinal(value: &Value, _: &Args) -> Result<Value> {
    let Some(n) = as_integer(value) else {
        return Ok(value.clone());
    };
    if n < 0 {
        return Ok(Value::String(n.to_string()));
    }
    let suffix = match (n % 100, n % 10) {
        (11..=13, _) => "th",
        (_, 1) => "st",
        (_, 2) => "nd",
        (_, 3) => "rd",
        _ => "th",
    };
    Ok(Value::String(format!("{}{}", n, suffix)))
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// 45000 -> "45,000". Floats keep their decimals.
pub fn intcomma(value: &Value, _: &Args) -> Result<Value> {
    let repr = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) if as_float(value).is_some() => s.trim().to_string(),
        _ => return Ok(value.clone()),
    };
    let (sign, unsigned) = match repr.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", repr.as_str()),
    };
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (unsigned, None),
    };
    let mut out = format!("{}{}", sign, group_thousands(whole));
    if let Some(fraction) = fraction {
        out.push('.');
        out.push_str(fraction);
    }
    Ok(Value::String(out))
}

// 1000000 -> "1.0 million". Values under a million are returned unchanged.
pub fn intword(value: &Value, _: &Args) -> Result<Value> {
    let Some(n) = as_float(value) else {
        return Ok(value.clone());
    };
    let magnitude = n.abs();
    if magnitude < 1e6 {
        return Ok(value.clone());
    }

    for (i, &(exponent, name)) in LARGE_NUMBERS.iter().enumerate() {
        let next = LARGE_NUMBERS.get(i + 1).map_or(f64::INFINITY, |&(e, _)| 10f64.powi(e));
        if magnitude < next {
            let scaled = (n / 10f64.powi(exponent) * 10.0).round() / 10.0;
            return Ok(Value::String(format!("{:.1} {}", scaled, name)));
        }
    }
    Ok(value.clone())
}

// 1 to 9 spelled out the Associated Press way, anything else unchanged.
pub fn apnumber(value: &Value, _: &Args) -> Result<Value> {
    match as_integer(value) {
        Some(n @ 1..=9) => Ok(Value::String(AP_NUMBERS[(n - 1) as usize].to_string())),
        _ => Ok(value.clone()),
    }
}

pub fn naturalday_at(value: &Value, args: &Args, today: DateTime<FixedOffset>) -> Result<Value> {
    let Some(dt) = dateformat::parse_datetime(value) else {
        return Ok(value.clone());
    };
    let format = try_get_arg!("naturalday", args, 0, "arg", String, DEFAULT_DATE_FORMAT.to_string());

    let days = (dt.date_naive() - today.date_naive()).num_days();
    let word = match days {
        0 => "today",
        1 => "tomorrow",
        -1 => "yesterday",
        _ => return Ok(Value::String(dateformat::format(&dt, &format))),
    };
    Ok(Value::String(word.to_string()))
}

// "today", "tomorrow" or "yesterday" when the date is close to today,
// otherwise the date formatted with the argument.
pub fn naturalday(value: &Value, args: &Args) -> Result<Value> {
    naturalday_at(value, args, Utc::now().fixed_offset())
}

fn count(n: i64, one: &str, plural: &str) -> String {
    if n == 1 {
        one.to_string()
    } else {
        format!("{} {}", n, plural)
    }
}

pub fn naturaltime_at(value: &Value, now: DateTime<FixedOffset>) -> Result<Value> {
    let Some(dt) = dateformat::parse_datetime(value) else {
        return Ok(value.clone());
    };

    let (delta, suffix) = if dt <= now { (now - dt, "ago") } else { (dt - now, "from now") };
    let seconds = delta.num_seconds();

    let text = if delta.num_days() > 0 {
        let (from, to) = if dt <= now { (dt, now) } else { (now, dt) };
        format!("{} {}", timesince_between(&from, &to), suffix)
    } else if seconds == 0 {
        "now".to_string()
    } else if seconds < 60 {
        format!("{} {}", count(seconds, "a second", "seconds"), suffix)
    } else if seconds < 60 * 60 {
        format!("{} {}", count(seconds / 60, "a minute", "minutes"), suffix)
    } else {
        format!("{} {}", count(seconds / 3600, "an hour", "hours"), suffix)
    };
    Ok(Value::String(text))
}

// How long ago, or from now, the value is: "now", "3 minutes ago",
// "an hour from now", "2 days, 3 hours ago".
pub fn naturaltime(value: &Value, _: &Args) -> Result<Value> {
    naturaltime_at(value, Utc::now().fixed_offset())
}

/// The humanize app.
#[derive(Debug, Default, Clone, Copy)]
pub struct Humanize;

impl App for Humanize {
    fn name(&self) -> &str {
        "django_jinja.contrib.humanize"
    }

    fn path(&self) -> &Path {
        Path::new("contrib/humanize")
    }

    fn register(&self, library: &mut Library) {
        library
            .register_filter(ordinal)
            .register_filter(intcomma)
            .register_filter(intword)
            .register_filter(apnumber)
            .register_filter(naturalday)
            .register_filter(naturaltime);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn call(filter: fn(&Value, &Args) -> Result<Value>, value: Value) -> Value {
        filter(&value, &Args::default()).unwrap()
    }

    #[test]
    fn ordinals() {
        for (n, expected) in [(1, "1st"), (2, "2nd"), (3, "3rd"), (4, "4th"), (11, "11th"), (12, "12th"), (22, "22nd"), (101, "101st"), (111, "111th")] {
            assert_eq!(call(ordinal, json!(n)), json!(expected));
        }
        assert_eq!(call(ordinal, json!("x")), json!("x"));
    }

    #[test]
    fn intcomma_groups_thousands() {
        assert_eq!(call(intcomma, json!(100)), json!("100"));
        assert_eq!(call(intcomma, json!(1000)), json!("1,000"));
        assert_eq!(call(intcomma, json!(45000)), json!("45,000"));
        assert_eq!(call(intcomma, json!(-1234567)), json!("-1,234,567"));
        assert_eq!(call(intcomma, json!(1234.5)), json!("1,234.5"));
        assert_eq!(call(intcomma, json!("10311")), json!("10,311"));
        assert_eq!(call(intcomma, json!("abc")), json!("abc"));
    }

    #[test]
    fn intword_scales() {
        assert_eq!(call(intword, json!(100)), json!(100));
        assert_eq!(call(intword, json!(1000000)), json!("1.0 million"));
        assert_eq!(call(intword, json!(1200000)), json!("1.2 million"));
        assert_eq!(call(intword, json!(1290000000u64)), json!("1.3 billion"));
    }

    #[test]
    fn apnumbers() {
        assert_eq!(call(apnumber, json!(1)), json!("one"));
        assert_eq!(call(apnumber, json!(9)), json!("nine"));
        assert_eq!(call(apnumber, json!(10)), json!(10));
    }

    #[test]
    fn naturalday_words() {
        let today = DateTime::parse_from_rfc3339("2012-12-20T10:00:00+00:00").unwrap();
        let args = Args::default();
        assert_eq!(naturalday_at(&json!("2012-12-20"), &args, today).unwrap(), json!("today"));
        assert_eq!(naturalday_at(&json!("2012-12-21 08:00"), &args, today).unwrap(), json!("tomorrow"));
        assert_eq!(naturalday_at(&json!("2012-12-19"), &args, today).unwrap(), json!("yesterday"));
        assert_eq!(naturalday_at(&json!("2012-12-01"), &args, today).unwrap(), json!("Dec. 1, 2012"));
        let args = Args::from(vec![json!("n Y")]);
        assert_eq!(naturalday_at(&json!("2012-12-01"), &args, today).unwrap(), json!("12 2012"));
    }

    #[test]
    fn naturaltime_spans() {
        let now = DateTime::parse_from_rfc3339("2012-12-20T10:00:00+00:00").unwrap();
        let at = |delta: Duration| json!((now + delta).to_rfc3339());
        assert_eq!(naturaltime_at(&at(Duration::zero()), now).unwrap(), json!("now"));
        assert_eq!(naturaltime_at(&at(Duration::seconds(-1)), now).unwrap(), json!("a second ago"));
        assert_eq!(naturaltime_at(&at(Duration::seconds(-30)), now).unwrap(), json!("30 seconds ago"));
        assert_eq!(naturaltime_at(&at(Duration::minutes(-1)), now).unwrap(), json!("a minute ago"));
        assert_eq!(naturaltime_at(&at(Duration::hours(-3)), now).unwrap(), json!("3 hours ago"));
        assert_eq!(naturaltime_at(&at(Duration::minutes(5)), now).unwrap(), json!("5 minutes from now"));
        assert_eq!(naturaltime_at(&at(Duration::hours(1)), now).unwrap(), json!("an hour from now"));
        assert_eq!(
            naturaltime_at(&at(Duration::days(-2)), now).unwrap(),
            json!("2\u{a0}days ago")
        );
    }

    #[test]
    fn registers_every_filter() {
        let apps: Vec<std::sync::Arc<dyn App>> = vec![std::sync::Arc::new(Humanize)];
        let library = Library::discover(&apps);
        assert_eq!(
            library.filter_names().collect::<Vec<_>>(),
            vec!["apnumber", "intcomma", "intword", "naturalday", "naturaltime", "ordinal"]
        );
    }
}
