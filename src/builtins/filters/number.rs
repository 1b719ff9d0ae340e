// Filters operating on numbers
use serde_json::value::Value;

#[cfg(feature = "humansize")]
use humansize::{format_size, WINDOWS};

use crate::builtins::filters::value_to_string;
use crate::builtins::Args;
use crate::errors::{Error, Result};

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
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

// Adds the argument to the value: integers are summed, strings and arrays
// concatenated. Anything else renders as nothing.
pub fn add(value: &Value, args: &Args) -> Result<Value> {
    let Some(arg) = args.get(0, "arg") else {
        return Err(Error::msg("`add` expected an arg called `arg`"));
    };

    if let (Some(a), Some(b)) = (as_integer(value), as_integer(arg)) {
        return Ok(match a.checked_add(b) {
            Some(sum) => Value::from(sum),
            // past the i64 range
            None => Value::from(a as f64 + b as f64),
        });
    }
    match (value, arg) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => Ok(Value::from(a + b)),
            _ => Ok(Value::String(String::new())),
        },
        (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
        (Value::Array(a), Value::Array(b)) => {
            Ok(Value::Array(a.iter().chain(b.iter()).cloned().collect()))
        }
        _ => Ok(Value::String(String::new())),
    }
}

fn group_thousands(integer_part: &str) -> String {
    let (sign, digits) = match integer_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", integer_part),
    };
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    format!("{}{}", sign, out)
}

// Rounds a floating-point number to a number of decimal places.
//
// Without an argument it keeps one decimal, dropped entirely when the value
// is a whole number. A positive argument always shows that many decimals,
// a negative one shows them only when needed. A `g` suffix on the argument
// groups the integer part by thousands.
pub fn floatformat(value: &Value, args: &Args) -> Result<Value> {
    let Some(number) = as_float(value) else {
        return Ok(Value::String(String::new()));
    };

    let raw = match args.get(0, "arg") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => "-1".to_string(),
    };
    let (raw, grouping) = match raw.strip_suffix('g') {
        Some(rest) => (if rest.is_empty() { "-1".to_string() } else { rest.to_string() }, true),
        None => (raw, false),
    };
    let Ok(precision) = raw.trim().parse::<i32>() else {
        return Ok(Value::String(value_to_string(value)));
    };

    let places = precision.unsigned_abs() as usize;
    let multiplier = 10f64.powi(places as i32);
    let rounded = (number * multiplier).round() / multiplier;

    let formatted = if precision < 0 && (rounded - rounded.trunc()).abs() < f64::EPSILON {
        format!("{}", rounded.trunc() as i64)
    } else {
        format!("{:.*}", places, rounded)
    };
    // -0.0 reads 0.0
    let formatted = match formatted.strip_prefix('-') {
        Some(rest) if rest.chars().all(|c| c == '0' || c == '.') => rest.to_string(),
        _ => formatted,
    };

    if !grouping {
        return Ok(Value::String(formatted));
    }
    let (integer_part, decimals) = match formatted.split_once('.') {
        Some((i, d)) => (i.to_string(), format!(".{}", d)),
        None => (formatted.clone(), String::new()),
    };
    Ok(Value::String(format!("{}{}", group_thousands(&integer_part), decimals)))
}

// Returns a singular or plural suffix depending on the value. The argument
// is either a plural suffix (`es`) or `singular,plural` (`y,ies`).
pub fn pluralize(value: &Value, args: &Args) -> Result<Value> {
    let suffix = try_get_arg!("pluralize", args, 0, "arg", String, "s".to_string());
    let suffix = if suffix.contains(',') { suffix } else { format!(",{}", suffix) };
    let bits: Vec<&str> = suffix.split(',').collect();
    if bits.len() > 2 {
        return Ok(Value::String(String::new()));
    }
    let (singular, plural) = (bits[0], bits[1]);

    let is_singular = match value {
        Value::Number(_) | Value::String(_) if as_float(value).is_some() => {
            as_float(value).map_or(false, |f| f == 1.0)
        }
        Value::Bool(b) => *b,
        Value::Array(a) => a.len() == 1,
        Value::Object(o) => o.len() == 1,
        _ => return Ok(Value::String(String::new())),
    };
    Ok(Value::String(if is_singular { singular } else { plural }.to_string()))
}

// Returns true if the value is divisible by the argument.
pub fn divisibleby(value: &Value, args: &Args) -> Result<Value> {
    let divisor = try_get_arg!("divisibleby", args, 0, "arg", i64);
    let Some(number) = as_integer(value) else {
        return Err(Error::msg(format!("`divisibleby` was called on a non-integer: `{}`", value)));
    };
    if divisor == 0 {
        return Err(Error::msg("`divisibleby` was called with 0"));
    }
    // only `i64::MIN % -1` overflows, and it is divisible
    Ok(Value::Bool(number.checked_rem(divisor).map_or(true, |r| r == 0)))
}

// Formats the value like a "human-readable" file size (i.e. '13 KB',
// '4.1 MB', '102 bytes'). Spaces are non-breaking.
#[cfg(feature = "humansize")]
pub fn filesizeformat(value: &Value, _: &Args) -> Result<Value> {
    let Some(bytes) = as_float(value) else {
        return Ok(Value::String("0\u{a0}bytes".to_string()));
    };
    let negative = bytes < 0.0;
    let bytes = bytes.abs().trunc() as u64;

    let formatted = if bytes < 1024 {
        format!("{} {}", bytes, if bytes == 1 { "byte" } else { "bytes" })
    } else {
        format_size(bytes, WINDOWS.decimal_places(1).decimal_zeroes(1))
    };
    let formatted = formatted.replace("kB", "KB").replace(' ', "\u{a0}");
    Ok(Value::String(if negative { format!("-{}", formatted) } else { formatted }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn add_integers_and_strings() {
        assert_eq!(add(&json!(3), &Args::from(vec![json!(2)])).unwrap(), json!(5));
        assert_eq!(add(&json!("3"), &Args::from(vec![json!(2)])).unwrap(), json!(5));
        assert_eq!(add(&json!("a"), &Args::from(vec![json!("b")])).unwrap(), json!("ab"));
        assert_eq!(add(&json!([1]), &Args::from(vec![json!([2])])).unwrap(), json!([1, 2]));
        assert_eq!(add(&json!("a"), &Args::from(vec![json!(1)])).unwrap(), json!(""));
    }

    #[test]
    fn add_past_the_integer_range() {
        assert_eq!(add(&json!(i64::MAX), &Args::from(vec![json!(1)])).unwrap(), json!(i64::MAX as f64 + 1.0));
        assert_eq!(add(&json!(i64::MIN), &Args::from(vec![json!(-1)])).unwrap(), json!(i64::MIN as f64 - 1.0));
        assert_eq!(add(&json!(i64::MAX), &Args::from(vec![json!(-1)])).unwrap(), json!(i64::MAX - 1));
    }

    #[test]
    fn floatformat_defaults() {
        let tests = vec![
            (json!(34.23234), "34.2"),
            (json!(34.00000), "34"),
            (json!(34.26000), "34.3"),
            (json!("34.23234"), "34.2"),
            (json!("foo"), ""),
        ];
        for (input, expected) in tests {
            assert_eq!(floatformat(&input, &Args::default()).unwrap(), json!(expected));
        }
    }

    #[test]
    fn floatformat_with_precision() {
        let three = Args::from(vec![json!(3)]);
        assert_eq!(floatformat(&json!(34.23234), &three).unwrap(), json!("34.232"));
        assert_eq!(floatformat(&json!(34.0), &three).unwrap(), json!("34.000"));
        let minus_three = Args::from(vec![json!(-3)]);
        assert_eq!(floatformat(&json!(34.0), &minus_three).unwrap(), json!("34"));
        assert_eq!(floatformat(&json!(34.23234), &minus_three).unwrap(), json!("34.232"));
        let zero = Args::from(vec![json!(0)]);
        assert_eq!(floatformat(&json!(39.56), &zero).unwrap(), json!("40"));
    }

    #[test]
    fn floatformat_grouping() {
        let args = Args::from(vec![json!("2g")]);
        assert_eq!(floatformat(&json!(1234567.891), &args).unwrap(), json!("1,234,567.89"));
    }

    #[test]
    fn pluralize_suffixes() {
        assert_eq!(pluralize(&json!(1), &Args::default()).unwrap(), json!(""));
        assert_eq!(pluralize(&json!(2), &Args::default()).unwrap(), json!("s"));
        assert_eq!(pluralize(&json!(0), &Args::from(vec![json!("es")])).unwrap(), json!("es"));
        assert_eq!(pluralize(&json!(1), &Args::from(vec![json!("y,ies")])).unwrap(), json!("y"));
        assert_eq!(pluralize(&json!(3), &Args::from(vec![json!("y,ies")])).unwrap(), json!("ies"));
        assert_eq!(pluralize(&json!([1]), &Args::default()).unwrap(), json!(""));
        assert_eq!(pluralize(&json!(2), &Args::from(vec![json!("a,b,c")])).unwrap(), json!(""));
    }

    #[test]
    fn pluralize_strings() {
        // numeric strings count as numbers, any other string gives nothing
        assert_eq!(pluralize(&json!("1"), &Args::default()).unwrap(), json!(""));
        assert_eq!(pluralize(&json!("2"), &Args::default()).unwrap(), json!("s"));
        assert_eq!(pluralize(&json!("1.0"), &Args::from(vec![json!("y,ies")])).unwrap(), json!("y"));
        assert_eq!(pluralize(&json!("a"), &Args::default()).unwrap(), json!(""));
        assert_eq!(pluralize(&json!("abc"), &Args::default()).unwrap(), json!(""));
        assert_eq!(pluralize(&json!(""), &Args::from(vec![json!("y,es")])).unwrap(), json!(""));
        assert_eq!(pluralize(&json!(["a", "b"]), &Args::default()).unwrap(), json!("s"));
    }

    #[test]
    fn divisibleby_filter() {
        assert_eq!(divisibleby(&json!(21), &Args::from(vec![json!(3)])).unwrap(), json!(true));
        assert_eq!(divisibleby(&json!(20), &Args::from(vec![json!(3)])).unwrap(), json!(false));
        assert_eq!(divisibleby(&json!(i64::MIN), &Args::from(vec![json!(-1)])).unwrap(), json!(true));
        assert_eq!(divisibleby(&json!(i64::MAX), &Args::from(vec![json!(i64::MIN)])).unwrap(), json!(false));
    }

    #[cfg(feature = "humansize")]
    #[test]
    fn filesizeformat_units() {
        assert_eq!(filesizeformat(&json!(1), &Args::default()).unwrap(), json!("1\u{a0}byte"));
        assert_eq!(filesizeformat(&json!(1023), &Args::default()).unwrap(), json!("1023\u{a0}bytes"));
        let kilo = filesizeformat(&json!(2048), &Args::default()).unwrap();
        let kilo = kilo.as_str().unwrap();
        assert!(kilo.starts_with('2'));
        assert!(kilo.ends_with("\u{a0}KB"));
        assert_eq!(filesizeformat(&json!(-1), &Args::default()).unwrap(), json!("-1\u{a0}byte"));
    }
}
