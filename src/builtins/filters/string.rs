// Filters operating on string
use lazy_static::lazy_static;
use percent_encoding::{percent_encode_byte, utf8_percent_encode};
use regex::{Captures, Regex};
use serde_json::value::Value;
use unic_segment::Graphemes;

use crate::builtins::filters::value_to_string;
use crate::builtins::Args;
use crate::errors::{Error, Result};
use crate::utils::{python_title, IRI_ENCODE_SET, PYTHON_ENCODE_SET};

lazy_static! {
    static ref TITLE_APOSTROPHE_RE: Regex = Regex::new(r"([a-z])'([A-Z])").unwrap();
    static ref TITLE_DIGIT_RE: Regex = Regex::new(r"\d([A-Z])").unwrap();
    static ref FORMAT_SPEC_RE: Regex =
        Regex::new(r"^(?P<flags>[-+ #0]*)(?P<width>\d+)?(?:\.(?P<precision>\d+))?(?P<kind>[sdifFeExXor])$")
            .unwrap();
}

const TRUNCATE_END: &str = "...";

fn text(callable: &str, value: &Value) -> Result<String> {
    match value {
        Value::Array(_) | Value::Object(_) => Err(Error::msg(format!(
            "`{}` was called on an incorrect value: got `{}` but expected a String",
            callable, value
        ))),
        other => Ok(value_to_string(other)),
    }
}

// Converts a value to lowercase.
pub fn lower(value: &Value, _: &Args) -> Result<Value> {
    Ok(Value::String(text("lower", value)?.to_lowercase()))
}

// Converts a value to uppercase.
pub fn upper(value: &Value, _: &Args) -> Result<Value> {
    Ok(Value::String(text("upper", value)?.to_uppercase()))
}

// Capitalizes the first character of the value.
pub fn capfirst(value: &Value, _: &Args) -> Result<Value> {
    let s = text("capfirst", value)?;
    let mut chars = s.chars();
    match chars.next() {
        None => Ok(Value::String(String::new())),
        Some(f) => Ok(Value::String(f.to_uppercase().collect::<String>() + chars.as_str())),
    }
}

// Converts a string into titlecase, without uppercasing after an apostrophe
// or a digit.
pub fn title(value: &Value, _: &Args) -> Result<Value> {
    let s = python_title(&text("title", value)?);
    let s = TITLE_APOSTROPHE_RE
        .replace_all(&s, |caps: &Captures| caps[0].to_lowercase())
        .into_owned();
    let s = TITLE_DIGIT_RE.replace_all(&s, |caps: &Captures| caps[0].to_lowercase()).into_owned();
    Ok(Value::String(s))
}

// Escapes quotes and backslashes with a backslash.
pub fn addslashes(value: &Value, _: &Args) -> Result<Value> {
    let s = text("addslashes", value)?;
    Ok(Value::String(s.replace('\\', "\\\\").replace('\"', "\\\"").replace('\'', "\\\'")))
}

// Removes all values of arg from the given string.
pub fn cut(value: &Value, args: &Args) -> Result<Value> {
    let s = text("cut", value)?;
    let arg = try_get_arg!("cut", args, 0, "arg", String);
    Ok(Value::String(s.replace(&arg, "")))
}

fn width_arg(callable: &str, args: &Args) -> Result<usize> {
    let width = try_get_arg!(callable, args, 0, "arg", i64);
    Ok(width.max(0) as usize)
}

// Left-aligns the value in a field of a given width.
pub fn ljust(value: &Value, args: &Args) -> Result<Value> {
    let s = text("ljust", value)?;
    let width = width_arg("ljust", args)?;
    let len = s.chars().count();
    Ok(Value::String(format!("{}{}", s, " ".repeat(width.saturating_sub(len)))))
}

// Right-aligns the value in a field of a given width.
pub fn rjust(value: &Value, args: &Args) -> Result<Value> {
    let s = text("rjust", value)?;
    let width = width_arg("rjust", args)?;
    let len = s.chars().count();
    Ok(Value::String(format!("{}{}", " ".repeat(width.saturating_sub(len)), s)))
}

// Centers the value in a field of a given width, padding like Python's `str.center`.
pub fn center(value: &Value, args: &Args) -> Result<Value> {
    let s = text("center", value)?;
    let width = width_arg("center", args)?;
    let len = s.chars().count();
    if width <= len {
        return Ok(Value::String(s));
    }
    let margin = width - len;
    let left = margin / 2 + (margin & width & 1);
    let right = margin - left;
    Ok(Value::String(format!("{}{}{}", " ".repeat(left), s, " ".repeat(right))))
}

// Escapes characters for use in JavaScript strings.
pub fn escapejs(value: &Value, _: &Args) -> Result<Value> {
    let s = text("escapejs", value)?;
    let mut out = String::with_capacity(s.len() * 2);
    for c in s.chars() {
        match c {
            '\\' | '\'' | '"' | '>' | '<' | '&' | '=' | '-' | ';' | '`' | '\u{2028}'
            | '\u{2029}' => out.push_str(&format!("\\u{:04X}", c as u32)),
            c if (c as u32) < 32 => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    Ok(Value::String(out))
}

// Converts an IRI to a string suitable for a URL.
pub fn iriencode(value: &Value, _: &Args) -> Result<Value> {
    let s = text("iriencode", value)?;
    Ok(Value::String(utf8_percent_encode(&s, IRI_ENCODE_SET).to_string()))
}

// Escapes a value for use in a URL. `/` is safe unless an explicit set of
// safe characters is given.
pub fn urlencode(value: &Value, args: &Args) -> Result<Value> {
    let s = text("urlencode", value)?;
    let safe = match args.get(0, "safe") {
        Some(Value::String(safe)) => safe.clone(),
        _ => return Ok(Value::String(utf8_percent_encode(&s, PYTHON_ENCODE_SET).to_string())),
    };

    let mut out = String::with_capacity(s.len() * 3);
    for byte in s.bytes() {
        if byte.is_ascii_alphanumeric() || b"_.-~".contains(&byte) || safe.as_bytes().contains(&byte) {
            out.push(byte as char);
        } else {
            out.push_str(percent_encode_byte(byte));
        }
    }
    Ok(Value::String(out))
}

// Converts to ASCII-ish lowercase, with runs of spaces and dashes replaced
// by a single dash.
#[cfg(feature = "slug")]
pub fn slugify(value: &Value, _: &Args) -> Result<Value> {
    let s = text("slugify", value)?;
    Ok(Value::String(slug::slugify(s)))
}

// Truncates a string if it is longer than the specified number of
// characters. Truncated strings end with "...", counted in the length.
pub fn truncatechars(value: &Value, args: &Args) -> Result<Value> {
    let s = text("truncatechars", value)?;
    let length = try_get_arg!("truncatechars", args, 0, "length", usize);

    let graphemes: Vec<&str> = Graphemes::new(&s).collect();
    if graphemes.len() <= length {
        return Ok(Value::String(s));
    }
    let keep = length.saturating_sub(TRUNCATE_END.len());
    Ok(Value::String(graphemes[..keep].concat() + TRUNCATE_END))
}

// Truncates a string after a certain number of words.
pub fn truncatewords(value: &Value, args: &Args) -> Result<Value> {
    let s = text("truncatewords", value)?;
    let length = try_get_arg!("truncatewords", args, 0, "length", usize);

    let words: Vec<&str> = s.split_whitespace().collect();
    if words.len() <= length {
        return Ok(Value::String(words.join(" ")));
    }
    let mut kept: Vec<&str> = words[..length].to_vec();
    if !kept.last().map_or(false, |w| w.ends_with(TRUNCATE_END)) {
        kept.push(TRUNCATE_END);
    }
    Ok(Value::String(kept.join(" ")))
}

// Returns the number of words.
pub fn wordcount(value: &Value, _: &Args) -> Result<Value> {
    let s = text("wordcount", value)?;
    Ok(Value::from(s.split_whitespace().count()))
}

// Wraps words at a specified line length. Words longer than the line are
// left whole.
pub fn wordwrap(value: &Value, args: &Args) -> Result<Value> {
    let s = text("wordwrap", value)?;
    let width = try_get_arg!("wordwrap", args, 0, "width", usize);

    let mut out = String::with_capacity(s.len());
    for raw_line in s.split_inclusive('\n') {
        let mut line: Vec<char> = raw_line.chars().collect();
        while line.len() > width {
            let window = &line[..(width + 1).min(line.len())];
            let mut space = window.iter().rposition(|&c| c == ' ').map_or(0, |i| i + 1);
            if space == 0 {
                space = line.iter().position(|&c| c == ' ').map_or(0, |i| i + 1);
                if space == 0 {
                    break;
                }
            }
            out.extend(&line[..space - 1]);
            out.push('\n');
            line = line[space..].to_vec();
        }
        out.extend(line);
    }
    Ok(Value::String(out))
}

// Python's `%` operator for a single value, e.g. `stringformat("03d")`.
pub fn stringformat(value: &Value, args: &Args) -> Result<Value> {
    let spec = try_get_arg!("stringformat", args, 0, "arg", String);
    let Some(caps) = FORMAT_SPEC_RE.captures(&spec) else {
        return Ok(Value::String(String::new()));
    };
    let flags = caps.name("flags").map_or("", |m| m.as_str());
    let width: usize = caps.name("width").and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
    let precision: Option<usize> = caps.name("precision").and_then(|m| m.as_str().parse().ok());
    let left = flags.contains('-');
    let zero = flags.contains('0') && !left;
    let plus = flags.contains('+');

    let number = value.as_f64().or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()));
    let body = match &caps["kind"] {
        "s" => {
            let s = value_to_string(value);
            match precision {
                Some(p) => s.chars().take(p).collect(),
                None => s,
            }
        }
        kind => {
            let Some(n) = number else {
                return Ok(Value::String(String::new()));
            };
            let sign = if n < 0.0 { "-" } else if plus { "+" } else { "" };
            let n = n.abs();
            let digits = match kind {
                "d" | "i" => format!("{}", n.trunc() as i64),
                "f" | "F" => format!("{:.*}", precision.unwrap_or(6), n),
                "e" => format!("{:.*e}", precision.unwrap_or(6), n),
                "E" => format!("{:.*E}", precision.unwrap_or(6), n),
                "x" => format!("{:x}", n.trunc() as i64),
                "X" => format!("{:X}", n.trunc() as i64),
                _ => format!("{:o}", n.trunc() as i64),
            };
            if zero && sign.len() + digits.len() < width {
                format!("{}{}{}", sign, "0".repeat(width - sign.len() - digits.len()), digits)
            } else {
                format!("{}{}", sign, digits)
            }
        }
    };

    let len = body.chars().count();
    let padding = " ".repeat(width.saturating_sub(len));
    Ok(Value::String(if left { body + &padding } else { padding + &body }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn one(arg: Value) -> Args {
        Args::from(vec![arg])
    }

    #[test]
    fn test_capfirst() {
        assert_eq!(capfirst(&json!("hola"), &Args::default()).unwrap(), json!("Hola"));
        assert_eq!(capfirst(&json!(""), &Args::default()).unwrap(), json!(""));
    }

    #[test]
    fn test_title() {
        let tests = vec![
            ("hola mundo", "Hola Mundo"),
            ("they're bill's friends", "They're Bill's Friends"),
            ("1st place", "1st Place"),
        ];
        for (input, expected) in tests {
            assert_eq!(title(&json!(input), &Args::default()).unwrap(), json!(expected));
        }
    }

    #[test]
    fn test_addslashes() {
        let result = addslashes(&json!(r#"I'm "here""#), &Args::default()).unwrap();
        assert_eq!(result, json!(r#"I\'m \"here\""#));
    }

    #[test]
    fn test_cut() {
        assert_eq!(cut(&json!("String with spaces"), &one(json!(" "))).unwrap(), json!("Stringwithspaces"));
    }

    #[test]
    fn test_justify() {
        assert_eq!(ljust(&json!("test"), &one(json!(10))).unwrap(), json!("test      "));
        assert_eq!(rjust(&json!("test"), &one(json!(10))).unwrap(), json!("      test"));
        assert_eq!(center(&json!("test"), &one(json!(10))).unwrap(), json!("   test   "));
        assert_eq!(center(&json!("abc"), &one(json!(6))).unwrap(), json!(" abc  "));
        assert_eq!(ljust(&json!("too long"), &one(json!(2))).unwrap(), json!("too long"));
    }

    #[test]
    fn test_escapejs() {
        let result = escapejs(&json!("it's \"<b>\"\n"), &Args::default()).unwrap();
        assert_eq!(result, json!("it\\u0027s \\u0022\\u003Cb\\u003E\\u0022\\u000A"));
    }

    #[test]
    fn test_iriencode() {
        let result = iriencode(&json!("?test=1&me=2"), &Args::default()).unwrap();
        assert_eq!(result, json!("?test=1&me=2"));
        let result = iriencode(&json!("S\u{f8}r-L\u{f8}kke"), &Args::default()).unwrap();
        assert_eq!(result, json!("S%C3%B8r-L%C3%B8kke"));
    }

    #[test]
    fn test_urlencode() {
        assert_eq!(urlencode(&json!("/a b/"), &Args::default()).unwrap(), json!("/a%20b/"));
        assert_eq!(urlencode(&json!("a/b:c"), &one(json!(":"))).unwrap(), json!("a%2Fb:c"));
    }

    #[cfg(feature = "slug")]
    #[test]
    fn test_slugify() {
        assert_eq!(slugify(&json!("hola mundo"), &Args::default()).unwrap(), json!("hola-mundo"));
        assert_eq!(slugify(&json!(" Joel is a slug "), &Args::default()).unwrap(), json!("joel-is-a-slug"));
    }

    #[test]
    fn test_truncatechars() {
        let tests = vec![
            ("hola mundo", 5, "ho..."),
            ("hola mundo", 10, "hola mundo"),
            ("hola mundo", 20, "hola mundo"),
            ("hola mundo", 2, "..."),
        ];
        for (input, length, expected) in tests {
            assert_eq!(truncatechars(&json!(input), &one(json!(length))).unwrap(), json!(expected));
        }
    }

    #[test]
    fn test_truncatewords() {
        assert_eq!(truncatewords(&json!("hola mundo"), &one(json!(1))).unwrap(), json!("hola ..."));
        assert_eq!(truncatewords(&json!("hola  mundo"), &one(json!(5))).unwrap(), json!("hola mundo"));
    }

    #[test]
    fn test_wordcount() {
        assert_eq!(wordcount(&json!("hola mundo  otra vez"), &Args::default()).unwrap(), json!(4));
    }

    #[test]
    fn test_wordwrap() {
        assert_eq!(wordwrap(&json!("hola mundo"), &one(json!(1))).unwrap(), json!("hola\nmundo"));
        assert_eq!(
            wordwrap(&json!("Joel is a slug"), &one(json!(5))).unwrap(),
            json!("Joel\nis a\nslug")
        );
        assert_eq!(
            wordwrap(&json!("a long line\nshort"), &one(json!(6))).unwrap(),
            json!("a long\nline\nshort")
        );
    }

    #[test]
    fn test_stringformat() {
        let tests = vec![
            (json!(7), "03d", "007"),
            (json!(3.14159), ".2f", "3.14"),
            (json!("abc"), "5s", "  abc"),
            (json!("abc"), "-5s", "abc  "),
            (json!(255), "x", "ff"),
            (json!(-4), "d", "-4"),
        ];
        for (input, spec, expected) in tests {
            assert_eq!(stringformat(&input, &one(json!(spec))).unwrap(), json!(expected));
        }
    }

    #[test]
    fn non_strings_are_rejected() {
        assert!(lower(&json!([1, 2]), &Args::default()).is_err());
        assert_eq!(upper(&json!(12), &Args::default()).unwrap(), json!("12"));
    }
}
