// Filters producing or cleaning up markup
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::value::Value;

use crate::builtins::filters::value_to_string;
use crate::builtins::Args;
use crate::errors::Result;
use crate::utils;

lazy_static! {
    static ref STRIPTAGS_RE: Regex = Regex::new(r"(<!--.*?-->|<[^>]*>)").unwrap();
    static ref PARAGRAPHS_RE: Regex = Regex::new(r"\n{2,}").unwrap();
    static ref HTML_WORDS_RE: Regex = Regex::new(r"<[^>]+?>|([^<>\s]+)").unwrap();
    static ref HTML_TAG_RE: Regex = Regex::new(r"^<(/)?(\S+?)(?:(\s*/)|\s.*?)?>$").unwrap();
}

const HTML_SINGLETS: [&str; 9] = ["br", "col", "link", "base", "img", "param", "area", "hr", "input"];

fn normalize_newlines(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\r', "\n")
}

// Strips all [X]HTML tags.
pub fn striptags(value: &Value, _: &Args) -> Result<Value> {
    let s = value_to_string(value);
    Ok(Value::String(STRIPTAGS_RE.replace_all(&s, "").into_owned()))
}

// Removes a space separated list of [X]HTML tags from the output.
pub fn removetags(value: &Value, args: &Args) -> Result<Value> {
    let s = value_to_string(value);
    let tags = try_get_arg!("removetags", args, 0, "tags", String);
    let alternatives =
        tags.split_whitespace().map(|t| regex::escape(t)).collect::<Vec<_>>().join("|");
    if alternatives.is_empty() {
        return Ok(Value::String(s));
    }

    let start = Regex::new(&format!(r"<({})(/?>|(\s+[^>]*>))", alternatives))
        .map_err(|e| crate::Error::chain("`removetags` received invalid tag names", e))?;
    let end = Regex::new(&format!(r"</({})>", alternatives))
        .map_err(|e| crate::Error::chain("`removetags` received invalid tag names", e))?;
    let s = start.replace_all(&s, "");
    Ok(Value::String(end.replace_all(&s, "").into_owned()))
}

// Converts all newlines into `<br />`.
pub fn linebreaksbr(value: &Value, _: &Args) -> Result<Value> {
    let s = normalize_newlines(&value_to_string(value));
    Ok(Value::String(s.replace('\n', "<br />")))
}

// Replaces line breaks with `<br />`, and blank-line separated blocks with paragraphs.
pub fn linebreaks(value: &Value, _: &Args) -> Result<Value> {
    let s = normalize_newlines(&value_to_string(value));
    let paragraphs: Vec<String> = PARAGRAPHS_RE
        .split(&s)
        .map(|p| format!("<p>{}</p>", p.replace('\n', "<br />")))
        .collect();
    Ok(Value::String(paragraphs.join("\n\n")))
}

// Displays text with line numbers.
pub fn linenumbers(value: &Value, _: &Args) -> Result<Value> {
    let s = value_to_string(value);
    let lines: Vec<&str> = s.split('\n').collect();
    let width = lines.len().to_string().len();
    let numbered: Vec<String> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:0width$}. {}", i + 1, line, width = width))
        .collect();
    Ok(Value::String(numbered.join("\n")))
}

// Escapes a string's HTML even when it was already escaped.
pub fn force_escape(value: &Value, _: &Args) -> Result<Value> {
    Ok(Value::String(utils::escape_html(&value_to_string(value))))
}

// Truncates HTML after a certain number of words, closing the tags left open.
pub fn truncatewords_html(value: &Value, args: &Args) -> Result<Value> {
    let s = value_to_string(value);
    let length = try_get_arg!("truncatewords_html", args, 0, "length", usize);
    if length == 0 {
        return Ok(Value::String(String::new()));
    }

    let mut words = 0;
    let mut end_text_pos = 0;
    let mut truncated = false;
    let mut open_tags: Vec<String> = Vec::new();

    for caps in HTML_WORDS_RE.captures_iter(&s) {
        let Some(whole) = caps.get(0) else { continue };
        if caps.get(1).is_some() {
            words += 1;
            if words == length {
                end_text_pos = whole.end();
            }
            if words > length {
                truncated = true;
                break;
            }
            continue;
        }
        if words >= length {
            continue;
        }
        let Some(tag) = HTML_TAG_RE.captures(whole.as_str()) else { continue };
        let name = tag[2].to_lowercase();
        if tag.get(3).is_some() || HTML_SINGLETS.contains(&name.as_str()) {
            continue;
        }
        if tag.get(1).is_some() {
            if let Some(i) = open_tags.iter().position(|t| *t == name) {
                open_tags.drain(..=i);
            }
        } else {
            open_tags.insert(0, name);
        }
    }

    if !truncated {
        return Ok(Value::String(s));
    }
    let mut out = format!("{} ...", &s[..end_text_pos]);
    for tag in open_tags {
        out.push_str(&format!("</{}>", tag));
    }
    Ok(Value::String(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_striptags() {
        let tests = vec![
            (r"<b>Joel</b> <button>is</button> a <span>slug</span>", "Joel is a slug"),
            (r#"<p>just a small   \n <a href="x"> example</a> link</p>"#, r"just a small   \n  example link"),
            (r"<div>hello</div>", "hello"),
            (r"<!-- comment -->hello", "hello"),
        ];
        for (input, expected) in tests {
            assert_eq!(striptags(&json!(input), &Args::default()).unwrap(), json!(expected));
        }
    }

    #[test]
    fn test_removetags() {
        let args = Args::from(vec![json!("div")]);
        assert_eq!(removetags(&json!("<div>hello</div>"), &args).unwrap(), json!("hello"));
        let args = Args::from(vec![json!("b span")]);
        assert_eq!(
            removetags(&json!(r#"<b>Joel</b> <button>is</button> a <span class="x">slug</span>"#), &args).unwrap(),
            json!("Joel <button>is</button> a slug")
        );
    }

    #[test]
    fn test_linebreaksbr() {
        assert_eq!(linebreaksbr(&json!("hello\nworld"), &Args::default()).unwrap(), json!("hello<br />world"));
        assert_eq!(linebreaksbr(&json!("a\r\nb"), &Args::default()).unwrap(), json!("a<br />b"));
    }

    #[test]
    fn test_linebreaks() {
        let result = linebreaks(&json!("line 1\nline 2\n\npara 2"), &Args::default()).unwrap();
        assert_eq!(result, json!("<p>line 1<br />line 2</p>\n\n<p>para 2</p>"));
    }

    #[test]
    fn test_linenumbers() {
        let input = (1..=10).map(|i| format!("l{}", i)).collect::<Vec<_>>().join("\n");
        let result = linenumbers(&json!(input), &Args::default()).unwrap();
        let result = result.as_str().unwrap();
        assert!(result.starts_with("01. l1\n02. l2"));
        assert!(result.ends_with("10. l10"));
    }

    #[test]
    fn test_truncatewords_html() {
        let input = json!("<p>one <a href=\"#\">two - three <br>four</a> five</p>");
        let tests = vec![
            (0, ""),
            (2, "<p>one <a href=\"#\">two ...</a></p>"),
            (4, "<p>one <a href=\"#\">two - three ...</a></p>"),
            (5, "<p>one <a href=\"#\">two - three <br>four ...</a></p>"),
            (100, "<p>one <a href=\"#\">two - three <br>four</a> five</p>"),
        ];
        for (length, expected) in tests {
            let args = Args::from(vec![json!(length)]);
            assert_eq!(truncatewords_html(&input, &args).unwrap(), json!(expected));
        }
    }
}
