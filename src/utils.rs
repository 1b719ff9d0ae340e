use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

// Same as Python quote with `/` not escaped: everything but ASCII
// alphanumerics and `_.-~/` is percent encoded.
pub(crate) const PYTHON_ENCODE_SET: &AsciiSet =
    &NON_ALPHANUMERIC.remove(b'_').remove(b'.').remove(b'-').remove(b'~').remove(b'/');

// Characters left alone by Django's `iri_to_uri`.
pub(crate) const IRI_ENCODE_SET: &AsciiSet = &PYTHON_ENCODE_SET
    .remove(b'#')
    .remove(b'%')
    .remove(b'[')
    .remove(b']')
    .remove(b'=')
    .remove(b':')
    .remove(b';')
    .remove(b'$')
    .remove(b'&')
    .remove(b'(')
    .remove(b')')
    .remove(b'+')
    .remove(b',')
    .remove(b'!')
    .remove(b'?')
    .remove(b'*')
    .remove(b'@')
    .remove(b'\'');

// Escape HTML the way markupsafe does
//
// ```text
// & --> &amp;
// < --> &lt;
// > --> &gt;
// " --> &#34;
// ' --> &#39;
// ```
#[inline]
pub fn escape_html(input: &str) -> String {
    let mut output = String::with_capacity(input.len() * 2);
    for c in input.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&#34;"),
            '\'' => output.push_str("&#39;"),
            _ => output.push(c),
        }
    }

    // Not using shrink_to_fit() on purpose
    output
}

/// Percent-encodes like Django's `urlquote`.
pub fn urlquote(input: &str) -> String {
    utf8_percent_encode(input, PYTHON_ENCODE_SET).to_string()
}

// Python's `str.title()`: uppercase after every non-letter, lowercase otherwise.
pub(crate) fn python_title(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut previous_is_cased = false;
    for c in input.chars() {
        if c.is_alphabetic() {
            if previous_is_cased {
                output.extend(c.to_lowercase());
            } else {
                output.extend(c.to_uppercase());
            }
            previous_is_cased = true;
        } else {
            output.push(c);
            previous_is_cased = false;
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_escape_html() {
        let tests = vec![
            (r"", ""),
            (r"a&b", "a&amp;b"),
            (r"<a", "&lt;a"),
            (r">a", "&gt;a"),
            (r#"""#, "&#34;"),
            (r#"'"#, "&#39;"),
            (r#"&<>"'"#, "&amp;&lt;&gt;&#34;&#39;"),
            (r"</h1>", "&lt;/h1&gt;"),
        ];
        for (input, expected) in tests {
            assert_eq!(escape_html(input), expected);
        }
        let empty = String::new();
        assert_eq!(escape_html(&empty), empty);
    }

    #[test]
    fn urlquote_keeps_slashes() {
        assert_eq!(urlquote("a b/c:d"), "a%20b/c%3Ad");
        assert_eq!(urlquote("ünï"), "%C3%BCn%C3%AF");
    }

    #[test]
    fn title_matches_python() {
        assert_eq!(python_title("hola mundo"), "Hola Mundo");
        assert_eq!(python_title("they're BILL'S"), "They'Re Bill'S");
    }
}
