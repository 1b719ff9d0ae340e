use pest::Parser;
use pest_derive::Parser;

use crate::errors::{Error, Result};

#[derive(Parser)]
#[grammar = "extensions/args.pest"]
struct ArgumentsParser;

// Splits the arguments of a tag into the source text of each expression.
pub(crate) fn split_expressions(tag: &str, input: &str, line: usize) -> Result<Vec<String>> {
    let mut pairs = ArgumentsParser::parse(Rule::arguments, input).map_err(|e| {
        Error::template_syntax(format!("Invalid arguments for '{}' tag on line {}: `{}`", tag, line, input))
            .with_source(e)
    })?;

    let Some(arguments) = pairs.next() else {
        return Ok(Vec::new());
    };
    Ok(arguments
        .into_inner()
        .filter(|pair| pair.as_rule() == Rule::expr)
        .map(|pair| pair.as_str().trim().to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use pretty_assertions::assert_eq;

    fn split(input: &str) -> Vec<String> {
        split_expressions("cache", input, 1).unwrap()
    }

    #[test]
    fn splits_simple_arguments() {
        assert_eq!(split("200 'fooo'"), vec!["200", "'fooo'"]);
        assert_eq!(split("  60   \"a b\"  user.id  "), vec!["60", "\"a b\"", "user.id"]);
        assert_eq!(split(""), Vec::<String>::new());
    }

    #[test]
    fn keeps_whole_expressions_together() {
        assert_eq!(
            split("gettimeout()*2 \"foo\"+options.cachename"),
            vec!["gettimeout()*2", "\"foo\"+options.cachename"]
        );
        assert_eq!(split("x if y else z 'n'"), vec!["x if y else z", "'n'"]);
        assert_eq!(split("a [1] b"), vec!["a [1]", "b"]);
        assert_eq!(split("t - 1 name|lower(1, k=2)"), vec!["t - 1", "name|lower(1, k=2)"]);
        assert_eq!(split("n is not none [1, 2] {'a': b}"), vec!["n is not none", "[1, 2]", "{'a': b}"]);
        assert_eq!(split("x not in y -z"), vec!["x not in y -z"]);
    }

    #[test]
    fn unbalanced_input_is_a_syntax_error() {
        let err = split_expressions("cache", "10 (a", 3).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::TemplateSyntaxError(_)));
    }
}
