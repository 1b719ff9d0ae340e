use std::convert::Into;
use std::error::Error as StdError;
use std::fmt;

/// The kind of an error (non-exhaustive)
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Generic error
    Msg(String),
    /// No configured directory or string template provides the name,
    /// or the backend does not claim it
    TemplateDoesNotExist(String),
    /// The template could not be parsed, or a tag received invalid arguments
    TemplateSyntaxError(String),
    /// A setting names something that cannot be resolved
    ImproperlyConfigured(String),
    /// A URL name could not be reversed with the given arguments
    NoReverseMatch(String),
    /// Any other failure raised while rendering
    Render(String),
    /// An error happened while serializing or deserializing JSON
    Json,
    /// An IO error occurred
    Io(std::io::ErrorKind),
}

/// The Error type
#[derive(Debug)]
pub struct Error {
    /// Kind of error
    pub kind: ErrorKind,
    source: Option<Box<dyn StdError + Sync + Send>>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            ErrorKind::Msg(ref message) => write!(f, "{}", message),
            ErrorKind::TemplateDoesNotExist(ref name) => {
                write!(f, "Template '{}' does not exist", name)
            }
            ErrorKind::TemplateSyntaxError(ref message) => {
                write!(f, "Template syntax error: {}", message)
            }
            ErrorKind::ImproperlyConfigured(ref message) => {
                write!(f, "Improperly configured: {}", message)
            }
            ErrorKind::NoReverseMatch(ref message) => write!(f, "{}", message),
            ErrorKind::Render(ref message) => write!(f, "Failed to render: {}", message),
            ErrorKind::Json => write!(f, "Error while (de)serializing JSON"),
            ErrorKind::Io(ref io_error) => {
                write!(f, "Io error while writing rendered value to output: {:?}", io_error)
            }
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|c| &**c as &(dyn StdError + 'static))
    }
}

impl Error {
    /// Creates generic error
    pub fn msg(value: impl ToString) -> Self {
        Self { kind: ErrorKind::Msg(value.to_string()), source: None }
    }

    /// Creates generic error with a source
    pub fn chain(value: impl ToString, source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self { kind: ErrorKind::Msg(value.to_string()), source: Some(source.into()) }
    }

    /// Creates a not-found error for the given template name
    pub fn template_does_not_exist(name: impl ToString) -> Self {
        Self { kind: ErrorKind::TemplateDoesNotExist(name.to_string()), source: None }
    }

    /// Creates a syntax error
    pub fn template_syntax(message: impl ToString) -> Self {
        Self { kind: ErrorKind::TemplateSyntaxError(message.to_string()), source: None }
    }

    /// Creates a configuration error
    pub fn improperly_configured(message: impl ToString) -> Self {
        Self { kind: ErrorKind::ImproperlyConfigured(message.to_string()), source: None }
    }

    /// Creates a URL reversal error
    pub fn no_reverse_match(message: impl ToString) -> Self {
        Self { kind: ErrorKind::NoReverseMatch(message.to_string()), source: None }
    }

    /// Creates an IO error
    pub fn io_error(error: std::io::Error) -> Self {
        Self { kind: ErrorKind::Io(error.kind()), source: Some(Box::new(error)) }
    }

    /// Creates JSON error
    pub fn json(value: serde_json::Error) -> Self {
        Self { kind: ErrorKind::Json, source: Some(Box::new(value)) }
    }

    /// Attaches a source to an existing error, replacing any previous one
    pub fn with_source(mut self, source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Converts an error raised by a filter, test or function back into an
    /// engine error so it can travel through a render and be recovered
    /// afterwards by the `From<minijinja::Error>` translation.
    pub(crate) fn into_engine(self) -> minijinja::Error {
        let kind = match self.kind {
            ErrorKind::TemplateSyntaxError(_) => minijinja::ErrorKind::SyntaxError,
            ErrorKind::TemplateDoesNotExist(_) => minijinja::ErrorKind::TemplateNotFound,
            _ => minijinja::ErrorKind::InvalidOperation,
        };
        minijinja::Error::new(kind, self.to_string()).with_source(self)
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::io_error(error)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Self::msg(e)
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Self::msg(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::json(e)
    }
}

// Engine errors are translated into the host's error kinds. An error of ours
// found in the source chain (raised by a tag helper or a filter) keeps its kind.
impl From<minijinja::Error> for Error {
    fn from(error: minijinja::Error) -> Self {
        let mut cause: Option<&(dyn StdError + 'static)> = error.source();
        while let Some(e) = cause {
            if let Some(ours) = e.downcast_ref::<Error>() {
                let kind = ours.kind.clone();
                return Self { kind, source: Some(Box::new(error)) };
            }
            cause = e.source();
        }

        let kind = match error.kind() {
            minijinja::ErrorKind::TemplateNotFound => {
                let name = error.name().map(str::to_string).unwrap_or_else(|| {
                    error.detail().map(str::to_string).unwrap_or_else(|| error.to_string())
                });
                ErrorKind::TemplateDoesNotExist(name)
            }
            minijinja::ErrorKind::SyntaxError => ErrorKind::TemplateSyntaxError(describe(&error)),
            _ => ErrorKind::Render(describe(&error)),
        };
        Self { kind, source: Some(Box::new(error)) }
    }
}

fn describe(error: &minijinja::Error) -> String {
    let detail = error.detail().map(str::to_string).unwrap_or_else(|| error.to_string());
    match (error.name(), error.line()) {
        (Some(name), Some(line)) => format!("{} (in {}:{})", detail, name, line),
        _ => detail,
    }
}

/// Convenient wrapper around std::Result.
pub type Result<T> = ::std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_send_and_sync() {
        fn test_send_sync<T: Send + Sync>() {}

        test_send_sync::<super::Error>();
    }

    #[test]
    fn engine_not_found_becomes_template_does_not_exist() {
        let engine = minijinja::Error::new(minijinja::ErrorKind::TemplateNotFound, "missing.jinja");
        let err = Error::from(engine);
        assert!(matches!(err.kind, ErrorKind::TemplateDoesNotExist(_)));
        assert!(err.source().is_some());
    }

    #[test]
    fn crate_error_survives_a_round_trip_through_the_engine() {
        let original = Error::no_reverse_match("Reverse for 'home' not found");
        let err = Error::from(original.into_engine());
        assert_eq!(err.kind, ErrorKind::NoReverseMatch("Reverse for 'home' not found".to_string()));
    }
}
