// The `{% csrf_token %}` tag
use minijinja::{State, Value};

use crate::environment::Environment;
use crate::errors::{Error, Result};
use crate::extensions::{Extension, InstallContext, Lowered, Tag};
use crate::utils::escape_html;

const HELPER: &str = "__csrf_token_tag";

#[derive(Debug, Default, Clone, Copy)]
pub struct CsrfExtension;

// Renders the hidden input for `token`, nothing for `NOTPROVIDED` or a
// missing token.
fn render(token: Option<Value>, debug: bool) -> Value {
    let token = token.filter(|t| !t.is_undefined() && !t.is_none()).map(|t| t.to_string());
    match token.as_deref() {
        Some("NOTPROVIDED") => Value::from_safe_string(String::new()),
        Some(token) if !token.is_empty() => Value::from_safe_string(format!(
            "<input type='hidden' name='csrfmiddlewaretoken' value='{}' />",
            escape_html(token)
        )),
        _ => {
            if debug {
                tracing::warn!(
                    "A {{% csrf_token %}} was used in a template, but the context did not provide \
                     the value. This is usually caused by not rendering with the request."
                );
            }
            Value::from("")
        }
    }
}

impl Extension for CsrfExtension {
    fn name(&self) -> &str {
        "csrf"
    }

    fn tags(&self) -> &[&'static str] {
        &["csrf_token"]
    }

    fn parse(&self, tag: &Tag<'_>) -> Result<Lowered> {
        if !tag.args.is_empty() {
            return Err(Error::template_syntax(format!(
                "'csrf_token' takes no arguments, got `{}` (line {})",
                tag.args, tag.line
            )));
        }
        Ok(Lowered::Expression(format!("{}()", HELPER)))
    }

    fn install(&self, env: &mut Environment, cx: &InstallContext<'_>) -> Result<()> {
        let debug = cx.settings.debug;
        env.add_native_function(HELPER, move |state: &State| -> std::result::Result<Value, minijinja::Error> {
            Ok(render(state.lookup("csrf_token"), debug))
        });
        Ok(())
    }
}
