// `_`, `gettext` and `ngettext` globals
use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::builtins::Args;
use crate::environment::Environment;
use crate::errors::Result;
use crate::extensions::{Extension, InstallContext};
use crate::i18n::{interpolate, NullTranslations, Translations};

#[derive(Debug, Default, Clone, Copy)]
pub struct I18nExtension;

// Translates `message`; with newstyle gettext the keyword arguments are
// interpolated into the `%(name)s` placeholders.
fn gettext(translations: &dyn Translations, args: &Args, newstyle: bool) -> Result<Value> {
    let message = try_get_arg!("gettext", args, 0, "message", String);
    let translated = translations.gettext(&message);
    if newstyle {
        return Ok(Value::String(interpolate(&translated, args.named())));
    }
    Ok(Value::String(translated))
}

// Picks the singular or plural form for `n`. Newstyle gettext makes `n`
// available as `num` for the placeholders.
fn ngettext(translations: &dyn Translations, args: &Args, newstyle: bool) -> Result<Value> {
    let singular = try_get_arg!("ngettext", args, 0, "singular", String);
    let plural = try_get_arg!("ngettext", args, 1, "plural", String);
    let n = try_get_arg!("ngettext", args, 2, "n", i64);
    let translated = translations.ngettext(&singular, &plural, n);
    if newstyle {
        let mut variables: BTreeMap<String, Value> = args.named().clone();
        variables.entry("num".to_string()).or_insert_with(|| Value::from(n));
        return Ok(Value::String(interpolate(&translated, &variables)));
    }
    Ok(Value::String(translated))
}

impl Extension for I18nExtension {
    fn name(&self) -> &str {
        "i18n"
    }

    fn install(&self, env: &mut Environment, cx: &InstallContext<'_>) -> Result<()> {
        let translations: Arc<dyn Translations> = if cx.settings.use_i18n {
            cx.host.translations.clone()
        } else {
            Arc::new(NullTranslations)
        };
        let newstyle = cx.options.newstyle_gettext;

        for name in ["_", "gettext"] {
            let translations = translations.clone();
            env.register_function(name, move |args: &Args| gettext(&*translations, args, newstyle));
        }
        env.register_function("ngettext", move |args: &Args| ngettext(&*translations, args, newstyle));
        Ok(())
    }
}
