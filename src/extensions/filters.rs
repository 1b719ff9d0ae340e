// Django's filters.
use serde_json::Value;

use crate::builtins::filters::{common, html, number, string, Escaping, KeepSafe, Safe};
use crate::builtins::Args;
use crate::environment::Environment;
use crate::errors::Result;
use crate::extensions::{Extension, InstallContext};

#[derive(Debug, Default, Clone, Copy)]
pub struct DjangoFiltersExtension;

impl Extension for DjangoFiltersExtension {
    fn name(&self) -> &str {
        "django_filters"
    }

    fn install(&self, env: &mut Environment, cx: &InstallContext<'_>) -> Result<()> {
        env.register_filter("addslashes", KeepSafe(string::addslashes));
        env.register_filter("capfirst", KeepSafe(string::capfirst));
        env.register_filter("escapejs", Safe(string::escapejs));
        env.register_filter("floatformat", KeepSafe(number::floatformat));
        env.register_filter("iriencode", KeepSafe(string::iriencode));
        env.register_filter("linenumbers", Escaping(html::linenumbers));
        env.register_filter("make_list", common::make_list);
        #[cfg(feature = "slug")]
        env.register_filter("slugify", KeepSafe(string::slugify));
        env.register_filter("stringformat", KeepSafe(string::stringformat));
        env.register_filter("truncatechars", KeepSafe(string::truncatechars));
        env.register_filter("truncatewords", KeepSafe(string::truncatewords));
        env.register_filter("truncatewords_html", KeepSafe(html::truncatewords_html));
        env.register_filter("ljust", KeepSafe(string::ljust));
        env.register_filter("rjust", KeepSafe(string::rjust));
        env.register_filter("cut", string::cut);
        env.register_filter("linebreaksbr", Escaping(html::linebreaksbr));
        env.register_filter("linebreaks", Escaping(html::linebreaks));
        env.register_filter("removetags", KeepSafe(html::removetags));
        env.register_filter("striptags", KeepSafe(html::striptags));
        env.register_filter("add", number::add);

        let date_format = cx.settings.date_format.clone();
        env.register_filter("date", move |value: &Value, args: &Args| {
            common::date_with_default(value, args, &date_format)
        });
        let time_format = cx.settings.time_format.clone();
        env.register_filter("time", move |value: &Value, args: &Args| {
            common::date_with_default(value, args, &time_format)
        });

        env.register_filter("timesince", common::timesince);
        env.register_filter("timeuntil", common::timeuntil);
        env.register_filter("default_if_none", common::default_if_none);
        env.register_filter("divisibleby", number::divisibleby);
        env.register_filter("yesno", common::yesno);
        env.register_filter("pluralize", number::pluralize);
        env.register_filter("get_digit", KeepSafe(common::get_digit));
        env.register_filter("force_escape", Safe(html::force_escape));
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DjangoExtraFiltersExtension;

impl Extension for DjangoExtraFiltersExtension {
    fn name(&self) -> &str {
        "django_extra_filters"
    }

    fn install(&self, env: &mut Environment, _cx: &InstallContext<'_>) -> Result<()> {
        env.register_filter("title", KeepSafe(string::title));
        env.register_filter("upper", string::upper);
        env.register_filter("lower", KeepSafe(string::lower));
        env.register_filter("urlencode", string::urlencode);
        env.register_filter("wordcount", string::wordcount);
        env.register_filter("wordwrap", KeepSafe(string::wordwrap));
        env.register_filter("center", KeepSafe(string::center));
        #[cfg(feature = "humansize")]
        env.register_filter("filesizeformat", KeepSafe(number::filesizeformat));
        Ok(())
    }
}
