// `localtime`, `utc` and `timezone` filters
use crate::builtins::filters::timezone::{localtime_in, parse_timezone, timezone, utc};
use crate::environment::Environment;
use crate::errors::{Error, Result};
use crate::extensions::{Extension, InstallContext};

#[derive(Debug, Default, Clone, Copy)]
pub struct TimezoneExtension;

impl Extension for TimezoneExtension {
    fn name(&self) -> &str {
        "timezone"
    }

    fn install(&self, env: &mut Environment, cx: &InstallContext<'_>) -> Result<()> {
        let default = parse_timezone(&cx.settings.time_zone).map_err(|e| {
            Error::improperly_configured(format!("Unknown TIME_ZONE `{}`", cx.settings.time_zone)).with_source(e)
        })?;
        env.register_filter("localtime", move |value: &serde_json::Value, args: &crate::Args| {
            localtime_in(value, args, default)
        });
        env.register_filter("utc", utc);
        env.register_filter("timezone", timezone);
        Ok(())
    }
}
