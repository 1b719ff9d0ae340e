// `url` global and `reverseurl` filter
use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::builtins::filters::value_to_string;
use crate::builtins::Args;
use crate::environment::Environment;
use crate::errors::{Error, Result};
use crate::extensions::{Extension, InstallContext};
use crate::urls::UrlResolver;

#[derive(Debug, Default, Clone, Copy)]
pub struct UrlsExtension;

// Reverses `name` with every remaining argument, or logs and yields an empty
// string when `mute` is on and reversal fails.
fn reverse(urls: &dyn UrlResolver, name: &str, args: &[Value], named: &BTreeMap<String, Value>, mute: bool) -> Result<Value> {
    let args: Vec<String> = args.iter().map(value_to_string).collect();
    let kwargs: BTreeMap<String, String> =
        named.iter().map(|(k, v)| (k.clone(), value_to_string(v))).collect();

    match urls.reverse(name, &args, &kwargs) {
        Ok(url) => Ok(Value::String(url)),
        Err(e) if mute => {
            tracing::error!("Error in url reverse: {}", e);
            Ok(Value::String(String::new()))
        }
        Err(e) => Err(e),
    }
}

impl Extension for UrlsExtension {
    fn name(&self) -> &str {
        "urls"
    }

    fn install(&self, env: &mut Environment, cx: &InstallContext<'_>) -> Result<()> {
        let mute = cx.options.mute_urlresolve_exceptions;

        let urls: Arc<dyn UrlResolver> = cx.host.urls.clone();
        env.register_function("url", move |args: &Args| -> Result<Value> {
            let Some((name, rest)) = args.positional().split_first() else {
                return Err(Error::msg("`url` expected the name of a route"));
            };
            reverse(&*urls, &value_to_string(name), rest, args.named(), mute)
        });

        let urls: Arc<dyn UrlResolver> = cx.host.urls.clone();
        env.register_filter("reverseurl", move |value: &Value, args: &Args| -> Result<Value> {
            reverse(&*urls, &value_to_string(value), args.positional(), args.named(), mute)
        });
        Ok(())
    }
}
