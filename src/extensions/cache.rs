// The `{% cache %}` fragment cache tag.
use std::sync::Arc;
use std::time::Duration;

use md5::{Digest, Md5};
use minijinja::value::Kwargs;
use minijinja::{State, Value};

use crate::cache::CacheBackend;
use crate::environment::Environment;
use crate::errors::{Error, Result};
use crate::extensions::{split_expressions, Extension, InstallContext, Lowered, Tag};
use crate::utils::urlquote;

const HELPER: &str = "__fragment_cache";

#[derive(Debug, Default, Clone, Copy)]
pub struct CacheExtension;

/// How long a rendered fragment is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Kept for the lifetime of the cache backend
    Never,
    After(Duration),
    /// The body is rendered every time and nothing is stored
    Disabled,
}

// Reads the EXPIRE argument: integers as-is, floats truncated, integer
// strings parsed, `none` for no expiry. Zero or less disables caching.
pub fn expiry(value: &Value, line: usize) -> Result<Expiry> {
    let seconds = if value.is_none() {
        return Ok(Expiry::Never);
    } else if let Ok(n) = i64::try_from(value.clone()) {
        Some(n)
    } else if let Ok(f) = f64::try_from(value.clone()) {
        Some(f.trunc() as i64)
    } else if let Some(s) = value.as_str() {
        s.trim().parse::<i64>().ok()
    } else {
        None
    };

    match seconds {
        Some(n) if n > 0 => Ok(Expiry::After(Duration::from_secs(n as u64))),
        Some(_) => Ok(Expiry::Disabled),
        None => Err(Error::template_syntax(format!(
            "\"cache\" tag got a non-integer timeout value: {:?} (line {})",
            value, line
        ))),
    }
}

/// `template.cache.{name}.{md5 of the url-quoted vary values joined with ':'}`
pub fn cache_key(name: &str, vary_on: &[String]) -> String {
    let quoted: Vec<String> = vary_on.iter().map(|v| urlquote(v)).collect();
    let digest = Md5::digest(quoted.join(":").as_bytes());
    format!("template.cache.{}.{}", name, hex::encode(digest))
}

fn render_fragment(
    cache: &dyn CacheBackend,
    state: &State<'_, '_>,
    expire: &Value,
    name: &Value,
    vary: &Value,
    kwargs: &Kwargs,
) -> std::result::Result<Value, minijinja::Error> {
    let line: usize = kwargs.get("line")?;
    let caller: Value = kwargs.get("caller")?;

    let expiry = expiry(expire, line).map_err(Error::into_engine)?;
    if expiry == Expiry::Disabled {
        return Ok(Value::from_safe_string(caller.call(state, &[])?.to_string()));
    }

    let vary_on = match vary.try_iter() {
        Ok(values) => values.map(|v| v.to_string()).collect::<Vec<_>>(),
        Err(_) => Vec::new(),
    };
    let key = cache_key(&name.to_string(), &vary_on);

    if let Some(bytes) = cache.get(&key).map_err(Error::into_engine)? {
        match String::from_utf8(bytes) {
            Ok(fragment) => {
                tracing::trace!("fragment cache hit for `{}`", key);
                return Ok(Value::from_safe_string(fragment));
            }
            Err(_) => tracing::trace!("fragment cache entry `{}` is not UTF-8, rendering again", key),
        }
    }

    let fragment = caller.call(state, &[])?.to_string();
    let timeout = match expiry {
        Expiry::After(duration) => Some(duration),
        _ => None,
    };
    cache.set(&key, fragment.as_bytes().to_vec(), timeout).map_err(Error::into_engine)?;
    Ok(Value::from_safe_string(fragment))
}

impl Extension for CacheExtension {
    fn name(&self) -> &str {
        "cache"
    }

    fn tags(&self) -> &[&'static str] {
        &["cache"]
    }

    fn end_tags(&self) -> &[&'static str] {
        &["endcache"]
    }

    fn parse(&self, tag: &Tag<'_>) -> Result<Lowered> {
        let args = split_expressions(tag.name, tag.args, tag.line)?;
        if args.len() < 2 {
            return Err(Error::template_syntax(format!(
                "'cache' tag requires an expire time and a fragment name (line {})",
                tag.line
            )));
        }
        Ok(Lowered::Block {
            open: format!(
                "call {}({}, {}, [{}], line={})",
                HELPER,
                args[0],
                args[1],
                args[2..].join(", "),
                tag.line
            ),
            end_tag: "endcache",
            close: "endcall".to_string(),
        })
    }

    fn install(&self, env: &mut Environment, cx: &InstallContext<'_>) -> Result<()> {
        let cache: Arc<dyn CacheBackend> = cx.host.cache.clone();
        env.add_native_function(
            HELPER,
            move |state: &State, expire: Value, name: Value, vary: Value, kwargs: Kwargs| {
                render_fragment(&*cache, state, &expire, &name, &vary, &kwargs)
            },
        );
        Ok(())
    }
}
