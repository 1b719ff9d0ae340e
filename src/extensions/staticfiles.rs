// `static` as a global and as a filter
use std::sync::Arc;

use serde_json::Value;

use crate::builtins::filters::value_to_string;
use crate::builtins::Args;
use crate::environment::Environment;
use crate::errors::Result;
use crate::extensions::{Extension, InstallContext};
use crate::staticfiles::StaticStorage;

#[derive(Debug, Default, Clone, Copy)]
pub struct StaticFilesExtension;

impl Extension for StaticFilesExtension {
    fn name(&self) -> &str {
        "staticfiles"
    }

    fn install(&self, env: &mut Environment, cx: &InstallContext<'_>) -> Result<()> {
        let storage: Arc<dyn StaticStorage> = cx.host.static_storage.clone();
        env.register_function("static", move |args: &Args| -> Result<Value> {
            let path = try_get_arg!("static", args, 0, "path", String);
            Ok(Value::String(storage.url(&path)))
        });

        let storage: Arc<dyn StaticStorage> = cx.host.static_storage.clone();
        env.register_filter("static", move |value: &Value, _: &Args| -> Result<Value> {
            Ok(Value::String(storage.url(&value_to_string(value))))
        });
        Ok(())
    }
}
