/// Extracts a typed value out of a `serde_json::Value`, returning a descriptive
/// error from the surrounding filter, test or function when the type is wrong.
#[macro_export]
macro_rules! try_get_value {
    ($callable:expr, $var_name:expr, $ty:ty, $val:expr) => {{
        match $crate::from_value::<$ty>($val.clone()) {
            Ok(s) => s,
            Err(_) => {
                if $var_name == "value" {
                    return Err($crate::Error::msg(format!(
                        "`{}` was called on an incorrect value: got `{}` but expected a {}",
                        $callable,
                        $val,
                        stringify!($ty)
                    )));
                } else {
                    return Err($crate::Error::msg(format!(
                        "`{}` received an incorrect type for arg `{}`: got `{}` but expected a {}",
                        $callable,
                        $var_name,
                        $val,
                        stringify!($ty)
                    )));
                }
            }
        }
    }};
}

/// Reads an argument by keyword or position from an [`Args`](crate::Args),
/// falling back to a default when the caller did not pass it.
#[macro_export]
macro_rules! try_get_arg {
    ($callable:expr, $args:expr, $pos:expr, $name:expr, $ty:ty, $default:expr) => {{
        match $args.get($pos, $name) {
            Some(val) if !val.is_null() => $crate::try_get_value!($callable, $name, $ty, val),
            _ => $default,
        }
    }};
    ($callable:expr, $args:expr, $pos:expr, $name:expr, $ty:ty) => {{
        match $args.get($pos, $name) {
            Some(val) => $crate::try_get_value!($callable, $name, $ty, val),
            None => {
                return Err($crate::Error::msg(format!(
                    "`{}` expected an arg called `{}`",
                    $callable, $name
                )))
            }
        }
    }};
}
