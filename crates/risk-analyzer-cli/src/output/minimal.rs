use serde_json::Value;

use super::{envelope, format_scalar};

/// Headline figure of each command, in priority order.
const PRIORITY_KEYS: [&str; 7] = [
    "cvar_amount",
    "var_amount",
    "portfolio_var",
    "annualized_volatility",
    "kupiec_p_value",
    "explained_variance",
    "matrix",
];

/// Print just the key answer value from the output.
///
/// Looks for well-known result fields in order of priority, then falls back
/// to the first field of the result object. A job without a result prints
/// its status and error.
pub fn print_minimal(value: &Value) {
    let result_obj = envelope(value)
        .and_then(|env| env.get("result"))
        .unwrap_or(value);

    if let Value::Object(map) = result_obj {
        if envelope(value).is_none() && map.contains_key("status") {
            let status = map.get("status").map(format_scalar).unwrap_or_default();
            match map.get("error").filter(|e| !e.is_null()) {
                Some(err) => println!("{}: {}", status, format_scalar(err)),
                None => println!("{}", status),
            }
            return;
        }

        for key in PRIORITY_KEYS {
            if let Some(val) = map.get(key).filter(|v| !v.is_null()) {
                println!("{}", format_scalar(val));
                return;
            }
        }

        // stress output: one delta per scenario
        if let Some(Value::Array(scenarios)) = map.get("scenarios") {
            for s in scenarios {
                let name = s.get("name").map(format_scalar).unwrap_or_default();
                let delta = s.get("delta_nav").map(format_scalar).unwrap_or_default();
                println!("{}: {}", name, delta);
            }
            return;
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_scalar(val));
            return;
        }
    }

    println!("{}", format_scalar(result_obj));
}
