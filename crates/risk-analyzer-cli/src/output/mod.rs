pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::{Map, Value};

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// The computation envelope inside `value`: the value itself for a direct
/// command, or the finished job's `result` for `risk job`.
pub fn envelope(value: &Value) -> Option<&Map<String, Value>> {
    let map = value.as_object()?;
    if map.contains_key("methodology") {
        return Some(map);
    }
    map.get("result")
        .and_then(Value::as_object)
        .filter(|inner| inner.contains_key("methodology"))
}

pub(crate) fn format_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
