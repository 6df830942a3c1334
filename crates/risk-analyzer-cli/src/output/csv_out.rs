use serde_json::{Map, Value};
use std::io;

use super::{envelope, format_scalar};

type StdoutWriter<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write output as CSV to stdout.
///
/// Results holding a list of records (stress scenarios, contributions)
/// become one row per record; everything else is written as field,value.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = envelope(value).and_then(|env| env.get("result"));
    match (result, value) {
        (Some(Value::Object(result)), _) => match record_list(result) {
            Some(records) => write_array_csv(&mut wtr, records),
            None => write_fields(&mut wtr, result),
        },
        (_, Value::Object(map)) => write_fields(&mut wtr, map),
        (_, Value::Array(arr)) => write_array_csv(&mut wtr, arr),
        _ => {
            let _ = wtr.write_record([&format_scalar(value)]);
        }
    }

    let _ = wtr.flush();
}

/// The single field of `result` that is a list of records, if there is one.
fn record_list(result: &Map<String, Value>) -> Option<&[Value]> {
    let mut lists = result.values().filter_map(|v| match v {
        Value::Array(arr) if arr.first().map(Value::is_object).unwrap_or(false) => {
            Some(arr.as_slice())
        }
        _ => None,
    });
    let first = lists.next()?;
    match lists.next() {
        Some(_) => None,
        None => Some(first),
    }
}

fn write_fields(wtr: &mut StdoutWriter<'_>, map: &Map<String, Value>) {
    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in map {
        let _ = wtr.write_record([key.as_str(), &format_scalar(val)]);
    }
}

fn write_array_csv(wtr: &mut StdoutWriter<'_>, arr: &[Value]) {
    if arr.is_empty() {
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_scalar).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&format_scalar(item)]);
        }
    }
}
