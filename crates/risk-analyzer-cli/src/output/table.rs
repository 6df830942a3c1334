use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{envelope, format_scalar};

const JOB_FIELDS: [&str; 5] = ["id", "job_type", "status", "progress", "error"];

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    match (value, envelope(value)) {
        (Value::Object(map), Some(env)) => {
            if map.contains_key("status") {
                print_job_summary(map);
            }
            print_envelope(env);
        }
        (Value::Object(map), None) => {
            if map.contains_key("status") {
                print_job_summary(map);
            } else {
                print_flat_object(map);
            }
        }
        (Value::Array(arr), _) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_job_summary(job: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Job", ""]);
    for key in JOB_FIELDS {
        if let Some(val) = job.get(key).filter(|v| !v.is_null()) {
            builder.push_record([key, &format_value(val)]);
        }
    }
    println!("{}\n", Table::from(builder));
}

fn print_envelope(env: &Map<String, Value>) {
    match env.get("result") {
        Some(Value::Object(result)) => print_result(result),
        Some(other) => println!("{}", format_value(other)),
        None => print_flat_object(env),
    }

    if let Some(Value::Array(warnings)) = env.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = env.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

/// Scalars go into one Field/Value table; lists of records and matrices get
/// a table of their own.
fn print_result(result: &Map<String, Value>) {
    let symbols: Vec<String> = result
        .get("symbols")
        .and_then(Value::as_array)
        .map(|s| s.iter().map(format_scalar).collect())
        .unwrap_or_default();

    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    let mut nested = Vec::new();
    for (key, val) in result {
        match val {
            Value::Array(arr) if arr.iter().any(|v| v.is_object() || v.is_array()) => {
                nested.push((key, val));
            }
            Value::Object(_) => nested.push((key, val)),
            _ => builder.push_record([key.as_str(), &format_value(val)]),
        }
    }
    println!("{}", Table::from(builder));

    for (key, val) in nested {
        println!("\n{}:", key);
        match val {
            Value::Array(rows) if rows.first().map(Value::is_array).unwrap_or(false) => {
                print_matrix(rows, &symbols)
            }
            Value::Array(items) => print_array_table(items),
            Value::Object(map) => print_flat_object(map),
            _ => {}
        }
    }
}

fn print_matrix(rows: &[Value], symbols: &[String]) {
    let mut builder = Builder::default();
    let labelled = symbols.len() == rows.len();
    if labelled {
        let mut header = vec![String::new()];
        header.extend(symbols.iter().cloned());
        builder.push_record(header);
    }
    for (i, row) in rows.iter().enumerate() {
        let mut record = Vec::new();
        if labelled {
            record.push(symbols[i].clone());
        }
        if let Value::Array(cells) = row {
            record.extend(cells.iter().map(format_value));
        }
        builder.push_record(record);
    }
    println!("{}", Table::from(builder));
}

fn print_flat_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        _ => format_scalar(value),
    }
}
