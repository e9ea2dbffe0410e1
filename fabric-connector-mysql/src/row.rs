//! Converts `mysql_async::Row`s into the adapter-neutral [`Row`] shape.

use fabric_connector::adapter::Row;
use mysql_async::{from_value_opt, Value as MyValue};
use serde_json::Value;

pub fn from_mysql_row(mut mysql_row: mysql_async::Row) -> Row {
    let mut row = Row::new();
    let columns = mysql_row.columns();
    for idx in 0..columns.len() {
        let name = columns[idx].name_str().to_string();
        let value = mysql_row.take(idx).map(my_value_to_json).unwrap_or(Value::Null);
        row.insert(name, value);
    }
    row
}

fn my_value_to_json(value: MyValue) -> Value {
    match value {
        MyValue::NULL => Value::Null,
        MyValue::Int(i) => Value::from(i),
        MyValue::UInt(u) => Value::from(u),
        MyValue::Float(f) => Value::from(f as f64),
        MyValue::Double(d) => Value::from(d),
        MyValue::Bytes(bytes) => match String::from_utf8(bytes.clone()) {
            Ok(s) => Value::from(s),
            Err(_) => Value::from(base64_encode(&bytes)),
        },
        MyValue::Date(year, month, day, hour, minute, second, micros) => {
            Value::from(format!("{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}.{micros:06}"))
        }
        MyValue::Time(neg, days, hours, minutes, seconds, micros) => {
            let sign = if neg { "-" } else { "" };
            Value::from(format!("{sign}{days}d {hours:02}:{minutes:02}:{seconds:02}.{micros:06}"))
        }
    }
}

fn base64_encode(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Fallback typed extraction for callers that want a native Rust type
/// instead of JSON (kept for [`crate::replication`]'s binlog row decoding).
pub fn opt<T: mysql_async::prelude::FromValue>(value: MyValue) -> Option<T> {
    from_value_opt(value).ok()
}
