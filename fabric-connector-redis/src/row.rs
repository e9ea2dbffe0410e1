//! Redis has no row shape of its own; every key becomes a two-field
//! [`Row`] of `key` and `value`, with `value` holding whatever the key's
//! native Redis type (string/hash/list/set/zset) serializes to as JSON.

use fabric_connector::adapter::Row;
use serde_json::Value;

pub fn key_value_row(key: String, value: Value) -> Row {
    let mut row = Row::new();
    row.insert("key".to_string(), Value::String(key));
    row.insert("value".to_string(), value);
    row
}

pub fn container_of(key: &str) -> String {
    match key.split_once(':') {
        Some((prefix, _)) => prefix.to_string(),
        None => key.to_string(),
    }
}
