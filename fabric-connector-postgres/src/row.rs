//! Converts `tokio_postgres::Row`s into the adapter-neutral [`Row`] shape.

use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use fabric_connector::adapter::Row;
use rust_decimal::Decimal;
use serde_json::Value;
use tokio_postgres::types::Type;

pub fn from_pg_row(pg_row: &tokio_postgres::Row) -> Row {
    let mut row = Row::new();
    for (idx, column) in pg_row.columns().iter().enumerate() {
        let value = column_value(pg_row, idx, column.type_());
        row.insert(column.name().to_string(), value);
    }
    row
}

fn column_value(pg_row: &tokio_postgres::Row, idx: usize, ty: &Type) -> Value {
    macro_rules! get {
        ($t:ty) => {
            pg_row.get::<usize, Option<$t>>(idx)
        };
    }
    match *ty {
        Type::BOOL => get!(bool).map(Value::from).unwrap_or(Value::Null),
        Type::INT2 => get!(i16).map(Value::from).unwrap_or(Value::Null),
        Type::INT4 => get!(i32).map(Value::from).unwrap_or(Value::Null),
        Type::INT8 => get!(i64).map(Value::from).unwrap_or(Value::Null),
        Type::FLOAT4 => get!(f32).map(|v| Value::from(v as f64)).unwrap_or(Value::Null),
        Type::FLOAT8 => get!(f64).map(Value::from).unwrap_or(Value::Null),
        Type::NUMERIC => get!(Decimal).map(|v| Value::from(v.to_string())).unwrap_or(Value::Null),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR => get!(String).map(Value::from).unwrap_or(Value::Null),
        Type::UUID => get!(uuid::Uuid).map(|v| Value::from(v.to_string())).unwrap_or(Value::Null),
        Type::JSON | Type::JSONB => get!(Value).unwrap_or(Value::Null),
        Type::DATE => get!(NaiveDate).map(|v| Value::from(v.to_string())).unwrap_or(Value::Null),
        Type::TIME => get!(NaiveTime).map(|v| Value::from(v.to_string())).unwrap_or(Value::Null),
        Type::TIMESTAMPTZ => get!(DateTime<Utc>).map(|v| Value::from(v.to_rfc3339())).unwrap_or(Value::Null),
        Type::TIMESTAMP => get!(chrono::NaiveDateTime)
            .map(|v| Value::from(v.to_string()))
            .unwrap_or(Value::Null),
        Type::BYTEA => get!(Vec<u8>)
            .map(|v| Value::from(base64::engine::general_purpose::STANDARD.encode(v)))
            .unwrap_or(Value::Null),
        _ => get!(String).map(Value::from).unwrap_or(Value::Null),
    }
}
