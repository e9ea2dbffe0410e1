//! Converts CSV and Parquet file bytes into [`Row`]s and infers a column
//! list/native-type pair for schema discovery, since object storage carries
//! no catalog of its own (spec §4.7 for this kind).

use bytes::Bytes;
use fabric_connector::adapter::Row;
use fabric_types::errors::FabricError;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field;
use serde_json::Value;

pub fn csv_header(bytes: &Bytes) -> Result<Vec<String>, FabricError> {
    let mut reader = csv::Reader::from_reader(bytes.as_ref());
    let headers = reader.headers().map_err(FabricError::internal)?;
    Ok(headers.iter().map(|h| h.to_string()).collect())
}

pub fn parse_csv(bytes: Bytes) -> Result<Vec<Row>, FabricError> {
    let mut reader = csv::Reader::from_reader(bytes.as_ref());
    let headers: Vec<String> = reader.headers().map_err(FabricError::internal)?.iter().map(|h| h.to_string()).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(FabricError::internal)?;
        let mut row = Row::new();
        for (field, value) in headers.iter().zip(record.iter()) {
            row.insert(field.clone(), Value::String(value.to_string()));
        }
        rows.push(row);
    }
    Ok(rows)
}

pub fn parquet_schema(bytes: Bytes) -> Result<Vec<(String, &'static str)>, FabricError> {
    let reader = SerializedFileReader::new(bytes).map_err(FabricError::internal)?;
    let schema = reader.metadata().file_metadata().schema();
    Ok(schema
        .get_fields()
        .iter()
        .map(|f| (f.name().to_string(), physical_type_name(f)))
        .collect())
}

fn physical_type_name(field: &parquet::schema::types::Type) -> &'static str {
    use parquet::basic::Type as PhysicalType;
    match field.get_physical_type() {
        PhysicalType::BOOLEAN => "boolean",
        PhysicalType::INT32 => "int32",
        PhysicalType::INT64 => "int64",
        PhysicalType::FLOAT | PhysicalType::DOUBLE => "double",
        PhysicalType::BYTE_ARRAY | PhysicalType::FIXED_LEN_BYTE_ARRAY => "string",
        _ => "binary",
    }
}

pub fn parse_parquet(bytes: Bytes) -> Result<Vec<Row>, FabricError> {
    let reader = SerializedFileReader::new(bytes).map_err(FabricError::internal)?;
    let mut rows = Vec::new();
    for record in reader.get_row_iter(None).map_err(FabricError::internal)? {
        let record = record.map_err(FabricError::internal)?;
        let mut row = Row::new();
        for (name, field) in record.get_column_iter() {
            row.insert(name.clone(), field_to_json(field));
        }
        rows.push(row);
    }
    Ok(rows)
}

fn field_to_json(field: &Field) -> Value {
    match field {
        Field::Null => Value::Null,
        Field::Bool(b) => Value::Bool(*b),
        Field::Byte(n) => Value::from(*n),
        Field::Short(n) => Value::from(*n),
        Field::Int(n) => Value::from(*n),
        Field::Long(n) => Value::from(*n),
        Field::UByte(n) => Value::from(*n),
        Field::UShort(n) => Value::from(*n),
        Field::UInt(n) => Value::from(*n),
        Field::ULong(n) => Value::from(*n),
        Field::Float(n) => Value::from(*n),
        Field::Double(n) => Value::from(*n),
        Field::Str(s) => Value::String(s.clone()),
        Field::Bytes(b) => Value::String(general_purpose_base64(b.data())),
        other => Value::String(other.to_string()),
    }
}

fn general_purpose_base64(bytes: &[u8]) -> String {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    STANDARD.encode(bytes)
}
