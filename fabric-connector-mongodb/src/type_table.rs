//! MongoDB/BSON native type metadata table (spec §4.3). Document stores have
//! no fixed catalog, so `native_name` here tracks BSON type tags rather than
//! DDL keywords; `render`/`create_structure` are effectively no-ops for this
//! kind (see [`crate::schema_ops`]).

use fabric_types::schema::UnifiedType;
use fabric_types::type_registry::{KindTypeTable, NamingCase, NativeTypeInfo};

pub fn table() -> KindTypeTable {
    KindTypeTable {
        case: NamingCase::Lower,
        entries: vec![
            NativeTypeInfo {
                native_name: "bool",
                aliases: &[],
                has_length: false,
                has_precision_scale: false,
                max_length: None,
                max_precision: None,
                max_scale: None,
                nullable: true,
                default_supported: true,
                to_unified: |_| UnifiedType::Boolean,
                default_for: Some("boolean"),
                render: |_, _| "bool".to_string(),
            },
            NativeTypeInfo {
                native_name: "int",
                aliases: &[],
                has_length: false,
                has_precision_scale: false,
                max_length: None,
                max_precision: None,
                max_scale: None,
                nullable: true,
                default_supported: true,
                to_unified: |_| UnifiedType::Int32,
                default_for: Some("int32"),
                render: |_, _| "int".to_string(),
            },
            NativeTypeInfo {
                native_name: "long",
                aliases: &[],
                has_length: false,
                has_precision_scale: false,
                max_length: None,
                max_precision: None,
                max_scale: None,
                nullable: true,
                default_supported: true,
                to_unified: |_| UnifiedType::Int64,
                default_for: Some("int64"),
                render: |_, _| "long".to_string(),
            },
            NativeTypeInfo {
                native_name: "double",
                aliases: &[],
                has_length: false,
                has_precision_scale: false,
                max_length: None,
                max_precision: None,
                max_scale: None,
                nullable: true,
                default_supported: true,
                to_unified: |_| UnifiedType::Float64,
                default_for: Some("float64"),
                render: |_, _| "double".to_string(),
            },
            NativeTypeInfo {
                native_name: "decimal",
                aliases: &[],
                has_length: false,
                has_precision_scale: true,
                max_length: None,
                max_precision: Some(34),
                max_scale: Some(34),
                nullable: true,
                default_supported: true,
                to_unified: |p| UnifiedType::Decimal {
                    precision: p.precision.unwrap_or(34),
                    scale: p.scale.unwrap_or(0),
                },
                default_for: Some("decimal"),
                render: |_, _| "decimal".to_string(),
            },
            NativeTypeInfo {
                native_name: "string",
                aliases: &[],
                has_length: false,
                has_precision_scale: false,
                max_length: None,
                max_precision: None,
                max_scale: None,
                nullable: true,
                default_supported: true,
                to_unified: |_| UnifiedType::String,
                default_for: Some("string"),
                render: |_, _| "string".to_string(),
            },
            NativeTypeInfo {
                native_name: "binData",
                aliases: &[],
                has_length: false,
                has_precision_scale: false,
                max_length: None,
                max_precision: None,
                max_scale: None,
                nullable: true,
                default_supported: true,
                to_unified: |_| UnifiedType::Binary,
                default_for: Some("binary"),
                render: |_, _| "binData".to_string(),
            },
            NativeTypeInfo {
                native_name: "date",
                aliases: &[],
                has_length: false,
                has_precision_scale: false,
                max_length: None,
                max_precision: None,
                max_scale: None,
                nullable: true,
                default_supported: true,
                to_unified: |_| UnifiedType::Timestamp { tz: true },
                default_for: Some("timestamp"),
                render: |_, _| "date".to_string(),
            },
            NativeTypeInfo {
                native_name: "objectId",
                aliases: &[],
                has_length: false,
                has_precision_scale: false,
                max_length: None,
                max_precision: None,
                max_scale: None,
                nullable: false,
                default_supported: true,
                to_unified: |_| UnifiedType::String,
                default_for: None,
                render: |_, _| "objectId".to_string(),
            },
            NativeTypeInfo {
                native_name: "object",
                aliases: &[],
                has_length: false,
                has_precision_scale: false,
                max_length: None,
                max_precision: None,
                max_scale: None,
                nullable: true,
                default_supported: true,
                to_unified: |_| UnifiedType::Json,
                default_for: Some("json"),
                render: |_, _| "object".to_string(),
            },
            NativeTypeInfo {
                native_name: "array",
                aliases: &[],
                has_length: false,
                has_precision_scale: false,
                max_length: None,
                max_precision: None,
                max_scale: None,
                nullable: true,
                default_supported: true,
                to_unified: |_| UnifiedType::Array(Box::new(UnifiedType::Unknown)),
                default_for: Some("array"),
                render: |_, _| "array".to_string(),
            },
        ],
    }
}
