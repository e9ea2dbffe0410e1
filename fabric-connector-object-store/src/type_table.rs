//! Native type table for the object-store kind (spec §4.3). CSV files carry
//! no type information at all, so every CSV column maps to `string`; Parquet
//! columns map from their Arrow physical type.

use fabric_types::schema::UnifiedType;
use fabric_types::type_registry::{KindTypeTable, NamingCase, NativeTypeInfo};

pub fn table() -> KindTypeTable {
    KindTypeTable {
        case: NamingCase::Lower,
        entries: vec![
            NativeTypeInfo {
                native_name: "string",
                aliases: &["utf8"],
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
                native_name: "boolean",
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
                render: |_, _| "boolean".to_string(),
            },
            NativeTypeInfo {
                native_name: "int32",
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
                render: |_, _| "int32".to_string(),
            },
            NativeTypeInfo {
                native_name: "int64",
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
                render: |_, _| "int64".to_string(),
            },
            NativeTypeInfo {
                native_name: "double",
                aliases: &["float64"],
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
                native_name: "binary",
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
                render: |_, _| "binary".to_string(),
            },
        ],
    }
}
