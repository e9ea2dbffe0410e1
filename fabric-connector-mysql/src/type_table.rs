//! MySQL native type metadata table (spec §4.3).

use fabric_types::schema::UnifiedType;
use fabric_types::type_registry::{KindTypeTable, NamingCase, NativeTypeInfo};

pub fn table() -> KindTypeTable {
    KindTypeTable {
        case: NamingCase::Lower,
        entries: vec![
            NativeTypeInfo {
                native_name: "tinyint",
                aliases: &["bool", "boolean"],
                has_length: false,
                has_precision_scale: false,
                max_length: None,
                max_precision: None,
                max_scale: None,
                nullable: true,
                default_supported: true,
                to_unified: |_| UnifiedType::Boolean,
                default_for: Some("boolean"),
                render: |_, _| "tinyint(1)".to_string(),
            },
            NativeTypeInfo {
                native_name: "smallint",
                aliases: &[],
                has_length: false,
                has_precision_scale: false,
                max_length: None,
                max_precision: None,
                max_scale: None,
                nullable: true,
                default_supported: true,
                to_unified: |_| UnifiedType::Int16,
                default_for: Some("int16"),
                render: |_, _| "smallint".to_string(),
            },
            NativeTypeInfo {
                native_name: "int",
                aliases: &["integer"],
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
                native_name: "bigint",
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
                render: |_, _| "bigint".to_string(),
            },
            NativeTypeInfo {
                native_name: "float",
                aliases: &[],
                has_length: false,
                has_precision_scale: false,
                max_length: None,
                max_precision: None,
                max_scale: None,
                nullable: true,
                default_supported: true,
                to_unified: |_| UnifiedType::Float32,
                default_for: Some("float32"),
                render: |_, _| "float".to_string(),
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
                aliases: &["numeric"],
                has_length: false,
                has_precision_scale: true,
                max_length: None,
                max_precision: Some(65),
                max_scale: Some(30),
                nullable: true,
                default_supported: true,
                to_unified: |p| UnifiedType::Decimal {
                    precision: p.precision.unwrap_or(38),
                    scale: p.scale.unwrap_or(0),
                },
                default_for: Some("decimal"),
                render: |p, _| format!("decimal({},{})", p.precision.unwrap_or(38), p.scale.unwrap_or(0)),
            },
            NativeTypeInfo {
                native_name: "varchar",
                aliases: &[],
                has_length: true,
                has_precision_scale: false,
                max_length: Some(65_535),
                max_precision: None,
                max_scale: None,
                nullable: true,
                default_supported: true,
                to_unified: |p| UnifiedType::Varchar(p.length.unwrap_or(255)),
                default_for: Some("varchar"),
                render: |p, _| format!("varchar({})", p.length.unwrap_or(255)),
            },
            NativeTypeInfo {
                native_name: "text",
                aliases: &["longtext", "mediumtext"],
                has_length: false,
                has_precision_scale: false,
                max_length: None,
                max_precision: None,
                max_scale: None,
                nullable: true,
                default_supported: true,
                to_unified: |_| UnifiedType::String,
                default_for: Some("string"),
                render: |_, _| "text".to_string(),
            },
            NativeTypeInfo {
                native_name: "blob",
                aliases: &["longblob", "varbinary"],
                has_length: false,
                has_precision_scale: false,
                max_length: None,
                max_precision: None,
                max_scale: None,
                nullable: true,
                default_supported: true,
                to_unified: |_| UnifiedType::Binary,
                default_for: Some("binary"),
                render: |_, _| "blob".to_string(),
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
                to_unified: |_| UnifiedType::Date,
                default_for: Some("date"),
                render: |_, _| "date".to_string(),
            },
            NativeTypeInfo {
                native_name: "time",
                aliases: &[],
                has_length: false,
                has_precision_scale: false,
                max_length: None,
                max_precision: None,
                max_scale: None,
                nullable: true,
                default_supported: true,
                to_unified: |_| UnifiedType::Time,
                default_for: Some("time"),
                render: |_, _| "time".to_string(),
            },
            NativeTypeInfo {
                native_name: "datetime",
                aliases: &[],
                has_length: false,
                has_precision_scale: false,
                max_length: None,
                max_precision: None,
                max_scale: None,
                nullable: true,
                default_supported: true,
                to_unified: |_| UnifiedType::Timestamp { tz: false },
                default_for: Some("timestamp"),
                render: |_, _| "datetime".to_string(),
            },
            NativeTypeInfo {
                native_name: "timestamp",
                aliases: &[],
                has_length: false,
                has_precision_scale: false,
                max_length: None,
                max_precision: None,
                max_scale: None,
                nullable: true,
                default_supported: true,
                to_unified: |_| UnifiedType::Timestamp { tz: true },
                default_for: None,
                render: |_, _| "timestamp".to_string(),
            },
            NativeTypeInfo {
                native_name: "json",
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
                render: |_, _| "json".to_string(),
            },
        ],
    }
}
