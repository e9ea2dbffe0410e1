//! Postgres native type metadata table (spec §4.3). Registered into the
//! process-wide `TypeConversionRegistry` once at startup by [`crate::register`].

use fabric_types::schema::UnifiedType;
use fabric_types::type_registry::{KindTypeTable, NamingCase, NativeTypeInfo};

pub fn table() -> KindTypeTable {
    KindTypeTable {
        case: NamingCase::Lower,
        entries: vec![
            NativeTypeInfo {
                native_name: "bool",
                aliases: &["boolean"],
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
                native_name: "int2",
                aliases: &["smallint"],
                has_length: false,
                has_precision_scale: false,
                max_length: None,
                max_precision: None,
                max_scale: None,
                nullable: true,
                default_supported: true,
                to_unified: |_| UnifiedType::Int16,
                default_for: Some("int16"),
                render: |_, _| "int2".to_string(),
            },
            NativeTypeInfo {
                native_name: "int4",
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
                render: |_, _| "int4".to_string(),
            },
            NativeTypeInfo {
                native_name: "int8",
                aliases: &["bigint"],
                has_length: false,
                has_precision_scale: false,
                max_length: None,
                max_precision: None,
                max_scale: None,
                nullable: true,
                default_supported: true,
                to_unified: |_| UnifiedType::Int64,
                default_for: Some("int64"),
                render: |_, _| "int8".to_string(),
            },
            NativeTypeInfo {
                native_name: "float4",
                aliases: &["real"],
                has_length: false,
                has_precision_scale: false,
                max_length: None,
                max_precision: None,
                max_scale: None,
                nullable: true,
                default_supported: true,
                to_unified: |_| UnifiedType::Float32,
                default_for: Some("float32"),
                render: |_, _| "float4".to_string(),
            },
            NativeTypeInfo {
                native_name: "float8",
                aliases: &["double precision"],
                has_length: false,
                has_precision_scale: false,
                max_length: None,
                max_precision: None,
                max_scale: None,
                nullable: true,
                default_supported: true,
                to_unified: |_| UnifiedType::Float64,
                default_for: Some("float64"),
                render: |_, _| "float8".to_string(),
            },
            NativeTypeInfo {
                native_name: "numeric",
                aliases: &["decimal"],
                has_length: false,
                has_precision_scale: true,
                max_length: None,
                max_precision: Some(1000),
                max_scale: Some(1000),
                nullable: true,
                default_supported: true,
                to_unified: |p| UnifiedType::Decimal {
                    precision: p.precision.unwrap_or(38),
                    scale: p.scale.unwrap_or(0),
                },
                default_for: Some("decimal"),
                render: |p, _| format!("numeric({},{})", p.precision.unwrap_or(38), p.scale.unwrap_or(0)),
            },
            NativeTypeInfo {
                native_name: "varchar",
                aliases: &["character varying"],
                has_length: true,
                has_precision_scale: false,
                max_length: Some(10_485_760),
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
                render: |_, _| "text".to_string(),
            },
            NativeTypeInfo {
                native_name: "bytea",
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
                render: |_, _| "bytea".to_string(),
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
                native_name: "timestamptz",
                aliases: &["timestamp with time zone"],
                has_length: false,
                has_precision_scale: false,
                max_length: None,
                max_precision: None,
                max_scale: None,
                nullable: true,
                default_supported: true,
                to_unified: |_| UnifiedType::Timestamp { tz: true },
                default_for: Some("timestamp"),
                render: |_, _| "timestamptz".to_string(),
            },
            NativeTypeInfo {
                native_name: "timestamp",
                aliases: &["timestamp without time zone"],
                has_length: false,
                has_precision_scale: false,
                max_length: None,
                max_precision: None,
                max_scale: None,
                nullable: true,
                default_supported: true,
                to_unified: |_| UnifiedType::Timestamp { tz: false },
                default_for: None,
                render: |_, _| "timestamp".to_string(),
            },
            NativeTypeInfo {
                native_name: "uuid",
                aliases: &[],
                has_length: false,
                has_precision_scale: false,
                max_length: None,
                max_precision: None,
                max_scale: None,
                nullable: true,
                default_supported: true,
                to_unified: |_| UnifiedType::Uuid,
                default_for: Some("uuid"),
                render: |_, _| "uuid".to_string(),
            },
            NativeTypeInfo {
                native_name: "jsonb",
                aliases: &["json"],
                has_length: false,
                has_precision_scale: false,
                max_length: None,
                max_precision: None,
                max_scale: None,
                nullable: true,
                default_supported: true,
                to_unified: |_| UnifiedType::Json,
                default_for: Some("json"),
                render: |_, _| "jsonb".to_string(),
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_types::kind::Kind;
    use fabric_types::type_registry::TypeConversionRegistry;

    #[test]
    fn postgres_table_round_trips_varchar() {
        let reg = TypeConversionRegistry::new();
        reg.register_kind(Kind::Postgres, table());
        let result = reg.convert(Kind::Postgres, Kind::Postgres, "varchar(64)", None).unwrap();
        assert_eq!(result.native_dst, "varchar(64)");
    }
}
