//! Redis native type metadata table (spec §4.3). Redis values carry a
//! server-side type tag (`TYPE key`) rather than a column type, so the
//! entries here track that tag; every key's declared unified type is really
//! just a hint used to render the `value` field in a container's synthetic
//! schema (see [`crate::schema_ops`]).

use fabric_types::schema::UnifiedType;
use fabric_types::type_registry::{KindTypeTable, NamingCase, NativeTypeInfo};

pub fn table() -> KindTypeTable {
    KindTypeTable {
        case: NamingCase::Lower,
        entries: vec![
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
                native_name: "hash",
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
                render: |_, _| "hash".to_string(),
            },
            NativeTypeInfo {
                native_name: "list",
                aliases: &[],
                has_length: false,
                has_precision_scale: false,
                max_length: None,
                max_precision: None,
                max_scale: None,
                nullable: true,
                default_supported: true,
                to_unified: |_| UnifiedType::Array(Box::new(UnifiedType::String)),
                default_for: Some("array"),
                render: |_, _| "list".to_string(),
            },
            NativeTypeInfo {
                native_name: "set",
                aliases: &[],
                has_length: false,
                has_precision_scale: false,
                max_length: None,
                max_precision: None,
                max_scale: None,
                nullable: true,
                default_supported: true,
                to_unified: |_| UnifiedType::Array(Box::new(UnifiedType::String)),
                default_for: None,
                render: |_, _| "set".to_string(),
            },
            NativeTypeInfo {
                native_name: "zset",
                aliases: &[],
                has_length: false,
                has_precision_scale: false,
                max_length: None,
                max_precision: None,
                max_scale: None,
                nullable: true,
                default_supported: true,
                to_unified: |_| UnifiedType::Json,
                default_for: None,
                render: |_, _| "zset".to_string(),
            },
        ],
    }
}
