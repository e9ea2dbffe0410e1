//! C3 — Type Conversion Registry: per-kind metadata describing native
//! primitive types and their mapping to/from `UnifiedType`, plus
//! cross-kind translation with loss/compatibility reporting (spec §4.3).
//!
//! New kinds contribute one metadata table plus an adapter; the conversion
//! algorithm itself never special-cases a kind by name (spec §9
//! "Metadata-driven type conversion").

use crate::errors::{FabricError, LossSeverity};
use crate::schema::UnifiedType;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::kind::Kind;

/// The length/precision/scale parameters carried alongside a native type
/// name, e.g. `varchar(255)` -> `TypeParams { length: Some(255), .. }`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TypeParams {
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NamingCase {
    Upper,
    Lower,
}

/// Metadata for one native type name within one kind.
#[derive(Clone)]
pub struct NativeTypeInfo {
    /// Canonical (lower-case) native name, e.g. `"varchar"`, `"decimal"`.
    pub native_name: &'static str,
    pub aliases: &'static [&'static str],
    pub has_length: bool,
    pub has_precision_scale: bool,
    pub max_length: Option<u32>,
    pub max_precision: Option<u32>,
    pub max_scale: Option<u32>,
    pub nullable: bool,
    pub default_supported: bool,
    /// Builds the fully-parameterized `UnifiedType` from the declared
    /// params, e.g. `varchar(255)` -> `UnifiedType::Varchar(255)`.
    pub to_unified: fn(TypeParams) -> UnifiedType,
    /// If set, this entry is the default native rendering target when
    /// converting *to* this kind from a `UnifiedType` whose discriminant
    /// matches. Exactly one entry per kind should claim a given
    /// discriminant.
    pub default_for: Option<&'static str>,
    /// Renders this native type back out as a DDL-ready string, applying
    /// the kind's formatting rule (spec §4.3 `Render`).
    pub render: fn(TypeParams, NamingCase) -> String,
}

pub struct KindTypeTable {
    pub case: NamingCase,
    pub entries: Vec<NativeTypeInfo>,
}

impl KindTypeTable {
    fn find(&self, name: &str) -> Option<&NativeTypeInfo> {
        let lower = name.to_ascii_lowercase();
        self.entries.iter().find(|e| {
            e.native_name == lower || e.aliases.iter().any(|a| *a == lower)
        })
    }

    fn default_for(&self, discriminant: &str) -> Option<&NativeTypeInfo> {
        self.entries
            .iter()
            .find(|e| e.default_for == Some(discriminant))
    }

    fn string_fallback(&self) -> &NativeTypeInfo {
        self.default_for("string")
            .or_else(|| self.default_for("varchar"))
            .expect("every kind must declare a string-like fallback native type")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConversionResult {
    pub native_dst: String,
    pub loss: LossSeverity,
    pub notes: String,
}

#[derive(Default)]
pub struct TypeConversionRegistry {
    tables: RwLock<HashMap<Kind, KindTypeTable>>,
}

/// Splits `"varchar(255)"` / `"decimal(38,10)"` into a base name and params.
fn parse_native(name: &str) -> (String, TypeParams) {
    let name = name.trim();
    let Some(open) = name.find('(') else {
        return (name.to_string(), TypeParams::default());
    };
    let Some(close) = name.rfind(')') else {
        return (name.to_string(), TypeParams::default());
    };
    let base = name[..open].trim().to_string();
    let inner = &name[open + 1..close];
    let numbers: Vec<u32> = inner
        .split(',')
        .filter_map(|s| s.trim().parse::<u32>().ok())
        .collect();
    let params = match numbers.as_slice() {
        [p, s] => TypeParams {
            length: None,
            precision: Some(*p),
            scale: Some(*s),
        },
        [n] => TypeParams {
            length: Some(*n),
            precision: Some(*n),
            scale: None,
        },
        _ => TypeParams::default(),
    };
    (base, params)
}

impl TypeConversionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_kind(&self, kind: Kind, table: KindTypeTable) {
        self.tables.write().insert(kind, table);
    }

    /// `Native(kind, name) -> UnifiedType + info` (spec §4.3), case
    /// insensitive, alias aware.
    pub fn native(&self, kind: Kind, name: &str) -> Result<(UnifiedType, NativeTypeInfo), FabricError> {
        let tables = self.tables.read();
        let table = tables
            .get(&kind)
            .ok_or_else(|| FabricError::UnknownKind(kind.to_string()))?;
        let (base, params) = parse_native(name);
        match table.find(&base) {
            Some(info) => Ok(((info.to_unified)(params), info.clone())),
            None => Ok((UnifiedType::Unknown, unknown_info())),
        }
    }

    /// `Render(kind, UnifiedType, params) -> native_string` (spec §4.3).
    pub fn render(&self, kind: Kind, unified: &UnifiedType, params: TypeParams) -> Result<String, FabricError> {
        let tables = self.tables.read();
        let table = tables
            .get(&kind)
            .ok_or_else(|| FabricError::UnknownKind(kind.to_string()))?;
        let info = table
            .default_for(unified.discriminant())
            .unwrap_or_else(|| table.string_fallback());
        Ok((info.render)(params, table.case))
    }

    /// `Convert(src_kind, dst_kind, native_src, params) -> {native_dst, loss,
    /// notes}` (spec §4.3).
    pub fn convert(
        &self,
        src_kind: Kind,
        dst_kind: Kind,
        native_src: &str,
        params_override: Option<TypeParams>,
    ) -> Result<ConversionResult, FabricError> {
        let (unified, src_info) = self.native(src_kind, native_src)?;
        let (_, mut params) = parse_native(native_src);
        if let Some(p) = params_override {
            params = p;
        }

        let tables = self.tables.read();
        let dst_table = tables
            .get(&dst_kind)
            .ok_or_else(|| FabricError::UnknownKind(dst_kind.to_string()))?;

        if matches!(unified, UnifiedType::Unknown) {
            let fallback = dst_table.string_fallback();
            return Ok(ConversionResult {
                native_dst: (fallback.render)(params, dst_table.case),
                loss: LossSeverity::Representational,
                notes: format!("unknown source type '{native_src}' rendered as destination string fallback"),
            });
        }

        if let UnifiedType::Array(inner) = &unified {
            if dst_table.default_for("array").is_none() {
                let fallback = dst_table.string_fallback();
                return Ok(ConversionResult {
                    native_dst: (fallback.render)(params, dst_table.case),
                    loss: LossSeverity::Representational,
                    notes: format!(
                        "{dst_kind} has no native array type; array of {} rendered as text",
                        inner.discriminant()
                    ),
                });
            }
        }

        let Some(dst_info) = dst_table.default_for(unified.discriminant()) else {
            let fallback = dst_table.string_fallback();
            return Ok(ConversionResult {
                native_dst: (fallback.render)(params, dst_table.case),
                loss: LossSeverity::Unsupported,
                notes: format!("{dst_kind} declares no mapping for {}", unified.discriminant()),
            });
        };

        let mut loss = LossSeverity::None;
        let mut notes = String::new();
        let mut clamped = params;

        if let (Some(max_precision), Some(precision)) = (dst_info.max_precision, params.precision) {
            if precision > max_precision {
                clamped.precision = Some(max_precision);
                loss = LossSeverity::Narrowing;
                notes.push_str(&format!(
                    "precision clamped from {precision} to {max_precision}; "
                ));
            }
        }
        if let (Some(max_scale), Some(scale)) = (dst_info.max_scale, params.scale) {
            if scale > max_scale {
                clamped.scale = Some(max_scale);
                loss = LossSeverity::Narrowing;
                notes.push_str(&format!("scale clamped from {scale} to {max_scale}; "));
            }
        }
        if let (Some(max_length), Some(length)) = (dst_info.max_length, params.length) {
            if length > max_length {
                clamped.length = Some(max_length);
                loss = LossSeverity::Narrowing;
                notes.push_str(&format!("length clamped from {length} to {max_length}; "));
            }
        }

        if loss == LossSeverity::None && src_info.native_name != dst_info.native_name {
            loss = if widens(&src_info, dst_info) {
                LossSeverity::Widening
            } else {
                LossSeverity::None
            };
        }

        Ok(ConversionResult {
            native_dst: (dst_info.render)(clamped, dst_table.case),
            loss,
            notes: if notes.is_empty() {
                "exact mapping".to_string()
            } else {
                notes
            },
        })
    }
}

fn widens(src: &NativeTypeInfo, dst: &NativeTypeInfo) -> bool {
    match (src.max_precision, dst.max_precision) {
        (Some(s), Some(d)) => d > s,
        _ => match (src.max_length, dst.max_length) {
            (Some(s), Some(d)) => d > s,
            _ => false,
        },
    }
}

fn unknown_info() -> NativeTypeInfo {
    NativeTypeInfo {
        native_name: "unknown",
        aliases: &[],
        has_length: false,
        has_precision_scale: false,
        max_length: None,
        max_precision: None,
        max_scale: None,
        nullable: true,
        default_supported: false,
        to_unified: |_| UnifiedType::Unknown,
        default_for: None,
        render: |_, _| "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn postgres_table() -> KindTypeTable {
        KindTypeTable {
            case: NamingCase::Lower,
            entries: vec![
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
                    render: |p, _| {
                        format!(
                            "numeric({},{})",
                            p.precision.unwrap_or(38),
                            p.scale.unwrap_or(0)
                        )
                    },
                },
            ],
        }
    }

    fn narrow_table() -> KindTypeTable {
        KindTypeTable {
            case: NamingCase::Upper,
            entries: vec![
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
                    render: |_, _| "BIGINT".to_string(),
                },
                NativeTypeInfo {
                    native_name: "varchar",
                    aliases: &[],
                    has_length: true,
                    has_precision_scale: false,
                    max_length: Some(65535),
                    max_precision: None,
                    max_scale: None,
                    nullable: true,
                    default_supported: true,
                    to_unified: |p| UnifiedType::Varchar(p.length.unwrap_or(255)),
                    default_for: Some("varchar"),
                    render: |p, case| match case {
                        NamingCase::Upper => format!("VARCHAR({})", p.length.unwrap_or(255)),
                        NamingCase::Lower => format!("varchar({})", p.length.unwrap_or(255)),
                    },
                },
                NativeTypeInfo {
                    native_name: "decimal",
                    aliases: &[],
                    has_length: false,
                    has_precision_scale: true,
                    max_length: None,
                    max_precision: Some(38),
                    max_scale: Some(6),
                    nullable: true,
                    default_supported: true,
                    to_unified: |p| UnifiedType::Decimal {
                        precision: p.precision.unwrap_or(38),
                        scale: p.scale.unwrap_or(0),
                    },
                    default_for: Some("decimal"),
                    render: |p, _| {
                        format!(
                            "DECIMAL({},{})",
                            p.precision.unwrap_or(38),
                            p.scale.unwrap_or(0)
                        )
                    },
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
                    render: |_, _| "STRING".to_string(),
                },
            ],
        }
    }

    fn registry() -> TypeConversionRegistry {
        let registry = TypeConversionRegistry::new();
        registry.register_kind(Kind::Postgres, postgres_table());
        registry.register_kind(Kind::MySql, narrow_table());
        registry
    }

    #[test]
    fn kind_internal_round_trip_is_exact() {
        let reg = registry();
        let result = reg.convert(Kind::Postgres, Kind::Postgres, "varchar(255)", None).unwrap();
        assert_eq!(result.native_dst, "varchar(255)");
        assert_eq!(result.loss, LossSeverity::None);
    }

    #[test]
    fn narrowing_clamps_and_reports_loss() {
        let reg = registry();
        let result = reg
            .convert(Kind::Postgres, Kind::MySql, "numeric(38,10)", None)
            .unwrap();
        assert_eq!(result.native_dst, "DECIMAL(38,6)");
        assert_eq!(result.loss, LossSeverity::Narrowing);
    }

    #[test]
    fn unknown_source_falls_through_to_string_fallback() {
        let reg = registry();
        let result = reg.convert(Kind::Postgres, Kind::MySql, "hstore", None).unwrap();
        assert_eq!(result.native_dst, "STRING");
        assert_eq!(result.loss, LossSeverity::Representational);
    }

    #[test]
    fn render_applies_kind_formatting_rule() {
        let reg = registry();
        let native = reg
            .render(Kind::MySql, &UnifiedType::Varchar(255), TypeParams { length: Some(255), ..Default::default() })
            .unwrap();
        assert_eq!(native, "VARCHAR(255)");
    }
}
