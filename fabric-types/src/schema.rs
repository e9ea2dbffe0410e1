//! C2 — Unified Schema Model: the paradigm-neutral schema representation and
//! its structural helpers (`Diff`, `Similarity`, `Walk`). Pure data, no I/O.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// The closed set of paradigm-neutral primitive types every adapter must map
/// its native types onto (spec §3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum UnifiedType {
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Decimal { precision: u32, scale: u32 },
    Boolean,
    String,
    Varchar(u32),
    Binary,
    Date,
    Time,
    Timestamp { tz: bool },
    Uuid,
    Json,
    Array(Box<UnifiedType>),
    Enum(Vec<String>),
    Struct(Vec<(String, UnifiedType)>),
    Vector(u32),
    Null,
    Unknown,
}

impl UnifiedType {
    /// A short, stable discriminant name used for diagnostics and as the map
    /// key in `NativeTypeInfo` tables, independent of parameters like length.
    pub fn discriminant(&self) -> &'static str {
        match self {
            UnifiedType::Int8 => "int8",
            UnifiedType::Int16 => "int16",
            UnifiedType::Int32 => "int32",
            UnifiedType::Int64 => "int64",
            UnifiedType::Float32 => "float32",
            UnifiedType::Float64 => "float64",
            UnifiedType::Decimal { .. } => "decimal",
            UnifiedType::Boolean => "boolean",
            UnifiedType::String => "string",
            UnifiedType::Varchar(_) => "varchar",
            UnifiedType::Binary => "binary",
            UnifiedType::Date => "date",
            UnifiedType::Time => "time",
            UnifiedType::Timestamp { .. } => "timestamp",
            UnifiedType::Uuid => "uuid",
            UnifiedType::Json => "json",
            UnifiedType::Array(_) => "array",
            UnifiedType::Enum(_) => "enum",
            UnifiedType::Struct(_) => "struct",
            UnifiedType::Vector(_) => "vector",
            UnifiedType::Null => "null",
            UnifiedType::Unknown => "unknown",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub unified_type: UnifiedType,
    pub nullable: bool,
    pub default: Option<serde_json::Value>,
    /// The kind-native type name this field was discovered from, preserved
    /// so round-tripping through `Discover` -> `Deploy` back to the same
    /// kind reconstructs the original native type exactly (spec §4.5).
    pub native_type: Option<String>,
    /// e.g. `{"pii": true}` — privacy/classification metadata, opaque to C2.
    pub privacy: IndexMap<String, serde_json::Value>,
}

impl Field {
    pub fn new(name: impl Into<String>, unified_type: UnifiedType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            unified_type,
            nullable,
            default: None,
            native_type: None,
            privacy: IndexMap::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    PrimaryKey { fields: Vec<String> },
    Unique { fields: Vec<String> },
    ForeignKey {
        fields: Vec<String>,
        references_container: String,
        references_fields: Vec<String>,
    },
    Check { expression: String },
    NotNull { field: String },
    Default { field: String, value: serde_json::Value },
}

/// Paradigm-neutral analog of a table / collection / node-label / key-prefix
/// family (spec §3, GLOSSARY "Container").
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    pub fields: Vec<Field>,
    pub constraints: Vec<Constraint>,
}

impl Container {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            constraints: Vec::new(),
        }
    }

    pub fn primary_key(&self) -> Option<&[String]> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::PrimaryKey { fields } => Some(fields.as_slice()),
            _ => None,
        })
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub name: String,
    pub definition: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub definition: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnifiedSchema {
    pub database_id: String,
    pub kind: crate::kind::Kind,
    pub containers: Vec<Container>,
    pub views: Vec<View>,
    pub functions: Vec<Function>,
}

impl UnifiedSchema {
    pub fn new(database_id: impl Into<String>, kind: crate::kind::Kind) -> Self {
        Self {
            database_id: database_id.into(),
            kind,
            containers: Vec::new(),
            views: Vec::new(),
            functions: Vec::new(),
        }
    }

    /// Canonicalizes ordering: containers sorted by name, fields within each
    /// container left in ordinal (discovery) order. Invoked by C7's
    /// `Discover` so the result is deterministic regardless of the native
    /// catalog's iteration order (spec §4.7).
    pub fn canonicalize(&mut self) {
        self.containers.sort_by(|a, b| a.name.cmp(&b.name));
        self.views.sort_by(|a, b| a.name.cmp(&b.name));
        self.functions.sort_by(|a, b| a.name.cmp(&b.name));
    }

    pub fn container(&self, name: &str) -> Option<&Container> {
        self.containers.iter().find(|c| c.name == name)
    }

    /// Deterministic JSON serialization: sorted object keys (via
    /// `serde_json`'s `preserve_order` being disabled is not assumed; we
    /// re-serialize through a `BTreeMap` pass) and a canonicalized container
    /// order, so two structurally identical schemas serialize identically
    /// (spec §4.2).
    pub fn to_stable_json(&self) -> Result<String, serde_json::Error> {
        let mut canonical = self.clone();
        canonical.canonicalize();
        let value = serde_json::to_value(&canonical)?;
        let sorted = sort_json_keys(value);
        serde_json::to_string_pretty(&sorted)
    }
}

fn sort_json_keys(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let sorted: std::collections::BTreeMap<_, _> = map
                .into_iter()
                .map(|(k, v)| (k, sort_json_keys(v)))
                .collect();
            serde_json::to_value(sorted).expect("BTreeMap<String, Value> always serializes")
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(sort_json_keys).collect())
        }
        other => other,
    }
}

/// One structural difference between two schemas, as produced by `diff`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Change {
    ContainerAdded(String),
    ContainerRemoved(String),
    FieldAdded { container: String, field: String },
    FieldRemoved { container: String, field: String },
    FieldTypeChanged {
        container: String,
        field: String,
        from: UnifiedType,
        to: UnifiedType,
    },
    FieldNullabilityChanged { container: String, field: String, nullable: bool },
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChangeSet {
    pub changes: Vec<Change>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Structural diff between two unified schemas (spec §4.2 `Diff`).
pub fn diff(a: &UnifiedSchema, b: &UnifiedSchema) -> ChangeSet {
    let mut changes = Vec::new();

    for container in &a.containers {
        if b.container(&container.name).is_none() {
            changes.push(Change::ContainerRemoved(container.name.clone()));
        }
    }
    for container in &b.containers {
        let Some(other) = a.container(&container.name) else {
            changes.push(Change::ContainerAdded(container.name.clone()));
            continue;
        };
        for field in &container.fields {
            let Some(other_field) = other.field(&field.name) else {
                changes.push(Change::FieldAdded {
                    container: container.name.clone(),
                    field: field.name.clone(),
                });
                continue;
            };
            if other_field.unified_type != field.unified_type {
                changes.push(Change::FieldTypeChanged {
                    container: container.name.clone(),
                    field: field.name.clone(),
                    from: other_field.unified_type.clone(),
                    to: field.unified_type.clone(),
                });
            }
            if other_field.nullable != field.nullable {
                changes.push(Change::FieldNullabilityChanged {
                    container: container.name.clone(),
                    field: field.name.clone(),
                    nullable: field.nullable,
                });
            }
        }
        for other_field in &other.fields {
            if container.field(&other_field.name).is_none() {
                changes.push(Change::FieldRemoved {
                    container: container.name.clone(),
                    field: other_field.name.clone(),
                });
            }
        }
    }

    ChangeSet { changes }
}

/// A rough [0,1] structural similarity score: fraction of (container, field)
/// pairs that exist with the same unified type in both schemas (spec §4.2
/// `Similarity`). Used by the supervisor/operators to sanity-check a binding
/// before a deploy, not as a precise metric.
pub fn similarity(a: &UnifiedSchema, b: &UnifiedSchema) -> f64 {
    let total_fields: usize = a.containers.iter().map(|c| c.fields.len()).sum();
    if total_fields == 0 {
        return match a.containers.len().cmp(&b.containers.len()) {
            Ordering::Equal => 1.0,
            _ => 0.0,
        };
    }

    let mut matching = 0usize;
    for container in &a.containers {
        if let Some(other) = b.container(&container.name) {
            for field in &container.fields {
                if let Some(other_field) = other.field(&field.name) {
                    if other_field.unified_type == field.unified_type {
                        matching += 1;
                    }
                }
            }
        }
    }
    matching as f64 / total_fields as f64
}

/// Visitor callback invoked for every container and field in discovery order
/// (spec §4.2 `Walk`).
pub trait SchemaVisitor {
    fn visit_container(&mut self, container: &Container) {
        let _ = container;
    }
    fn visit_field(&mut self, container: &Container, field: &Field) {
        let _ = (container, field);
    }
}

pub fn walk(schema: &UnifiedSchema, visitor: &mut dyn SchemaVisitor) {
    for container in &schema.containers {
        visitor.visit_container(container);
        for field in &container.fields {
            visitor.visit_field(container, field);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::Kind;

    fn sample(kind: Kind) -> UnifiedSchema {
        let mut schema = UnifiedSchema::new("db1", kind);
        let mut users = Container::new("users");
        users.fields.push(Field::new("id", UnifiedType::Int64, false));
        users
            .fields
            .push(Field::new("email", UnifiedType::Varchar(255), true));
        users.constraints.push(Constraint::PrimaryKey {
            fields: vec!["id".to_string()],
        });
        schema.containers.push(users);
        schema
    }

    #[test]
    fn canonicalize_sorts_containers_by_name() {
        let mut schema = UnifiedSchema::new("db1", Kind::Postgres);
        schema.containers.push(Container::new("zebra"));
        schema.containers.push(Container::new("apple"));
        schema.canonicalize();
        assert_eq!(schema.containers[0].name, "apple");
        assert_eq!(schema.containers[1].name, "zebra");
    }

    #[test]
    fn diff_is_empty_for_identical_schemas() {
        let a = sample(Kind::Postgres);
        let b = sample(Kind::MongoDb);
        assert!(diff(&a, &b).is_empty());
        assert_eq!(similarity(&a, &b), 1.0);
    }

    #[test]
    fn diff_detects_type_change_and_new_field() {
        let a = sample(Kind::Postgres);
        let mut b = sample(Kind::Postgres);
        b.containers[0].fields[1].unified_type = UnifiedType::Binary;
        b.containers[0]
            .fields
            .push(Field::new("age", UnifiedType::Int32, true));
        let changes = diff(&a, &b);
        assert!(changes
            .changes
            .iter()
            .any(|c| matches!(c, Change::FieldTypeChanged { field, .. } if field == "email")));
        assert!(changes
            .changes
            .iter()
            .any(|c| matches!(c, Change::FieldAdded { field, .. } if field == "age")));
    }

    #[test]
    fn stable_json_is_deterministic_across_container_order() {
        let mut a = sample(Kind::Postgres);
        a.containers.push(Container::new("zzz"));
        let mut b = a.clone();
        b.containers.reverse();
        assert_eq!(a.to_stable_json().unwrap(), b.to_stable_json().unwrap());
    }
}
