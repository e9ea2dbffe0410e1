//! C7 — Schema Discovery & Translation: drives C5 discovery, canonicalizes
//! the result, deploys a unified schema to a target kind via C3, and
//! structurally compares two schemas via C2 (spec §4.7).

use crate::connection_manager::ConnectionManager;
use fabric_connector::context::OpContext;
use fabric_types::errors::{FabricError, LossSeverity};
use fabric_types::kind::Kind;
use fabric_types::schema::{Change, ChangeSet, Constraint, UnifiedSchema};
use fabric_types::type_registry::{TypeConversionRegistry, TypeParams};
use std::sync::Arc;

pub struct SchemaDiscovery {
    connections: Arc<ConnectionManager>,
    types: Arc<TypeConversionRegistry>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Warning {
    pub container: String,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeployReport {
    pub containers_created: Vec<String>,
    pub warnings: Vec<Warning>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DeployOptions {
    /// When true, an unsupported feature (e.g. a foreign key on a document
    /// target) fails the deploy instead of degrading to a `Warning` (spec
    /// §4.7).
    pub strict: bool,
}

impl SchemaDiscovery {
    pub fn new(connections: Arc<ConnectionManager>, types: Arc<TypeConversionRegistry>) -> Self {
        Self { connections, types }
    }

    /// `Discover(conn) → UnifiedSchema` (spec §4.7): delegates to
    /// `SchemaOps::discover`, then canonicalizes ordering so the result is
    /// deterministic regardless of the native catalog's iteration order.
    pub async fn discover(&self, connection_id: &str, ctx: &OpContext) -> Result<UnifiedSchema, FabricError> {
        let mut schema = self
            .connections
            .execute(connection_id, |conn| async move { conn.schema_ops().discover(ctx).await })
            .await?;
        schema.canonicalize();
        Ok(schema)
    }

    /// `Deploy(target_conn, schema, options)` (spec §4.7): translates every
    /// field type to the target kind via C3 and invokes
    /// `SchemaOps::create_structure` one container at a time. Unsupported
    /// features degrade to a `Warning` unless `options.strict`.
    pub async fn deploy(
        &self,
        target_connection_id: &str,
        target_kind: Kind,
        schema: &UnifiedSchema,
        options: DeployOptions,
    ) -> Result<DeployReport, FabricError> {
        let mut report = DeployReport::default();
        let mut translated = schema.clone();
        translated.kind = target_kind;

        for container in &mut translated.containers {
            for field in &mut container.fields {
                let params = native_params(&field.unified_type);
                let native = self.types.render(target_kind, &field.unified_type, params)?;
                field.native_type = Some(native);
            }

            // Foreign keys rendered against a target paradigm with no
            // native referential-integrity story (e.g. document, key-value)
            // cannot be expressed by `CreateStructure`; drop them and note
            // the diagnostic instead of failing the whole container.
            let mut dropped = Vec::new();
            container.constraints.retain(|c| match c {
                Constraint::ForeignKey { .. } if !kind_supports_foreign_keys(target_kind) => {
                    dropped.push(c.clone());
                    false
                }
                _ => true,
            });
            for constraint in dropped {
                let warning = Warning {
                    container: container.name.clone(),
                    message: format!(
                        "{target_kind} has no native referential integrity; {constraint:?} dropped (loss={:?})",
                        LossSeverity::Representational
                    ),
                };
                if options.strict {
                    return Err(FabricError::Unsupported {
                        operation: "schema.deploy".to_string(),
                        kind: target_kind.to_string(),
                    });
                }
                report.warnings.push(warning);
            }
        }

        for container in &translated.containers {
            let single = UnifiedSchema {
                database_id: translated.database_id.clone(),
                kind: target_kind,
                containers: vec![container.clone()],
                views: Vec::new(),
                functions: Vec::new(),
            };
            self.connections
                .execute(target_connection_id, |conn| async move { conn.schema_ops().create_structure(&single, &OpContext::new()).await })
                .await?;
            report.containers_created.push(container.name.clone());
        }

        Ok(report)
    }

    /// `Compare(a,b) → Diff` (spec §4.7), delegated to C2.
    pub fn compare(&self, a: &UnifiedSchema, b: &UnifiedSchema) -> ChangeSet {
        fabric_types::schema::diff(a, b)
    }
}

fn native_params(unified: &fabric_types::schema::UnifiedType) -> TypeParams {
    use fabric_types::schema::UnifiedType;
    match unified {
        UnifiedType::Varchar(n) => TypeParams { length: Some(*n), precision: None, scale: None },
        UnifiedType::Decimal { precision, scale } => {
            TypeParams { length: None, precision: Some(*precision), scale: Some(*scale) }
        }
        _ => TypeParams::default(),
    }
}

fn kind_supports_foreign_keys(kind: Kind) -> bool {
    matches!(kind, Kind::Postgres | Kind::MySql)
}

/// Returns true if `changes` contains only additions — useful for callers
/// deciding whether a drift can be auto-healed.
pub fn is_additive(changes: &ChangeSet) -> bool {
    changes
        .changes
        .iter()
        .all(|c| matches!(c, Change::ContainerAdded(_) | Change::FieldAdded { .. }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::NoopMetricsSink;
    use fabric_connector::registry::AdapterRegistry;
    use fabric_connector::test_util::{sample_descriptor, MockAdapter, NoopDecryptor};
    use fabric_types::capability::CapabilityRegistry;
    use fabric_types::schema::{Container, Field, UnifiedType};

    fn sample_schema() -> UnifiedSchema {
        let mut schema = UnifiedSchema::new("db1", Kind::Postgres);
        let mut users = Container::new("users");
        users.fields.push(Field::new("id", UnifiedType::Int64, false));
        users.fields.push(Field::new("email", UnifiedType::Varchar(255), true));
        schema.containers.push(users);
        schema
    }

    async fn setup() -> (SchemaDiscovery, Arc<ConnectionManager>) {
        let adapters = Arc::new(AdapterRegistry::new());
        adapters.register(Arc::new(MockAdapter::new()));
        let capabilities = Arc::new(CapabilityRegistry::with_defaults());
        let connections = Arc::new(ConnectionManager::new(
            adapters,
            capabilities,
            Arc::new(NoopDecryptor),
            Arc::new(NoopMetricsSink),
        ));
        connections.connect(sample_descriptor("target"), &OpContext::new()).await.unwrap();
        let types = Arc::new(TypeConversionRegistry::new());
        types.register_kind(Kind::Postgres, fabric_connector_postgres::type_table::table());
        types.register_kind(Kind::MongoDb, fabric_connector_mongodb::type_table::table());
        (SchemaDiscovery::new(connections.clone(), types), connections)
    }

    #[tokio::test]
    async fn deploy_translates_types_and_drops_unsupported_foreign_keys() {
        let (discovery, _connections) = setup().await;
        let mut schema = sample_schema();
        schema.containers[0].constraints.push(Constraint::ForeignKey {
            fields: vec!["id".to_string()],
            references_container: "accounts".to_string(),
            references_fields: vec!["id".to_string()],
        });

        let report = discovery
            .deploy("target", Kind::MongoDb, &schema, DeployOptions::default())
            .await
            .unwrap();
        assert_eq!(report.containers_created, vec!["users".to_string()]);
        assert_eq!(report.warnings.len(), 1);
    }

    #[tokio::test]
    async fn strict_deploy_fails_instead_of_warning() {
        let (discovery, _connections) = setup().await;
        let mut schema = sample_schema();
        schema.containers[0].constraints.push(Constraint::ForeignKey {
            fields: vec!["id".to_string()],
            references_container: "accounts".to_string(),
            references_fields: vec!["id".to_string()],
        });

        let result = discovery.deploy("target", Kind::MongoDb, &schema, DeployOptions { strict: true }).await;
        assert!(matches!(result, Err(FabricError::Unsupported { .. })));
    }

    #[tokio::test]
    async fn discover_canonicalizes_container_order() {
        let (discovery, connections) = setup().await;
        connections
            .execute("target", |conn| async move {
                conn.schema_ops().create_structure(&sample_schema(), &OpContext::new()).await
            })
            .await
            .unwrap();
        let schema = discovery.discover("target", &OpContext::new()).await.unwrap();
        assert_eq!(schema.containers[0].name, "users");
    }

    #[tokio::test]
    async fn compare_flags_additive_changes() {
        let (discovery, _connections) = setup().await;
        let a = UnifiedSchema::new("db1", Kind::Postgres);
        let b = sample_schema();
        let changes = discovery.compare(&a, &b);
        assert!(is_additive(&changes));
    }
}
