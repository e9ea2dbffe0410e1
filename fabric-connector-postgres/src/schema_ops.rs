//! `SchemaOps` for Postgres: catalog discovery via `information_schema`
//! (spec §4.7).

use async_trait::async_trait;
use fabric_connector::adapter::{Container, SchemaOps, UnifiedSchema};
use fabric_connector::context::OpContext;
use fabric_types::errors::FabricError;
use fabric_types::kind::Kind;
use fabric_types::schema::{Constraint, Field};
use fabric_types::type_registry::TypeConversionRegistry;
use std::sync::Arc;
use tokio_postgres::Client;

pub struct PostgresSchemaOps {
    pub client: Arc<Client>,
    pub database_id: String,
    pub types: Arc<TypeConversionRegistry>,
}

#[async_trait]
impl SchemaOps for PostgresSchemaOps {
    async fn discover(&self, ctx: &OpContext) -> Result<UnifiedSchema, FabricError> {
        let client = self.client.clone();
        let rows = ctx
            .run(async move {
                client
                    .query(
                        "select table_name, column_name, data_type, character_maximum_length, \
                         numeric_precision, numeric_scale, is_nullable, ordinal_position \
                         from information_schema.columns \
                         where table_schema = 'public' order by table_name, ordinal_position",
                        &[],
                    )
                    .await
            })
            .await?
            .map_err(|e| FabricError::internal(e))?;

        let mut schema = UnifiedSchema::new(self.database_id.clone(), Kind::Postgres);
        for row in rows {
            let table_name: String = row.get("table_name");
            let column_name: String = row.get("column_name");
            let data_type: String = row.get("data_type");
            let max_length: Option<i32> = row.get("character_maximum_length");
            let precision: Option<i32> = row.get("numeric_precision");
            let scale: Option<i32> = row.get("numeric_scale");
            let is_nullable: String = row.get("is_nullable");

            let native = match (max_length, precision, scale) {
                (Some(len), _, _) => format!("{data_type}({len})"),
                (None, Some(p), Some(s)) => format!("{data_type}({p},{s})"),
                _ => data_type.clone(),
            };
            let (unified_type, _info) = self.types.native(Kind::Postgres, &native)?;

            let container = match schema.containers.iter_mut().find(|c| c.name == table_name) {
                Some(c) => c,
                None => {
                    schema.containers.push(Container::new(table_name.clone()));
                    schema.containers.last_mut().unwrap()
                }
            };
            let mut field = Field::new(column_name, unified_type, is_nullable == "YES");
            field.native_type = Some(native);
            container.fields.push(field);
        }

        self.attach_primary_keys(&mut schema, ctx).await?;
        schema.canonicalize();
        Ok(schema)
    }

    async fn create_structure(&self, schema: &UnifiedSchema, ctx: &OpContext) -> Result<(), FabricError> {
        for container in &schema.containers {
            let mut columns = Vec::new();
            for field in &container.fields {
                let native = self.types.render(Kind::Postgres, &field.unified_type, Default::default())?;
                let nullability = if field.nullable { "" } else { " not null" };
                columns.push(format!("\"{}\" {}{}", field.name, native, nullability));
            }
            let ddl = format!("create table if not exists \"{}\" ({})", container.name, columns.join(", "));
            let client = self.client.clone();
            ctx.run(async move { client.execute(ddl.as_str(), &[]).await })
                .await?
                .map_err(|e| FabricError::internal(e))?;
        }
        Ok(())
    }

    async fn list_containers(&self, ctx: &OpContext) -> Result<Vec<String>, FabricError> {
        let client = self.client.clone();
        let rows = ctx
            .run(async move {
                client
                    .query(
                        "select table_name from information_schema.tables where table_schema = 'public'",
                        &[],
                    )
                    .await
            })
            .await?
            .map_err(|e| FabricError::internal(e))?;
        Ok(rows.iter().map(|r| r.get("table_name")).collect())
    }

    async fn get_container(&self, name: &str, ctx: &OpContext) -> Result<Container, FabricError> {
        let schema = self.discover(ctx).await?;
        schema
            .container(name)
            .cloned()
            .ok_or_else(|| FabricError::NotFound { resource: name.to_string() })
    }
}

impl PostgresSchemaOps {
    async fn attach_primary_keys(&self, schema: &mut UnifiedSchema, ctx: &OpContext) -> Result<(), FabricError> {
        let client = self.client.clone();
        let rows = ctx
            .run(async move {
                client
                    .query(
                        "select tc.table_name, kcu.column_name \
                         from information_schema.table_constraints tc \
                         join information_schema.key_column_usage kcu \
                           on tc.constraint_name = kcu.constraint_name \
                         where tc.constraint_type = 'PRIMARY KEY' and tc.table_schema = 'public' \
                         order by tc.table_name, kcu.ordinal_position",
                        &[],
                    )
                    .await
            })
            .await?
            .map_err(|e| FabricError::internal(e))?;

        for row in rows {
            let table_name: String = row.get("table_name");
            let column_name: String = row.get("column_name");
            let Some(container) = schema.containers.iter_mut().find(|c| c.name == table_name) else {
                continue;
            };
            match container.constraints.iter_mut().find_map(|c| match c {
                Constraint::PrimaryKey { fields } => Some(fields),
                _ => None,
            }) {
                Some(fields) => fields.push(column_name),
                None => container.constraints.push(Constraint::PrimaryKey { fields: vec![column_name] }),
            }
        }
        Ok(())
    }
}
