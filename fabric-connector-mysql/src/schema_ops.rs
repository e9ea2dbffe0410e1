//! `SchemaOps` for MySQL: catalog discovery via `information_schema` (spec
//! §4.7).

use async_trait::async_trait;
use fabric_connector::adapter::{Container, SchemaOps, UnifiedSchema};
use fabric_connector::context::OpContext;
use fabric_types::errors::FabricError;
use fabric_types::kind::Kind;
use fabric_types::schema::{Constraint, Field};
use fabric_types::type_registry::TypeConversionRegistry;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Row as MyRow};
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct MysqlSchemaOps {
    pub conn: Arc<Mutex<Conn>>,
    pub database_id: String,
    pub types: Arc<TypeConversionRegistry>,
}

#[async_trait]
impl SchemaOps for MysqlSchemaOps {
    async fn discover(&self, ctx: &OpContext) -> Result<UnifiedSchema, FabricError> {
        let conn = self.conn.clone();
        let rows: Vec<MyRow> = ctx
            .run(async move {
                let mut conn = conn.lock().await;
                conn.query(
                    "select table_name, column_name, column_type, is_nullable, \
                     ordinal_position from information_schema.columns \
                     where table_schema = database() order by table_name, ordinal_position",
                )
                .await
            })
            .await?
            .map_err(FabricError::internal)?;

        let mut schema = UnifiedSchema::new(self.database_id.clone(), Kind::MySql);
        for mut row in rows {
            let table_name: String = row.take("table_name").unwrap_or_default();
            let column_name: String = row.take("column_name").unwrap_or_default();
            let column_type: String = row.take("column_type").unwrap_or_default();
            let is_nullable: String = row.take("is_nullable").unwrap_or_default();

            let (unified_type, _info) = self.types.native(Kind::MySql, &column_type)?;
            let container = match schema.containers.iter_mut().find(|c| c.name == table_name) {
                Some(c) => c,
                None => {
                    schema.containers.push(Container::new(table_name.clone()));
                    schema.containers.last_mut().unwrap()
                }
            };
            let mut field = Field::new(column_name, unified_type, is_nullable == "YES");
            field.native_type = Some(column_type);
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
                let native = self.types.render(Kind::MySql, &field.unified_type, Default::default())?;
                let nullability = if field.nullable { "" } else { " not null" };
                columns.push(format!("`{}` {}{}", field.name, native, nullability));
            }
            let ddl = format!("create table if not exists `{}` ({})", container.name, columns.join(", "));
            let conn = self.conn.clone();
            ctx.run(async move { conn.lock().await.query_drop(ddl).await })
                .await?
                .map_err(FabricError::internal)?;
        }
        Ok(())
    }

    async fn list_containers(&self, ctx: &OpContext) -> Result<Vec<String>, FabricError> {
        let conn = self.conn.clone();
        ctx.run(async move { conn.lock().await.query("show tables").await })
            .await?
            .map_err(FabricError::internal)
    }

    async fn get_container(&self, name: &str, ctx: &OpContext) -> Result<Container, FabricError> {
        let schema = self.discover(ctx).await?;
        schema
            .container(name)
            .cloned()
            .ok_or_else(|| FabricError::NotFound { resource: name.to_string() })
    }
}

impl MysqlSchemaOps {
    async fn attach_primary_keys(&self, schema: &mut UnifiedSchema, ctx: &OpContext) -> Result<(), FabricError> {
        let conn = self.conn.clone();
        let rows: Vec<MyRow> = ctx
            .run(async move {
                let mut conn = conn.lock().await;
                conn.query(
                    "select table_name, column_name from information_schema.key_column_usage \
                     where table_schema = database() and constraint_name = 'PRIMARY' \
                     order by table_name, ordinal_position",
                )
                .await
            })
            .await?
            .map_err(FabricError::internal)?;

        for mut row in rows {
            let table_name: String = row.take("table_name").unwrap_or_default();
            let column_name: String = row.take("column_name").unwrap_or_default();
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
